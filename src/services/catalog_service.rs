use std::sync::Arc;

use crate::{
    dto::products::{AudioUpload, CreateProductRequest, NewReview, ProductDetails, ProductQuery},
    error::{AppError, AppResult, ErrorPayload},
    http::{FilePart, HttpRequest, Method, RequestBody},
    models::{AudioFile, AudioMetadata, Category, CategoryNode, Product, Review},
    response::Page,
    services::session_service::SessionManager,
};

/// Typed access to the product, category and review endpoints. Every call
/// goes through the session so credentials and silent refresh apply.
#[derive(Clone)]
pub struct Catalog {
    session: Arc<SessionManager>,
}

impl Catalog {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub async fn list_products(&self, query: &ProductQuery) -> AppResult<Page<Product>> {
        let mut request = HttpRequest::get("/products/");
        request.query = query.params();
        self.session.send_authorized(request).await?.into_result()
    }

    pub async fn product(&self, id: &str) -> AppResult<Product> {
        let id = checked_id(id)?;
        self.session
            .send_authorized(HttpRequest::get(format!("/products/{id}/")))
            .await?
            .into_result()
    }

    /// Loads a product and, if it carries an audio file, its audio metadata.
    /// Metadata failures are logged and do not fail the call.
    pub async fn product_details(&self, id: &str) -> AppResult<ProductDetails> {
        let product = self.product(id).await?;
        let audio_details = if product.audio_file.is_some() {
            match self.audio_metadata(id).await {
                Ok(metadata) => Some(metadata),
                Err(err) => {
                    tracing::warn!(error = %err, product_id = product.id, "failed to fetch audio metadata");
                    None
                }
            }
        } else {
            None
        };
        Ok(ProductDetails {
            product,
            audio_details,
        })
    }

    pub async fn audio_metadata(&self, id: &str) -> AppResult<AudioMetadata> {
        let id = checked_id(id)?;
        self.session
            .send_authorized(HttpRequest::get(format!("/products/{id}/audio-metadata/")))
            .await?
            .into_result()
    }

    pub async fn create_product(&self, payload: &CreateProductRequest) -> AppResult<Product> {
        payload.validate().into_result()?;
        let product: Product = self
            .session
            .authorized_request(
                Method::Post,
                "/products/",
                RequestBody::Json(serde_json::to_value(payload)?),
            )
            .await?
            .into_result()?;
        tracing::info!(product_id = product.id, "product created");
        Ok(product)
    }

    pub async fn upload_audio(&self, upload: AudioUpload) -> AppResult<AudioFile> {
        upload.validate().into_result()?;
        let content_type = upload.content_type().map(str::to_string);
        let file = FilePart {
            field: "audio_file".to_string(),
            file_name: upload.file_name,
            content_type,
            bytes: upload.bytes,
        };
        self.session
            .authorized_request(
                Method::Post,
                "/products/upload-audio/",
                RequestBody::Multipart(file),
            )
            .await?
            .into_result()
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let page: Page<Category> = self
            .session
            .send_authorized(HttpRequest::get("/categories/"))
            .await?
            .into_result()?;
        Ok(page.results)
    }

    pub async fn category_tree(&self) -> AppResult<Vec<CategoryNode>> {
        self.session
            .send_authorized(HttpRequest::get("/categories/tree/"))
            .await?
            .into_result()
    }

    pub async fn list_reviews(&self, product_id: &str) -> AppResult<Vec<Review>> {
        let id = checked_id(product_id)?;
        let page: Page<Review> = self
            .session
            .send_authorized(HttpRequest::get(format!("/products/{id}/reviews/")))
            .await?
            .into_result()?;
        Ok(page.results)
    }

    pub async fn submit_review(&self, product_id: &str, review: &NewReview) -> AppResult<Review> {
        let id = checked_id(product_id)?;
        review.validate().into_result()?;
        if !self.session.is_authenticated() {
            return Err(AppError::Auth(ErrorPayload::message(
                "You must be logged in to submit a review",
            )));
        }
        self.session
            .authorized_request(
                Method::Post,
                &format!("/products/{id}/reviews/"),
                RequestBody::Json(serde_json::to_value(review)?),
            )
            .await?
            .into_result()
    }
}

fn checked_id(id: &str) -> AppResult<&str> {
    let id = id.trim();
    if id.is_empty() || id == "undefined" || id.contains('/') {
        return Err(AppError::InvalidProduct("Invalid product ID".to_string()));
    }
    Ok(id)
}
