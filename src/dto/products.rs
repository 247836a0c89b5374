use serde::{Deserialize, Serialize};

use crate::{
    error::FieldErrors,
    models::{AudioMetadata, Money, Product},
};

pub const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "flac"];
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<i64>,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub page: Option<u32>,
}

impl ProductQuery {
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(category) = self.category {
            params.push(("category".to_string(), category.to_string()));
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.trim().is_empty()) {
            params.push(("search".to_string(), search.trim().to_string()));
        }
        if let Some(min) = self.min_price {
            params.push(("min_price".to_string(), min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price".to_string(), max.to_string()));
        }
        if let Some(page) = self.page.filter(|p| *p > 1) {
            params.push(("page".to_string(), page.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_file_id: Option<i64>,
    pub is_active: bool,
}

impl CreateProductRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.add("title", "Title is required");
        }
        if self.price.is_negative() {
            errors.add("price", "Price must not be negative");
        }
        errors
    }
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self.extension().as_deref() {
            Some("mp3") => Some("audio/mpeg"),
            Some("wav") => Some("audio/wav"),
            Some("flac") => Some("audio/flac"),
            _ => None,
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let supported = self
            .extension()
            .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()));
        if !supported {
            errors.add(
                "audio_file",
                format!(
                    "Unsupported file extension. supported extensions are: {}",
                    AUDIO_EXTENSIONS.map(|e| format!(".{e}")).join(",")
                ),
            );
        } else if self.bytes.len() > MAX_AUDIO_BYTES {
            errors.add("audio_file", "File size exceeds 50MB limit");
        }
        errors
    }
}

/// A product together with the metadata of its audio file, when available.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub product: Product,
    pub audio_details: Option<AudioMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if !(1..=5).contains(&self.rating) {
            errors.add("rating", "Rating must be between 1 and 5");
        }
        if self.comment.trim().is_empty() {
            errors.add("comment", "Review text is required");
        }
        errors
    }
}
