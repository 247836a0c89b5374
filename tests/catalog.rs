mod common;

use audio_marketplace_client::{
    dto::products::{AudioUpload, CreateProductRequest, NewReview, ProductQuery},
    error::AppError,
    http::{Method, RequestBody},
    models::Money,
    services::catalog_service::Catalog,
};
use common::{ScriptedTransport, logged_in, manager, valid_token};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;

fn product_json(id: i64, price: &str, with_audio: bool) -> serde_json::Value {
    let audio = if with_audio {
        json!({ "id": 3, "file": "/media/audio_files/loop.wav", "duration": 12.5, "file_size": 2048, "format": "wav", "sample_rate": 44100 })
    } else {
        serde_json::Value::Null
    };
    json!({
        "id": id,
        "title": "Dusty Breaks",
        "description": "Vinyl drum loop",
        "price": price,
        "seller": 4,
        "seller_username": "beatsmith",
        "category": 2,
        "category_name": "Drums",
        "audio_file": audio,
        "is_active": true,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

#[tokio::test]
async fn lists_products_with_filters() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Get,
        "/products/",
        StatusCode::OK,
        json!({
            "count": 21,
            "next": "http://127.0.0.1:8000/api/products/?page=2",
            "previous": null,
            "results": [product_json(1, "11.99", false)]
        }),
    );

    let page = catalog
        .list_products(&ProductQuery {
            category: Some(2),
            search: Some(" breaks ".into()),
            min_price: Some(Money::from_cents(500)),
            max_price: None,
            page: None,
        })
        .await?;

    assert_eq!(page.count, 21);
    assert!(page.has_next());
    assert_eq!(page.results[0].price, Money::from_cents(1199));
    assert_eq!(page.results[0].to_ref().id, "1");

    let sent = &transport.sent_to("/products/")[0];
    assert_eq!(
        sent.query,
        vec![
            ("category".to_string(), "2".to_string()),
            ("search".to_string(), "breaks".to_string()),
            ("min_price".to_string(), "5.00".to_string()),
        ]
    );
    assert!(sent.bearer.is_none());
    Ok(())
}

#[tokio::test]
async fn product_details_include_audio_metadata() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Get,
        "/products/5/",
        StatusCode::OK,
        product_json(5, "4.50", true),
    );
    transport.respond(
        Method::Get,
        "/products/5/audio-metadata/",
        StatusCode::OK,
        json!({ "duration": 12.5, "file_size": 2048, "format": "wav", "sample_rate": 44100 }),
    );

    let details = catalog.product_details("5").await?;
    assert_eq!(details.product.title, "Dusty Breaks");
    assert_eq!(
        details.audio_details.and_then(|a| a.sample_rate),
        Some(44100)
    );
    assert_eq!(details.product.to_ref().duration, Some(12.5));
    Ok(())
}

#[tokio::test]
async fn audio_metadata_failure_does_not_fail_details() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Get,
        "/products/5/",
        StatusCode::OK,
        product_json(5, "4.50", true),
    );
    transport.respond(
        Method::Get,
        "/products/5/audio-metadata/",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": "decoder crashed" }),
    );

    let details = catalog.product_details("5").await?;
    assert!(details.audio_details.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_and_invalid_products() {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));

    assert!(matches!(
        catalog.product("undefined").await,
        Err(AppError::InvalidProduct(_))
    ));
    assert!(transport.sent().is_empty());

    assert!(matches!(catalog.product("404").await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn create_product_is_authorized() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let access = valid_token();
    let (session, _store) = logged_in(&transport, &access).await;
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Post,
        "/products/",
        StatusCode::CREATED,
        product_json(8, "19.00", false),
    );

    let product = catalog
        .create_product(&CreateProductRequest {
            title: "Dusty Breaks".into(),
            description: "Vinyl drum loop".into(),
            price: Money::from_cents(1900),
            category: Some(2),
            audio_file_id: None,
            is_active: true,
        })
        .await?;

    assert_eq!(product.id, 8);
    let sent = &transport.sent_to("/products/")[0];
    assert_eq!(sent.bearer.as_deref(), Some(access.as_str()));
    match &sent.body {
        RequestBody::Json(body) => assert_eq!(body["price"], "19.00"),
        other => panic!("unexpected body {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn upload_rejects_unsupported_files_locally() {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));

    let err = catalog
        .upload_audio(AudioUpload {
            file_name: "cover.png".into(),
            bytes: vec![0; 16],
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn upload_sends_multipart_audio() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = logged_in(&transport, &valid_token()).await;
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Post,
        "/products/upload-audio/",
        StatusCode::CREATED,
        json!({ "id": 3, "file": "/media/audio_files/loop.wav", "duration": 1.0, "file_size": 4, "format": "44100" }),
    );

    let audio = catalog
        .upload_audio(AudioUpload {
            file_name: "loop.WAV".into(),
            bytes: vec![1, 2, 3, 4],
        })
        .await?;
    assert_eq!(audio.id, 3);

    match &transport.sent_to("/products/upload-audio/")[0].body {
        RequestBody::Multipart(part) => {
            assert_eq!(part.field, "audio_file");
            assert_eq!(part.content_type.as_deref(), Some("audio/wav"));
        }
        other => panic!("unexpected body {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn categories_and_tree() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));
    transport.respond(
        Method::Get,
        "/categories/",
        StatusCode::OK,
        json!([{ "id": 1, "name": "Loops", "description": "", "parent": null }]),
    );
    transport.respond(
        Method::Get,
        "/categories/tree/",
        StatusCode::OK,
        json!([{ "id": 1, "name": "Loops", "description": "", "children": [
            { "id": 2, "name": "Drums", "description": "", "children": [] }
        ]}]),
    );

    assert_eq!(catalog.list_categories().await?.len(), 1);
    let tree = catalog.category_tree().await?;
    assert_eq!(tree[0].children[0].name, "Drums");
    Ok(())
}

#[tokio::test]
async fn reviews_require_login_and_valid_rating() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = manager(transport.clone());
    let catalog = Catalog::new(Arc::new(session));

    let err = catalog
        .submit_review("5", &NewReview { rating: 6, comment: "fire".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = catalog
        .submit_review("5", &NewReview { rating: 5, comment: "fire".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn reviews_round_trip_when_logged_in() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    let (session, _store) = logged_in(&transport, &valid_token()).await;
    let catalog = Catalog::new(Arc::new(session));
    let review = json!({ "id": 9, "product": 5, "user": 1, "username": "dj", "rating": 5, "comment": "fire", "created_at": "2025-03-02T08:00:00Z" });
    transport.respond(
        Method::Post,
        "/products/5/reviews/",
        StatusCode::CREATED,
        review.clone(),
    );
    transport.respond(
        Method::Get,
        "/products/5/reviews/",
        StatusCode::OK,
        json!([review]),
    );

    let created = catalog
        .submit_review("5", &NewReview { rating: 5, comment: "fire".into() })
        .await?;
    assert_eq!(created.id, 9);
    assert_eq!(catalog.list_reviews("5").await?[0].username.as_deref(), Some("dj"));
    Ok(())
}
