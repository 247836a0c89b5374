use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_marketplace_client::{
    config::ClientConfig, dto::products::ProductQuery, state::Storefront,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,audio_marketplace_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(api = %config.api_base_url, "starting storefront client");
    let storefront = Storefront::from_config(&config)?;

    let mut session = storefront.session.restore().await?;
    if !session.is_authenticated {
        if let (Ok(username), Ok(password)) = (
            std::env::var("STOREFRONT_USERNAME"),
            std::env::var("STOREFRONT_PASSWORD"),
        ) {
            match storefront.session.login(&username, &password).await {
                Ok(s) => session = s,
                Err(err) => tracing::warn!(messages = ?err.user_messages(), "login failed"),
            }
        }
    }
    match &session.user {
        Some(user) => tracing::info!(username = %user.username, role = %user.role, "session active"),
        None => tracing::info!("browsing anonymously"),
    }

    let page = storefront.catalog.list_products(&ProductQuery::default()).await?;
    tracing::info!(count = page.count, "catalog loaded");

    {
        let mut cart = storefront.cart();
        for product in page.results.iter().take(3) {
            cart.add_item(product.to_ref(), 1)?;
        }
        let summary = cart.summary();
        tracing::info!(
            items = summary.total_item_count,
            subtotal = %summary.subtotal,
            fee = %summary.platform_fee,
            total = %summary.total,
            "sample cart"
        );
    }

    if let Err(err) = storefront.ensure_checkout_ready() {
        tracing::info!(reason = ?err.user_messages(), "checkout not available");
    }

    Ok(())
}
