use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::{
    config::ClientConfig,
    dto::orders::{CheckoutRequest, OrderConfirmation},
    error::AppResult,
    events::{EventBus, StoreEvent},
    http::{HttpTransport, ReqwestTransport},
    services::{
        cart_service::Cart, catalog_service::Catalog, checkout_service,
        session_service::SessionManager,
    },
    storage::{FileTokenStore, MemoryTokenStore, TokenStore},
};

/// Owns the session, the cart and the catalog client, and fans their events
/// out to a single channel.
pub struct Storefront {
    pub session: Arc<SessionManager>,
    pub catalog: Catalog,
    cart: Mutex<Cart>,
    events: EventBus,
}

impl Storefront {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn TokenStore>) -> Self {
        let events = EventBus::new();
        let session = SessionManager::new(transport, store).with_events(events.clone());
        Self::from_session(session, events)
    }

    /// Builds a storefront around a preconfigured session manager. The
    /// session's events are only seen by subscribers if it was built with
    /// the same bus.
    pub fn from_session(session: SessionManager, events: EventBus) -> Self {
        let session = Arc::new(session);
        Self {
            catalog: Catalog::new(session.clone()),
            session,
            cart: Mutex::new(Cart::with_events(events.clone())),
            events,
        }
    }

    pub fn from_config(config: &ClientConfig) -> AppResult<Self> {
        let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout)?;
        let store: Arc<dyn TokenStore> = match &config.token_store_path {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Ok(Self::new(Arc::new(transport), store))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Locks the cart. Do not hold the guard across an await point.
    pub fn cart(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock()
    }

    pub fn ensure_checkout_ready(&self) -> AppResult<()> {
        checkout_service::ensure_ready(&self.cart.lock(), self.session.is_authenticated())
    }

    pub fn place_order(&self, request: CheckoutRequest) -> AppResult<OrderConfirmation> {
        let authenticated = self.session.is_authenticated();
        let confirmation =
            checkout_service::place_order(&mut self.cart.lock(), authenticated, request)?;
        self.events.emit(StoreEvent::OrderPlaced {
            invoice_number: confirmation.invoice_number.clone(),
        });
        Ok(confirmation)
    }
}
