use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    LoggedIn { username: String },
    TokenRefreshed,
    ProfileLoaded { username: String },
    /// Tokens and profile were dropped, either by logout or a failed refresh.
    SessionCleared { reason: SessionClearReason },
    CartChanged { total_item_count: u32 },
    OrderPlaced { invoice_number: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClearReason {
    Logout,
    RefreshFailed,
}

/// Fan-out of state changes to UI observers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        tracing::trace!(?event, "store event");
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}
