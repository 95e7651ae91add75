use crate::session::Session;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The session driven by this API
    pub session: Session,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}
