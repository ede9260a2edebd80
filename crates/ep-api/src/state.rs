use std::sync::Arc;

use ep_core::{BoardService, IdentityProvider};
use ep_ui::OfflinePolicy;

/// State shared across all request handlers.
pub struct AppState {
    pub service: BoardService,
    pub identity: Arc<dyn IdentityProvider>,
    pub offline: OfflinePolicy,
    /// Take the client address from `X-Forwarded-For` (behind a proxy only)
    pub trust_forwarded_for: bool,
}
