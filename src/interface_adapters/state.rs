use crate::use_cases::MatchRegistry;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    // Active matches and the settings new ones are spawned with.
    pub match_registry: Arc<MatchRegistry>,
    // Match joined when a socket omits `match_id`.
    pub default_match_id: Arc<str>,
}
