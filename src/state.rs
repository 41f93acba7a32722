use std::sync::Arc;

use crate::config::Config;
use crate::store::ForumStore;
use axum::extract::FromRef;

/// Shared storage handle passed to every handler.
pub type DynStore = Arc<dyn ForumStore>;

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Config,
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
