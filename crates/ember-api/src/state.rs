use std::sync::Arc;

use ember_core::chat::ChatService;
use ember_core::matcher::Matchmaker;
use ember_store::DocumentStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub matchmaker: Matchmaker,
    pub chat: ChatService,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_secret: String) -> Self {
        Self {
            matchmaker: Matchmaker::new(store.clone()),
            chat: ChatService::new(store),
            jwt_secret,
        }
    }
}
