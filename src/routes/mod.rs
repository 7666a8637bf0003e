pub mod api;
pub mod webhooks;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Full application router: API, telephony webhooks and the media stream
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(webhooks::create_webhook_router())
        .merge(ws::create_ws_router())
        .with_state(state)
}
