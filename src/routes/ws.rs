use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::twiml::MEDIA_STREAM_PATH;
use crate::handlers::ws;
use crate::state::AppState;
use std::sync::Arc;

/// Create the WebSocket router
///
/// The media stream endpoint is unauthenticated; the telephony provider
/// connects to the URL handed out in the incoming-call TwiML.
pub fn create_ws_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(ws::media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
