use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::twiml;
use crate::state::AppState;

/// Create the webhook router for the telephony provider
///
/// The provider posts incoming calls to `/incoming`; the root accepts the
/// same webhook for numbers configured with the bare host.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(twiml::incoming_call))
        .route("/incoming", post(twiml::incoming_call))
        .layer(TraceLayer::new_for_http())
}
