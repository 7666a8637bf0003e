use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, bookings};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/bookings", get(bookings::list_bookings))
        .layer(TraceLayer::new_for_http())
}
