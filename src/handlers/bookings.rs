use std::sync::Arc;

use axum::{extract::State, response::Json};

use crate::core::booking::{Booking, BookingStore};
use crate::errors::AppResult;
use crate::state::AppState;

/// List every stored booking in creation order
pub async fn list_bookings(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Booking>>> {
    let bookings = state.bookings().list().await?;
    Ok(Json(bookings))
}
