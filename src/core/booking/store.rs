//! Booking persistence backends.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::models::{Booking, BookingError, BookingStatus, NewBooking, default_reason, parse_date};

/// Trait defining the interface for booking stores.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Free slots (`HH:MM`) for a `YYYY-MM-DD` date, in configured order.
    ///
    /// A malformed date yields an empty list.
    async fn available_slots(&self, date: &str) -> Result<Vec<String>, BookingError>;

    /// Persist a new confirmed booking with the next id.
    async fn create(&self, booking: NewBooking) -> Result<Booking, BookingError>;

    /// All stored bookings in creation order.
    async fn list(&self) -> Result<Vec<Booking>, BookingError>;
}

/// Slots from `slots` that are not already taken on `date`
fn free_slots(slots: &[String], date: NaiveDate, bookings: &[Booking]) -> Vec<String> {
    let taken: HashSet<String> = bookings
        .iter()
        .filter_map(Booking::scheduled_at)
        .filter(|at| at.date() == date)
        .map(|at| at.format("%H:%M").to_string())
        .collect();

    slots
        .iter()
        .filter(|slot| !taken.contains(*slot))
        .cloned()
        .collect()
}

fn build_booking(id: u64, request: NewBooking) -> Result<Booking, BookingError> {
    let name = request.name.trim();
    let datetime = request.datetime.trim();
    if name.is_empty() {
        return Err(BookingError::InvalidInput("name is required".to_string()));
    }
    if datetime.is_empty() {
        return Err(BookingError::InvalidInput("datetime is required".to_string()));
    }

    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(default_reason);

    Ok(Booking {
        id,
        name: name.to_string(),
        datetime: datetime.to_string(),
        reason,
        status: BookingStatus::Confirmed,
        created_at: Utc::now(),
    })
}

fn next_id(bookings: &[Booking]) -> u64 {
    bookings.iter().map(|b| b.id).max().unwrap_or(0) + 1
}

/// Bookings kept in a JSON array on disk
///
/// Every write rewrites the whole file through a temp file and rename.
pub struct JsonFileBookingStore {
    path: PathBuf,
    slots: Vec<String>,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileBookingStore {
    pub fn new(path: impl Into<PathBuf>, slots: Vec<String>) -> Self {
        Self {
            path: path.into(),
            slots,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<Booking>, BookingError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_slice(&contents)?)
    }

    async fn write_all(&self, bookings: &[Booking]) -> Result<(), BookingError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(bookings)?;

        // Atomic write using temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for JsonFileBookingStore {
    async fn available_slots(&self, date: &str) -> Result<Vec<String>, BookingError> {
        let Some(date) = parse_date(date) else {
            debug!("Malformed availability date: {}", date);
            return Ok(Vec::new());
        };
        let bookings = self.read_all().await?;
        Ok(free_slots(&self.slots, date, &bookings))
    }

    async fn create(&self, booking: NewBooking) -> Result<Booking, BookingError> {
        let _guard = self.write_lock.lock().await;

        let mut bookings = self.read_all().await?;
        let booking = build_booking(next_id(&bookings), booking)?;
        bookings.push(booking.clone());
        self.write_all(&bookings).await?;

        info!(
            "Booking {} saved to {}",
            booking.id,
            self.path.display()
        );
        Ok(booking)
    }

    async fn list(&self) -> Result<Vec<Booking>, BookingError> {
        self.read_all().await
    }
}

/// In-process booking store
#[derive(Default)]
pub struct MemoryBookingStore {
    slots: Vec<String>,
    bookings: Mutex<Vec<Booking>>,
}

impl MemoryBookingStore {
    pub fn new(slots: Vec<String>) -> Self {
        Self {
            slots,
            bookings: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn available_slots(&self, date: &str) -> Result<Vec<String>, BookingError> {
        let Some(date) = parse_date(date) else {
            return Ok(Vec::new());
        };
        Ok(free_slots(&self.slots, date, &self.bookings.lock()))
    }

    async fn create(&self, booking: NewBooking) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.lock();
        let booking = build_booking(next_id(&bookings), booking)?;
        bookings.push(booking.clone());
        Ok(booking)
    }

    async fn list(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.lock().clone())
    }
}
