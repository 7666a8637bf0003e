use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur during booking store operations.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// I/O error while reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request is missing required booking details.
    #[error("Invalid booking: {0}")]
    InvalidInput(String),

    /// The store cannot serve requests right now.
    #[error("Booking store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Confirmed,
}

/// A stored appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub name: String,
    /// Requested appointment time as given by the caller, normally `YYYY-MM-DD HH:MM`
    pub datetime: String,
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(alias = "timestamp", deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Appointment time, when `datetime` is in a recognized format
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        parse_datetime(&self.datetime)
    }
}

/// Booking request before the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub name: String,
    pub datetime: String,
    pub reason: Option<String>,
}

pub(crate) fn default_reason() -> String {
    "General".to_string()
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Accept RFC 3339 timestamps as well as naive ISO timestamps, read as UTC
fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
