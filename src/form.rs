use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    All,
    TimeRange,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::All => "all",
            DataType::TimeRange => "time_range",
        }
    }
}

/// Query parameters exactly as typed into the data form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryForm {
    pub device_mac: String,
    pub data_type: DataType,
    pub start_date: String,
    pub end_date: String,
    pub hours_from: String,
    pub hours_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a device or add a new one first")]
    NoDevice,
    #[error("Please select both start and end dates for time range data")]
    MissingDates,
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,
    #[error("Start date must be before or equal to end date")]
    DateOrder,
    #[error("Please enter both start and end hours for time range data")]
    MissingHours,
    #[error("Hours must be integers")]
    HourNotInteger,
    #[error("Hours must be between 0 and 23")]
    HourRange,
    #[error("Start hour must be less than end hour")]
    HourOrder,
}

impl QueryForm {
    /// Form state on page load: start date `range_days` before `today`, end date today.
    /// A range that leaves the calendar falls back to a single day.
    pub fn with_default_dates(today: NaiveDate, range_days: i64) -> Self {
        let start = Duration::try_days(range_days.max(0))
            .and_then(|span| today.checked_sub_signed(span))
            .or_else(|| today.checked_sub_signed(Duration::days(1)))
            .unwrap_or(today);
        Self {
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: today.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    pub fn is_time_range(&self) -> bool {
        self.data_type == DataType::TimeRange
    }

    /// Checks the form before any request is sent. The first failing rule wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.device_mac.trim().is_empty() {
            return Err(ValidationError::NoDevice);
        }
        if !self.is_time_range() {
            return Ok(());
        }

        let start = self.start_date.trim();
        let end = self.end_date.trim();
        if start.is_empty() || end.is_empty() {
            return Err(ValidationError::MissingDates);
        }
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if start > end {
            return Err(ValidationError::DateOrder);
        }

        let from = self.hours_from.trim();
        let to = self.hours_to.trim();
        if from.is_empty() || to.is_empty() {
            return Err(ValidationError::MissingHours);
        }
        let from = parse_hour(from)?;
        let to = parse_hour(to)?;
        if from >= to {
            return Err(ValidationError::HourOrder);
        }
        Ok(())
    }

    /// Form-encoded body for the preview and download endpoints.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device_mac", self.device_mac.trim().to_string()),
            ("data_type", self.data_type.as_str().to_string()),
            ("start_date", self.start_date.trim().to_string()),
            ("end_date", self.end_date.trim().to_string()),
            ("hours_from", self.hours_from.trim().to_string()),
            ("hours_to", self.hours_to.trim().to_string()),
        ]
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate)
}

fn parse_hour(raw: &str) -> Result<u8, ValidationError> {
    let hour = raw
        .parse::<i64>()
        .map_err(|_| ValidationError::HourNotInteger)?;
    u8::try_from(hour)
        .ok()
        .filter(|h| *h <= 23)
        .ok_or(ValidationError::HourRange)
}
