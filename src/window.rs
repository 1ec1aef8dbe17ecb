//! The interval a caller wants data for.
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::Timestamp;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Window length must be positive, got: {0}")]
    NotPositive(Duration),
    #[error("Window length of {0}s is not a finite number of milliseconds")]
    InvalidLength(String),
    #[error("Window starting at {0} ends beyond the representable time range")]
    Overflow(Timestamp),
}

/// Half open interval `[start, start + length)` of positive length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Timestamp,
    length: Duration,
}

impl TimeWindow {
    /// # Errors
    /// If `length` is zero or negative or the end is out of range.
    pub fn new(start: Timestamp, length: Duration) -> Result<Self, Error> {
        if length <= Duration::zero() {
            return Err(Error::NotPositive(length));
        }
        start.checked_add_signed(length).ok_or(Error::Overflow(start))?;
        Ok(Self { start, length })
    }

    /// Length in seconds, rounded to the nearest millisecond.
    ///
    /// # Errors
    /// If the length is not positive or not finite.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_secs_f64(start: Timestamp, secs: f64) -> Result<Self, Error> {
        let millis = (secs * 1000.0).round();
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(Error::InvalidLength(secs.to_string()));
        }
        let length = Duration::try_milliseconds(millis as i64)
            .ok_or_else(|| Error::InvalidLength(secs.to_string()))?;
        Self::new(start, length)
    }

    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn length(&self) -> Duration {
        self.length
    }

    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.start + self.length
    }

    /// Number of samples the window spans at `sampling_rate`, rounded to the
    /// nearest sample.
    #[must_use]
    pub fn sample_count(&self, sampling_rate: f64) -> usize {
        millis_to_samples(self.length.num_milliseconds(), sampling_rate)
    }

    /// Same window moved by `shift`
    #[must_use]
    pub fn shifted(&self, shift: Duration) -> Self {
        Self {
            start: self.start + shift,
            length: self.length,
        }
    }
}

/// `round(millis * rate / 1000)`, negative results clamp to zero. Every
/// fractional sample boundary in the crate goes through here so they all
/// round the same way.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn millis_to_samples(millis: i64, sampling_rate: f64) -> usize {
    let samples = (millis as f64 * sampling_rate / 1000.0).round();
    if samples <= 0.0 {
        0
    } else {
        samples as usize
    }
}

/// A leap second inserted at a known instant.
///
/// Catalog boundaries were recorded with clocks that counted the inserted
/// second. A caller supplied time after the instant is therefore one second
/// ahead when compared against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeapSecond {
    pub instant: DateTime<Utc>,
}

impl LeapSecond {
    /// The leap second at the end of 2016.
    #[must_use]
    pub fn end_of_2016() -> Self {
        Self {
            instant: Utc
                .with_ymd_and_hms(2016, 12, 31, 23, 59, 59)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    #[must_use]
    pub fn adjust(&self, t: Timestamp) -> Timestamp {
        if t > self.instant {
            t + Duration::seconds(1)
        } else {
            t
        }
    }

    /// Applies the correction to the start, the length is unchanged.
    #[must_use]
    pub fn adjust_window(&self, window: &TimeWindow) -> TimeWindow {
        let adjusted = self.adjust(window.start);
        window.shifted(adjusted - window.start)
    }
}
