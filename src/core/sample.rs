use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::types::decimal_to_f64;
use crate::error::{ChartError, ChartResult};

/// One price observation as pushed by the feed collaborator.
///
/// Raw samples are validated at the ingestion boundary before entering the
/// buffer; a rejected sample leaves buffer state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp_ms: i64,
    pub price: f64,
    pub volume: u64,
    pub sequence: u64,
}

impl RawSample {
    #[must_use]
    pub fn new(timestamp_ms: i64, price: f64, volume: u64, sequence: u64) -> Self {
        Self {
            timestamp_ms,
            price,
            volume,
            sequence,
        }
    }

    /// Builds a raw sample from a decimal feed price.
    pub fn from_decimal_price(
        timestamp_ms: i64,
        price: Decimal,
        volume: u64,
        sequence: u64,
    ) -> ChartResult<Self> {
        Ok(Self::new(
            timestamp_ms,
            decimal_to_f64(price, "price")?,
            volume,
            sequence,
        ))
    }

    pub fn validate(self) -> ChartResult<()> {
        if self.timestamp_ms < 0 {
            return Err(ChartError::InvalidSample {
                field: "timestamp_ms",
                reason: format!("must be >= 0, got {}", self.timestamp_ms),
            });
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ChartError::InvalidSample {
                field: "price",
                reason: format!("must be finite and > 0, got {}", self.price),
            });
        }
        Ok(())
    }
}

/// An accepted sample owned by the buffer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unique within the owning buffer: timestamp plus a per-buffer suffix.
    pub id: String,
    pub timestamp_ms: i64,
    pub price: f64,
    pub volume: u64,
    pub sequence: u64,
}

impl Sample {
    pub(crate) fn from_raw(raw: RawSample, id_suffix: u64) -> Self {
        Self {
            id: format!("{}-{:06x}", raw.timestamp_ms, id_suffix),
            timestamp_ms: raw.timestamp_ms,
            price: raw.price,
            volume: raw.volume,
            sequence: raw.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RawSample;
    use crate::error::ChartError;
    use rust_decimal::Decimal;

    #[test]
    fn raw_sample_accepts_positive_finite_price() {
        assert!(RawSample::new(1_000, 100.25, 1_500, 1).validate().is_ok());
    }

    #[test]
    fn raw_sample_rejects_non_positive_price() {
        let err = RawSample::new(1_000, 0.0, 0, 1).validate().expect_err("zero price");
        assert!(matches!(err, ChartError::InvalidSample { field: "price", .. }));

        let err = RawSample::new(1_000, f64::NAN, 0, 1)
            .validate()
            .expect_err("nan price");
        assert!(matches!(err, ChartError::InvalidSample { field: "price", .. }));
    }

    #[test]
    fn raw_sample_rejects_negative_timestamp() {
        let err = RawSample::new(-1, 100.0, 0, 1).validate().expect_err("negative ts");
        assert!(matches!(
            err,
            ChartError::InvalidSample {
                field: "timestamp_ms",
                ..
            }
        ));
    }

    #[test]
    fn raw_sample_converts_decimal_feed_price() {
        let raw = RawSample::from_decimal_price(2_000, Decimal::new(10_125, 2), 10, 7)
            .expect("decimal conversion");
        assert!((raw.price - 101.25).abs() < 1e-12);
    }
}
