//! Normalized check results shared by the checker, the state tracker and the
//! notification pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::EnumIter as EnumIterMacro;

/// Classification of a single stock check.
///
/// Every failure the adapter layer can produce is folded into one of these
/// kinds; nothing else propagates out of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumIterMacro)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The page was fetched and parsed; `in_stock`/`price` are meaningful.
    Success,
    /// Network failure, timeout or an ambiguous page. Retried via backoff.
    TransientError,
    /// Site-level rejection (403, 429, 503).
    Blocked,
    /// A CAPTCHA page was served instead of the product page.
    CaptchaDetected,
}

impl CheckOutcome {
    /// Snake-case tag used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::Success => "success",
            CheckOutcome::TransientError => "transient_error",
            CheckOutcome::Blocked => "blocked",
            CheckOutcome::CaptchaDetected => "captcha_detected",
        }
    }

    /// Whether this outcome counts against the link's backoff.
    pub fn is_failure(&self) -> bool {
        !matches!(self, CheckOutcome::Success)
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one stock check. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// When the check completed
    pub timestamp: DateTime<Utc>,
    /// Availability; always false unless `outcome` is `Success`
    pub in_stock: bool,
    /// Extracted price, if any
    pub price: Option<f64>,
    /// Whether the link passes the brand/series/model filters and its price ceiling
    pub passes_filters: bool,
    /// Classification of the check
    pub outcome: CheckOutcome,
}

impl Observation {
    /// A successful check.
    pub fn success(
        timestamp: DateTime<Utc>,
        in_stock: bool,
        price: Option<f64>,
        passes_filters: bool,
    ) -> Self {
        Observation {
            timestamp,
            in_stock,
            price,
            passes_filters,
            outcome: CheckOutcome::Success,
        }
    }

    /// A failed check. Stock and price carry no information.
    pub fn failed(timestamp: DateTime<Utc>, outcome: CheckOutcome) -> Self {
        Observation {
            timestamp,
            in_stock: false,
            price: None,
            passes_filters: false,
            outcome,
        }
    }

    /// In stock, passing filters, and from a successful check.
    pub fn is_available(&self) -> bool {
        self.outcome == CheckOutcome::Success && self.in_stock && self.passes_filters
    }
}
