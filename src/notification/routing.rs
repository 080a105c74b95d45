//! Recipient routing by series.

use std::collections::HashMap;

use serde::Deserialize;

/// Who a channel addresses: a default list plus per-series overrides.
///
/// An override replaces the default for its series. An override with an
/// empty list mutes that series on the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientRouting {
    /// Recipients for series without an override
    #[serde(default)]
    pub default: Vec<String>,
    /// Per-series recipient lists, keyed case-insensitively
    #[serde(default)]
    pub by_series: HashMap<String, Vec<String>>,
}

impl RecipientRouting {
    /// No routing configured: the channel delivers everything without
    /// addressing anyone in particular.
    pub fn is_unrouted(&self) -> bool {
        self.default.is_empty() && self.by_series.is_empty()
    }

    /// Recipients for a notification of `series`.
    ///
    /// `None` means the channel has nobody to deliver this notification to
    /// and should be skipped.
    pub fn resolve(&self, series: Option<&str>) -> Option<&[String]> {
        if self.is_unrouted() {
            return Some(&[]);
        }

        let override_list = series.and_then(|series| {
            self.by_series
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(series))
                .map(|(_, recipients)| recipients)
        });

        let recipients = override_list.unwrap_or(&self.default);
        if recipients.is_empty() {
            None
        } else {
            Some(recipients.as_slice())
        }
    }
}
