//! Brand/series/model allow-lists and per-series price ceilings.
//!
//! An empty allow-list places no restriction on that attribute. All matching
//! is case-insensitive.

use std::collections::HashMap;

use crate::catalog::Link;

/// One `SHOW_ONLY_MODELS` entry: a model name, optionally pinned to a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFilter {
    name: String,
    series: Option<String>,
}

impl ModelFilter {
    /// Creates a filter; names are trimmed and lowercased.
    pub fn new(name: &str, series: Option<&str>) -> Self {
        ModelFilter {
            name: name.trim().to_lowercase(),
            series: series.map(|s| s.trim().to_lowercase()),
        }
    }

    /// Model name, lowercased
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Series the model is pinned to, if any
    pub fn series(&self) -> Option<&str> {
        self.series.as_deref()
    }

    fn matches(&self, link: &Link) -> bool {
        self.name.eq_ignore_ascii_case(&link.model)
            && self
                .series
                .as_deref()
                .map_or(true, |series| series.eq_ignore_ascii_case(&link.series))
    }
}

impl std::fmt::Display for ModelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.series {
            Some(series) => write!(f, "{} ({})", self.name, series),
            None => f.write_str(&self.name),
        }
    }
}

/// Global alert filters applied to every link.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    brands: Vec<String>,
    series: Vec<String>,
    models: Vec<ModelFilter>,
}

impl FilterSet {
    /// Creates a filter set. Empty lists allow everything.
    pub fn new(brands: Vec<String>, series: Vec<String>, models: Vec<ModelFilter>) -> Self {
        FilterSet {
            brands: brands.into_iter().map(|b| b.trim().to_lowercase()).collect(),
            series: series.into_iter().map(|s| s.trim().to_lowercase()).collect(),
            models,
        }
    }

    /// True when no allow-list is set.
    pub fn is_unrestricted(&self) -> bool {
        self.brands.is_empty() && self.series.is_empty() && self.models.is_empty()
    }

    /// Whether the link's brand is allowed
    pub fn matches_brand(&self, link: &Link) -> bool {
        allows(&self.brands, &link.brand)
    }

    /// Whether the link's series is allowed
    pub fn matches_series(&self, link: &Link) -> bool {
        allows(&self.series, &link.series)
    }

    /// Whether the link's model is allowed, honouring series pins
    pub fn matches_model(&self, link: &Link) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m.matches(link))
    }

    /// Brand, series and model filters combined. Price is checked separately
    /// because it is only known after a check.
    pub fn matches(&self, link: &Link) -> bool {
        self.matches_brand(link) && self.matches_series(link) && self.matches_model(link)
    }

    /// Allowed brands, lowercased
    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    /// Allowed series, lowercased
    pub fn series(&self) -> &[String] {
        &self.series
    }

    /// Allowed models
    pub fn models(&self) -> &[ModelFilter] {
        &self.models
    }
}

fn allows(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value))
}

/// Maximum acceptable price per series.
#[derive(Debug, Clone, Default)]
pub struct PriceCeilings(HashMap<String, f64>);

impl PriceCeilings {
    /// Builds ceilings from `(series, amount)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, f64)>) -> Self {
        PriceCeilings(
            entries
                .into_iter()
                .map(|(series, amount)| (series.to_lowercase(), amount))
                .collect(),
        )
    }

    /// Ceiling for a series; a configured 0 counts as no ceiling.
    pub fn for_series(&self, series: &str) -> Option<f64> {
        self.0
            .get(&series.to_lowercase())
            .copied()
            .filter(|amount| *amount > 0.0)
    }

    /// True when no ceiling is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether an observed price is acceptable.
///
/// No ceiling accepts everything. An unknown price is accepted too, since the
/// stock signal is still worth reporting.
pub fn within_ceiling(ceiling: Option<f64>, price: Option<f64>) -> bool {
    match (ceiling, price) {
        (Some(ceiling), Some(price)) => price <= ceiling,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(brand: &str, series: &str, model: &str) -> Link {
        Link {
            target: "bestbuy".into(),
            brand: brand.into(),
            series: series.into(),
            model: model.into(),
            url: "https://example.com/p/1".into(),
            price_ceiling: None,
        }
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let filters = FilterSet::default();
        assert!(filters.is_unrestricted());
        assert!(filters.matches(&link("asus", "3080", "tuf")));
        assert!(filters.matches(&link("", "", "")));
    }

    #[test]
    fn test_brand_allow_list_restricts() {
        let filters = FilterSet::new(vec!["ASUS".into()], vec![], vec![]);
        assert!(filters.matches(&link("asus", "3080", "tuf")));
        assert!(!filters.matches(&link("evga", "3080", "ftw3")));
    }

    #[test]
    fn test_series_allow_list_restricts() {
        let filters = FilterSet::new(vec![], vec!["3080".into(), "3090".into()], vec![]);
        assert!(filters.matches(&link("asus", "3090", "strix")));
        assert!(!filters.matches(&link("asus", "3070", "dual")));
    }

    #[test]
    fn test_model_filter_with_and_without_series() {
        let filters = FilterSet::new(
            vec![],
            vec![],
            vec![
                ModelFilter::new("founders edition", Some("3080")),
                ModelFilter::new("TUF", None),
            ],
        );
        assert!(filters.matches(&link("nvidia", "3080", "Founders Edition")));
        assert!(!filters.matches(&link("nvidia", "3070", "founders edition")));
        assert!(filters.matches(&link("asus", "3070", "tuf")));
        assert!(!filters.matches(&link("asus", "3070", "dual")));
    }

    #[test]
    fn test_model_filter_display() {
        assert_eq!(
            ModelFilter::new("founders edition", Some("3080")).to_string(),
            "founders edition (3080)"
        );
        assert_eq!(ModelFilter::new("tuf", None).to_string(), "tuf");
    }

    #[test]
    fn test_price_ceilings() {
        let ceilings = PriceCeilings::from_entries(vec![
            ("3080".to_string(), 799.0),
            ("3070".to_string(), 0.0),
        ]);
        assert_eq!(ceilings.for_series("3080"), Some(799.0));
        assert_eq!(ceilings.for_series("3070"), None);
        assert_eq!(ceilings.for_series("3090"), None);
    }

    #[test]
    fn test_within_ceiling() {
        assert!(within_ceiling(None, Some(10_000.0)));
        assert!(within_ceiling(Some(800.0), Some(799.99)));
        assert!(within_ceiling(Some(800.0), Some(800.0)));
        assert!(!within_ceiling(Some(800.0), Some(800.01)));
        assert!(within_ceiling(Some(800.0), None));
    }
}
