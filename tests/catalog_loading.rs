//! Catalog loading from disk: selection, timing layers, proxies and filters.

use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tempfile::TempDir;

use stock_watch::catalog::{Catalog, CatalogFile};
use stock_watch::config::{MonitorConfig, Opt};
use stock_watch::error_handling::ConfigurationError;

const CATALOG: &str = r#"{
  "targets": [
    {
      "name": "BestBuy",
      "min_delay_ms": 7000,
      "max_delay_ms": 9000,
      "selectors": { "in_stock": { "container": ".add-to-cart" } },
      "links": [
        { "brand": "nvidia", "series": "3080", "model": "founders edition",
          "url": "https://www.bestbuy.com/site/6429440.p" },
        { "brand": "asus", "series": "3090", "model": "strix",
          "url": "https://www.bestbuy.com/site/6432445.p" }
      ]
    },
    {
      "name": "newegg",
      "concurrency_limit": 2,
      "links": [
        { "brand": "evga", "series": "3070", "model": "ftw3",
          "url": "https://www.newegg.com/p/N82E16814487530" }
      ]
    },
    {
      "name": "evga",
      "links": [ { "brand": "evga", "series": "3080", "model": "xc3",
                   "url": "https://www.evga.com/products/product.aspx?pn=10G-P5-3883-KR" } ]
    }
  ],
  "channels": [ { "type": "log" } ]
}"#;

fn write_catalog(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("catalog.json");
    fs::write(&path, contents).expect("Failed to write catalog");
    path
}

fn config(catalog: &Path, proxy_dir: &Path, extra: &[&str]) -> MonitorConfig {
    let mut args = vec![
        "stock_watch".to_string(),
        catalog.display().to_string(),
        "--renotify-interval".to_string(),
        "600".to_string(),
        "--proxy-dir".to_string(),
        proxy_dir.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    MonitorConfig::from_opt(&Opt::try_parse_from(args).expect("Failed to parse args"))
        .expect("Invalid config")
}

fn load(config: &MonitorConfig) -> Result<Catalog, ConfigurationError> {
    let file = CatalogFile::read(&config.catalog_path)?;
    Catalog::build(&file, config)
}

#[test]
fn test_load_every_target_when_no_stores_given() {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let config = config(&path, dir.path(), &[]);

    let catalog = load(&config).unwrap();

    let names: Vec<&str> = catalog.targets().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["bestbuy", "newegg", "evga"]);
    assert_eq!(catalog.link_count(), 4);
    assert_eq!(config.renotify_interval, Some(Duration::from_secs(600)));

    let bestbuy = catalog.target("bestbuy").unwrap();
    assert_eq!(bestbuy.timing.min_delay, Duration::from_millis(7_000));
    assert_eq!(bestbuy.timing.max_delay, Duration::from_millis(9_000));
    assert!(bestbuy.selectors.is_some());
    assert_eq!(catalog.target("newegg").unwrap().concurrency_limit, 2);
}

#[test]
fn test_stores_select_and_override_delays() {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let config = config(
        &path,
        dir.path(),
        &["--stores", "newegg:2000:3000,microcenter"],
    );

    let catalog = load(&config).unwrap();

    assert_eq!(catalog.targets().len(), 1);
    let newegg = catalog.target("newegg").unwrap();
    assert_eq!(newegg.timing.min_delay, Duration::from_millis(2_000));
    assert_eq!(newegg.timing.max_delay, Duration::from_millis(3_000));
    // Backoff still comes from the defaults
    assert_eq!(newegg.timing.min_backoff, config.default_timing.min_backoff);
}

#[test]
fn test_unknown_stores_only_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let config = config(&path, dir.path(), &["--stores", "microcenter"]);

    assert!(matches!(load(&config), Err(ConfigurationError::NoTargets)));
}

#[test]
fn test_proxy_files_with_global_fallback() {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    fs::write(
        dir.path().join("bestbuy.proxies"),
        "# residential\nhttp://10.0.0.1:8080\n\nhttp://10.0.0.2:8080\n",
    )
    .unwrap();
    fs::write(dir.path().join("global.proxies"), "http://10.0.0.9:3128\n").unwrap();
    let config = config(&path, dir.path(), &[]);

    let catalog = load(&config).unwrap();

    assert_eq!(
        catalog.target("bestbuy").unwrap().proxies.as_deref(),
        Some(&["http://10.0.0.1:8080".to_string(), "http://10.0.0.2:8080".to_string()][..])
    );
    assert_eq!(
        catalog.target("newegg").unwrap().proxies.as_deref(),
        Some(&["http://10.0.0.9:3128".to_string()][..])
    );
}

#[test]
fn test_price_ceiling_attached_to_series_links() {
    let dir = TempDir::new().unwrap();
    let path = write_catalog(dir.path(), CATALOG);
    let config = config(&path, dir.path(), &["--max-price-series", "3080:800,3090:0"]);

    let catalog = load(&config).unwrap();

    for (_, link) in catalog.links() {
        match link.series.as_str() {
            "3080" => assert_eq!(link.price_ceiling, Some(800.0)),
            _ => assert_eq!(link.price_ceiling, None),
        }
    }
}

#[test]
fn test_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    let config = config(&missing, dir.path(), &[]);

    let err = load(&config).unwrap_err();
    assert!(matches!(err, ConfigurationError::CatalogRead { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_malformed_catalog_rejected() {
    let dir = TempDir::new().unwrap();
    for contents in [
        "{ not json",
        r#"{"targets":[{"name":"a","links":[{"url":""}]}]}"#,
        r#"{"targets":[{"name":"a","links":[]}],"channels":[{"type":"pager"}]}"#,
        r#"{"targets":[],"surprise":true}"#,
    ] {
        let path = write_catalog(dir.path(), contents);
        let config = config(&path, dir.path(), &[]);
        assert!(load(&config).is_err(), "accepted: {contents}");
    }
}
