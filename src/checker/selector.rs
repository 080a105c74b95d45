//! Built-in adapter for sites whose stock state is visible in static HTML.
//!
//! Driven by the `selectors` block of a catalog target: CSS containers for
//! the in-stock, out-of-stock and CAPTCHA markers, plus an optional price
//! element.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::catalog::{PageLabel, SelectorLabels};
use crate::checker::{Adapter, Extraction};
use crate::config::MAX_PAGE_BODY_SIZE;
use crate::error_handling::{categorize_reqwest_error, categorize_status, AdapterError};

/// Parses a CSS selector, falling back to one that matches nothing.
fn parse_selector_with_fallback(selector_str: &str, context: &str) -> Selector {
    Selector::parse(selector_str).unwrap_or_else(|e| {
        log::error!(
            "Failed to parse CSS selector '{}' in {}: {}. Using fallback selector.",
            selector_str,
            context,
            e
        );
        // Known-valid selector that matches nothing
        Selector::parse("*:not(*)").expect("fallback selector '*:not(*)' always parses")
    })
}

#[derive(Debug)]
struct CompiledLabel {
    container: Selector,
    text: Vec<String>,
}

impl CompiledLabel {
    fn compile(label: &PageLabel, context: &str) -> Self {
        CompiledLabel {
            container: parse_selector_with_fallback(&label.container, context),
            text: label.text.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    fn matches(&self, document: &Html) -> bool {
        document.select(&self.container).any(|element| {
            if self.text.is_empty() {
                return true;
            }
            let content = element_text(&element).to_lowercase();
            self.text.iter().any(|fragment| content.contains(fragment))
        })
    }
}

#[derive(Debug)]
struct CompiledLabels {
    in_stock: Option<CompiledLabel>,
    out_of_stock: Option<CompiledLabel>,
    captcha: Option<CompiledLabel>,
    price: Option<Selector>,
}

impl CompiledLabels {
    fn compile(labels: &SelectorLabels, target: &str) -> Self {
        let context = format!("{target} selectors");
        CompiledLabels {
            in_stock: labels.in_stock.as_ref().map(|l| CompiledLabel::compile(l, &context)),
            out_of_stock: labels
                .out_of_stock
                .as_ref()
                .map(|l| CompiledLabel::compile(l, &context)),
            captcha: labels.captcha.as_ref().map(|l| CompiledLabel::compile(l, &context)),
            price: labels
                .price
                .as_deref()
                .map(|p| parse_selector_with_fallback(p, &context)),
        }
    }
}

/// Fetches pages with `reqwest` and reads them with `scraper`.
pub struct SelectorAdapter {
    labels: CompiledLabels,
    client: Arc<reqwest::Client>,
    user_agent: String,
    /// One client per proxy, built on first use
    proxy_clients: Mutex<HashMap<String, reqwest::Client>>,
}

impl SelectorAdapter {
    /// Compiles the target's selectors. Unparsable selectors are logged and
    /// replaced by one that matches nothing.
    pub fn new(target: &str, labels: &SelectorLabels, client: Arc<reqwest::Client>, user_agent: &str) -> Self {
        SelectorAdapter {
            labels: CompiledLabels::compile(labels, target),
            client,
            user_agent: user_agent.to_string(),
            proxy_clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<reqwest::Client, AdapterError> {
        let Some(proxy) = proxy else {
            return Ok(self.client.as_ref().clone());
        };

        let mut clients = self
            .proxy_clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(proxy) {
            return Ok(client.clone());
        }

        let proxy_config = reqwest::Proxy::all(proxy)
            .map_err(|e| AdapterError::NetworkFailure(format!("invalid proxy {proxy}: {e}")))?;
        let client = reqwest::Client::builder()
            .proxy(proxy_config)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| AdapterError::NetworkFailure(format!("proxy client for {proxy}: {e}")))?;
        clients.insert(proxy.to_string(), client.clone());
        Ok(client)
    }

    /// Reads stock state and price out of a page.
    fn extract(&self, html: &str) -> Result<Extraction, AdapterError> {
        let document = Html::parse_document(html);

        if self.labels.captcha.as_ref().is_some_and(|l| l.matches(&document)) {
            return Err(AdapterError::CaptchaPage);
        }

        let price = self.labels.price.as_ref().and_then(|selector| {
            document
                .select(selector)
                .next()
                .and_then(|element| parse_price(&element_text(&element)))
        });

        let in_stock_hit = self.labels.in_stock.as_ref().map(|l| l.matches(&document));
        let out_of_stock_hit = self.labels.out_of_stock.as_ref().map(|l| l.matches(&document));

        let in_stock = match (in_stock_hit, out_of_stock_hit) {
            (_, Some(true)) => false,
            (Some(true), _) => true,
            // Only one marker configured: its absence decides
            (Some(false), None) => false,
            (None, Some(false)) => true,
            (Some(false), Some(false)) => {
                return Err(AdapterError::ParseAmbiguous(
                    "neither in-stock nor out-of-stock marker found".to_string(),
                ))
            }
            (None, None) => {
                return Err(AdapterError::ParseAmbiguous(
                    "no stock markers configured".to_string(),
                ))
            }
        };

        if document.root_element().text().all(|t| t.trim().is_empty()) {
            return Err(AdapterError::ParseAmbiguous("empty page".to_string()));
        }

        Ok(Extraction { in_stock, price })
    }
}

#[async_trait::async_trait]
impl Adapter for SelectorAdapter {
    async fn fetch_and_extract(
        &self,
        url: &str,
        proxy: Option<&str>,
        timeout: Duration,
    ) -> Result<Extraction, AdapterError> {
        let client = self.client_for(proxy)?;
        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        if let Some(error) = categorize_status(response.status().as_u16()) {
            return Err(error);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;
        if body.len() > MAX_PAGE_BODY_SIZE {
            return Err(AdapterError::ParseAmbiguous(format!(
                "page larger than {MAX_PAGE_BODY_SIZE} bytes"
            )));
        }

        self.extract(&String::from_utf8_lossy(&body))
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// Pulls the first number out of a displayed price (`$1,299.99` -> 1299.99).
fn parse_price(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}
