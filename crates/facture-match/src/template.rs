//! Vendor template registry, detection, and regex-driven line-item
//! extraction.
//!
//! Each recognized vendor layout carries an identification keyword set, a
//! minimum table-header set, a currency, and a single multiline regex with
//! named capture groups (`code`, `desc`, `qty`, `uom`, `price`, optionally
//! `amount`, `barcode`, `sku`).

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

use facture_core::{ExtractionStatus, NewLineItem, TemplateId};

/// Static configuration for one vendor template.
pub struct TemplateConfig {
    pub keywords: &'static [&'static str],
    pub table_headers: &'static [&'static str],
    pub currency: &'static str,
    pub pattern: &'static Lazy<Regex>,
}

static GULLI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?P<code>\S+)\s+(?P<desc>.+?)\s+(?P<qty>[\d,.]+)\s+(?P<uom>Box|kg|each|unit|Unit)\s+(?P<price>[\d,.]+)",
    )
    .expect("gulli pattern is valid")
});

static MAYERS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?P<ordered>\d+)\s+(?P<picked>\S+)\s+(?P<code>\S+)\s+(?P<desc>.+?)\s+(?P<qty>[\d,.]+)\s+(?P<uom>CTN|KG|EACH|PKT|UNIT|ctn|kg)\s+(?P<price>[\d,.]+)(?:.+?)\s+(?P<amount>[\d,.]+)$",
    )
    .expect("mayers pattern is valid")
});

static GULLI: TemplateConfig = TemplateConfig {
    keywords: &[
        "Gulli Food Distributors Pty Ltd",
        "34 662 338 123",
        "orders@gullifood.com.au",
    ],
    table_headers: &[
        "PRODUCT CODE",
        "DESCRIPTION",
        "QUANTITY",
        "UNIT PRICE",
        "DISC.%",
        "GST",
        "AMOUNT",
    ],
    currency: "AUD",
    pattern: &GULLI_PATTERN,
};

static MAYERS: TemplateConfig = TemplateConfig {
    keywords: &[
        "Arla Foods Mayer Australiar",
        "78167620706",
        "mayers.com.au",
    ],
    table_headers: &[
        "Ordere",
        "Picked",
        "Item Code",
        "Item Description",
        "Shipped Qty",
        "Unit Price",
        "Disc",
        "CD",
        "Net Price",
        "Line Total",
    ],
    currency: "AUD",
    pattern: &MAYERS_PATTERN,
};

/// Look up the configuration for a template. `Unknown` has none.
pub fn template_config(template: TemplateId) -> Option<&'static TemplateConfig> {
    match template {
        TemplateId::Gulli => Some(&GULLI),
        TemplateId::Mayers => Some(&MAYERS),
        TemplateId::Unknown => None,
    }
}

/// Minimum keyword hits required to accept a template.
const MIN_KEYWORD_HITS: usize = 2;

/// Minimum table-header hits required to accept a template.
const MIN_HEADER_HITS: usize = 3;

/// Detect the vendor template from page text.
///
/// A template is accepted only when at least two of its identification
/// keywords AND at least three of its table headers occur in the text
/// (case-insensitive substring match); otherwise `Unknown`.
pub fn detect_template(text: &str) -> TemplateId {
    if text.is_empty() {
        return TemplateId::Unknown;
    }

    let content = text.to_lowercase();

    for template in [TemplateId::Gulli, TemplateId::Mayers] {
        let config = match template_config(template) {
            Some(config) => config,
            None => continue,
        };

        let keyword_hits = config
            .keywords
            .iter()
            .filter(|kw| content.contains(&kw.to_lowercase()))
            .count();
        if keyword_hits < MIN_KEYWORD_HITS {
            continue;
        }

        let header_hits = config
            .table_headers
            .iter()
            .filter(|h| content.contains(&h.to_lowercase()))
            .count();
        if header_hits >= MIN_HEADER_HITS {
            return template;
        }
    }

    TemplateId::Unknown
}

/// Extract line items from full document text using the template's pattern.
///
/// Each regex match yields one item; a capture group that fails numeric
/// parsing skips just that match. An unknown template (or one without a
/// pattern) yields an empty list, which the caller treats as a job failure.
pub fn extract(full_text: &str, template: TemplateId, invoice_id: Uuid) -> Vec<NewLineItem> {
    let config = match template_config(template) {
        Some(config) => config,
        None => {
            warn!(
                subsystem = "match",
                component = "template",
                template = template.as_str(),
                "No configuration for template"
            );
            return Vec::new();
        }
    };

    let mut items = Vec::new();

    for caps in config.pattern.captures_iter(full_text) {
        let raw_name = caps
            .name("desc")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let quantity = match caps.name("qty").map(|m| m.as_str().parse::<f64>()) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(
                    subsystem = "match",
                    component = "template",
                    invoice_id = %invoice_id,
                    error = %e,
                    raw_name = %raw_name,
                    "Skipping line with unparseable quantity"
                );
                continue;
            }
            None => None,
        };

        let unit_price = match caps.name("price").map(|m| m.as_str().parse::<f64>()) {
            Some(Ok(v)) => Some(v),
            Some(Err(e)) => {
                warn!(
                    subsystem = "match",
                    component = "template",
                    invoice_id = %invoice_id,
                    error = %e,
                    raw_name = %raw_name,
                    "Skipping line with unparseable price"
                );
                continue;
            }
            None => None,
        };

        items.push(NewLineItem {
            invoice_id,
            raw_name,
            code: caps.name("code").map(|m| m.as_str().to_string()),
            barcode: caps.name("barcode").map(|m| m.as_str().to_string()),
            sku: caps.name("sku").map(|m| m.as_str().to_string()),
            quantity,
            unit_price,
            currency: Some(config.currency.to_string()),
            status: ExtractionStatus::Raw,
        });
    }

    items
}
