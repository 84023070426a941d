//! The match engine.
//!
//! Orchestrates the per-invoice matching stage: exact identifier lookups
//! first, then normalization, keyword scoring, category selection and fuzzy
//! name matching against the category-restricted catalog pool. Produces one
//! `MatchResult` per line item plus the review candidates and scored
//! keywords to persist alongside.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use facture_core::{
    thresholds, CatalogProduct, CatalogRepository, DictionaryRule, ExtractionStatus, LineItem,
    MatchCandidate, MatchResult, MatchTier, MatchType, Result, ScoredKeyword,
};

use crate::normalize::normalize;
use crate::scoring::{
    category_scores, frequency_map, round2, rules_by_keyword, score_keywords,
    select_top_categories, top_keywords_for_persistence,
};
use crate::similarity::token_set_ratio;

const REASON_EXACT_BARCODE: &str = "Exact barcode match";
const REASON_EXACT_SKU: &str = "Exact SKU match";
const REASON_EXACT_CODE: &str = "Exact product code match";
const REASON_FUZZY_AUTO: &str = "Fuzzy match by name & category";
const REASON_FUZZY_REVIEW: &str = "High similarity, needs human check";
const REASON_NO_CANDIDATES: &str = "Categorized but no products matched > 60%";
const REASON_UNCATEGORIZED: &str = "No exact match and could not categorize";

/// Everything the matching stage produced for one invoice, ready for a
/// single atomic persistence call.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub results: Vec<MatchResult>,
    pub candidates: Vec<MatchCandidate>,
    pub keywords: Vec<ScoredKeyword>,
}

/// Stateless matcher over one invoice's line items.
pub struct MatchEngine;

impl MatchEngine {
    pub fn new() -> Self {
        Self
    }

    /// Match every line item of an invoice.
    ///
    /// Catalog identifier lookups are batched into a single query across the
    /// whole invoice; category candidate pools are fetched per item. Exact
    /// identifier matches win outright in barcode, SKU, code priority order
    /// and never enter the fuzzy path.
    pub async fn run(
        &self,
        items: &[LineItem],
        rules: &[DictionaryRule],
        catalog: &dyn CatalogRepository,
    ) -> Result<MatchOutcome> {
        let identifiers = IdentifierIndex::fetch(items, catalog).await?;
        let frequency = frequency_map(rules);
        let rules_map = rules_by_keyword(rules);

        let mut outcome = MatchOutcome::default();

        for item in items {
            let normalized = normalize(&item.raw_name);

            if let Some((product, reason)) = identifiers.exact_match(item) {
                debug!(
                    subsystem = "match",
                    component = "engine",
                    line_item_id = %item.id,
                    product_id = %product.id,
                    reason,
                    "Exact identifier match"
                );
                outcome.results.push(MatchResult {
                    line_item_id: item.id,
                    normalized_name: Some(normalized),
                    tiers: None,
                    matched_product_id: Some(product.id),
                    match_type: MatchType::Exact,
                    confidence: Some(thresholds::EXACT),
                    match_reason: Some(reason.to_string()),
                    status: ExtractionStatus::Matched,
                });
                continue;
            }

            let scored = score_keywords(item.id, &normalized, &frequency);
            outcome
                .keywords
                .extend(top_keywords_for_persistence(&scored));

            let totals = category_scores(&scored, &rules_map);
            let Some(tiers) = select_top_categories(&totals) else {
                debug!(
                    subsystem = "match",
                    component = "engine",
                    line_item_id = %item.id,
                    normalized_name = %normalized,
                    "No category signal"
                );
                outcome.results.push(MatchResult {
                    line_item_id: item.id,
                    normalized_name: Some(normalized),
                    tiers: None,
                    matched_product_id: None,
                    match_type: MatchType::None,
                    confidence: None,
                    match_reason: Some(REASON_UNCATEGORIZED.to_string()),
                    status: ExtractionStatus::Unmatched,
                });
                continue;
            };

            let mut category_codes = vec![tiers.main_category.clone()];
            category_codes.extend(tiers.second_category.iter().cloned());
            category_codes.extend(tiers.third_category.iter().cloned());

            let pool = catalog.by_categories(&category_codes).await?;

            // Tier thresholds apply to the raw similarity; rounding is for
            // persistence only.
            let mut ranked: Vec<(Uuid, String, f64)> = pool
                .into_iter()
                .filter_map(|candidate| {
                    let ratio = token_set_ratio(&normalized, &normalize(&candidate.name));
                    (MatchTier::from_confidence(ratio) != MatchTier::None)
                        .then(|| (candidate.id, candidate.name, ratio))
                })
                .collect();
            ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

            for (index, (product_id, product_name, ratio)) in ranked.iter().enumerate() {
                let reason = if index == 0
                    && MatchTier::from_confidence(*ratio) == MatchTier::AutoMatch
                {
                    REASON_FUZZY_AUTO
                } else {
                    REASON_FUZZY_REVIEW
                };
                outcome.candidates.push(MatchCandidate {
                    line_item_id: item.id,
                    product_id: *product_id,
                    confidence: round2(*ratio),
                    match_type: MatchType::Fuzzy,
                    match_reason: Some(reason.to_string()),
                    extracted_name: Some(normalized.clone()),
                    product_name: Some(product_name.clone()),
                });
            }

            let result = match ranked.first() {
                Some((product_id, _, ratio)) => {
                    // Ranked is pre-filtered, so the tier here is either
                    // AutoMatch or Review.
                    match MatchTier::from_confidence(*ratio) {
                        MatchTier::AutoMatch => MatchResult {
                            line_item_id: item.id,
                            normalized_name: Some(normalized),
                            tiers: Some(tiers),
                            matched_product_id: Some(*product_id),
                            match_type: MatchType::Fuzzy,
                            confidence: Some(round2(*ratio)),
                            match_reason: Some(REASON_FUZZY_AUTO.to_string()),
                            status: ExtractionStatus::Matched,
                        },
                        _ => MatchResult {
                            line_item_id: item.id,
                            normalized_name: Some(normalized),
                            tiers: Some(tiers),
                            matched_product_id: None,
                            match_type: MatchType::Fuzzy,
                            confidence: Some(round2(*ratio)),
                            match_reason: Some(REASON_FUZZY_REVIEW.to_string()),
                            status: ExtractionStatus::ReviewRequired,
                        },
                    }
                }
                None => MatchResult {
                    line_item_id: item.id,
                    normalized_name: Some(normalized),
                    tiers: Some(tiers),
                    matched_product_id: None,
                    match_type: MatchType::None,
                    confidence: None,
                    match_reason: Some(REASON_NO_CANDIDATES.to_string()),
                    status: ExtractionStatus::Categorized,
                },
            };
            outcome.results.push(result);
        }

        info!(
            subsystem = "match",
            component = "engine",
            item_count = items.len(),
            candidate_count = outcome.candidates.len(),
            matched = outcome
                .results
                .iter()
                .filter(|r| r.status == ExtractionStatus::Matched)
                .count(),
            "Matching stage complete"
        );

        Ok(outcome)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Catalog products indexed by their identifiers, fetched once per invoice.
struct IdentifierIndex {
    by_barcode: HashMap<String, CatalogProduct>,
    by_sku: HashMap<String, CatalogProduct>,
    by_code: HashMap<String, CatalogProduct>,
}

impl IdentifierIndex {
    async fn fetch(items: &[LineItem], catalog: &dyn CatalogRepository) -> Result<Self> {
        let codes: Vec<String> = items.iter().filter_map(|i| i.code.clone()).collect();
        let barcodes: Vec<String> = items.iter().filter_map(|i| i.barcode.clone()).collect();
        let skus: Vec<String> = items.iter().filter_map(|i| i.sku.clone()).collect();

        let products = if codes.is_empty() && barcodes.is_empty() && skus.is_empty() {
            Vec::new()
        } else {
            catalog.by_identifiers(&codes, &barcodes, &skus).await?
        };

        let mut index = Self {
            by_barcode: HashMap::new(),
            by_sku: HashMap::new(),
            by_code: HashMap::new(),
        };
        for product in products {
            if let Some(barcode) = &product.barcode {
                index.by_barcode.insert(barcode.clone(), product.clone());
            }
            if let Some(sku) = &product.sku {
                index.by_sku.insert(sku.clone(), product.clone());
            }
            if let Some(code) = &product.code {
                index.by_code.insert(code.clone(), product.clone());
            }
        }
        Ok(index)
    }

    /// The highest-priority exact identifier match for an item, if any.
    /// Priority is barcode, then SKU, then product code.
    fn exact_match(&self, item: &LineItem) -> Option<(&CatalogProduct, &'static str)> {
        if let Some(product) = item.barcode.as_ref().and_then(|b| self.by_barcode.get(b)) {
            return Some((product, REASON_EXACT_BARCODE));
        }
        if let Some(product) = item.sku.as_ref().and_then(|s| self.by_sku.get(s)) {
            return Some((product, REASON_EXACT_SKU));
        }
        if let Some(product) = item.code.as_ref().and_then(|c| self.by_code.get(c)) {
            return Some((product, REASON_EXACT_CODE));
        }
        None
    }
}
