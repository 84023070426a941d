//! Core data models for facture.
//!
//! These types are shared across all facture crates and represent the
//! domain entities of the invoice matching pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// INVOICE JOB
// =============================================================================

/// Status of an invoice job in the queue.
///
/// Statuses only move forward along
/// `Pending -> Processing -> {Extracted -> Matched | Failed}`; any stage may
/// fail. The ordering discipline is enforced by the worker executor, not by
/// the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Processing,
    Extracted,
    Matched,
    Failed,
}

impl InvoiceStatus {
    /// Database representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Processing => "PROCESSING",
            InvoiceStatus::Extracted => "EXTRACTED",
            InvoiceStatus::Matched => "MATCHED",
            InvoiceStatus::Failed => "FAILED",
        }
    }

    /// Parse a database status string. Unknown values map to `Pending`.
    pub fn parse(s: &str) -> Self {
        match s {
            "PROCESSING" => InvoiceStatus::Processing,
            "EXTRACTED" => InvoiceStatus::Extracted,
            "MATCHED" => InvoiceStatus::Matched,
            "FAILED" => InvoiceStatus::Failed,
            _ => InvoiceStatus::Pending,
        }
    }

    /// Whether this status is terminal for the worker loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Matched | InvoiceStatus::Failed)
    }
}

/// An uploaded invoice awaiting (or having finished) processing.
///
/// Rows are created externally by the upload surface; the worker only
/// advances `status`, `error_message` and `updated_at`. Never deleted by the
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceJob {
    pub invoice_id: Uuid,
    pub original_file_name: String,
    pub file_type: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Document location relative to the configured document base.
    pub source_ref: String,
    pub status: InvoiceStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// LINE ITEMS
// =============================================================================

/// Progress of a single extracted line item through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionStatus {
    Raw,
    Normalized,
    Categorized,
    Matched,
    ReviewRequired,
    Unmatched,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Raw => "RAW",
            ExtractionStatus::Normalized => "NORMALIZED",
            ExtractionStatus::Categorized => "CATEGORIZED",
            ExtractionStatus::Matched => "MATCHED",
            ExtractionStatus::ReviewRequired => "REVIEW_REQUIRED",
            ExtractionStatus::Unmatched => "UNMATCHED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "NORMALIZED" => ExtractionStatus::Normalized,
            "CATEGORIZED" => ExtractionStatus::Categorized,
            "MATCHED" => ExtractionStatus::Matched,
            "REVIEW_REQUIRED" => ExtractionStatus::ReviewRequired,
            "UNMATCHED" => ExtractionStatus::Unmatched,
            _ => ExtractionStatus::Raw,
        }
    }
}

/// A line item parsed from a document, before it has a database identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub invoice_id: Uuid,
    pub raw_name: String,
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub status: ExtractionStatus,
}

/// A persisted line item (post bulk-insert, ids assigned in input order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub raw_name: String,
    pub normalized_name: Option<String>,
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub status: ExtractionStatus,
}

// =============================================================================
// MATCHING
// =============================================================================

/// How a line item was matched to a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Manual,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "EXACT",
            MatchType::Fuzzy => "FUZZY",
            MatchType::Manual => "MANUAL",
            MatchType::None => "NONE",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "EXACT" => MatchType::Exact,
            "FUZZY" => MatchType::Fuzzy,
            "MANUAL" => MatchType::Manual,
            _ => MatchType::None,
        }
    }
}

/// Confidence thresholds governing match acceptance.
///
/// Values are inclusive lower bounds for their tier.
pub mod thresholds {
    /// Identifier matches are always confidence 1.0.
    pub const EXACT: f64 = 1.0;
    /// At or above this similarity a fuzzy match is accepted automatically.
    pub const AUTO_MATCH: f64 = 0.8;
    /// At or above this similarity (but below AUTO_MATCH) a fuzzy match is
    /// surfaced for human review.
    pub const REVIEW: f64 = 0.6;
    /// Below REVIEW a candidate is discarded entirely.
    pub const NONE: f64 = 0.0;
}

/// Tier classification for a fuzzy-match confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Confidence >= 0.8: promote to an authoritative match.
    AutoMatch,
    /// 0.6 <= confidence < 0.8: requires human review.
    Review,
    /// Confidence < 0.6: rejected.
    None,
}

impl MatchTier {
    /// Classify a similarity score into its tier.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= thresholds::AUTO_MATCH {
            MatchTier::AutoMatch
        } else if confidence >= thresholds::REVIEW {
            MatchTier::Review
        } else {
            MatchTier::None
        }
    }
}

/// Up to three ranked category assignments with normalized contribution
/// ratios. Ratios across populated tiers sum to at most 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTiers {
    pub main_category: String,
    pub main_ratio: f64,
    pub second_category: Option<String>,
    pub second_ratio: Option<f64>,
    pub third_category: Option<String>,
    pub third_ratio: Option<f64>,
}

/// Outcome of running the match engine over one line item.
///
/// Carries exactly the fields the match-stage bulk update writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub line_item_id: Uuid,
    pub normalized_name: Option<String>,
    pub tiers: Option<CategoryTiers>,
    pub matched_product_id: Option<Uuid>,
    pub match_type: MatchType,
    pub confidence: Option<f64>,
    pub match_reason: Option<String>,
    pub status: ExtractionStatus,
}

/// A sub-threshold or alternative fuzzy match surfaced for human review.
///
/// Ephemeral and not authoritative; the display names are diagnostics only
/// and are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub line_item_id: Uuid,
    pub product_id: Uuid,
    pub confidence: f64,
    pub match_type: MatchType,
    pub match_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}

// =============================================================================
// DICTIONARY & KEYWORDS
// =============================================================================

/// Role a keyword plays within its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordType {
    Primary,
    Secondary,
    Ingredient,
}

impl KeywordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordType::Primary => "PRIMARY",
            KeywordType::Secondary => "SECONDARY",
            KeywordType::Ingredient => "INGREDIENT",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "SECONDARY" => KeywordType::Secondary,
            "INGREDIENT" => KeywordType::Ingredient,
            _ => KeywordType::Primary,
        }
    }
}

/// Origin of a scored keyword row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeywordSource {
    Database,
    Extracted,
    Added,
}

impl KeywordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordSource::Database => "DATABASE",
            KeywordSource::Extracted => "EXTRACTED",
            KeywordSource::Added => "ADDED",
        }
    }
}

/// One category-dictionary rule: a weighted keyword owned by a category.
///
/// Reference data, immutable during a run; loaded once per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryRule {
    pub id: Uuid,
    pub category_code: String,
    pub category_name: String,
    pub keyword: String,
    pub weight: f64,
    pub keyword_type: KeywordType,
    pub is_active: bool,
}

/// A scored token derived from a line item's normalized name, written for
/// downstream analytics. Upserted keyed by (line item, keyword).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub line_item_id: Uuid,
    pub keyword: String,
    /// Always in (0, 1.0].
    pub score: f64,
    pub source: KeywordSource,
}

// =============================================================================
// CATALOG
// =============================================================================

/// A catalog product; read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: Option<String>,
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
}

/// Lightweight (id, name) projection used as a fuzzy-match candidate pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyCandidate {
    pub id: Uuid,
    pub name: String,
}

// =============================================================================
// DOCUMENTS & EVENTS
// =============================================================================

/// Vendor template identifier for a recognized invoice layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateId {
    Gulli,
    Mayers,
    Unknown,
}

impl TemplateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Gulli => "GULLI",
            TemplateId::Mayers => "MAYERS",
            TemplateId::Unknown => "UNKNOWN",
        }
    }
}

/// Response from a document reader.
///
/// Errors are carried inside the response rather than as a `Result`; the
/// executor treats `success == false` or an unknown template as a hard
/// failure for the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReadResponse {
    pub source_ref: String,
    pub success: bool,
    pub page_count: Option<u32>,
    pub full_text: Option<String>,
    pub template: TemplateId,
    pub error_message: Option<String>,
}

impl DocumentReadResponse {
    /// Build a failure response with the given message.
    pub fn failure(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            success: false,
            page_count: None,
            full_text: None,
            template: TemplateId::Unknown,
            error_message: Some(message.into()),
        }
    }
}

/// An insert event delivered by a push-mode event source.
///
/// Delivery is at-least-once and possibly-missed; consumers must reconcile
/// with a periodic drain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceInsertEvent {
    pub event_type: String,
    pub status: Option<InvoiceStatus>,
    pub invoice_id: Option<Uuid>,
}

impl InvoiceInsertEvent {
    /// Whether this event announces a newly pending invoice worth draining
    /// the queue for.
    pub fn is_new_pending(&self) -> bool {
        self.event_type == "INSERT" && self.status == Some(InvoiceStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_status_roundtrip() {
        for status in [
            InvoiceStatus::Pending,
            InvoiceStatus::Processing,
            InvoiceStatus::Extracted,
            InvoiceStatus::Matched,
            InvoiceStatus::Failed,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_invoice_status_unknown_falls_back_to_pending() {
        assert_eq!(InvoiceStatus::parse("NONSENSE"), InvoiceStatus::Pending);
    }

    #[test]
    fn test_invoice_status_terminal() {
        assert!(InvoiceStatus::Matched.is_terminal());
        assert!(InvoiceStatus::Failed.is_terminal());
        assert!(!InvoiceStatus::Processing.is_terminal());
        assert!(!InvoiceStatus::Pending.is_terminal());
    }

    #[test]
    fn test_extraction_status_roundtrip() {
        for status in [
            ExtractionStatus::Raw,
            ExtractionStatus::Normalized,
            ExtractionStatus::Categorized,
            ExtractionStatus::Matched,
            ExtractionStatus::ReviewRequired,
            ExtractionStatus::Unmatched,
        ] {
            assert_eq!(ExtractionStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_match_tier_boundaries() {
        // Thresholds are inclusive lower bounds.
        assert_eq!(MatchTier::from_confidence(1.0), MatchTier::AutoMatch);
        assert_eq!(MatchTier::from_confidence(0.80), MatchTier::AutoMatch);
        assert_eq!(MatchTier::from_confidence(0.79), MatchTier::Review);
        assert_eq!(MatchTier::from_confidence(0.60), MatchTier::Review);
        assert_eq!(MatchTier::from_confidence(0.59), MatchTier::None);
        assert_eq!(MatchTier::from_confidence(0.0), MatchTier::None);
    }

    #[test]
    fn test_insert_event_new_pending() {
        let event = InvoiceInsertEvent {
            event_type: "INSERT".to_string(),
            status: Some(InvoiceStatus::Pending),
            invoice_id: Some(Uuid::new_v4()),
        };
        assert!(event.is_new_pending());

        let update = InvoiceInsertEvent {
            event_type: "UPDATE".to_string(),
            status: Some(InvoiceStatus::Pending),
            invoice_id: None,
        };
        assert!(!update.is_new_pending());

        let processing = InvoiceInsertEvent {
            event_type: "INSERT".to_string(),
            status: Some(InvoiceStatus::Processing),
            invoice_id: None,
        };
        assert!(!processing.is_new_pending());
    }

    #[test]
    fn test_document_read_response_failure() {
        let resp = DocumentReadResponse::failure("inv/001.txt", "File not found");
        assert!(!resp.success);
        assert_eq!(resp.template, TemplateId::Unknown);
        assert_eq!(resp.error_message.as_deref(), Some("File not found"));
        assert!(resp.full_text.is_none());
    }

    #[test]
    fn test_status_serde_screaming_snake() {
        let s = serde_json::to_string(&InvoiceStatus::Pending).unwrap();
        assert_eq!(s, "\"PENDING\"");
        let s = serde_json::to_string(&ExtractionStatus::ReviewRequired).unwrap();
        assert_eq!(s, "\"REVIEW_REQUIRED\"");
    }
}
