//! # facture-match
//!
//! The matching and categorization engine: converts raw extracted line text
//! into normalized names, weighted category scores, and tiered exact/fuzzy
//! product matches with calibrated confidence.
//!
//! All computation here is synchronous and pure; the only async surface is
//! the [`engine`] module's catalog lookups through the
//! `facture_core::CatalogRepository` seam.

pub mod engine;
pub mod normalize;
pub mod scoring;
pub mod similarity;
pub mod template;

pub use engine::{MatchEngine, MatchOutcome};
pub use normalize::normalize;
pub use scoring::{
    category_scores, frequency_map, round2, rules_by_keyword, score_keywords,
    select_top_categories, top_keywords_for_persistence, CategoryScore,
};
pub use similarity::token_set_ratio;
pub use template::{detect_template, extract, template_config, TemplateConfig};
