//! Plain-text document reader.
//!
//! Reads invoice documents as UTF-8 text from a base directory and runs
//! vendor template detection on the content. PDF and OCR acquisition live
//! behind other `DocumentReader` implementations; this one covers text
//! exports and test fixtures.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use facture_core::{DocumentReadResponse, DocumentReader, TemplateId};
use facture_match::detect_template;

/// Reader resolving `source_ref` against a local base directory.
pub struct PlainTextReader {
    base_dir: PathBuf,
}

impl PlainTextReader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a source reference, rejecting refs that escape the base
    /// directory.
    fn resolve(&self, source_ref: &str) -> Option<PathBuf> {
        let relative = Path::new(source_ref);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        Some(self.base_dir.join(relative))
    }
}

#[async_trait]
impl DocumentReader for PlainTextReader {
    async fn read(
        &self,
        source_ref: &str,
        extract_all: bool,
        check_template: bool,
    ) -> DocumentReadResponse {
        let Some(path) = self.resolve(source_ref) else {
            return DocumentReadResponse::failure(source_ref, "Invalid document reference");
        };

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                return DocumentReadResponse::failure(
                    source_ref,
                    format!("Failed to read document: {e}"),
                );
            }
        };

        // Form feeds delimit pages in text exports.
        let page_count = text.split('\u{c}').count() as u32;

        let template = if check_template {
            detect_template(&text)
        } else {
            TemplateId::Unknown
        };

        debug!(
            subsystem = "worker",
            component = "reader",
            source_ref,
            page_count,
            template = template.as_str(),
            "Document read"
        );

        DocumentReadResponse {
            source_ref: source_ref.to_string(),
            success: true,
            page_count: Some(page_count),
            full_text: extract_all.then_some(text),
            template,
            error_message: None,
        }
    }
}
