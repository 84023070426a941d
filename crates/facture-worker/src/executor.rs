//! Per-job processing pipeline.
//!
//! Takes one claimed invoice through read, extract, match and persist.
//! Each stage commits its status before the next begins, so a crash leaves
//! the invoice at the last completed stage rather than half-way through
//! one.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use facture_core::{
    CatalogRepository, DictionaryRepository, DocumentReader, InvoiceJob, InvoiceQueue,
    InvoiceStatus, LineItemRepository, Result, TemplateId,
};
use facture_match::{extract, MatchEngine};

const ERR_NO_LINE_ITEMS: &str = "No line items extracted from the invoice";

/// Executes the full pipeline for one claimed invoice at a time.
pub struct JobExecutor {
    queue: Arc<dyn InvoiceQueue>,
    line_items: Arc<dyn LineItemRepository>,
    dictionary: Arc<dyn DictionaryRepository>,
    catalog: Arc<dyn CatalogRepository>,
    reader: Arc<dyn DocumentReader>,
    engine: MatchEngine,
}

impl JobExecutor {
    pub fn new(
        queue: Arc<dyn InvoiceQueue>,
        line_items: Arc<dyn LineItemRepository>,
        dictionary: Arc<dyn DictionaryRepository>,
        catalog: Arc<dyn CatalogRepository>,
        reader: Arc<dyn DocumentReader>,
    ) -> Self {
        Self {
            queue,
            line_items,
            dictionary,
            catalog,
            reader,
            engine: MatchEngine::new(),
        }
    }

    /// Process one claimed invoice to a terminal status.
    ///
    /// Pipeline failures are absorbed into a FAILED status on the invoice;
    /// an `Err` from this method means even that status write failed.
    pub async fn process(&self, job: &InvoiceJob) -> Result<()> {
        let start = Instant::now();
        info!(
            subsystem = "worker",
            component = "executor",
            invoice_id = %job.invoice_id,
            file_name = %job.original_file_name,
            "Processing invoice"
        );

        match self.run_pipeline(job).await {
            Ok(item_count) => {
                info!(
                    subsystem = "worker",
                    component = "executor",
                    invoice_id = %job.invoice_id,
                    item_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Invoice matched"
                );
                Ok(())
            }
            Err(message) => {
                warn!(
                    subsystem = "worker",
                    component = "executor",
                    invoice_id = %job.invoice_id,
                    error = %message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Invoice failed"
                );
                self.queue
                    .advance_status(job.invoice_id, InvoiceStatus::Failed, Some(&message))
                    .await
            }
        }
    }

    /// The fallible stages. Returns the number of line items on success and
    /// the failure message destined for the invoice row otherwise.
    async fn run_pipeline(&self, job: &InvoiceJob) -> std::result::Result<usize, String> {
        // Stage 1: read the document and identify the vendor template.
        let response = self.reader.read(&job.source_ref, true, true).await;
        if !response.success {
            return Err(response
                .error_message
                .unwrap_or_else(|| "Document read failed".to_string()));
        }
        if response.template == TemplateId::Unknown {
            return Err("Unrecognized invoice template".to_string());
        }
        let full_text = response.full_text.unwrap_or_default();

        // Stage 2: extract and persist line items, then commit EXTRACTED.
        let new_items = extract(&full_text, response.template, job.invoice_id);
        if new_items.is_empty() {
            return Err(ERR_NO_LINE_ITEMS.to_string());
        }

        let items = self
            .line_items
            .insert_batch(&new_items)
            .await
            .map_err(|e| format!("Failed to store line items: {e}"))?;
        self.queue
            .advance_status(job.invoice_id, InvoiceStatus::Extracted, None)
            .await
            .map_err(|e| format!("Failed to mark invoice extracted: {e}"))?;

        // Stage 3: match and persist atomically; MATCHED is written inside
        // the same transaction.
        let rules = self
            .dictionary
            .all_active()
            .await
            .map_err(|e| format!("Matching failed: {e}"))?;
        let outcome = self
            .engine
            .run(&items, &rules, self.catalog.as_ref())
            .await
            .map_err(|e| format!("Matching failed: {e}"))?;
        self.line_items
            .persist_match_stage(
                job.invoice_id,
                &outcome.results,
                &outcome.keywords,
                &outcome.candidates,
            )
            .await
            .map_err(|e| format!("Matching failed: {e}"))?;

        Ok(items.len())
    }

    /// Drain the queue: claim and process until no pending invoice remains.
    /// Returns how many invoices were processed.
    pub async fn drain(&self) -> usize {
        let mut processed = 0;
        loop {
            let job = match self.queue.claim_oldest_pending().await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    error!(
                        subsystem = "worker",
                        component = "executor",
                        error = %e,
                        "Failed to claim from queue"
                    );
                    break;
                }
            };

            if let Err(e) = self.process(&job).await {
                // The failure status itself could not be written; the row
                // stays PROCESSING for operators to inspect.
                error!(
                    subsystem = "worker",
                    component = "executor",
                    invoice_id = %job.invoice_id,
                    error = %e,
                    "Failed to record invoice failure"
                );
            }
            processed += 1;
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    use facture_core::{
        CatalogProduct, DictionaryRule, DocumentReadResponse, ExtractionStatus, FuzzyCandidate,
        LineItem, MatchCandidate, MatchResult, NewLineItem, ScoredKeyword,
    };

    const GULLI_PAGE: &str = "\
Gulli Food Distributors Pty Ltd
ABN 34 662 338 123  orders@gullifood.com.au
PRODUCT CODE  DESCRIPTION  QUANTITY  UNIT PRICE  DISC.%  GST  AMOUNT
GF001 Cheddar Cheese Block 2 kg 15.50
";

    #[derive(Default)]
    struct StubQueue {
        statuses: Mutex<Vec<(Uuid, InvoiceStatus, Option<String>)>>,
        pending: Mutex<Vec<InvoiceJob>>,
    }

    #[async_trait]
    impl InvoiceQueue for StubQueue {
        async fn claim_oldest_pending(&self) -> Result<Option<InvoiceJob>> {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_empty() {
                Ok(None)
            } else {
                Ok(Some(pending.remove(0)))
            }
        }

        async fn advance_status(
            &self,
            invoice_id: Uuid,
            status: InvoiceStatus,
            error_message: Option<&str>,
        ) -> Result<()> {
            self.statuses.lock().unwrap().push((
                invoice_id,
                status,
                error_message.map(str::to_string),
            ));
            Ok(())
        }

        async fn get(&self, _invoice_id: Uuid) -> Result<Option<InvoiceJob>> {
            Ok(None)
        }

        async fn pending_count(&self) -> Result<i64> {
            Ok(self.pending.lock().unwrap().len() as i64)
        }
    }

    #[derive(Default)]
    struct StubLineItems {
        persisted_match: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl LineItemRepository for StubLineItems {
        async fn insert_batch(&self, items: &[NewLineItem]) -> Result<Vec<LineItem>> {
            Ok(items
                .iter()
                .map(|item| LineItem {
                    id: Uuid::new_v4(),
                    invoice_id: item.invoice_id,
                    raw_name: item.raw_name.clone(),
                    normalized_name: None,
                    code: item.code.clone(),
                    barcode: item.barcode.clone(),
                    sku: item.sku.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    currency: item.currency.clone(),
                    status: item.status,
                })
                .collect())
        }

        async fn persist_match_stage(
            &self,
            invoice_id: Uuid,
            _results: &[MatchResult],
            _keywords: &[ScoredKeyword],
            _candidates: &[MatchCandidate],
        ) -> Result<()> {
            self.persisted_match.lock().unwrap().push(invoice_id);
            Ok(())
        }

        async fn list_for_invoice(&self, _invoice_id: Uuid) -> Result<Vec<LineItem>> {
            Ok(Vec::new())
        }
    }

    struct StubDictionary;

    #[async_trait]
    impl DictionaryRepository for StubDictionary {
        async fn all_active(&self) -> Result<Vec<DictionaryRule>> {
            Ok(Vec::new())
        }
    }

    struct StubCatalog;

    #[async_trait]
    impl CatalogRepository for StubCatalog {
        async fn by_identifiers(
            &self,
            _codes: &[String],
            _barcodes: &[String],
            _skus: &[String],
        ) -> Result<Vec<CatalogProduct>> {
            Ok(Vec::new())
        }

        async fn by_categories(&self, _codes: &[String]) -> Result<Vec<FuzzyCandidate>> {
            Ok(Vec::new())
        }
    }

    struct StubReader {
        text: Option<String>,
    }

    #[async_trait]
    impl DocumentReader for StubReader {
        async fn read(
            &self,
            source_ref: &str,
            extract_all: bool,
            check_template: bool,
        ) -> DocumentReadResponse {
            match &self.text {
                Some(text) => DocumentReadResponse {
                    source_ref: source_ref.to_string(),
                    success: true,
                    page_count: Some(1),
                    full_text: extract_all.then(|| text.clone()),
                    template: if check_template {
                        facture_match::detect_template(text)
                    } else {
                        TemplateId::Unknown
                    },
                    error_message: None,
                },
                None => DocumentReadResponse::failure(source_ref, "File not found"),
            }
        }
    }

    fn job() -> InvoiceJob {
        InvoiceJob {
            invoice_id: Uuid::new_v4(),
            original_file_name: "inv.txt".to_string(),
            file_type: "text/plain".to_string(),
            file_size: 64,
            source_ref: "inv.txt".to_string(),
            status: InvoiceStatus::Processing,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn executor_with(
        queue: Arc<StubQueue>,
        line_items: Arc<StubLineItems>,
        reader: StubReader,
    ) -> JobExecutor {
        JobExecutor::new(
            queue,
            line_items,
            Arc::new(StubDictionary),
            Arc::new(StubCatalog),
            Arc::new(reader),
        )
    }

    #[tokio::test]
    async fn test_happy_path_commits_extracted_then_persists_match() {
        let queue = Arc::new(StubQueue::default());
        let line_items = Arc::new(StubLineItems::default());
        let executor = executor_with(
            queue.clone(),
            line_items.clone(),
            StubReader {
                text: Some(GULLI_PAGE.to_string()),
            },
        );

        let job = job();
        executor.process(&job).await.unwrap();

        let statuses = queue.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].1, InvoiceStatus::Extracted);
        // MATCHED is written inside persist_match_stage, not via the queue.
        assert_eq!(
            line_items.persisted_match.lock().unwrap().as_slice(),
            &[job.invoice_id]
        );
    }

    #[tokio::test]
    async fn test_unreadable_document_fails_job() {
        let queue = Arc::new(StubQueue::default());
        let executor = executor_with(
            queue.clone(),
            Arc::new(StubLineItems::default()),
            StubReader { text: None },
        );

        executor.process(&job()).await.unwrap();

        let statuses = queue.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].1, InvoiceStatus::Failed);
        assert_eq!(statuses[0].2.as_deref(), Some("File not found"));
    }

    #[tokio::test]
    async fn test_no_line_items_fails_with_canonical_message() {
        // Detectable Gulli header block but no parseable item lines.
        let text = "\
Gulli Food Distributors Pty Ltd
ABN 34 662 338 123  orders@gullifood.com.au
PRODUCT CODE  DESCRIPTION  QUANTITY  UNIT PRICE  DISC.%  GST  AMOUNT
";
        let queue = Arc::new(StubQueue::default());
        let executor = executor_with(
            queue.clone(),
            Arc::new(StubLineItems::default()),
            StubReader {
                text: Some(text.to_string()),
            },
        );

        executor.process(&job()).await.unwrap();

        let statuses = queue.statuses.lock().unwrap();
        assert_eq!(statuses[0].1, InvoiceStatus::Failed);
        assert_eq!(
            statuses[0].2.as_deref(),
            Some("No line items extracted from the invoice")
        );
    }

    #[tokio::test]
    async fn test_unknown_template_fails_job() {
        let queue = Arc::new(StubQueue::default());
        let executor = executor_with(
            queue.clone(),
            Arc::new(StubLineItems::default()),
            StubReader {
                text: Some("random text with no vendor markers".to_string()),
            },
        );

        executor.process(&job()).await.unwrap();

        let statuses = queue.statuses.lock().unwrap();
        assert_eq!(statuses[0].1, InvoiceStatus::Failed);
        assert_eq!(
            statuses[0].2.as_deref(),
            Some("Unrecognized invoice template")
        );
    }

    #[tokio::test]
    async fn test_drain_processes_all_pending() {
        let queue = Arc::new(StubQueue::default());
        queue
            .pending
            .lock()
            .unwrap()
            .extend([job(), job(), job()]);
        let executor = executor_with(
            queue.clone(),
            Arc::new(StubLineItems::default()),
            StubReader {
                text: Some(GULLI_PAGE.to_string()),
            },
        );

        let processed = executor.drain().await;
        assert_eq!(processed, 3);
        assert!(queue.pending.lock().unwrap().is_empty());
    }
}
