//! Repository and collaborator traits.
//!
//! Storage traits are implemented against PostgreSQL in `facture-db`;
//! `DocumentReader` and `JobEventSource` are the external collaborator seams
//! the worker consumes as injected dependencies.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    CatalogProduct, DictionaryRule, DocumentReadResponse, FuzzyCandidate, InvoiceInsertEvent,
    InvoiceJob, InvoiceStatus, LineItem, MatchCandidate, MatchResult, NewLineItem, ScoredKeyword,
};

/// The job queue primitive: atomic claiming and idempotent status writes.
#[async_trait]
pub trait InvoiceQueue: Send + Sync {
    /// Claim the single oldest PENDING invoice, moving it to PROCESSING
    /// within the same statement. Safe under N concurrent claimers
    /// (lock-and-skip: a claimer never blocks on a row another claimer
    /// holds). Returns `None` when the queue is empty.
    async fn claim_oldest_pending(&self) -> Result<Option<InvoiceJob>>;

    /// Idempotently set status, optional error message and `updated_at`.
    /// Does not re-validate state-machine ordering; that is the executor's
    /// responsibility.
    async fn advance_status(
        &self,
        invoice_id: Uuid,
        status: InvoiceStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Fetch a single invoice by id.
    async fn get(&self, invoice_id: Uuid) -> Result<Option<InvoiceJob>>;

    /// Count of invoices still pending.
    async fn pending_count(&self) -> Result<i64>;
}

/// Line-item persistence for the extraction and matching stages.
#[async_trait]
pub trait LineItemRepository: Send + Sync {
    /// Bulk-insert extracted items, returning the stored rows with generated
    /// ids in input order.
    async fn insert_batch(&self, items: &[NewLineItem]) -> Result<Vec<LineItem>>;

    /// Persist the whole matching stage atomically: bulk-update match
    /// results, upsert scored keywords (keyed by line item + keyword),
    /// insert review candidates, and advance the owning invoice to MATCHED.
    /// Any failure rolls the entire stage back.
    async fn persist_match_stage(
        &self,
        invoice_id: Uuid,
        results: &[MatchResult],
        keywords: &[ScoredKeyword],
        candidates: &[MatchCandidate],
    ) -> Result<()>;

    /// Fetch all line items for an invoice.
    async fn list_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<LineItem>>;
}

/// Read access to category-dictionary reference data.
#[async_trait]
pub trait DictionaryRepository: Send + Sync {
    /// All active rules, loaded once per job.
    async fn all_active(&self) -> Result<Vec<DictionaryRule>>;
}

/// Read-only catalog lookups used by the match engine.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Products matching any of the given identifier sets, batched into one
    /// lookup across the whole invoice.
    async fn by_identifiers(
        &self,
        codes: &[String],
        barcodes: &[String],
        skus: &[String],
    ) -> Result<Vec<CatalogProduct>>;

    /// Distinct (id, name) candidates belonging to any of the given
    /// category codes.
    async fn by_categories(&self, category_codes: &[String]) -> Result<Vec<FuzzyCandidate>>;
}

/// External document reader collaborator.
///
/// Binary acquisition and OCR/PDF internals are out of scope; the core only
/// depends on this text-in, template-id-out contract. Failures are reported
/// inside the response, never as an `Err`.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read(
        &self,
        source_ref: &str,
        extract_all: bool,
        check_template: bool,
    ) -> DocumentReadResponse;
}

/// A live push-mode subscription. The channel closing signals a lost
/// subscription and triggers loop-level reconnection.
pub struct EventSubscription {
    rx: mpsc::Receiver<InvoiceInsertEvent>,
}

impl EventSubscription {
    /// Wrap a receiver produced by an event source implementation.
    pub fn new(rx: mpsc::Receiver<InvoiceInsertEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the subscription is lost.
    pub async fn next(&mut self) -> Option<InvoiceInsertEvent> {
        self.rx.recv().await
    }
}

/// Push-mode event source delivering invoice insert events.
///
/// Semantics are at-least-once with possible gaps; consumers must pair the
/// stream with a heartbeat drain.
#[async_trait]
pub trait JobEventSource: Send + Sync {
    /// Open a subscription. An `Err` here is a subscription failure and
    /// downgrades the worker to poll mode.
    async fn subscribe(&self) -> Result<EventSubscription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_subscription_delivers_then_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = EventSubscription::new(rx);

        tx.send(InvoiceInsertEvent {
            event_type: "INSERT".to_string(),
            status: Some(InvoiceStatus::Pending),
            invoice_id: None,
        })
        .await
        .unwrap();
        drop(tx);

        let event = sub.next().await.expect("one event");
        assert!(event.is_new_pending());
        assert!(sub.next().await.is_none());
    }
}
