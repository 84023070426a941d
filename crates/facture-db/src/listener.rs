//! LISTEN/NOTIFY event source implementation.
//!
//! Bridges PostgreSQL notifications on the invoice insert channel into the
//! `JobEventSource` seam. A background task owns the `PgListener` and
//! forwards decoded events over a bounded channel; when the listener's
//! connection drops, the channel closes and the worker loop reconnects.

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::{Pool, Postgres};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use facture_core::{
    defaults, Error, EventSubscription, InvoiceInsertEvent, JobEventSource, Result,
};

/// Event source backed by PostgreSQL LISTEN/NOTIFY.
pub struct PgNotifyEventSource {
    pool: Pool<Postgres>,
    channel: String,
}

impl PgNotifyEventSource {
    /// Create an event source listening on the default invoice channel.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            channel: defaults::NOTIFY_CHANNEL.to_string(),
        }
    }

    /// Create an event source listening on a custom channel.
    pub fn with_channel(pool: Pool<Postgres>, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl JobEventSource for PgNotifyEventSource {
    async fn subscribe(&self) -> Result<EventSubscription> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;
        listener
            .listen(&self.channel)
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;

        debug!(
            subsystem = "database",
            component = "listener",
            channel = %self.channel,
            "Subscribed to notification channel"
        );

        let (tx, rx) = mpsc::channel(defaults::EVENT_CHANNEL_CAPACITY);
        let channel = self.channel.clone();

        tokio::spawn(async move {
            loop {
                let notification = match listener.recv().await {
                    Ok(n) => n,
                    Err(e) => {
                        // Connection lost; closing the channel tells the
                        // worker loop to reconnect.
                        warn!(
                            subsystem = "database",
                            component = "listener",
                            channel = %channel,
                            error = %e,
                            "Notification listener disconnected"
                        );
                        break;
                    }
                };

                let event = match serde_json::from_str::<InvoiceInsertEvent>(notification.payload())
                {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(
                            subsystem = "database",
                            component = "listener",
                            channel = %channel,
                            error = %e,
                            "Discarding malformed notification payload"
                        );
                        continue;
                    }
                };

                if tx.send(event).await.is_err() {
                    // Subscriber dropped its receiver; stop forwarding.
                    break;
                }
            }
        });

        Ok(EventSubscription::new(rx))
    }
}
