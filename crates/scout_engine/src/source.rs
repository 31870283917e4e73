use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{ScrapeEvent, ScrapeQuery};

#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event. Returns `false` once nobody is listening anymore.
    async fn emit(&self, event: ScrapeEvent) -> bool;
}

/// Sink backed by a bounded channel; a slow reader applies back-pressure to the source.
pub struct ChannelEventSink {
    tx: mpsc::Sender<ScrapeEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<ScrapeEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: ScrapeEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// A scrape engine. Implementations report everything through `sink`
/// and should return promptly once `cancel` fires. The coordinator keeps
/// polling a cancelled source for a grace period so it can release its
/// resources and emit `End`.
#[async_trait::async_trait]
pub trait ScrapeSource: Send + Sync {
    async fn run(&self, query: ScrapeQuery, sink: &dyn EventSink, cancel: CancellationToken);
}
