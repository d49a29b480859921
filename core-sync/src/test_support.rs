//! Shared test doubles for the unit tests of this crate.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::remote::{AvailabilityStream, ChangeBatch, RemoteRecord};
use bridge_traits::RemoteStore;
use mockall::mock;
use tokio::sync::mpsc;

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteStore for Remote {
        async fn is_available(&self) -> bool;
        async fn fetch_changes(&self) -> BridgeResult<ChangeBatch>;
        async fn save_records(&self, records: Vec<RemoteRecord>) -> BridgeResult<Vec<RemoteRecord>>;
        async fn save(&self, record: RemoteRecord) -> BridgeResult<RemoteRecord>;
        async fn delete(&self, record_name: &str) -> BridgeResult<()>;
        async fn subscribe_availability(&self) -> BridgeResult<Box<dyn AvailabilityStream>>;
    }
}

/// Availability stream fed from a channel.
pub struct ChannelAvailability {
    receiver: mpsc::UnboundedReceiver<bool>,
}

#[async_trait]
impl AvailabilityStream for ChannelAvailability {
    async fn next(&mut self) -> Option<bool> {
        self.receiver.recv().await
    }
}

pub fn channel_availability() -> (mpsc::UnboundedSender<bool>, Box<dyn AvailabilityStream>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (sender, Box::new(ChannelAvailability { receiver }))
}
