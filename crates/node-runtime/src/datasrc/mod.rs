//! Data sources feeding the window stores.
//!
//! A source produces [`DataEvent`]s into the server's event channel until
//! told to stop. It never touches the hub; the event pipe publishes triggers
//! for every inserted box.

pub mod mock;

pub use mock::{MockBlock, MockSource};

use async_trait::async_trait;
use shared_types::DataEvent;
use tokio::sync::{mpsc, watch};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produces events until `shutdown` flips to `true` or the channel closes.
    async fn run(&self, events: mpsc::Sender<DataEvent>, shutdown: watch::Receiver<bool>);
}
