//! # lvm-events
//!
//! Publish/subscribe delivery of execution outcomes.
//!
//! Producers fire [`EventData`] under a topic string (see [`topics`]). An
//! [`EventSwitch`] routes each event to the channels subscribed to that topic.
//! An [`EventCache`] buffers events during execution and hands them to the
//! switch on [`flush`](EventCache::flush), so subscribers only see them after
//! the producing call has returned. Consumers wait with
//! [`wait_for_event`], which gives up after a bounded timeout.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod error;
mod switch;
pub mod topics;
mod types;

pub use cache::EventCache;
pub use error::{EventError, EventResult};
pub use switch::{EventReceiver, EventSwitch, Fireable};
pub use types::{CallData, EventData, EventDataCall, EventDataLog, EventDataTx};

use std::time::Duration;

/// Wait for the next event on `rx`, giving up after `timeout`
pub async fn wait_for_event(rx: &mut EventReceiver, timeout: Duration) -> EventResult<EventData> {
    match tokio::time::timeout(timeout, rx.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(EventError::Closed),
        Err(_) => Err(EventError::Timeout(timeout)),
    }
}
