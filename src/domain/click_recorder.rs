//! Fire-and-forget click recording.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::click_event::ClickEvent;

/// Why a click could not be queued.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClickRecordError {
    #[error("click queue is full")]
    QueueFull,

    #[error("click queue is closed")]
    QueueClosed,
}

/// Accepts click events without blocking the caller.
///
/// Implementations must return immediately; persistence happens elsewhere.
#[cfg_attr(test, mockall::automock)]
pub trait ClickRecorder: Send + Sync {
    fn record(&self, event: ClickEvent) -> Result<(), ClickRecordError>;
}

/// [`ClickRecorder`] backed by a bounded channel drained by
/// [`crate::domain::click_worker::run_click_worker`].
#[derive(Clone)]
pub struct ChannelClickRecorder {
    sender: mpsc::Sender<ClickEvent>,
}

impl ChannelClickRecorder {
    pub fn new(sender: mpsc::Sender<ClickEvent>) -> Self {
        Self { sender }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Free slots currently left in the queue.
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl ClickRecorder for ChannelClickRecorder {
    fn record(&self, event: ClickEvent) -> Result<(), ClickRecordError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => ClickRecordError::QueueFull,
            TrySendError::Closed(_) => ClickRecordError::QueueClosed,
        })
    }
}
