// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Run Event Bus
//
// Fan-out of RunEvents over a tokio broadcast channel. Observers subscribe to
// every run or to one run. Nothing is persisted; a receiver that falls more
// than `capacity` events behind loses the oldest ones.

use crate::domain::events::RunEvent;
use crate::domain::run::RunId;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{trace, warn};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Having no subscriber is fine; the event is dropped.
    pub fn publish(&self, event: RunEvent) {
        let run_id = event.run_id();
        match self.sender.send(event) {
            Ok(receivers) => trace!(run_id = %run_id, receivers, "Run event published"),
            Err(_) => trace!(run_id = %run_id, "Run event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            only: None,
        }
    }

    /// Events of other runs are skipped.
    pub fn subscribe_run(&self, run_id: RunId) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            only: Some(run_id),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<RunEvent>,
    only: Option<RunId>,
}

impl EventReceiver {
    fn wanted(&self, event: &RunEvent) -> bool {
        self.only.map_or(true, |run_id| event.run_id() == run_id)
    }

    pub async fn recv(&mut self) -> Result<RunEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wanted(&event) {
                return Ok(event);
            }
        }
    }

    /// Fails with [`EventBusError::Empty`] when nothing is queued.
    pub fn try_recv(&mut self) -> Result<RunEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.wanted(&event) {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events queued")]
    Empty,

    #[error("Receiver fell behind and missed {0} events")]
    Lagged(u64),
}

impl From<RecvError> for EventBusError {
    fn from(error: RecvError) -> Self {
        match error {
            RecvError::Closed => EventBusError::Closed,
            RecvError::Lagged(missed) => {
                warn!(missed, "Run event receiver lagged");
                EventBusError::Lagged(missed)
            }
        }
    }
}

impl From<TryRecvError> for EventBusError {
    fn from(error: TryRecvError) -> Self {
        match error {
            TryRecvError::Empty => EventBusError::Empty,
            TryRecvError::Closed => EventBusError::Closed,
            TryRecvError::Lagged(missed) => {
                warn!(missed, "Run event receiver lagged");
                EventBusError::Lagged(missed)
            }
        }
    }
}
