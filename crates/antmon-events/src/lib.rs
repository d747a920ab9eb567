#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! Event bus shared by the collector and the HTTP streams.
//!
//! The bus provides a typed event enum and sequential identifiers on top of
//! `tokio::broadcast`. Subscribers only see events published after they
//! subscribe; a subscriber that falls behind the bounded channel skips the
//! events it missed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Identifier assigned to each published event.
pub type EventId = u64;

/// Default broadcast buffer size.
const DEFAULT_CAPACITY: usize = 256;

/// Domain events surfaced across the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The collector opened its node and began processing frames.
    CollectionStarted {
        /// `true` when scanning for any supported device.
        scanning: bool,
    },
    /// The collector closed its node.
    CollectionStopped,
    /// A device was seen for the first time in this session.
    DeviceFound {
        /// ANT device number.
        device_id: u16,
        /// ANT device type code.
        device_type: u8,
        /// Display name of the device profile.
        name: String,
    },
    /// Metrics settings were replaced.
    SettingsChanged {
        /// Human-readable summary of the change.
        description: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CollectionStarted { .. } => "collection_started",
            Self::CollectionStopped => "collection_stopped",
            Self::DeviceFound { .. } => "device_found",
            Self::SettingsChanged { .. } => "settings_changed",
        }
    }

    /// `true` for events that change the registered device list.
    #[must_use]
    pub const fn affects_devices(&self) -> bool {
        matches!(
            self,
            Self::CollectionStarted { .. } | Self::CollectionStopped | Self::DeviceFound { .. }
        )
    }
}

/// Metadata wrapper around events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Construct a bus with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Publish an event, assigning it the next sequential identifier.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        // No receivers is not an error: streams come and go.
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to the bus.
pub struct EventStream {
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event; lagged receivers skip ahead to the oldest retained event.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
