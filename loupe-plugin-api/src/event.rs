//! Event channel for plugin and host communication in Loupe.
//!
//! Components publish [`Event`]s through an [`EventSender`], a cloneable
//! handle over a tokio broadcast channel. The host subscribes to update its
//! status bar and to act on requests such as opening a resource in the main
//! editor. Publishing never blocks and never fails when nobody listens.
//!
//! # Example
//!
//! ```rust
//! use loupe_plugin_api::{Event, EventSender, EventType};
//!
//! let events = EventSender::new();
//! let mut rx = events.subscribe();
//!
//! events.emit(Event::new(EventType::ModeChanged, "Edit").with_meta("resource", "note.md"));
//!
//! let event = rx.try_recv().unwrap();
//! assert_eq!(event.event_type(), EventType::ModeChanged);
//! assert_eq!(event.get_metadata("resource"), Some("note.md"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the broadcast buffer; slow subscribers skip older events.
const EVENT_CAPACITY: usize = 256;

/// An event that can be emitted and observed through the event channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event instance
    id: Uuid,
    /// Type of the event
    event_type: EventType,
    /// Data payload
    data: String,
    /// Additional metadata
    metadata: HashMap<String, String>,
    /// Timestamp when the event was created
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event {
    /// Create a new event with the specified type and data.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::{Event, EventType};
    ///
    /// let event = Event::new(EventType::ResourceLoaded, "note.md");
    /// assert_eq!(event.data(), "note.md");
    /// ```
    pub fn new<S: Into<String>>(event_type: EventType, data: S) -> Self {
        Self::with_metadata(event_type, data, HashMap::new())
    }

    /// Create a new event with additional metadata.
    pub fn with_metadata<S: Into<String>>(
        event_type: EventType,
        data: S,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            data: data.into(),
            metadata,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Builder form of [`Event::set_metadata`].
    pub fn with_meta<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_metadata(key, value);
        self
    }

    /// Get the unique identifier of this event.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the type of this event.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Get the data payload of this event.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Get the metadata associated with this event.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Get the timestamp when this event was created.
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.timestamp
    }

    /// Add or update a metadata entry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::{Event, EventType};
    ///
    /// let mut event = Event::new(EventType::SaveStatusChanged, "Saved");
    /// event.set_metadata("resource", "note.md");
    /// assert_eq!(event.get_metadata("resource"), Some("note.md"));
    /// ```
    pub fn set_metadata<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Get a specific metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }
}

/// Types of events published by Loupe components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // Preview session events
    /// A resource was bound to a preview session
    ResourceSelected,
    /// A preview session was unbound from its resource
    ResourceCleared,
    /// The bound resource's content was read
    ResourceLoaded,
    /// Reading the bound resource failed
    LoadFailed,
    /// Rendering the bound resource failed
    RenderFailed,
    /// The session switched between preview and edit
    ModeChanged,
    /// The save status of the bound resource changed
    SaveStatusChanged,
    /// The user asked to open the bound resource in the main editor
    OpenResourceRequested,

    // UI events
    /// A panel was opened
    PanelOpened,
    /// A panel was closed
    PanelClosed,

    // Canvas events
    /// A selection watcher attached to a canvas
    CanvasAttached,
    /// A selection watcher detached from a canvas
    CanvasDetached,

    // Custom events for plugins
    /// Custom event type for plugin-specific events
    Custom,
}

impl EventType {
    /// Get a human-readable description of the event type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::EventType;
    ///
    /// assert_eq!(EventType::SaveStatusChanged.description(), "Save status changed");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            EventType::ResourceSelected => "Resource was selected",
            EventType::ResourceCleared => "Resource was cleared",
            EventType::ResourceLoaded => "Resource was loaded",
            EventType::LoadFailed => "Resource could not be loaded",
            EventType::RenderFailed => "Resource could not be rendered",
            EventType::ModeChanged => "Preview mode changed",
            EventType::SaveStatusChanged => "Save status changed",
            EventType::OpenResourceRequested => "Open in editor requested",
            EventType::PanelOpened => "Panel was opened",
            EventType::PanelClosed => "Panel was closed",
            EventType::CanvasAttached => "Canvas watcher attached",
            EventType::CanvasDetached => "Canvas watcher detached",
            EventType::Custom => "Custom plugin event",
        }
    }
}

/// Cloneable publishing handle for the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: broadcast::Sender<Event>,
}

impl EventSender {
    /// Create a new channel with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Events published with no subscribers are dropped.
    pub fn emit(&self, event: Event) {
        tracing::trace!(event_type = ?event.event_type(), data = event.data(), "event");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}
