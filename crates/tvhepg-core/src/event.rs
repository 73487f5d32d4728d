//! Program guide types.
//!
//! - [`EpgEvent`]: one guide entry exactly as returned by the server
//! - [`EpgSnapshot`]: the full result of one successful fetch

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single program guide entry.
///
/// The server decides the schema; this type keeps the raw JSON object and
/// offers lenient accessors for the fields TVHeadend usually sends. Missing
/// or mistyped fields read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpgEvent(Map<String, Value>);

impl EpgEvent {
    /// Wraps a raw JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the string stored under `key`, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Server-side event identifier.
    pub fn event_id(&self) -> Option<u64> {
        self.0.get("eventId").and_then(Value::as_u64)
    }

    /// Program title.
    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    /// Episode subtitle.
    pub fn subtitle(&self) -> Option<&str> {
        self.get_str("subtitle")
    }

    /// Long description.
    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    /// Display name of the channel.
    pub fn channel_name(&self) -> Option<&str> {
        self.get_str("channelName")
    }

    /// Channel UUID.
    pub fn channel_uuid(&self) -> Option<&str> {
        self.get_str("channelUuid")
    }

    /// Start time (TVHeadend sends Unix seconds).
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timestamp("start")
    }

    /// Stop time (TVHeadend sends Unix seconds).
    pub fn stop(&self) -> Option<DateTime<Utc>> {
        self.timestamp("stop")
    }

    /// Returns true if the event is on air at `at`.
    pub fn is_airing_at(&self, at: DateTime<Utc>) -> bool {
        match (self.start(), self.stop()) {
            (Some(start), Some(stop)) => start <= at && at < stop,
            _ => false,
        }
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the event and returns the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        let secs = self.0.get(key).and_then(Value::as_i64)?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

impl From<Map<String, Value>> for EpgEvent {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The guide as returned by one successful fetch.
///
/// Cloning is cheap: the events live in a shared, immutable buffer, so a
/// snapshot handed to a reader can never change underneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpgSnapshot {
    events: Arc<[EpgEvent]>,
    fetched_at: DateTime<Utc>,
}

impl EpgSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(events: Vec<EpgEvent>) -> Self {
        Self::with_fetched_at(events, Utc::now())
    }

    /// Creates a snapshot with an explicit fetch time.
    pub fn with_fetched_at(events: Vec<EpgEvent>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            events: events.into(),
            fetched_at,
        }
    }

    /// Returns the events in server order.
    pub fn events(&self) -> &[EpgEvent] {
        &self.events
    }

    /// When the snapshot was fetched.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the guide is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the events in server order.
    pub fn iter(&self) -> impl Iterator<Item = &EpgEvent> {
        self.events.iter()
    }
}
