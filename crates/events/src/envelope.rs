use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::topic::{route, Audience, EventName};

/// Payload shape of every realtime event: `{data, type, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEnvelope {
    pub data: JsonValue,

    /// Action part of the event name (`created`, `status-updated`, ...).
    #[serde(rename = "type")]
    pub kind: String,

    pub timestamp: DateTime<Utc>,
}

impl RealtimeEnvelope {
    pub fn new(event: EventName, data: JsonValue) -> Self {
        Self::at(event, data, Utc::now())
    }

    pub fn at(event: EventName, data: JsonValue, timestamp: DateTime<Utc>) -> Self {
        Self {
            data,
            kind: event.action().to_string(),
            timestamp,
        }
    }
}

/// A routed realtime message, as carried by the event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeMessage {
    pub event: EventName,
    pub envelope: RealtimeEnvelope,
    pub audiences: Vec<Audience>,
}

impl RealtimeMessage {
    /// Build a message and compute its audiences from the routing table.
    pub fn new(event: EventName, data: JsonValue) -> Self {
        let audiences = route(event, &data);
        Self {
            event,
            envelope: RealtimeEnvelope::new(event, data),
            audiences,
        }
    }

    /// Serialize `data` first; records that fail to serialize are not sent.
    pub fn from_record<T: Serialize>(event: EventName, record: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event, serde_json::to_value(record)?))
    }
}
