//! Profiling events and the batches they are shipped in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one component instance on one node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    pub component_type: String,
    pub component_id: String,
    pub node_ip_address: String,
}

impl ComponentKey {
    pub fn new(
        component_type: impl Into<String>,
        component_id: impl Into<String>,
        node_ip_address: impl Into<String>,
    ) -> Self {
        Self {
            component_type: component_type.into(),
            component_id: component_id.into(),
            node_ip_address: node_ip_address.into(),
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.component_type, self.component_id, self.node_ip_address
        )
    }
}

/// One timed event; `start_time == end_time` for instantaneous events.
///
/// Times are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvent {
    pub event_type: String,
    pub start_time: f64,
    pub end_time: f64,
    /// JSON-encoded payload
    pub extra_data: String,
}

impl ProfileEvent {
    pub fn new(
        event_type: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        extra_data: Option<&serde_json::Value>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            start_time: epoch_seconds(start),
            end_time: epoch_seconds(end),
            extra_data: extra_data.map_or_else(|| "{}".to_string(), |v| v.to_string()),
        }
    }

    pub fn instant(event_type: impl Into<String>, extra_data: Option<&serde_json::Value>) -> Self {
        let now = Utc::now();
        Self::new(event_type, now, now, extra_data)
    }

    pub fn is_instant(&self) -> bool {
        self.start_time == self.end_time
    }

    pub fn duration_seconds(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Events from one component instance, written to the profile table at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBatch {
    pub component_type: String,
    pub component_id: String,
    pub node_ip_address: String,
    pub profile_events: Vec<ProfileEvent>,
}

impl ProfileBatch {
    pub fn new(key: &ComponentKey, profile_events: Vec<ProfileEvent>) -> Self {
        Self {
            component_type: key.component_type.clone(),
            component_id: key.component_id.clone(),
            node_ip_address: key.node_ip_address.clone(),
            profile_events,
        }
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(
            self.component_type.clone(),
            self.component_id.clone(),
            self.node_ip_address.clone(),
        )
    }

    pub fn len(&self) -> usize {
        self.profile_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profile_events.is_empty()
    }
}

fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}
