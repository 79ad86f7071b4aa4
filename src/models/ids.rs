//! # Identifiers
//!
//! Opaque, fixed-format identifiers for jobs, tasks, actors, actor handles and
//! objects. All of them are UUIDs; derivable identifiers use name-based (v5)
//! UUIDs so that the same inputs always yield the same identifier.

use crate::constants::{DUMMY_OBJECT_PREFIX, ID_LIST_DELIMITER};
use crate::error::{ControlPlaneError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = ControlPlaneError;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    ControlPlaneError::MalformedArgument(format!(
                        "Invalid {}: {s:?}: {e}",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

uuid_id!(
    /// Identifies one job (one driver program and everything it spawns)
    JobId
);
uuid_id!(
    /// Identifies one task; derived from its parent lineage
    TaskId
);
uuid_id!(
    /// Identifies an actor
    ActorId
);
uuid_id!(
    /// Identifies the task that creates an actor
    ActorCreationId
);
uuid_id!(
    /// Identifies one submission channel to an actor
    ActorHandleId
);

impl From<ActorCreationId> for ActorId {
    fn from(creation_id: ActorCreationId) -> Self {
        ActorId(creation_id.0)
    }
}

/// Distinguishes ordinary task outputs from actor-creation completion tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Return,
    Dummy,
}

/// Identifies an object in the external object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    uuid: Uuid,
    kind: ObjectKind,
}

impl ObjectId {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            kind: ObjectKind::Return,
        }
    }

    /// The object produced as return value `index` of `task_id`
    pub fn for_task_return(task_id: TaskId, index: u64) -> Self {
        let uuid = Uuid::new_v5(task_id.as_uuid(), &index.to_be_bytes());
        Self {
            uuid,
            kind: ObjectKind::Return,
        }
    }

    /// The completion token of the actor-creation task `task_id`.
    ///
    /// Scoped to that single task: two creation tasks never share a dummy object.
    pub fn dummy_for(task_id: TaskId) -> Self {
        let uuid = Uuid::new_v5(task_id.as_uuid(), b"actor-creation-dummy");
        Self {
            uuid,
            kind: ObjectKind::Dummy,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_dummy(&self) -> bool {
        self.kind == ObjectKind::Dummy
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.uuid
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ObjectKind::Return => write!(f, "{}", self.uuid.hyphenated()),
            ObjectKind::Dummy => write!(f, "{DUMMY_OBJECT_PREFIX}{}", self.uuid.hyphenated()),
        }
    }
}

impl FromStr for ObjectId {
    type Err = ControlPlaneError;

    fn from_str(s: &str) -> Result<Self> {
        let (raw, kind) = match s.strip_prefix(DUMMY_OBJECT_PREFIX) {
            Some(rest) => (rest, ObjectKind::Dummy),
            None => (s, ObjectKind::Return),
        };
        let uuid = Uuid::parse_str(raw).map_err(|e| {
            ControlPlaneError::MalformedArgument(format!("Invalid ObjectId: {s:?}: {e}"))
        })?;
        Ok(Self { uuid, kind })
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Joins identifiers with [`ID_LIST_DELIMITER`]
pub fn join_ids<T: fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&ID_LIST_DELIMITER.to_string())
}

/// Splits a [`ID_LIST_DELIMITER`]-joined list; an empty string is an empty list
pub fn split_ids<T>(joined: &str) -> Result<Vec<T>>
where
    T: FromStr<Err = ControlPlaneError>,
{
    if joined.is_empty() {
        return Ok(Vec::new());
    }
    joined.split(ID_LIST_DELIMITER).map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_return_ids_are_deterministic() {
        let task = TaskId::from_uuid(Uuid::new_v4());
        assert_eq!(
            ObjectId::for_task_return(task, 0),
            ObjectId::for_task_return(task, 0)
        );
        assert_ne!(
            ObjectId::for_task_return(task, 0),
            ObjectId::for_task_return(task, 1)
        );
    }

    #[test]
    fn test_dummy_object_is_distinct_from_returns() {
        let task = TaskId::from_uuid(Uuid::new_v4());
        let dummy = ObjectId::dummy_for(task);
        assert!(dummy.is_dummy());
        assert!(!ObjectId::for_task_return(task, 0).is_dummy());

        let parsed: ObjectId = dummy.to_string().parse().unwrap();
        assert_eq!(parsed, dummy);
        assert!(dummy.to_string().starts_with(DUMMY_OBJECT_PREFIX));
    }

    #[test]
    fn test_nil_actor_id_is_still_an_id() {
        let actor = ActorId::nil();
        assert!(actor.is_nil());
        assert_eq!(actor.to_string().parse::<ActorId>().unwrap(), actor);
    }

    #[test]
    fn test_id_text_never_contains_delimiter() {
        let task = TaskId::from_uuid(Uuid::new_v4());
        let text = ObjectId::dummy_for(task).to_string();
        assert!(!text.contains(ID_LIST_DELIMITER));
    }

    #[test]
    fn test_split_empty_list() {
        let ids: Vec<ActorHandleId> = split_ids("").unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_split_rejects_garbage() {
        let result: Result<Vec<ObjectId>> = split_ids("not-a-uuid");
        assert!(matches!(result, Err(ControlPlaneError::MalformedArgument(_))));
    }

    #[test]
    fn test_object_id_serde_uses_text_form() {
        let task = TaskId::from_uuid(Uuid::new_v4());
        let dummy = ObjectId::dummy_for(task);
        let json = serde_json::to_string(&dummy).unwrap();
        assert_eq!(json, format!("\"{dummy}\""));
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dummy);
    }
}
