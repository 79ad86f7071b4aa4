//! # System Constants
//!
//! Wire-format constants and small enums that define the boundaries of the
//! control plane. These values are part of the record format: changing them
//! breaks compatibility with existing stored records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator for concatenated identifier lists (`object_ids`, `new_actor_handles`)
pub const ID_LIST_DELIMITER: char = ',';

/// Prefix of positional placeholders in a worker launch command template
pub const WORKER_OPTION_PLACEHOLDER_PREFIX: &str = "WORKER_OPTION_";

/// Prefix marking the textual form of a dummy object id
pub const DUMMY_OBJECT_PREFIX: &str = "dummy:";

/// Well-known resource names
pub mod resources {
    pub const CPU: &str = "CPU";
    pub const GPU: &str = "GPU";
    pub const MEMORY: &str = "memory";
}

/// Profile event types emitted by the core itself
pub mod profile_events {
    pub const TASK_SUBMIT: &str = "task:submit";
    pub const TASK_ASSEMBLE: &str = "task:assemble";
    pub const ARGUMENT_RESOLVE: &str = "task:resolve_arguments";
    pub const ACTOR_FORK: &str = "actor:fork_handle";
    pub const ACTOR_RECONSTRUCT: &str = "actor:reconstruct";
}

/// Source language of the callable a task invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Language {
    Python = 0,
    Java = 1,
    Cpp = 2,
}

impl Language {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Language {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Python),
            1 => Ok(Self::Java),
            2 => Ok(Self::Cpp),
            other => Err(format!("Invalid language tag: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "PYTHON"),
            Self::Java => write!(f, "JAVA"),
            Self::Cpp => write!(f, "CPP"),
        }
    }
}
