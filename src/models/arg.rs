//! Task arguments: pass-by-reference object ids or an inline value blob.

use crate::error::{ControlPlaneError, Result};
use crate::models::ids::ObjectId;
use serde::{Deserialize, Serialize};

/// One argument of a task.
///
/// References carry one id for an ordinary argument and several only for
/// reducer-style tasks that consume multiple inputs as one argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskArg {
    ByReference(Vec<ObjectId>),
    ByValue(Vec<u8>),
}

impl TaskArg {
    pub fn by_reference(object_ids: Vec<ObjectId>) -> Result<Self> {
        if object_ids.is_empty() {
            return Err(ControlPlaneError::MalformedArgument(
                "Pass-by-reference argument needs at least one object id".to_string(),
            ));
        }
        Ok(Self::ByReference(object_ids))
    }

    pub fn object(object_id: ObjectId) -> Self {
        Self::ByReference(vec![object_id])
    }

    pub fn by_value(data: impl Into<Vec<u8>>) -> Self {
        Self::ByValue(data.into())
    }

    /// Inline argument holding `value` encoded as JSON
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::ByValue(serde_json::to_vec(value)?))
    }

    pub fn object_ids(&self) -> &[ObjectId] {
        match self {
            Self::ByReference(ids) => ids,
            Self::ByValue(_) => &[],
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::ByReference(_))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::ByReference(ids) if ids.is_empty() => Err(ControlPlaneError::MalformedArgument(
                "Pass-by-reference argument has no object ids".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
