//! Flat record layout of the control store.
//!
//! Records keep every field optional the way the store holds them; typed
//! values are only produced through validated conversions. ID lists are
//! joined with [`ID_LIST_DELIMITER`](crate::constants::ID_LIST_DELIMITER)
//! and an empty list is written as an absent field.

use crate::constants::Language;
use crate::error::{ControlPlaneError, Result};
use crate::models::ids::{join_ids, split_ids};
use crate::models::{
    ActorCreationId, ActorHandleId, ActorId, JobId, ObjectId, ProfileBatch, ProfileEvent,
    ResourcePair, TaskArg, TaskId, TaskKind, TaskSpec,
};
use crate::orchestration::TaskSpecBuilder;
use serde::{Deserialize, Serialize};

/// One task argument; exactly one of `object_ids` and `data` is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl From<&TaskArg> for ArgRecord {
    fn from(arg: &TaskArg) -> Self {
        match arg {
            TaskArg::ByReference(ids) => Self {
                object_ids: non_empty(join_ids(ids)),
                data: None,
            },
            TaskArg::ByValue(data) => Self {
                object_ids: None,
                data: Some(data.clone()),
            },
        }
    }
}

impl TryFrom<ArgRecord> for TaskArg {
    type Error = ControlPlaneError;

    fn try_from(record: ArgRecord) -> Result<Self> {
        let ids: Vec<ObjectId> = match record.object_ids.as_deref() {
            Some("") => {
                return Err(ControlPlaneError::MalformedArgument(
                    "argument has an empty object_ids field".to_string(),
                ))
            }
            Some(joined) => split_ids(joined)?,
            None => Vec::new(),
        };
        match (ids.is_empty(), record.data) {
            (false, None) => Ok(TaskArg::ByReference(ids)),
            (true, Some(data)) => Ok(TaskArg::ByValue(data)),
            (false, Some(_)) => Err(ControlPlaneError::MalformedArgument(
                "argument has both object_ids and data".to_string(),
            )),
            (true, None) => Err(ControlPlaneError::MalformedArgument(
                "argument has neither object_ids nor data".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpecRecord {
    pub job_id: Option<JobId>,
    pub task_id: Option<TaskId>,
    pub parent_task_id: Option<TaskId>,
    #[serde(default)]
    pub parent_counter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_creation_id: Option<ActorCreationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_creation_dummy_object_id: Option<ObjectId>,
    #[serde(default)]
    pub max_actor_reconstructions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_handle_id: Option<ActorHandleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_counter: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_actor_handles: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgRecord>,
    pub num_returns: i64,
    #[serde(default)]
    pub required_resources: Vec<ResourcePair>,
    #[serde(default)]
    pub required_placement_resources: Vec<ResourcePair>,
    pub language: Language,
    #[serde(default)]
    pub function_descriptor: Vec<String>,
    #[serde(default)]
    pub dynamic_worker_options: Vec<String>,
}

impl From<&TaskSpec> for TaskSpecRecord {
    fn from(spec: &TaskSpec) -> Self {
        let mut record = Self {
            job_id: Some(spec.job_id()),
            task_id: Some(spec.task_id()),
            parent_task_id: Some(spec.parent_task_id()),
            parent_counter: spec.parent_counter(),
            actor_creation_id: None,
            actor_creation_dummy_object_id: None,
            max_actor_reconstructions: 0,
            actor_id: None,
            actor_handle_id: None,
            actor_counter: None,
            new_actor_handles: None,
            args: spec.args().iter().map(ArgRecord::from).collect(),
            // i64 on the wire; saturates
            num_returns: i64::try_from(spec.num_returns()).unwrap_or(i64::MAX),
            required_resources: spec.required_resources().to_pairs(),
            required_placement_resources: spec.required_placement_resources().to_pairs(),
            language: spec.language(),
            function_descriptor: spec.function_descriptor().parts().to_vec(),
            dynamic_worker_options: Vec::new(),
        };

        match spec.kind() {
            TaskKind::Normal => {}
            TaskKind::ActorCreation(creation) => {
                record.actor_creation_id = Some(creation.actor_creation_id);
                record.actor_creation_dummy_object_id =
                    Some(creation.actor_creation_dummy_object_id);
                record.max_actor_reconstructions = creation.max_actor_reconstructions;
                record.dynamic_worker_options = creation.dynamic_worker_options.clone();
            }
            TaskKind::ActorTask(invocation) => {
                record.actor_id = Some(invocation.actor_id);
                record.actor_handle_id = Some(invocation.actor_handle_id);
                record.actor_counter = Some(invocation.actor_counter);
                record.new_actor_handles = non_empty(join_ids(&invocation.new_actor_handles));
            }
        }
        record
    }
}

impl TryFrom<TaskSpecRecord> for TaskSpec {
    type Error = ControlPlaneError;

    fn try_from(record: TaskSpecRecord) -> Result<Self> {
        let mut builder = TaskSpecBuilder::new()
            .max_actor_reconstructions(record.max_actor_reconstructions)
            .num_returns(record.num_returns)
            .required_resource_pairs(record.required_resources)
            .required_placement_resource_pairs(record.required_placement_resources)
            .language(record.language)
            .function_descriptor(record.function_descriptor)
            .dynamic_worker_options(record.dynamic_worker_options);

        if let Some(job_id) = record.job_id {
            builder = builder.job_id(job_id);
        }
        if let Some(task_id) = record.task_id {
            builder = builder.task_id(task_id);
        }
        if let Some(parent_task_id) = record.parent_task_id {
            builder = builder.parent(parent_task_id, record.parent_counter);
        }
        if let Some(id) = record.actor_creation_id {
            builder = builder.actor_creation_id(id);
        }
        if let Some(id) = record.actor_creation_dummy_object_id {
            builder = builder.actor_creation_dummy_object_id(id);
        }
        if let Some(id) = record.actor_id {
            builder = builder.actor_id(id);
        }
        if let Some(id) = record.actor_handle_id {
            builder = builder.actor_handle_id(id);
        }
        if let Some(counter) = record.actor_counter {
            builder = builder.actor_counter(counter);
        }
        if let Some(joined) = record.new_actor_handles.as_deref() {
            builder = builder.new_actor_handles(split_ids(joined)?);
        }

        let args = record
            .args
            .into_iter()
            .map(TaskArg::try_from)
            .collect::<Result<Vec<_>>>()?;

        builder.args(args).build()
    }
}

/// One profiling event as stored in the profile table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEventRecord {
    pub event_type: String,
    pub start_time: f64,
    pub end_time: f64,
    /// JSON-encoded string
    pub extra_data: String,
}

impl From<&ProfileEvent> for ProfileEventRecord {
    fn from(event: &ProfileEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            extra_data: event.extra_data.clone(),
        }
    }
}

impl TryFrom<ProfileEventRecord> for ProfileEvent {
    type Error = ControlPlaneError;

    fn try_from(record: ProfileEventRecord) -> Result<Self> {
        serde_json::from_str::<serde_json::Value>(&record.extra_data).map_err(|e| {
            ControlPlaneError::MalformedArgument(format!(
                "profile event {} has non-JSON extra_data: {e}",
                record.event_type
            ))
        })?;
        if record.end_time < record.start_time {
            return Err(ControlPlaneError::MalformedArgument(format!(
                "profile event {} ends before it starts",
                record.event_type
            )));
        }
        Ok(ProfileEvent {
            event_type: record.event_type,
            start_time: record.start_time,
            end_time: record.end_time,
            extra_data: record.extra_data,
        })
    }
}

/// Batch of events from one component, as written to the profile table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTableData {
    pub component_type: String,
    pub component_id: String,
    pub node_ip_address: String,
    #[serde(default)]
    pub profile_events: Vec<ProfileEventRecord>,
}

impl From<&ProfileBatch> for ProfileTableData {
    fn from(batch: &ProfileBatch) -> Self {
        Self {
            component_type: batch.component_type.clone(),
            component_id: batch.component_id.clone(),
            node_ip_address: batch.node_ip_address.clone(),
            profile_events: batch.profile_events.iter().map(ProfileEventRecord::from).collect(),
        }
    }
}

impl TryFrom<ProfileTableData> for ProfileBatch {
    type Error = ControlPlaneError;

    fn try_from(data: ProfileTableData) -> Result<Self> {
        let profile_events = data
            .profile_events
            .into_iter()
            .map(ProfileEvent::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(ProfileBatch {
            component_type: data.component_type,
            component_id: data.component_id,
            node_ip_address: data.node_ip_address,
            profile_events,
        })
    }
}

fn non_empty(joined: String) -> Option<String> {
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentKey;

    #[test]
    fn test_arg_needs_exactly_one_field() {
        let both = ArgRecord {
            object_ids: Some(ObjectId::for_task_return(TaskId::nil(), 0).to_string()),
            data: Some(vec![1]),
        };
        assert!(matches!(
            TaskArg::try_from(both),
            Err(ControlPlaneError::MalformedArgument(_))
        ));
        assert!(matches!(
            TaskArg::try_from(ArgRecord::default()),
            Err(ControlPlaneError::MalformedArgument(_))
        ));
        let empty_list = ArgRecord {
            object_ids: Some(String::new()),
            data: None,
        };
        assert!(TaskArg::try_from(empty_list).is_err());
    }

    #[test]
    fn test_empty_object_ids_with_data_is_rejected() {
        let record = ArgRecord {
            object_ids: Some(String::new()),
            data: Some(b"1".to_vec()),
        };
        assert!(matches!(
            TaskArg::try_from(record),
            Err(ControlPlaneError::MalformedArgument(_))
        ));
    }

    #[test]
    fn test_reference_arg_uses_delimiter() {
        let ids: Vec<ObjectId> = (0..3)
            .map(|i| ObjectId::for_task_return(TaskId::nil(), i))
            .collect();
        let record = ArgRecord::from(&TaskArg::by_reference(ids.clone()).unwrap());
        let joined = record.object_ids.clone().unwrap();
        assert_eq!(joined.matches(',').count(), 2);
        assert_eq!(TaskArg::try_from(record).unwrap(), TaskArg::ByReference(ids));
    }

    #[test]
    fn test_profile_record_rejects_bad_extra_data() {
        let record = ProfileEventRecord {
            event_type: "task:execute".into(),
            start_time: 1.0,
            end_time: 2.0,
            extra_data: "not json".into(),
        };
        assert!(ProfileEvent::try_from(record).is_err());
    }

    #[test]
    fn test_profile_table_data_layout() {
        let key = ComponentKey::new("worker", "w1", "10.0.0.2");
        let batch = ProfileBatch::new(&key, vec![ProfileEvent::instant("task:execute", None)]);
        let data = ProfileTableData::from(&batch);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["component_type"], "worker");
        assert_eq!(json["profile_events"][0]["extra_data"], "{}");
        assert_eq!(ProfileBatch::try_from(data).unwrap(), batch);
    }
}
