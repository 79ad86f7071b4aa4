//! # Wire Records
//!
//! Serializable record layout exchanged with the control store, and JSON
//! helpers for it. Decoding a task record always goes through
//! [`TaskSpecBuilder`](crate::orchestration::TaskSpecBuilder), so a decoded
//! spec satisfies every assembly rule.

pub mod records;

use crate::error::Result;
use crate::models::TaskSpec;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use crate::models::ResourcePair;
pub use records::{ArgRecord, ProfileEventRecord, ProfileTableData, TaskSpecRecord};

pub fn to_json<T: Serialize>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Encode a spec as a JSON task record
pub fn encode_task_spec(spec: &TaskSpec) -> Result<String> {
    to_json(&TaskSpecRecord::from(spec))
}

/// Decode and validate a JSON task record
pub fn decode_task_spec(json: &str) -> Result<TaskSpec> {
    let record: TaskSpecRecord = from_json(json)?;
    TaskSpec::try_from(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::resources::CPU;
    use crate::error::ControlPlaneError;
    use crate::identity::IdentityAllocator;
    use crate::lineage::SubmitterContext;
    use crate::models::{ActorCreationId, ActorHandleId, ActorId, TaskArg};
    use crate::orchestration::TaskSpecBuilder;
    use serde_json::json;
    use uuid::Uuid;

    fn builder() -> TaskSpecBuilder {
        let allocator = IdentityAllocator::default();
        let job = allocator.mint_job_id();
        let ctx = SubmitterContext::for_driver(&allocator, job);
        TaskSpecBuilder::for_child(job, ctx.next_child(&allocator))
            .function_descriptor(["pkg", "mod", "fn"])
    }

    #[test]
    fn test_normal_spec_round_trip() {
        let spec = builder()
            .arg(TaskArg::json(&json!([1, 2])).unwrap())
            .resource(CPU, 1.5)
            .unwrap()
            .num_returns(2)
            .build()
            .unwrap();
        let decoded = decode_task_spec(&encode_task_spec(&spec).unwrap()).unwrap();
        assert_eq!(decoded, spec);
    }

    #[test]
    fn test_actor_creation_round_trip() {
        let spec = builder()
            .actor_creation_id(ActorCreationId::from_uuid(Uuid::new_v4()))
            .max_actor_reconstructions(2)
            .dynamic_worker_options(vec!["-Xmx1g".into()])
            .build()
            .unwrap();
        let decoded = decode_task_spec(&encode_task_spec(&spec).unwrap()).unwrap();
        assert_eq!(decoded, spec);
    }

    #[test]
    fn test_actor_task_round_trip() {
        let handles = vec![
            ActorHandleId::from_uuid(Uuid::new_v4()),
            ActorHandleId::from_uuid(Uuid::new_v4()),
        ];
        let spec = builder()
            .actor_id(ActorId::from_uuid(Uuid::new_v4()))
            .actor_handle_id(ActorHandleId::from_uuid(Uuid::new_v4()))
            .actor_counter(7)
            .new_actor_handles(handles.clone())
            .build()
            .unwrap();
        let record = TaskSpecRecord::from(&spec);
        assert_eq!(
            record.new_actor_handles.as_deref().map(|s| s.split(',').count()),
            Some(2)
        );
        let decoded = TaskSpec::try_from(record).unwrap();
        assert_eq!(decoded.actor_task().unwrap().new_actor_handles, handles);
    }

    #[test]
    fn test_record_with_both_variants_rejected() {
        let spec = builder()
            .actor_creation_id(ActorCreationId::from_uuid(Uuid::new_v4()))
            .build()
            .unwrap();
        let mut record = TaskSpecRecord::from(&spec);
        record.actor_id = Some(ActorId::from_uuid(Uuid::new_v4()));
        assert!(matches!(
            TaskSpec::try_from(record),
            Err(ControlPlaneError::InvalidTaskSpec(_))
        ));
    }

    #[test]
    fn test_garbage_json_is_malformed() {
        assert!(matches!(
            decode_task_spec("{not json"),
            Err(ControlPlaneError::MalformedArgument(_))
        ));
    }
}
