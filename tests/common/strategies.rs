use proptest::prelude::*;
use std::collections::BTreeMap;
use taskspec_core::models::{ObjectId, ResourceSet, TaskId};
use uuid::Uuid;

/// Strategy for generating resource names
pub fn resource_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("CPU".to_string()),
        Just("GPU".to_string()),
        Just("memory".to_string()),
        "[a-z][a-z0-9_]{0,15}",
    ]
}

/// Strategy for generating non-negative resource quantities
pub fn quantity_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.0f64..64.0, (0u32..16).prop_map(f64::from)]
}

/// Strategy for generating valid resource vectors
pub fn resource_set_strategy() -> impl Strategy<Value = ResourceSet> {
    prop::collection::btree_map(resource_name_strategy(), quantity_strategy(), 0..5).prop_map(
        |quantities: BTreeMap<String, f64>| {
            ResourceSet::from_pairs(quantities).expect("generated quantities are valid")
        },
    )
}

/// Strategy for generating an availability vector that dominates `base` pointwise
pub fn dominating_set_strategy(base: ResourceSet) -> impl Strategy<Value = ResourceSet> {
    let keys: Vec<String> = base.iter().map(|(k, _)| k.to_string()).collect();
    (
        prop::collection::vec(0.0f64..8.0, keys.len()),
        prop::collection::btree_map(resource_name_strategy(), quantity_strategy(), 0..3),
    )
        .prop_map(move |(bumps, extra)| {
            let mut quantities: BTreeMap<String, f64> = extra;
            for (key, bump) in keys.iter().zip(bumps) {
                quantities.insert(key.clone(), base.get(key) + bump);
            }
            ResourceSet::from_pairs(quantities).expect("generated quantities are valid")
        })
}

/// Strategy for generating object ids of either kind
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    (any::<u128>(), any::<bool>(), 0u64..8).prop_map(|(bits, dummy, index)| {
        let task = TaskId::from_uuid(Uuid::from_u128(bits));
        if dummy {
            ObjectId::dummy_for(task)
        } else {
            ObjectId::for_task_return(task, index)
        }
    })
}
