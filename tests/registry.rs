// tests/registry.rs

use locality_scheduler::location::LocationRegistry;

#[test]
fn reset_forgets_nodes_and_restarts_version_ids() {
    let registry = LocationRegistry::new();
    let first = registry.node("reg-node-1");
    registry.node("reg-node-2");
    assert_eq!(registry.node("reg-node-1"), first);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.next_version_id(), 0);
    assert_eq!(registry.next_version_id(), 1);
    let task_id = registry.next_task_id();

    registry.reset();

    assert!(registry.is_empty());
    assert_eq!(registry.next_version_id(), 0);
    assert!(registry.next_task_id() > task_id, "task ids are never reused");
    assert_eq!(registry.node("reg-node-1"), first);
}
