// src/cluster.rs

//! Snapshot of cluster state read at the start of each scheduling pass.
//!
//! The scheduler never talks to the cluster API itself; callers hand it a
//! [`ClusterSnapshot`] describing nodes, their capacity and what is already
//! assigned to them.

use std::collections::HashMap;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::location::Location;
use crate::workflow::Task;

/// CPU cores and bytes of RAM.
///
/// RAM is signed so that "available" can be tracked below zero while a pass
/// subtracts tentative assignments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Requirements {
    pub cpu: f64,
    pub ram: i64,
}

impl Requirements {
    pub const ZERO: Requirements = Requirements { cpu: 0.0, ram: 0 };

    pub fn new(cpu: f64, ram: i64) -> Self {
        Self { cpu, ram }
    }

    /// Both dimensions are at least those of `other`.
    pub fn higher_or_equals(&self, other: &Requirements) -> bool {
        self.cpu >= other.cpu && self.ram >= other.ram
    }
}

impl Add for Requirements {
    type Output = Requirements;

    fn add(self, rhs: Self) -> Self::Output {
        Requirements::new(self.cpu + rhs.cpu, self.ram + rhs.ram)
    }
}

impl AddAssign for Requirements {
    fn add_assign(&mut self, rhs: Self) {
        self.cpu += rhs.cpu;
        self.ram += rhs.ram;
    }
}

impl Sub for Requirements {
    type Output = Requirements;

    fn sub(self, rhs: Self) -> Self::Output {
        Requirements::new(self.cpu - rhs.cpu, self.ram - rhs.ram)
    }
}

impl SubAssign for Requirements {
    fn sub_assign(&mut self, rhs: Self) {
        self.cpu -= rhs.cpu;
        self.ram -= rhs.ram;
    }
}

/// One node as seen by a scheduling pass.
#[derive(Debug, Clone)]
pub struct NodeWithAlloc {
    pub location: Location,
    pub max_resources: Requirements,
    /// Requests of pods already placed on the node, keyed by task name.
    pub assigned: HashMap<String, Requirements>,
    pub labels: HashMap<String, String>,
    pub ready: bool,
    pub unschedulable: bool,
}

impl NodeWithAlloc {
    pub fn new(location: Location, max_resources: Requirements) -> Self {
        Self {
            location,
            max_resources,
            assigned: HashMap::new(),
            labels: HashMap::new(),
            ready: true,
            unschedulable: false,
        }
    }

    pub fn name(&self) -> &str {
        self.location.identifier()
    }

    pub fn requested_resources(&self) -> Requirements {
        self.assigned
            .values()
            .fold(Requirements::ZERO, |acc, r| acc + *r)
    }

    pub fn available_resources(&self) -> Requirements {
        self.max_resources - self.requested_resources()
    }

    pub fn running_pods(&self) -> usize {
        self.assigned.len()
    }

    pub fn can_schedule_new_pod(&self) -> bool {
        self.ready && !self.unschedulable
    }

    /// Every selector entry of `task` is present among the node's labels.
    pub fn matches_selector(&self, task: &Task) -> bool {
        task.node_selector()
            .iter()
            .all(|(k, v)| self.labels.get(k) == Some(v))
    }

    /// Node is usable for `task` right now, ignoring free capacity.
    pub fn is_candidate_for(&self, task: &Task) -> bool {
        self.can_schedule_new_pod() && self.matches_selector(task)
    }
}

/// All nodes known at the start of a pass.
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    pub nodes: Vec<NodeWithAlloc>,
}

impl ClusterSnapshot {
    pub fn new(nodes: Vec<NodeWithAlloc>) -> Self {
        Self { nodes }
    }

    pub fn node(&self, location: &Location) -> Option<&NodeWithAlloc> {
        self.nodes.iter().find(|n| &n.location == location)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Free resources per schedulable node.
    pub fn available_by_node(&self) -> HashMap<Location, Requirements> {
        self.nodes
            .iter()
            .filter(|n| n.can_schedule_new_pod())
            .map(|n| (n.location.clone(), n.available_resources()))
            .collect()
    }

    /// Schedulable nodes whose selector constraints match `task`.
    pub fn matching_nodes_for_task<'a>(
        &'a self,
        task: &'a Task,
    ) -> impl Iterator<Item = &'a NodeWithAlloc> + 'a {
        self.nodes.iter().filter(move |n| n.is_candidate_for(task))
    }
}
