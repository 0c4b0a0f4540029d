// src/scheduler/driver.rs

//! Cost-driven placement: every unscheduled task goes to the node where
//! getting its inputs is cheapest.
//!
//! Tasks are handled largest input first. For each task the candidate nodes
//! are tried in order of data already present, and the best alignment found
//! so far caps the cost of every later attempt so they can stop early.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, trace, warn};

use crate::alignment::FileAlignment;
use crate::cluster::{ClusterSnapshot, NodeWithAlloc, Requirements};
use crate::copying::CurrentlyCopying;
use crate::inputs::TaskInputs;
use crate::location::Location;
use crate::workflow::Task;

use super::sorted_list::SortedList;
use super::{LocalityScheduler, NodeTaskFilesAlignment, START_PRIORITY};

/// A candidate node with the bytes of input it already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDataTuple {
    pub node: Location,
    pub size_in_bytes: u64,
}

/// Everything the driver needs about one unscheduled task.
#[derive(Debug)]
pub struct TaskData {
    task: Arc<Task>,
    inputs: TaskInputs,
    size: u64,
    /// Most data on node first.
    node_data: Vec<NodeDataTuple>,
    value: f64,
    weight_was_set: bool,
    out_label_node: Option<Location>,
    weight: f64,
}

impl TaskData {
    pub fn new(
        task: Arc<Task>,
        inputs: TaskInputs,
        mut node_data: Vec<NodeDataTuple>,
        out_label_node: Option<Location>,
    ) -> Self {
        node_data.sort_by(|a, b| b.size_in_bytes.cmp(&a.size_in_bytes));
        let out_label = task.out_label().cloned();
        let mut data = Self {
            size: inputs.calculate_avg_size(),
            weight_was_set: out_label.is_none() || out_label_node.is_some(),
            weight: out_label.map_or(1.0, |l| l.weight),
            task,
            inputs,
            node_data,
            value: 0.0,
            out_label_node,
        };
        data.calc();
        data
    }

    fn calc(&mut self) {
        self.value = if self.node_data.is_empty() {
            f64::MIN_POSITIVE
        } else if self.size == 0 {
            f64::MAX
        } else {
            self.size as f64
        };
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn inputs(&self) -> &TaskInputs {
        &self.inputs
    }

    pub fn node_data(&self) -> &[NodeDataTuple] {
        &self.node_data
    }

    /// Queue priority; larger is scheduled first.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn out_label_node(&self) -> Option<&Location> {
        self.out_label_node.as_ref()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn weight_was_set(&self) -> bool {
        self.weight_was_set
    }

    /// A node for the task's label became known after the data was built.
    pub fn set_node_and_weight(&mut self, node: Location, weight: f64) {
        self.out_label_node = Some(node);
        self.weight = weight;
        self.weight_was_set = true;
    }

    /// Drop candidates that lack the resources for the task.
    ///
    /// Returns true if any candidate was dropped.
    pub fn calculate(&mut self, available: &HashMap<Location, Requirements>) -> bool {
        let request = self.task.request();
        let before = self.node_data.len();
        self.node_data.retain(|t| {
            available
                .get(&t.node)
                .is_some_and(|free| free.higher_or_equals(&request))
        });
        self.calc();
        self.node_data.len() != before
    }

    fn compare_value_desc(a: &TaskData, b: &TaskData) -> Ordering {
        b.value.total_cmp(&a.value)
    }
}

/// Free share of `max`; zero when the node reports no capacity.
fn fraction(value: f64, max: f64) -> f64 {
    if max <= 0.0 { 0.0 } else { value / max }
}

/// Tie-break between two nodes whose alignments cost about the same.
///
/// Compares, after deducting `request` from both, free CPU share, then
/// running plus assigned pods, then free memory share. Shares within
/// `threshold` of each other count as equal. Returns true if `new_node`
/// wins, deciding randomly when nothing separates them.
pub fn stalemate<R: Rng + ?Sized>(
    old_node: &NodeWithAlloc,
    new_node: &NodeWithAlloc,
    available: &HashMap<Location, Requirements>,
    assigned_pods: &HashMap<Location, usize>,
    request: &Requirements,
    threshold: f64,
    rng: &mut R,
) -> bool {
    let free_old = available
        .get(&old_node.location)
        .copied()
        .unwrap_or(Requirements::ZERO)
        - *request;
    let free_new = available
        .get(&new_node.location)
        .copied()
        .unwrap_or(Requirements::ZERO)
        - *request;

    let cpu_old = fraction(free_old.cpu, old_node.max_resources.cpu);
    let cpu_new = fraction(free_new.cpu, new_node.max_resources.cpu);
    if cpu_old + threshold < cpu_new {
        trace!(old = %old_node.location, new = %new_node.location, "new node has more free cpu");
        return true;
    }
    if cpu_old - threshold > cpu_new {
        return false;
    }

    let pods_old = old_node.running_pods() + assigned_pods.get(&old_node.location).copied().unwrap_or(0);
    let pods_new = new_node.running_pods() + assigned_pods.get(&new_node.location).copied().unwrap_or(0);
    match pods_new.cmp(&pods_old) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }

    let ram_old = fraction(free_old.ram as f64, old_node.max_resources.ram as f64);
    let ram_new = fraction(free_new.ram as f64, new_node.max_resources.ram as f64);
    if ram_old + threshold < ram_new {
        return true;
    }
    if ram_old - threshold > ram_new {
        return false;
    }

    trace!(old = %old_node.location, new = %new_node.location, "nodes equal, deciding randomly");
    rng.random::<f64>() > 0.5
}

impl LocalityScheduler {
    /// Resolve `task` and list the nodes that could host it now.
    ///
    /// Returns `None` if the inputs cannot be resolved yet or no node is left.
    pub fn calculate_task_data(
        &self,
        task: &Arc<Task>,
        cluster: &ClusterSnapshot,
        available: &HashMap<Location, Requirements>,
    ) -> Option<TaskData> {
        let request = task.request();
        let inputs = match self.collector.inputs_of_task(task, self.lineage.as_ref(), cluster.len()) {
            Ok(Some(inputs)) => inputs,
            Ok(None) => {
                debug!(task = %task.name(), "every node is excluded");
                return None;
            }
            Err(e) => {
                debug!(task = %task.name(), error = %e, "inputs not resolvable yet");
                return None;
            }
        };
        let node_data: Vec<NodeDataTuple> = cluster
            .matching_nodes_for_task(task)
            .filter(|n| !inputs.excluded_nodes.contains(&n.location))
            .filter(|n| {
                available
                    .get(&n.location)
                    .is_some_and(|free| free.higher_or_equals(&request))
            })
            .map(|n| NodeDataTuple {
                node: n.location.clone(),
                size_in_bytes: inputs.calculate_data_on_node(&n.location),
            })
            .collect();
        if node_data.is_empty() {
            return None;
        }
        let out_label_node = task
            .out_label()
            .and_then(|label| self.out_labels().node_for_label(&label.label));
        Some(TaskData::new(Arc::clone(task), inputs, node_data, out_label_node))
    }

    /// Find the node with the cheapest alignment for `data`.
    pub fn calculate_best_node(
        &self,
        data: &TaskData,
        planned: &CurrentlyCopying,
        available: &HashMap<Location, Requirements>,
        assigned_pods: &HashMap<Location, usize>,
        cluster: &ClusterSnapshot,
    ) -> Option<(Location, FileAlignment)> {
        let task = data.task();
        let eps = self.config.alignment.comparable_cost_epsilon;
        let threshold = self.config.alignment.stalemate_threshold;
        let tracing_enabled = self.config.scheduler.trace_enabled;

        let mut best: Option<(Location, FileAlignment)> = None;
        let mut best_has_label = false;
        let mut could_stop_fetching = 0;
        let mut no_alignment_found = 0;
        let mut node_costs = Vec::new();

        for tuple in data.node_data() {
            let node = &tuple.node;
            let is_label_node = data.out_label_node() == Some(node);
            let node_weight = if is_label_node { data.weight() } else { 1.0 };
            let max_cost = best
                .as_ref()
                .map_or(f64::MAX, |(_, b)| (b.worth() + eps) * node_weight);

            let copying = self.currently_copying.get(node);
            let planned_on_node = planned.get(node);
            let mut cost = None;
            match self.alignment.input_alignment(
                data.inputs(),
                node,
                Some(&copying),
                Some(&planned_on_node),
                max_cost,
            ) {
                Ok(None) => could_stop_fetching += 1,
                Ok(Some(mut alignment)) => {
                    cost = Some(alignment.cost());
                    if is_label_node {
                        alignment.set_weight(data.weight());
                    }
                    let accept = match &best {
                        None => true,
                        Some((best_node, best_alignment)) => {
                            best_alignment.worth() > alignment.worth()
                                || (best_alignment.worth() + eps > alignment.worth()
                                    && (is_label_node
                                        || (!best_has_label
                                            && self.stalemate_between(
                                                best_node,
                                                node,
                                                available,
                                                assigned_pods,
                                                task,
                                                threshold,
                                                cluster,
                                            ))))
                        }
                    };
                    if accept {
                        debug!(task = %task.name(), node = %node, cost = alignment.cost(), worth = alignment.worth(), "new best node");
                        best_has_label = is_label_node;
                        best = Some((node.clone(), alignment));
                    }
                }
                Err(e) => {
                    no_alignment_found += 1;
                    debug!(task = %task.name(), node = %node, error = %e, "node cannot host task");
                }
            }
            node_costs.push((node.clone(), cost));
        }

        let (node, alignment) = best?;
        if tracing_enabled {
            let mut state = task.state();
            state.trace.nodes_tried = node_costs.len();
            state.trace.node_costs = node_costs;
            state.trace.could_stop_fetching = could_stop_fetching;
            state.trace.no_alignment_found = no_alignment_found;
            state.trace.best_cost = Some(alignment.cost());
        }
        Some((node, alignment))
    }

    #[allow(clippy::too_many_arguments)]
    fn stalemate_between(
        &self,
        old: &Location,
        new: &Location,
        available: &HashMap<Location, Requirements>,
        assigned_pods: &HashMap<Location, usize>,
        task: &Task,
        threshold: f64,
        cluster: &ClusterSnapshot,
    ) -> bool {
        let (Some(old_node), Some(new_node)) = (cluster.node(old), cluster.node(new)) else {
            return false;
        };
        stalemate(
            old_node,
            new_node,
            available,
            assigned_pods,
            &task.request(),
            threshold,
            &mut *self.rng(),
        )
    }

    /// Tasks copying to a node may not exceed `max_copy_tasks_per_node`.
    ///
    /// Counts start at the number of tasks already copying to the node.
    fn only_allow_x_copy_to_node_tasks(
        &self,
        alignment: &NodeTaskFilesAlignment,
        copy_to_node: &mut HashMap<Location, usize>,
    ) -> bool {
        if !alignment.alignment.copy_from_somewhere(&alignment.node) {
            return true;
        }
        let count = copy_to_node
            .entry(alignment.node.clone())
            .or_insert_with(|| self.currently_copying.tasks_on_node(&alignment.node).len());
        if *count >= self.config.copy.max_copy_tasks_per_node {
            debug!(task = %alignment.task.name(), node = %alignment.node, "too many tasks copying to node");
            return false;
        }
        *count += 1;
        true
    }

    /// Place the tasks of `tasks`, largest input first.
    ///
    /// `available` loses the request of every placed task.
    pub fn create_alignment(
        &self,
        tasks: Vec<TaskData>,
        available: &mut HashMap<Location, Requirements>,
        cluster: &ClusterSnapshot,
    ) -> Vec<NodeTaskFilesAlignment> {
        let mut queue = SortedList::new(tasks, TaskData::compare_value_desc);
        let planned = CurrentlyCopying::new();
        let mut assigned_pods: HashMap<Location, usize> = HashMap::new();
        let mut copy_to_node: HashMap<Location, usize> = HashMap::new();
        let mut alignments = Vec::new();
        let mut index = 0;

        while let Some(mut data) = queue.poll() {
            let mut changed = false;
            if !data.weight_was_set() {
                if let Some(label) = data.task().out_label().cloned() {
                    if let Some(node) = self.out_labels().node_for_label(&label.label) {
                        data.set_node_and_weight(node, label.weight);
                        changed = true;
                    }
                }
            }
            if data.calculate(available) || changed {
                if !data.node_data().is_empty() {
                    queue.add(data);
                }
                continue;
            }

            index += 1;
            let Some((node, alignment)) =
                self.calculate_best_node(&data, &planned, available, &assigned_pods, cluster)
            else {
                continue;
            };
            let task = Arc::clone(data.task());
            let candidate = NodeTaskFilesAlignment::new(node.clone(), Arc::clone(&task), alignment, START_PRIORITY);
            if !self.only_allow_x_copy_to_node_tasks(&candidate, &mut copy_to_node) {
                continue;
            }

            if let Some(free) = available.get_mut(&node) {
                *free -= task.request();
            }
            *assigned_pods.entry(node.clone()).or_default() += 1;
            if self.config.scheduler.trace_enabled {
                let mut state = task.state();
                state.trace.place_in_queue = Some(index);
                state.trace.location_count = data.inputs().files.iter().map(|f| f.locations.len()).sum();
            }
            self.out_labels().schedule_task_on_node(&task, &node);
            if let Err(e) = planned.add_alignment(&candidate.alignment, &task, &node) {
                warn!(task = %task.name(), node = %node, error = %e, "planned copies collide");
            }
            alignments.push(candidate);
        }

        info!(aligned = alignments.len(), "cost-driven placement");
        alignments
    }
}
