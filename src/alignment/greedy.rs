// src/alignment/greedy.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::Result;
use crate::inputs::PathFileLocationTriple;
use crate::location::Location;

use super::{AlignmentWrapper, CostFunction, Costs, FilePath, InputAlignment, validate_weight};

/// Takes each file from the source that keeps the plan cheapest so far.
///
/// The plan cost is `max_individual * w + sum * (1 - w)`, where
/// `max_individual` is the cost of the busiest source and `sum` the cost of
/// everything copied. A version already on the target node costs nothing.
pub struct GreedyAlignment {
    weight_for_individual_node: f64,
    cost_function: Box<dyn CostFunction>,
}

impl GreedyAlignment {
    pub fn new(weight_for_individual_node: f64, cost_function: Box<dyn CostFunction>) -> Result<Self> {
        Ok(Self {
            weight_for_individual_node: validate_weight(weight_for_individual_node)?,
            cost_function,
        })
    }
}

impl InputAlignment for GreedyAlignment {
    fn weight_for_individual_node(&self) -> f64 {
        self.weight_for_individual_node
    }

    fn find_alignment_for_file(
        &self,
        file: &Arc<PathFileLocationTriple>,
        node: &Location,
        map: &mut BTreeMap<Location, AlignmentWrapper>,
        costs: Costs,
    ) -> Costs {
        let mut best: Option<(usize, Costs, f64)> = None;

        for (idx, version) in file.locations.iter().enumerate() {
            let (candidate, individual) = if version.location() != node {
                let individual = self
                    .cost_function
                    .calculate_cost(map.get(version.location()), version);
                let sum = costs.sum_of_costs + self.cost_function.cost(version);
                let max_individual = individual.max(costs.max_cost_for_individual_node);
                (
                    Costs {
                        max_cost_for_individual_node: max_individual,
                        sum_of_costs: sum,
                        calculated_cost: self.calculate_cost(max_individual, sum),
                    },
                    individual,
                )
            } else {
                let local = Costs {
                    calculated_cost: self.calculate_cost(
                        costs.max_cost_for_individual_node,
                        costs.sum_of_costs,
                    ),
                    ..costs
                };
                (local, 0.0)
            };
            if best
                .as_ref()
                .is_none_or(|(_, b, _)| candidate.calculated_cost < b.calculated_cost)
            {
                best = Some((idx, candidate, individual));
            }
        }

        let Some((idx, next, individual)) = best else {
            return costs;
        };
        let version = Arc::clone(&file.locations[idx]);
        let size = version.size();
        map.entry(version.location().clone())
            .or_default()
            .add_alignment_to_copy(FilePath::new(Arc::clone(file), version), individual, size);
        next
    }
}
