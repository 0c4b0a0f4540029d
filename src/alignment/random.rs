// src/alignment/random.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::inputs::PathFileLocationTriple;
use crate::location::Location;

use super::{AlignmentWrapper, Costs, FilePath, InputAlignment};

/// Uses the version on the target node if there is one, otherwise a random
/// admissible source. Cost is the number of bytes taken.
pub struct RandomAlignment {
    rng: Mutex<StdRng>,
}

impl RandomAlignment {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for RandomAlignment {
    fn default() -> Self {
        Self::new()
    }
}

impl InputAlignment for RandomAlignment {
    fn weight_for_individual_node(&self) -> f64 {
        0.0
    }

    fn find_alignment_for_file(
        &self,
        file: &Arc<PathFileLocationTriple>,
        node: &Location,
        map: &mut BTreeMap<Location, AlignmentWrapper>,
        costs: Costs,
    ) -> Costs {
        if file.locations.is_empty() {
            return costs;
        }
        let version = match file.version_on_location(node) {
            Some(local) => Arc::clone(local),
            None => {
                let idx = self
                    .rng
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .random_range(0..file.locations.len());
                Arc::clone(&file.locations[idx])
            }
        };
        let size = version.size();
        map.entry(version.location().clone())
            .or_default()
            .add_alignment_to_copy(FilePath::new(Arc::clone(file), version), 0.0, size);
        let calculated = costs.sum_of_costs + size as f64;
        Costs {
            max_cost_for_individual_node: 0.0,
            sum_of_costs: calculated,
            calculated_cost: calculated,
        }
    }
}
