// src/alignment/cost.rs

use crate::location::LocationVersion;

use super::AlignmentWrapper;

/// Turns chosen file sources into a scalar cost.
pub trait CostFunction: Send + Sync {
    /// Cost of the first file taken from a source.
    fn init_cost(&self) -> f64;

    fn cost(&self, file: &LocationVersion) -> f64;

    /// Cost of `alignment`'s source after also taking `file` from it.
    fn calculate_cost(&self, alignment: Option<&AlignmentWrapper>, file: &LocationVersion) -> f64 {
        let current = match alignment {
            Some(a) if !a.is_empty() => a.cost(),
            _ => self.init_cost(),
        };
        current + self.cost(file)
    }
}

/// Charges the number of bytes moved.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinSizeCost {
    init_cost: f64,
}

impl MinSizeCost {
    pub fn new(init_cost: f64) -> Self {
        Self { init_cost }
    }
}

impl CostFunction for MinSizeCost {
    fn init_cost(&self) -> f64 {
        self.init_cost
    }

    fn cost(&self, file: &LocationVersion) -> f64 {
        file.size() as f64
    }
}
