// src/types.rs

use std::str::FromStr;

use serde::Deserialize;

/// Verbosity of the `tracing` subscriber installed by
/// [`init_logging`](crate::logging::init_logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// How a source is chosen for each file that must be copied.
///
/// - `Greedy`: the source that raises the alignment cost the least.
/// - `Random`: the target node's own version if it has one, else a random
///   admissible source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentStrategy {
    #[default]
    Greedy,
    Random,
}

impl FromStr for AlignmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "greedy" => Ok(AlignmentStrategy::Greedy),
            "random" => Ok(AlignmentStrategy::Random),
            other => Err(format!(
                "invalid alignment strategy: {other} (expected \"greedy\" or \"random\")"
            )),
        }
    }
}

/// Cost charged per copied file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CostFunctionKind {
    /// Bytes moved, on top of a fixed per-source start cost.
    #[default]
    MinSize,
}

impl FromStr for CostFunctionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minsize" => Ok(CostFunctionKind::MinSize),
            other => Err(format!(
                "invalid cost function: {other} (expected \"minsize\")"
            )),
        }
    }
}

/// How a scheduling pass places tasks.
///
/// - `Cost`: every task goes to the node where fetching its inputs is
///   cheapest, copying as needed.
/// - `Ready`: only tasks whose inputs are all on some node are placed, and
///   background copies prepare the rest.
///
/// Both strategies start background copies for tasks left unplaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingStrategy {
    #[default]
    Cost,
    Ready,
}

impl FromStr for SchedulingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cost" => Ok(SchedulingStrategy::Cost),
            "ready" => Ok(SchedulingStrategy::Ready),
            other => Err(format!(
                "invalid scheduling strategy: {other} (expected \"cost\" or \"ready\")"
            )),
        }
    }
}
