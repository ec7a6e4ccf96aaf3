//! Load generation engine: catalog grouping, caller partitioning, weighted
//! selection, argument synthesis and the worker pool.

pub mod catalog;
pub mod partition;
pub mod selector;
pub mod synthesizer;
pub mod worker;

pub use catalog::{group_rows, MetadataCatalog};
pub use partition::partition;
pub use selector::WeightedSelector;
pub use synthesizer::ParameterSynthesizer;
pub use worker::{
    IterationOutcome, PoolReport, WorkerPool, WorkerReport, WorkerSettings, WorkerState,
};
