//! DAG Module - job dependency graph
//!
//! - `mapper`: `needs:` / `if:` of one job → DAG edges and guard
//! - `graph`: JobGraph over all jobs (duplicate, unknown-dependency and cycle checks)
//!
//! JobGraph is immutable after construction.

mod graph;
mod mapper;

pub use graph::JobGraph;
pub use mapper::{map_job, normalize_needs, TaskEdges};
