//! JobGraph - DAG structure built from a workflow's `needs:` edges
//!
//! Uses Arc<str> for zero-cost cloning of job IDs.
//!
//! Validation on construction:
//! - Duplicate job ids
//! - A job named like the root template
//! - Dependencies on undeclared jobs
//!
//! Cycle detection is explicit (`detect_cycles`): the target DAG format
//! does not reject cycles itself.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ConvertError, Result};
use crate::util::constants::ROOT_TEMPLATE;
use crate::workflow::WorkflowSpec;

use super::mapper::{map_job, TaskEdges};

/// Graph of job dependencies
pub struct JobGraph {
    /// job_id -> list of successor job_ids (walked by cycle detection)
    adjacency: FxHashMap<Arc<str>, Vec<Arc<str>>>,
    /// job_id -> mapped edges (dependencies + guard)
    edges: FxHashMap<Arc<str>, TaskEdges>,
    /// All job IDs, source order
    job_ids: Vec<Arc<str>>,
}

impl JobGraph {
    /// Build the graph, rejecting duplicate ids and undeclared dependencies
    pub fn from_workflow(workflow: &WorkflowSpec) -> Result<Self> {
        let capacity = workflow.jobs.len();
        let mut adjacency: FxHashMap<Arc<str>, Vec<Arc<str>>> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut edges: FxHashMap<Arc<str>, TaskEdges> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut job_ids: Vec<Arc<str>> = Vec::with_capacity(capacity);
        let mut job_set: FxHashSet<Arc<str>> =
            FxHashSet::with_capacity_and_hasher(capacity, Default::default());

        // Create Arc<str> once per job, reuse everywhere
        for (id, _) in &workflow.jobs {
            if id == ROOT_TEMPLATE {
                return Err(ConvertError::ReservedJobId { job_id: id.clone() });
            }
            let id: Arc<str> = Arc::from(id.as_str());
            if !job_set.insert(Arc::clone(&id)) {
                return Err(ConvertError::DuplicateJob {
                    job_id: id.to_string(),
                });
            }
            job_ids.push(Arc::clone(&id));
            adjacency.insert(id, Vec::new());
        }

        for (id, job) in &workflow.jobs {
            let mapped = map_job(id, job, |dep| job_set.contains(dep))?;

            // Every dependency is in job_set (checked by map_job)
            let target = job_set
                .get(id.as_str())
                .cloned()
                .unwrap_or_else(|| Arc::from(id.as_str()));
            for dep in &mapped.dependencies {
                if let Some(successors) = adjacency.get_mut(dep.as_str()) {
                    successors.push(Arc::clone(&target));
                }
            }
            edges.insert(target, mapped);
        }

        Ok(Self {
            adjacency,
            edges,
            job_ids,
        })
    }

    /// Number of jobs
    pub fn len(&self) -> usize {
        self.job_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.job_ids.is_empty()
    }

    /// Mapped edges of a job
    pub fn edges(&self, job_id: &str) -> Option<&TaskEdges> {
        self.edges.get(job_id)
    }

    /// Get dependencies of a job
    pub fn dependencies(&self, job_id: &str) -> &[String] {
        self.edges
            .get(job_id)
            .map(|e| e.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Detect cycles using DFS with three-color marking.
    ///
    /// Returns `Err(ConvertError::CycleDetected)` with the cycle path, e.g.
    /// `a → b → a`. Traversal follows source order, so the reported cycle
    /// is stable for a given input. The walk keeps its own frame stack, so
    /// arbitrarily long `needs` chains use constant call-stack depth.
    pub fn detect_cycles(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        const NO_SUCCESSORS: &[Arc<str>] = &[];

        let mut colors: FxHashMap<&str, Color> = self
            .job_ids
            .iter()
            .map(|id| (id.as_ref(), Color::White))
            .collect();
        // (node, index of the next successor to visit); also the gray path
        let mut frames: Vec<(&Arc<str>, usize)> = Vec::new();

        for root in &self.job_ids {
            if colors.get(root.as_ref()) != Some(&Color::White) {
                continue;
            }
            colors.insert(root.as_ref(), Color::Gray);
            frames.push((root, 0));

            while let Some(frame) = frames.last_mut() {
                let (node, next) = *frame;
                let successors = self
                    .adjacency
                    .get(node)
                    .map(|v| v.as_slice())
                    .unwrap_or(NO_SUCCESSORS);

                let Some(neighbor) = successors.get(next) else {
                    colors.insert(node.as_ref(), Color::Black);
                    frames.pop();
                    continue;
                };
                frame.1 += 1;

                match colors.get(neighbor.as_ref()) {
                    Some(Color::Gray) => {
                        let cycle_start = frames
                            .iter()
                            .position(|(id, _)| *id == neighbor)
                            .unwrap_or(0);
                        let cycle: Vec<&str> =
                            frames[cycle_start..].iter().map(|(id, _)| id.as_ref()).collect();
                        return Err(ConvertError::CycleDetected {
                            cycle: format!("{} → {}", cycle.join(" → "), neighbor),
                        });
                    }
                    Some(Color::White) | None => {
                        colors.insert(neighbor.as_ref(), Color::Gray);
                        frames.push((neighbor, 0));
                    }
                    Some(Color::Black) => {}
                }
            }
        }

        Ok(())
    }

    /// Build and fully validate (duplicates, unknown dependencies, cycles)
    pub fn validated(workflow: &WorkflowSpec) -> Result<Self> {
        let graph = Self::from_workflow(workflow)?;
        graph.detect_cycles()?;
        Ok(graph)
    }
}
