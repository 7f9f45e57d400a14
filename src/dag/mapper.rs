//! Dependency & condition mapping for a single job

use rustc_hash::FxHashSet;

use crate::error::{ConvertError, Result};
use crate::workflow::Job;

/// Edges and guard of one DAG task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdges {
    /// Predecessors, source order, duplicates removed
    pub dependencies: Vec<String>,
    /// Guard expression copied verbatim; empty if none
    pub when: String,
    /// `continue-on-error: true` on the job
    pub continue_on_failed: bool,
}

/// Deduplicate, keeping the first occurrence of each id
pub fn normalize_needs<'a>(needs: &[&'a str]) -> Vec<&'a str> {
    let mut seen = FxHashSet::with_capacity_and_hasher(needs.len(), Default::default());
    needs.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Map a job's `needs` and `if` to DAG edges.
///
/// `is_known` answers whether a job id exists in the enclosing workflow.
/// The guard is not translated between expression dialects.
pub fn map_job<F>(job_id: &str, job: &Job, is_known: F) -> Result<TaskEdges>
where
    F: Fn(&str) -> bool,
{
    let needs = job.needs();
    let dependencies = normalize_needs(&needs);

    if let Some(missing) = dependencies.iter().find(|&&dep| !is_known(dep)) {
        return Err(ConvertError::UnknownDependency {
            job_id: job_id.to_string(),
            dep_id: missing.to_string(),
        });
    }

    Ok(TaskEdges {
        dependencies: dependencies.into_iter().map(str::to_string).collect(),
        when: job.condition().to_string(),
        continue_on_failed: job.continue_on_error,
    })
}
