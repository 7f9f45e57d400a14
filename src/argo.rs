//! Target workflow resource
//!
//! Only the subset of the `argoproj.io/v1alpha1` Workflow schema the
//! converter emits. Field names serialize in camelCase, empty optional
//! parts are omitted.

use serde::Serialize;

use crate::resolve::ContainerDescriptor;
use crate::util::constants::{ARGO_API_VERSION, ARGO_KIND, ROOT_TEMPLATE};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: WorkflowSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub generate_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    pub entrypoint: String,
    pub templates: Vec<Template>,
}

/// A template is backed by exactly one of `container` or `dag`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<u64>,
}

impl Template {
    pub fn container(name: &str, container: ContainerDescriptor) -> Self {
        Self {
            name: name.to_string(),
            container: Some(container),
            dag: None,
            active_deadline_seconds: None,
        }
    }

    pub fn dag(name: &str, tasks: Vec<DagTask>) -> Self {
        Self {
            name: name.to_string(),
            container: None,
            dag: Some(DagTemplate { tasks }),
            active_deadline_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DagTemplate {
    pub tasks: Vec<DagTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DagTask {
    pub name: String,
    pub template: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub when: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on: Option<ContinueOn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContinueOn {
    pub failed: bool,
}

impl Workflow {
    /// Empty workflow named after `workflow_name`, entrypoint set to the root template
    pub fn new(workflow_name: &str) -> Self {
        Self {
            api_version: ARGO_API_VERSION.to_string(),
            kind: ARGO_KIND.to_string(),
            metadata: Metadata {
                generate_name: generate_name(workflow_name),
            },
            spec: WorkflowSpec {
                entrypoint: ROOT_TEMPLATE.to_string(),
                templates: Vec::new(),
            },
        }
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.spec.templates.iter().find(|t| t.name == name)
    }

    /// The root DAG template's tasks
    pub fn root_tasks(&self) -> &[DagTask] {
        self.template(ROOT_TEMPLATE)
            .and_then(|t| t.dag.as_ref())
            .map(|d| d.tasks.as_slice())
            .unwrap_or(&[])
    }
}

/// `generateName` prefix: lower-cased, non `[a-z0-9-]` runs collapsed to `-`,
/// trimmed, `workflow` when nothing is left, always ending in `-`.
pub fn generate_name(workflow_name: &str) -> String {
    let mut prefix = String::with_capacity(workflow_name.len() + 1);
    let mut pending_dash = false;

    for c in workflow_name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !prefix.is_empty() {
                prefix.push('-');
            }
            pending_dash = false;
            prefix.push(c);
        } else {
            pending_dash = true;
        }
    }

    if prefix.is_empty() {
        prefix.push_str("workflow");
    }
    prefix.push('-');
    prefix
}
