//! Template builder and the bytes → payload conversion pipeline
//!
//! One conversion is: parse → validate the job graph → resolve every job's
//! runner label → assemble scripts → compose templates → render.
//! All validation happens before any template is built, so a failing
//! conversion produces no partial output.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use futures::future::join_all;
use tracing::{debug, info, instrument};

use crate::argo::{ContinueOn, DagTask, Template, Workflow};
use crate::dag::JobGraph;
use crate::error::{ConvertError, Result};
use crate::resolve::{ContainerDescriptor, EnvVar, EnvironmentResolver, ResolutionWarning};
use crate::script;
use crate::util::constants::{DEFAULT_IMAGE, DEFAULT_SHELL, ROOT_TEMPLATE};
use crate::workflow::{Job, WorkflowSpec};

/// Serialization of the produced resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConvertError::Config {
                reason: format!("unknown output format '{other}' (expected yaml or json)"),
            }),
        }
    }
}

/// A built workflow plus the recovered resolution problems
#[derive(Debug, Clone)]
pub struct Conversion {
    pub workflow: Workflow,
    pub warnings: Vec<ResolutionWarning>,
}

impl Conversion {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(&self.workflow).map_err(|e| ConvertError::Render {
                    details: e.to_string(),
                })
            }
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.workflow)?),
        }
    }
}

/// Serialized result handed back to a submitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub payload: String,
    pub format: OutputFormat,
    pub warnings: Vec<ResolutionWarning>,
}

/// Stateless between calls; safe to share across workers behind an `Arc`
#[derive(Clone)]
pub struct Converter {
    resolver: EnvironmentResolver,
    default_image: String,
    shell: String,
    format: OutputFormat,
}

impl Converter {
    pub fn new(resolver: EnvironmentResolver) -> Self {
        Self {
            resolver,
            default_image: DEFAULT_IMAGE.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            format: OutputFormat::default(),
        }
    }

    pub fn with_default_image(mut self, image: impl Into<String>) -> Self {
        self.default_image = image.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn default_image(&self) -> &str {
        &self.default_image
    }

    /// Full pipeline: raw workflow bytes → serialized resource
    pub async fn convert(&self, source: &[u8]) -> Result<ConversionOutput> {
        let workflow = WorkflowSpec::from_slice(source)?;
        let conversion = self.build(&workflow).await?;
        Ok(ConversionOutput {
            payload: conversion.render(self.format)?,
            format: self.format,
            warnings: conversion.warnings,
        })
    }

    /// Compose the target workflow from an already parsed source
    #[instrument(skip(self, workflow), fields(workflow = %workflow.name, jobs = workflow.jobs.len()))]
    pub async fn build(&self, workflow: &WorkflowSpec) -> Result<Conversion> {
        let graph = JobGraph::validated(workflow)?;

        let resolutions = join_all(
            workflow
                .jobs
                .iter()
                .map(|(id, job)| self.resolver.resolve(id, job.target_label())),
        )
        .await;

        let mut argo = Workflow::new(&workflow.name);
        let mut tasks = Vec::with_capacity(workflow.jobs.len());
        let mut job_templates = Vec::with_capacity(workflow.jobs.len());
        let mut warnings = Vec::new();

        for ((id, job), resolution) in workflow.jobs.iter().zip(resolutions) {
            let edges = graph.edges(id).cloned().unwrap_or_default();
            tasks.push(DagTask {
                name: id.clone(),
                template: id.clone(),
                dependencies: edges.dependencies,
                when: edges.when,
                continue_on: edges
                    .continue_on_failed
                    .then_some(ContinueOn { failed: true }),
            });

            let container = self.merge_container(resolution.descriptor, job, &workflow.env);
            debug!(job = %id, image = ?container.image, "built job template");
            let mut template = Template::container(id, container);
            template.active_deadline_seconds = job.timeout_minutes.map(|m| m.saturating_mul(60));
            job_templates.push(template);

            warnings.extend(resolution.warning);
        }

        argo.spec.templates.push(Template::dag(ROOT_TEMPLATE, tasks));
        argo.spec.templates.extend(job_templates);

        info!(
            templates = argo.spec.templates.len(),
            warnings = warnings.len(),
            "conversion built"
        );
        Ok(Conversion {
            workflow: argo,
            warnings,
        })
    }

    /// Merge the resolved descriptor with the job's own settings.
    ///
    /// Image: resolved, then inline, then the configured default.
    /// Env: resolved entries, overridden by workflow env, job env, then
    /// inline container env. Command and args always run the job script.
    fn merge_container(
        &self,
        mut container: ContainerDescriptor,
        job: &Job,
        workflow_env: &BTreeMap<String, String>,
    ) -> ContainerDescriptor {
        if !container.has_image() {
            container.image = Some(
                job.inline_image()
                    .unwrap_or(self.default_image.as_str())
                    .to_string(),
            );
        }

        let mut overrides = workflow_env.clone();
        overrides.extend(job.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(inline_env) = job.container.as_ref().and_then(|c| c.env()) {
            overrides.extend(inline_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for (name, value) in overrides {
            match container.env.iter_mut().find(|e| e.name == name) {
                Some(existing) => existing.value = value,
                None => container.env.push(EnvVar { name, value }),
            }
        }

        container.command = vec![self.shell.clone(), "-c".to_string()];
        container.args = vec![script::assemble(&job.steps)];
        container
    }
}
