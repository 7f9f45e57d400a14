//! Workflow parsing structures
//!
//! Strongly-typed view of a CI workflow file: every field the converter
//! reads (`needs`, `if`, `runs-on`, `container`, `steps`) is a named field.
//! Unknown keys (`on`, `permissions`, `strategy`, ...) are ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::error::{ConvertError, Result};

/// Workflow parsed from YAML (raw)
#[derive(Debug, Deserialize)]
struct WorkflowRaw {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    env: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "ordered_jobs")]
    jobs: Vec<(String, Job)>,
}

/// A parsed workflow. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSpec {
    pub name: String,
    /// Workflow-level environment, inherited by every job
    pub env: BTreeMap<String, String>,
    /// Jobs in source order. Duplicate ids are kept here and rejected by
    /// [`crate::dag::JobGraph`] so they surface as validation errors.
    pub jobs: Vec<(String, Job)>,
}

impl<'de> Deserialize<'de> for WorkflowSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = WorkflowRaw::deserialize(deserializer)?;
        Ok(WorkflowSpec {
            name: raw.name.unwrap_or_default(),
            env: raw.env,
            jobs: raw.jobs,
        })
    }
}

impl WorkflowSpec {
    /// Parse raw workflow bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ConvertError::EmptySource);
        }
        Ok(serde_yaml::from_slice(bytes)?)
    }

    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|(k, _)| k == id).map(|(_, job)| job)
    }

    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|(id, _)| id.as_str())
    }
}

impl std::str::FromStr for WorkflowSpec {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_slice(s.as_bytes())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Display name (not used as an id)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub needs: Option<Needs>,
    /// Guard expression, passed through untranslated
    #[serde(default, rename = "if", deserialize_with = "scalar_string")]
    pub condition: Option<String>,
    #[serde(default)]
    pub runs_on: Option<RunsOn>,
    #[serde(default)]
    pub container: Option<InlineContainer>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub env: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub timeout_minutes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub continue_on_error: bool,
}

impl Job {
    /// Declared predecessors in source order (may contain duplicates)
    pub fn needs(&self) -> Vec<&str> {
        self.needs.as_ref().map(Needs::as_vec).unwrap_or_default()
    }

    /// Guard string, empty if none
    pub fn condition(&self) -> &str {
        self.condition.as_deref().unwrap_or("")
    }

    /// First runner label; the only one consulted
    pub fn target_label(&self) -> Option<&str> {
        self.runs_on.as_ref().and_then(RunsOn::first_label)
    }

    pub fn inline_image(&self) -> Option<&str> {
        self.container.as_ref().and_then(InlineContainer::image)
    }
}

/// A single step. Steps without `run` (marketplace actions) are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
}

impl Step {
    pub fn shell(name: Option<&str>, run: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            run: Some(run.to_string()),
            uses: None,
        }
    }
}

/// Handles string OR array for `needs`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Needs {
    Single(String),
    Multiple(Vec<String>),
}

impl Needs {
    pub fn as_vec(&self) -> Vec<&str> {
        match self {
            Needs::Single(s) => vec![s.as_str()],
            Needs::Multiple(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// `runs-on: label`, `runs-on: [a, b]` or `runs-on: { group, labels }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
    Group {
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        labels: Option<Needs>,
    },
}

impl RunsOn {
    pub fn first_label(&self) -> Option<&str> {
        let label = match self {
            RunsOn::Label(s) => Some(s.as_str()),
            RunsOn::Labels(v) => v.first().map(String::as_str),
            RunsOn::Group { labels, group } => labels
                .as_ref()
                .and_then(|l| l.as_vec().into_iter().next())
                .or(group.as_deref()),
        };
        label.map(str::trim).filter(|l| !l.is_empty())
    }
}

/// `container: image` or `container: { image, env }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InlineContainer {
    Image(String),
    Spec {
        #[serde(default)]
        image: Option<String>,
        #[serde(default, deserialize_with = "scalar_map")]
        env: BTreeMap<String, String>,
    },
}

impl InlineContainer {
    pub fn image(&self) -> Option<&str> {
        let image = match self {
            InlineContainer::Image(s) => Some(s.as_str()),
            InlineContainer::Spec { image, .. } => image.as_deref(),
        };
        image.filter(|i| !i.trim().is_empty())
    }

    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            InlineContainer::Image(_) => None,
            InlineContainer::Spec { env, .. } => Some(env),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Lenient field decoders
// ═══════════════════════════════════════════════════════════════

/// Render a YAML scalar as the string the CI engine would see
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(&v).map(|v| (k, v)))
        .collect())
}

/// Numbers or numeric strings; expressions like `${{ ... }}` are ignored
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim() == "true",
        _ => false,
    })
}

/// Keep jobs in source order and keep duplicate keys for validation
fn ordered_jobs<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, Job)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct JobsVisitor;

    impl<'de> Visitor<'de> for JobsVisitor {
        type Value = Vec<(String, Job)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of job id to job")
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut jobs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, job)) = map.next_entry::<String, Option<Job>>()? {
                jobs.push((id, job.unwrap_or_default()));
            }
            Ok(jobs)
        }
    }

    deserializer.deserialize_any(JobsVisitor)
}
