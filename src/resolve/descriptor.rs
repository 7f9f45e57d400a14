//! Container descriptors decoded from config-store payloads
//!
//! Decoding is field by field over a generic YAML value so that a payload
//! with extra or oddly-typed fields still yields everything usable:
//! - unknown fields are ignored
//! - fields of the wrong type are skipped
//! - resource quantities that do not parse are dropped

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::quantity::Quantity;
use crate::error::{ConvertError, Result};
use crate::workflow::scalar_to_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Resources::is_empty")]
    pub resources: Resources,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(skip_serializing_if = "Lifecycle::is_empty")]
    pub lifecycle: Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resources {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, Quantity>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_start: Option<Handler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_stop: Option<Handler>,
}

impl Lifecycle {
    pub fn is_empty(&self) -> bool {
        self.post_start.is_none() && self.pre_stop.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handler {
    pub exec: ExecAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecAction {
    pub command: Vec<String>,
}

impl ContainerDescriptor {
    /// Decode a YAML payload. Only a non-mapping document is an error.
    pub fn from_yaml(payload: &[u8]) -> Result<Self> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_slice(payload)?;
        match value {
            Value::Mapping(map) => Ok(Self::from_mapping(&map)),
            Value::Null => Ok(Self::default()),
            other => Err(ConvertError::Parse {
                details: format!("container descriptor must be a mapping, got {}", type_name(&other)),
            }),
        }
    }

    pub fn from_mapping(map: &Mapping) -> Self {
        let mut container = Self::default();

        for (key, value) in map {
            match key.as_str() {
                Some("name") => container.name = value.as_str().map(str::to_string),
                Some("image") => container.image = value.as_str().map(str::to_string),
                Some("imagePullPolicy") => {
                    container.image_pull_policy = value.as_str().map(str::to_string)
                }
                Some("command") => container.command = string_list(value),
                Some("args") => container.args = string_list(value),
                Some("env") => container.env = parse_env(value),
                Some("resources") => {
                    if let Some(resources) = value.as_mapping() {
                        container.resources = parse_resources(resources);
                    }
                }
                Some("volumeMounts") => {
                    if let Some(mounts) = value.as_sequence() {
                        container.volume_mounts = mounts
                            .iter()
                            .filter_map(Value::as_mapping)
                            .map(parse_volume_mount)
                            .collect();
                    }
                }
                Some("lifecycle") => {
                    if let Some(lifecycle) = value.as_mapping() {
                        container.lifecycle = parse_lifecycle(lifecycle);
                    }
                }
                _ => {}
            }
        }

        container
    }

    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|i| !i.trim().is_empty())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn parse_env(value: &Value) -> Vec<EnvVar> {
    let Some(items) = value.as_sequence() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.to_string();
            let value = item.get("value").and_then(scalar_to_string).unwrap_or_default();
            Some(EnvVar { name, value })
        })
        .collect()
}

fn parse_quantities(value: Option<&Value>) -> BTreeMap<String, Quantity> {
    let Some(map) = value.and_then(Value::as_mapping) else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let name = k.as_str()?;
            // Strings and bare numbers; anything else is dropped
            let quantity = Quantity::parse(&scalar_to_string(v)?)?;
            Some((name.to_string(), quantity))
        })
        .collect()
}

fn parse_resources(resources: &Mapping) -> Resources {
    Resources {
        limits: parse_quantities(resources.get("limits")),
        requests: parse_quantities(resources.get("requests")),
    }
}

fn parse_volume_mount(mount: &Mapping) -> VolumeMount {
    let text = |field: &str| {
        mount
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    VolumeMount {
        name: text("name"),
        mount_path: text("mountPath"),
        read_only: mount
            .get("readOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn parse_handler(handler: &Value) -> Option<Handler> {
    let command = handler.get("exec")?.get("command")?;
    Some(Handler {
        exec: ExecAction {
            command: string_list(command),
        },
    })
}

fn parse_lifecycle(lifecycle: &Mapping) -> Lifecycle {
    Lifecycle {
        post_start: lifecycle.get("postStart").and_then(parse_handler),
        pre_stop: lifecycle.get("preStop").and_then(parse_handler),
    }
}
