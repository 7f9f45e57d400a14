//! Environment resolution: runner label → container descriptor
//!
//! Looks up `<label>.yaml` in the configured namespace of the config store.
//! Every failure here is recoverable: the job continues with an empty
//! descriptor and the converter's fallback image, and the reason is
//! reported as a [`ResolutionWarning`].

mod descriptor;
mod quantity;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::store::ConfigStore;
use crate::util::constants::LABEL_KEY_SUFFIX;

pub use descriptor::{
    ContainerDescriptor, EnvVar, ExecAction, Handler, Lifecycle, Resources, VolumeMount,
};
pub use quantity::Quantity;

/// Why a job fell back to the default descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// The job declares no runner label
    NoLabel { job_id: String },
    /// The store has no entry for the label
    Missing { job_id: String, key: String },
    /// The store lookup itself failed
    LookupFailed {
        job_id: String,
        key: String,
        reason: String,
    },
    /// The entry exists but is not a usable descriptor
    Malformed {
        job_id: String,
        key: String,
        reason: String,
    },
}

impl ResolutionWarning {
    pub fn job_id(&self) -> &str {
        match self {
            ResolutionWarning::NoLabel { job_id }
            | ResolutionWarning::Missing { job_id, .. }
            | ResolutionWarning::LookupFailed { job_id, .. }
            | ResolutionWarning::Malformed { job_id, .. } => job_id,
        }
    }

    /// Store key that was consulted, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            ResolutionWarning::NoLabel { .. } => None,
            ResolutionWarning::Missing { key, .. }
            | ResolutionWarning::LookupFailed { key, .. }
            | ResolutionWarning::Malformed { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::NoLabel { job_id } => {
                write!(f, "job '{job_id}' has no runs-on label, using default container")
            }
            ResolutionWarning::Missing { job_id, key } => {
                write!(f, "job '{job_id}': no config entry '{key}', using default container")
            }
            ResolutionWarning::LookupFailed { job_id, key, reason } => {
                write!(f, "job '{job_id}': lookup of '{key}' failed ({reason}), using default container")
            }
            ResolutionWarning::Malformed { job_id, key, reason } => {
                write!(f, "job '{job_id}': config entry '{key}' is unusable ({reason}), using default container")
            }
        }
    }
}

/// Outcome of resolving one job's environment
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub descriptor: ContainerDescriptor,
    pub warning: Option<ResolutionWarning>,
}

impl Resolution {
    fn fallback(warning: ResolutionWarning) -> Self {
        warn!(job = warning.job_id(), key = warning.key(), "{}", warning);
        Self {
            descriptor: ContainerDescriptor::default(),
            warning: Some(warning),
        }
    }
}

/// Resolves runner labels through an explicitly supplied store client
#[derive(Clone)]
pub struct EnvironmentResolver {
    store: Arc<dyn ConfigStore>,
    namespace: Arc<str>,
}

impl EnvironmentResolver {
    pub fn new(store: Arc<dyn ConfigStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: Arc::from(namespace),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store key for a runner label
    pub fn store_key(label: &str) -> String {
        format!("{label}{LABEL_KEY_SUFFIX}")
    }

    /// Resolve a job's first runner label. Never fails.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn resolve(&self, job_id: &str, label: Option<&str>) -> Resolution {
        let Some(label) = label else {
            return Resolution::fallback(ResolutionWarning::NoLabel {
                job_id: job_id.to_string(),
            });
        };
        let key = Self::store_key(label);

        let payload = match self.store.lookup(&self.namespace, &key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                return Resolution::fallback(ResolutionWarning::Missing {
                    job_id: job_id.to_string(),
                    key,
                })
            }
            Err(e) => {
                return Resolution::fallback(ResolutionWarning::LookupFailed {
                    job_id: job_id.to_string(),
                    key,
                    reason: e.to_string(),
                })
            }
        };

        match ContainerDescriptor::from_yaml(&payload) {
            Ok(descriptor) => {
                debug!(key = %key, image = ?descriptor.image, "resolved runner label");
                Resolution {
                    descriptor,
                    warning: None,
                }
            }
            Err(e) => Resolution::fallback(ResolutionWarning::Malformed {
                job_id: job_id.to_string(),
                key,
                reason: e.to_string(),
            }),
        }
    }
}
