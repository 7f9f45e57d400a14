//! Centralized constants for Argus runtime configuration
//!
//! All pool sizes and fallback values in one place for easy tuning.

// ═══════════════════════════════════════════════════════════════
// Dispatcher
// ═══════════════════════════════════════════════════════════════

/// Number of conversion workers
pub const DEFAULT_WORKERS: usize = 5;

/// Maximum number of queued (not yet started) conversion requests
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

// ═══════════════════════════════════════════════════════════════
// Config store
// ═══════════════════════════════════════════════════════════════

/// Namespace holding the runner-label descriptors
pub const DEFAULT_NAMESPACE: &str = "argo";

/// Suffix appended to a runner label to form the store key
pub const LABEL_KEY_SUFFIX: &str = ".yaml";

// ═══════════════════════════════════════════════════════════════
// Converter
// ═══════════════════════════════════════════════════════════════

/// Image used when neither the store nor the job names one
pub const DEFAULT_IMAGE: &str = "ubuntu:22.04";

/// Shell used to run the assembled script
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Name of the root DAG template and the workflow entrypoint
pub const ROOT_TEMPLATE: &str = "main";

pub const ARGO_API_VERSION: &str = "argoproj.io/v1alpha1";
pub const ARGO_KIND: &str = "Workflow";
