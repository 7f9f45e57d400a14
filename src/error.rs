//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - ARGUS-001-009: Parse errors
//! - ARGUS-010-019: Validation errors (job graph)
//! - ARGUS-020-029: Render errors
//! - ARGUS-030-039: Dispatcher errors
//! - ARGUS-040-049: Configuration errors
//! - ARGUS-050-059: Config store errors
//! - ARGUS-090-099: IO errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Coarse error category, the taxonomy callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Validation,
    QueueFull,
    Internal,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    // ═══════════════════════════════════════════
    // PARSE ERRORS (001-009)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-001] Failed to parse workflow: {details}")]
    Parse { details: String },

    #[error("[ARGUS-002] Workflow source is empty")]
    EmptySource,

    // ═══════════════════════════════════════════
    // VALIDATION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-010] Duplicate job id '{job_id}'")]
    DuplicateJob { job_id: String },

    #[error("[ARGUS-011] Job '{job_id}' needs unknown job '{dep_id}'")]
    UnknownDependency { job_id: String, dep_id: String },

    #[error("[ARGUS-012] Dependency cycle detected: {cycle}")]
    CycleDetected { cycle: String },

    #[error("[ARGUS-013] Job id '{job_id}' is reserved for the root template")]
    ReservedJobId { job_id: String },

    // ═══════════════════════════════════════════
    // RENDER ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-020] Failed to render workflow: {details}")]
    Render { details: String },

    // ═══════════════════════════════════════════
    // DISPATCHER ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-030] Conversion queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },

    #[error("[ARGUS-032] Internal error: {reason}")]
    Internal { reason: String },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-040] Invalid configuration: {reason}")]
    Config { reason: String },

    // ═══════════════════════════════════════════
    // STORE ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[ARGUS-050] Config store lookup of '{namespace}/{key}' failed: {reason}")]
    Store {
        namespace: String,
        key: String,
        reason: String,
    },

    #[error("[ARGUS-090] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Parse { .. } | ConvertError::EmptySource => ErrorKind::Parse,
            ConvertError::DuplicateJob { .. }
            | ConvertError::UnknownDependency { .. }
            | ConvertError::CycleDetected { .. }
            | ConvertError::ReservedJobId { .. } => ErrorKind::Validation,
            ConvertError::QueueFull { .. } => ErrorKind::QueueFull,
            ConvertError::Render { .. }
            | ConvertError::Internal { .. }
            | ConvertError::Config { .. }
            | ConvertError::Store { .. }
            | ConvertError::Io(_) => ErrorKind::Internal,
        }
    }

    /// True for dangling dependencies, cycles and duplicate job ids
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Map this error to the status a transport layer reports to its caller
    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::Parse | ErrorKind::Validation => Status::BadInput,
            ErrorKind::QueueFull => Status::Busy,
            ErrorKind::Internal => Status::Failed,
        }
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        ConvertError::Render {
            details: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ConvertError {
    fn from(e: serde_yaml::Error) -> Self {
        ConvertError::Parse {
            details: e.to_string(),
        }
    }
}

impl FixSuggestion for ConvertError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ConvertError::Parse { .. } => Some("Check YAML syntax: indentation and quoting"),
            ConvertError::EmptySource => Some("Provide a non-empty workflow definition"),
            ConvertError::DuplicateJob { .. } => Some("Rename one of the jobs so every job id is unique"),
            ConvertError::UnknownDependency { .. } => {
                Some("Fix the job id in 'needs:' or add the missing job")
            }
            ConvertError::CycleDetected { .. } => {
                Some("Remove one of the 'needs:' edges so the jobs form a DAG")
            }
            ConvertError::ReservedJobId { .. } => Some("Rename the job; 'main' is the DAG entrypoint"),
            ConvertError::Render { .. } => None,
            ConvertError::QueueFull { .. } => Some("Service busy, retry later"),
            ConvertError::Internal { .. } => None,
            ConvertError::Config { .. } => Some("Check the config file and ARGUS_* environment variables"),
            ConvertError::Store { .. } => Some("Check the config store directory and namespace"),
            ConvertError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

/// Caller-visible outcome of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Busy,
    BadInput,
    Failed,
}

impl Status {
    /// HTTP-style status code for transports that want one
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadInput => 400,
            Status::Failed => 500,
            Status::Busy => 503,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Busy => "service busy, retry later",
            Status::BadInput => "bad input",
            Status::Failed => "conversion failed",
        }
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }
}
