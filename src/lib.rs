//! Argus - CI workflow to container-DAG converter
//!
//! Parses a CI workflow (jobs, steps, `needs`, `if`, `runs-on`), resolves
//! each job's runner label to a container descriptor through a config
//! store, and emits an `argoproj.io/v1alpha1` Workflow with one container
//! template per job plus a root DAG template. Conversions run on a fixed
//! worker pool behind a bounded queue ([`Dispatcher`]).

pub mod argo;
pub mod config;
pub mod convert;
pub mod dag;
pub mod dispatch;
pub mod error;
pub mod resolve;
pub mod script;
pub mod store;
pub mod util;
pub mod workflow;

pub use config::ArgusConfig;
pub use convert::{Conversion, ConversionOutput, Converter, OutputFormat};
pub use dag::JobGraph;
pub use dispatch::{Dispatcher, DispatcherConfig, DispatcherStats, RequestState, Ticket};
pub use error::{ConvertError, ErrorKind, FixSuggestion, Result, Status};
pub use resolve::{ContainerDescriptor, EnvironmentResolver, Resolution, ResolutionWarning};
pub use store::{ConfigStore, DirStore, MemoryStore};
pub use workflow::WorkflowSpec;
