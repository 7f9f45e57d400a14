//! Utilities Module - shared infrastructure
//!
//! - `constants`: Centralized defaults for the dispatcher, store and converter

pub mod constants;

// Re-export public types
pub use constants::{
    DEFAULT_IMAGE, DEFAULT_NAMESPACE, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHELL, DEFAULT_WORKERS,
    ROOT_TEMPLATE,
};
