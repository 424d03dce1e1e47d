//! Common types for Trellis: chart tree, deferred producers, metadata, and errors
//!
//! Every workload crate builds on the pieces here:
//! - [`chart`] - the document tree that assigns identities and synthesizes YAML
//! - [`lazy`] - deferred producers invoked only at synthesis time
//! - [`meta`] - Kubernetes `ObjectMeta` shared by all resources
//! - [`names`] - DNS label sanitization and stable name derivation
//! - [`telemetry`] - tracing subscriber setup
//! - [`error`] - error types for chart operations

#![deny(missing_docs)]

pub mod chart;
pub mod error;
pub mod lazy;
pub mod meta;
pub mod names;
pub mod telemetry;

pub use chart::{ApiObject, Chart, Handle, Manifest};
pub use error::{BoxError, Error};
pub use lazy::Lazy;
pub use meta::ObjectMeta;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Standard label carrying the resource name
pub const LABEL_NAME: &str = "app.kubernetes.io/name";

/// Standard label identifying the tool that generated a resource
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] for resources synthesized by Trellis
pub const LABEL_MANAGED_BY_TRELLIS: &str = "trellis";
