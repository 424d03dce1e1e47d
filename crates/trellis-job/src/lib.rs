//! Job workload for Trellis
//!
//! A pod template that runs to completion, with retry, deadline and TTL
//! settings.

#![deny(missing_docs)]

pub mod job;

pub use job::{Job, JobProps};
