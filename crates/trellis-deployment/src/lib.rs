//! Deployment workload for Trellis
//!
//! Wraps a pod template with replicas, a label selector and a rollout
//! strategy.

#![deny(missing_docs)]

pub mod deployment;
pub mod error;
pub mod strategy;

pub use deployment::{Deployment, DeploymentProps};
pub use error::DeploymentError;
pub use strategy::{DeploymentStrategy, PercentOrAbsolute, RollingUpdate, RollingUpdateOptions};
