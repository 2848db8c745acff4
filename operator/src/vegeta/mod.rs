//! Vegeta is a k8s custom resource that describes an HTTP load test run as a job.

// Export all spec types
mod spec;
pub use spec::*;

// All other mods are behind the controller flag to keep the deps to a minimum
#[cfg(feature = "controller")]
pub mod command;
#[cfg(feature = "controller")]
pub(crate) mod controller;
#[cfg(feature = "controller")]
pub mod job;

#[cfg(test)]
#[cfg(feature = "controller")]
pub mod stub;

#[cfg(feature = "controller")]
pub use controller::run;
