//! Provides API for the operator and related tooling.
#![warn(missing_docs)]

/// Labels module for managing resource labels.
#[cfg(feature = "controller")]
pub(crate) mod labels;
/// Utils module for shared utility functions.
#[cfg(feature = "controller")]
pub mod utils;
/// Vegeta module for running load tests.
pub mod vegeta;

/// Name of the operator, used as the value of the managed-by label.
#[cfg(feature = "controller")]
const CONTROLLER_NAME: &str = "vegeta-operator";
