//! A compact Metropolis–Hastings sampler for unnormalized posterior densities.
//!
//! Start with [`metropolis_hastings::run_chain`] for a single scalar chain, or
//! [`config::SamplerConfig`] to run several independent chains in parallel, then
//! summarize the result with [`stats`].

pub mod config;
pub mod core;
pub mod distributions;
pub mod error;
#[cfg(feature = "csv")]
pub mod io;
pub mod metropolis_hastings;
pub mod models;
pub mod stats;

pub use crate::core::Chain;
pub use error::{Result, SamplerError};
pub use metropolis_hastings::run_chain;
pub use stats::summarize;
