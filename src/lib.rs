//! # mhfit
//!
//! A small **Metropolis–Hastings** sampler for fitting models to noisy
//! one-dimensional data `(x, y, σ)` by walking a chi-squared surface.
//!
//! The core is [`walker::run`]: given a starting point, a proposal scale per
//! parameter (zero pins a parameter), a step count and a cost function, it
//! returns the full [`chain::Chain`] of visited positions. Everything else
//! consumes that chain:
//!
//! - [`model`]: a four-parameter periodic model and its chi-squared cost.
//! - [`io`]: loading the three-row data file, writing chains as CSV.
//! - [`stats`]: burn-in trimming, medians, quantiles, histograms and R-hat.
//!
//! ## Example
//!
//! ```rust
//! use mhfit::core::ChainRunner;
//! use mhfit::dataset::Dataset;
//! use mhfit::model::{ChiSquared, PeriodicModel};
//! use mhfit::stats::medians;
//! use mhfit::walker::Ensemble;
//! use std::sync::Arc;
//!
//! let x: Vec<f64> = (0..40).map(|i| i as f64 * 0.1).collect();
//! let y: Vec<f64> = x.iter().map(|x| 2.0 * (x * std::f64::consts::TAU / 1.5).sin() + 1.0).collect();
//! let data = Arc::new(Dataset::new(x, y, vec![0.2; 40]).unwrap());
//!
//! let initial = [1.8, 1.5, 0.1, 0.9];
//! let scales = [0.05, 0.002, 0.02, 0.03];
//! let mut ensemble = Ensemble::new(&initial, &scales, ChiSquared::new(PeriodicModel), data, 2)
//!     .unwrap()
//!     .set_seed(42);
//!
//! let chains = ensemble.run(2_000).unwrap();
//! let kept = chains[0].discard(1_000).unwrap();
//! let m = medians(kept).unwrap();
//! assert!((m[0] - 2.0).abs() < 0.3);
//! ```

pub mod chain;
pub mod core;
pub mod cost;
pub mod dataset;
pub mod error;
#[cfg(feature = "csv")]
pub mod io;
pub mod model;
pub mod proposal;
pub mod stats;
pub mod walker;

pub use crate::error::{Error, Result};
