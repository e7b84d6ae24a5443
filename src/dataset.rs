//! Observed one-dimensional data: positions, measurements and their uncertainties.

use crate::error::{Error, Result};

/// Three aligned columns `x`, `y` and `err`. Every `err` is finite and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    err: Vec<f64>,
}

impl Dataset {
    pub fn new(x: Vec<f64>, y: Vec<f64>, err: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || x.len() != err.len() {
            return Err(Error::InvalidDataset(format!(
                "column lengths differ: x={}, y={}, err={}",
                x.len(),
                y.len(),
                err.len()
            )));
        }
        if x.is_empty() {
            return Err(Error::InvalidDataset("no data points".to_string()));
        }
        if let Some(i) = x.iter().chain(&y).position(|v| !v.is_finite()) {
            return Err(Error::InvalidDataset(format!(
                "non-finite value in {} column at index {}",
                if i < x.len() { "x" } else { "y" },
                i % x.len()
            )));
        }
        if let Some((i, e)) = err
            .iter()
            .enumerate()
            .find(|(_, e)| !(e.is_finite() && **e > 0.0))
        {
            return Err(Error::InvalidDataset(format!(
                "uncertainty at index {i} is {e}; it must be finite and positive"
            )));
        }
        Ok(Self { x, y, err })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// A dataset holds at least one point, so this is always `false`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn err(&self) -> &[f64] {
        &self.err
    }

    /// Iterates over `(x, y, err)` triples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.err)
            .map(|((&x, &y), &e)| (x, y, e))
    }
}
