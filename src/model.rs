/*!
Parametric models of `y(x)` and the chi-squared cost that compares them to a
[`Dataset`].

# Examples

```rust
use mhfit::cost::{Cost, CostFunction};
use mhfit::dataset::Dataset;
use mhfit::model::{ChiSquared, PeriodicModel};

let data = Dataset::new(vec![0.0, 0.25, 0.5], vec![1.0, 2.0, 1.0], vec![0.5, 0.5, 0.5]).unwrap();
let chi2 = ChiSquared::new(PeriodicModel);

// amplitude, period, phase, offset: y = sin(2 pi x) + 1 fits exactly
let cost = chi2.cost(&[1.0, 1.0, 0.0, 1.0], &data).unwrap();
assert!(cost.value() < 1e-20);

// a negative amplitude is outside the model's domain
assert_eq!(chi2.cost(&[-1.0, 1.0, 0.0, 1.0], &data).unwrap(), Cost::Infeasible);
```
*/

use std::f64::consts::TAU;

use crate::cost::{Cost, CostFunction};
use crate::dataset::Dataset;
use crate::error::{BoxError, Error};

/// A model `y = f(x; params)` with a fixed number of parameters.
pub trait Model {
    fn n_params(&self) -> usize;

    fn evaluate(&self, params: &[f64], x: f64) -> f64;

    /// Whether `params` lies inside the model's domain. Positions outside it
    /// get [`Cost::Infeasible`].
    fn is_feasible(&self, _params: &[f64]) -> bool {
        true
    }

    /// Human-readable parameter names, used in summaries.
    fn param_names(&self) -> Vec<String> {
        (0..self.n_params()).map(|i| format!("p{i}")).collect()
    }
}

/// `y = amplitude * sin(2 pi x / period + phase) + offset`.
///
/// Parameters are `[amplitude, period, phase, offset]`. Amplitude must be
/// non-negative and period strictly positive; the sign of a sinusoid is carried
/// by the phase, which keeps the posterior from splitting into mirrored modes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodicModel;

impl PeriodicModel {
    pub const AMPLITUDE: usize = 0;
    pub const PERIOD: usize = 1;
    pub const PHASE: usize = 2;
    pub const OFFSET: usize = 3;
}

impl Model for PeriodicModel {
    fn n_params(&self) -> usize {
        4
    }

    fn evaluate(&self, params: &[f64], x: f64) -> f64 {
        let (amplitude, period, phase, offset) = (params[0], params[1], params[2], params[3]);
        amplitude * (TAU * x / period + phase).sin() + offset
    }

    fn is_feasible(&self, params: &[f64]) -> bool {
        params[Self::AMPLITUDE] >= 0.0 && params[Self::PERIOD] > 0.0
    }

    fn param_names(&self) -> Vec<String> {
        ["amplitude", "period", "phase", "offset"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/**
Chi-squared of a [`Model`] against a [`Dataset`]: `sum(((y - f(x)) / err)^2)`.

[`ChiSquared::reduced`] divides by the degrees of freedom
`n_points - n_free`. The walker treats any cost as a chi-squared statistic, so
the reduced form flattens the posterior by that factor.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquared<M> {
    model: M,
    n_free: Option<usize>,
}

impl<M: Model> ChiSquared<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            n_free: None,
        }
    }

    /// Reduced chi-squared with `n_free` fitted parameters.
    pub fn reduced(model: M, n_free: usize) -> Self {
        Self {
            model,
            n_free: Some(n_free),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Unnormalised chi-squared, ignoring feasibility.
    pub fn chi2(&self, params: &[f64], data: &Dataset) -> f64 {
        data.points()
            .map(|(x, y, err)| {
                let r = (y - self.model.evaluate(params, x)) / err;
                r * r
            })
            .sum()
    }

    /// Normalised residuals `(y - f(x)) / err` for every point.
    pub fn residuals(&self, params: &[f64], data: &Dataset) -> Vec<f64> {
        data.points()
            .map(|(x, y, err)| (y - self.model.evaluate(params, x)) / err)
            .collect()
    }

    fn degrees_of_freedom(&self, data: &Dataset) -> Result<Option<usize>, Error> {
        match self.n_free {
            None => Ok(None),
            Some(n_free) => match data.len().checked_sub(n_free) {
                Some(dof) if dof > 0 => Ok(Some(dof)),
                _ => Err(Error::InvalidArgument(format!(
                    "{} data points leave no degrees of freedom for {} parameters",
                    data.len(),
                    n_free
                ))),
            },
        }
    }
}

impl<M: Model> CostFunction<Dataset> for ChiSquared<M> {
    fn cost(&self, params: &[f64], data: &Dataset) -> Result<Cost, BoxError> {
        if params.len() != self.model.n_params() {
            return Err(Box::new(Error::InvalidArgument(format!(
                "model takes {} parameters, got {}",
                self.model.n_params(),
                params.len()
            ))));
        }
        if !self.model.is_feasible(params) {
            return Ok(Cost::Infeasible);
        }
        let chi2 = self.chi2(params, data);
        Ok(Cost::from(match self.degrees_of_freedom(data)? {
            Some(dof) => chi2 / dof as f64,
            None => chi2,
        }))
    }
}
