/*!
Goodness-of-fit values and the Metropolis acceptance rule.

A cost behaves like a chi-squared statistic: lower is better, and the likelihood
ratio between two positions is `exp((cost_current - cost_proposed) / 2)`.
Forbidden regions of parameter space are reported as [`Cost::Infeasible`]
instead of relying on floating-point infinity arithmetic.

# Examples

```rust
use mhfit::cost::{Cost, CostFunction};
use mhfit::dataset::Dataset;

let data = Dataset::new(vec![0.0], vec![1.0], vec![0.5]).unwrap();
let cost = |p: &[f64], _: &Dataset| if p[0] < 0.0 { f64::INFINITY } else { p[0] * p[0] };

assert_eq!(cost.cost(&[2.0], &data).unwrap(), Cost::Finite(4.0));
assert_eq!(cost.cost(&[-1.0], &data).unwrap(), Cost::Infeasible);
```
*/

use crate::error::BoxError;

/// Value of a goodness-of-fit function at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cost {
    /// A chi-squared-like value. The walker rejects NaN and `-inf` and reads
    /// `+inf` as [`Cost::Infeasible`].
    Finite(f64),
    /// The position lies in a forbidden region.
    Infeasible,
}

impl Cost {
    /// Returns the numeric value, with `Infeasible` mapped to `+inf`.
    pub fn value(self) -> f64 {
        match self {
            Cost::Finite(v) => v,
            Cost::Infeasible => f64::INFINITY,
        }
    }

    pub fn is_feasible(self) -> bool {
        matches!(self, Cost::Finite(_))
    }

    /// Strict comparison used for unconditional acceptance. `Infeasible` is never lower.
    pub fn is_lower_than(self, other: Cost) -> bool {
        match (self, other) {
            (Cost::Finite(a), Cost::Finite(b)) => a < b,
            (Cost::Finite(_), Cost::Infeasible) => true,
            (Cost::Infeasible, _) => false,
        }
    }
}

impl From<f64> for Cost {
    /// `+inf` becomes [`Cost::Infeasible`]; every other value is wrapped as is.
    fn from(value: f64) -> Self {
        if value == f64::INFINITY {
            Cost::Infeasible
        } else {
            Cost::Finite(value)
        }
    }
}

/**
A goodness-of-fit function over parameter vectors and a data set `D`.

Implementations must be deterministic. Positions the caller wants excluded are
reported as [`Cost::Infeasible`]; `Err` is reserved for genuine failures and
stops the run.

Any closure `Fn(&[f64], &D) -> f64` is a cost function; a returned `+inf` is
read as infeasible.
*/
pub trait CostFunction<D> {
    fn cost(&self, params: &[f64], data: &D) -> Result<Cost, BoxError>;
}

impl<D, F> CostFunction<D> for F
where
    F: Fn(&[f64], &D) -> f64,
{
    fn cost(&self, params: &[f64], data: &D) -> Result<Cost, BoxError> {
        Ok(Cost::from(self(params, data)))
    }
}

/// Half the cost difference, i.e. the log of the likelihood ratio
/// `exp((current - proposed) / 2)`.
///
/// Returns `None` when both positions are infeasible and the ratio is undefined.
pub fn log_likelihood_ratio(current: Cost, proposed: Cost) -> Option<f64> {
    match (current, proposed) {
        (Cost::Finite(c), Cost::Finite(p)) => Some((c - p) / 2.0),
        (Cost::Finite(_), Cost::Infeasible) => Some(f64::NEG_INFINITY),
        (Cost::Infeasible, Cost::Finite(_)) => Some(f64::INFINITY),
        (Cost::Infeasible, Cost::Infeasible) => None,
    }
}

/**
Probabilistic half of the Metropolis rule: accept when `r > u` for a uniform
draw `u` in `[0, 1)`.

The comparison runs in log space (`ln r > ln u`), which makes the same decisions
as the direct ratio while avoiding overflow: a ratio that would overflow always
accepts and one that would underflow always rejects. An infeasible proposal is
always rejected, since `ln r = -inf` is never greater than `ln u`.

Returns `None` when both positions are infeasible.
*/
pub fn metropolis_accept(current: Cost, proposed: Cost, u: f64) -> Option<bool> {
    log_likelihood_ratio(current, proposed).map(|log_r| {
        if u > 0.0 {
            log_r > u.ln()
        } else {
            // ln 0 = -inf would accept ratios that underflow to zero
            log_r.exp() > 0.0
        }
    })
}
