//! Summaries computed from chains after sampling: running acceptance, means,
//! medians, quantiles, marginal histograms and the potential scale reduction.
//!
//! Everything here consumes chain output; nothing feeds back into the walker.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Number of recent steps the running acceptance rate is computed over.
const ACCEPT_WINDOW: usize = 100;

/// Running statistics for a single chain, updated once per step.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTracker {
    n_params: usize,
    n: u64,
    accept_queue: VecDeque<bool>,
    n_window_accepted: usize,
    mean: Array1<f64>,    // n_params
    mean_sq: Array1<f64>, // n_params
}

/// Snapshot of a [`ChainTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStats {
    pub n: u64,
    pub p_accept: f64,
    pub mean: Array1<f64>,
    pub sm2: Array1<f64>,
}

impl ChainTracker {
    pub fn new(n_params: usize) -> Self {
        Self {
            n_params,
            n: 0,
            accept_queue: VecDeque::with_capacity(ACCEPT_WINDOW + 1),
            n_window_accepted: 0,
            mean: Array1::zeros(n_params),
            mean_sq: Array1::zeros(n_params),
        }
    }

    pub fn step(&mut self, x: &[f64], accepted: bool) -> Result<()> {
        if x.len() != self.n_params {
            return Err(Error::InvalidArgument(format!(
                "tracker expects {} parameters, got {}",
                self.n_params,
                x.len()
            )));
        }
        self.n += 1;

        self.accept_queue.push_back(accepted);
        self.n_window_accepted += accepted as usize;
        if self.accept_queue.len() > ACCEPT_WINDOW {
            if let Some(true) = self.accept_queue.pop_front() {
                self.n_window_accepted -= 1;
            }
        }

        let n = self.n as f64;
        let x = ArrayView1::from(x);
        self.mean = (&self.mean * (n - 1.0) + &x) / n;
        self.mean_sq = (&self.mean_sq * (n - 1.0) + &x.mapv(|v| v * v)) / n;
        Ok(())
    }

    /// Acceptance rate over the last 100 steps.
    pub fn p_accept(&self) -> f64 {
        if self.accept_queue.is_empty() {
            0.0
        } else {
            self.n_window_accepted as f64 / self.accept_queue.len() as f64
        }
    }

    /// Unbiased variance of every parameter seen so far. NaN before two steps.
    pub fn sm2(&self) -> Array1<f64> {
        let n = self.n as f64;
        (&self.mean_sq - &self.mean.mapv(|m| m * m)) * n / (n - 1.0)
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            n: self.n,
            p_accept: self.p_accept(),
            mean: self.mean.clone(),
            sm2: self.sm2(),
        }
    }
}

/// Per-parameter mean of the rows of `samples`.
pub fn mean(samples: ArrayView2<f64>) -> Result<Array1<f64>> {
    samples
        .mean_axis(Axis(0))
        .ok_or_else(|| Error::InvalidArgument("cannot average zero samples".to_string()))
}

/// Per-parameter median of the rows of `samples`.
pub fn medians(samples: ArrayView2<f64>) -> Result<Array1<f64>> {
    quantiles(samples, 0.5)
}

/**
Per-parameter quantile `q` of the rows of `samples`, linearly interpolated
between order statistics.

# Examples

```rust
use mhfit::stats::quantiles;
use ndarray::array;

let samples = array![[1.0, 10.0], [2.0, 30.0], [3.0, 20.0], [4.0, 40.0]];
let q = quantiles(samples.view(), 0.5).unwrap();
assert_eq!(q, array![2.5, 25.0]);
```
*/
pub fn quantiles(samples: ArrayView2<f64>, q: f64) -> Result<Array1<f64>> {
    if !(0.0..=1.0).contains(&q) {
        return Err(Error::InvalidArgument(format!(
            "quantile {q} is outside [0, 1]"
        )));
    }
    if samples.nrows() == 0 {
        return Err(Error::InvalidArgument(
            "cannot take quantiles of zero samples".to_string(),
        ));
    }
    let values = samples
        .axis_iter(Axis(1))
        .map(|column| {
            let mut sorted = column.to_vec();
            sorted.sort_unstable_by(f64::total_cmp);
            let pos = q * (sorted.len() - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        })
        .collect();
    Ok(values)
}

/// One-dimensional histogram: `edges` has one more entry than `counts`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Array1<f64>,
    pub counts: Array1<usize>,
}

impl Histogram {
    pub fn centers(&self) -> Array1<f64> {
        bin_centers(&self.edges)
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }
}

/// Two-dimensional histogram; `counts[(i, j)]` is bin `i` along x and `j` along y.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    pub x_edges: Array1<f64>,
    pub y_edges: Array1<f64>,
    pub counts: Array2<usize>,
}

fn bin_centers(edges: &Array1<f64>) -> Array1<f64> {
    edges
        .windows(2)
        .into_iter()
        .map(|w| 0.5 * (w[0] + w[1]))
        .collect()
}

/// Range spanned by `values`, widened to unit width around a constant.
fn value_range(values: ArrayView1<f64>) -> Result<(f64, f64)> {
    let lo = *values
        .min()
        .map_err(|e| Error::InvalidArgument(format!("cannot bin values: {e}")))?;
    let hi = *values
        .max()
        .map_err(|e| Error::InvalidArgument(format!("cannot bin values: {e}")))?;
    if lo == hi {
        Ok((lo - 0.5, hi + 0.5))
    } else {
        Ok((lo, hi))
    }
}

fn bin_index(v: f64, lo: f64, width: f64, bins: usize) -> usize {
    (((v - lo) / width) as usize).min(bins - 1)
}

fn check_bins(bins: usize) -> Result<()> {
    if bins == 0 {
        return Err(Error::InvalidArgument(
            "histogram needs at least one bin".to_string(),
        ));
    }
    Ok(())
}

/// Equal-width histogram over the range of `values`. The maximum lands in the last bin.
pub fn histogram(values: ArrayView1<f64>, bins: usize) -> Result<Histogram> {
    check_bins(bins)?;
    let (lo, hi) = value_range(values)?;
    let width = (hi - lo) / bins as f64;
    let mut counts = Array1::<usize>::zeros(bins);
    for &v in values {
        counts[bin_index(v, lo, width, bins)] += 1;
    }
    Ok(Histogram {
        edges: Array1::linspace(lo, hi, bins + 1),
        counts,
    })
}

/// Joint histogram of two parameters, `bins` x `bins`.
pub fn histogram_2d(
    xs: ArrayView1<f64>,
    ys: ArrayView1<f64>,
    bins: usize,
) -> Result<Histogram2D> {
    check_bins(bins)?;
    if xs.len() != ys.len() {
        return Err(Error::InvalidArgument(format!(
            "histogram inputs differ in length: {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    let (x_lo, x_hi) = value_range(xs)?;
    let (y_lo, y_hi) = value_range(ys)?;
    let x_width = (x_hi - x_lo) / bins as f64;
    let y_width = (y_hi - y_lo) / bins as f64;
    let mut counts = Array2::<usize>::zeros((bins, bins));
    for (&x, &y) in xs.iter().zip(ys) {
        counts[(
            bin_index(x, x_lo, x_width, bins),
            bin_index(y, y_lo, y_width, bins),
        )] += 1;
    }
    Ok(Histogram2D {
        x_edges: Array1::linspace(x_lo, x_hi, bins + 1),
        y_edges: Array1::linspace(y_lo, y_hi, bins + 1),
        counts,
    })
}

/**
Gelman-Rubin potential scale reduction for every parameter.

All chains must have the same shape with at least two rows, and at least two
chains are needed. A parameter that is constant and equal across all chains
(for example a pinned one) reports `1.0`.
*/
pub fn rhat(chains: &[ArrayView2<f64>]) -> Result<Array1<f64>> {
    let m = chains.len();
    if m < 2 {
        return Err(Error::InvalidArgument(format!(
            "R-hat needs at least two chains, got {m}"
        )));
    }
    let shape = chains[0].dim();
    if let Some(other) = chains.iter().find(|c| c.dim() != shape) {
        return Err(Error::InvalidArgument(format!(
            "chains differ in shape: {:?} and {:?}",
            shape,
            other.dim()
        )));
    }
    let (n, n_params) = shape;
    if n < 2 {
        return Err(Error::InvalidArgument(format!(
            "R-hat needs at least two samples per chain, got {n}"
        )));
    }

    let mut means = Array2::<f64>::zeros((m, n_params));
    let mut within = Array1::<f64>::zeros(n_params);
    for (i, chain) in chains.iter().enumerate() {
        means.row_mut(i).assign(&mean(*chain)?);
        within += &chain.var_axis(Axis(0), 1.0);
    }
    within /= m as f64;
    let between_over_n = means.var_axis(Axis(0), 1.0);

    let n = n as f64;
    Ok(ndarray::Zip::from(&within)
        .and(&between_over_n)
        .map_collect(|&w, &b| {
            if w == 0.0 {
                if b == 0.0 {
                    1.0
                } else {
                    f64::INFINITY
                }
            } else {
                ((w * (n - 1.0) / n + b) / w).sqrt()
            }
        }))
}

/// Largest entry of an [`rhat`] result.
pub fn max_rhat(rhat: &Array1<f64>) -> Result<f64> {
    rhat.max()
        .copied()
        .map_err(|e| Error::InvalidArgument(format!("cannot take maximum R-hat: {e}")))
}
