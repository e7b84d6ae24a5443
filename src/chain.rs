/*!
The sequence of positions visited by one walker.

A [`Chain`] with `n` steps has `n + 1` rows: row 0 is the starting point and row
`k` is the position after step `k`, whether that step moved or not.
*/

use ndarray::{s, Array2, ArrayView1, ArrayView2};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    samples: Array2<f64>, // (n_steps + 1) x n_params
    accepted: usize,
}

impl Chain {
    pub(crate) fn from_parts(samples: Array2<f64>, accepted: usize) -> Self {
        debug_assert!(samples.nrows() >= 1);
        Self { samples, accepted }
    }

    /// Number of rows, i.e. steps taken plus one.
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    /// A chain always holds at least its starting point.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn n_steps(&self) -> usize {
        self.samples.nrows() - 1
    }

    pub fn n_params(&self) -> usize {
        self.samples.ncols()
    }

    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    pub fn into_samples(self) -> Array2<f64> {
        self.samples
    }

    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.samples.row(0)
    }

    pub fn last(&self) -> ArrayView1<'_, f64> {
        self.samples.row(self.samples.nrows() - 1)
    }

    /// Values of parameter `index` over the whole chain, for trace plots.
    pub fn trace(&self, index: usize) -> ArrayView1<'_, f64> {
        self.samples.column(index)
    }

    /// Number of steps whose proposal was accepted.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Fraction of steps that moved. Zero for a chain without steps.
    pub fn acceptance_rate(&self) -> f64 {
        match self.n_steps() {
            0 => 0.0,
            n => self.accepted as f64 / n as f64,
        }
    }

    /// Drops the first `burn_in` rows. Discarding every row leaves an empty view.
    pub fn discard(&self, burn_in: usize) -> Result<ArrayView2<'_, f64>> {
        if burn_in > self.len() {
            return Err(Error::BurnInTooLong {
                burn_in,
                len: self.len(),
            });
        }
        Ok(self.samples.slice(s![burn_in.., ..]))
    }

    /// Trailing `n` rows, e.g. the second half of a run.
    pub fn tail(&self, n: usize) -> ArrayView2<'_, f64> {
        let start = self.len().saturating_sub(n);
        self.samples.slice(s![start.., ..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn chain() -> Chain {
        Chain::from_parts(array![[0.0, 1.0], [0.5, 1.0], [0.5, 1.0], [0.7, 1.0]], 2)
    }

    #[test]
    fn shape_and_accessors() {
        let c = chain();
        assert_eq!(c.len(), 4);
        assert_eq!(c.n_steps(), 3);
        assert_eq!(c.n_params(), 2);
        assert_eq!(c.initial(), array![0.0, 1.0]);
        assert_eq!(c.last(), array![0.7, 1.0]);
        assert_eq!(c.trace(1), array![1.0, 1.0, 1.0, 1.0]);
        assert!((c.acceptance_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn discard_and_tail() {
        let c = chain();
        assert_eq!(c.discard(1).unwrap().nrows(), 3);
        assert_eq!(c.discard(4).unwrap().nrows(), 0);
        assert!(matches!(
            c.discard(5),
            Err(Error::BurnInTooLong { burn_in: 5, len: 4 })
        ));
        assert_eq!(c.tail(2), array![[0.5, 1.0], [0.7, 1.0]]);
        assert_eq!(c.tail(10).nrows(), 4);
    }

    #[test]
    fn single_point_chain_has_zero_acceptance() {
        let c = Chain::from_parts(array![[3.0]], 0);
        assert_eq!(c.n_steps(), 0);
        assert_eq!(c.acceptance_rate(), 0.0);
    }
}
