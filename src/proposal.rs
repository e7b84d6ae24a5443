/*!
Symmetric Gaussian proposals with one standard deviation per parameter.

A scale of exactly zero pins its parameter: no noise is drawn for it and the
proposed value is a copy of the current one.
*/

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};

/**
Independent zero-mean normal offsets, `dp[i] ~ N(0, scales[i])`.

The generator is passed in on every draw, so the proposal itself holds no
random state and can be shared between chains.

# Examples

```rust
use mhfit::proposal::GaussianProposal;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let proposal = GaussianProposal::new(&[1.0, 0.0]).unwrap();
let mut rng = SmallRng::seed_from_u64(7);
let candidate = proposal.propose(&[3.0, 5.0], &mut rng);
assert_eq!(candidate[1], 5.0);
```
*/
#[derive(Debug, Clone)]
pub struct GaussianProposal {
    scales: Vec<f64>,
    normals: Vec<Option<Normal<f64>>>,
}

impl GaussianProposal {
    /// Validates `scales` and builds one normal distribution per free parameter.
    pub fn new(scales: &[f64]) -> Result<Self> {
        if scales.is_empty() {
            return Err(Error::EmptyParameters);
        }
        let normals = scales
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::InvalidScale { index, value });
                }
                if value == 0.0 {
                    return Ok(None);
                }
                Normal::new(0.0, value)
                    .map(Some)
                    .map_err(|_| Error::InvalidScale { index, value })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            scales: scales.to_vec(),
            normals,
        })
    }

    pub fn dim(&self) -> usize {
        self.scales.len()
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn is_pinned(&self, index: usize) -> bool {
        self.normals[index].is_none()
    }

    /// Draws an offset vector. Pinned entries are exactly zero and consume no randomness.
    pub fn offset<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.normals
            .iter()
            .map(|normal| normal.as_ref().map_or(0.0, |n| n.sample(rng)))
            .collect()
    }

    /// Returns `current + offset`. Pinned entries are copied bit for bit.
    pub fn propose<R: Rng + ?Sized>(&self, current: &[f64], rng: &mut R) -> Vec<f64> {
        current
            .iter()
            .zip(&self.normals)
            .map(|(&x, normal)| match normal {
                Some(n) => x + n.sample(rng),
                None => x,
            })
            .collect()
    }
}
