/*!
# Metropolis–Hastings walker

A random-walk Metropolis–Hastings sampler driven by a chi-squared-like
[`CostFunction`]. Each step draws a Gaussian offset per parameter (zero for
pinned parameters), evaluates the cost at the candidate and

- moves unconditionally if the candidate's cost is strictly lower,
- otherwise moves with probability `exp((cost_current - cost_candidate) / 2)`.

Every step appends one row to the chain, moved or not, so a run of `n` steps
yields `n + 1` rows starting with the initial point.

There are three entry points:

- [`run`]: one chain, driven by a caller-owned generator.
- [`Walker`]: a self-contained chain with its own seedable generator,
  implementing [`MarkovChain`].
- [`Ensemble`]: several walkers run in parallel with
  [`ChainRunner`](crate::core::ChainRunner).

## Example

```rust
use mhfit::dataset::Dataset;
use mhfit::walker::run;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let data = Dataset::new(vec![0.0], vec![0.0], vec![1.0]).unwrap();
let cost = |p: &[f64], _: &Dataset| p[0] * p[0];
let mut rng = SmallRng::seed_from_u64(42);

let chain = run(&[0.0], &[1.0], 1000, &cost, &data, &mut rng).unwrap();
assert_eq!(chain.len(), 1001);
assert_eq!(chain.initial()[0], 0.0);
```
*/

use rand::prelude::*;
use std::sync::Arc;

use crate::chain::Chain;
use crate::core::{run_chain, HasChains, MarkovChain};
use crate::cost::{metropolis_accept, Cost, CostFunction};
use crate::error::{Error, Result};
use crate::proposal::GaussianProposal;

/// Current parameters together with their cost, evaluated once on arrival.
#[derive(Debug, Clone)]
struct Position {
    params: Vec<f64>,
    cost: Cost,
}

/// Validates the run inputs and builds the proposal, before any sampling happens.
fn prepare(initial: &[f64], scales: &[f64]) -> Result<GaussianProposal> {
    if initial.is_empty() {
        return Err(Error::EmptyParameters);
    }
    if initial.len() != scales.len() {
        return Err(Error::DimensionMismatch {
            initial: initial.len(),
            scales: scales.len(),
        });
    }
    if let Some((index, &value)) = initial.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFiniteInitial { index, value });
    }
    GaussianProposal::new(scales)
}

fn evaluate<C, D>(cost: &C, params: &[f64], data: &D, step: usize) -> Result<Cost>
where
    C: CostFunction<D> + ?Sized,
{
    match cost.cost(params, data) {
        Ok(Cost::Finite(value)) if value.is_nan() || value == f64::NEG_INFINITY => {
            Err(Error::InvalidCost { step, value })
        }
        Ok(Cost::Finite(value)) if value == f64::INFINITY => Ok(Cost::Infeasible),
        Ok(c) => Ok(c),
        Err(source) => Err(Error::CostFailure { step, source }),
    }
}

/// One Metropolis–Hastings update of `position`. Returns whether it moved.
fn transition<C, D, R>(
    cost: &C,
    data: &D,
    proposal: &GaussianProposal,
    rng: &mut R,
    position: &mut Position,
    step: usize,
) -> Result<bool>
where
    C: CostFunction<D> + ?Sized,
    R: Rng + ?Sized,
{
    let candidate = proposal.propose(&position.params, rng);
    let candidate_cost = evaluate(cost, &candidate, data, step)?;

    let accept = if candidate_cost.is_lower_than(position.cost) {
        true
    } else {
        let u: f64 = rng.gen();
        metropolis_accept(position.cost, candidate_cost, u)
            .ok_or(Error::DegenerateCost { step })?
    };

    if accept {
        position.params = candidate;
        position.cost = candidate_cost;
    }
    Ok(accept)
}

/// A walker borrowing its cost, data and generator from the caller of [`run`].
struct Stepper<'a, C: ?Sized, D, R: ?Sized> {
    cost: &'a C,
    data: &'a D,
    rng: &'a mut R,
    proposal: GaussianProposal,
    position: Position,
    steps_taken: usize,
}

impl<C, D, R> MarkovChain for Stepper<'_, C, D, R>
where
    C: CostFunction<D> + ?Sized,
    R: Rng + ?Sized,
{
    fn step(&mut self) -> Result<bool> {
        self.steps_taken += 1;
        transition(
            self.cost,
            self.data,
            &self.proposal,
            &mut *self.rng,
            &mut self.position,
            self.steps_taken,
        )
    }

    fn current_state(&self) -> &[f64] {
        &self.position.params
    }
}

/**
Runs a single chain of `steps` Metropolis–Hastings steps from `initial`.

`scales[i]` is the standard deviation of the proposal for parameter `i`; a zero
pins that parameter. The generator is only advanced by this call, so a seeded
generator reproduces the chain bit for bit.

# Errors

Input problems are reported before sampling: [`Error::EmptyParameters`],
[`Error::DimensionMismatch`], [`Error::InvalidScale`] and
[`Error::NonFiniteInitial`]. During sampling the run stops at the first step
where both positions are infeasible ([`Error::DegenerateCost`]), the cost is
NaN or `-inf` ([`Error::InvalidCost`]) or the cost function fails
([`Error::CostFailure`]). Step 0 refers to the initial point.
*/
pub fn run<C, D, R>(
    initial: &[f64],
    scales: &[f64],
    steps: usize,
    cost: &C,
    data: &D,
    rng: &mut R,
) -> Result<Chain>
where
    C: CostFunction<D> + ?Sized,
    R: Rng + ?Sized,
{
    let proposal = prepare(initial, scales)?;
    let position = Position {
        params: initial.to_vec(),
        cost: evaluate(cost, initial, data, 0)?,
    };
    let mut stepper = Stepper {
        cost,
        data,
        rng,
        proposal,
        position,
        steps_taken: 0,
    };
    run_chain(&mut stepper, steps)
}

/**
A single Metropolis–Hastings chain owning its cost function, a shared handle on
the data and a seedable generator.

A walker seeded with `s` produces the same chain as [`run`] called with
`SmallRng::seed_from_u64(s)`.

# Examples

```rust
use mhfit::core::MarkovChain;
use mhfit::dataset::Dataset;
use mhfit::walker::Walker;
use std::sync::Arc;

let data = Arc::new(Dataset::new(vec![0.0], vec![0.0], vec![1.0]).unwrap());
let cost = |p: &[f64], _: &Dataset| p[0] * p[0] + p[1] * p[1];
let mut walker = Walker::new(&[1.0, 2.0], &[0.5, 0.0], cost, data)
    .unwrap()
    .set_seed(7);

walker.step().unwrap();
assert_eq!(walker.current_state()[1], 2.0);
```
*/
#[derive(Debug)]
pub struct Walker<C, D> {
    cost: C,
    data: Arc<D>,
    proposal: GaussianProposal,
    position: Position,
    steps_taken: usize,
    seed: u64,
    rng: SmallRng,
}

impl<C: Clone, D> Clone for Walker<C, D> {
    fn clone(&self) -> Self {
        Self {
            cost: self.cost.clone(),
            data: Arc::clone(&self.data),
            proposal: self.proposal.clone(),
            position: self.position.clone(),
            steps_taken: self.steps_taken,
            seed: self.seed,
            rng: self.rng.clone(),
        }
    }
}

impl<C, D> Walker<C, D>
where
    C: CostFunction<D>,
{
    /// Validates the inputs and evaluates the cost at `initial`. The generator
    /// is seeded from entropy; use [`Walker::set_seed`] for reproducible runs.
    pub fn new(initial: &[f64], scales: &[f64], cost: C, data: Arc<D>) -> Result<Self> {
        let proposal = prepare(initial, scales)?;
        let position = Position {
            params: initial.to_vec(),
            cost: evaluate(&cost, initial, data.as_ref(), 0)?,
        };
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            cost,
            data,
            proposal,
            position,
            steps_taken: 0,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Reseeds the generator. Earlier draws are not replayed.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_cost(&self) -> Cost {
        self.position.cost
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn proposal(&self) -> &GaussianProposal {
        &self.proposal
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Runs `n_steps` from the current position; the returned chain starts there.
    pub fn run(&mut self, n_steps: usize) -> Result<Chain> {
        run_chain(self, n_steps)
    }
}

impl<C, D> MarkovChain for Walker<C, D>
where
    C: CostFunction<D>,
{
    fn step(&mut self) -> Result<bool> {
        self.steps_taken += 1;
        transition(
            &self.cost,
            self.data.as_ref(),
            &self.proposal,
            &mut self.rng,
            &mut self.position,
            self.steps_taken,
        )
    }

    fn current_state(&self) -> &[f64] {
        &self.position.params
    }
}

/**
Independent walkers sharing a start, proposal scales, cost and data, each with
its own generator. Walker `i` is seeded with `seed + i`.

# Examples

```rust
use mhfit::core::ChainRunner;
use mhfit::dataset::Dataset;
use mhfit::walker::Ensemble;
use std::sync::Arc;

let data = Arc::new(Dataset::new(vec![0.0], vec![0.0], vec![1.0]).unwrap());
let cost = |p: &[f64], _: &Dataset| p[0] * p[0];
let mut ensemble = Ensemble::new(&[0.0], &[1.0], cost, data, 4)
    .unwrap()
    .set_seed(42);

let chains = ensemble.run(500).unwrap();
assert_eq!(chains.len(), 4);
assert_eq!(chains[3].len(), 501);
```
*/
#[derive(Debug)]
pub struct Ensemble<C, D> {
    pub walkers: Vec<Walker<C, D>>,
    pub seed: u64,
}

impl<C: Clone, D> Clone for Ensemble<C, D> {
    fn clone(&self) -> Self {
        Self {
            walkers: self.walkers.clone(),
            seed: self.seed,
        }
    }
}

impl<C, D> Ensemble<C, D>
where
    C: CostFunction<D> + Clone,
{
    pub fn new(
        initial: &[f64],
        scales: &[f64],
        cost: C,
        data: Arc<D>,
        n_chains: usize,
    ) -> Result<Self> {
        if n_chains == 0 {
            return Err(Error::InvalidArgument(
                "an ensemble needs at least one chain".to_string(),
            ));
        }
        let walker = Walker::new(initial, scales, cost, data)?;
        let seed = walker.seed();
        let walkers = vec![walker; n_chains];
        Ok(Self { walkers, seed }.set_seed(seed))
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.walkers = self
            .walkers
            .into_iter()
            .enumerate()
            .map(|(i, w)| w.set_seed(seed.wrapping_add(i as u64)))
            .collect();
        self
    }

    pub fn n_chains(&self) -> usize {
        self.walkers.len()
    }
}

impl<C, D> HasChains for Ensemble<C, D>
where
    C: CostFunction<D> + Send,
    D: Send + Sync,
{
    type Chain = Walker<C, D>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.walkers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainRunner;
    use crate::dataset::Dataset;
    use std::cell::Cell;

    fn data() -> Dataset {
        Dataset::new(vec![0.0, 1.0], vec![1.0, 2.0], vec![0.1, 0.1]).unwrap()
    }

    fn quadratic(p: &[f64], _: &Dataset) -> f64 {
        p.iter().map(|x| x * x).sum()
    }

    #[test]
    fn invalid_inputs_fail_before_sampling() {
        let data = data();
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(matches!(
            run(&[], &[], 10, &quadratic, &data, &mut rng),
            Err(Error::EmptyParameters)
        ));
        assert!(matches!(
            run(&[0.0, 1.0], &[1.0], 10, &quadratic, &data, &mut rng),
            Err(Error::DimensionMismatch {
                initial: 2,
                scales: 1
            })
        ));
        assert!(matches!(
            run(&[0.0, 1.0], &[1.0, -1.0], 10, &quadratic, &data, &mut rng),
            Err(Error::InvalidScale { index: 1, .. })
        ));
        assert!(matches!(
            run(&[f64::NAN], &[1.0], 10, &quadratic, &data, &mut rng),
            Err(Error::NonFiniteInitial { index: 0, .. })
        ));
    }

    #[test]
    fn zero_steps_returns_initial_only() {
        let data = data();
        let mut rng = SmallRng::seed_from_u64(0);
        let chain = run(&[1.5, -2.0], &[1.0, 1.0], 0, &quadratic, &data, &mut rng).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.initial().to_vec(), vec![1.5, -2.0]);
    }

    #[test]
    fn rows_either_stay_or_move_by_one_draw() {
        let data = data();
        let mut rng = SmallRng::seed_from_u64(3);
        let chain = run(&[2.0, 0.0], &[0.3, 0.0], 500, &quadratic, &data, &mut rng).unwrap();
        let samples = chain.samples();
        let mut moves = 0;
        for k in 1..chain.len() {
            let prev = samples.row(k - 1);
            let next = samples.row(k);
            assert_eq!(next[1], 0.0);
            if prev != next {
                moves += 1;
                // six sigma of the proposal
                assert!((next[0] - prev[0]).abs() < 1.8);
            }
        }
        assert_eq!(moves, chain.accepted());
        assert!(moves > 0 && moves < 500);
    }

    #[test]
    fn forbidden_everywhere_but_the_start_never_moves() {
        let data = data();
        let start = [0.25, -3.0, 7.0];
        let cost = |p: &[f64], _: &Dataset| if p == start.as_slice() { 0.0 } else { f64::INFINITY };
        let mut rng = SmallRng::seed_from_u64(11);
        let chain = run(&start, &[1.0, 2.0, 3.0], 300, &cost, &data, &mut rng).unwrap();
        assert_eq!(chain.accepted(), 0);
        for row in chain.samples().rows() {
            assert_eq!(row.to_vec(), start.to_vec());
        }
    }

    #[test]
    fn infeasible_start_escapes_to_feasible_region() {
        let data = data();
        let cost = |p: &[f64], _: &Dataset| if p[0] < 0.0 { f64::INFINITY } else { p[0] };
        let mut rng = SmallRng::seed_from_u64(5);
        let mut walked = false;
        // a proposal from -0.1 with scale 1 lands in x >= 0 often; the first one that
        // does is accepted unconditionally
        for _ in 0..20 {
            match run(&[-0.1], &[1.0], 1, &cost, &data, &mut rng) {
                Ok(chain) => {
                    assert!(chain.last()[0] >= 0.0);
                    walked = true;
                    break;
                }
                Err(Error::DegenerateCost { step: 1 }) => {}
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert!(walked);
    }

    #[test]
    fn both_infeasible_is_reported_with_its_step() {
        let data = data();
        let cost = |_: &[f64], _: &Dataset| f64::INFINITY;
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(matches!(
            run(&[0.0], &[1.0], 10, &cost, &data, &mut rng),
            Err(Error::DegenerateCost { step: 1 })
        ));
    }

    struct AlwaysInfinite;

    impl CostFunction<()> for AlwaysInfinite {
        fn cost(&self, _: &[f64], _: &()) -> std::result::Result<Cost, crate::error::BoxError> {
            Ok(Cost::Finite(f64::INFINITY))
        }
    }

    #[test]
    fn infinite_finite_cost_counts_as_infeasible() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(matches!(
            run(&[0.0], &[1.0], 10, &AlwaysInfinite, &(), &mut rng),
            Err(Error::DegenerateCost { step: 1 })
        ));
        let walker = Walker::new(&[0.0], &[1.0], AlwaysInfinite, Arc::new(())).unwrap();
        assert_eq!(walker.current_cost(), Cost::Infeasible);
    }

    #[test]
    fn nan_cost_is_rejected() {
        let data = data();
        let cost = |p: &[f64], _: &Dataset| if p[0] == 0.0 { 1.0 } else { f64::NAN };
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(matches!(
            run(&[0.0], &[1.0], 10, &cost, &data, &mut rng),
            Err(Error::InvalidCost { step: 1, .. })
        ));
        let minus_inf = |_: &[f64], _: &Dataset| f64::NEG_INFINITY;
        assert!(matches!(
            run(&[0.0], &[1.0], 10, &minus_inf, &data, &mut rng),
            Err(Error::InvalidCost { step: 0, .. })
        ));
    }

    struct FailsAfter {
        calls: Cell<usize>,
        limit: usize,
    }

    impl CostFunction<Dataset> for FailsAfter {
        fn cost(
            &self,
            params: &[f64],
            _: &Dataset,
        ) -> std::result::Result<Cost, crate::error::BoxError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n > self.limit {
                return Err("model blew up".into());
            }
            Ok(Cost::Finite(params[0].abs()))
        }
    }

    #[test]
    fn cost_failure_stops_the_run() {
        let data = data();
        let cost = FailsAfter {
            calls: Cell::new(0),
            limit: 4,
        };
        let mut rng = SmallRng::seed_from_u64(5);
        // one evaluation for the start, then one per step
        let err = run(&[0.0], &[1.0], 10, &cost, &data, &mut rng).unwrap_err();
        match err {
            Error::CostFailure { step, source } => {
                assert_eq!(step, 4);
                assert_eq!(source.to_string(), "model blew up");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn seeded_runs_are_bit_identical() {
        let data = data();
        let sample = |seed: u64| {
            let mut rng = SmallRng::seed_from_u64(seed);
            run(&[1.0, 1.0], &[0.5, 0.2], 200, &quadratic, &data, &mut rng).unwrap()
        };
        assert_eq!(sample(9), sample(9));
        assert_ne!(sample(9), sample(10));
    }

    #[test]
    fn walker_matches_run() {
        let data = data();
        let mut rng = SmallRng::seed_from_u64(21);
        let expected = run(&[1.0, -1.0], &[0.5, 0.5], 300, &quadratic, &data, &mut rng).unwrap();
        let mut walker = Walker::new(&[1.0, -1.0], &[0.5, 0.5], quadratic, Arc::new(data))
            .unwrap()
            .set_seed(21);
        let chain = walker.run(300).unwrap();
        assert_eq!(chain, expected);
        assert_eq!(walker.steps_taken(), 300);
        assert_eq!(walker.current_state(), chain.last().to_vec().as_slice());
        assert_eq!(walker.seed(), 21);
    }

    #[test]
    fn ensemble_seeds_each_walker() {
        let ensemble = Ensemble::new(&[0.0], &[1.0], quadratic, Arc::new(data()), 3)
            .unwrap()
            .set_seed(100);
        let seeds: Vec<u64> = ensemble.walkers.iter().map(|w| w.seed()).collect();
        assert_eq!(seeds, vec![100, 101, 102]);
        assert_eq!(ensemble.n_chains(), 3);
        assert!(Ensemble::new(&[0.0], &[1.0], quadratic, Arc::new(data()), 0).is_err());
    }

    #[test]
    fn ensemble_chains_match_individual_runs() {
        let data = data();
        let mut ensemble = Ensemble::new(&[0.5], &[1.0], quadratic, Arc::new(data.clone()), 3)
            .unwrap()
            .set_seed(7);
        let chains = ensemble.run(200).unwrap();
        for (i, chain) in chains.iter().enumerate() {
            let mut rng = SmallRng::seed_from_u64(7 + i as u64);
            let expected = run(&[0.5], &[1.0], 200, &quadratic, &data, &mut rng).unwrap();
            assert_eq!(chain, &expected);
        }
    }

    #[test]
    fn progress_does_not_change_results() {
        let data = Arc::new(data());
        let mut plain = Ensemble::new(&[0.5, 0.5], &[1.0, 0.0], quadratic, data.clone(), 2)
            .unwrap()
            .set_seed(3);
        let mut shown = plain.clone();
        assert_eq!(plain.run(400).unwrap(), shown.run_progress(400).unwrap());
    }
}
