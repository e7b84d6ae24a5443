//! Chain-running machinery shared by every sampler in the crate: the [`MarkovChain`]
//! trait, sequential runners with and without a progress bar, and a parallel
//! runner for collections of independent chains.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::chain::Chain;
use crate::error::Result;
use crate::stats::ChainTracker;

const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

pub trait MarkovChain {
    /// Does one iteration of the chain. Returns `true` if the proposal was accepted.
    fn step(&mut self) -> Result<bool>;

    /// The current position, without stepping.
    fn current_state(&self) -> &[f64];
}

/// Records the current state followed by `n_steps` further states.
pub fn run_chain<M>(chain: &mut M, n_steps: usize) -> Result<Chain>
where
    M: MarkovChain + ?Sized,
{
    let dim = chain.current_state().len();
    let mut out = Array2::<f64>::zeros((n_steps + 1, dim));
    out.row_mut(0)
        .assign(&ArrayView1::from(chain.current_state()));

    let mut accepted = 0;
    for i in 1..=n_steps {
        if chain.step()? {
            accepted += 1;
        }
        out.row_mut(i)
            .assign(&ArrayView1::from(chain.current_state()));
    }

    Ok(Chain::from_parts(out, accepted))
}

/// Like [`run_chain`], updating `pb` with the windowed acceptance rate about
/// every 500 ms.
pub fn run_chain_with_progress<M>(chain: &mut M, n_steps: usize, pb: &ProgressBar) -> Result<Chain>
where
    M: MarkovChain + ?Sized,
{
    let dim = chain.current_state().len();
    let mut out = Array2::<f64>::zeros((n_steps + 1, dim));
    out.row_mut(0)
        .assign(&ArrayView1::from(chain.current_state()));

    let mut tracker = ChainTracker::new(dim);
    let mut accepted = 0;
    let mut last_update = Instant::now();

    pb.set_length(n_steps as u64);

    for i in 1..=n_steps {
        let moved = chain.step()?;
        accepted += moved as usize;
        let state = chain.current_state();
        tracker.step(state, moved)?;
        out.row_mut(i).assign(&ArrayView1::from(state));

        if last_update.elapsed() >= UPDATE_INTERVAL || i == n_steps {
            pb.set_position(i as u64);
            pb.set_message(format!("AcceptRate={:.3}", tracker.p_accept()));
            last_update = Instant::now();
        }
    }

    Ok(Chain::from_parts(out, accepted))
}

/// Anything that owns a set of independent chains.
pub trait HasChains {
    type Chain: MarkovChain + Send;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain>;
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

pub trait ChainRunner: HasChains {
    /// Runs every chain for `n_steps` in parallel. Results are in chain order.
    /// The first failing chain's error is returned.
    fn run(&mut self, n_steps: usize) -> Result<Vec<Chain>> {
        self.chains_mut()
            .par_iter_mut()
            .map(|chain| run_chain(chain, n_steps))
            .collect()
    }

    /// Same as [`ChainRunner::run`], drawing one progress bar per chain.
    fn run_progress(&mut self, n_steps: usize) -> Result<Vec<Chain>> {
        let multi = MultiProgress::new();
        let pb_style = progress_style();

        self.chains_mut()
            .par_iter_mut()
            .enumerate()
            .map(|(i, chain)| {
                let pb = multi.add(ProgressBar::new(n_steps as u64));
                pb.set_prefix(format!("Chain {i}"));
                pb.set_style(pb_style.clone());

                let samples = run_chain_with_progress(chain, n_steps, &pb);

                pb.finish_with_message("Done!");
                samples
            })
            .collect()
    }
}

impl<T: HasChains> ChainRunner for T {}
