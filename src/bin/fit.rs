//! Fits `y = amplitude * sin(2 pi x / period + phase) + offset` to a three-row
//! data file with Metropolis-Hastings, then prints posterior medians and 68%
//! intervals.
//!
//! ```text
//! fit <data-file> [--steps N] [--burn-in N] [--chains N] [--seed N]
//!                 [--init A,P,PHI,C] [--scales A,P,PHI,C] [--csv PATH] [--no-progress]
//! ```
//!
//! Without `--init` the start is guessed from the data, with one period spanning
//! the x range. A zero in `--scales` holds that parameter fixed.

use mhfit::core::ChainRunner;
use mhfit::dataset::Dataset;
use mhfit::error::Error;
use mhfit::io::csv::save_chains;
use mhfit::io::load_dataset;
use mhfit::model::{ChiSquared, Model, PeriodicModel};
use mhfit::stats::{max_rhat, medians, quantiles, rhat};
use mhfit::walker::Ensemble;
use ndarray::{concatenate, Axis};
use std::path::PathBuf;
use std::sync::Arc;

const STEPS: usize = 20_000;
const BURN_IN: usize = 5_000;
const N_CHAINS: usize = 4;
const SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq)]
struct Options {
    data: PathBuf,
    steps: usize,
    burn_in: usize,
    n_chains: usize,
    seed: u64,
    initial: Option<Vec<f64>>,
    scales: Option<Vec<f64>>,
    csv: Option<PathBuf>,
    progress: bool,
}

fn parse_list(flag: &str, value: &str) -> Result<Vec<f64>, Error> {
    value
        .split(',')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|_| {
                Error::InvalidArgument(format!("{flag}: cannot parse {v:?} as a number"))
            })
        })
        .collect()
}

fn parse_count<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("{flag}: cannot parse {value:?}")))
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options, Error> {
    let mut args = args.into_iter();
    let mut data = None;
    let mut opts = Options {
        data: PathBuf::new(),
        steps: STEPS,
        burn_in: BURN_IN,
        n_chains: N_CHAINS,
        seed: SEED,
        initial: None,
        scales: None,
        csv: None,
        progress: true,
    };

    while let Some(arg) = args.next() {
        if arg == "--no-progress" {
            opts.progress = false;
            continue;
        }
        if !arg.starts_with("--") {
            if data.replace(PathBuf::from(&arg)).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "unexpected extra argument {arg:?}"
                )));
            }
            continue;
        }
        let value = args
            .next()
            .ok_or_else(|| Error::InvalidArgument(format!("{arg} needs a value")))?;
        match arg.as_str() {
            "--steps" => opts.steps = parse_count(&arg, &value)?,
            "--burn-in" => opts.burn_in = parse_count(&arg, &value)?,
            "--chains" => opts.n_chains = parse_count(&arg, &value)?,
            "--seed" => opts.seed = parse_count(&arg, &value)?,
            "--init" => opts.initial = Some(parse_list(&arg, &value)?),
            "--scales" => opts.scales = Some(parse_list(&arg, &value)?),
            "--csv" => opts.csv = Some(PathBuf::from(value)),
            _ => return Err(Error::InvalidArgument(format!("unknown flag {arg}"))),
        }
    }

    opts.data = data.ok_or_else(|| Error::InvalidArgument("missing data file".to_string()))?;
    if opts.burn_in > opts.steps {
        return Err(Error::InvalidArgument(format!(
            "burn-in {} exceeds the {} steps requested",
            opts.burn_in, opts.steps
        )));
    }
    Ok(opts)
}

/// Half the y range as amplitude, the mean as offset, one period across the x range.
fn initial_guess(data: &Dataset) -> Vec<f64> {
    let (y_min, y_max) = data
        .y()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| {
            (lo.min(y), hi.max(y))
        });
    let (x_min, x_max) = data
        .x()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let offset = data.y().iter().sum::<f64>() / data.len() as f64;
    let span = x_max - x_min;
    vec![
        0.5 * (y_max - y_min),
        if span > 0.0 { span } else { 1.0 },
        0.0,
        offset,
    ]
}

/// Small steps relative to the starting values.
fn default_scales(initial: &[f64]) -> Vec<f64> {
    let amplitude = initial[PeriodicModel::AMPLITUDE].abs().max(1e-3);
    vec![
        0.02 * amplitude,
        2e-3 * initial[PeriodicModel::PERIOD].abs().max(1e-3),
        0.02,
        0.02 * amplitude,
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = parse_args(std::env::args().skip(1))?;

    let data = Arc::new(load_dataset(&opts.data)?);
    println!("Loaded {} points from {}", data.len(), opts.data.display());

    let model = PeriodicModel;
    let names = model.param_names();
    let initial = opts.initial.clone().unwrap_or_else(|| initial_guess(&data));
    let scales = opts.scales.clone().unwrap_or_else(|| default_scales(&initial));
    println!("Initial: {initial:?}");
    println!("Scales:  {scales:?}");

    let chi2 = ChiSquared::new(model);
    let mut ensemble = Ensemble::new(&initial, &scales, chi2.clone(), data.clone(), opts.n_chains)?
        .set_seed(opts.seed);

    let chains = if opts.progress {
        ensemble.run_progress(opts.steps)?
    } else {
        ensemble.run(opts.steps)?
    };
    for (i, chain) in chains.iter().enumerate() {
        println!("Chain {i}: AcceptRate={:.3}", chain.acceptance_rate());
    }

    let kept = chains
        .iter()
        .map(|c| c.discard(opts.burn_in + 1))
        .collect::<Result<Vec<_>, _>>()?;
    let pooled = concatenate(Axis(0), &kept)?;
    println!("Kept {} samples after burn-in", pooled.nrows());
    if pooled.nrows() == 0 {
        return Ok(());
    }

    let median = medians(pooled.view())?;
    let lower = quantiles(pooled.view(), 0.16)?;
    let upper = quantiles(pooled.view(), 0.84)?;
    for (i, name) in names.iter().enumerate() {
        println!(
            "{name:>10}: {:.6} +{:.6} -{:.6}",
            median[i],
            upper[i] - median[i],
            median[i] - lower[i]
        );
    }

    let dof = data.len().saturating_sub(model.n_params());
    if dof > 0 {
        let at_median = chi2.chi2(median.as_slice().unwrap_or(&initial[..]), &data);
        println!("Reduced chi-squared at median: {:.4}", at_median / dof as f64);
    }

    if kept.len() >= 2 && kept[0].nrows() >= 2 {
        let r = rhat(&kept)?;
        println!("Max R-hat: {:.4}", max_rhat(&r)?);
    }

    if let Some(path) = &opts.csv {
        save_chains(&chains, Some(names.as_slice()), path)?;
        println!("Saved chains to {}", path.display());
    }

    Ok(())
}
