//! The [`MarkovChain`] abstraction, the sequential chain driver, and the parallel
//! multi-chain runner.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{Result, SamplerError};

/// Acceptance rates outside this band usually mean the bandwidth needs tuning.
const HEALTHY_ACCEPTANCE: std::ops::RangeInclusive<f64> = 0.1..=0.9;

pub trait MarkovChain<S> {
    /// Does one iteration of the chain, returning the new current state.
    fn step(&mut self) -> Result<&S>;

    /// Get the current state without stepping.
    fn current_state(&self) -> &S;

    /// Total number of accepted moves since the chain was created.
    fn n_accepted(&self) -> usize;
}

/// The output of one sampling run: every retained state, in order, plus the
/// number of proposals that were accepted along the way.
///
/// A rejected proposal repeats the previous state, so `len()` always equals the
/// number of iterations requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain<S> {
    states: Vec<S>,
    accepted: usize,
}

impl<S> Chain<S> {
    pub(crate) fn new(states: Vec<S>, accepted: usize) -> Self {
        debug_assert!(accepted <= states.len());
        Self { states, accepted }
    }

    pub fn states(&self) -> &[S] {
        &self.states
    }

    pub fn into_states(self) -> Vec<S> {
        self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of iterations in which the chain moved to the proposed state.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Accepted moves divided by total iterations, over the raw chain.
    pub fn acceptance_rate(&self) -> f64 {
        if self.states.is_empty() {
            0.0
        } else {
            self.accepted as f64 / self.states.len() as f64
        }
    }
}

fn check_iterations(n_steps: usize) -> Result<()> {
    if n_steps == 0 {
        return Err(SamplerError::InvalidIterations(n_steps));
    }
    Ok(())
}

fn finish<S>(states: Vec<S>, accepted: usize) -> Chain<S> {
    let chain = Chain::new(states, accepted);
    let rate = chain.acceptance_rate();
    debug!(
        "Chain finished: {} iterations, {} accepted (rate {:.3})",
        chain.len(),
        accepted,
        rate
    );
    if !HEALTHY_ACCEPTANCE.contains(&rate) {
        warn!(
            "Acceptance rate {:.3} is outside [{}, {}]; consider adjusting the bandwidth",
            rate,
            HEALTHY_ACCEPTANCE.start(),
            HEALTHY_ACCEPTANCE.end()
        );
    }
    chain
}

/// Steps `chain` exactly `n_steps` times and collects every state it visits.
pub fn run_chain<S, M>(chain: &mut M, n_steps: usize) -> Result<Chain<S>>
where
    M: MarkovChain<S>,
    S: Clone,
{
    check_iterations(n_steps)?;
    let accepted_before = chain.n_accepted();
    let mut out = Vec::with_capacity(n_steps);

    for _ in 0..n_steps {
        out.push(chain.step()?.clone());
    }

    Ok(finish(out, chain.n_accepted() - accepted_before))
}

pub fn run_chain_with_progress<S, M>(
    chain: &mut M,
    n_steps: usize,
    pb: &ProgressBar,
) -> Result<Chain<S>>
where
    M: MarkovChain<S>,
    S: Clone,
{
    check_iterations(n_steps)?;
    let accepted_before = chain.n_accepted();
    let mut out = Vec::with_capacity(n_steps);

    pb.set_length(n_steps as u64);

    for _ in 0..n_steps {
        out.push(chain.step()?.clone());
        pb.inc(1);
    }

    Ok(finish(out, chain.n_accepted() - accepted_before))
}

/// A trait for "anything that owns multiple MarkovChains".
/// - `S` is the state type (e.g. `f64` or `Vec<f64>`).
/// - `Chain` is the MarkovChain type stored by this struct.
pub trait HasChains<S> {
    type Chain: MarkovChain<S> + Send;

    /// Returns a mutable reference to the vector of chains.
    fn chains_mut(&mut self) -> &mut Vec<Self::Chain>;
}

pub trait ChainRunner<S>: HasChains<S>
where
    S: Clone + Send,
{
    /// Runs every chain for `n_steps` in parallel and returns the chains in index order.
    ///
    /// Chains share no state; results are combined only after all of them finish.
    fn run(&mut self, n_steps: usize) -> Result<Vec<Chain<S>>> {
        check_iterations(n_steps)?;
        let chains = self.chains_mut();
        let n_chains = chains.len();
        let results: Vec<Chain<S>> = chains
            .par_iter_mut()
            .map(|chain| run_chain(chain, n_steps))
            .collect::<Result<_>>()?;
        info!("Finished {n_chains} chains of {n_steps} iterations");
        Ok(results)
    }

    /// Like [`ChainRunner::run`], with one progress bar per chain.
    fn run_with_progress(&mut self, n_steps: usize) -> Result<Vec<Chain<S>>> {
        check_iterations(n_steps)?;
        let multi = MultiProgress::new();
        let pb_style = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let chains = self.chains_mut();
        let n_chains = chains.len();
        let results: Vec<Chain<S>> = chains
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
            .collect::<Result<_>>()?;
        info!("Finished {n_chains} chains of {n_steps} iterations");
        Ok(results)
    }
}

impl<S: Clone + Send, T: HasChains<S>> ChainRunner<S> for T {}
