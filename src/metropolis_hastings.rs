/*!
# Metropolis–Hastings Sampler

A random-walk Metropolis–Hastings sampler for any [`Target`] density and any
symmetric [`Proposal`]. Each iteration proposes a candidate around the current
state, then moves there with probability

\[
\alpha = \min\left(1, \frac{f(x')}{f(x)}\right)
\]

and otherwise stays put. Because the proposals are symmetric the proposal density
cancels and no Hastings correction is applied.

If the current state has zero plausibility the ratio is treated as infinite and the
chain always moves, so a chain started outside the support walks back into it.

The ratio is formed from [`Target::ln_density`] as `exp(min(0, ln f(x') - ln f(x)))`,
so targets whose density underflows `f64` can still be sampled.

## Overview

- [`run_chain`]: one scalar chain with a uniform window proposal and a caller-supplied RNG.
- [`run_chain_with`]: the same for any state type and any symmetric proposal.
- [`MHMarkovChain`]: the stateful chain behind both, usable step by step.
- [`MetropolisHastings`]: several independent chains, seeded `seed + i`, run in parallel
  through [`ChainRunner`](crate::core::ChainRunner).

## Example Usage

```rust
use mini_metropolis::metropolis_hastings::run_chain;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(42);
let chain = run_chain(0.0, 1.0, |x: &f64| (-0.5 * x * x).exp(), 1_000, &mut rng).unwrap();

assert_eq!(chain.len(), 1_000);
assert!(chain.accepted() <= 1_000);
```
*/

use log::debug;
use rand::prelude::*;

use crate::core::{Chain, HasChains, MarkovChain};
use crate::distributions::{Proposal, Target, UniformWindow};
use crate::error::{Result, SamplerError};

/// Evaluates `target` at `state`, rejecting values no density may take.
pub fn checked_density<S, D>(target: &D, state: &S) -> Result<f64>
where
    S: std::fmt::Debug,
    D: Target<S> + ?Sized,
{
    let value = target.density(state);
    if !value.is_finite() {
        return Err(SamplerError::NonFiniteDensity {
            state: format!("{state:?}"),
            value,
        });
    }
    if value < 0.0 {
        return Err(SamplerError::NegativeDensity {
            state: format!("{state:?}"),
            value,
        });
    }
    Ok(value)
}

/// Evaluates `target.ln_density` at `state`, with `-inf` standing for zero density.
///
/// A NaN or `+inf` log-density is reported on the density scale, as
/// [`SamplerError::NegativeDensity`] or [`SamplerError::NonFiniteDensity`].
pub fn checked_ln_density<S, D>(target: &D, state: &S) -> Result<f64>
where
    S: std::fmt::Debug,
    D: Target<S> + ?Sized,
{
    let value = target.ln_density(state);
    if value.is_nan() || value == f64::INFINITY {
        checked_density(target, state)?;
        return Err(SamplerError::NonFiniteDensity {
            state: format!("{state:?}"),
            value,
        });
    }
    Ok(value)
}

/**
Returns `min(1, proposed / current)`.

A zero-density current state yields `1.0`: the chain always leaves it.
Both arguments are expected to have passed [`checked_density`].

```rust
use mini_metropolis::metropolis_hastings::acceptance_probability;

assert_eq!(acceptance_probability(0.4, 0.1), 0.25);
assert_eq!(acceptance_probability(0.1, 0.4), 1.0);
assert_eq!(acceptance_probability(0.0, 0.0), 1.0);
```
*/
pub fn acceptance_probability(current: f64, proposed: f64) -> f64 {
    if current == 0.0 {
        1.0
    } else {
        (proposed / current).min(1.0)
    }
}

/**
Returns `min(1, exp(ln_proposed - ln_current))`, the same ratio as
[`acceptance_probability`] taken on log-densities.

A current log-density of `-inf` (zero density) yields `1.0`.

```rust
use mini_metropolis::metropolis_hastings::ln_acceptance_probability;

assert_eq!(ln_acceptance_probability(-1000.0, -999.0), 1.0);
assert!((ln_acceptance_probability(-999.0, -1000.0) - (-1f64).exp()).abs() < 1e-15);
assert_eq!(ln_acceptance_probability(f64::NEG_INFINITY, f64::NEG_INFINITY), 1.0);
```
*/
pub fn ln_acceptance_probability(ln_current: f64, ln_proposed: f64) -> f64 {
    if ln_current == f64::NEG_INFINITY {
        1.0
    } else {
        (ln_proposed - ln_current).min(0.0).exp()
    }
}

/// Draws one uniform and reports whether it falls below `alpha`.
fn bernoulli<R: Rng + ?Sized>(alpha: f64, rng: &mut R) -> bool {
    let u: f64 = rng.gen();
    u < alpha
}

/// Draws a candidate uniformly from `[x - bandwidth, x + bandwidth]`.
pub fn propose<R: Rng + ?Sized>(x: f64, bandwidth: f64, rng: &mut R) -> Result<f64> {
    let window = UniformWindow::new(bandwidth)?;
    Ok(window.propose(&x, rng))
}

/**
Decides whether the chain moves from `current` to `candidate`.

Returns the next state together with a flag that is `true` if the chain moved.
Staying at `current` is a normal outcome, not a failure.
*/
pub fn accept<S, D, R>(current: &S, candidate: S, target: &D, rng: &mut R) -> Result<(S, bool)>
where
    S: Clone + std::fmt::Debug,
    D: Target<S> + ?Sized,
    R: Rng + ?Sized,
{
    let ln_current = checked_ln_density(target, current)?;
    let ln_candidate = checked_ln_density(target, &candidate)?;
    if bernoulli(ln_acceptance_probability(ln_current, ln_candidate), rng) {
        Ok((candidate, true))
    } else {
        Ok((current.clone(), false))
    }
}

/// A single Metropolis–Hastings chain.
///
/// The chain owns its target, proposal and random number generator, and caches the
/// log-density of its current state so each step costs one target evaluation.
#[derive(Debug, Clone)]
pub struct MHMarkovChain<S, D, Q, R = SmallRng> {
    /// The target density to sample from.
    pub target: D,
    /// The proposal distribution used to generate candidate states.
    pub proposal: Q,
    current_state: S,
    current_ln_density: f64,
    accepted: usize,
    rng: R,
}

impl<S, D, Q> MHMarkovChain<S, D, Q, SmallRng>
where
    S: Clone + std::fmt::Debug,
    D: Target<S>,
    Q: Proposal<S>,
{
    /**
    Creates a chain at `initial_state` with an entropy-seeded RNG.

    # Examples

    ```rust
    use mini_metropolis::core::MarkovChain;
    use mini_metropolis::distributions::GaussianStep;
    use mini_metropolis::metropolis_hastings::MHMarkovChain;

    let target = |x: &Vec<f64>| (-0.5 * x.iter().map(|v| v * v).sum::<f64>()).exp();
    let proposal = GaussianStep::new(1.0).unwrap();
    let mut chain = MHMarkovChain::new(target, proposal, vec![0.0, 0.0])
        .unwrap()
        .set_seed(42);
    assert_eq!(chain.step().unwrap().len(), 2);
    ```
    */
    pub fn new(target: D, proposal: Q, initial_state: S) -> Result<Self> {
        let seed = thread_rng().gen::<u64>();
        Self::with_rng(target, proposal, initial_state, SmallRng::seed_from_u64(seed))
    }

    /// Reseeds this chain's RNG.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

impl<S, D, Q, R> MHMarkovChain<S, D, Q, R>
where
    S: Clone + std::fmt::Debug,
    D: Target<S>,
    Q: Proposal<S>,
    R: Rng,
{
    /// Creates a chain at `initial_state` drawing its randomness from `rng`.
    ///
    /// Fails if the target is negative or non-finite at `initial_state`. A density of
    /// zero is allowed.
    pub fn with_rng(target: D, proposal: Q, initial_state: S, rng: R) -> Result<Self> {
        let current_ln_density = checked_ln_density(&target, &initial_state)?;
        Ok(Self {
            target,
            proposal,
            current_state: initial_state,
            current_ln_density,
            accepted: 0,
            rng,
        })
    }

    /// Runs one proposal and acceptance cycle and reports whether the chain moved.
    pub fn try_step(&mut self) -> Result<bool> {
        let candidate = self.proposal.propose(&self.current_state, &mut self.rng);
        let ln_candidate = checked_ln_density(&self.target, &candidate)?;
        let alpha = ln_acceptance_probability(self.current_ln_density, ln_candidate);
        let moved = bernoulli(alpha, &mut self.rng);
        if moved {
            self.current_state = candidate;
            self.current_ln_density = ln_candidate;
            self.accepted += 1;
        }
        Ok(moved)
    }

    /// Density of the current state, as last evaluated.
    pub fn current_density(&self) -> f64 {
        self.current_ln_density.exp()
    }

    /// Log-density of the current state, as last evaluated.
    pub fn current_ln_density(&self) -> f64 {
        self.current_ln_density
    }
}

impl<S, D, Q, R> MarkovChain<S> for MHMarkovChain<S, D, Q, R>
where
    S: Clone + std::fmt::Debug,
    D: Target<S>,
    Q: Proposal<S>,
    R: Rng,
{
    fn step(&mut self) -> Result<&S> {
        self.try_step()?;
        Ok(&self.current_state)
    }

    fn current_state(&self) -> &S {
        &self.current_state
    }

    fn n_accepted(&self) -> usize {
        self.accepted
    }
}

/**
Runs one chain over any state type with any symmetric proposal.

Fails before sampling if `iterations` is zero or the start state has an invalid
density, and during sampling if the target returns a negative or non-finite value.
*/
pub fn run_chain_with<S, D, Q, R>(
    start: S,
    proposal: Q,
    target: D,
    iterations: usize,
    rng: &mut R,
) -> Result<Chain<S>>
where
    S: Clone + std::fmt::Debug,
    D: Target<S>,
    Q: Proposal<S>,
    R: Rng + ?Sized,
{
    if iterations == 0 {
        return Err(SamplerError::InvalidIterations(iterations));
    }
    debug!(
        "Starting chain at {:?} with bandwidth {} for {} iterations",
        start,
        proposal.bandwidth(),
        iterations
    );
    let mut chain = MHMarkovChain::with_rng(target, proposal, start, rng)?;
    crate::core::run_chain(&mut chain, iterations)
}

/**
Runs one scalar chain of `iterations` steps from `start`, proposing uniformly
within `bandwidth` of the current state.

The RNG is injected so that a fixed seed reproduces the chain exactly.

# Errors

[`SamplerError::InvalidStart`] if `start` is NaN or infinite,
[`SamplerError::InvalidBandwidth`] if `bandwidth <= 0`,
[`SamplerError::InvalidIterations`] if `iterations == 0`, all before any sampling;
[`SamplerError::NegativeDensity`] or [`SamplerError::NonFiniteDensity`] if
`density_fn` misbehaves.

```rust
use mini_metropolis::metropolis_hastings::run_chain;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(1);
assert!(run_chain(0.0, 0.0, |_: &f64| 1.0, 10, &mut rng).is_err());
assert!(run_chain(0.0, 1.0, |_: &f64| 1.0, 0, &mut rng).is_err());
assert!(run_chain(f64::NAN, 1.0, |_: &f64| 1.0, 10, &mut rng).is_err());
```
*/
pub fn run_chain<F, R>(
    start: f64,
    bandwidth: f64,
    density_fn: F,
    iterations: usize,
    rng: &mut R,
) -> Result<Chain<f64>>
where
    F: Fn(&f64) -> f64,
    R: Rng + ?Sized,
{
    if !start.is_finite() {
        return Err(SamplerError::InvalidStart(start));
    }
    let proposal = UniformWindow::new(bandwidth)?;
    run_chain_with(start, proposal, density_fn, iterations, rng)
}

/**
Several independent Metropolis–Hastings chains sharing a target and a proposal.

Each chain holds its own copy of the target and proposal and its own RNG. After
[`MetropolisHastings::set_seed`], chain `i` is seeded with `seed + i`.

# Examples

```rust
use mini_metropolis::core::ChainRunner;
use mini_metropolis::distributions::UniformWindow;
use mini_metropolis::metropolis_hastings::MetropolisHastings;

let target = |x: &f64| (-0.5 * x * x).exp();
let proposal = UniformWindow::new(1.0).unwrap();
let mut mh = MetropolisHastings::new(target, proposal, 0.0, 4).unwrap().set_seed(42);
assert_eq!(mh.chains.len(), 4);

let chains = mh.run(500).unwrap();
assert_eq!(chains.len(), 4);
assert!(chains.iter().all(|c| c.len() == 500));
```
*/
#[derive(Debug, Clone)]
pub struct MetropolisHastings<S, D, Q> {
    /// The independent chains.
    pub chains: Vec<MHMarkovChain<S, D, Q>>,
    /// The global random seed.
    pub seed: u64,
}

impl<S, D, Q> MetropolisHastings<S, D, Q>
where
    S: Clone + std::fmt::Debug,
    D: Target<S> + Clone,
    Q: Proposal<S> + Clone,
{
    /// Creates `n_chains` chains, all starting at `initial_state`, seeded from entropy.
    pub fn new(target: D, proposal: Q, initial_state: S, n_chains: usize) -> Result<Self> {
        if n_chains == 0 {
            return Err(SamplerError::InvalidChainCount(n_chains));
        }
        let chains = (0..n_chains)
            .map(|_| MHMarkovChain::new(target.clone(), proposal.clone(), initial_state.clone()))
            .collect::<Result<Vec<_>>>()?;
        let seed = thread_rng().gen::<u64>();
        Ok(Self { chains, seed }.set_seed(seed))
    }

    /// Sets a new global seed; chain `i` gets `seed + i`.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.chains = self
            .chains
            .into_iter()
            .enumerate()
            .map(|(i, chain)| chain.set_seed(seed.wrapping_add(i as u64)))
            .collect();
        self
    }
}

impl<S, D, Q> HasChains<S> for MetropolisHastings<S, D, Q>
where
    S: Clone + std::fmt::Debug + Send,
    D: Target<S> + Clone + Send,
    Q: Proposal<S> + Clone + Send,
{
    type Chain = MHMarkovChain<S, D, Q>;

    fn chains_mut(&mut self) -> &mut Vec<Self::Chain> {
        &mut self.chains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainRunner;
    use crate::distributions::GaussianStep;
    use approx::assert_abs_diff_eq;

    fn std_normal_kernel(x: &f64) -> f64 {
        (-0.5 * x * x).exp()
    }

    #[test]
    fn alpha_is_capped_at_one() {
        assert_eq!(acceptance_probability(1.0, 1.0), 1.0);
        assert_eq!(acceptance_probability(1.0, 3.0), 1.0);
        assert_abs_diff_eq!(acceptance_probability(2.0, 1.0), 0.5);
        assert_eq!(acceptance_probability(1.0, 0.0), 0.0);
    }

    #[test]
    fn zero_current_density_always_moves() {
        assert_eq!(acceptance_probability(0.0, 0.0), 1.0);
        assert_eq!(acceptance_probability(0.0, 1e-300), 1.0);
        let mut rng = SmallRng::seed_from_u64(0);
        let target = |x: &f64| if *x < 0.0 { 0.0 } else { 1.0 };
        for _ in 0..100 {
            let (next, moved) = accept(&-1.0, -0.5, &target, &mut rng).unwrap();
            assert!(moved);
            assert_eq!(next, -0.5);
        }
    }

    #[test]
    fn accept_never_moves_to_zero_density() {
        let mut rng = SmallRng::seed_from_u64(0);
        let target = |x: &f64| if *x > 5.0 { 0.0 } else { 1.0 };
        for _ in 0..100 {
            let (next, moved) = accept(&0.0, 6.0, &target, &mut rng).unwrap();
            assert!(!moved);
            assert_eq!(next, 0.0);
        }
    }

    #[test]
    fn accept_rate_tracks_alpha() {
        let mut rng = SmallRng::seed_from_u64(9);
        let target = |x: &f64| if *x > 0.0 { 0.25 } else { 1.0 };
        let n = 20_000;
        let moved = (0..n)
            .filter(|_| accept(&0.0, 1.0, &target, &mut rng).unwrap().1)
            .count();
        assert_abs_diff_eq!(moved as f64 / n as f64, 0.25, epsilon = 0.02);
    }

    #[test]
    fn accept_rejects_bad_densities() {
        let mut rng = SmallRng::seed_from_u64(0);
        let negative = |x: &f64| if *x > 0.0 { -1.0 } else { 1.0 };
        assert!(matches!(
            accept(&0.0, 1.0, &negative, &mut rng),
            Err(SamplerError::NegativeDensity { value, .. }) if value == -1.0
        ));
        let nan = |_: &f64| f64::NAN;
        assert!(matches!(
            accept(&0.0, 1.0, &nan, &mut rng),
            Err(SamplerError::NonFiniteDensity { .. })
        ));
    }

    #[test]
    fn propose_checks_bandwidth() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(matches!(
            propose(1.0, 0.0, &mut rng),
            Err(SamplerError::InvalidBandwidth(w)) if w == 0.0
        ));
        let x = propose(1.0, 0.5, &mut rng).unwrap();
        assert!((0.5..=1.5).contains(&x));
    }

    #[test]
    fn try_step_counts_moves() {
        let proposal = UniformWindow::new(0.5).unwrap();
        let mut chain = MHMarkovChain::new(std_normal_kernel, proposal, 0.0)
            .unwrap()
            .set_seed(1);
        let moves = (0..1000).filter(|_| chain.try_step().unwrap()).count();
        assert_eq!(moves, chain.n_accepted());
        assert_abs_diff_eq!(
            chain.current_density(),
            std_normal_kernel(chain.current_state()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn log_ratio_matches_density_ratio() {
        for (current, proposed) in [(0.4, 0.1), (0.1, 0.4), (1.0, 0.0), (0.3, 0.3)] {
            assert_abs_diff_eq!(
                ln_acceptance_probability(f64::ln(current), f64::ln(proposed)),
                acceptance_probability(current, proposed),
                epsilon = 1e-12
            );
        }
        assert_eq!(ln_acceptance_probability(f64::NEG_INFINITY, -5.0), 1.0);
    }

    /// A target known only through its log: the density itself is exactly zero
    /// everywhere in `f64`, yet the chain still settles around the mode.
    #[test]
    fn underflowing_density_still_mixes() {
        struct Peaked;
        impl Target<f64> for Peaked {
            fn density(&self, x: &f64) -> f64 {
                self.ln_density(x).exp()
            }
            fn ln_density(&self, x: &f64) -> f64 {
                -2_000.0 - 0.5 * (x - 1.0).powi(2)
            }
        }
        assert_eq!(Peaked.density(&1.0), 0.0);

        let mut rng = SmallRng::seed_from_u64(42);
        let proposal = UniformWindow::new(1.0).unwrap();
        let chain = run_chain_with(1.0, proposal, Peaked, 20_000, &mut rng).unwrap();
        assert!(chain.acceptance_rate() < 0.95);
        let kept = &chain.states()[1_000..];
        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 0.1);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(0);
        for start in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                run_chain(start, 1.0, |_: &f64| 1.0, 10, &mut rng),
                Err(SamplerError::InvalidStart(_))
            ));
        }
    }

    #[test]
    fn negative_start_density_is_rejected_up_front() {
        let proposal = UniformWindow::new(1.0).unwrap();
        let result = MHMarkovChain::new(|_: &f64| -0.5, proposal, 0.0);
        assert!(matches!(result, Err(SamplerError::NegativeDensity { .. })));
    }

    #[test]
    fn density_error_mid_run_aborts() {
        let mut rng = SmallRng::seed_from_u64(4);
        let target = |x: &f64| if *x > 3.0 { f64::INFINITY } else { 1.0 };
        let result = run_chain(0.0, 1.0, target, 10_000, &mut rng);
        assert!(matches!(result, Err(SamplerError::NonFiniteDensity { .. })));
    }

    #[test]
    fn run_chain_is_reproducible() {
        let a = run_chain(
            1.0,
            0.8,
            std_normal_kernel,
            2_000,
            &mut SmallRng::seed_from_u64(42),
        )
        .unwrap();
        let b = run_chain(
            1.0,
            0.8,
            std_normal_kernel,
            2_000,
            &mut SmallRng::seed_from_u64(42),
        )
        .unwrap();
        let c = run_chain(
            1.0,
            0.8,
            std_normal_kernel,
            2_000,
            &mut SmallRng::seed_from_u64(43),
        )
        .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn vector_chain_samples_isotropic_gaussian() {
        let target = |x: &[f64; 2]| (-0.5 * (x[0] * x[0] + x[1] * x[1])).exp();
        let proposal = GaussianStep::new(1.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let chain = run_chain_with([3.0, -3.0], proposal, target, 20_000, &mut rng).unwrap();
        let kept = &chain.states()[2_000..];
        for d in 0..2 {
            let mean = kept.iter().map(|s| s[d]).sum::<f64>() / kept.len() as f64;
            assert_abs_diff_eq!(mean, 0.0, epsilon = 0.15);
        }
    }

    #[test]
    fn multi_chain_seeds_are_offset() {
        let proposal = UniformWindow::new(1.0).unwrap();
        let mut a = MetropolisHastings::new(std_normal_kernel, proposal, 0.0, 3)
            .unwrap()
            .set_seed(7);
        let mut b = MetropolisHastings::new(std_normal_kernel, proposal, 0.0, 3)
            .unwrap()
            .set_seed(7);
        assert_eq!(a.seed, 7);
        let ra = a.run(300).unwrap();
        let rb = b.run(300).unwrap();
        assert_eq!(ra, rb);
        assert_ne!(ra[0], ra[1]);

        // Chain 1 of a sampler seeded 7 behaves like chain 0 of one seeded 8.
        let mut shifted = MetropolisHastings::new(std_normal_kernel, proposal, 0.0, 1)
            .unwrap()
            .set_seed(8);
        assert_eq!(shifted.run(300).unwrap()[0], ra[1]);
    }

    #[test]
    fn zero_chains_is_an_error() {
        let proposal = UniformWindow::new(1.0).unwrap();
        assert!(matches!(
            MetropolisHastings::new(std_normal_kernel, proposal, 0.0, 0),
            Err(SamplerError::InvalidChainCount(0))
        ));
    }
}
