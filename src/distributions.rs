/*!
Target densities and symmetric proposal distributions for the Metropolis–Hastings sampler.

A [`Target`] maps a state to a non-negative, unnormalized plausibility
(prior density times likelihood). Any `Fn(&S) -> f64` closure is a target, so most
callers never implement the trait by hand.

A [`Proposal`] draws a candidate state around the current one. Every proposal in this
module is symmetric, `q(x' | x) = q(x | x')`, which is what lets the acceptance ratio
ignore the proposal density altogether.

# Examples

```rust
use mini_metropolis::distributions::{Proposal, Target, UniformWindow};
use rand::rngs::SmallRng;
use rand::SeedableRng;

let target = |x: &f64| (-0.5 * x * x).exp();
assert_eq!(target.density(&0.0), 1.0);

let proposal = UniformWindow::new(0.5).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let candidate: f64 = proposal.propose(&1.0, &mut rng);
assert!((0.5..=1.5).contains(&candidate));
```
*/

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{Result, SamplerError};

/// An unnormalized, non-negative density over states of type `S`.
///
/// Implementations must be pure: the sampler compares two evaluations of the
/// same function and relies on them being reproducible.
pub trait Target<S> {
    /// Returns the plausibility of `state`, i.e. prior density times likelihood.
    fn density(&self, state: &S) -> f64;

    /// Natural log of [`Target::density`], `-inf` outside the support.
    ///
    /// The sampler compares states through this value. Targets built from many
    /// likelihood terms should override it and sum log terms, since their product
    /// underflows to zero long before the log does.
    fn ln_density(&self, state: &S) -> f64 {
        self.density(state).ln()
    }
}

impl<S, F> Target<S> for F
where
    F: Fn(&S) -> f64,
{
    fn density(&self, state: &S) -> f64 {
        self(state)
    }
}

/// A state made of `f64` coordinates.
///
/// The built-in proposals perturb states through [`State::map_coords`]; summaries and
/// CSV export read them back through [`State::coords`].
pub trait State: Clone + std::fmt::Debug {
    /// Returns a copy of `self` with `f` applied to every coordinate.
    fn map_coords<F: FnMut(f64) -> f64>(&self, f: F) -> Self;

    /// The coordinates of `self`, in order.
    fn coords(&self) -> &[f64];

    /// Whether every coordinate is finite.
    fn all_finite(&self) -> bool {
        self.coords().iter().all(|x| x.is_finite())
    }
}

impl State for f64 {
    fn map_coords<F: FnMut(f64) -> f64>(&self, mut f: F) -> Self {
        f(*self)
    }

    fn coords(&self) -> &[f64] {
        std::slice::from_ref(self)
    }
}

impl State for Vec<f64> {
    fn map_coords<F: FnMut(f64) -> f64>(&self, f: F) -> Self {
        self.iter().copied().map(f).collect()
    }

    fn coords(&self) -> &[f64] {
        self
    }
}

impl<const N: usize> State for [f64; N] {
    fn map_coords<F: FnMut(f64) -> f64>(&self, f: F) -> Self {
        (*self).map(f)
    }

    fn coords(&self) -> &[f64] {
        self
    }
}

/// A symmetric proposal distribution centred on the current state.
pub trait Proposal<S> {
    /// Draws a candidate `x'` from `q(x' | current)`.
    fn propose<R: Rng + ?Sized>(&self, current: &S, rng: &mut R) -> S;

    /// The window half-width or standard deviation this proposal was built with.
    fn bandwidth(&self) -> f64;
}

fn check_bandwidth(bandwidth: f64) -> Result<f64> {
    if bandwidth.is_finite() && bandwidth > 0.0 {
        Ok(bandwidth)
    } else {
        Err(SamplerError::InvalidBandwidth(bandwidth))
    }
}

/**
Uniform random-walk proposal: each coordinate moves to a point drawn uniformly
from `[x - w, x + w]`.

# Examples

```rust
use mini_metropolis::distributions::UniformWindow;

assert!(UniformWindow::new(1.0).is_ok());
assert!(UniformWindow::new(0.0).is_err());
```
*/
#[derive(Debug, Clone, Copy)]
pub struct UniformWindow {
    half_width: f64,
    offsets: Uniform<f64>,
}

impl UniformWindow {
    /// Creates a window of half-width `half_width`. Fails unless it is positive and finite.
    pub fn new(half_width: f64) -> Result<Self> {
        let half_width = check_bandwidth(half_width)?;
        Ok(Self {
            half_width,
            offsets: Uniform::new_inclusive(-half_width, half_width),
        })
    }
}

impl<S: State> Proposal<S> for UniformWindow {
    fn propose<R: Rng + ?Sized>(&self, current: &S, rng: &mut R) -> S {
        current.map_coords(|x| x + self.offsets.sample(rng))
    }

    fn bandwidth(&self) -> f64 {
        self.half_width
    }
}

/// Gaussian random-walk proposal: each coordinate moves by `Normal(0, sd)` noise.
#[derive(Debug, Clone, Copy)]
pub struct GaussianStep {
    std: f64,
    noise: Normal<f64>,
}

impl GaussianStep {
    /// Creates a Gaussian step with standard deviation `std`. Fails unless it is positive and finite.
    pub fn new(std: f64) -> Result<Self> {
        let std = check_bandwidth(std)?;
        let noise = Normal::new(0.0, std).map_err(|_| SamplerError::InvalidBandwidth(std))?;
        Ok(Self { std, noise })
    }
}

impl<S: State> Proposal<S> for GaussianStep {
    fn propose<R: Rng + ?Sized>(&self, current: &S, rng: &mut R) -> S {
        current.map_coords(|x| x + self.noise.sample(rng))
    }

    fn bandwidth(&self) -> f64 {
        self.std
    }
}

/// Which symmetric proposal family a run should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProposalKind {
    /// [`UniformWindow`]; the bandwidth is the window half-width.
    #[default]
    Uniform,
    /// [`GaussianStep`]; the bandwidth is the standard deviation.
    Gaussian,
}

impl ProposalKind {
    /// Builds the proposal of this kind with the given bandwidth.
    pub fn build(self, bandwidth: f64) -> Result<SymmetricProposal> {
        match self {
            ProposalKind::Uniform => UniformWindow::new(bandwidth).map(SymmetricProposal::Uniform),
            ProposalKind::Gaussian => GaussianStep::new(bandwidth).map(SymmetricProposal::Gaussian),
        }
    }
}

/// Either of the built-in proposals, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum SymmetricProposal {
    Uniform(UniformWindow),
    Gaussian(GaussianStep),
}

impl<S: State> Proposal<S> for SymmetricProposal {
    fn propose<R: Rng + ?Sized>(&self, current: &S, rng: &mut R) -> S {
        match self {
            SymmetricProposal::Uniform(q) => q.propose(current, rng),
            SymmetricProposal::Gaussian(q) => q.propose(current, rng),
        }
    }

    fn bandwidth(&self) -> f64 {
        match self {
            SymmetricProposal::Uniform(q) => Proposal::<f64>::bandwidth(q),
            SymmetricProposal::Gaussian(q) => Proposal::<f64>::bandwidth(q),
        }
    }
}
