//! Validated run configuration for scalar chains.

use rand::prelude::*;

use crate::core::Chain;
use crate::distributions::{ProposalKind, SymmetricProposal, Target};
use crate::error::{Result, SamplerError};
use crate::metropolis_hastings::{run_chain_with, MetropolisHastings};

/**
Everything needed to start a scalar chain: where it starts, how far it proposes,
how long it runs, and how it is seeded.

# Examples

```rust
use mini_metropolis::config::SamplerConfig;
use mini_metropolis::distributions::ProposalKind;

let config = SamplerConfig::new(4.0, 1.0, 5_000)
    .with_proposal(ProposalKind::Gaussian)
    .set_seed(42);
let chain = config.run(|mu: &f64| (-0.5 * (mu - 4.0).powi(2)).exp()).unwrap();
assert_eq!(chain.len(), 5_000);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub start: f64,
    /// Window half-width (uniform) or standard deviation (Gaussian).
    pub bandwidth: f64,
    pub iterations: usize,
    pub proposal: ProposalKind,
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            bandwidth: 1.0,
            iterations: 10_000,
            proposal: ProposalKind::Uniform,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn new(start: f64, bandwidth: f64, iterations: usize) -> Self {
        Self {
            start,
            bandwidth,
            iterations,
            ..Self::default()
        }
    }

    pub fn with_proposal(mut self, proposal: ProposalKind) -> Self {
        self.proposal = proposal;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the start, bandwidth and iteration count without sampling anything.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() {
            return Err(SamplerError::InvalidStart(self.start));
        }
        self.build_proposal()?;
        if self.iterations == 0 {
            return Err(SamplerError::InvalidIterations(self.iterations));
        }
        Ok(())
    }

    pub fn build_proposal(&self) -> Result<SymmetricProposal> {
        self.proposal.build(self.bandwidth)
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }

    /// Runs a single chain against `target`.
    pub fn run<D: Target<f64>>(&self, target: D) -> Result<Chain<f64>> {
        self.validate()?;
        let proposal = self.build_proposal()?;
        run_chain_with(self.start, proposal, target, self.iterations, &mut self.rng())
    }

    /// Builds `n_chains` independent chains against `target`, seeded `seed + i`.
    pub fn sampler<D>(
        &self,
        target: D,
        n_chains: usize,
    ) -> Result<MetropolisHastings<f64, D, SymmetricProposal>>
    where
        D: Target<f64> + Clone,
    {
        self.validate()?;
        let proposal = self.build_proposal()?;
        let sampler = MetropolisHastings::new(target, proposal, self.start, n_chains)?;
        Ok(match self.seed {
            Some(seed) => sampler.set_seed(seed),
            None => sampler,
        })
    }
}
