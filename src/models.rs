/*!
Conjugate teaching models expressed as sampler targets.

Each model multiplies a closed-form prior density by a closed-form likelihood, which is
all the sampler needs. The product is accumulated as a sum of log terms in
[`Target::ln_density`], so large data sets do not underflow to zero. Because the priors are conjugate the exact posterior is known,
so every model also reports its analytic posterior mean and standard deviation through
[`AnalyticPosterior`]. That makes them convenient for checking a chain against the truth.

```rust
use mini_metropolis::models::{AnalyticPosterior, NormalNormal};

let model = NormalNormal::new(0.0, 1.0, 0.75, &[6.25]).unwrap();
assert!((model.posterior_mean() - 4.0).abs() < 1e-12);
assert!((model.posterior_sd() - 0.6).abs() < 1e-12);
```
*/

use statrs::distribution::{Beta, Binomial, Continuous, Discrete, Gamma, Normal, Poisson};

use crate::distributions::Target;
use crate::error::{Result, SamplerError};

/// Closed-form posterior moments of a conjugate model.
pub trait AnalyticPosterior {
    fn posterior_mean(&self) -> f64;
    fn posterior_sd(&self) -> f64;
}

fn invalid<E: std::fmt::Display>(e: E) -> SamplerError {
    SamplerError::InvalidModel(e.to_string())
}

/// Unknown mean `μ` of normal observations with known standard deviation,
/// under a normal prior on `μ`.
#[derive(Debug, Clone)]
pub struct NormalNormal {
    prior: Normal,
    prior_mean: f64,
    prior_sd: f64,
    likelihood_sd: f64,
    observed: Vec<f64>,
}

impl NormalNormal {
    pub fn new(prior_mean: f64, prior_sd: f64, likelihood_sd: f64, observed: &[f64]) -> Result<Self> {
        let prior = Normal::new(prior_mean, prior_sd).map_err(invalid)?;
        // Validates the likelihood scale once, up front.
        Normal::new(0.0, likelihood_sd).map_err(invalid)?;
        Ok(Self {
            prior,
            prior_mean,
            prior_sd,
            likelihood_sd,
            observed: observed.to_vec(),
        })
    }

    fn posterior_precision(&self) -> f64 {
        1.0 / self.prior_sd.powi(2) + self.observed.len() as f64 / self.likelihood_sd.powi(2)
    }
}

impl Target<f64> for NormalNormal {
    fn density(&self, mu: &f64) -> f64 {
        self.ln_density(mu).exp()
    }

    fn ln_density(&self, mu: &f64) -> f64 {
        let Ok(likelihood) = Normal::new(*mu, self.likelihood_sd) else {
            return f64::NEG_INFINITY;
        };
        self.observed
            .iter()
            .fold(self.prior.ln_pdf(*mu), |acc, y| acc + likelihood.ln_pdf(*y))
    }
}

impl AnalyticPosterior for NormalNormal {
    fn posterior_mean(&self) -> f64 {
        let weighted = self.prior_mean / self.prior_sd.powi(2)
            + self.observed.iter().sum::<f64>() / self.likelihood_sd.powi(2);
        weighted / self.posterior_precision()
    }

    fn posterior_sd(&self) -> f64 {
        self.posterior_precision().recip().sqrt()
    }
}

/// Success probability `p` of a binomial experiment under a beta prior.
#[derive(Debug, Clone)]
pub struct BetaBinomial {
    prior: Beta,
    alpha: f64,
    beta: f64,
    successes: u64,
    trials: u64,
}

impl BetaBinomial {
    pub fn new(alpha: f64, beta: f64, successes: u64, trials: u64) -> Result<Self> {
        if successes > trials {
            return Err(SamplerError::InvalidModel(format!(
                "{successes} successes out of {trials} trials"
            )));
        }
        let prior = Beta::new(alpha, beta).map_err(invalid)?;
        Ok(Self {
            prior,
            alpha,
            beta,
            successes,
            trials,
        })
    }

    fn posterior_shape(&self) -> (f64, f64) {
        (
            self.alpha + self.successes as f64,
            self.beta + (self.trials - self.successes) as f64,
        )
    }
}

impl Target<f64> for BetaBinomial {
    fn density(&self, p: &f64) -> f64 {
        self.ln_density(p).exp()
    }

    fn ln_density(&self, p: &f64) -> f64 {
        if !(0.0..=1.0).contains(p) {
            return f64::NEG_INFINITY;
        }
        match Binomial::new(*p, self.trials) {
            Ok(likelihood) => self.prior.ln_pdf(*p) + likelihood.ln_pmf(self.successes),
            Err(_) => f64::NEG_INFINITY,
        }
    }
}

impl AnalyticPosterior for BetaBinomial {
    fn posterior_mean(&self) -> f64 {
        let (a, b) = self.posterior_shape();
        a / (a + b)
    }

    fn posterior_sd(&self) -> f64 {
        let (a, b) = self.posterior_shape();
        (a * b / ((a + b).powi(2) * (a + b + 1.0))).sqrt()
    }
}

/// Rate `λ` of Poisson counts under a gamma prior (shape / rate parameterization).
#[derive(Debug, Clone)]
pub struct GammaPoisson {
    prior: Gamma,
    shape: f64,
    rate: f64,
    counts: Vec<u64>,
}

impl GammaPoisson {
    pub fn new(shape: f64, rate: f64, counts: &[u64]) -> Result<Self> {
        let prior = Gamma::new(shape, rate).map_err(invalid)?;
        Ok(Self {
            prior,
            shape,
            rate,
            counts: counts.to_vec(),
        })
    }

    fn posterior_shape_rate(&self) -> (f64, f64) {
        (
            self.shape + self.counts.iter().sum::<u64>() as f64,
            self.rate + self.counts.len() as f64,
        )
    }
}

impl Target<f64> for GammaPoisson {
    fn density(&self, lambda: &f64) -> f64 {
        self.ln_density(lambda).exp()
    }

    fn ln_density(&self, lambda: &f64) -> f64 {
        if *lambda <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let Ok(likelihood) = Poisson::new(*lambda) else {
            return f64::NEG_INFINITY;
        };
        self.counts
            .iter()
            .fold(self.prior.ln_pdf(*lambda), |acc, &k| acc + likelihood.ln_pmf(k))
    }
}

impl AnalyticPosterior for GammaPoisson {
    fn posterior_mean(&self) -> f64 {
        let (shape, rate) = self.posterior_shape_rate();
        shape / rate
    }

    fn posterior_sd(&self) -> f64 {
        let (shape, rate) = self.posterior_shape_rate();
        shape.sqrt() / rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_normal_matches_hand_computation() {
        let model = NormalNormal::new(0.0, 1.0, 0.75, &[6.25]).unwrap();
        let mu: f64 = 3.0;
        let prior = (-0.5 * mu * mu).exp() / (2.0 * std::f64::consts::PI).sqrt();
        let z = (6.25 - mu) / 0.75;
        let likelihood = (-0.5 * z * z).exp() / (0.75 * (2.0 * std::f64::consts::PI).sqrt());
        assert_abs_diff_eq!(model.density(&mu), prior * likelihood, epsilon = 1e-15);
    }

    #[test]
    fn normal_normal_with_several_observations() {
        let model = NormalNormal::new(1.0, 2.0, 1.0, &[2.0, 4.0]).unwrap();
        // precision 1/4 + 2 = 9/4, mean (1/4 + 6) / (9/4) = 25/9
        assert_abs_diff_eq!(model.posterior_mean(), 25.0 / 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.posterior_sd(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn beta_binomial_support_and_posterior() {
        let model = BetaBinomial::new(1.0, 1.0, 6, 9).unwrap();
        assert_eq!(model.density(&-0.1), 0.0);
        assert_eq!(model.density(&1.1), 0.0);
        assert!(model.density(&0.6) > model.density(&0.2));
        assert_abs_diff_eq!(model.posterior_mean(), 7.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            model.posterior_sd(),
            (28.0f64 / (121.0 * 12.0)).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn gamma_poisson_support_and_posterior() {
        let model = GammaPoisson::new(3.0, 1.0, &[2, 4, 3, 5, 1]).unwrap();
        assert_eq!(model.density(&0.0), 0.0);
        assert_eq!(model.density(&-2.0), 0.0);
        assert!(model.density(&3.0) > model.density(&8.0));
        assert_abs_diff_eq!(model.posterior_mean(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(model.posterior_sd(), 18f64.sqrt() / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn many_counts_keep_a_usable_log_density() {
        let model = GammaPoisson::new(3.0, 1.0, &[3; 600]).unwrap();
        assert_eq!(model.density(&model.posterior_mean()), 0.0);
        let at_mean = model.ln_density(&model.posterior_mean());
        assert!(at_mean.is_finite());
        assert!(at_mean > model.ln_density(&3.5));
        assert!(at_mean > model.ln_density(&2.5));
        assert_eq!(model.ln_density(&-1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn log_density_agrees_with_density_on_small_data() {
        let model = NormalNormal::new(0.0, 1.0, 0.75, &[6.25]).unwrap();
        for mu in [-1.0, 2.0, 4.0, 6.0] {
            assert_abs_diff_eq!(model.ln_density(&mu), model.density(&mu).ln(), epsilon = 1e-9);
        }
        let model = BetaBinomial::new(2.0, 2.0, 3, 10).unwrap();
        assert_eq!(model.ln_density(&1.5), f64::NEG_INFINITY);
        assert!(model.ln_density(&0.3) > model.ln_density(&0.9));
    }

    #[test]
    fn invalid_hyperparameters() {
        assert!(matches!(
            NormalNormal::new(0.0, -1.0, 1.0, &[]),
            Err(SamplerError::InvalidModel(_))
        ));
        assert!(NormalNormal::new(0.0, 1.0, 0.0, &[1.0]).is_err());
        assert!(BetaBinomial::new(1.0, 1.0, 10, 9).is_err());
        assert!(BetaBinomial::new(0.0, 1.0, 1, 9).is_err());
        assert!(GammaPoisson::new(-3.0, 1.0, &[1]).is_err());
    }
}
