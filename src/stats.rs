//! Summaries and diagnostics for completed chains.

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;

use crate::core::Chain;
use crate::distributions::State;
use crate::error::{Result, SamplerError};

/// Mean and sample standard deviation of the retained part of a chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    /// Sample standard deviation (`ddof = 1`); zero when only one state is retained.
    pub std_dev: f64,
    /// Number of states left after burn-in and thinning.
    pub n: usize,
}

/// Drops `burn_in` leading states and keeps every `thin`-th of the rest,
/// starting with the first one after burn-in.
pub fn retain(chain: &[f64], burn_in: usize, thin: usize) -> Result<Array1<f64>> {
    if thin == 0 {
        return Err(SamplerError::InvalidThin(thin));
    }
    let kept: Array1<f64> = chain.iter().skip(burn_in).step_by(thin).copied().collect();
    if kept.is_empty() {
        return Err(SamplerError::EmptySummary {
            len: chain.len(),
            burn_in,
        });
    }
    Ok(kept)
}

/// Like [`retain`] for multi-coordinate states: one row per kept state, one column
/// per coordinate. Every kept state must have the same number of coordinates.
pub fn retain_coords<S: State>(chain: &[S], burn_in: usize, thin: usize) -> Result<Array2<f64>> {
    if thin == 0 {
        return Err(SamplerError::InvalidThin(thin));
    }
    let kept: Vec<&S> = chain.iter().skip(burn_in).step_by(thin).collect();
    let Some(first) = kept.first() else {
        return Err(SamplerError::EmptySummary {
            len: chain.len(),
            burn_in,
        });
    };
    let dim = first.coords().len();
    let mut flat = Vec::with_capacity(kept.len() * dim);
    for state in &kept {
        let coords = state.coords();
        if coords.len() != dim {
            return Err(SamplerError::DimensionMismatch {
                expected: dim,
                found: coords.len(),
            });
        }
        flat.extend_from_slice(coords);
    }
    Array2::from_shape_vec((kept.len(), dim), flat).map_err(|_| SamplerError::DimensionMismatch {
        expected: dim,
        found: dim,
    })
}

fn summary_of(kept: ArrayView1<f64>) -> Summary {
    let n = kept.len();
    let mean = kept.sum() / n as f64;
    let ddof = if n > 1 { 1.0 } else { 0.0 };
    Summary {
        mean,
        std_dev: kept.std(ddof),
        n,
    }
}

/**
Summarizes a chain after discarding `burn_in` warm-up states and thinning by `thin`.

```rust
use mini_metropolis::stats::summarize;

let s = summarize(&[100.0, 1.0, 2.0, 3.0, 4.0, 5.0], 1, 2).unwrap();
assert_eq!(s.n, 3);
assert_eq!(s.mean, 3.0);
assert_eq!(s.std_dev, 2.0);
```
*/
pub fn summarize(chain: &[f64], burn_in: usize, thin: usize) -> Result<Summary> {
    retain(chain, burn_in, thin).map(|kept| summary_of(kept.view()))
}

/**
Summarizes every coordinate of a multi-coordinate chain separately.

```rust
use mini_metropolis::stats::summarize_coords;

let chain = [[0.0f64, 10.0], [1.0, 20.0], [2.0, 30.0]];
let per_coord = summarize_coords(&chain, 0, 1).unwrap();
assert_eq!(per_coord.len(), 2);
assert_eq!(per_coord[0].mean, 1.0);
assert_eq!(per_coord[1].mean, 20.0);
```
*/
pub fn summarize_coords<S: State>(chain: &[S], burn_in: usize, thin: usize) -> Result<Vec<Summary>> {
    let kept = retain_coords(chain, burn_in, thin)?;
    Ok(kept.columns().into_iter().map(summary_of).collect())
}

/// Summary of a chain plus the acceptance rate of the raw, untrimmed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub mean: f64,
    pub std_dev: f64,
    pub acceptance_rate: f64,
    pub n_retained: usize,
    pub min: f64,
    pub max: f64,
}

impl Diagnostics {
    pub fn from_chain(chain: &Chain<f64>, burn_in: usize, thin: usize) -> Result<Self> {
        let kept = retain(chain.states(), burn_in, thin)?;
        Ok(Self::of(kept.view(), chain.acceptance_rate()))
    }

    /// One [`Diagnostics`] per coordinate of a multi-coordinate chain.
    ///
    /// The acceptance rate is shared: a move changes every coordinate at once.
    pub fn per_coordinate<S: State>(
        chain: &Chain<S>,
        burn_in: usize,
        thin: usize,
    ) -> Result<Vec<Self>> {
        let kept = retain_coords(chain.states(), burn_in, thin)?;
        let rate = chain.acceptance_rate();
        Ok(kept.columns().into_iter().map(|col| Self::of(col, rate)).collect())
    }

    fn of(kept: ArrayView1<f64>, acceptance_rate: f64) -> Self {
        let summary = summary_of(kept);
        Self {
            mean: summary.mean,
            std_dev: summary.std_dev,
            acceptance_rate,
            n_retained: summary.n,
            min: *kept.min_skipnan(),
            max: *kept.max_skipnan(),
        }
    }
}

/// The `q`-quantile of `samples`, linearly interpolated between order statistics.
pub fn quantile(samples: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(SamplerError::InvalidQuantile(q));
    }
    if samples.is_empty() {
        return Err(SamplerError::EmptySummary { len: 0, burn_in: 0 });
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let h = q * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Ok(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Equal-tailed interval holding `mass` of the samples, e.g. `0.89` or `0.95`.
pub fn credible_interval(samples: &[f64], mass: f64) -> Result<(f64, f64)> {
    if !(0.0..=1.0).contains(&mass) {
        return Err(SamplerError::InvalidQuantile(mass));
    }
    let tail = (1.0 - mass) / 2.0;
    Ok((quantile(samples, tail)?, quantile(samples, 1.0 - tail)?))
}

/// Lag-`lag` autocorrelation of `samples`.
///
/// A constant sequence is perfectly correlated with itself and yields `1.0`.
/// Lags at or beyond the sequence length yield `0.0`.
pub fn autocorrelation(samples: &[f64], lag: usize) -> f64 {
    Autocovariance::new(samples).correlation(lag)
}

/// A mean-centred copy of a sequence and its lag-0 autocovariance, shared across lags.
struct Autocovariance {
    centered: Array1<f64>,
    c0: f64,
}

impl Autocovariance {
    fn new(samples: &[f64]) -> Self {
        let x = ArrayView1::from(samples);
        let mean = if samples.is_empty() {
            0.0
        } else {
            x.sum() / samples.len() as f64
        };
        let centered = &x - mean;
        let c0 = centered.dot(&centered);
        Self { centered, c0 }
    }

    fn correlation(&self, lag: usize) -> f64 {
        let n = self.centered.len();
        if lag >= n {
            return 0.0;
        }
        if self.c0 == 0.0 {
            return 1.0;
        }
        let ck = self
            .centered
            .slice(s![..n - lag])
            .dot(&self.centered.slice(s![lag..]));
        ck / self.c0
    }
}

/// Effective number of independent draws in `samples`.
///
/// Uses Geyer's initial positive sequence: autocorrelations are summed in adjacent
/// pairs until a pair sum turns non-positive.
pub fn effective_sample_size(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return n as f64;
    }
    let acov = Autocovariance::new(samples);
    // A constant chain is one draw repeated.
    if acov.c0 == 0.0 {
        return 1.0;
    }
    let mut tau = -1.0;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = acov.correlation(lag) + acov.correlation(lag + 1);
        if pair <= 0.0 {
            break;
        }
        tau += 2.0 * pair;
        lag += 2;
    }
    n as f64 / tau.max(1.0 / n as f64)
}

/**
Potential scale reduction factor (Gelman–Rubin R-hat) across independent chains.

All chains must have the same length of at least two, and there must be at least two
chains. Values close to 1 indicate the chains agree.

```rust
use mini_metropolis::stats::rhat;

let a = [0.0, 1.0];
let b = [1.0, 1.0];
let c = [0.0, 0.0];
let r = rhat(&[&a[..], &b[..], &c[..]]).unwrap();
assert!((r - 2f64.sqrt()).abs() < 1e-12);
```
*/
pub fn rhat(chains: &[&[f64]]) -> Result<f64> {
    let lengths: Vec<usize> = chains.iter().map(|c| c.len()).collect();
    let m = chains.len();
    let n = lengths.first().copied().unwrap_or(0);
    if m < 2 || n < 2 || lengths.iter().any(|&len| len != n) {
        return Err(SamplerError::MismatchedChains(lengths));
    }

    let flat: Vec<f64> = chains.iter().flat_map(|c| c.iter().copied()).collect();
    let draws = Array2::from_shape_vec((m, n), flat)
        .map_err(|_| SamplerError::MismatchedChains(lengths.clone()))?;

    let n_f = n as f64;
    let chain_means = draws.sum_axis(Axis(1)) / n_f;
    let grand_mean = chain_means.sum() / m as f64;
    let between = (&chain_means - grand_mean).mapv(|d| d * d).sum() * n_f / (m as f64 - 1.0);
    let within = draws.var_axis(Axis(1), 1.0).sum() / m as f64;

    if within == 0.0 {
        return Ok(if between == 0.0 { 1.0 } else { f64::INFINITY });
    }
    let var = within * (n_f - 1.0) / n_f + between / n_f;
    Ok((var / within).sqrt())
}
