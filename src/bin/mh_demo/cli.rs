use clap::{Parser, ValueEnum};

/// Runs Metropolis-Hastings chains against a conjugate teaching model and
/// compares the result with the exact posterior.
#[derive(Parser, Debug)]
#[command(name = "mh-demo", version, about = "Metropolis-Hastings on conjugate models")]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = Model::Normal, help = "Model to sample")]
    pub model: Model,

    #[arg(long, help = "Starting state (defaults to a model-specific value)")]
    pub start: Option<f64>,

    #[arg(
        long,
        help = "Proposal window half-width or standard deviation (defaults per model)"
    )]
    pub bandwidth: Option<f64>,

    #[arg(long, value_enum, default_value_t = ProposalArg::Uniform)]
    pub proposal: ProposalArg,

    #[arg(long, short, default_value = "10000", help = "Iterations per chain")]
    pub iterations: usize,

    #[arg(long, default_value = "1000", help = "Leading samples to discard")]
    pub burn_in: usize,

    #[arg(long, default_value = "1", help = "Keep every k-th sample")]
    pub thin: usize,

    #[arg(long, short, default_value = "4", help = "Number of independent chains")]
    pub chains: usize,

    #[arg(long, help = "Global seed; chain i uses seed + i")]
    pub seed: Option<u64>,

    #[arg(long, help = "Show one progress bar per chain")]
    pub progress: bool,

    #[cfg(feature = "csv")]
    #[arg(long, value_name = "PATH", help = "Write all chains to this CSV file")]
    pub csv: Option<std::path::PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Normal)]
    pub verbosity: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Model {
    /// Normal prior on the mean of one normal observation (y = 6.25).
    Normal,
    /// Beta(1, 1) prior on a proportion; 6 successes in 9 trials.
    BetaBinomial,
    /// Gamma(3, 1) prior on a Poisson rate; counts 2, 4, 3, 5, 1.
    GammaPoisson,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProposalArg {
    Uniform,
    Gaussian,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Silent,
    Normal,
    Verbose,
}
