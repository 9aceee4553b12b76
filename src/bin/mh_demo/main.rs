use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use mini_metropolis::config::SamplerConfig;
use mini_metropolis::core::ChainRunner;
use mini_metropolis::distributions::{ProposalKind, Target};
use mini_metropolis::models::{AnalyticPosterior, BetaBinomial, GammaPoisson, NormalNormal};
use mini_metropolis::stats::{credible_interval, effective_sample_size, retain, rhat, Diagnostics};

mod cli;

use cli::{Cli, LogLevel, Model, ProposalArg};

fn main() -> Result<()> {
    let args = Cli::parse();
    let filter = match args.verbosity {
        LogLevel::Silent => "off",
        LogLevel::Normal => "info",
        LogLevel::Verbose => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    match args.model {
        Model::Normal => run_model(NormalNormal::new(0.0, 1.0, 0.75, &[6.25])?, 4.0, 1.0, &args),
        Model::BetaBinomial => run_model(BetaBinomial::new(1.0, 1.0, 6, 9)?, 0.5, 0.2, &args),
        Model::GammaPoisson => {
            run_model(GammaPoisson::new(3.0, 1.0, &[2, 4, 3, 5, 1])?, 1.0, 1.0, &args)
        }
    }
}

fn run_model<M>(model: M, default_start: f64, default_bandwidth: f64, args: &Cli) -> Result<()>
where
    M: Target<f64> + AnalyticPosterior + Clone + Send,
{
    let proposal = match args.proposal {
        ProposalArg::Uniform => ProposalKind::Uniform,
        ProposalArg::Gaussian => ProposalKind::Gaussian,
    };
    let mut config = SamplerConfig::new(
        args.start.unwrap_or(default_start),
        args.bandwidth.unwrap_or(default_bandwidth),
        args.iterations,
    )
    .with_proposal(proposal);
    if let Some(seed) = args.seed {
        config = config.set_seed(seed);
    }
    info!("Running {} chain(s) of {:?} with {:?}", args.chains, args.model, config);

    let mut sampler = config.sampler(model.clone(), args.chains)?;
    let chains = if args.progress {
        sampler.run_with_progress(config.iterations)?
    } else {
        sampler.run(config.iterations)?
    };

    let mut kept = Vec::with_capacity(chains.len());
    for (i, chain) in chains.iter().enumerate() {
        let diag = Diagnostics::from_chain(chain, args.burn_in, args.thin)?;
        let retained = retain(chain.states(), args.burn_in, args.thin)?.to_vec();
        let (lo, hi) = credible_interval(&retained, 0.89)?;
        println!(
            "chain {i}: mean {:.4}  sd {:.4}  89% [{:.4}, {:.4}]  accept {:.3}  ess {:.0}  n {}",
            diag.mean,
            diag.std_dev,
            lo,
            hi,
            diag.acceptance_rate,
            effective_sample_size(&retained),
            diag.n_retained
        );
        kept.push(retained);
    }

    if kept.len() > 1 {
        let views: Vec<&[f64]> = kept.iter().map(|c| c.as_slice()).collect();
        println!("R-hat: {:.4}", rhat(&views)?);
    }
    println!(
        "exact posterior: mean {:.4}  sd {:.4}",
        model.posterior_mean(),
        model.posterior_sd()
    );

    #[cfg(feature = "csv")]
    {
        if let Some(path) = &args.csv {
            mini_metropolis::io::save_chains_csv(&chains, path)?;
            info!("Saved chains to {}", path.display());
        }
    }

    Ok(())
}
