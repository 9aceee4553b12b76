use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mini_metropolis::config::SamplerConfig;
use mini_metropolis::core::ChainRunner;
use mini_metropolis::metropolis_hastings::run_chain;
use mini_metropolis::models::NormalNormal;
use mini_metropolis::stats::effective_sample_size;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn bench_single_chain(c: &mut Criterion) {
    let model = NormalNormal::new(0.0, 1.0, 0.75, &[6.25]).expect("valid model");
    c.bench_function("normal_normal_10k", |b| {
        b.iter(|| {
            let mut rng = SmallRng::seed_from_u64(42);
            let target = |mu: &f64| mini_metropolis::distributions::Target::density(&model, mu);
            black_box(run_chain(4.0, 1.0, target, 10_000, &mut rng).expect("chain"))
        })
    });
}

fn bench_parallel_chains(c: &mut Criterion) {
    let model = NormalNormal::new(0.0, 1.0, 0.75, &[6.25]).expect("valid model");
    let config = SamplerConfig::new(4.0, 1.0, 10_000).set_seed(42);
    c.bench_function("normal_normal_4x10k", |b| {
        b.iter(|| {
            let mut sampler = config.sampler(model.clone(), 4).expect("sampler");
            black_box(sampler.run(config.iterations).expect("chains"))
        })
    });
}

fn bench_ess(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let chain = run_chain(0.0, 1.0, |x: &f64| (-0.5 * x * x).exp(), 10_000, &mut rng)
        .expect("chain");
    c.bench_function("ess_10k", |b| {
        b.iter(|| black_box(effective_sample_size(chain.states())))
    });
}

criterion_group!(benches, bench_single_chain, bench_parallel_chains, bench_ess);
criterion_main!(benches);
