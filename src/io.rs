/*!
# Saving Chains to CSV

Writes sampled chains to CSV so they can be plotted or summarized elsewhere.
Enable via the `csv` feature.

Scalar chains get a single `value` column. Multi-coordinate chains get one column per
coordinate, named `dim_0`, `dim_1`, etc. All states must have the same number of
coordinates; a ragged chain fails with a CSV error.
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::core::Chain;
use crate::distributions::State;
use crate::error::Result;

fn value_columns(n_dims: usize) -> Vec<String> {
    if n_dims == 1 {
        vec!["value".to_string()]
    } else {
        (0..n_dims).map(|i| format!("dim_{}", i)).collect()
    }
}

fn dims_of<'a, S: State + 'a>(mut states: impl Iterator<Item = &'a S>) -> usize {
    states.next().map_or(1, |s| s.coords().len())
}

/**
Saves a single chain as a CSV file with the header `sample,value` (scalar states) or
`sample,dim_0,dim_1,...` (multi-coordinate states).

# Examples

```rust
use mini_metropolis::io::save_chain_csv;
use mini_metropolis::metropolis_hastings::run_chain;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(0);
let chain = run_chain(0.0, 1.0, |x: &f64| (-x * x).exp(), 10, &mut rng).unwrap();
let path = std::env::temp_dir().join("mini_metropolis_chain.csv");
save_chain_csv(&chain, &path).expect("Expecting saving the chain to succeed");
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_chain_csv<S: State, P: AsRef<Path>>(chain: &Chain<S>, filename: P) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    let mut header = vec!["sample".to_string()];
    header.extend(value_columns(dims_of(chain.states().iter())));
    wtr.write_record(&header)?;

    for (sample_idx, state) in chain.states().iter().enumerate() {
        let mut row = vec![sample_idx.to_string()];
        row.extend(state.coords().iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Saves several chains to one CSV file with the header `chain,sample,value`
/// (or `chain,sample,dim_0,...` for multi-coordinate states).
pub fn save_chains_csv<S: State, P: AsRef<Path>>(chains: &[Chain<S>], filename: P) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    let mut header = vec!["chain".to_string(), "sample".to_string()];
    header.extend(value_columns(dims_of(
        chains.iter().flat_map(|c| c.states().iter()),
    )));
    wtr.write_record(&header)?;

    for (chain_idx, chain) in chains.iter().enumerate() {
        for (sample_idx, state) in chain.states().iter().enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(state.coords().iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}
