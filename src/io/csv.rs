/*!
# Saving chains to CSV

Enable via the `csv` feature (on by default).
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::chain::Chain;
use crate::error::{Error, Result};

/**
Saves chains as a CSV file.

The file has a header row `chain,sample,<name_0>,<name_1>,...` followed by one
row per sample of every chain, chain by chain. Column names default to `dim_i`
when `names` is `None`.

# Examples

```rust
use mhfit::io::csv::save_chains;
use mhfit::walker::run;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let cost = |p: &[f64], _: &()| p[0] * p[0];
let chain = run(&[0.0], &[1.0], 10, &cost, &(), &mut SmallRng::seed_from_u64(1))?;
save_chains(&[chain], None, "/tmp/chain.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_chains<P: AsRef<Path>>(
    chains: &[Chain],
    names: Option<&[String]>,
    path: P,
) -> Result<()> {
    let n_params = chains.first().map_or(0, Chain::n_params);
    if let Some(bad) = chains.iter().find(|c| c.n_params() != n_params) {
        return Err(Error::InvalidArgument(format!(
            "chains differ in dimension: {} and {}",
            n_params,
            bad.n_params()
        )));
    }

    let mut header: Vec<String> = vec!["chain".to_string(), "sample".to_string()];
    match names {
        Some(names) if names.len() == n_params => header.extend(names.iter().cloned()),
        Some(names) => {
            return Err(Error::InvalidArgument(format!(
                "{} column names given for {} parameters",
                names.len(),
                n_params
            )))
        }
        None => header.extend((0..n_params).map(|i| format!("dim_{i}"))),
    }

    let mut wtr = Writer::from_writer(File::create(path)?);
    wtr.write_record(&header)?;

    for (chain_idx, chain) in chains.iter().enumerate() {
        for (sample_idx, sample) in chain.samples().rows().into_iter().enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(sample.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::Reader;
    use ndarray::array;
    use std::fs;
    use tempfile::NamedTempFile;

    /// Test saving no chains at all.
    #[test]
    fn test_save_no_chains() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_chains(&[], None, file.path()).unwrap();
        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents.trim(), "chain,sample");
    }

    /// Test multiple chains with named columns.
    #[test]
    fn test_save_multi_chain_named() {
        let chains = [
            Chain::from_parts(array![[1.0, 2.0], [3.0, 4.0]], 1),
            Chain::from_parts(array![[10.0, 20.0], [30.5, 40.0]], 1),
        ];
        let names = ["a".to_string(), "b".to_string()];
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_chains(&chains, Some(&names[..]), file.path()).unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        let expected = "\
chain,sample,a,b
0,0,1,2
0,1,3,4
1,0,10,20
1,1,30.5,40";
        assert_eq!(contents.trim(), expected);

        let mut rdr = Reader::from_path(file.path()).unwrap();
        let records: Vec<_> = rdr.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_rejects_mismatched_shapes() {
        let file = NamedTempFile::new().expect("Could not create temp file");
        let chains = [
            Chain::from_parts(array![[1.0, 2.0]], 0),
            Chain::from_parts(array![[1.0]], 0),
        ];
        assert!(save_chains(&chains, None, file.path()).is_err());
        let names = ["only".to_string()];
        assert!(save_chains(&chains[..1], Some(&names[..]), file.path()).is_err());
    }
}
