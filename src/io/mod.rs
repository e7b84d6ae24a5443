/*!
# Reading observations and writing chains

Observations come as a plain-text table with three rows: x values, y values and
y uncertainties, aligned by column. Values are separated by commas, tabs or
spaces, picked from the first data line; blank lines and lines starting with
`#` are skipped. This is the layout
written by `numpy.savetxt` for a `(3, n)` array.

```text
# x, y, err
0.0  0.1  0.2  0.3
1.2  1.9  2.4  2.1
0.1  0.1  0.2  0.1
```

Both directions go through the `csv` crate, so the whole module sits behind
the `csv` feature (on by default). Chains are written by [`csv::save_chains`].
*/

pub mod csv;

use std::fs;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, Trim};

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Reads a three-row data file into a [`Dataset`].
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let text = fs::read_to_string(path)?;
    parse_dataset(&text)
}

/// Commas if the first data line has any, else tabs, else spaces.
fn detect_delimiter(text: &str) -> u8 {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or_default();
    if first.contains(',') {
        b','
    } else if first.contains('\t') {
        b'\t'
    } else {
        b' '
    }
}

/// Parses the non-empty fields of one record. Runs of delimiters leave empty
/// fields behind, which are skipped.
fn parse_record(record: &StringRecord) -> Result<Vec<f64>> {
    let line = record.position().map_or(0, |p| p.line() as usize);
    record
        .iter()
        .filter(|field| !field.is_empty())
        .enumerate()
        .map(|(col_idx, field)| {
            field.parse::<f64>().map_err(|_| Error::Parse {
                line,
                column: col_idx + 1,
                token: field.to_string(),
            })
        })
        .collect()
}

/// Parses the three-row layout described in the [module docs](self).
pub fn parse_dataset(text: &str) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(detect_delimiter(text))
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(3);
    for record in rdr.records() {
        let row = parse_record(&record?)?;
        if !row.is_empty() {
            rows.push(row);
        }
    }

    if rows.len() != 3 {
        return Err(Error::InvalidDataset(format!(
            "expected 3 rows (x, y, err), found {}",
            rows.len()
        )));
    }
    let err = rows.pop().unwrap_or_default();
    let y = rows.pop().unwrap_or_default();
    let x = rows.pop().unwrap_or_default();
    Dataset::new(x, y, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_padded_commas() {
        let text = "# header\n\n0, 1, 2\n1.5,\t2.5 , 3.5\n0.1,0.2,0.3\n";
        let data = parse_dataset(text).unwrap();
        assert_eq!(data.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(data.y(), &[1.5, 2.5, 3.5]);
        assert_eq!(data.err(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn handles_runs_of_spaces_and_tabs() {
        let text = "  0.0    1.0   2.0\n1.0 1.5     2.0  \n\n0.1  0.1 0.1\n";
        let data = parse_dataset(text).unwrap();
        assert_eq!(data.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(data.y(), &[1.0, 1.5, 2.0]);

        let data = parse_dataset("0\t1\n2\t3\n0.5\t0.5\n").unwrap();
        assert_eq!(data.y(), &[2.0, 3.0]);
    }

    #[test]
    fn parses_scientific_notation() {
        let text = "1.000000000000000000e+00 2.0e+00\n-3.5e-01 4e0\n1e-2 1E-2\n";
        let data = parse_dataset(text).unwrap();
        assert_eq!(data.x(), &[1.0, 2.0]);
        assert_eq!(data.y(), &[-0.35, 4.0]);
    }

    #[test]
    fn reports_bad_tokens_with_position() {
        let err = parse_dataset("1 2 3\n4 five 6\n1 1 1\n").unwrap_err();
        match err {
            Error::Parse {
                line,
                column,
                token,
            } => {
                assert_eq!((line, column), (2, 2));
                assert_eq!(token, "five");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn requires_three_rows() {
        assert!(matches!(
            parse_dataset("1 2\n3 4\n"),
            Err(Error::InvalidDataset(_))
        ));
        assert!(matches!(
            parse_dataset("1\n2\n3\n4\n"),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn rejects_ragged_rows_and_bad_errors() {
        assert!(matches!(
            parse_dataset("1 2 3\n1 2\n1 1 1\n"),
            Err(Error::InvalidDataset(_))
        ));
        assert!(matches!(
            parse_dataset("1 2\n1 2\n1 0\n"),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        writeln!(file, "0.0 0.5 1.0\n2.0 2.5 3.0\n0.1 0.1 0.1").unwrap();
        let data = load_dataset(file.path()).unwrap();
        assert_eq!(data.len(), 3);
        assert!(matches!(
            load_dataset("/definitely/not/here.txt"),
            Err(Error::Io(_))
        ));
    }
}
