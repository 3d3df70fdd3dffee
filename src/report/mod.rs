// src/report/mod.rs

use csv::{ReaderBuilder, WriterBuilder};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub const LOCAL_CURRENCY_COLUMN: &str = "local_currency";
pub const LOCAL_BUDGET_COLUMN: &str = "budget_local_currency";

/// Name of the budget column for a base currency, e.g. `budget_EUR`.
pub fn budget_column(base_currency: &str) -> String {
    format!("budget_{}", base_currency)
}

/// A delimited table held as plain strings so untouched cells are written
/// back exactly as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// One entry per data row, each as long as `headers`.
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a column at the right edge. `values` must have one cell per row.
    pub(crate) fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) {
        debug_assert_eq!(
            values.len(),
            self.rows.len(),
            "new column must have one value per row"
        );
        self.headers.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }
}

/// Read `path` into a `Report`, insisting every name in `required` is a
/// header exactly once. Other columns may repeat a name; they are passed
/// through as they are. Rows with a different field count than the header
/// are rejected.
#[tracing::instrument(level = "info", skip(path, required), fields(path = %path.as_ref().display()))]
pub fn load_report<P: AsRef<Path>>(path: P, delimiter: u8, required: &[&str]) -> Result<Report> {
    let path = path.as_ref();
    let input_err = |source: csv::Error| PipelineError::Input {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(input_err)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(input_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(headers.len());
    for h in &headers {
        *seen.entry(h.as_str()).or_default() += 1;
    }

    for &column in required {
        match seen.get(column).copied().unwrap_or(0) {
            0 => {
                return Err(PipelineError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
            }
            1 => {}
            _ => {
                return Err(PipelineError::DuplicateColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
            }
        }
    }
    if seen.contains_key(LOCAL_BUDGET_COLUMN) {
        return Err(PipelineError::DuplicateColumn {
            path: path.to_path_buf(),
            column: LOCAL_BUDGET_COLUMN.to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(input_err)?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed report");
    Ok(Report { headers, rows })
}

/// Write `report` to `path`. The table goes to a temporary file beside the
/// destination first and is renamed over it only once fully written.
pub fn write_report<P: AsRef<Path>>(
    report: &Report,
    path: P,
    delimiter: u8,
    write_row_index: bool,
) -> Result<()> {
    let path = path.as_ref();
    let output_err = |source: std::io::Error| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(output_err)?;

    {
        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(tmp.as_file_mut());

        if write_row_index {
            wtr.write_record(std::iter::once("").chain(report.headers.iter().map(String::as_str)))
                .map_err(|e| output_err(e.into()))?;
            for (i, row) in report.rows.iter().enumerate() {
                let idx = i.to_string();
                wtr.write_record(
                    std::iter::once(idx.as_str()).chain(row.iter().map(String::as_str)),
                )
                .map_err(|e| output_err(e.into()))?;
            }
        } else {
            wtr.write_record(&report.headers)
                .map_err(|e| output_err(e.into()))?;
            for row in &report.rows {
                wtr.write_record(row).map_err(|e| output_err(e.into()))?;
            }
        }
        wtr.flush().map_err(output_err)?;
    }
    tmp.as_file_mut().sync_all().map_err(output_err)?;

    // the temp file is created 0600; give the report the mode a plain write
    // would, or keep the one the previous output had
    let perms = match fs::metadata(path) {
        Ok(meta) => meta.permissions(),
        Err(_) => default_permissions(tmp.as_file()).map_err(output_err)?,
    };
    tmp.as_file().set_permissions(perms).map_err(output_err)?;

    tmp.persist(path).map_err(|e| output_err(e.error))?;
    info!(path = %path.display(), rows = report.len(), "wrote report");
    Ok(())
}

#[cfg(unix)]
fn default_permissions(_file: &fs::File) -> std::io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions(file: &fs::File) -> std::io::Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const REQUIRED: &[&str] = &["budget_EUR", "local_currency"];

    #[test]
    fn load_keeps_order_and_cells_verbatim() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(
            &input,
            "region,budget_EUR,local_currency,note\n\
             north,100,USD,\"a, quoted\"\n\
             south,50.50,XYZ,\n\
             east,007,JPY,x\n",
        )?;

        let report = load_report(&input, b',', REQUIRED)?;
        assert_eq!(
            report.headers,
            vec!["region", "budget_EUR", "local_currency", "note"]
        );
        assert_eq!(report.len(), 3);
        assert_eq!(report.rows[0], vec!["north", "100", "USD", "a, quoted"]);
        assert_eq!(report.rows[1][1], "50.50");
        assert_eq!(report.rows[2][1], "007");
        assert_eq!(report.column_index("local_currency"), Some(2));
        Ok(())
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = load_report("definitely/not/here.csv", b',', REQUIRED).unwrap_err();
        assert!(matches!(err, PipelineError::Input { .. }), "{:?}", err);
    }

    #[test]
    fn missing_required_column() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(&input, "budget_EUR,currency\n1,USD\n")?;

        match load_report(&input, b',', REQUIRED) {
            Err(PipelineError::MissingColumn { column, .. }) => assert_eq!(column, "local_currency"),
            other => panic!("expected missing column, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn ragged_row_is_input_error() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(&input, "budget_EUR,local_currency\n1,USD\n2,GBP,extra\n")?;

        let err = load_report(&input, b',', REQUIRED).unwrap_err();
        assert!(matches!(err, PipelineError::Input { .. }), "{:?}", err);
        Ok(())
    }

    #[test]
    fn derived_column_already_present_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(
            &input,
            "budget_EUR,local_currency,budget_local_currency\n1,USD,1.1\n",
        )?;

        let err = load_report(&input, b',', REQUIRED).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateColumn { .. }), "{:?}", err);
        Ok(())
    }

    #[test]
    fn repeated_passthrough_column_is_kept() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(
            &input,
            "note,budget_EUR,local_currency,note\na,1,USD,b\n",
        )?;

        let report = load_report(&input, b',', REQUIRED)?;
        assert_eq!(report.headers, vec!["note", "budget_EUR", "local_currency", "note"]);
        assert_eq!(report.rows[0], vec!["a", "1", "USD", "b"]);
        Ok(())
    }

    #[test]
    fn repeated_required_column_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(&input, "budget_EUR,local_currency,budget_EUR\n1,USD,2\n")?;

        match load_report(&input, b',', REQUIRED) {
            Err(PipelineError::DuplicateColumn { column, .. }) => assert_eq!(column, "budget_EUR"),
            other => panic!("expected duplicate column, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn semicolon_delimited() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(&input, "budget_EUR;local_currency\n1,5;CHF\n")?;

        let report = load_report(&input, b';', REQUIRED)?;
        assert_eq!(report.rows, vec![vec!["1,5".to_string(), "CHF".to_string()]]);
        Ok(())
    }

    #[test]
    fn write_round_trips_and_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("out.csv");
        fs::write(&output, "stale contents that must disappear\n")?;

        let mut report = Report {
            headers: vec!["budget_EUR".into(), "local_currency".into()],
            rows: vec![
                vec!["100".into(), "USD".into()],
                vec!["50".into(), "XYZ".into()],
            ],
        };
        report.push_column(LOCAL_BUDGET_COLUMN, vec!["110.0".into(), String::new()]);
        write_report(&report, &output, b',', false)?;

        assert_eq!(
            fs::read_to_string(&output)?,
            "budget_EUR,local_currency,budget_local_currency\n100,USD,110.0\n50,XYZ,\n"
        );
        Ok(())
    }

    #[test]
    fn write_with_row_index() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("out.csv");
        let report = Report {
            headers: vec!["budget_EUR".into(), "local_currency".into()],
            rows: vec![
                vec!["1".into(), "USD".into()],
                vec!["2".into(), "GBP".into()],
            ],
        };
        write_report(&report, &output, b',', true)?;

        assert_eq!(
            fs::read_to_string(&output)?,
            ",budget_EUR,local_currency\n0,1,USD\n1,2,GBP\n"
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn output_is_world_readable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let output = dir.path().join("out.csv");
        let report = Report {
            headers: vec!["budget_EUR".into(), "local_currency".into()],
            rows: vec![vec!["1".into(), "USD".into()]],
        };

        write_report(&report, &output, b',', false)?;
        assert_eq!(fs::metadata(&output)?.permissions().mode() & 0o777, 0o644);

        // a rerun keeps whatever mode the previous output had
        fs::set_permissions(&output, fs::Permissions::from_mode(0o640))?;
        write_report(&report, &output, b',', false)?;
        assert_eq!(fs::metadata(&output)?.permissions().mode() & 0o777, 0o640);
        Ok(())
    }

    #[test]
    fn unwritable_destination_is_output_error() -> Result<()> {
        let dir = tempdir()?;
        let output = dir.path().join("no_such_dir").join("out.csv");
        let report = Report {
            headers: vec!["a".into()],
            rows: vec![],
        };

        let err = write_report(&report, &output, b',', false).unwrap_err();
        assert!(matches!(err, PipelineError::Output { .. }), "{:?}", err);
        assert!(!output.exists());
        Ok(())
    }
}
