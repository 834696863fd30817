//! Helpers for reading ubank CSV exports and writing per-account OFX files

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use csv::Trim;
use log::{info, warn};

use crate::errors::Error;
use crate::ofx::{Mapping, OfxStatement};
use crate::ops;
use crate::types::{Ledger, Row, Timespan};

/// Stem shared by every output file name
const FILE_STEM: &str = "ubank_data";

/// Loads rows from a CSV-formatted stream.
///
/// The first record must be the header row; cells are matched to [`Row`]
/// fields by column name, so column order does not matter and extra
/// columns are ignored. A record missing an expected column is an error.
///
/// Expects input data in this format (including header):
/// ```csv
/// Date and time,Debit,Credit,Payment type,From account,To account,Description,Category,Transaction ID,Receipt number
/// 15-03-23 10:00,"$1,234.56",,Purchase,Spend account,,Shop,Groceries,T1,
/// 16-03-23 09:30,,$50.00,Internal Transfer,Spend account,Save account,Transfer,,T2,R9
/// ```
/// # Errors
/// [`Error::Load`] on any read or deserialization failure
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Row>, Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in csv_reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

/// Opens `path` and loads its rows; see [`read_rows`].
/// # Errors
/// [`Error::Io`] if the file cannot be opened, [`Error::Load`] past that
pub fn read_rows_from_path(path: &Path) -> Result<Vec<Row>, Error> {
    let file = File::open(path)?;
    read_rows(file)
}

/// Computes the output path for one account's statement.
///
/// Names follow `ubank_data_<account>_<start>_<end>.ofx` with the batch
/// span dates formatted `%Y-%m-%d`.
/// # Errors
/// [`Error::PathEscape`] if the account identifier would place the file
/// anywhere but directly inside `dir`
pub fn output_path(dir: &Path, account: &str, span: Timespan) -> Result<PathBuf, Error> {
    let name = format!(
        "{FILE_STEM}_{account}_{start}_{end}.ofx",
        start = span.start().format("%Y-%m-%d"),
        end = span.end().format("%Y-%m-%d"),
    );
    let path = dir.join(&name);
    // The file name must stay a single normal path component; separators
    // or parent components smuggled in through the account identifier
    // would resolve outside `dir`.
    let mut components = Path::new(&name).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal || path.parent() != Some(dir) {
        return Err(Error::PathEscape {
            account: account.to_string(),
            path,
        });
    }
    Ok(path)
}

/// Writes one statement to `path`.
///
/// The file handle lives only for this call: created, buffered, flushed,
/// closed on return.
/// # Errors
/// [`Error::Io`] on create, write or flush failure
pub fn write_statement(path: &Path, statement: &OfxStatement) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    statement.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Converts a full batch: computes the global timespan, partitions `rows`
/// by account and writes one OFX file per account into `dir`, creating
/// the directory if needed.
///
/// An account whose computed path fails the containment check is skipped
/// with a warning; the rest of the batch still converts. An empty batch
/// writes nothing and succeeds. Returns the paths written, in bucket
/// order.
/// # Errors
/// Fails fast on any malformed row or filesystem error other than the
/// per-file containment skip.
pub fn export(
    rows: Vec<Row>,
    dir: &Path,
    mapping: &Mapping,
    dtserver: NaiveDateTime,
) -> Result<Vec<PathBuf>, Error> {
    let Some(span) = ops::timespan(&rows)? else {
        return Ok(Vec::new());
    };
    fs::create_dir_all(dir)?;
    let ledger = Ledger::partition(rows);
    let mut written = Vec::new();
    for (account, bucket) in ledger.iter() {
        let Some(statement) = OfxStatement::build(account, bucket, mapping, dtserver)? else {
            continue;
        };
        let path = match output_path(dir, account, span) {
            Ok(path) => path,
            Err(err) => {
                warn!("skipping account {account:?}: {err}");
                continue;
            }
        };
        write_statement(&path, &statement)?;
        info!(
            "wrote {} transaction(s) for {account:?} to {}",
            statement.txn_count(),
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}
