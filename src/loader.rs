//! Reading roll-call tables from spreadsheets and CSV files.
//!
//! Both formats are first flattened into a [`Table`] of strings, then
//! mapped to [`VoteRecord`]s by header name.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::VoteRecord;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Header row plus string cells, independent of the source format
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Position of a header, ignoring surrounding whitespace
    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn required_column(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }
}

/// Load vote records from a `.csv` or spreadsheet file
pub fn load_votes<P: AsRef<Path>>(path: P, config: &Config) -> Result<Vec<VoteRecord>> {
    let path = path.as_ref();
    let table = read_table(path)?;
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.headers.len(),
        "Loaded roll-call table"
    );
    records_from_table(&table, config)
}

/// Read a table, choosing the parser from the file extension
pub fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)?;
            read_csv(file)
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_spreadsheet(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "{} (expected .csv, .xlsx, .xls or .ods)",
            path.display()
        ))),
    }
}

/// Read CSV with a header row
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()?
        .iter()
        .map(clean_header)
        .collect::<Vec<_>>();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|s| s.trim().to_string()).collect());
    }

    Ok(Table { headers, rows })
}

/// Read the first worksheet of a workbook; its first row is the header
pub fn read_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::EmptyData(format!("{} has no worksheets", path.display())))??;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|c| clean_header(&cell_to_string(c)))
            .collect(),
        None => return Ok(Table::default()),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .collect();

    Ok(Table { headers, rows })
}

/// Render a cell as text. Whole floats lose their `.0`, so bill numbers
/// stored as numbers read the same as in CSV exports.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Map table rows to vote records using the configured header names
pub fn records_from_table(table: &Table, config: &Config) -> Result<Vec<VoteRecord>> {
    let cols = &config.columns;
    let agenda_idx = table.required_column(&cols.agenda_id)?;
    let member_idx = table.required_column(&cols.member)?;
    let party_idx = table.required_column(&cols.party)?;
    let result_idx = table.required_column(&cols.result)?;
    let name_idx = table.column(&cols.agenda_name);
    let url_idx = table.column(&cols.agenda_url);

    let cell = |row: &Vec<String>, idx: usize| -> String {
        row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
    };
    let optional = |row: &Vec<String>, idx: Option<usize>| -> Option<String> {
        idx.map(|i| cell(row, i)).filter(|s| !s.is_empty())
    };

    let mut records = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;

    for (row_num, row) in table.rows.iter().enumerate() {
        let agenda_id = cell(row, agenda_idx);
        let member = cell(row, member_idx);
        if agenda_id.is_empty() || member.is_empty() {
            debug!(row = row_num + 2, "Skipping row without agenda id or member");
            skipped += 1;
            continue;
        }

        let party = match cell(row, party_idx) {
            p if p.is_empty() => config.default_party.clone(),
            p => p,
        };

        records.push(VoteRecord {
            agenda_id,
            agenda_name: optional(row, name_idx),
            agenda_url: optional(row, url_idx),
            member,
            party,
            choice: config.vote_labels.classify(&cell(row, result_idx)),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped rows missing an agenda id or member name");
    }

    Ok(records)
}
