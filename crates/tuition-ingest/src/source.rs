//! Raw record parsing: CSV exports into header-keyed records.
//!
//! Workbook exports often start with an empty row above the header, carry a
//! byte-order mark, and have ragged rows. Cells are trimmed and classified
//! but otherwise left untouched; interpretation happens in
//! [`candidate`](crate::candidate).

use std::{collections::BTreeMap, fs::File, io, path::Path};

use csv::{ReaderBuilder, StringRecord};

use crate::{IngestError, Result};

// ─── Cells ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
  Blank,
  Text(String),
  /// A numeric cell. `text` is the trimmed source text, kept so rendering
  /// never goes through a float.
  Number { value: f64, text: String },
}

impl Cell {
  /// Classify a raw cell. Digit strings with a leading zero stay text so
  /// postal codes keep their zeros.
  pub fn parse(raw: &str) -> Self {
    let value = raw.trim();
    if value.is_empty() {
      return Cell::Blank;
    }
    let numeric = value
      .chars()
      .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
      && value.chars().any(|c| c.is_ascii_digit());
    let leading_zero = value.len() > 1
      && value.starts_with('0')
      && !value.starts_with("0.");
    if numeric
      && !leading_zero
      && let Ok(n) = value.parse::<f64>()
    {
      return Cell::Number { value: n, text: value.to_owned() };
    }
    Cell::Text(value.to_owned())
  }

  pub fn is_blank(&self) -> bool { matches!(self, Cell::Blank) }

  /// Text form of the cell. Numbers keep their source text, except that a
  /// zero-only fraction (`91234567.0`) is dropped.
  pub fn as_text(&self) -> Option<String> {
    match self {
      Cell::Blank => None,
      Cell::Text(s) => Some(s.clone()),
      Cell::Number { text, .. } => {
        let whole = text
          .split_once('.')
          .filter(|(int, frac)| {
            !int.is_empty() && !frac.is_empty() && frac.bytes().all(|b| b == b'0')
          })
          .map_or(text.as_str(), |(int, _)| int);
        Some(whole.to_owned())
      }
    }
  }

  /// Spreadsheet truthiness: `true`, `yes`, `y`, `1`.
  pub fn is_truthy(&self) -> bool {
    match self {
      Cell::Blank => false,
      Cell::Number { value, .. } => *value == 1.0,
      Cell::Text(s) => {
        matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1")
      }
    }
  }
}

// ─── Requirements ────────────────────────────────────────────────────────────

/// A field a record must carry to be complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
  Column(&'static str),
  /// At least one of the columns must be non-blank.
  AnyOf(&'static [&'static str]),
}

impl Requirement {
  fn satisfied(&self, cells: &BTreeMap<String, Cell>) -> bool {
    let present = |col: &str| cells.get(col).is_some_and(|c| !c.is_blank());
    match self {
      Requirement::Column(col) => present(col),
      Requirement::AnyOf(cols) => cols.iter().any(|col| present(col)),
    }
  }

  pub fn describe(&self) -> String {
    match self {
      Requirement::Column(col) => (*col).to_owned(),
      Requirement::AnyOf(cols) => cols.join("|"),
    }
  }
}

pub const CENTRE_REQUIREMENTS: &[Requirement] = &[
  Requirement::Column("centre_name"),
  Requirement::AnyOf(&["address", "area"]),
];

pub const OFFERING_REQUIREMENTS: &[Requirement] = &[
  Requirement::Column("centre_name"),
  Requirement::Column("level"),
  Requirement::Column("subject"),
];

// ─── Records ─────────────────────────────────────────────────────────────────

/// One data row, keyed by normalized header name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
  /// 1-based line number in the source file.
  pub row:     u64,
  pub cells:   BTreeMap<String, Cell>,
  /// Requirements this record does not meet.
  pub missing: Vec<String>,
}

impl RawRecord {
  pub fn get(&self, column: &str) -> Option<&Cell> { self.cells.get(column) }

  /// Non-blank text of a column.
  pub fn text(&self, column: &str) -> Option<String> {
    self.get(column).and_then(Cell::as_text)
  }

  pub fn is_complete(&self) -> bool { self.missing.is_empty() }
}

/// A parsed sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
  pub headers: Vec<String>,
  pub records: Vec<RawRecord>,
}

impl Table {
  pub fn has_column(&self, column: &str) -> bool {
    self.headers.iter().any(|h| h == column)
  }
}

fn normalize_header(raw: &str) -> String {
  raw
    .trim_matches('\u{feff}')
    .trim()
    .to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("_")
}

fn is_blank_record(record: &StringRecord) -> bool {
  record.iter().all(|cell| cell.trim().is_empty())
}

/// Read a table from CSV. The first non-blank line is the header; entirely
/// blank rows are dropped.
pub fn read_table<R: io::Read>(
  reader: R,
  requirements: &[Requirement],
  label: &str,
) -> Result<Table> {
  let mut reader = ReaderBuilder::new()
    .has_headers(false)
    .flexible(true)
    .from_reader(reader);

  let mut headers: Option<Vec<String>> = None;
  let mut records = Vec::new();

  for (index, result) in reader.records().enumerate() {
    let record = result?;
    if is_blank_record(&record) {
      continue;
    }
    let Some(columns) = &headers else {
      headers = Some(record.iter().map(normalize_header).collect());
      continue;
    };

    let cells: BTreeMap<String, Cell> = columns
      .iter()
      .enumerate()
      .filter(|(_, name)| !name.is_empty())
      .map(|(i, name)| (name.clone(), Cell::parse(record.get(i).unwrap_or(""))))
      .collect();
    let missing = requirements
      .iter()
      .filter(|req| !req.satisfied(&cells))
      .map(Requirement::describe)
      .collect();
    let row = record
      .position()
      .map_or(index as u64 + 1, |pos| pos.line());

    records.push(RawRecord { row, cells, missing });
  }

  let headers =
    headers.ok_or_else(|| IngestError::EmptySource(label.to_owned()))?;
  Ok(Table { headers, records })
}

/// Read a table from a CSV file on disk.
pub fn read_table_path(
  path: impl AsRef<Path>,
  requirements: &[Requirement],
) -> Result<Table> {
  let path = path.as_ref();
  let file = File::open(path)?;
  read_table(file, requirements, &path.display().to_string())
}
