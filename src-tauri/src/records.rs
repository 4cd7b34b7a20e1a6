use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;

use crate::allocation::Allocation;

pub const RECORD_COLUMNS: [&str; 4] = ["timestamp", "priority", "item", "amount"];
pub const PERSONAL_COLUMNS: [&str; 3] = ["priority", "item", "amount"];
pub const PERSONAL_COPY_FILENAME: &str = "my_ministry_allocation.csv";
pub const UNTERMINATED_QUOTE: &str = "unterminated quoted cell";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub timestamp: String,
    pub category: String,
    pub item: String,
    pub amount: u32,
}

/// The positive-amount records of one submission, all sharing one timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    timestamp: NaiveDateTime,
    records: Vec<SubmissionRecord>,
}

impl Submission {
    pub fn from_allocation(allocation: &Allocation, timestamp: NaiveDateTime) -> Self {
        let stamp = format_timestamp(timestamp);
        let records = allocation
            .positive_entries()
            .into_iter()
            .map(|entry| SubmissionRecord {
                timestamp: stamp.clone(),
                category: entry.category.to_string(),
                item: entry.item.to_string(),
                amount: entry.amount,
            })
            .collect();
        Self { timestamp, records }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn timestamp_string(&self) -> String {
        format_timestamp(self.timestamp)
    }

    pub fn records(&self) -> &[SubmissionRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows_csv(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            push_row(
                &mut out,
                &[
                    record.timestamp.as_str(),
                    record.category.as_str(),
                    record.item.as_str(),
                    record.amount.to_string().as_str(),
                ],
            );
        }
        out
    }

    pub fn to_csv(&self) -> String {
        let mut out = header_line(&RECORD_COLUMNS);
        out.push_str(self.rows_csv().as_str());
        out
    }

    /// The respondent's own copy: no timestamp column.
    pub fn personal_copy_csv(&self) -> String {
        let mut out = header_line(&PERSONAL_COLUMNS);
        for record in &self.records {
            push_row(
                &mut out,
                &[
                    record.category.as_str(),
                    record.item.as_str(),
                    record.amount.to_string().as_str(),
                ],
            );
        }
        out
    }
}

pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Hands out strictly increasing timestamps, bumping repeats by one microsecond.
#[derive(Debug, Default)]
pub struct TimestampSequence {
    last: Option<NaiveDateTime>,
}

impl TimestampSequence {
    pub fn next(&mut self, clock: &dyn Clock) -> NaiveDateTime {
        let now = clock.now();
        let next = match self.last {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last = Some(next);
        next
    }
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

fn header_line(columns: &[&str]) -> String {
    let mut out = String::new();
    push_row(&mut out, columns);
    out
}

fn push_row(out: &mut String, cells: &[&str]) {
    let line = cells
        .iter()
        .map(|cell| csv_escape(cell))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(line.as_str());
    out.push('\n');
}

fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    matches!(
        trimmed.chars().next(),
        Some('=') | Some('+') | Some('-') | Some('@')
    )
}

fn csv_escape(value: &str) -> String {
    let safe = if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    if safe.contains(',') || safe.contains('"') || safe.contains('\n') || safe.contains('\r') {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}

/// Records parsed before any unterminated quoted cell at the end of the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRows {
    pub rows: Vec<(usize, Vec<String>)>,
    pub unterminated: Option<usize>,
}

/// Splits CSV text into records of cells, each with its 1-based starting line.
pub fn parse_csv(text: &str) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let parsed = read_csv_rows(text);
    match parsed.unterminated {
        Some(line) => Err((line, UNTERMINATED_QUOTE.to_string())),
        None => Ok(parsed.rows),
    }
}

pub fn read_csv_rows(text: &str) -> CsvRows {
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push(ch);
                }
                _ => cell.push(ch),
            }
            continue;
        }
        match ch {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => cells.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                cells.push(std::mem::take(&mut cell));
                if !(cells.len() == 1 && cells[0].is_empty()) {
                    rows.push((row_start, std::mem::take(&mut cells)));
                }
                cells.clear();
                line += 1;
                row_start = line;
            }
            _ => cell.push(ch),
        }
    }

    if in_quotes {
        return CsvRows {
            rows,
            unterminated: Some(row_start),
        };
    }
    if !cell.is_empty() || !cells.is_empty() {
        cells.push(cell);
        rows.push((row_start, cells));
    }
    CsvRows {
        rows,
        unterminated: None,
    }
}

pub fn record_from_cells(cells: &[String]) -> Result<SubmissionRecord, String> {
    let [timestamp, category, item, amount] = cells else {
        return Err(format!("expected 4 columns, found {}", cells.len()));
    };
    if parse_timestamp(timestamp).is_none() {
        return Err(format!("invalid timestamp '{timestamp}'"));
    }
    let amount = amount
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid amount '{amount}': {err}"))?;
    Ok(SubmissionRecord {
        timestamp: timestamp.clone(),
        category: category.clone(),
        item: item.clone(),
        amount,
    })
}

pub fn is_record_header(cells: &[String]) -> bool {
    cells.len() == RECORD_COLUMNS.len()
        && cells
            .iter()
            .zip(RECORD_COLUMNS.iter())
            .all(|(cell, column)| cell == column)
}
