use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tar::{Builder, Header};

use crate::catalog::{Category, Item};
use crate::config::AdminSecret;
use crate::error::{Result, SurveyError};
use crate::persistence::{is_submission_file_name, ResponseStore};
use crate::records::{
    is_record_header, read_csv_rows, record_from_cells, SubmissionRecord, UNTERMINATED_QUOTE,
};

pub const ARCHIVE_FILENAME: &str = "submissions.tar.gz";

#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: AdminSecret,
}

impl AdminGate {
    pub fn new(secret: AdminSecret) -> Self {
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_configured()
    }

    pub fn hint(&self) -> Option<String> {
        self.secret.hint()
    }

    /// True only for an exact match. An unset secret never unlocks.
    pub fn unlock(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let unlocked = match &self.secret {
            AdminSecret::Unset => false,
            AdminSecret::Plain(secret) => {
                let expected = Sha256::digest(secret.as_bytes());
                let entered = Sha256::digest(key.as_bytes());
                bool::from(entered.as_slice().ct_eq(expected.as_slice()))
            }
            AdminSecret::Hashed(record) => {
                match (record.derive_candidate(key), record.stored_hash()) {
                    (Some(candidate), Some(stored)) => {
                        candidate.len() == stored.len()
                            && bool::from(candidate.as_slice().ct_eq(stored.as_slice()))
                    }
                    _ => false,
                }
            }
        };
        if !unlocked {
            tracing::warn!("admin unlock rejected");
        }
        unlocked
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterTable {
    pub rows: Vec<SubmissionRecord>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTotal {
    pub category: String,
    pub item: String,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub submissions: usize,
    pub grand_total: u64,
    pub category_totals: Vec<(String, u64)>,
    pub item_totals: Vec<ItemTotal>,
}

impl Aggregate {
    pub fn from_rows(rows: &[SubmissionRecord]) -> Self {
        let mut by_category: BTreeMap<&str, u64> = BTreeMap::new();
        let mut by_item: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        let mut timestamps = BTreeSet::new();
        for row in rows {
            timestamps.insert(row.timestamp.as_str());
            *by_category.entry(row.category.as_str()).or_default() += u64::from(row.amount);
            *by_item
                .entry((row.category.as_str(), row.item.as_str()))
                .or_default() += u64::from(row.amount);
        }

        let mut category_totals: Vec<(String, u64)> = by_category
            .iter()
            .map(|(category, amount)| (category.to_string(), *amount))
            .collect();
        category_totals.sort_by_key(|(category, _)| catalog_rank(category.as_str(), None));

        let mut item_totals: Vec<ItemTotal> = by_item
            .iter()
            .map(|((category, item), amount)| ItemTotal {
                category: category.to_string(),
                item: item.to_string(),
                amount: *amount,
            })
            .collect();
        item_totals.sort_by_key(|entry| {
            catalog_rank(entry.category.as_str(), Some(entry.item.as_str()))
        });

        Self {
            submissions: timestamps.len(),
            grand_total: category_totals.iter().map(|(_, amount)| amount).sum(),
            category_totals,
            item_totals,
        }
    }
}

/// Catalog order first; names outside the catalog sort after it, alphabetically.
fn catalog_rank(category: &str, item: Option<&str>) -> (usize, usize, String, String) {
    let category_rank = Category::parse(category).map_or(usize::MAX, |c| c.index());
    let item_rank = item
        .map(|name| Item::parse(name).map_or(usize::MAX, |i| i.index()))
        .unwrap_or(0);
    (
        category_rank,
        item_rank,
        category.to_string(),
        item.unwrap_or_default().to_string(),
    )
}

/// Everything the unlocked panel shows. Faults become warnings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReport {
    pub master: Option<MasterTable>,
    pub aggregate: Option<Aggregate>,
    pub submission_files: Vec<String>,
    pub submission_count: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AdminPanel {
    store: ResponseStore,
}

impl AdminPanel {
    pub fn new(store: ResponseStore) -> Self {
        Self { store }
    }

    pub fn report(&self) -> AdminReport {
        let mut report = AdminReport::default();

        match self.load_master() {
            Ok((table, row_warnings)) => {
                report.warnings.extend(row_warnings);
                report.aggregate = Some(Aggregate::from_rows(table.rows.as_slice()));
                report.master = Some(table);
            }
            Err(err) => report.warnings.push(err.to_string()),
        }

        match self.submission_files() {
            Ok(files) => {
                report.submission_count = files.len();
                report.submission_files = files
                    .iter()
                    .filter_map(|path| path.file_name())
                    .map(|name| name.to_string_lossy().to_string())
                    .collect();
            }
            Err(err) => report.warnings.push(err.to_string()),
        }

        for warning in &report.warnings {
            tracing::warn!(%warning, "admin panel read fault");
        }
        report
    }

    /// Parses the master file, skipping malformed rows with a warning each.
    pub fn load_master(&self) -> Result<(MasterTable, Vec<String>)> {
        let path = self.store.master_path();
        let text = fs::read_to_string(path.as_path())
            .map_err(|err| SurveyError::io("read master file", path.as_path(), err))?;
        let parsed = read_csv_rows(text.as_str());

        let mut table = MasterTable::default();
        let mut warnings = Vec::new();
        for (index, (line, cells)) in parsed.rows.iter().enumerate() {
            if index == 0 && is_record_header(cells) {
                continue;
            }
            match record_from_cells(cells) {
                Ok(record) => table.rows.push(record),
                Err(reason) => warnings.push(
                    SurveyError::MalformedRow {
                        path: path.clone(),
                        line: *line,
                        reason,
                    }
                    .to_string(),
                ),
            }
        }
        if let Some(line) = parsed.unterminated {
            warnings.push(
                SurveyError::MalformedRow {
                    path: path.clone(),
                    line,
                    reason: UNTERMINATED_QUOTE.to_string(),
                }
                .to_string(),
            );
        }
        table.row_count = table.rows.len();
        Ok((table, warnings))
    }

    pub fn master_bytes(&self) -> Result<Vec<u8>> {
        let path = self.store.master_path();
        fs::read(path.as_path()).map_err(|err| SurveyError::io("read master file", path.as_path(), err))
    }

    /// Per-submission files matching `submission_*.csv`, sorted by name.
    pub fn submission_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.store.submissions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(dir.as_path())
            .map_err(|err| SurveyError::io("list submissions directory", dir.as_path(), err))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| SurveyError::io("list submissions directory", dir.as_path(), err))?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_submission_file_name);
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn submissions_archive(&self) -> Result<Vec<u8>> {
        let files = self.submission_files()?;
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);
        for path in &files {
            append_archive_file(&mut builder, path.as_path())?;
        }
        let encoder = builder
            .into_inner()
            .map_err(|err| SurveyError::io("finish archive", ARCHIVE_FILENAME, err))?;
        let bytes = encoder
            .finish()
            .map_err(|err| SurveyError::io("compress archive", ARCHIVE_FILENAME, err))?;
        tracing::info!(files = files.len(), bytes = bytes.len(), "submissions archive built");
        Ok(bytes)
    }
}

fn append_archive_file<W: Write>(builder: &mut Builder<W>, path: &Path) -> Result<()> {
    let bytes =
        fs::read(path).map_err(|err| SurveyError::io("read submission file", path, err))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut header = Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append_data(&mut header, name.as_str(), bytes.as_slice())
        .map_err(|err| SurveyError::io("append to archive", path, err))
}
