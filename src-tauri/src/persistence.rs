use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, SurveyError};
use crate::records::{Submission, RECORD_COLUMNS};

pub const MASTER_FILE: &str = "responses.csv";
pub const SUBMISSIONS_DIR: &str = "submissions";
pub const SUBMISSION_PREFIX: &str = "submission_";
pub const SUBMISSION_SUFFIX: &str = ".csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSubmission {
    pub master: PathBuf,
    pub submission: PathBuf,
    pub rows: usize,
}

/// Flat-file response storage rooted at the survey data directory.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
}

impl ResponseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn master_path(&self) -> PathBuf {
        self.root.join(MASTER_FILE)
    }

    pub fn submissions_dir(&self) -> PathBuf {
        self.root.join(SUBMISSIONS_DIR)
    }

    pub fn submission_path(&self, timestamp: &str) -> PathBuf {
        self.submissions_dir().join(submission_file_name(timestamp))
    }

    pub fn record(&self, submission: &Submission) -> Result<WrittenSubmission> {
        let master = self.append_master(submission)?;
        let submission_path = self.write_submission_file(submission)?;
        Ok(WrittenSubmission {
            master,
            submission: submission_path,
            rows: submission.records().len(),
        })
    }

    pub fn append_master(&self, submission: &Submission) -> Result<PathBuf> {
        let path = self.master_path();
        fs::create_dir_all(self.root.as_path())
            .map_err(|err| SurveyError::io("create data directory", self.root.as_path(), err))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_path())
            .map_err(|err| SurveyError::io("open master file", path.as_path(), err))?;
        file.lock_exclusive()
            .map_err(|err| SurveyError::io("lock master file", path.as_path(), err))?;
        let written = write_master_rows(&mut file, submission);
        let unlocked = FileExt::unlock(&file);
        written.map_err(|err| SurveyError::io("append master file", path.as_path(), err))?;
        unlocked.map_err(|err| SurveyError::io("unlock master file", path.as_path(), err))?;
        Ok(path)
    }

    /// Creates the per-submission file. An existing file is never overwritten.
    pub fn write_submission_file(&self, submission: &Submission) -> Result<PathBuf> {
        let dir = self.submissions_dir();
        fs::create_dir_all(dir.as_path())
            .map_err(|err| SurveyError::io("create submissions directory", dir.as_path(), err))?;
        let path = self.submission_path(submission.timestamp_string().as_str());
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_path())
            .map_err(|err| SurveyError::io("create submission file", path.as_path(), err))?;
        file.write_all(submission.to_csv().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|err| SurveyError::io("write submission file", path.as_path(), err))?;
        Ok(path)
    }
}

fn write_master_rows(file: &mut File, submission: &Submission) -> std::io::Result<()> {
    let mut content = String::new();
    if file.seek(SeekFrom::End(0))? == 0 {
        content.push_str(RECORD_COLUMNS.join(",").as_str());
        content.push('\n');
    }
    content.push_str(submission.rows_csv().as_str());
    file.write_all(content.as_bytes())?;
    file.sync_all()
}

/// File name for a submission timestamp; colons become hyphens.
pub fn submission_file_name(timestamp: &str) -> String {
    format!(
        "{SUBMISSION_PREFIX}{}{SUBMISSION_SUFFIX}",
        timestamp.replace(':', "-")
    )
}

pub fn is_submission_file_name(name: &str) -> bool {
    name.len() > SUBMISSION_PREFIX.len() + SUBMISSION_SUFFIX.len()
        && name.starts_with(SUBMISSION_PREFIX)
        && name.ends_with(SUBMISSION_SUFFIX)
}
