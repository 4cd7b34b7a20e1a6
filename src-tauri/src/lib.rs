//! Backend for the ministry priority allocation survey.
//!
//! A respondent spreads a budget of 100 across the catalog's items under five
//! priorities and submits once the total is exact. Submissions are appended to
//! `responses.csv` and written to one file each under `submissions/`. The
//! key-gated admin panel reads both back.

pub mod admin;
pub mod allocation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod persistence;
pub mod records;
pub mod session;
pub mod validator;

pub use admin::{AdminGate, AdminPanel, AdminReport, Aggregate, ARCHIVE_FILENAME};
pub use allocation::{Allocation, AllocationStore, Entry};
pub use catalog::{Category, Item, BUDGET, CATEGORIES, ITEMS};
pub use config::{AdminSecret, AuthRecord, SurveyConfig};
pub use error::{Result, SurveyError};
pub use persistence::{submission_file_name, ResponseStore, WrittenSubmission};
pub use records::{Clock, Submission, SubmissionRecord, SystemClock};
pub use session::{Receipt, SurveySession};
pub use validator::{BudgetStatus, Summary};

/// Installs the stderr log subscriber, honoring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
