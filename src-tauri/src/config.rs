use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Result, SurveyError};

pub const ADMIN_FILE: &str = "admin.json";
pub const DATA_DIR_ENV: &str = "SURVEY_DATA_DIR";
pub const ADMIN_KEY_ENV: &str = "SURVEY_ADMIN_KEY";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Salted PBKDF2-SHA256 digest of the admin key, as stored in `admin.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub salt: String,
    pub hash: String,
    #[serde(default = "default_pbkdf2_iterations")]
    pub iterations: u32,
}

impl AuthRecord {
    pub fn create(key: &str, iterations: Option<u32>) -> Self {
        let iterations = iterations.unwrap_or(DEFAULT_PBKDF2_ITERATIONS).max(1);
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        let derived = derive_key(key, &salt, iterations);
        Self {
            salt: encode_b64(&salt),
            hash: encode_b64(derived.as_slice()),
            iterations,
        }
    }

    /// Derives the candidate digest for `key`; `None` if the stored record is unusable.
    pub(crate) fn derive_candidate(&self, key: &str) -> Option<Vec<u8>> {
        let salt = decode_b64(self.salt.as_str()).ok()?;
        Some(derive_key(key, salt.as_slice(), self.iterations.max(1)).to_vec())
    }

    pub(crate) fn stored_hash(&self) -> Option<Vec<u8>> {
        decode_b64(self.hash.as_str()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdminSecret {
    #[default]
    Unset,
    Plain(String),
    Hashed(AuthRecord),
}

impl AdminSecret {
    pub fn is_configured(&self) -> bool {
        !matches!(self, AdminSecret::Unset)
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            AdminSecret::Unset => Some(format!(
                "Admin panel disabled: set {ADMIN_KEY_ENV} or run `survey-admin set-key` to create {ADMIN_FILE}."
            )),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub data_dir: PathBuf,
    pub admin_secret: AdminSecret,
}

impl SurveyConfig {
    pub fn resolve(default_data_dir: impl Into<PathBuf>) -> Self {
        Self::resolve_with(default_data_dir, |name| std::env::var(name).ok())
    }

    /// Resolves against an explicitly chosen data directory, ignoring `SURVEY_DATA_DIR`.
    pub fn resolve_pinned_with(
        data_dir: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self::resolve_with(data_dir, |name| {
            if name == DATA_DIR_ENV {
                None
            } else {
                lookup(name)
            }
        })
    }

    /// `lookup` stands in for the process environment; empty values count as unset.
    pub fn resolve_with(
        default_data_dir: impl Into<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let nonempty = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let data_dir = nonempty(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir.into());
        let admin_secret = match nonempty(ADMIN_KEY_ENV) {
            Some(key) => AdminSecret::Plain(key),
            None => load_admin_secret(data_dir.as_path()),
        };
        tracing::info!(
            data_dir = %data_dir.display(),
            admin_configured = admin_secret.is_configured(),
            "survey configuration resolved"
        );
        Self {
            data_dir,
            admin_secret,
        }
    }
}

/// Loads `admin.json`; anything unreadable or malformed leaves the panel locked.
pub fn load_admin_secret(data_dir: &Path) -> AdminSecret {
    match read_auth_record(data_dir) {
        Ok(Some(record)) => AdminSecret::Hashed(record),
        Ok(None) => AdminSecret::Unset,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring admin key record");
            AdminSecret::Unset
        }
    }
}

pub fn admin_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ADMIN_FILE)
}

pub fn read_auth_record(data_dir: &Path) -> Result<Option<AuthRecord>> {
    let path = admin_file_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path.as_path())
        .map_err(|err| SurveyError::io("read admin key record", path.as_path(), err))?;
    let mut record: AuthRecord = serde_json::from_str(raw.as_str())
        .map_err(|err| SurveyError::Config(format!("{}: {err}", path.display())))?;
    if record.salt.is_empty() || record.hash.is_empty() {
        return Err(SurveyError::Config(format!(
            "{}: salt and hash are required",
            path.display()
        )));
    }
    if record.iterations == 0 {
        record.iterations = DEFAULT_PBKDF2_ITERATIONS;
    }
    Ok(Some(record))
}

pub fn write_auth_record(data_dir: &Path, record: &AuthRecord) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)
        .map_err(|err| SurveyError::io("create data directory", data_dir, err))?;
    let path = admin_file_path(data_dir);
    let content = serde_json::to_string_pretty(record)
        .map_err(|err| SurveyError::Config(err.to_string()))?;
    fs::write(path.as_path(), content)
        .map_err(|err| SurveyError::io("write admin key record", path.as_path(), err))?;
    Ok(path)
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn decode_b64(value: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    B64.decode(value)
}

fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}
