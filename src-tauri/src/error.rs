use std::path::PathBuf;

/// Errors raised by the survey backend.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("unknown priority: '{0}'")]
    UnknownCategory(String),

    #[error("unknown item: '{0}'")]
    UnknownItem(String),

    #[error("amount {amount} is outside 0..={max}")]
    AmountOutOfRange { amount: i64, max: u32 },

    #[error("Total exceeds ${target} by ${excess}. Please reallocate.")]
    OverBudget { target: u32, excess: u32 },

    #[error("Total is less than ${target} by ${shortfall}. Keep allocating to reach ${target}.")]
    UnderBudget { target: u32, shortfall: u32 },

    #[error("No allocations entered. Please allocate funds before submitting.")]
    NoAllocations,

    #[error("{context} ({path}): {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {line} in {path}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SurveyError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Validation conditions are shown to the respondent as guidance.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SurveyError::UnknownCategory(_)
                | SurveyError::UnknownItem(_)
                | SurveyError::AmountOutOfRange { .. }
                | SurveyError::OverBudget { .. }
                | SurveyError::UnderBudget { .. }
                | SurveyError::NoAllocations
        )
    }

    /// Everything on the respondent path can be retried without losing input.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SurveyError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SurveyError>;
