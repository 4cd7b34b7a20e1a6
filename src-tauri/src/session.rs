use serde::Serialize;

use crate::allocation::AllocationStore;
use crate::error::Result;
use crate::persistence::ResponseStore;
use crate::records::{Clock, Submission, SystemClock, TimestampSequence, PERSONAL_COPY_FILENAME};
use crate::validator::{self, Summary};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub timestamp: String,
    pub rows: usize,
    pub personal_copy: String,
    pub personal_copy_filename: String,
}

/// One respondent's survey context: their allocation plus the shared response store.
pub struct SurveySession {
    store: AllocationStore,
    responses: ResponseStore,
    clock: Box<dyn Clock>,
    sequence: TimestampSequence,
    last_receipt: Option<Receipt>,
}

impl SurveySession {
    pub fn new(responses: ResponseStore) -> Self {
        Self::with_clock(responses, Box::new(SystemClock))
    }

    pub fn with_clock(responses: ResponseStore, clock: Box<dyn Clock>) -> Self {
        Self {
            store: AllocationStore::new(),
            responses,
            clock,
            sequence: TimestampSequence::default(),
            last_receipt: None,
        }
    }

    pub fn set(&mut self, category: &str, item: &str, amount: i64) -> Result<Summary> {
        self.store.set(category, item, amount)?;
        Ok(self.summary())
    }

    pub fn clear(&mut self) -> Summary {
        self.store.clear();
        self.last_receipt = None;
        tracing::info!("allocation cleared");
        self.summary()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(self.store.allocation())
    }

    pub fn store(&self) -> &AllocationStore {
        &self.store
    }

    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    pub fn last_receipt(&self) -> Option<&Receipt> {
        self.last_receipt.as_ref()
    }

    // The allocation survives a rejected or failed submit. A recorded one leaves
    // the cleared store flagged as submitted until the next edit or clear.
    pub fn submit(&mut self) -> Result<Receipt> {
        validator::ensure_submittable(self.store.allocation())?;

        let timestamp = self.sequence.next(self.clock.as_ref());
        let submission = Submission::from_allocation(self.store.allocation(), timestamp);
        let written = self.responses.record(&submission).map_err(|err| {
            tracing::warn!(error = %err, "failed to save survey response");
            err
        })?;

        let receipt = Receipt {
            timestamp: submission.timestamp_string(),
            rows: written.rows,
            personal_copy: submission.personal_copy_csv(),
            personal_copy_filename: PERSONAL_COPY_FILENAME.to_string(),
        };
        tracing::info!(
            timestamp = %receipt.timestamp,
            rows = receipt.rows,
            "survey response recorded"
        );

        self.store.clear();
        self.store.mark_submitted();
        self.last_receipt = Some(receipt.clone());
        Ok(receipt)
    }
}
