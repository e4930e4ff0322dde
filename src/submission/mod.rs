//! Submitting a finished draft to the backend.
//!
//! The wizard hands a [`SubmissionRequest`] (a snapshot of its draft) to a
//! [`SubmissionAdapter`] and records the outcome. [`ResourceSubmitter`] is the
//! adapter that turns the draft into ordered resource creations, keeping a
//! per-session ledger so a retry resumes instead of duplicating work.

pub mod ledger;
pub mod plan;
mod submitter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::models::ResourceRef;
use crate::wizard::Draft;

pub use ledger::{Ledger, LedgerEntry, OperationStatus};
pub use plan::{PlanError, PlannedOperation, SubmissionPlanner};
pub use submitter::{ResourceSubmitter, NAMESPACE_PATH};

/// Annotation marking resources created by a given wizard session
pub const SESSION_ANNOTATION: &str = "samples-flow/session-id";

/// Snapshot handed to the adapter when a session enters submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub session_id: Uuid,
    /// 1 for the first submission, incremented on each retry
    pub attempt: u32,
    pub draft: Draft,
}

/// What a successful submission produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub session_id: Uuid,
    pub resources: Vec<ResourceRef>,
    /// Left behind by an earlier attempt under a name the draft no longer uses
    pub orphans: Vec<ResourceRef>,
    pub completed_at: DateTime<Utc>,
}

/// Why a submission did not complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionFailure {
    /// Nothing new exists, or the outcome could not be confirmed
    #[error("{operation} failed: {reason}{}", unverified_note(.unverified))]
    Total {
        operation: String,
        reason: String,
        /// The failing call may have been applied; check the server
        unverified: bool,
        /// Resources known to exist from this or earlier attempts
        existing: Vec<ResourceRef>,
    },
    /// Some resources were created before a later operation failed
    #[error("{failed} failed after creating {}: {reason}", list_refs(.created))]
    Partial {
        created: Vec<ResourceRef>,
        failed: String,
        /// Keys of the operations that were not attempted
        remaining: Vec<String>,
        reason: String,
    },
    #[error("draft cannot be submitted: {0}")]
    InvalidDraft(String),
}

fn unverified_note(unverified: &bool) -> &'static str {
    if *unverified {
        " (outcome unknown, verify on the server before retrying)"
    } else {
        ""
    }
}

fn list_refs(refs: &[ResourceRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SubmissionFailure {
    pub fn is_partial(&self) -> bool {
        matches!(self, SubmissionFailure::Partial { .. })
    }

    /// Whether the user must check the server before trusting this result
    pub fn requires_verification(&self) -> bool {
        matches!(self, SubmissionFailure::Total { unverified: true, .. })
    }

    /// Resources known to exist despite the failure
    pub fn existing_resources(&self) -> &[ResourceRef] {
        match self {
            SubmissionFailure::Total { existing, .. } => existing,
            SubmissionFailure::Partial { created, .. } => created,
            SubmissionFailure::InvalidDraft(_) => &[],
        }
    }
}

/// Sends a finished draft to the backend
#[async_trait]
pub trait SubmissionAdapter: Send + Sync {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure>;

    /// Drop anything kept for retries of `session_id`
    fn discard(&self, _session_id: Uuid) {}
}
