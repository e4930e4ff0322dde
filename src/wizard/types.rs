//! Type definitions for the wizard controller

use serde::Serialize;
use thiserror::Error;

use super::field::FieldView;
use crate::submission::{SubmissionFailure, SubmissionReceipt, SubmissionRequest};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WizardState {
    /// Showing the step at this index
    AtStep(usize),
    /// Submission handed to the adapter, waiting for the result
    Submitting,
    /// Submission succeeded; the session is finished
    Submitted,
    /// Cancelled by the user; the draft has been cleared
    Aborted,
}

impl WizardState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WizardState::Submitted | WizardState::Aborted)
    }
}

/// Result of the most recent submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

/// Accepted navigation request
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    /// The last step was confirmed; send this request to the adapter
    Submit(SubmissionRequest),
}

/// Why a navigation request was refused. State is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationDenied {
    #[error("the wizard has already been submitted")]
    Submitted,
    #[error("the wizard was aborted")]
    Aborted,
    #[error("a submission is in progress")]
    SubmissionInFlight,
    #[error("step '{step}' is not complete: {}", .reasons.join("; "))]
    StepInvalid { step: String, reasons: Vec<String> },
    #[error("already at the first step")]
    AtFirstStep,
    #[error("step {index} does not exist (the wizard has {len} steps)")]
    OutOfRange { index: usize, len: usize },
    #[error("step '{step}' does not apply to the current answers")]
    NotApplicable { step: String },
    #[error("step '{step}' is not the last step")]
    NotLastStep { step: String },
}

/// Invalid step list passed to [`create_session`](super::create_session)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a wizard needs at least one step")]
    Empty,
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
}

/// What [`WizardSession::finish_submission`](super::WizardSession::finish_submission) did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Submitted(SubmissionReceipt),
    /// Back on the last step with the draft intact
    Failed(SubmissionFailure),
    /// Stale request or aborted session; nothing changed
    Ignored,
}

/// Render surface for the active step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// 1-based position among the applicable steps
    pub position: usize,
    pub total: usize,
    pub fields: Vec<FieldView>,
    pub can_back: bool,
    pub can_next: bool,
    pub is_last: bool,
    /// Set while the last submission attempt failed
    pub submission_error: Option<String>,
}

impl StepView {
    /// "Step 2 of 4"
    pub fn progress_label(&self) -> String {
        format!("Step {} of {}", self.position, self.total)
    }
}
