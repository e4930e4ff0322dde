//! The wizard controller: step sequencing, validation-gated navigation and
//! submission bookkeeping for one session.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::draft::Draft;
use super::field::{FieldBinding, FieldRegistry, FieldView};
use super::step::StepDescriptor;
use super::types::{
    Navigation, NavigationDenied, SessionError, StepView, SubmissionOutcome, SubmissionState,
    WizardState,
};
use crate::submission::{SubmissionAdapter, SubmissionFailure, SubmissionReceipt, SubmissionRequest};

/// Lifecycle callbacks. Every method defaults to a no-op.
pub trait SessionHooks: Send {
    fn on_step_changed(&mut self, _session: Uuid, _from: &str, _to: &str) {}

    fn on_submitted(&mut self, _session: Uuid, _receipt: &SubmissionReceipt) {}

    fn on_aborted(&mut self, _session: Uuid) {}
}

struct NoHooks;

impl SessionHooks for NoHooks {}

/// Create a session over `steps`
pub fn create_session(steps: Vec<StepDescriptor>) -> Result<WizardSession, SessionError> {
    WizardSession::new(steps)
}

/// One user's pass through the wizard.
///
/// The session exclusively owns its draft. Field bindings borrow the session
/// mutably, so writes and navigation can never interleave.
pub struct WizardSession {
    id: Uuid,
    steps: Vec<StepDescriptor>,
    /// Active step; stays on the last step while submitting
    current: usize,
    state: WizardState,
    submission: SubmissionState,
    draft: Draft,
    fields: FieldRegistry,
    /// Number of submissions started
    attempt: u32,
    hooks: Box<dyn SessionHooks>,
}

impl fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("submission", &self.submission)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

impl WizardSession {
    pub fn new(steps: Vec<StepDescriptor>) -> Result<Self, SessionError> {
        if steps.is_empty() {
            return Err(SessionError::Empty);
        }
        {
            let mut seen = HashSet::new();
            for step in &steps {
                if !seen.insert(step.id()) {
                    return Err(SessionError::DuplicateStepId(step.id().to_string()));
                }
            }
        }

        let mut fields = FieldRegistry::default();
        for (index, step) in steps.iter().enumerate() {
            for spec in step.fields() {
                fields.register(index, spec.clone());
            }
        }

        let mut session = Self {
            id: Uuid::new_v4(),
            steps,
            current: 0,
            state: WizardState::AtStep(0),
            submission: SubmissionState::Idle,
            draft: Draft::new(),
            fields,
            attempt: 0,
            hooks: Box::new(NoHooks),
        };
        session.rewind();
        info!(
            session = %session.id,
            steps = session.steps.len(),
            "Created wizard session at step '{}'",
            session.current_step().id()
        );
        Ok(session)
    }

    pub fn with_hooks(mut self, hooks: impl SessionHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Start from a prefilled draft
    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.draft = draft;
        self.rewind();
        self
    }

    /// Go to the first applicable step, or the first step if none applies
    fn rewind(&mut self) {
        self.current = (0..self.steps.len())
            .find(|&i| self.applicable(i))
            .unwrap_or(0);
        self.state = WizardState::AtStep(self.current);
        self.fields.set_scope(self.current);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn submission_state(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &StepDescriptor {
        &self.steps[self.current]
    }

    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Steps taking part in the flow for the current draft
    pub fn applicable_steps(&self) -> Vec<&StepDescriptor> {
        self.steps
            .iter()
            .filter(|s| s.is_applicable(&self.draft))
            .collect()
    }

    /// Bind to the draft value at `path`.
    ///
    /// Writes through a binding of a finished session are dropped.
    pub fn bind(&mut self, path: &str) -> FieldBinding<'_> {
        let frozen = self.state.is_terminal();
        FieldBinding::new(path, &mut self.draft, &mut self.fields, frozen)
    }

    /// Shorthand for `bind(path).set_value(value)`
    pub fn set_value(&mut self, path: &str, value: impl Into<Value>) {
        self.bind(path).set_value(value);
    }

    /// Reasons the current step blocks Next
    pub fn current_problems(&self) -> Vec<String> {
        self.current_step().problems(&self.draft)
    }

    fn applicable(&self, index: usize) -> bool {
        self.steps[index].is_applicable(&self.draft)
    }

    fn next_applicable(&self, from: usize) -> Option<usize> {
        (from + 1..self.steps.len()).find(|&i| self.applicable(i))
    }

    fn prev_applicable(&self, from: usize) -> Option<usize> {
        (0..from).rev().find(|&i| self.applicable(i))
    }

    fn ensure_navigable(&self) -> Result<(), NavigationDenied> {
        match self.state {
            WizardState::AtStep(_) => Ok(()),
            WizardState::Submitting => Err(NavigationDenied::SubmissionInFlight),
            WizardState::Submitted => Err(NavigationDenied::Submitted),
            WizardState::Aborted => Err(NavigationDenied::Aborted),
        }
    }

    fn ensure_valid(&self, index: usize) -> Result<(), NavigationDenied> {
        let step = &self.steps[index];
        if step.is_valid(&self.draft) {
            return Ok(());
        }
        Err(NavigationDenied::StepInvalid {
            step: step.id().to_string(),
            reasons: step.problems(&self.draft),
        })
    }

    fn denied<T>(&self, action: &str, reason: NavigationDenied) -> Result<T, NavigationDenied> {
        debug!(session = %self.id, action, %reason, "navigation denied");
        Err(reason)
    }

    pub fn is_last_step(&self) -> bool {
        self.next_applicable(self.current).is_none()
    }

    pub fn can_next(&self) -> bool {
        self.ensure_navigable().is_ok() && self.current_step().is_valid(&self.draft)
    }

    pub fn can_back(&self) -> bool {
        self.ensure_navigable().is_ok() && self.prev_applicable(self.current).is_some()
    }

    /// Advance to the next applicable step, or start submission from the last
    pub fn next(&mut self) -> Result<Navigation, NavigationDenied> {
        if let Err(reason) = self.ensure_navigable() {
            return self.denied("next", reason);
        }
        if let Err(reason) = self.ensure_valid(self.current) {
            return self.denied("next", reason);
        }
        match self.next_applicable(self.current) {
            Some(to) => Ok(self.move_to(to)),
            None => Ok(Navigation::Submit(self.begin_submission())),
        }
    }

    /// Return to the previous applicable step. The draft is left alone.
    pub fn back(&mut self) -> Result<Navigation, NavigationDenied> {
        if let Err(reason) = self.ensure_navigable() {
            return self.denied("back", reason);
        }
        match self.prev_applicable(self.current) {
            Some(to) => Ok(self.move_to(to)),
            None => self.denied("back", NavigationDenied::AtFirstStep),
        }
    }

    /// Jump to step `index`.
    ///
    /// Backward jumps are always allowed. Forward jumps need the current step
    /// and every applicable step in between to be valid.
    pub fn go_to(&mut self, index: usize) -> Result<Navigation, NavigationDenied> {
        if let Err(reason) = self.ensure_navigable() {
            return self.denied("go_to", reason);
        }
        if index >= self.steps.len() {
            let len = self.steps.len();
            return self.denied("go_to", NavigationDenied::OutOfRange { index, len });
        }
        if !self.applicable(index) {
            let step = self.steps[index].id().to_string();
            return self.denied("go_to", NavigationDenied::NotApplicable { step });
        }

        let from = self.current;
        if index == from {
            return Ok(Navigation::Moved { from, to: index });
        }
        if index > from {
            for i in (from..index).filter(|&i| i == from || self.applicable(i)) {
                if let Err(reason) = self.ensure_valid(i) {
                    return self.denied("go_to", reason);
                }
            }
        }
        Ok(self.move_to(index))
    }

    /// Confirm the last step and hand back the submission request
    pub fn submit(&mut self) -> Result<SubmissionRequest, NavigationDenied> {
        if let Err(reason) = self.ensure_navigable() {
            return self.denied("submit", reason);
        }
        if !self.is_last_step() {
            let step = self.current_step().id().to_string();
            return self.denied("submit", NavigationDenied::NotLastStep { step });
        }
        if let Err(reason) = self.ensure_valid(self.current) {
            return self.denied("submit", reason);
        }
        Ok(self.begin_submission())
    }

    /// Submit through `adapter` and record the result
    pub async fn submit_with<A>(&mut self, adapter: &A) -> Result<SubmissionOutcome, NavigationDenied>
    where
        A: SubmissionAdapter + ?Sized,
    {
        let request = self.submit()?;
        let result = adapter.submit(&request).await;
        Ok(self.finish_submission(&request, result))
    }

    /// Record the adapter's answer for `request`.
    ///
    /// Answers for an older attempt, another session, or a session that is no
    /// longer submitting are ignored.
    pub fn finish_submission(
        &mut self,
        request: &SubmissionRequest,
        result: Result<SubmissionReceipt, SubmissionFailure>,
    ) -> SubmissionOutcome {
        let current_ticket = request.session_id == self.id && request.attempt == self.attempt;
        if self.state != WizardState::Submitting || !current_ticket {
            debug!(
                session = %self.id,
                attempt = request.attempt,
                state = ?self.state,
                "ignoring stale submission result"
            );
            return SubmissionOutcome::Ignored;
        }

        match result {
            Ok(receipt) => {
                info!(
                    session = %self.id,
                    attempt = self.attempt,
                    "Submitted {} resource(s)",
                    receipt.resources.len()
                );
                self.state = WizardState::Submitted;
                self.submission = SubmissionState::Succeeded;
                self.hooks.on_submitted(self.id, &receipt);
                SubmissionOutcome::Submitted(receipt)
            }
            Err(failure) => {
                warn!(session = %self.id, attempt = self.attempt, "Submission failed: {}", failure);
                self.state = WizardState::AtStep(self.current);
                self.submission = SubmissionState::Failed(failure.to_string());
                SubmissionOutcome::Failed(failure)
            }
        }
    }

    /// Cancel the session and clear the draft.
    ///
    /// Returns false when there was nothing to abort (already aborted or
    /// already submitted).
    pub fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            debug!(session = %self.id, state = ?self.state, "abort ignored");
            return false;
        }
        if self.state == WizardState::Submitting {
            warn!(session = %self.id, "Aborting while a submission is in flight");
        }
        self.state = WizardState::Aborted;
        self.submission = SubmissionState::Idle;
        self.draft.reset();
        self.fields.reset();
        self.hooks.on_aborted(self.id);
        info!(session = %self.id, "Wizard aborted");
        true
    }

    /// Abort and let `adapter` drop what it kept for retries
    pub fn abort_with<A>(&mut self, adapter: &A) -> bool
    where
        A: SubmissionAdapter + ?Sized,
    {
        let aborted = self.abort();
        adapter.discard(self.id);
        aborted
    }

    /// Everything needed to render the active step
    pub fn current_view(&self) -> StepView {
        let step = self.current_step();
        let applicable: Vec<usize> = (0..self.steps.len())
            .filter(|&i| self.applicable(i))
            .collect();
        let position = applicable
            .iter()
            .position(|&i| i == self.current)
            .map_or(1, |p| p + 1);

        let mut seen = HashSet::new();
        let fields = step
            .fields()
            .iter()
            .filter(|spec| seen.insert(spec.path.as_str()))
            .map(|spec| FieldView::build(&spec.path, &self.draft, &self.fields))
            .collect();

        StepView {
            id: step.id().to_string(),
            title: step.title().to_string(),
            description: step.description().map(str::to_string),
            position,
            total: applicable.len().max(position),
            fields,
            can_back: self.can_back(),
            can_next: self.can_next(),
            is_last: self.is_last_step(),
            submission_error: match &self.submission {
                SubmissionState::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
        }
    }

    fn move_to(&mut self, to: usize) -> Navigation {
        let from = self.current;
        self.current = to;
        self.state = WizardState::AtStep(to);
        self.fields.set_scope(to);

        let (from_id, to_id) = (self.steps[from].id(), self.steps[to].id());
        info!(session = %self.id, "Step '{}' -> '{}'", from_id, to_id);
        self.hooks.on_step_changed(self.id, from_id, to_id);
        Navigation::Moved { from, to }
    }

    fn begin_submission(&mut self) -> SubmissionRequest {
        self.attempt += 1;
        self.state = WizardState::Submitting;
        self.submission = SubmissionState::Submitting;
        info!(session = %self.id, attempt = self.attempt, "Starting submission");
        SubmissionRequest {
            session_id: self.id,
            attempt: self.attempt,
            draft: self.draft.clone(),
        }
    }
}
