//! Multi-step wizard engine
//!
//! A wizard is an ordered list of [`StepDescriptor`]s sharing one [`Draft`].
//! [`WizardSession`] tracks the active step, only lets the user move forward
//! past valid steps, and hands the finished draft to a
//! [`SubmissionAdapter`](crate::submission::SubmissionAdapter).

pub mod draft;
pub mod field;
pub mod rules;
mod session;
pub mod step;
mod types;


pub use draft::{Draft, DraftError};
pub use field::{field_id, ChoiceOption, FieldBinding, FieldKind, FieldSpec, FieldState, FieldView};
pub use rules::Rule;
pub use session::{create_session, SessionHooks, WizardSession};
pub use step::StepDescriptor;
pub use types::{
    Navigation, NavigationDenied, SessionError, StepView, SubmissionOutcome, SubmissionState,
    WizardState,
};
