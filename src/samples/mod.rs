//! The application samples wizard
//!
//! Four steps: name the application, describe a component, pick a sample
//! (only when the component starts from one) and review. Submission creates
//! an Application and a Component through [`SamplesPlanner`].

pub mod answers;
pub mod catalog;
pub mod plan;
pub mod steps;

pub use catalog::{Sample, SAMPLES};
pub use plan::SamplesPlanner;
pub use steps::samples_flow_steps;

use crate::wizard::{create_session, SessionError, WizardSession};

/// Start a fresh samples-flow session
pub fn new_session() -> Result<WizardSession, SessionError> {
    create_session(samples_flow_steps())
}
