//! Driving a session from a prepared answers file
//!
//! Answers are a nested object keyed like the draft (`application.name`
//! lives at `{"application": {"name": ...}}`). JSON, YAML and TOML files are
//! accepted.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::submission::SubmissionRequest;
use crate::wizard::{Draft, Navigation, NavigationDenied, WizardSession};

/// Read an answers file, choosing the parser from its extension
pub fn load_answers(path: &Path) -> Result<Draft> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("json")
        .to_ascii_lowercase();

    let value: Value = match ext.as_str() {
        "json" => serde_json::from_str(&text).context("Failed to parse JSON answers")?,
        "yaml" | "yml" => serde_yaml::from_str(&text).context("Failed to parse YAML answers")?,
        "toml" => toml::from_str(&text).context("Failed to parse TOML answers")?,
        other => bail!("Unsupported answers format '.{}' (use json, yaml or toml)", other),
    };
    Draft::from_value(value).context("Invalid answers file")
}

/// Steps visited while filling in answers, and the resulting request
#[derive(Debug)]
pub struct DriveReport {
    pub visited: Vec<String>,
    pub request: SubmissionRequest,
}

/// Fill each step from `answers` and press Next until submission starts.
///
/// Values for paths no step declares are written up front. Stops at the
/// first step that refuses to advance.
pub fn fill_and_advance(
    session: &mut WizardSession,
    answers: &Draft,
) -> Result<DriveReport, NavigationDenied> {
    let leaves = answers.leaves();
    let declared: HashSet<String> = session
        .steps()
        .iter()
        .flat_map(|s| s.fields().iter().map(|f| f.path.clone()))
        .collect();

    for (path, value) in leaves.iter().filter(|(p, _)| !declared.contains(p)) {
        session.set_value(path, value.clone());
    }

    let mut visited = Vec::new();
    // Next either refuses, moves strictly forward or starts submission
    loop {
        let step = session.current_step();
        visited.push(step.id().to_string());
        let paths: Vec<String> = step.fields().iter().map(|f| f.path.clone()).collect();

        for path in paths {
            if let Some(value) = answers.get(&path) {
                debug!(%path, "filling field from answers");
                session.set_value(&path, value.clone());
            }
        }

        match session.next()? {
            Navigation::Moved { .. } => {}
            Navigation::Submit(request) => return Ok(DriveReport { visited, request }),
        }
    }
}
