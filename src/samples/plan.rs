//! Mapping from a samples-flow draft to Application and Component resources

use serde_json::json;

use super::catalog;
use super::steps::{
    uses_sample, APPLICATION_DISPLAY_NAME, APPLICATION_NAME, COMPONENT_GIT_URL, COMPONENT_NAME,
    SAMPLE_ID,
};
use crate::api::models::{APPLICATION_MODEL, COMPONENT_MODEL};
use crate::submission::{PlanError, PlannedOperation, SubmissionPlanner};
use crate::wizard::Draft;

/// Creates the application first, then its component
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplesPlanner;

impl SamplesPlanner {
    fn git_url(draft: &Draft) -> Result<String, PlanError> {
        if uses_sample(draft) {
            let id = draft
                .text(SAMPLE_ID)
                .ok_or_else(|| PlanError("no sample selected".to_string()))?;
            let sample =
                catalog::find(id).ok_or_else(|| PlanError(format!("unknown sample '{id}'")))?;
            if sample.coming_soon {
                return Err(PlanError(format!("sample '{id}' is not available yet")));
            }
            return Ok(sample.git_url.to_string());
        }
        draft
            .text(COMPONENT_GIT_URL)
            .map(str::to_string)
            .ok_or_else(|| PlanError("no Git repository URL given".to_string()))
    }
}

impl SubmissionPlanner for SamplesPlanner {
    fn plan(&self, draft: &Draft, namespace: &str) -> Result<Vec<PlannedOperation>, PlanError> {
        let app = draft
            .text(APPLICATION_NAME)
            .ok_or_else(|| PlanError("application name is missing".to_string()))?;
        let component = draft
            .text(COMPONENT_NAME)
            .ok_or_else(|| PlanError("component name is missing".to_string()))?;
        let git_url = Self::git_url(draft)?;

        let mut application = APPLICATION_MODEL.object(app, Some(namespace));
        application["spec"] = json!({
            "displayName": draft.text(APPLICATION_DISPLAY_NAME).unwrap_or(app),
        });

        let mut component_obj = COMPONENT_MODEL.object(component, Some(namespace));
        component_obj["spec"] = json!({
            "componentName": component,
            "application": app,
            "source": { "git": { "url": git_url } },
        });

        Ok(vec![
            PlannedOperation::new("application", APPLICATION_MODEL, application)?,
            PlannedOperation::new("component", COMPONENT_MODEL, component_obj)?,
        ])
    }
}
