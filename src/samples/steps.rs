//! Steps of the samples flow: application, component, samples, review

use crate::wizard::{rules, ChoiceOption, Draft, FieldSpec, StepDescriptor};

use super::catalog;

pub const APPLICATION_NAME: &str = "application.name";
pub const APPLICATION_DISPLAY_NAME: &str = "application.displayName";
pub const NAMESPACE: &str = crate::submission::NAMESPACE_PATH;
pub const COMPONENT_NAME: &str = "component.name";
pub const COMPONENT_SOURCE: &str = "component.source";
pub const COMPONENT_GIT_URL: &str = "component.gitUrl";
pub const SAMPLE_ID: &str = "samples.sampleId";

pub const SOURCE_GIT: &str = "git";
pub const SOURCE_SAMPLE: &str = "sample";

const DISPLAY_NAME_MAX: usize = 256;

/// Whether the component is built from a catalog sample
pub fn uses_sample(draft: &Draft) -> bool {
    draft.get_str(COMPONENT_SOURCE) == Some(SOURCE_SAMPLE)
}

fn application_step() -> StepDescriptor {
    StepDescriptor::new("application", "Create your application")
        .with_description("An application groups the components that are built and deployed together.")
        .field(
            FieldSpec::text(APPLICATION_NAME, "Application name")
                .required("Required")
                .with_rule(rules::dns_label())
                .help("Lower case letters, digits and '-'"),
        )
        .field(
            FieldSpec::text(APPLICATION_DISPLAY_NAME, "Display name")
                .with_rule(rules::max_length(DISPLAY_NAME_MAX)),
        )
        .field(
            FieldSpec::text(NAMESPACE, "Namespace")
                .with_rule(rules::dns_label())
                .help("Leave empty to use your first project"),
        )
}

fn component_step() -> StepDescriptor {
    StepDescriptor::new("component", "Add a component")
        .with_description("Bring your own Git repository or start from a sample.")
        .field(
            FieldSpec::text(COMPONENT_NAME, "Component name")
                .required("Required")
                .with_rule(rules::dns_label()),
        )
        .field(
            FieldSpec::choice(
                COMPONENT_SOURCE,
                "Source",
                vec![
                    ChoiceOption::new(SOURCE_GIT, "Git repository"),
                    ChoiceOption::new(SOURCE_SAMPLE, "Start with a sample")
                        .with_children("Pick a devfile sample on the next step"),
                ],
            )
            .required("Select a source"),
        )
        .field(FieldSpec::text(COMPONENT_GIT_URL, "Git repository URL").with_rule(rules::url()))
        .validate_on(&[COMPONENT_SOURCE, COMPONENT_GIT_URL], |draft| {
            (draft.get_str(COMPONENT_SOURCE) == Some(SOURCE_GIT)
                && draft.is_blank(COMPONENT_GIT_URL))
            .then(|| "Git repository URL: Required for a Git source".to_string())
        })
}

fn samples_step() -> StepDescriptor {
    StepDescriptor::new("samples", "Select a sample")
        .with_description("Samples are ready-made devfile projects.")
        .field(
            FieldSpec::choice(SAMPLE_ID, "Sample", catalog::choice_options())
                .required("Select a sample"),
        )
        .applicable_when(uses_sample)
}

fn review_step() -> StepDescriptor {
    StepDescriptor::new("review", "Review and create")
        .with_description("The application and its component are created when you continue.")
}

/// The full samples flow, in order
pub fn samples_flow_steps() -> Vec<StepDescriptor> {
    vec![
        application_step(),
        component_step(),
        samples_step(),
        review_step(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_and_ids() {
        let steps = samples_flow_steps();
        let ids: Vec<&str> = steps.iter().map(StepDescriptor::id).collect();
        assert_eq!(ids, vec!["application", "component", "samples", "review"]);
    }

    #[test]
    fn test_application_name_must_be_dns_label() {
        let step = application_step();
        let mut draft = Draft::new();
        draft.set(APPLICATION_NAME, "My App");
        assert!(!step.is_valid(&draft));
        draft.set(APPLICATION_NAME, "my-app");
        assert!(step.is_valid(&draft));
    }

    #[test]
    fn test_git_source_requires_url() {
        let step = component_step();
        let mut draft = Draft::new();
        draft.set(COMPONENT_NAME, "backend");
        draft.set(COMPONENT_SOURCE, SOURCE_GIT);
        assert_eq!(
            step.problems(&draft),
            vec!["Git repository URL: Required for a Git source".to_string()]
        );

        draft.set(COMPONENT_GIT_URL, "not a url");
        assert!(!step.is_valid(&draft));
        draft.set(COMPONENT_GIT_URL, "https://github.com/org/repo");
        assert!(step.is_valid(&draft));

        draft.remove(COMPONENT_GIT_URL);
        draft.set(COMPONENT_SOURCE, SOURCE_SAMPLE);
        assert!(step.is_valid(&draft));
    }

    #[test]
    fn test_samples_step_only_for_sample_source() {
        let step = samples_step();
        let mut draft = Draft::new();
        assert!(!step.is_applicable(&draft));
        draft.set(COMPONENT_SOURCE, SOURCE_SAMPLE);
        assert!(step.is_applicable(&draft));

        draft.set(SAMPLE_ID, "quarkus-basic");
        assert!(!step.is_valid(&draft));
        draft.set(SAMPLE_ID, "nodejs-basic");
        assert!(step.is_valid(&draft));
    }
}
