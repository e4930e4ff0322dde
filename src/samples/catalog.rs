//! Devfile samples offered on the samples step

use crate::wizard::ChoiceOption;

/// A starter repository a component can be created from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub id: &'static str,
    pub name: &'static str,
    pub runtime: &'static str,
    pub description: &'static str,
    pub git_url: &'static str,
    /// Listed but not selectable yet
    pub coming_soon: bool,
}

pub static SAMPLES: &[Sample] = &[
    Sample {
        id: "java-springboot-basic",
        name: "Basic Spring Boot",
        runtime: "Java",
        description: "Spring Boot REST service with a single greeting endpoint",
        git_url: "https://github.com/devfile-samples/devfile-sample-java-springboot-basic",
        coming_soon: false,
    },
    Sample {
        id: "nodejs-basic",
        name: "Basic Node.js",
        runtime: "Node.js",
        description: "Express application serving a hello world page",
        git_url: "https://github.com/devfile-samples/devfile-sample-nodejs-basic",
        coming_soon: false,
    },
    Sample {
        id: "python-basic",
        name: "Basic Python",
        runtime: "Python",
        description: "Flask application with a health check",
        git_url: "https://github.com/devfile-samples/devfile-sample-python-basic",
        coming_soon: false,
    },
    Sample {
        id: "quarkus-basic",
        name: "Basic Quarkus",
        runtime: "Java",
        description: "Quarkus REST service",
        git_url: "https://github.com/devfile-samples/devfile-sample-code-with-quarkus",
        coming_soon: true,
    },
];

/// Look up a sample by id
pub fn find(id: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.id == id)
}

/// Radio options for the catalog; unreleased samples are disabled
pub fn choice_options() -> Vec<ChoiceOption> {
    SAMPLES
        .iter()
        .map(|s| {
            let label = if s.coming_soon {
                format!("{} ({}) - coming soon", s.name, s.runtime)
            } else {
                format!("{} ({})", s.name, s.runtime)
            };
            let option = ChoiceOption::new(s.id, label).with_children(s.description);
            if s.coming_soon {
                option.disabled()
            } else {
                option
            }
        })
        .collect()
}
