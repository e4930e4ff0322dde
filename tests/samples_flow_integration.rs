//! Integration tests for the samples flow against an in-memory backend
//!
//! These tests drive a full wizard session through the public API:
//! - filling steps, skipping the samples step for Git sources
//! - submitting through the ledger-backed submitter
//! - partial failures, retries and fail-closed handling of unknown outcomes

use std::sync::Arc;

use samples_flow::api::models::annotation;
use samples_flow::api::{ApiError, InMemoryResourceClient, APPLICATION_MODEL, COMPONENT_MODEL};
use samples_flow::samples::{self, steps::*, SamplesPlanner};
use samples_flow::submission::{
    OperationStatus, ResourceSubmitter, SubmissionFailure, SESSION_ANNOTATION,
};
use samples_flow::wizard::{
    Navigation, NavigationDenied, SubmissionOutcome, SubmissionState, WizardSession, WizardState,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn backend() -> (
    InMemoryResourceClient,
    ResourceSubmitter<InMemoryResourceClient>,
) {
    let client = InMemoryResourceClient::new().with_project("team-a");
    let submitter = ResourceSubmitter::new(Arc::new(client.clone()), SamplesPlanner);
    (client, submitter)
}

/// Fill the application and component steps for a sample-based component
fn fill_to_samples_step(session: &mut WizardSession) {
    session.set_value(APPLICATION_NAME, "my-app");
    session.set_value(APPLICATION_DISPLAY_NAME, "My App");
    assert!(matches!(session.next(), Ok(Navigation::Moved { to: 1, .. })));

    session.set_value(COMPONENT_NAME, "backend");
    session.set_value(COMPONENT_SOURCE, SOURCE_SAMPLE);
    assert!(matches!(session.next(), Ok(Navigation::Moved { to: 2, .. })));
}

// ─── Happy Paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sample_flow_creates_application_and_component() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);

    assert_eq!(session.current_view().progress_label(), "Step 3 of 4");
    session.set_value(SAMPLE_ID, "java-springboot-basic");
    session.next().unwrap();
    assert!(session.is_last_step());

    let outcome = session.submit_with(&submitter).await.unwrap();
    let SubmissionOutcome::Submitted(receipt) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(receipt.resources.len(), 2);
    assert_eq!(session.state(), WizardState::Submitted);

    let component = client
        .stored(&COMPONENT_MODEL, "backend", Some("team-a"))
        .expect("component created in discovered namespace");
    assert_eq!(component["spec"]["application"], "my-app");
    assert_eq!(
        component["spec"]["source"]["git"]["url"],
        "https://github.com/devfile-samples/devfile-sample-java-springboot-basic"
    );
    assert_eq!(
        annotation(&component, SESSION_ANNOTATION),
        Some(session.id().to_string().as_str())
    );
}

#[tokio::test]
async fn test_git_flow_skips_samples_step() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    session.set_value(APPLICATION_NAME, "my-app");
    session.set_value(NAMESPACE, "pinned");
    session.next().unwrap();

    session.set_value(COMPONENT_NAME, "backend");
    session.set_value(COMPONENT_SOURCE, SOURCE_GIT);
    assert!(matches!(
        session.next(),
        Err(NavigationDenied::StepInvalid { .. })
    ));
    session.set_value(COMPONENT_GIT_URL, "https://github.com/org/repo");
    assert_eq!(
        session.next().unwrap(),
        Navigation::Moved { from: 1, to: 3 }
    );
    assert_eq!(session.current_view().progress_label(), "Step 3 of 3");

    session.submit_with(&submitter).await.unwrap();
    assert!(client
        .stored(&APPLICATION_MODEL, "my-app", Some("pinned"))
        .is_some());
}

// ─── Failure Handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_partial_failure_then_retry_resumes() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);
    session.set_value(SAMPLE_ID, "nodejs-basic");
    session.next().unwrap();

    client.fail_next(
        "create",
        Some("Component"),
        ApiError::http("Component/backend", 422, "spec.source is invalid"),
    );
    let draft_before = session.draft().clone();

    let outcome = session.submit_with(&submitter).await.unwrap();
    match outcome {
        SubmissionOutcome::Failed(SubmissionFailure::Partial { created, .. }) => {
            assert_eq!(created.len(), 1);
            assert_eq!(created[0].kind, "Application");
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(session.state(), WizardState::AtStep(3));
    assert_eq!(session.draft(), &draft_before);
    assert!(matches!(
        session.submission_state(),
        SubmissionState::Failed(_)
    ));

    let ledger = submitter.ledger(session.id()).unwrap();
    assert_eq!(ledger.status("application"), Some(OperationStatus::Created));

    let outcome = session.submit_with(&submitter).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
    assert_eq!(client.count("create", "Application"), 1);
    assert_eq!(session.attempt(), 2);
}

#[tokio::test]
async fn test_unknown_outcome_fails_closed() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);
    session.set_value(SAMPLE_ID, "python-basic");
    session.next().unwrap();

    client.fail_after_applying(
        "create",
        Some("Application"),
        ApiError::http("Application/my-app", 504, "gateway timeout"),
    );
    let outcome = session.submit_with(&submitter).await.unwrap();
    let SubmissionOutcome::Failed(failure) = outcome else {
        panic!("expected failure");
    };
    assert!(failure.requires_verification());

    // the retry finds the application it created and adopts it
    let outcome = session.submit_with(&submitter).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Submitted(_)));
    assert_eq!(client.count("create", "Component"), 1);
}

#[tokio::test]
async fn test_abort_during_submission_discards_result() {
    let (_client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);
    session.set_value(SAMPLE_ID, "java-springboot-basic");
    session.next().unwrap();

    let Navigation::Submit(request) = session.next().unwrap() else {
        panic!("expected submission to start");
    };
    assert!(session.abort());

    let result = samples_flow::submission::SubmissionAdapter::submit(&submitter, &request).await;
    assert!(result.is_ok());
    assert_eq!(
        session.finish_submission(&request, result),
        SubmissionOutcome::Ignored
    );
    assert_eq!(session.state(), WizardState::Aborted);
    assert!(session.draft().is_empty());
}

#[tokio::test]
async fn test_abort_after_failure_drops_ledger() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);
    session.set_value(SAMPLE_ID, "nodejs-basic");
    session.next().unwrap();

    client.fail_next(
        "create",
        Some("Component"),
        ApiError::http("Component/backend", 422, "spec.source is invalid"),
    );
    let outcome = session.submit_with(&submitter).await.unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Failed(_)));
    assert!(submitter.ledger(session.id()).is_some());

    assert!(session.abort_with(&submitter));
    assert!(submitter.ledger(session.id()).is_none());
    assert_eq!(session.state(), WizardState::Aborted);
}

#[tokio::test]
async fn test_renamed_application_after_failure_is_reported() {
    let (client, submitter) = backend();
    let mut session = samples::new_session().unwrap();
    fill_to_samples_step(&mut session);
    session.set_value(SAMPLE_ID, "nodejs-basic");
    session.next().unwrap();

    client.fail_next(
        "create",
        Some("Component"),
        ApiError::http("Component/backend", 422, "spec.source is invalid"),
    );
    session.submit_with(&submitter).await.unwrap();

    session.go_to(0).unwrap();
    session.set_value(APPLICATION_NAME, "renamed-app");
    session.go_to(3).unwrap();
    client.fail_next(
        "create",
        Some("Application"),
        ApiError::http("Application/renamed-app", 422, "quota exceeded"),
    );
    let outcome = session.submit_with(&submitter).await.unwrap();
    let SubmissionOutcome::Failed(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    let existing = failure.existing_resources();
    assert_eq!(existing.len(), 1);
    assert_eq!(existing[0].name, "my-app");

    let SubmissionOutcome::Submitted(receipt) = session.submit_with(&submitter).await.unwrap()
    else {
        panic!("expected success");
    };
    assert_eq!(receipt.orphans.len(), 1);
    assert_eq!(receipt.orphans[0].name, "my-app");
}
