//! Ledger-backed submission against a [`ResourceClient`]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::ledger::{Ledger, OperationStatus};
use super::plan::{PlannedOperation, SubmissionPlanner};
use super::{
    SubmissionAdapter, SubmissionFailure, SubmissionReceipt, SubmissionRequest,
    SESSION_ANNOTATION,
};
use crate::api::models::{annotation, set_annotation, ResourceRef};
use crate::api::namespace::{discover_namespace, DEFAULT_NAMESPACE};
use crate::api::{ApiError, ResourceClient};
use crate::wizard::Draft;

/// Draft path that pins the target namespace
pub const NAMESPACE_PATH: &str = "namespace";

/// Creates the planned resources in order, resuming from earlier attempts
pub struct ResourceSubmitter<C: ResourceClient + ?Sized> {
    client: Arc<C>,
    planner: Box<dyn SubmissionPlanner>,
    namespace: Option<String>,
    ledgers: Mutex<HashMap<Uuid, Slot>>,
}

/// Ledger bookkeeping for one session
enum Slot {
    Idle(Ledger),
    /// A submission holds the ledger
    InFlight,
}

impl<C: ResourceClient + ?Sized> ResourceSubmitter<C> {
    pub fn new(client: Arc<C>, planner: impl SubmissionPlanner + 'static) -> Self {
        Self {
            client,
            planner: Box::new(planner),
            namespace: None,
            ledgers: Mutex::new(HashMap::new()),
        }
    }

    /// Namespace used when the draft does not name one
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.trim().is_empty());
        self
    }

    /// Snapshot of the ledger kept for `session_id`
    pub fn ledger(&self, session_id: Uuid) -> Option<Ledger> {
        match self.ledgers().get(&session_id) {
            Some(Slot::Idle(ledger)) => Some(ledger.clone()),
            _ => None,
        }
    }

    /// Drop the ledger of a session that will not retry.
    ///
    /// A submission still running for the session drops its ledger when it
    /// returns.
    pub fn forget(&self, session_id: Uuid) {
        if self.ledgers().remove(&session_id).is_some() {
            debug!(session = %session_id, "ledger discarded");
        }
    }

    fn ledgers(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.ledgers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the ledger for a new attempt, marking the session in flight
    fn check_out(&self, session_id: Uuid) -> Ledger {
        match self.ledgers().insert(session_id, Slot::InFlight) {
            Some(Slot::Idle(ledger)) => ledger,
            _ => Ledger::default(),
        }
    }

    /// Keep the ledger of a failed attempt, unless the session was forgotten
    /// in the meantime
    fn check_in(&self, session_id: Uuid, ledger: Ledger) {
        match self.ledgers().get_mut(&session_id) {
            Some(slot) => *slot = Slot::Idle(ledger),
            None => debug!(session = %session_id, "session forgotten during submission"),
        }
    }

    /// Draft value, then configuration, then the first visible project
    pub async fn resolve_namespace(&self, draft: &Draft) -> String {
        if let Some(ns) = draft.text(NAMESPACE_PATH) {
            return ns.to_string();
        }
        if let Some(ns) = &self.namespace {
            return ns.clone();
        }
        match discover_namespace(self.client.as_ref()).await {
            Ok(Some(ns)) => ns,
            Ok(None) => {
                warn!("No projects visible, using namespace {}", DEFAULT_NAMESPACE);
                DEFAULT_NAMESPACE.to_string()
            }
            Err(err) => {
                warn!(
                    "Namespace discovery failed ({}), using namespace {}",
                    err, DEFAULT_NAMESPACE
                );
                DEFAULT_NAMESPACE.to_string()
            }
        }
    }

    /// Run the plan; the ledger is updated in place
    async fn execute(
        &self,
        request: &SubmissionRequest,
        ledger: &mut Ledger,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        let namespace = self.resolve_namespace(&request.draft).await;
        let mut plan = self
            .planner
            .plan(&request.draft, &namespace)
            .map_err(|e| SubmissionFailure::InvalidDraft(e.to_string()))?;
        let session = request.session_id.to_string();
        for op in &mut plan {
            set_annotation(&mut op.payload, SESSION_ANNOTATION, &session);
        }

        ledger.start_attempt();

        for (index, op) in plan.iter().enumerate() {
            let fingerprint = op.fingerprint();
            let resource = op.resource_ref();
            if let Some(previous) = ledger.retire(&op.key, &resource) {
                warn!("{} replaces {} from an earlier attempt", resource, previous);
            }

            match self.apply(op, &fingerprint, &session, ledger).await {
                Ok(status) => {
                    debug!(operation = %op.key, ?status, "operation complete");
                    ledger.record(&op.key, resource, fingerprint, status, None);
                }
                Err(err) => {
                    ledger.record(
                        &op.key,
                        resource,
                        fingerprint,
                        OperationStatus::Failed,
                        Some(err.to_string()),
                    );
                    let remaining = plan[index + 1..].iter().map(|o| o.key.clone()).collect();
                    return Err(classify(op, &err, ledger.existing(), remaining));
                }
            }
        }

        Ok(SubmissionReceipt {
            session_id: request.session_id,
            resources: plan.iter().map(PlannedOperation::resource_ref).collect(),
            orphans: ledger.orphans().to_vec(),
            completed_at: Utc::now(),
        })
    }

    /// Bring one planned resource into existence, reusing earlier work
    async fn apply(
        &self,
        op: &PlannedOperation,
        fingerprint: &str,
        session: &str,
        ledger: &Ledger,
    ) -> Result<OperationStatus, ApiError> {
        // renamed resources were retired before this call
        let previous = ledger.entry(&op.key).filter(|e| e.status.exists());
        match previous {
            Some(entry) if entry.fingerprint == fingerprint => Ok(OperationStatus::Skipped),
            Some(_) => {
                self.replace(op).await?;
                Ok(OperationStatus::Updated)
            }
            None => self.create(op, session).await,
        }
    }

    /// Create, adopting a same-session resource on conflict
    async fn create(
        &self,
        op: &PlannedOperation,
        session: &str,
    ) -> Result<OperationStatus, ApiError> {
        let err = match self.client.create(&op.model, &op.payload).await {
            Ok(_) => return Ok(OperationStatus::Created),
            Err(err) if err.is_conflict() => err,
            Err(err) => return Err(err),
        };

        let existing = self
            .client
            .get(&op.model, &op.name, op.namespace.as_deref())
            .await?;
        if annotation(&existing, SESSION_ANNOTATION) != Some(session) {
            return Err(err);
        }

        info!("Adopting {} created by an earlier attempt", op.label());
        if existing.get("spec") == op.payload.get("spec") {
            Ok(OperationStatus::Adopted)
        } else {
            self.put(op, &existing).await?;
            Ok(OperationStatus::Updated)
        }
    }

    /// Replace a resource this session created earlier
    async fn replace(&self, op: &PlannedOperation) -> Result<(), ApiError> {
        let current = self
            .client
            .get(&op.model, &op.name, op.namespace.as_deref())
            .await?;
        self.put(op, &current).await
    }

    /// PUT the planned payload, carrying over the server's resourceVersion
    async fn put(&self, op: &PlannedOperation, current: &Value) -> Result<(), ApiError> {
        let mut payload = op.payload.clone();
        if let Some(version) = current.pointer("/metadata/resourceVersion") {
            payload["metadata"]["resourceVersion"] = version.clone();
        }
        self.client
            .update(&op.model, &op.name, op.namespace.as_deref(), &payload)
            .await
            .map(|_| ())
    }
}

/// Decide between total, partial and unverified failure
fn classify(
    op: &PlannedOperation,
    err: &ApiError,
    existing: Vec<ResourceRef>,
    remaining: Vec<String>,
) -> SubmissionFailure {
    if !err.is_definitive() {
        return SubmissionFailure::Total {
            operation: op.label(),
            reason: err.to_string(),
            unverified: true,
            existing,
        };
    }
    if existing.is_empty() {
        SubmissionFailure::Total {
            operation: op.label(),
            reason: err.to_string(),
            unverified: false,
            existing,
        }
    } else {
        SubmissionFailure::Partial {
            created: existing,
            failed: op.label(),
            remaining,
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl<C: ResourceClient + ?Sized> SubmissionAdapter for ResourceSubmitter<C> {
    #[instrument(skip_all, fields(session = %request.session_id, attempt = request.attempt))]
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionFailure> {
        let mut ledger = self.check_out(request.session_id);

        let result = self.execute(request, &mut ledger).await;
        match &result {
            Ok(receipt) => {
                info!(
                    "Submission complete: {} resource(s) in place",
                    receipt.resources.len()
                );
                self.ledgers().remove(&request.session_id);
            }
            Err(failure) => {
                warn!("Submission failed: {}", failure);
                self.check_in(request.session_id, ledger);
            }
        }
        result
    }

    fn discard(&self, session_id: Uuid) {
        self.forget(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{APPLICATION_MODEL, COMPONENT_MODEL};
    use crate::api::InMemoryResourceClient;
    use crate::submission::PlanError;
    use serde_json::json;

    /// Application plus component, named from the draft
    struct TwoStepPlanner;

    impl SubmissionPlanner for TwoStepPlanner {
        fn plan(&self, draft: &Draft, namespace: &str) -> Result<Vec<PlannedOperation>, PlanError> {
            let app = draft
                .text("app")
                .ok_or_else(|| PlanError("app is required".into()))?;
            let mut application = APPLICATION_MODEL.object(app, Some(namespace));
            application["spec"] = json!({"displayName": draft.text("display").unwrap_or(app)});
            let mut component = COMPONENT_MODEL.object("backend", Some(namespace));
            component["spec"] = json!({"application": app});
            Ok(vec![
                PlannedOperation::new("application", APPLICATION_MODEL, application)?,
                PlannedOperation::new("component", COMPONENT_MODEL, component)?,
            ])
        }
    }

    fn request(session_id: Uuid, attempt: u32, draft: &Draft) -> SubmissionRequest {
        SubmissionRequest {
            session_id,
            attempt,
            draft: draft.clone(),
        }
    }

    fn draft(app: &str) -> Draft {
        let mut draft = Draft::new();
        draft.set("app", app);
        draft
    }

    fn setup() -> (InMemoryResourceClient, ResourceSubmitter<InMemoryResourceClient>) {
        let client = InMemoryResourceClient::new();
        let submitter = ResourceSubmitter::new(Arc::new(client.clone()), TwoStepPlanner)
            .with_namespace(Some("team-a".into()));
        (client, submitter)
    }

    #[tokio::test]
    async fn test_creates_in_order_and_annotates() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        let receipt = submitter.submit(&request(id, 1, &draft("my-app"))).await.unwrap();

        assert_eq!(receipt.resources.len(), 2);
        assert_eq!(receipt.resources[0].kind, "Application");
        let calls = client.calls();
        assert_eq!(calls[0].kind, "Application");
        assert_eq!(calls[1].kind, "Component");

        let stored = client
            .stored(&APPLICATION_MODEL, "my-app", Some("team-a"))
            .unwrap();
        assert_eq!(
            annotation(&stored, SESSION_ANNOTATION),
            Some(id.to_string().as_str())
        );
        // ledgers are dropped once a session succeeds
        assert!(submitter.ledger(id).is_none());
    }

    #[tokio::test]
    async fn test_first_operation_failure_is_total() {
        let (client, submitter) = setup();
        client.fail_next("create", Some("Application"), ApiError::http("x", 422, "bad"));

        let err = submitter
            .submit(&request(Uuid::new_v4(), 1, &draft("my-app")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionFailure::Total { unverified: false, ref existing, .. } if existing.is_empty()
        ));
        assert!(client.is_empty());
    }

    #[tokio::test]
    async fn test_later_failure_is_partial_and_retry_resumes() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_next("create", Some("Component"), ApiError::http("x", 422, "bad"));

        let err = submitter.submit(&request(id, 1, &draft("my-app"))).await.unwrap_err();
        match &err {
            SubmissionFailure::Partial { created, failed, remaining, .. } => {
                assert_eq!(created.len(), 1);
                assert_eq!(failed, "Component/backend");
                assert!(remaining.is_empty());
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        let ledger = submitter.ledger(id).unwrap();
        assert_eq!(ledger.status("application"), Some(OperationStatus::Created));
        assert_eq!(ledger.status("component"), Some(OperationStatus::Failed));

        submitter.submit(&request(id, 2, &draft("my-app"))).await.unwrap();
        assert_eq!(client.count("create", "Application"), 1);
        assert_eq!(client.count("create", "Component"), 2);
    }

    #[tokio::test]
    async fn test_retry_updates_changed_payload() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_next("create", Some("Component"), ApiError::http("x", 422, "bad"));
        submitter.submit(&request(id, 1, &draft("my-app"))).await.unwrap_err();

        let mut edited = draft("my-app");
        edited.set("display", "My App");
        submitter.submit(&request(id, 2, &edited)).await.unwrap();

        assert_eq!(client.count("create", "Application"), 1);
        assert_eq!(client.count("update", "Application"), 1);
        let stored = client
            .stored(&APPLICATION_MODEL, "my-app", Some("team-a"))
            .unwrap();
        assert_eq!(stored["spec"]["displayName"], "My App");
    }

    #[tokio::test]
    async fn test_renamed_resource_reports_orphan() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_next("create", Some("Component"), ApiError::http("x", 422, "bad"));
        submitter.submit(&request(id, 1, &draft("old-name"))).await.unwrap_err();

        let receipt = submitter.submit(&request(id, 2, &draft("new-name"))).await.unwrap();
        assert_eq!(receipt.orphans.len(), 1);
        assert_eq!(receipt.orphans[0].name, "old-name");
        assert_eq!(client.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_rename_still_reports_earlier_resource() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_next("create", Some("Component"), ApiError::http("x", 422, "bad"));
        submitter.submit(&request(id, 1, &draft("old-name"))).await.unwrap_err();

        client.fail_next("create", Some("Application"), ApiError::http("x", 422, "bad"));
        let err = submitter.submit(&request(id, 2, &draft("new-name"))).await.unwrap_err();
        let old = ResourceRef::new(&APPLICATION_MODEL, "old-name", Some("team-a"));
        match &err {
            SubmissionFailure::Partial { created, failed, .. } => {
                assert_eq!(created, &vec![old.clone()]);
                assert_eq!(failed, "Application/new-name");
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(client.len(), 1);

        let receipt = submitter.submit(&request(id, 3, &draft("new-name"))).await.unwrap();
        assert_eq!(receipt.orphans, vec![old]);
        assert_eq!(client.len(), 3);
    }

    #[tokio::test]
    async fn test_forget_drops_failed_session_ledger() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_next("create", Some("Component"), ApiError::http("x", 422, "bad"));
        submitter.submit(&request(id, 1, &draft("my-app"))).await.unwrap_err();
        assert!(submitter.ledger(id).is_some());

        submitter.discard(id);
        assert!(submitter.ledger(id).is_none());
        assert!(submitter.ledgers().is_empty());
    }

    #[test]
    fn test_forget_while_in_flight_drops_returning_ledger() {
        let (_client, submitter) = setup();
        let id = Uuid::new_v4();
        let ledger = submitter.check_out(id);
        assert!(submitter.ledger(id).is_none());

        submitter.forget(id);
        submitter.check_in(id, ledger);
        assert!(submitter.ledgers().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_outcome_fails_closed_then_adopts() {
        let (client, submitter) = setup();
        let id = Uuid::new_v4();
        client.fail_after_applying(
            "create",
            Some("Application"),
            ApiError::network("Application/my-app", "connection reset"),
        );

        let err = submitter.submit(&request(id, 1, &draft("my-app"))).await.unwrap_err();
        assert!(err.requires_verification());
        assert!(err.existing_resources().is_empty());

        submitter.submit(&request(id, 2, &draft("my-app"))).await.unwrap();
        assert_eq!(client.count("create", "Application"), 2);
        assert_eq!(client.count("get", "Application"), 1);
        assert_eq!(client.len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_with_foreign_resource_fails() {
        let (client, submitter) = setup();
        let mut foreign = APPLICATION_MODEL.object("my-app", Some("team-a"));
        set_annotation(&mut foreign, SESSION_ANNOTATION, "someone-else");
        client.insert(&APPLICATION_MODEL, foreign);

        let err = submitter
            .submit(&request(Uuid::new_v4(), 1, &draft("my-app")))
            .await
            .unwrap_err();
        match err {
            SubmissionFailure::Total { reason, unverified, .. } => {
                assert!(!unverified);
                assert!(reason.contains("Already exists"));
            }
            other => panic!("expected total failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_draft() {
        let (client, submitter) = setup();
        let err = submitter
            .submit(&request(Uuid::new_v4(), 1, &Draft::new()))
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionFailure::InvalidDraft("app is required".into()));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_resolution_order() {
        let client = InMemoryResourceClient::new().with_project("discovered");
        let submitter = ResourceSubmitter::new(Arc::new(client.clone()), TwoStepPlanner);

        let mut pinned = draft("a");
        pinned.set(NAMESPACE_PATH, "from-draft");
        assert_eq!(submitter.resolve_namespace(&pinned).await, "from-draft");
        assert_eq!(submitter.resolve_namespace(&draft("a")).await, "discovered");

        let configured = ResourceSubmitter::new(Arc::new(client), TwoStepPlanner)
            .with_namespace(Some("configured".into()));
        assert_eq!(configured.resolve_namespace(&draft("a")).await, "configured");

        let empty = ResourceSubmitter::new(Arc::new(InMemoryResourceClient::new()), TwoStepPlanner);
        assert_eq!(empty.resolve_namespace(&draft("a")).await, DEFAULT_NAMESPACE);
    }
}
