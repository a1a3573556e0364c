//! RevisionReconciler — one reconcile pass for one revision key.
//!
//! # Pass
//!
//! ```text
//!   load revision ── absent ─► done
//!        │
//!   seed conditions, log URL
//!        │
//!   build gate ── missing ─► persist, BuildNotFound (retry)
//!        │        running ─► persist, stop
//!        │        failed  ─► persist, stop (terminal)
//!        ▼
//!   PodAutoscaler ─► Deployment ─► Image ─► [ConfigMap] ─► Service
//!        │            (each synced even if an earlier one failed)
//!        ▼
//!   fold outcomes + endpoints + autoscaler readiness into conditions
//!        │
//!   refresh Ready, persist status if it changed
//!        │
//!   Children(failures) if any child failed
//! ```
//!
//! The pass holds no state between invocations. A pass interrupted
//! after some children were written converges from there on the next
//! attempt. Re-running a converged pass writes nothing.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use surge_state::{
    Build, ConditionStatus, Deployment, Endpoints, PodAutoscaler, Revision, RevisionCondition,
    Service,
};
use tracing::{debug, info, warn};

use crate::client::ObjectClient;
use crate::config::ReconcilerConfig;
use crate::controller::Reconciler;
use crate::error::{ChildFailure, ChildKind, ReconcileError, ReconcileResult, Verb};
use crate::key::split_key;
use crate::resources::{
    make_deployment, make_fluentd_config_map, make_image_cache, make_pod_autoscaler, make_service,
};
use crate::sync::{
    reconcile_child, ConfigMapSync, DeploymentSync, ImageSync, Outcome, PodAutoscalerSync,
    ServiceSync, Synchronizer,
};

/// Source of "now" in unix seconds.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

const PROGRESS_DEADLINE_REASON: &str = "ProgressDeadlineExceeded";
const SERVICE_TIMEOUT_REASON: &str = "ServiceTimeout";

pub struct RevisionReconciler<C> {
    client: Arc<C>,
    config: ReconcilerConfig,
    clock: Clock,
}

impl<C: ObjectClient> RevisionReconciler<C> {
    pub fn new(client: Arc<C>, config: ReconcilerConfig) -> Self {
        Self {
            client,
            config,
            clock: Arc::new(epoch_secs),
        }
    }

    /// Replace the wall clock (tests pin it).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Reconcile the revision named by a `namespace/name` key.
    pub fn reconcile(&self, key: &str) -> ReconcileResult<()> {
        let (namespace, name) = split_key(key)?;
        let Some(original) = self.client.get::<Revision>(namespace, name)? else {
            debug!(key, "revision no longer exists");
            return Ok(());
        };

        let now = (self.clock)();
        let mut rev = original.clone();
        let result = self.reconcile_revision(&mut rev, now);
        rev.status.conditions.refresh_ready(now);

        if rev.status != original.status {
            if let Err(source) = self.client.update(&rev) {
                let children = match result {
                    Err(ReconcileError::Children(children)) => children,
                    _ => Vec::new(),
                };
                return Err(ReconcileError::StatusUpdate { source, children });
            }
            let ready = rev.status.conditions.ready().map(|c| c.status);
            info!(key, ready = ?ready, "revision status updated");
        }

        result
    }

    fn reconcile_revision(&self, rev: &mut Revision, now: u64) -> ReconcileResult<()> {
        rev.status.conditions.initialize(now);
        rev.status.log_url = self.config.log_url(&rev.meta.uid);

        if !self.check_build(rev, now)? {
            return Ok(());
        }

        let client = self.client.as_ref();
        let desired_deployment = make_deployment(rev, &self.config);
        let desired_image = make_image_cache(rev, &desired_deployment);

        let autoscaler =
            reconcile_child::<PodAutoscalerSync, _>(client, make_pod_autoscaler(rev));
        let deployment = reconcile_child::<DeploymentSync, _>(client, desired_deployment);
        let image = reconcile_child::<ImageSync, _>(client, desired_image);
        let config_map = self
            .config
            .observability
            .enable_var_log_collection
            .then(|| {
                let desired = make_fluentd_config_map(rev, &self.config.observability);
                reconcile_child::<ConfigMapSync, _>(client, desired)
            });
        let desired_service = make_service(rev);
        rev.status.service_name = Some(desired_service.meta.name.clone());
        let service = reconcile_child::<ServiceSync, _>(client, desired_service);

        self.fold_rollout(rev, &deployment, &service, now);
        let endpoints = self.fold_endpoints(rev, &service, now);
        fold_autoscaler(rev, &autoscaler, now);

        let failures: Vec<ChildFailure> = [
            autoscaler.into_failure(PodAutoscalerSync::KIND),
            deployment.into_failure(DeploymentSync::KIND),
            image.into_failure(ImageSync::KIND),
            config_map.and_then(|o| o.into_failure(ConfigMapSync::KIND)),
            service.into_failure(ServiceSync::KIND),
            endpoints,
        ]
        .into_iter()
        .flatten()
        .collect();

        if failures.is_empty() {
            return Ok(());
        }
        for f in &failures {
            warn!(key = %rev.meta.key(), kind = %f.kind, verb = %f.verb, error = %f.error, "child sync failed");
        }
        Err(ReconcileError::Children(failures))
    }

    /// Apply the build gate. Returns whether children may be synced.
    fn check_build(&self, rev: &mut Revision, now: u64) -> ReconcileResult<bool> {
        let conditions = &mut rev.status.conditions;
        let Some(build_name) = rev.spec.build_ref.as_deref() else {
            conditions.set(
                RevisionCondition::BuildSucceeded,
                ConditionStatus::True,
                "NoBuild",
                "",
                now,
            );
            return Ok(true);
        };

        let namespace = rev.meta.namespace.as_str();
        let Some(build) = self.client.get::<Build>(namespace, build_name)? else {
            return Err(ReconcileError::BuildNotFound {
                namespace: namespace.to_string(),
                name: build_name.to_string(),
            });
        };

        let succeeded = build.status.succeeded.unwrap_or_default();
        match succeeded.status {
            ConditionStatus::True => {
                conditions.mark_true(RevisionCondition::BuildSucceeded, now);
                Ok(true)
            }
            ConditionStatus::False => {
                if conditions.mark_false(
                    RevisionCondition::BuildSucceeded,
                    succeeded.reason,
                    succeeded.message,
                    now,
                ) {
                    info!(key = %rev.meta.key(), build = build_name, "build failed");
                }
                Ok(false)
            }
            ConditionStatus::Unknown => {
                let reason = if succeeded.reason.is_empty() {
                    "Building".to_string()
                } else {
                    succeeded.reason
                };
                conditions.mark_unknown(
                    RevisionCondition::BuildSucceeded,
                    reason,
                    succeeded.message,
                    now,
                );
                Ok(false)
            }
        }
    }

    /// Record the deployment and service rollouts that this pass started.
    fn fold_rollout(
        &self,
        rev: &mut Revision,
        deployment: &Outcome<Deployment>,
        service: &Outcome<Service>,
        now: u64,
    ) {
        let conditions = &mut rev.status.conditions;
        for reason in [rollout_reason(deployment), rollout_reason(service)]
            .into_iter()
            .flatten()
        {
            conditions.mark_unknown(RevisionCondition::ResourcesAvailable, reason, "", now);
            conditions.mark_unknown(RevisionCondition::ContainerHealthy, reason, "", now);
        }

        if let Some(deploy) = deployment.object()
            && deploy.status.conditions.iter().any(|c| {
                c.kind == "Progressing"
                    && c.status == ConditionStatus::False
                    && c.reason == PROGRESS_DEADLINE_REASON
            })
        {
            conditions.mark_false(
                RevisionCondition::ResourcesAvailable,
                PROGRESS_DEADLINE_REASON,
                format!(
                    "Unable to create pods for more than {} seconds.",
                    deploy.spec.progress_deadline_secs
                ),
                now,
            );
        }
    }

    /// Fold endpoint readiness behind a service this pass left unchanged.
    fn fold_endpoints(
        &self,
        rev: &mut Revision,
        service: &Outcome<Service>,
        now: u64,
    ) -> Option<ChildFailure> {
        let Outcome::NoOp(svc) = service else {
            return None;
        };
        let endpoints = match self
            .client
            .get::<Endpoints>(&svc.meta.namespace, &svc.meta.name)
        {
            Ok(Some(endpoints)) => endpoints,
            Ok(None) => return None,
            Err(error) => {
                return Some(ChildFailure {
                    kind: ChildKind::Endpoints,
                    verb: Verb::Get,
                    error,
                });
            }
        };

        let conditions = &mut rev.status.conditions;
        if endpoints.is_ready() {
            conditions.mark_true(RevisionCondition::ResourcesAvailable, now);
            conditions.mark_true(RevisionCondition::ContainerHealthy, now);
            return None;
        }

        let waiting_since = conditions
            .get(RevisionCondition::ResourcesAvailable)
            .filter(|c| c.status == ConditionStatus::Unknown)
            .map(|c| c.last_transition_time);
        if let Some(since) = waiting_since
            && now.saturating_sub(since) > self.config.service_timeout_secs
        {
            conditions.mark_false(
                RevisionCondition::ResourcesAvailable,
                SERVICE_TIMEOUT_REASON,
                "Timed out waiting for a service endpoint to become ready",
                now,
            );
        }
        None
    }
}

impl<C: ObjectClient + 'static> Reconciler for RevisionReconciler<C> {
    const NAME: &'static str = "revision";

    fn keys(&self) -> ReconcileResult<Vec<String>> {
        let revisions: Vec<Revision> = self.client.list()?;
        Ok(revisions.iter().map(|rev| rev.meta.key()).collect())
    }

    fn reconcile(&self, key: &str) -> ReconcileResult<()> {
        RevisionReconciler::reconcile(self, key)
    }
}

/// Propagate the autoscaler's readiness into `Active`.
fn fold_autoscaler(rev: &mut Revision, autoscaler: &Outcome<PodAutoscaler>, now: u64) {
    let Some(pa) = autoscaler.object() else {
        return;
    };
    let conditions = &mut rev.status.conditions;
    let active = RevisionCondition::Active;
    match pa.status.conditions.ready() {
        None => {
            conditions.mark_unknown(active, "Deploying", "", now);
        }
        Some(ready) => {
            conditions.set(
                active,
                ready.status,
                ready.reason.clone(),
                ready.message.clone(),
                now,
            );
        }
    }
}

fn rollout_reason<R>(outcome: &Outcome<R>) -> Option<&'static str> {
    match outcome {
        Outcome::Created(_)
        | Outcome::Error {
            verb: Verb::Create, ..
        } => Some("Deploying"),
        Outcome::Updated(_) => Some("Updating"),
        Outcome::NoOp(_) | Outcome::Error { .. } => None,
    }
}

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use surge_state::{
        Condition, ConfigMap, DeploymentCondition, EndpointSubset, ObjectMeta,
        PodAutoscalerCondition,
    };

    use super::*;
    use crate::resources::names;
    use crate::testing::RecordingClient;

    const NOW: u64 = 1_000;
    const KEY: &str = "foo/bar";

    struct Harness {
        client: Arc<RecordingClient>,
        reconciler: RevisionReconciler<RecordingClient>,
        clock: Arc<AtomicU64>,
    }

    impl Harness {
        fn new(config: ReconcilerConfig) -> Self {
            let client = Arc::new(RecordingClient::new());
            let clock = Arc::new(AtomicU64::new(NOW));
            let tick = clock.clone();
            let reconciler = RevisionReconciler::new(client.clone(), config)
                .with_clock(Arc::new(move || tick.load(Ordering::SeqCst)));
            Self {
                client,
                reconciler,
                clock,
            }
        }

        fn advance(&self, secs: u64) {
            self.clock.fetch_add(secs, Ordering::SeqCst);
        }

        fn revision(&self) -> Revision {
            self.client.fetch("foo", "bar").unwrap()
        }

        fn condition(&self, ty: RevisionCondition) -> Condition {
            self.revision().status.conditions.get(ty).cloned().unwrap()
        }

        fn ready(&self) -> Condition {
            self.revision().status.conditions.ready().cloned().unwrap()
        }

        fn set_endpoints(&self, ready: bool) {
            let subset = if ready {
                EndpointSubset {
                    addresses: vec!["10.0.0.1:8012".into()],
                    not_ready_addresses: vec![],
                }
            } else {
                EndpointSubset {
                    addresses: vec![],
                    not_ready_addresses: vec!["10.0.0.1:8012".into()],
                }
            };
            let endpoints = Endpoints {
                meta: ObjectMeta::new("foo", &names::service(&test_revision())),
                subsets: vec![subset],
            };
            if self
                .client
                .fetch::<Endpoints>("foo", &endpoints.meta.name)
                .is_some()
            {
                self.client.replace(&endpoints);
            } else {
                self.client.seed(&endpoints);
            }
        }

        fn set_autoscaler_ready(&self, status: ConditionStatus, reason: &str, message: &str) {
            let name = names::pod_autoscaler(&test_revision());
            let mut pa: PodAutoscaler = self.client.fetch("foo", &name).unwrap();
            pa.status.conditions.set(
                PodAutoscalerCondition::Active,
                status,
                reason,
                message,
                NOW,
            );
            pa.status.conditions.refresh_ready(NOW);
            self.client.replace(&pa);
        }
    }

    fn test_config() -> ReconcilerConfig {
        let mut config = ReconcilerConfig::default();
        config.observability.logging_url_template = "http://logger.io/${REVISION_UID}".into();
        config
    }

    fn test_revision() -> Revision {
        let mut rev = Revision::new("foo", "bar", "busybox");
        rev.meta.uid = "test-uid".into();
        rev
    }

    fn seeded(config: ReconcilerConfig, rev: Revision) -> Harness {
        let h = Harness::new(config);
        h.client.seed(&rev);
        h
    }

    fn failed_kinds(err: &ReconcileError) -> Vec<(ChildKind, Verb)> {
        match err {
            ReconcileError::Children(failures)
            | ReconcileError::StatusUpdate {
                children: failures, ..
            } => failures.iter().map(|f| (f.kind, f.verb)).collect(),
            other => panic!("expected child failures, got {other:?}"),
        }
    }

    // ── Keys ────────────────────────────────────────────────────────

    #[test]
    fn malformed_key_is_rejected_without_io() {
        let h = Harness::new(test_config());
        let err = h.reconciler.reconcile("too/many/parts").unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidKey(_)));
        assert!(h.client.actions().is_empty());
    }

    #[test]
    fn missing_revision_is_ignored() {
        let h = Harness::new(test_config());
        h.reconciler.reconcile(KEY).unwrap();
        assert!(h.client.actions().is_empty());
    }

    // ── First pass and steady state ────────────────────────────────

    #[test]
    fn first_pass_creates_children_and_records_status() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(
            h.client.creates(),
            vec!["PodAutoscaler", "Deployment", "Image", "Service"]
        );
        assert_eq!(h.client.updates(), vec!["Revision"]);

        let rev = h.revision();
        assert_eq!(rev.status.service_name.as_deref(), Some("bar-service"));
        assert_eq!(rev.status.log_url.as_deref(), Some("http://logger.io/test-uid"));
        for ty in [
            RevisionCondition::ResourcesAvailable,
            RevisionCondition::ContainerHealthy,
            RevisionCondition::Active,
        ] {
            let cond = h.condition(ty);
            assert_eq!(cond.status, ConditionStatus::Unknown, "{ty:?}");
            assert_eq!(cond.reason, "Deploying", "{ty:?}");
            assert_eq!(cond.last_transition_time, NOW);
        }
        let build = h.condition(RevisionCondition::BuildSucceeded);
        assert_eq!(build.status, ConditionStatus::True);
        assert_eq!(build.reason, "NoBuild");

        let ready = h.ready();
        assert_eq!(ready.status, ConditionStatus::Unknown);
        assert_eq!(ready.reason, "Deploying");
    }

    #[test]
    fn converged_pass_writes_nothing() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        let before = h.revision();

        h.client.reset();
        h.advance(60);
        h.reconciler.reconcile(KEY).unwrap();

        assert!(h.client.creates().is_empty());
        assert!(h.client.updates().is_empty());
        assert_eq!(h.revision(), before);
    }

    #[test]
    fn status_update_failure_is_reported() {
        let h = seeded(test_config(), test_revision());
        h.client.induce_failure(Verb::Update, "Revision");

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert!(matches!(
            &err,
            ReconcileError::StatusUpdate { children, .. } if children.is_empty()
        ));
        assert!(err.is_retryable());
        // Children were still written.
        assert_eq!(h.client.creates().len(), 4);
        assert!(h.revision().status.conditions.ready().is_none());
    }

    // ── Child failures ─────────────────────────────────────────────

    #[test]
    fn failed_child_does_not_block_siblings() {
        let h = seeded(test_config(), test_revision());
        h.client.induce_failure(Verb::Create, "PodAutoscaler");

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert_eq!(
            failed_kinds(&err),
            vec![(ChildKind::PodAutoscaler, Verb::Create)]
        );
        assert!(h
            .client
            .fetch::<Deployment>("foo", "bar-deployment")
            .is_some());
        assert!(h.client.fetch::<Service>("foo", "bar-service").is_some());
        assert_eq!(h.client.updates(), vec!["Revision"]);
        // No autoscaler, so Active stays as initialized.
        assert_eq!(h.condition(RevisionCondition::Active).reason, "");
    }

    #[test]
    fn partial_failure_converges_on_retry() {
        let h = seeded(test_config(), test_revision());
        h.client.induce_failure(Verb::Create, "PodAutoscaler");
        h.reconciler.reconcile(KEY).unwrap_err();

        h.client.clear_failures();
        h.client.reset();
        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(h.client.creates(), vec!["PodAutoscaler"]);
        assert_eq!(h.condition(RevisionCondition::Active).reason, "Deploying");

        // Once the children report healthy the revision converges to Ready.
        h.set_endpoints(true);
        h.set_autoscaler_ready(ConditionStatus::True, "", "");
        h.client.reset();
        h.advance(5);
        h.reconciler.reconcile(KEY).unwrap();

        assert!(h.client.creates().is_empty());
        assert_eq!(h.client.updates(), vec!["Revision"]);
        let ready = h.ready();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.last_transition_time, NOW + 5);
    }

    #[test]
    fn failed_service_create_still_records_service_name() {
        let h = seeded(test_config(), test_revision());
        h.client.induce_failure(Verb::Create, "Service");

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert_eq!(failed_kinds(&err), vec![(ChildKind::Service, Verb::Create)]);
        assert_eq!(
            h.revision().status.service_name.as_deref(),
            Some("bar-service")
        );
        let ra = h.condition(RevisionCondition::ResourcesAvailable);
        assert_eq!(ra.status, ConditionStatus::Unknown);
        assert_eq!(ra.reason, "Deploying");
    }

    #[test]
    fn mutated_service_is_restored() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_endpoints(true);
        h.reconciler.reconcile(KEY).unwrap();
        assert_eq!(
            h.condition(RevisionCondition::ResourcesAvailable).status,
            ConditionStatus::True
        );

        let mut svc: Service = h.client.fetch("foo", "bar-service").unwrap();
        svc.spec.ports[0].port = 9999;
        h.client.replace(&svc);

        h.client.reset();
        h.advance(10);
        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(h.client.updates(), vec!["Service", "Revision"]);
        let fixed: Service = h.client.fetch("foo", "bar-service").unwrap();
        assert_eq!(fixed.spec.ports[0].port, 80);
        let ra = h.condition(RevisionCondition::ResourcesAvailable);
        assert_eq!(ra.status, ConditionStatus::Unknown);
        assert_eq!(ra.reason, "Updating");
        assert_eq!(ra.last_transition_time, NOW + 10);
    }

    #[test]
    fn failed_service_update_leaves_status_alone() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();

        let mut svc: Service = h.client.fetch("foo", "bar-service").unwrap();
        svc.spec.ports[0].port = 9999;
        h.client.replace(&svc);
        h.client.induce_failure(Verb::Update, "Service");

        h.client.reset();
        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert_eq!(failed_kinds(&err), vec![(ChildKind::Service, Verb::Update)]);
        assert_eq!(h.client.updates(), vec!["Service"]);
    }

    // ── Endpoints ──────────────────────────────────────────────────

    #[test]
    fn unready_endpoints_within_timeout_keep_deploying() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_endpoints(false);

        h.client.reset();
        h.advance(100);
        h.reconciler.reconcile(KEY).unwrap();

        assert!(h.client.updates().is_empty());
        assert_eq!(
            h.condition(RevisionCondition::ResourcesAvailable).reason,
            "Deploying"
        );
    }

    #[test]
    fn unready_endpoints_past_timeout_fail_the_revision() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_endpoints(false);

        h.advance(301);
        h.reconciler.reconcile(KEY).unwrap();

        let ra = h.condition(RevisionCondition::ResourcesAvailable);
        assert_eq!(ra.status, ConditionStatus::False);
        assert_eq!(ra.reason, "ServiceTimeout");
        assert_eq!(
            ra.message,
            "Timed out waiting for a service endpoint to become ready"
        );
        let ready = h.ready();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, "ServiceTimeout");
    }

    #[test]
    fn endpoints_read_failure_is_a_child_failure() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.client.induce_failure(Verb::Get, "Endpoints");

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert_eq!(failed_kinds(&err), vec![(ChildKind::Endpoints, Verb::Get)]);
    }

    // ── Autoscaler and deployment feedback ─────────────────────────

    #[test]
    fn ready_endpoints_and_active_autoscaler_make_revision_ready() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_endpoints(true);
        h.set_autoscaler_ready(ConditionStatus::True, "", "");

        h.client.reset();
        h.advance(5);
        h.reconciler.reconcile(KEY).unwrap();

        // Children already match: only the revision status is written.
        assert!(h.client.creates().is_empty());
        assert_eq!(h.client.updates(), vec!["Revision"]);
        let ready = h.ready();
        assert_eq!(ready.status, ConditionStatus::True);
        assert_eq!(ready.last_transition_time, NOW + 5);
        assert!(h.revision().status.conditions.is_ready());

        // Steady state: nothing at all is written.
        h.client.reset();
        h.advance(60);
        h.reconciler.reconcile(KEY).unwrap();
        assert!(h.client.creates().is_empty());
        assert!(h.client.updates().is_empty());
    }

    #[test]
    fn inactive_autoscaler_propagates_reason() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_endpoints(true);
        h.set_autoscaler_ready(ConditionStatus::False, "NoTraffic", "scaled to zero");

        h.reconciler.reconcile(KEY).unwrap();

        let active = h.condition(RevisionCondition::Active);
        assert_eq!(active.status, ConditionStatus::False);
        assert_eq!(active.reason, "NoTraffic");
        assert_eq!(active.message, "scaled to zero");
        assert_eq!(h.ready().reason, "NoTraffic");
    }

    #[test]
    fn activating_autoscaler_propagates_unknown() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();
        h.set_autoscaler_ready(ConditionStatus::Unknown, "Activating", "");

        h.reconciler.reconcile(KEY).unwrap();

        let active = h.condition(RevisionCondition::Active);
        assert_eq!(active.status, ConditionStatus::Unknown);
        assert_eq!(active.reason, "Activating");
    }

    #[test]
    fn progress_deadline_marks_resources_unavailable() {
        let h = seeded(test_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();

        let mut deploy: Deployment = h.client.fetch("foo", "bar-deployment").unwrap();
        deploy.status.conditions.push(DeploymentCondition {
            kind: "Progressing".into(),
            status: ConditionStatus::False,
            reason: "ProgressDeadlineExceeded".into(),
            message: String::new(),
        });
        h.client.replace(&deploy);

        h.reconciler.reconcile(KEY).unwrap();

        let ra = h.condition(RevisionCondition::ResourcesAvailable);
        assert_eq!(ra.status, ConditionStatus::False);
        assert_eq!(ra.reason, "ProgressDeadlineExceeded");
        assert_eq!(ra.message, "Unable to create pods for more than 120 seconds.");
        assert_eq!(h.ready().status, ConditionStatus::False);
    }

    // ── Build gate ─────────────────────────────────────────────────

    fn with_build() -> Revision {
        let mut rev = test_revision();
        rev.spec.build_ref = Some("the-build".into());
        rev
    }

    fn seed_build(h: &Harness, succeeded: Option<Condition>) {
        h.client.seed(&Build {
            meta: ObjectMeta::new("foo", "the-build"),
            status: surge_state::BuildStatus { succeeded },
        });
    }

    #[test]
    fn missing_build_is_retried_after_persisting_status() {
        let h = seeded(test_config(), with_build());

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert!(matches!(err, ReconcileError::BuildNotFound { ref name, .. } if name == "the-build"));
        assert!(err.is_retryable());
        assert!(h.client.creates().is_empty());
        assert_eq!(h.client.updates(), vec!["Revision"]);
        assert_eq!(
            h.revision().status.log_url.as_deref(),
            Some("http://logger.io/test-uid")
        );
    }

    #[test]
    fn running_build_blocks_children() {
        let h = seeded(test_config(), with_build());
        seed_build(&h, None);

        h.reconciler.reconcile(KEY).unwrap();

        assert!(h.client.creates().is_empty());
        let build = h.condition(RevisionCondition::BuildSucceeded);
        assert_eq!(build.status, ConditionStatus::Unknown);
        assert_eq!(build.reason, "Building");
    }

    #[test]
    fn finished_build_releases_children() {
        let h = seeded(test_config(), with_build());
        seed_build(
            &h,
            Some(Condition::new(ConditionStatus::True, "", "")),
        );

        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(h.client.creates().len(), 4);
        assert_eq!(
            h.condition(RevisionCondition::BuildSucceeded).status,
            ConditionStatus::True
        );
    }

    #[test]
    fn failed_build_is_terminal_and_stable() {
        let h = seeded(test_config(), with_build());
        seed_build(
            &h,
            Some(Condition::new(ConditionStatus::False, "StepFailed", "exit 1")),
        );

        h.reconciler.reconcile(KEY).unwrap();
        assert!(h.client.creates().is_empty());
        let build = h.condition(RevisionCondition::BuildSucceeded);
        assert_eq!(build.status, ConditionStatus::False);
        assert_eq!(build.reason, "StepFailed");
        assert_eq!(build.message, "exit 1");
        assert_eq!(h.ready().reason, "StepFailed");

        h.client.reset();
        h.advance(30);
        h.reconciler.reconcile(KEY).unwrap();
        assert!(h.client.actions().is_empty());
    }

    // ── Log collection ─────────────────────────────────────────────

    fn var_log_config() -> ReconcilerConfig {
        let mut config = test_config();
        config.observability.enable_var_log_collection = true;
        config
    }

    #[test]
    fn var_log_collection_adds_config_map() {
        let h = seeded(var_log_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(
            h.client.creates(),
            vec!["PodAutoscaler", "Deployment", "Image", "ConfigMap", "Service"]
        );
        let cm: ConfigMap = h.client.fetch("foo", "bar-fluentd").unwrap();
        let desired = make_fluentd_config_map(&test_revision(), &var_log_config().observability);
        assert_eq!(cm.data, desired.data);
    }

    #[test]
    fn config_map_create_failure_is_reported() {
        let h = seeded(var_log_config(), test_revision());
        h.client.induce_failure(Verb::Create, "ConfigMap");

        let err = h.reconciler.reconcile(KEY).unwrap_err();
        assert_eq!(
            failed_kinds(&err),
            vec![(ChildKind::ConfigMap, Verb::Create)]
        );
        assert!(h.client.fetch::<Service>("foo", "bar-service").is_some());
    }

    #[test]
    fn corrupted_config_map_is_restored() {
        let h = seeded(var_log_config(), test_revision());
        h.reconciler.reconcile(KEY).unwrap();

        let mut cm: ConfigMap = h.client.fetch("foo", "bar-fluentd").unwrap();
        cm.data.insert("varlog.conf".into(), "garbage".into());
        h.client.replace(&cm);

        h.client.reset();
        h.reconciler.reconcile(KEY).unwrap();

        assert_eq!(h.client.updates(), vec!["ConfigMap"]);
        let fixed: ConfigMap = h.client.fetch("foo", "bar-fluentd").unwrap();
        assert_ne!(fixed.data["varlog.conf"], "garbage");
    }
}
