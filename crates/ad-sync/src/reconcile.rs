//! Reconciliation controller: the state machine driving one compare & sync session.
//!
//! The controller owns the selected users, the last comparison, the pending
//! selection and the last outcome. After an apply it patches the comparison in
//! place from the selection that was sent, without asking the directory again.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use stockroom_core::config::GroupSyncConfig;
use stockroom_core::db::repository::StockroomRepository;
use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::directory::{DirectoryUser, GroupEntry};
use stockroom_core::models::group_sync::{
    ApplyBatchRequest, ApplyBatchResponse, ComparisonResult, SyncOutcome, SyncOutcomeStatus,
};

use crate::client::DirectoryClient;
use crate::debounce::{SearchDebouncer, SearchResults, SearchSlot};
use crate::dn::{dn_eq, dn_key};
use crate::report::SyncReport;
use crate::service::GroupSyncService;

/// The three calls a reconciliation session makes.
#[async_trait]
pub trait ReconcileBackend: Send + Sync {
    async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>>;

    async fn compare(&self, reference_username: &str, target_username: &str)
        -> Result<ComparisonResult>;

    async fn apply_batch(&self, request: ApplyBatchRequest) -> Result<ApplyBatchResponse>;
}

#[async_trait]
impl<R, D> ReconcileBackend for GroupSyncService<R, D>
where
    R: StockroomRepository + 'static,
    D: DirectoryClient + ?Sized + 'static,
{
    async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>> {
        GroupSyncService::search_users(self, query).await
    }

    async fn compare(
        &self,
        reference_username: &str,
        target_username: &str,
    ) -> Result<ComparisonResult> {
        GroupSyncService::compare(self, reference_username, target_username).await
    }

    async fn apply_batch(&self, request: ApplyBatchRequest) -> Result<ApplyBatchResponse> {
        GroupSyncService::apply_batch(self, request, None).await
    }
}

/// Group DNs the operator has ticked: additions from `missing_in_target`,
/// removals from `extra_in_target`. Kept in the order they were ticked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl PendingSelection {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    pub fn is_adding(&self, dn: &str) -> bool {
        self.to_add.iter().any(|d| dn_eq(d, dn))
    }

    pub fn is_removing(&self, dn: &str) -> bool {
        self.to_remove.iter().any(|d| dn_eq(d, dn))
    }

    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_remove.clear();
    }
}

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// At least one user is not selected.
    Idle,
    /// Both users selected, nothing compared yet.
    Ready,
    Compared,
    Applied(SyncOutcomeStatus),
}

/// Patch `result` as though every DN in `selection` had been applied.
///
/// Additions move from `missing_in_target` to the end of `shared`, removals
/// leave `extra_in_target`, and `target_groups` follows suit. Running it twice
/// with the same selection changes nothing the second time.
pub fn apply_optimistic(
    mut result: ComparisonResult,
    selection: &PendingSelection,
) -> ComparisonResult {
    let add_keys: HashSet<String> = selection.to_add.iter().map(|d| dn_key(d)).collect();
    let remove_keys: HashSet<String> = selection.to_remove.iter().map(|d| dn_key(d)).collect();

    let (promoted, still_missing): (Vec<GroupEntry>, Vec<GroupEntry>) = result
        .missing_in_target
        .into_iter()
        .partition(|g| add_keys.contains(&dn_key(&g.dn)));
    result.missing_in_target = still_missing;
    result.shared.extend(promoted);

    result
        .extra_in_target
        .retain(|g| !remove_keys.contains(&dn_key(&g.dn)));

    result
        .target_groups
        .retain(|dn| !remove_keys.contains(&dn_key(dn)));
    for dn in &selection.to_add {
        if !result.target_groups.iter().any(|t| dn_eq(t, dn)) {
            result.target_groups.push(dn.clone());
        }
    }

    result
}

/// Banner text for an outcome. Partial and failed stay distinct.
pub fn outcome_banner(outcome: &SyncOutcome) -> &'static str {
    match outcome.status {
        SyncOutcomeStatus::Success => "All changes applied",
        SyncOutcomeStatus::Partial => "Some changes failed: review audit log",
        SyncOutcomeStatus::Failed => "Sync failed: no groups were changed",
    }
}

/// One compare & sync session against a [`ReconcileBackend`].
pub struct ReconciliationController<B: ReconcileBackend + 'static> {
    backend: Arc<B>,
    search: SearchDebouncer<B>,
    reference: Option<DirectoryUser>,
    target: Option<DirectoryUser>,
    comparison: Option<ComparisonResult>,
    selection: PendingSelection,
    outcome: Option<SyncOutcome>,
    error: Option<String>,
    last_apply: Option<(ComparisonResult, ApplyBatchResponse)>,
    executor: Option<String>,
}

impl<B: ReconcileBackend + 'static> ReconciliationController<B> {
    pub fn new(backend: Arc<B>, config: &GroupSyncConfig) -> Self {
        let search = SearchDebouncer::new(
            backend.clone(),
            config.search_debounce(),
            config.search_min_query_len,
        );
        Self {
            backend,
            search,
            reference: None,
            target: None,
            comparison: None,
            selection: PendingSelection::default(),
            outcome: None,
            error: None,
            last_apply: None,
            executor: None,
        }
    }

    /// Name sent as the executor of every apply in this session.
    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn phase(&self) -> Phase {
        if let Some(outcome) = &self.outcome {
            Phase::Applied(outcome.status)
        } else if self.comparison.is_some() {
            Phase::Compared
        } else if self.reference.is_some() && self.target.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        }
    }

    pub fn reference(&self) -> Option<&DirectoryUser> {
        self.reference.as_ref()
    }

    pub fn target(&self) -> Option<&DirectoryUser> {
        self.target.as_ref()
    }

    pub fn comparison(&self) -> Option<&ComparisonResult> {
        self.comparison.as_ref()
    }

    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    pub fn outcome(&self) -> Option<&SyncOutcome> {
        self.outcome.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Feed picker input into the debounced search for `slot`.
    pub fn search(&mut self, slot: SearchSlot, query: &str) {
        self.search.input(slot, query);
    }

    pub async fn next_search_results(&mut self) -> Option<SearchResults> {
        self.search.next().await
    }

    /// Select or clear the reference user. Discards any comparison.
    pub fn select_reference(&mut self, user: Option<DirectoryUser>) {
        self.reference = user;
        self.discard();
    }

    /// Select or clear the target user. Discards any comparison.
    pub fn select_target(&mut self, user: Option<DirectoryUser>) {
        self.target = user;
        self.discard();
    }

    /// Compare the selected users, replacing any previous comparison.
    ///
    /// On failure the error is kept for display and no comparison is held.
    pub async fn compare(&mut self) -> Result<&ComparisonResult> {
        let (Some(reference), Some(target)) = (&self.reference, &self.target) else {
            return Err(StockroomError::Validation(
                "select both a reference and a target user".into(),
            ));
        };
        let reference = reference.username.clone();
        let target = target.username.clone();

        self.discard();
        match self.backend.compare(&reference, &target).await {
            Ok(result) => Ok(&*self.comparison.insert(result)),
            Err(e) => {
                warn!(reference = %reference, target = %target, error = %e, "comparison failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Tick or untick one missing group for addition.
    ///
    /// Returns `false` when `dn` is not currently missing from the target.
    pub fn toggle_add(&mut self, dn: &str) -> bool {
        let Some(comparison) = &self.comparison else {
            return false;
        };
        if !comparison.missing_in_target.iter().any(|g| dn_eq(&g.dn, dn)) {
            return false;
        }
        toggle(&mut self.selection.to_add, dn);
        true
    }

    /// Tick or untick one extra group for removal.
    ///
    /// Returns `false` when `dn` is not currently extra on the target.
    pub fn toggle_remove(&mut self, dn: &str) -> bool {
        let Some(comparison) = &self.comparison else {
            return false;
        };
        if !comparison.extra_in_target.iter().any(|g| dn_eq(&g.dn, dn)) {
            return false;
        }
        toggle(&mut self.selection.to_remove, dn);
        true
    }

    /// Clear the additions if every missing group is ticked, otherwise tick them all.
    pub fn toggle_all_add(&mut self) {
        if let Some(comparison) = &self.comparison {
            toggle_all(&mut self.selection.to_add, &comparison.missing_in_target);
        }
    }

    /// Clear the removals if every extra group is ticked, otherwise tick them all.
    pub fn toggle_all_remove(&mut self) {
        if let Some(comparison) = &self.comparison {
            toggle_all(&mut self.selection.to_remove, &comparison.extra_in_target);
        }
    }

    /// Send the pending selection to the backend.
    ///
    /// An empty selection is a no-op returning `Ok(None)`. Otherwise the
    /// comparison is patched from the selection as sent, the selection is
    /// cleared, and the outcome is returned. A backend error becomes a failed
    /// outcome carrying its message.
    pub async fn apply(&mut self) -> Result<Option<SyncOutcome>> {
        if self.selection.is_empty() {
            return Ok(None);
        }
        let Some(comparison) = self.comparison.take() else {
            return Err(StockroomError::Validation("nothing has been compared".into()));
        };
        let Some(target_dn) = comparison
            .target_user
            .dn
            .clone()
            .or_else(|| self.target.as_ref().and_then(|t| t.dn.clone()))
        else {
            let username = comparison.target_user.username.clone();
            self.comparison = Some(comparison);
            return Err(StockroomError::Validation(format!(
                "target user {username} has no distinguished name"
            )));
        };

        let snapshot = std::mem::take(&mut self.selection);
        let request = ApplyBatchRequest {
            target_user_dn: target_dn,
            groups_to_add: snapshot.to_add.clone(),
            groups_to_remove: snapshot.to_remove.clone(),
            from_username: comparison.reference_user.username.clone(),
            to_username: comparison.target_user.username.clone(),
            executor: self.executor.clone(),
        };

        let outcome = match self.backend.apply_batch(request).await {
            Ok(response) => {
                let outcome = response.outcome();
                self.last_apply = Some((comparison.clone(), response));
                outcome
            }
            Err(e) => {
                warn!(error = %e, "apply request failed");
                self.last_apply = None;
                SyncOutcome::batch_failure(e.to_string())
            }
        };

        info!(
            status = outcome.status.as_str(),
            added = outcome.added,
            removed = outcome.removed,
            failed = outcome.failed.len(),
            "apply finished"
        );

        self.comparison = Some(apply_optimistic(comparison, &snapshot));
        self.outcome = Some(outcome.clone());
        Ok(Some(outcome))
    }

    /// Offline report for the last apply that reached the backend and changed
    /// at least one group. A failed batch has nothing to report.
    pub fn report(&self) -> Option<SyncReport> {
        self.last_apply
            .as_ref()
            .filter(|(_, response)| response.status != SyncOutcomeStatus::Failed)
            .map(|(before, response)| SyncReport::build(before, response))
    }

    fn discard(&mut self) {
        self.comparison = None;
        self.selection.clear();
        self.outcome = None;
        self.error = None;
        self.last_apply = None;
    }
}

fn toggle(selected: &mut Vec<String>, dn: &str) {
    if let Some(pos) = selected.iter().position(|d| dn_eq(d, dn)) {
        selected.remove(pos);
    } else {
        selected.push(dn.to_string());
    }
}

fn toggle_all(selected: &mut Vec<String>, available: &[GroupEntry]) {
    if selected.len() == available.len() {
        selected.clear();
    } else {
        *selected = available.iter().map(|g| g.dn.clone()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{group_dn, user_dn, MockDirectory, MockRepo};

    type Service = GroupSyncService<MockRepo, MockDirectory>;

    fn user(username: &str, display: &str) -> DirectoryUser {
        DirectoryUser {
            username: username.to_string(),
            display_name: display.to_string(),
            dn: Some(user_dn(display)),
        }
    }

    fn directory() -> MockDirectory {
        MockDirectory::new()
            .with_user(
                "jsmith",
                "Jane Smith",
                &[
                    &group_dn("VPN"),
                    &group_dn("Finance"),
                    &group_dn("Wiki"),
                    &group_dn("Domain Admins"),
                ],
            )
            .with_user(
                "jdoe",
                "John Doe",
                &[&group_dn("vpn"), &group_dn("Interns"), &group_dn("Legacy")],
            )
    }

    fn controller(
        directory: MockDirectory,
    ) -> (ReconciliationController<Service>, Arc<MockDirectory>, Arc<MockRepo>) {
        let directory = Arc::new(directory);
        let repo = Arc::new(MockRepo::new());
        let config = GroupSyncConfig::default();
        let service = Arc::new(GroupSyncService::new(
            repo.clone(),
            directory.clone(),
            config.clone(),
        ));
        (ReconciliationController::new(service, &config), directory, repo)
    }

    async fn compared(
        directory: MockDirectory,
    ) -> (ReconciliationController<Service>, Arc<MockDirectory>, Arc<MockRepo>) {
        let (mut ctl, directory, repo) = controller(directory);
        ctl.select_reference(Some(user("jsmith", "Jane Smith")));
        ctl.select_target(Some(user("jdoe", "John Doe")));
        ctl.compare().await.unwrap();
        (ctl, directory, repo)
    }

    fn dns(entries: &[GroupEntry]) -> Vec<String> {
        entries.iter().map(|g| g.dn.clone()).collect()
    }

    fn sample_comparison() -> ComparisonResult {
        crate::diff::compare(
            stockroom_core::models::directory::DirectoryMembership {
                user: user("jsmith", "Jane Smith"),
                groups: vec![group_dn("VPN"), group_dn("Finance"), group_dn("Wiki")],
            },
            stockroom_core::models::directory::DirectoryMembership {
                user: user("jdoe", "John Doe"),
                groups: vec![group_dn("vpn"), group_dn("Interns")],
            },
        )
    }

    struct BrokenBackend;

    #[async_trait]
    impl ReconcileBackend for BrokenBackend {
        async fn search_users(&self, _query: &str) -> Result<Vec<DirectoryUser>> {
            Ok(Vec::new())
        }

        async fn compare(&self, reference: &str, target: &str) -> Result<ComparisonResult> {
            let mut result = sample_comparison();
            result.reference_user.username = reference.to_string();
            result.target_user.username = target.to_string();
            Ok(result)
        }

        async fn apply_batch(&self, _request: ApplyBatchRequest) -> Result<ApplyBatchResponse> {
            Err(StockroomError::Remote {
                status: 502,
                message: "bad gateway".into(),
            })
        }
    }

    // -- State transitions --

    #[tokio::test]
    async fn phases_follow_the_workflow() {
        let (mut ctl, _, _) = controller(directory());
        assert_eq!(ctl.phase(), Phase::Idle);

        ctl.select_reference(Some(user("jsmith", "Jane Smith")));
        assert_eq!(ctl.phase(), Phase::Idle);
        ctl.select_target(Some(user("jdoe", "John Doe")));
        assert_eq!(ctl.phase(), Phase::Ready);

        ctl.compare().await.unwrap();
        assert_eq!(ctl.phase(), Phase::Compared);

        ctl.toggle_all_add();
        ctl.apply().await.unwrap();
        assert_eq!(ctl.phase(), Phase::Applied(SyncOutcomeStatus::Success));

        ctl.select_target(None);
        assert_eq!(ctl.phase(), Phase::Idle);
        assert!(ctl.comparison().is_none());
        assert!(ctl.outcome().is_none());
    }

    #[tokio::test]
    async fn compare_requires_both_users() {
        let (mut ctl, _, _) = controller(directory());
        ctl.select_reference(Some(user("jsmith", "Jane Smith")));
        let err = ctl.compare().await.unwrap_err();
        assert!(matches!(err, StockroomError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_compare_keeps_no_result() {
        let (mut ctl, _, _) = controller(directory());
        ctl.select_reference(Some(user("jsmith", "Jane Smith")));
        ctl.select_target(Some(user("ghost", "Ghost User")));

        assert!(ctl.compare().await.is_err());
        assert!(ctl.comparison().is_none());
        assert_eq!(ctl.phase(), Phase::Ready);
        assert!(ctl.error().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn selecting_a_user_clears_state() {
        let (mut ctl, _, _) = compared(directory()).await;
        ctl.toggle_all_add();
        ctl.select_reference(Some(user("jdoe", "John Doe")));
        assert!(ctl.comparison().is_none());
        assert!(ctl.selection().is_empty());
        assert_eq!(ctl.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn recompare_resets_selection_and_outcome() {
        let (mut ctl, _, _) = compared(directory()).await;
        ctl.toggle_add(&group_dn("Finance"));
        ctl.apply().await.unwrap();
        ctl.toggle_remove(&group_dn("Interns"));

        ctl.compare().await.unwrap();
        assert!(ctl.selection().is_empty());
        assert!(ctl.outcome().is_none());
        assert_eq!(ctl.phase(), Phase::Compared);
    }

    // -- Toggles --

    #[tokio::test]
    async fn toggle_only_accepts_rows_of_its_partition() {
        let (mut ctl, _, _) = compared(directory()).await;
        assert!(ctl.toggle_add(&group_dn("Finance")));
        assert!(!ctl.toggle_add(&group_dn("Interns")));
        assert!(!ctl.toggle_remove(&group_dn("Finance")));
        assert!(ctl.toggle_remove(&group_dn("interns")));

        assert!(ctl.selection().is_adding(&group_dn("Finance")));
        assert!(ctl.selection().is_removing(&group_dn("Interns")));

        assert!(ctl.toggle_add(&group_dn("FINANCE")));
        assert!(!ctl.selection().is_adding(&group_dn("Finance")));
    }

    #[tokio::test]
    async fn toggle_all_selects_then_clears() {
        let (mut ctl, _, _) = compared(directory()).await;
        let missing = dns(&ctl.comparison().unwrap().missing_in_target);
        assert_eq!(missing.len(), 3);

        ctl.toggle_all_add();
        assert_eq!(ctl.selection().to_add, missing);
        ctl.toggle_all_add();
        assert!(ctl.selection().to_add.is_empty());

        ctl.toggle_add(&group_dn("Wiki"));
        ctl.toggle_all_add();
        assert_eq!(ctl.selection().to_add, missing);
    }

    #[test]
    fn toggle_all_with_one_available() {
        let available = vec![crate::dn::group_entry(&group_dn("Wiki"))];
        let mut selected = Vec::new();
        toggle_all(&mut selected, &available);
        assert_eq!(selected, vec![group_dn("Wiki")]);
        toggle_all(&mut selected, &available);
        assert!(selected.is_empty());
    }

    #[test]
    fn toggle_all_with_nothing_available_is_noop() {
        let mut selected: Vec<String> = Vec::new();
        toggle_all(&mut selected, &[]);
        assert!(selected.is_empty());
        toggle_all(&mut selected, &[]);
        assert!(selected.is_empty());
    }

    #[tokio::test]
    async fn toggle_all_remove_is_independent() {
        let (mut ctl, _, _) = compared(directory()).await;
        ctl.toggle_all_add();
        ctl.toggle_all_remove();
        assert_eq!(ctl.selection().to_remove.len(), 2);
        ctl.toggle_all_remove();
        assert!(ctl.selection().to_remove.is_empty());
        assert_eq!(ctl.selection().to_add.len(), 3);
    }

    // -- Apply --

    #[tokio::test]
    async fn empty_selection_is_a_noop() {
        let (mut ctl, directory, repo) = compared(directory()).await;
        let before = ctl.comparison().cloned();

        assert_eq!(ctl.apply().await.unwrap(), None);
        assert_eq!(ctl.comparison().cloned(), before);
        assert_eq!(ctl.phase(), Phase::Compared);
        assert!(directory.calls().is_empty());
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn apply_patches_comparison_and_clears_selection() {
        let (mut ctl, directory, _) = compared(directory()).await;
        ctl.toggle_add(&group_dn("Finance"));
        ctl.toggle_remove(&group_dn("Legacy"));

        let outcome = ctl.apply().await.unwrap().unwrap();
        assert_eq!(outcome.status, SyncOutcomeStatus::Success);
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.removed, 1);
        assert_eq!(directory.calls().len(), 2);

        let result = ctl.comparison().unwrap();
        assert!(!dns(&result.missing_in_target).contains(&group_dn("Finance")));
        assert_eq!(result.shared.last().unwrap().dn, group_dn("Finance"));
        assert_eq!(dns(&result.extra_in_target), vec![group_dn("Interns")]);
        assert!(result.target_groups.contains(&group_dn("Finance")));
        assert!(!result.target_groups.contains(&group_dn("Legacy")));
        assert!(ctl.selection().is_empty());
    }

    #[tokio::test]
    async fn partial_apply_still_promotes_every_selected_group() {
        let (mut ctl, _, _) = compared(directory().fail_on(&group_dn("Finance"))).await;
        ctl.toggle_add(&group_dn("Finance"));
        ctl.toggle_add(&group_dn("Wiki"));

        let outcome = ctl.apply().await.unwrap().unwrap();
        assert_eq!(outcome.status, SyncOutcomeStatus::Partial);
        assert_eq!(outcome.failed, vec![format!("ADD:{}", group_dn("Finance"))]);

        let shared = dns(&ctl.comparison().unwrap().shared);
        assert!(shared.contains(&group_dn("Finance")));
        assert!(shared.contains(&group_dn("Wiki")));
        assert_eq!(outcome_banner(&outcome), "Some changes failed: review audit log");
    }

    #[tokio::test]
    async fn backend_error_becomes_failed_outcome() {
        let mut ctl =
            ReconciliationController::new(Arc::new(BrokenBackend), &GroupSyncConfig::default());
        ctl.select_reference(Some(user("jsmith", "Jane Smith")));
        ctl.select_target(Some(user("jdoe", "John Doe")));
        ctl.compare().await.unwrap();
        ctl.toggle_add(&group_dn("Finance"));

        let outcome = ctl.apply().await.unwrap().unwrap();
        assert_eq!(outcome.status, SyncOutcomeStatus::Failed);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.failed, vec!["remote error (502): bad gateway".to_string()]);
        assert_eq!(ctl.phase(), Phase::Applied(SyncOutcomeStatus::Failed));
        assert!(ctl.selection().is_empty());
        assert!(ctl.report().is_none());
        assert!(dns(&ctl.comparison().unwrap().shared).contains(&group_dn("Finance")));
    }

    #[tokio::test]
    async fn apply_sends_executor_and_users() {
        let (ctl, _, repo) = compared(directory()).await;
        let mut ctl = ctl.with_executor("alice");
        ctl.toggle_add(&group_dn("Wiki"));
        ctl.apply().await.unwrap();

        let record = &repo.records()[0];
        assert_eq!(record.executor, "alice");
        assert_eq!(record.from_user, "jsmith");
        assert_eq!(record.to_user, "jdoe");
        assert_eq!(record.target_dn, user_dn("John Doe"));
    }

    #[tokio::test]
    async fn report_reflects_last_apply() {
        let (mut ctl, _, _) = compared(directory()).await;
        assert!(ctl.report().is_none());
        ctl.toggle_add(&group_dn("Wiki"));
        ctl.apply().await.unwrap();

        let report = ctl.report().unwrap();
        assert_eq!(report.summary.added, 1);
    }

    #[tokio::test]
    async fn failed_batch_has_no_report() {
        let (mut ctl, directory, repo) = compared(directory()).await;
        directory.go_offline();
        ctl.toggle_add(&group_dn("Wiki"));

        let outcome = ctl.apply().await.unwrap().unwrap();
        assert_eq!(outcome.status, SyncOutcomeStatus::Failed);
        assert_eq!(repo.records().len(), 1);
        assert!(ctl.report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn picker_search_is_debounced() {
        let (mut ctl, directory, _) = controller(directory());
        ctl.search(SearchSlot::Reference, "ja");
        ctl.search(SearchSlot::Reference, "jane");

        let results = ctl.next_search_results().await.unwrap();
        assert_eq!(results.slot, SearchSlot::Reference);
        assert_eq!(results.users.unwrap()[0].username, "jsmith");
        assert_eq!(directory.searches.lock().unwrap().len(), 1);
    }

    // -- Optimistic reducer --

    #[test]
    fn optimistic_reducer_is_idempotent() {
        let selection = PendingSelection {
            to_add: vec![group_dn("Finance")],
            to_remove: vec![group_dn("Interns")],
        };
        let once = apply_optimistic(sample_comparison(), &selection);
        let twice = apply_optimistic(once.clone(), &selection);
        assert_eq!(once, twice);
        assert!(once.extra_in_target.is_empty());
        assert_eq!(dns(&once.missing_in_target), vec![group_dn("Wiki")]);
    }

    #[test]
    fn optimistic_reducer_keeps_partitions_consistent() {
        let selection = PendingSelection {
            to_add: vec![group_dn("finance"), group_dn("Wiki")],
            to_remove: vec![group_dn("INTERNS")],
        };
        let result = apply_optimistic(sample_comparison(), &selection);

        let keys = |items: Vec<String>| -> HashSet<String> {
            items.iter().map(|d| dn_key(d)).collect()
        };
        let shared = keys(dns(&result.shared));
        let extra = keys(dns(&result.extra_in_target));
        let target = keys(result.target_groups.clone());
        assert_eq!(&shared | &extra, target);
        assert_eq!(result.target_groups.len(), 3);
    }

    #[test]
    fn optimistic_reducer_with_empty_selection_is_identity() {
        let result = apply_optimistic(sample_comparison(), &PendingSelection::default());
        assert_eq!(result, sample_comparison());
    }

    #[test]
    fn banners_are_distinct() {
        let mut outcome = SyncOutcome {
            status: SyncOutcomeStatus::Success,
            added: 1,
            removed: 0,
            failed: vec![],
        };
        let success = outcome_banner(&outcome);
        outcome.status = SyncOutcomeStatus::Partial;
        let partial = outcome_banner(&outcome);
        outcome.status = SyncOutcomeStatus::Failed;
        let failed = outcome_banner(&outcome);

        assert_eq!(success, "All changes applied");
        assert!(partial.contains("review audit log"));
        assert!(failed.contains("no groups were changed"));
        assert_ne!(partial, failed);
    }
}
