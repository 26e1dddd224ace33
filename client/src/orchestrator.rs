//! Workflow orchestration.
//!
//! [`OrchestratorState`] holds everything a session edits: the dataset
//! registry and one config builder per operation. [`Orchestrator`] owns that
//! state behind a mutex together with the HTTP client, the interpreter and
//! the activity feed, and sequences upload → configure → preview → commit.
//!
//! The state lock is never held across an `.await`: every network call works
//! on a request snapshot taken at call time, so edits made while a preview is
//! in flight do not affect it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::activity::ActivityFeed;
use crate::api::*;
use crate::builders::{
    CompareConfigBuilder, DuplicateConfigBuilder, JoinMappingBuilder, MergeGroupBuilder,
    SplitConfigBuilder,
};
use crate::config::ClientConfig;
use crate::error::{
    OperationError, OrchestratorResult, TransportResult, UploadResult, ValidationError,
    ValidationResult,
};
use crate::interpret::{
    DuplicatePreview, JoinSuggestions, MergePreview, ResultInterpreter, SplitPreview,
    UnmatchedListing,
};
use crate::models::{
    DatasetHandle, DuplicateConfig, DuplicateMode, GroupId, Operation, OperationResult, Slot,
};
use crate::registry::{DatasetRegistry, UploadToken};
use crate::upload::{UploadCoordinator, UploadFile};

/// Lock the session state, recovering from a poisoned lock.
pub(crate) fn lock_state(state: &Mutex<OrchestratorState>) -> MutexGuard<'_, OrchestratorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// State
// =============================================================================

/// Everything a session edits, in one place.
#[derive(Debug, Default)]
pub struct OrchestratorState {
    pub registry: DatasetRegistry,
    pub compare: CompareConfigBuilder,
    pub join: JoinMappingBuilder,
    pub merge: MergeGroupBuilder,
    pub split: SplitConfigBuilder,
    pub duplicate: DuplicateConfigBuilder,
    commits_in_flight: HashSet<Operation>,
}

impl OrchestratorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self, slot: Slot) -> Option<&DatasetHandle> {
        self.registry.get(slot)
    }

    pub fn commit_in_flight(&self, operation: Operation) -> bool {
        self.commits_in_flight.contains(&operation)
    }

    /// Install an uploaded handle and reset the builders bound to its slot.
    pub(crate) fn install(&mut self, token: UploadToken, handle: DatasetHandle) -> UploadResult<()> {
        let slot = token.slot();
        self.registry.complete_upload(token, handle.clone())?;
        match slot {
            Slot::CompareLeft | Slot::CompareRight => self.compare.clear_side(slot),
            Slot::JoinLeft | Slot::JoinRight => self.join.reset(),
            Slot::Merge => {
                self.merge.reset_for(&handle);
            }
            Slot::Split => self.split.reset_for(&handle),
            Slot::Duplicate => self.duplicate.reset_for(&handle),
        }
        debug!(slot = %slot, "dependent builders reset");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Selections checked against the bound dataset
    // -------------------------------------------------------------------------

    pub fn select_compare_left(&mut self, column: &str) -> ValidationResult<()> {
        let dataset = self.registry.require(Slot::CompareLeft)?;
        self.compare.select_left(dataset, column)
    }

    pub fn select_compare_right(&mut self, column: &str) -> ValidationResult<()> {
        let dataset = self.registry.require(Slot::CompareRight)?;
        self.compare.select_right(dataset, column)
    }

    pub fn set_join_left(&mut self, index: usize, column: &str) -> ValidationResult<()> {
        let dataset = self.registry.require(Slot::JoinLeft)?;
        self.join.set_left(index, dataset, column)
    }

    pub fn set_join_right(&mut self, index: usize, column: &str) -> ValidationResult<()> {
        let dataset = self.registry.require(Slot::JoinRight)?;
        self.join.set_right(index, dataset, column)
    }

    pub fn add_merge_group(&mut self) -> ValidationResult<GroupId> {
        let dataset = self.registry.require(Slot::Merge)?;
        Ok(self.merge.add_group(dataset))
    }

    pub fn enter_duplicate_mode(&mut self, mode: DuplicateMode) -> ValidationResult<()> {
        self.registry.require(Slot::Duplicate)?;
        self.duplicate.enter_mode(mode);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Request snapshots
    // -------------------------------------------------------------------------

    pub fn compare_request(&self) -> ValidationResult<CompareRequest> {
        let left = self.registry.require(Slot::CompareLeft)?;
        let right = self.registry.require(Slot::CompareRight)?;
        let config = self.compare.build()?;
        Ok(CompareRequest::new(left, right, &config))
    }

    pub fn suggest_request(&self) -> ValidationResult<SuggestJoinRequest> {
        let left = self.registry.require(Slot::JoinLeft)?;
        let right = self.registry.require(Slot::JoinRight)?;
        Ok(SuggestJoinRequest {
            file1_path: left.server_path.clone(),
            file2_path: right.server_path.clone(),
        })
    }

    pub fn join_request(&self) -> ValidationResult<JoinRequest> {
        let left = self.registry.require(Slot::JoinLeft)?;
        let right = self.registry.require(Slot::JoinRight)?;
        Ok(JoinRequest {
            file1_path: left.server_path.clone(),
            file2_path: right.server_path.clone(),
            join_columns: self.join.save()?,
        })
    }

    pub fn merge_request(&self) -> ValidationResult<MergeRequest> {
        let dataset = self.registry.require(Slot::Merge)?;
        let groups = self.merge.build()?;
        Ok(MergeRequest::new(dataset, &groups))
    }

    pub fn split_request(&self) -> ValidationResult<SplitRequest> {
        let dataset = self.registry.require(Slot::Split)?;
        let config = self.split.build()?;
        Ok(SplitRequest::new(dataset, &config))
    }

    pub fn duplicate_values_request(&self) -> ValidationResult<DuplicateValuesRequest> {
        let dataset = self.registry.require(Slot::Duplicate)?;
        match self.duplicate.build()? {
            DuplicateConfig::ByValues { columns } => Ok(DuplicateValuesRequest {
                file_path: dataset.server_path.clone(),
                columns,
            }),
            DuplicateConfig::ByRows => Err(ValidationError::NotInValuesMode),
        }
    }

    pub fn duplicate_rows_request(&self) -> ValidationResult<DuplicateRowsRequest> {
        let dataset = self.registry.require(Slot::Duplicate)?;
        Ok(DuplicateRowsRequest {
            file_path: dataset.server_path.clone(),
        })
    }
}

// =============================================================================
// Commit guard
// =============================================================================

/// Marks a commit as outstanding until dropped.
struct CommitGuard<'a> {
    state: &'a Mutex<OrchestratorState>,
    operation: Operation,
}

impl<'a> CommitGuard<'a> {
    fn acquire(state: &'a Mutex<OrchestratorState>, operation: Operation) -> OrchestratorResult<Self> {
        if !lock_state(state).commits_in_flight.insert(operation) {
            return Err(OperationError::CommitInProgress(operation));
        }
        Ok(Self { state, operation })
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        lock_state(self.state).commits_in_flight.remove(&self.operation);
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// One user session against the transformation service.
pub struct Orchestrator {
    client: TransformClient,
    interpreter: ResultInterpreter,
    activity: ActivityFeed,
    session: Uuid,
    state: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let client = TransformClient::new(&config)?;
        let session = Uuid::new_v4();
        info!(session = %session, service = %client.base_url(), "session started");
        Ok(Self {
            client,
            interpreter: ResultInterpreter::new(&config),
            activity: ActivityFeed::new(),
            session,
            state: Mutex::new(OrchestratorState::new()),
        })
    }

    pub fn activity(&self) -> &ActivityFeed {
        &self.activity
    }

    pub fn client(&self) -> &TransformClient {
        &self.client
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    /// Lock the session state for editing. Do not hold across `.await`.
    pub fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        lock_state(&self.state)
    }

    pub fn dataset(&self, slot: Slot) -> Option<DatasetHandle> {
        self.state().dataset(slot).cloned()
    }

    // =========================================================================
    // Upload
    // =========================================================================

    pub async fn upload(&self, slot: Slot, file: &UploadFile) -> OrchestratorResult<DatasetHandle> {
        let coordinator = UploadCoordinator::new(&self.client, &self.activity);
        Ok(coordinator.upload(&self.state, slot, file).await?)
    }

    pub async fn upload_path(
        &self,
        slot: Slot,
        path: impl AsRef<Path>,
    ) -> OrchestratorResult<DatasetHandle> {
        let file = UploadFile::from_path(path).await?;
        self.upload(slot, &file).await
    }

    // =========================================================================
    // Compare
    // =========================================================================

    /// Full unmatched listing for the current compare configuration.
    pub async fn preview_compare(&self) -> OrchestratorResult<UnmatchedListing> {
        let request = self.snapshot(Operation::Compare, OrchestratorState::compare_request)?;
        self.activity.info("🔍 Loading unmatched rows...");
        let reply = self
            .client
            .unmatched_rows(&request)
            .await
            .map_err(|e| self.failed(Operation::Compare, e))?;
        self.interpreter
            .unmatched_listing(reply)
            .map_err(|e| self.failed(Operation::Compare, e))
    }

    pub async fn commit_compare(&self) -> OrchestratorResult<OperationResult> {
        let request = self.snapshot(Operation::Compare, OrchestratorState::compare_request)?;
        let _guard = self.begin_commit(Operation::Compare)?;
        let reply = self
            .client
            .compare(&request)
            .await
            .map_err(|e| self.failed(Operation::Compare, e))?;
        Ok(self.finish(self.interpreter.compare(reply)))
    }

    // =========================================================================
    // Join
    // =========================================================================

    pub async fn suggest_join_columns(&self) -> OrchestratorResult<JoinSuggestions> {
        let request = self.snapshot(Operation::Join, OrchestratorState::suggest_request)?;
        let reply = self
            .client
            .suggest_join_columns(&request)
            .await
            .map_err(|e| self.failed(Operation::Join, e))?;
        let suggestions = self
            .interpreter
            .join_suggestions(reply)
            .map_err(|e| self.failed(Operation::Join, e))?;
        self.activity
            .info(format!("💡 {} suggested join pair(s)", suggestions.pairs.len()));
        Ok(suggestions)
    }

    pub async fn commit_join(&self) -> OrchestratorResult<OperationResult> {
        let request = self.snapshot(Operation::Join, OrchestratorState::join_request)?;
        let _guard = self.begin_commit(Operation::Join)?;
        let reply = self
            .client
            .join(&request)
            .await
            .map_err(|e| self.failed(Operation::Join, e))?;
        Ok(self.finish(self.interpreter.join(reply)))
    }

    // =========================================================================
    // Merge
    // =========================================================================

    pub async fn preview_merge(&self) -> OrchestratorResult<MergePreview> {
        let request = self.snapshot(Operation::Merge, OrchestratorState::merge_request)?;
        let reply = self
            .client
            .preview_merge(&request)
            .await
            .map_err(|e| self.failed(Operation::Merge, e))?;
        self.interpreter
            .merge_preview(reply)
            .map_err(|e| self.failed(Operation::Merge, e))
    }

    pub async fn commit_merge(&self) -> OrchestratorResult<OperationResult> {
        let request = self.snapshot(Operation::Merge, OrchestratorState::merge_request)?;
        let _guard = self.begin_commit(Operation::Merge)?;
        let reply = self
            .client
            .merge_columns(&request)
            .await
            .map_err(|e| self.failed(Operation::Merge, e))?;
        Ok(self.finish(self.interpreter.merge(reply)))
    }

    // =========================================================================
    // Split
    // =========================================================================

    pub async fn preview_split(&self) -> OrchestratorResult<SplitPreview> {
        let request = self.snapshot(Operation::Split, OrchestratorState::split_request)?;
        let reply = self
            .client
            .preview_split(&request)
            .await
            .map_err(|e| self.failed(Operation::Split, e))?;
        self.interpreter
            .split_preview(reply)
            .map_err(|e| self.failed(Operation::Split, e))
    }

    pub async fn commit_split(&self) -> OrchestratorResult<OperationResult> {
        let request = self.snapshot(Operation::Split, OrchestratorState::split_request)?;
        let _guard = self.begin_commit(Operation::Split)?;
        let reply = self
            .client
            .split_rows(&request)
            .await
            .map_err(|e| self.failed(Operation::Split, e))?;
        Ok(self.finish(self.interpreter.split(reply)))
    }

    // =========================================================================
    // Duplicates
    // =========================================================================

    /// Preview value duplicates and keep the result on the builder, unless
    /// the method or dataset changed while the call was in flight.
    pub async fn preview_duplicate_values(&self) -> OrchestratorResult<DuplicatePreview> {
        let op = Operation::DuplicateValues;
        let (request, generation) = self.snapshot(op, |state| {
            Ok((state.duplicate_values_request()?, state.duplicate.generation()))
        })?;
        let reply = self
            .client
            .preview_duplicates(&request)
            .await
            .map_err(|e| self.failed(op, e))?;
        let preview = self
            .interpreter
            .duplicate_preview(reply)
            .map_err(|e| self.failed(op, e))?;
        if !self.state().duplicate.store_preview(generation, preview.clone()) {
            debug!(generation, "duplicate configuration changed during preview, result not stored");
        }
        Ok(preview)
    }

    pub async fn commit_duplicate_values(&self) -> OrchestratorResult<OperationResult> {
        let op = Operation::DuplicateValues;
        let request = self.snapshot(op, OrchestratorState::duplicate_values_request)?;
        let _guard = self.begin_commit(op)?;
        let reply = self
            .client
            .find_duplicate_values(&request)
            .await
            .map_err(|e| self.failed(op, e))?;
        Ok(self.finish(self.interpreter.duplicate_values(reply)))
    }

    pub async fn commit_duplicate_rows(&self) -> OrchestratorResult<OperationResult> {
        let op = Operation::DuplicateRows;
        let request = self.snapshot(op, OrchestratorState::duplicate_rows_request)?;
        let _guard = self.begin_commit(op)?;
        let reply = self
            .client
            .find_duplicate_rows(&request)
            .await
            .map_err(|e| self.failed(op, e))?;
        Ok(self.finish(self.interpreter.duplicate_rows(reply)))
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    pub async fn download(&self, reference: &str) -> OrchestratorResult<Vec<u8>> {
        let bytes = self.client.download(reference).await?;
        debug!(reference, bytes = bytes.len(), "artifact downloaded");
        Ok(bytes)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Build a request from the current state, logging validation failures.
    fn snapshot<T>(
        &self,
        operation: Operation,
        build: impl FnOnce(&OrchestratorState) -> ValidationResult<T>,
    ) -> OrchestratorResult<T> {
        let built = build(&self.state());
        built.map_err(|e| {
            self.activity.warning(format!("{}: {}", operation, e));
            OperationError::Validation(e)
        })
    }

    fn begin_commit(&self, operation: Operation) -> OrchestratorResult<CommitGuard<'_>> {
        let guard = CommitGuard::acquire(&self.state, operation).map_err(|e| {
            warn!(session = %self.session, operation = %operation, "commit rejected: already in progress");
            e
        })?;
        info!(session = %self.session, operation = %operation, "commit started");
        self.activity.info(format!("⏳ Running {}...", operation));
        Ok(guard)
    }

    fn failed(&self, operation: Operation, err: impl Into<OperationError>) -> OperationError {
        let err = err.into();
        self.activity.error(format!("{} failed: {}", operation, err));
        err
    }

    fn finish(&self, result: OperationResult) -> OperationResult {
        match (&result.error, result.success) {
            (_, true) => {
                info!(session = %self.session, operation = %result.operation, "commit succeeded");
                self.activity.success(format!(
                    "{} completed{}",
                    result.operation,
                    result
                        .message
                        .as_deref()
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                ));
            }
            (error, false) => {
                self.activity.error(format!(
                    "{} failed: {}",
                    result.operation,
                    error.as_deref().unwrap_or("Unknown error")
                ));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures::dataset;
    use crate::builders::SplitSide;
    use crate::models::CompareMode;

    fn install(state: &mut OrchestratorState, slot: Slot, columns: &[&str]) {
        let token = state.registry.begin_upload(slot);
        state.install(token, dataset(slot, columns)).unwrap();
    }

    #[test]
    fn test_requests_need_datasets() {
        let state = OrchestratorState::new();
        assert_eq!(
            state.compare_request().unwrap_err(),
            ValidationError::MissingDataset(Slot::CompareLeft)
        );
        assert_eq!(
            state.join_request().unwrap_err(),
            ValidationError::MissingDataset(Slot::JoinLeft)
        );
        assert_eq!(
            state.duplicate_rows_request().unwrap_err(),
            ValidationError::MissingDataset(Slot::Duplicate)
        );
    }

    #[test]
    fn test_compare_request_snapshot() {
        let mut state = OrchestratorState::new();
        install(&mut state, Slot::CompareLeft, &["id", "name"]);
        install(&mut state, Slot::CompareRight, &["code", "label"]);

        state.compare.set_mode(CompareMode::SpecificColumns);
        state.select_compare_left("id").unwrap();
        assert_eq!(
            state.compare_request().unwrap_err(),
            ValidationError::MissingCompareColumn(Slot::CompareRight)
        );
        state.select_compare_right("code").unwrap();

        let request = state.compare_request().unwrap();
        assert_eq!(request.col1.as_deref(), Some("id"));
        assert_eq!(request.col2.as_deref(), Some("code"));
        assert!(state.select_compare_right("id").is_err());
    }

    #[test]
    fn test_reupload_resets_dependent_builders() {
        let mut state = OrchestratorState::new();
        install(&mut state, Slot::Split, &["id", "q1"]);
        state.split.set_checked(SplitSide::Id, "id", true).unwrap();

        install(&mut state, Slot::JoinLeft, &["id"]);
        install(&mut state, Slot::JoinRight, &["id"]);
        state.set_join_left(0, "id").unwrap();
        state.join.add_pair();

        install(&mut state, Slot::Split, &["id", "q1", "q2"]);
        assert!(state.split.checked(SplitSide::Id).is_empty());
        assert_eq!(state.split.columns().len(), 3);

        install(&mut state, Slot::JoinRight, &["key"]);
        assert_eq!(state.join.len(), 1);
        assert_eq!(state.join.editors()[0].left(), None);
    }

    #[test]
    fn test_stale_install_keeps_builders() {
        let mut state = OrchestratorState::new();
        install(&mut state, Slot::Duplicate, &["email"]);
        state.enter_duplicate_mode(DuplicateMode::ByValues).unwrap();
        state.duplicate.set_checked("email", true).unwrap();

        let stale = state.registry.begin_upload(Slot::Duplicate);
        let _newer = state.registry.begin_upload(Slot::Duplicate);
        assert!(state.install(stale, dataset(Slot::Duplicate, &["sku"])).is_err());
        assert!(state.duplicate.is_checked("email"));
        assert_eq!(state.dataset(Slot::Duplicate).unwrap().columns, vec!["email"]);
    }

    #[test]
    fn test_duplicate_requests_follow_mode() {
        let mut state = OrchestratorState::new();
        install(&mut state, Slot::Duplicate, &["email", "phone"]);
        assert_eq!(
            state.duplicate_values_request().unwrap_err(),
            ValidationError::NoDuplicateMethod
        );

        state.enter_duplicate_mode(DuplicateMode::ByRows).unwrap();
        assert_eq!(
            state.duplicate_values_request().unwrap_err(),
            ValidationError::NotInValuesMode
        );
        assert!(state.duplicate_rows_request().is_ok());

        state.enter_duplicate_mode(DuplicateMode::ByValues).unwrap();
        state.duplicate.set_checked("phone", true).unwrap();
        assert_eq!(state.duplicate_values_request().unwrap().columns, vec!["phone"]);
    }

    #[test]
    fn test_merge_request_requires_complete_group() {
        let mut state = OrchestratorState::new();
        install(&mut state, Slot::Merge, &["first", "last"]);
        assert_eq!(
            state.merge_request().unwrap_err(),
            ValidationError::NoCompleteMergeGroup
        );

        let id = state.merge.groups()[0].id();
        state.merge.select_column(id, "last").unwrap();
        state.merge.select_column(id, "first").unwrap();
        state.merge.set_new_column_name(id, "full_name").unwrap();
        let request = state.merge_request().unwrap();
        assert_eq!(request.merge_configs[0].0, vec!["last", "first"]);
        assert_eq!(request.merge_configs[0].1, "full_name");
    }

    #[test]
    fn test_commit_guard_blocks_same_operation() {
        let state = Mutex::new(OrchestratorState::new());
        let guard = CommitGuard::acquire(&state, Operation::Join).unwrap();
        assert!(matches!(
            CommitGuard::acquire(&state, Operation::Join),
            Err(OperationError::CommitInProgress(Operation::Join))
        ));
        let other = CommitGuard::acquire(&state, Operation::Merge);
        assert!(other.is_ok());

        drop(guard);
        assert!(!lock_state(&state).commit_in_flight(Operation::Join));
        assert!(CommitGuard::acquire(&state, Operation::Join).is_ok());
    }
}
