//! Annotation workflow: group selection, per-item review, batch submission.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{MAX_METRICS, WorkflowConfig};
use crate::model::{ComparisonItem, ItemInput, Judgment};
use crate::schema::{SchemaError, finished_groups, parse_items};
use crate::store::{CachedStore, Cell, DataStore, Row, StoreError};

mod session;
mod validation;

pub use session::EvaluationSession;
pub use validation::ValidationError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("please enter your name")]
    MissingName,

    #[error("group {0} is not available for annotation")]
    GroupNotLoadable(i64),

    #[error("no data for group {0}, please pick another group")]
    NoData(i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("already at the first item")]
    AtFirstItem,

    #[error("already at the last item, submit to finish")]
    AtLastItem,

    #[error("submit is only available on the last item")]
    NotOnLastItem,

    #[error("no evaluations to submit")]
    NoJudgments,

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("table store error: {0}")]
    Store(#[from] StoreError),

    #[error("table does not match the configured columns: {0}")]
    Schema(#[from] SchemaError),
}

/// Summary shown on the thank-you screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub group_id: i64,
    pub user_name: String,
    pub rows_written: usize,
}

#[derive(Debug)]
pub enum WorkflowState {
    AwaitingGroupSelection,
    InProgress(EvaluationSession),
    Completed(Completion),
}

pub struct Workflow<S> {
    store: CachedStore<S>,
    config: WorkflowConfig,
    state: WorkflowState,
}

impl<S: DataStore> Workflow<S> {
    pub fn new(store: S, config: WorkflowConfig) -> Self {
        let ttl = config.cache_ttl();
        Self {
            store: CachedStore::new(store, ttl),
            config,
            state: WorkflowState::AwaitingGroupSelection,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&EvaluationSession> {
        match &self.state {
            WorkflowState::InProgress(session) => Some(session),
            _ => None,
        }
    }

    pub fn store(&self) -> &CachedStore<S> {
        &self.store
    }

    #[cfg(test)]
    pub fn store_mut(&mut self) -> &mut CachedStore<S> {
        &mut self.store
    }

    /// Groups present in Data without a Finished marker, with their item counts.
    ///
    /// Served from the read cache, so a group finished elsewhere may still
    /// be listed until the cache window passes.
    pub fn loadable_groups(&self) -> Result<BTreeMap<i64, usize>, WorkflowError> {
        let items = self.data_items()?;
        let finished = self.finished(false)?;

        let mut groups = BTreeMap::new();
        for item in items.iter().filter(|item| !finished.contains(&item.group_id)) {
            *groups.entry(item.group_id).or_insert(0) += 1;
        }
        Ok(groups)
    }

    /// Re-reads Data and Finished past the cache, then lists loadable groups.
    pub fn refresh_groups(&self) -> Result<BTreeMap<i64, usize>, WorkflowError> {
        self.store.read_fresh(&self.config.tables.data)?;
        self.store.read_fresh(&self.config.tables.finished)?;
        self.loadable_groups()
    }

    /// Starts a session on `group_id`.
    ///
    /// The Finished sheet is re-read uncached here, so a group that was
    /// listed from a stale cache but finished since loads as [`WorkflowError::NoData`].
    pub fn start(&mut self, group_id: i64, user_name: &str) -> Result<(), WorkflowError> {
        if !matches!(self.state, WorkflowState::AwaitingGroupSelection) {
            return Err(WorkflowError::InvalidState(
                "finish or abandon the current evaluation first",
            ));
        }
        if user_name.trim().is_empty() {
            return Err(WorkflowError::MissingName);
        }
        if !self.loadable_groups()?.contains_key(&group_id) {
            return Err(WorkflowError::GroupNotLoadable(group_id));
        }

        let finished = self.finished(true)?;
        let items: Vec<ComparisonItem> = if finished.contains(&group_id) {
            Vec::new()
        } else {
            self.data_items()?
                .into_iter()
                .filter(|item| item.group_id == group_id)
                .collect()
        };

        if items.is_empty() {
            warn!(group_id, "selected group has no remaining items");
        }
        let session =
            EvaluationSession::start(user_name, group_id, items, self.config.ranking_enabled)?;
        info!(
            group_id,
            user = session.user_name(),
            items = session.item_count(),
            ranking = session.ranking_enabled(),
            "evaluation session started"
        );

        self.state = WorkflowState::InProgress(session);
        Ok(())
    }

    pub fn previous(&mut self, input: ItemInput) -> Result<(), WorkflowError> {
        self.session_mut()?.previous(input)
    }

    pub fn next(&mut self, input: ItemInput) -> Result<(), WorkflowError> {
        self.session_mut()?.next(input)
    }

    /// Validates the last item and writes the whole group.
    ///
    /// Score rows are appended first, then the Finished marker. If either
    /// append fails the session stays in progress unchanged; a failure after
    /// the Score append leaves the group loadable, and a retry appends the
    /// Score rows again.
    pub fn submit_all(&mut self, input: ItemInput) -> Result<Completion, WorkflowError> {
        let WorkflowState::InProgress(session) = &self.state else {
            return Err(WorkflowError::InvalidState("no evaluation in progress"));
        };

        let judgments = session.staged_judgments(&input)?;
        if judgments.is_empty() {
            return Err(WorkflowError::NoJudgments);
        }
        let rows = score_rows(session, &judgments);
        let marker: Row = vec![
            Cell::Int(session.group_id()),
            Cell::text(session.user_name()),
        ];
        let completion = Completion {
            group_id: session.group_id(),
            user_name: session.user_name().to_string(),
            rows_written: rows.len(),
        };

        if let Err(err) = self.store.append_rows(&self.config.tables.score, &rows) {
            warn!(group_id = completion.group_id, error = %err, "failed to write score rows");
            return Err(err.into());
        }
        if let Err(err) = self.store.append_row(&self.config.tables.finished, marker) {
            warn!(
                group_id = completion.group_id,
                error = %err,
                "score rows written but finished marker failed"
            );
            return Err(err.into());
        }

        info!(
            group_id = completion.group_id,
            user = %completion.user_name,
            rows = completion.rows_written,
            "evaluation submitted"
        );
        self.state = WorkflowState::Completed(completion.clone());
        Ok(completion)
    }

    /// Drops an in-progress session without writing anything.
    pub fn abandon(&mut self) -> bool {
        if let WorkflowState::InProgress(session) = &self.state {
            info!(group_id = session.group_id(), "evaluation abandoned");
            self.state = WorkflowState::AwaitingGroupSelection;
            return true;
        }
        false
    }

    /// "Start New Evaluation" from the thank-you screen.
    pub fn start_new(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.state, WorkflowState::Completed(_)) {
            return Err(WorkflowError::InvalidState("no completed evaluation to reset"));
        }
        self.state = WorkflowState::AwaitingGroupSelection;
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut EvaluationSession, WorkflowError> {
        match &mut self.state {
            WorkflowState::InProgress(session) => Ok(session),
            _ => Err(WorkflowError::InvalidState("no evaluation in progress")),
        }
    }

    fn data_items(&self) -> Result<Vec<ComparisonItem>, WorkflowError> {
        let table = &self.config.tables.data;
        let records = self.store.read_table(table)?;
        Ok(parse_items(table, &records, &self.config.columns)?)
    }

    fn finished(&self, fresh: bool) -> Result<BTreeSet<i64>, WorkflowError> {
        let table = &self.config.tables.finished;
        let records = if fresh {
            self.store.read_fresh(table)?
        } else {
            self.store.read_table(table)?
        };
        Ok(finished_groups(table, &records, &self.config.columns)?)
    }
}

/// One Score row per judged item, in item order.
pub fn score_rows(session: &EvaluationSession, judgments: &BTreeMap<usize, Judgment>) -> Vec<Row> {
    judgments
        .iter()
        .map(|(index, judgment)| {
            let item = &session.items()[*index];
            let mut scores = vec![Cell::Empty; MAX_METRICS];
            let mut ranks = vec![Cell::Empty; MAX_METRICS];
            for (position, metric) in item.metrics.iter().enumerate() {
                if let Some(cell) = scores.get_mut(metric.slot) {
                    *cell = Cell::Real(metric.score);
                }
                let rank = judgment.ranks.as_ref().and_then(|ranks| ranks.get(position));
                if let (Some(cell), Some(rank)) = (ranks.get_mut(metric.slot), rank) {
                    *cell = Cell::Int(i64::from(*rank));
                }
            }

            let mut row = vec![
                Cell::Int(item.group_id),
                Cell::text(&item.item_id),
                Cell::text(session.user_name()),
                Cell::text(&item.reference),
                Cell::text(&item.candidate_sentence),
            ];
            row.extend(scores);
            row.extend(ranks);
            row.push(Cell::Int(i64::from(judgment.human_score)));
            row
        })
        .collect()
}
