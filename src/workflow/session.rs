use std::collections::BTreeMap;

use super::WorkflowError;
use super::validation::validate_input;
use crate::model::{ComparisonItem, ItemInput, Judgment};

/// One annotator working through one group.
///
/// The item list is a snapshot taken when the session starts. `cursor`
/// always indexes into it.
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    user_name: String,
    group_id: i64,
    items: Vec<ComparisonItem>,
    cursor: usize,
    ranking_enabled: bool,
    drafts: BTreeMap<usize, ItemInput>,
    judgments: BTreeMap<usize, Judgment>,
}

impl EvaluationSession {
    pub fn start(
        user_name: &str,
        group_id: i64,
        items: Vec<ComparisonItem>,
        ranking_enabled: bool,
    ) -> Result<Self, WorkflowError> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(WorkflowError::MissingName);
        }
        if items.is_empty() {
            return Err(WorkflowError::NoData(group_id));
        }

        Ok(Self {
            user_name: user_name.to_string(),
            group_id,
            items,
            cursor: 0,
            ranking_enabled,
            drafts: BTreeMap::new(),
            judgments: BTreeMap::new(),
        })
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn ranking_enabled(&self) -> bool {
        self.ranking_enabled
    }

    pub fn items(&self) -> &[ComparisonItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_item(&self) -> &ComparisonItem {
        &self.items[self.cursor]
    }

    /// Last values entered for the item under the cursor, or a blank input.
    pub fn input_at_cursor(&self) -> ItemInput {
        self.drafts.get(&self.cursor).copied().unwrap_or_default()
    }

    pub fn judgments(&self) -> &BTreeMap<usize, Judgment> {
        &self.judgments
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor + 1 < self.items.len()
    }

    pub fn can_submit(&self) -> bool {
        self.cursor + 1 == self.items.len()
    }

    /// Keeps `input` for the current item without validating it, then steps back.
    pub fn previous(&mut self, input: ItemInput) -> Result<(), WorkflowError> {
        if !self.can_go_previous() {
            return Err(WorkflowError::AtFirstItem);
        }

        self.drafts.insert(self.cursor, input);
        match validate_input(self.current_item(), &input, self.ranking_enabled) {
            Ok(judgment) => {
                self.judgments.insert(self.cursor, judgment);
            }
            Err(_) => {
                self.judgments.remove(&self.cursor);
            }
        }
        self.cursor -= 1;
        Ok(())
    }

    pub fn next(&mut self, input: ItemInput) -> Result<(), WorkflowError> {
        if !self.can_go_next() {
            return Err(WorkflowError::AtLastItem);
        }

        let judgment = validate_input(self.current_item(), &input, self.ranking_enabled)?;
        self.drafts.insert(self.cursor, input);
        self.judgments.insert(self.cursor, judgment);
        self.cursor += 1;
        Ok(())
    }

    /// Judgments as they would be submitted with `input` on the last item.
    ///
    /// Leaves the session untouched so a failed flush can be retried.
    pub fn staged_judgments(
        &self,
        input: &ItemInput,
    ) -> Result<BTreeMap<usize, Judgment>, WorkflowError> {
        if !self.can_submit() {
            return Err(WorkflowError::NotOnLastItem);
        }

        let judgment = validate_input(self.current_item(), input, self.ranking_enabled)?;
        let mut judgments = self.judgments.clone();
        judgments.insert(self.cursor, judgment);
        Ok(judgments)
    }
}
