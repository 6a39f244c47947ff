//! Line-oriented evaluation form over stdin/stdout.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::AnnotateArgs;
use crate::commands::open_store;
use crate::model::ItemInput;
use crate::store::DataStore;
use crate::workflow::{Workflow, WorkflowError, WorkflowState};

mod actions;
mod render;
#[cfg(test)]
mod tests;

use actions::{Action, HELP, parse_action};

pub fn run(args: AnnotateArgs) -> Result<()> {
    let (store, config) = open_store(&args.store)?;
    let mut workflow = Workflow::new(store, config);

    let stdin = io::stdin();
    let mut output = io::stdout().lock();
    run_shell(&mut workflow, stdin.lock(), &mut output, args.name.as_deref())
}

struct Shell<'a, S> {
    workflow: &'a mut Workflow<S>,
    draft: ItemInput,
    default_name: Option<&'a str>,
}

pub(crate) fn run_shell<S: DataStore, R: BufRead, W: Write>(
    workflow: &mut Workflow<S>,
    input: R,
    output: &mut W,
    default_name: Option<&str>,
) -> Result<()> {
    let mut shell = Shell {
        workflow,
        draft: ItemInput::default(),
        default_name,
    };

    shell.redraw(output)?;
    prompt(output)?;

    for line in input.lines() {
        let line = line.context("failed to read input")?;
        match parse_action(&line) {
            Ok(None) => {}
            Ok(Some(Action::Quit)) => break,
            Ok(Some(Action::Help)) => writeln!(output, "{HELP}")?,
            Ok(Some(action)) => match shell.apply(action) {
                Ok(()) => shell.redraw(output)?,
                Err(err) => writeln!(output, "error: {err}")?,
            },
            Err(err) => writeln!(output, "error: {err}")?,
        }
        prompt(output)?;
    }

    if let Some(session) = shell.workflow.session() {
        warn!(
            group_id = session.group_id(),
            judged = session.judgments().len(),
            "leaving with an unsubmitted evaluation"
        );
    }
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn prompt<W: Write>(output: &mut W) -> io::Result<()> {
    write!(output, "> ")?;
    output.flush()
}

impl<S: DataStore> Shell<'_, S> {
    fn apply(&mut self, action: Action) -> Result<(), WorkflowError> {
        match action {
            Action::Help | Action::Quit | Action::Show => {}
            Action::Groups => {
                if !matches!(self.workflow.state(), WorkflowState::AwaitingGroupSelection) {
                    return Err(WorkflowError::InvalidState(
                        "finish or abandon the current evaluation first",
                    ));
                }
                let groups = self.workflow.refresh_groups()?;
                info!(groups = groups.len(), "group list refreshed");
            }
            Action::Load { group_id, name } => {
                let name = name.as_deref().or(self.default_name).unwrap_or_default();
                self.workflow.start(group_id, name)?;
                self.reload_draft();
            }
            Action::Score(score) => {
                self.require_session()?;
                self.draft.human_score = score;
            }
            Action::Rank(ranks) => {
                self.require_session()?;
                if !self.workflow.config().ranking_enabled {
                    return Err(WorkflowError::InvalidState("ranking is not enabled"));
                }
                self.draft.ranks = ranks;
            }
            Action::Previous => {
                self.workflow.previous(self.draft)?;
                self.reload_draft();
            }
            Action::Next => {
                self.workflow.next(self.draft)?;
                self.reload_draft();
            }
            Action::Submit => {
                let completion = self.workflow.submit_all(self.draft)?;
                info!(group_id = completion.group_id, "thank-you screen shown");
                self.draft = ItemInput::default();
            }
            Action::Abandon => {
                if !self.workflow.abandon() {
                    return Err(WorkflowError::InvalidState("no evaluation in progress"));
                }
                self.draft = ItemInput::default();
            }
            Action::New => self.workflow.start_new()?,
        }
        Ok(())
    }

    fn require_session(&self) -> Result<(), WorkflowError> {
        match self.workflow.session() {
            Some(_) => Ok(()),
            None => Err(WorkflowError::InvalidState("no evaluation in progress")),
        }
    }

    fn reload_draft(&mut self) {
        self.draft = self
            .workflow
            .session()
            .map(|session| session.input_at_cursor())
            .unwrap_or_default();
    }

    fn redraw<W: Write>(&self, output: &mut W) -> io::Result<()> {
        match self.workflow.state() {
            WorkflowState::AwaitingGroupSelection => match self.workflow.loadable_groups() {
                Ok(groups) => render::selection(output, &groups),
                Err(err) => writeln!(output, "error: {err}"),
            },
            WorkflowState::InProgress(session) => render::review(output, session, &self.draft),
            WorkflowState::Completed(completion) => render::completed(output, completion),
        }
    }
}
