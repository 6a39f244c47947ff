use thiserror::Error;

use crate::config::MAX_METRICS;
use crate::model::MAX_HUMAN_SCORE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Quit,
    Show,
    Groups,
    Load { group_id: i64, name: Option<String> },
    Score(u8),
    Rank([Option<u8>; MAX_METRICS]),
    Previous,
    Next,
    Submit,
    Abandon,
    New,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown command `{0}`, type `help` for the list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("score must be a whole number from 0 to {max}", max = MAX_HUMAN_SCORE)]
    InvalidScore,

    #[error("ranks must be 1 to {max} or `-` for unset", max = MAX_METRICS)]
    InvalidRank,
}

pub const HELP: &str = "\
Commands:
  groups                     list groups that still need evaluation
  load <group> [name]        start evaluating a group
  score <0-5>                rate how well the sentence matches the reference
  rank <r1> [r2] [r3]        rank the metric scores (1 = best, `-` = unset)
  prev | next                move between items
  submit                     save all evaluations (last item only)
  abandon                    drop the current evaluation without saving
  new                        start a new evaluation after submitting
  show                       redraw the current screen
  help | quit";

/// Parses one input line; `None` for a blank line.
pub fn parse_action(line: &str) -> Result<Option<Action>, ActionError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let action = match command.to_ascii_lowercase().as_str() {
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        "show" => Action::Show,
        "groups" => Action::Groups,
        "load" => parse_load(&rest)?,
        "score" => parse_score(&rest)?,
        "rank" => Action::Rank(parse_ranks(&rest)?),
        "prev" | "previous" => Action::Previous,
        "next" => Action::Next,
        "submit" => Action::Submit,
        "abandon" => Action::Abandon,
        "new" => Action::New,
        other => return Err(ActionError::Unknown(other.to_string())),
    };
    Ok(Some(action))
}

fn parse_load(rest: &[&str]) -> Result<Action, ActionError> {
    const USAGE: &str = "load <group> [name]";
    let (group, name) = rest.split_first().ok_or(ActionError::Usage(USAGE))?;
    let group_id = group.parse().map_err(|_| ActionError::Usage(USAGE))?;
    let name = (!name.is_empty()).then(|| name.join(" "));
    Ok(Action::Load { group_id, name })
}

fn parse_score(rest: &[&str]) -> Result<Action, ActionError> {
    let [value] = rest else {
        return Err(ActionError::Usage("score <0-5>"));
    };
    match value.parse::<u8>() {
        Ok(score) if score <= MAX_HUMAN_SCORE => Ok(Action::Score(score)),
        _ => Err(ActionError::InvalidScore),
    }
}

fn parse_ranks(rest: &[&str]) -> Result<[Option<u8>; MAX_METRICS], ActionError> {
    if rest.is_empty() || rest.len() > MAX_METRICS {
        return Err(ActionError::Usage("rank <r1> [r2] [r3]"));
    }

    let mut ranks = [None; MAX_METRICS];
    for (slot, value) in rest.iter().enumerate() {
        ranks[slot] = match *value {
            "-" | "_" => None,
            value => match value.parse::<u8>() {
                Ok(rank) if (1..=MAX_METRICS as u8).contains(&rank) => Some(rank),
                _ => return Err(ActionError::InvalidRank),
            },
        };
    }
    Ok(ranks)
}
