use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::model::{ItemInput, MAX_HUMAN_SCORE};
use crate::workflow::{Completion, EvaluationSession};

pub fn selection<W: Write>(output: &mut W, groups: &BTreeMap<i64, usize>) -> io::Result<()> {
    writeln!(output, "== Sentence Comparison ==")?;
    if groups.is_empty() {
        writeln!(output, "No groups left to evaluate.")?;
        return Ok(());
    }

    writeln!(output, "Groups available:")?;
    for (group_id, items) in groups {
        let noun = if *items == 1 { "item" } else { "items" };
        writeln!(output, "  {group_id} ({items} {noun})")?;
    }
    writeln!(output, "Type `load <group> <your name>` to begin.")
}

pub fn review<W: Write>(
    output: &mut W,
    session: &EvaluationSession,
    input: &ItemInput,
) -> io::Result<()> {
    let item = session.current_item();
    writeln!(
        output,
        "== Group {} | item {}/{} ({}) | {} ==",
        session.group_id(),
        session.cursor() + 1,
        session.item_count(),
        item.item_id,
        session.user_name()
    )?;
    writeln!(output, "Reference:\n  {}", item.reference)?;
    writeln!(output, "Sentence:\n  {}", item.candidate_sentence)?;

    if !item.metrics.is_empty() {
        if session.ranking_enabled() {
            writeln!(
                output,
                "Rank the model scores (0-1) by how accurately they reflect sentence alignment:"
            )?;
        } else {
            writeln!(output, "Model scores:")?;
        }
        for (position, metric) in item.metrics.iter().enumerate() {
            write!(output, "  {}: {:.4}", metric.name, metric.score)?;
            if session.ranking_enabled() {
                match input.ranks.get(position).copied().flatten() {
                    Some(rank) => write!(output, "  rank {rank}")?,
                    None => write!(output, "  rank -")?,
                }
            }
            writeln!(output)?;
        }
    }

    let rating = match input.human_score {
        0 => "not rated".to_string(),
        score => score.to_string(),
    };
    writeln!(
        output,
        "Alignment score (0-{MAX_HUMAN_SCORE}, 0 = none, {MAX_HUMAN_SCORE} = perfect): {rating}"
    )?;

    let mut moves = Vec::new();
    if session.can_go_previous() {
        moves.push("prev");
    }
    if session.can_go_next() {
        moves.push("next");
    }
    if session.can_submit() {
        moves.push("submit");
    }
    moves.push("abandon");
    let editing = if session.ranking_enabled() {
        "score <0-5>, rank <r1> <r2> <r3>"
    } else {
        "score <0-5>"
    };
    writeln!(output, "Actions: {editing} | {}", moves.join(", "))
}

pub fn completed<W: Write>(output: &mut W, completion: &Completion) -> io::Result<()> {
    writeln!(
        output,
        "Thank you, {}! {} evaluation(s) for group {} were saved.",
        completion.user_name, completion.rows_written, completion.group_id
    )?;
    writeln!(output, "Type `new` to start a new evaluation.")
}
