use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::GroupsArgs;
use crate::commands::open_store;
use crate::workflow::Workflow;

#[derive(Debug, Serialize)]
struct GroupSummary {
    group_id: i64,
    items: usize,
}

pub fn run(args: GroupsArgs) -> Result<()> {
    let (store, config) = open_store(&args.store)?;
    let workflow = Workflow::new(store, config);

    let groups: Vec<GroupSummary> = workflow
        .loadable_groups()?
        .into_iter()
        .map(|(group_id, items)| GroupSummary { group_id, items })
        .collect();
    info!(groups = groups.len(), "loadable groups computed");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &groups)?;
        writeln!(output)?;
    } else {
        writeln!(output, "Groups: {}", groups.len())?;
        for group in &groups {
            writeln!(output, "{}\t{} items", group.group_id, group.items)?;
        }
    }
    output.flush()?;

    Ok(())
}
