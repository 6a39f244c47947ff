use super::*;
use crate::config::WorkflowConfig;
use crate::store::Cell;
use crate::store::memory::MemoryStore;

fn store() -> MemoryStore {
    let score_header = WorkflowConfig::default().columns.score_header();
    MemoryStore::default()
        .with_sheet(
            "Data",
            &["DataGroup", "Reference", "Sentence", "S1", "S2", "S3"],
            vec![
                vec![
                    Cell::Int(1),
                    Cell::text("The cat sat on the mat."),
                    Cell::text("A cat was sitting on the mat."),
                    Cell::Real(0.2),
                    Cell::Real(0.6),
                    Cell::Real(0.9),
                ],
                vec![
                    Cell::Int(1),
                    Cell::text("It rained all day."),
                    Cell::text("The weather was sunny."),
                    Cell::Real(0.1),
                    Cell::Real(0.3),
                    Cell::Real(0.2),
                ],
            ],
        )
        .with_sheet(
            "Score",
            &score_header.iter().map(String::as_str).collect::<Vec<_>>(),
            Vec::new(),
        )
        .with_sheet("Finished", &["DataGroup", "Name"], Vec::new())
}

fn run_script(workflow: &mut Workflow<MemoryStore>, script: &str) -> String {
    let mut output = Vec::new();
    run_shell(workflow, script.as_bytes(), &mut output, Some("tester"))
        .expect("shell should not fail");
    String::from_utf8(output).expect("output should be UTF-8")
}

#[test]
fn full_session_without_ranking_saves_and_resets() {
    let config = WorkflowConfig {
        ranking_enabled: false,
        ..WorkflowConfig::default()
    };
    let mut workflow = Workflow::new(store(), config);

    let output = run_script(
        &mut workflow,
        "load 1 ana\nscore 4\nnext\nsubmit\nscore 3\nsubmit\nnew\nquit\n",
    );

    assert!(output.contains("1 (2 items)"));
    assert!(output.contains("item 2/2"));
    assert!(output.contains("error: please provide a score"));
    assert!(output.contains("Thank you, ana! 2 evaluation(s) for group 1 were saved."));
    assert!(output.ends_with("No groups left to evaluate.\n> \n"));

    let store = workflow.store().inner();
    assert_eq!(store.rows("Score").len(), 2);
    assert_eq!(store.rows("Finished"), &[vec![Cell::Int(1), Cell::text("ana")]]);
}

#[test]
fn ranking_errors_keep_entered_values() {
    let mut workflow = Workflow::new(store(), WorkflowConfig::default());

    let output = run_script(
        &mut workflow,
        "load 1\nscore 4\nrank 1 1 2\nnext\nrank 3 2 1\nnext\nquit\n",
    );

    assert!(output.contains("| tester =="));
    assert!(output.contains("error: ranks must be unique"));
    assert!(output.contains("Alignment score (0-5, 0 = none, 5 = perfect): 4"));
    assert!(output.contains("item 2/2"));
    assert_eq!(workflow.session().map(|session| session.cursor()), Some(1));
    assert!(workflow.store().inner().rows("Score").is_empty());
}

#[test]
fn prev_restores_previous_entries() {
    let config = WorkflowConfig {
        ranking_enabled: false,
        ..WorkflowConfig::default()
    };
    let mut workflow = Workflow::new(store(), config);

    let output = run_script(&mut workflow, "load 1 bo\nscore 2\nnext\nprev\nquit\n");

    assert!(output.ends_with("Alignment score (0-5, 0 = none, 5 = perfect): 2\nActions: score <0-5> | next, abandon\n> \n"));
}

#[test]
fn bad_input_reports_errors_and_continues() {
    let mut workflow = Workflow::new(store(), WorkflowConfig::default());

    let output = run_script(
        &mut workflow,
        "dance\nscore 3\nload 9 ana\nload 1\n\nscore 9\nabandon\nquit\n",
    );

    assert!(output.contains("error: unknown command `dance`"));
    assert!(output.contains("error: no evaluation in progress"));
    assert!(output.contains("error: group 9 is not available for annotation"));
    assert!(output.contains("error: score must be a whole number from 0 to 5"));
    assert!(matches!(
        workflow.state(),
        WorkflowState::AwaitingGroupSelection
    ));
}

#[test]
fn missing_name_blocks_loading() {
    let mut workflow = Workflow::new(store(), WorkflowConfig::default());
    let mut output = Vec::new();

    run_shell(&mut workflow, "load 1\nquit\n".as_bytes(), &mut output, None)
        .expect("shell should not fail");

    let output = String::from_utf8(output).expect("output should be UTF-8");
    assert!(output.contains("error: please enter your name"));
    assert!(workflow.session().is_none());
}

#[test]
fn groups_command_rereads_finished_past_the_cache() {
    let config = WorkflowConfig {
        cache_ttl_secs: 3600,
        ..WorkflowConfig::default()
    };
    let mut workflow = Workflow::new(store(), config);
    assert!(workflow.loadable_groups().expect("groups").contains_key(&1));

    workflow
        .store_mut()
        .inner_mut()
        .push_raw("Finished", vec![Cell::Int(1), Cell::text("other")]);

    let output = run_script(&mut workflow, "groups\nquit\n");

    let (before, after) = output
        .split_once("> ")
        .expect("output should contain a prompt");
    assert!(before.contains("1 (2 items)"));
    assert!(!after.contains("1 (2 items)"));
    assert!(output.ends_with("No groups left to evaluate.\n> \n"));
}

#[test]
fn groups_command_is_refused_during_an_evaluation() {
    let mut workflow = Workflow::new(store(), WorkflowConfig::default());

    let output = run_script(&mut workflow, "load 1\ngroups\nquit\n");

    assert!(output.contains("error: finish or abandon the current evaluation first"));
    assert!(workflow.session().is_some());
}
