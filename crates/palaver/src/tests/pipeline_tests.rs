//! Tests for pipeline construction, ordering, and execution.

use crate::error::SetupError;
use crate::{Pipeline, Stage, StageFlow};

type Trace = Vec<&'static str>;

fn tracing_stage(id: &'static str) -> Stage<Trace> {
    Stage::new(id, move |mut trace: Trace| async move {
        trace.push(id);
        StageFlow::Continue(trace)
    })
}

fn position(order: &[&str], id: &str) -> usize {
    order
        .iter()
        .position(|stage| *stage == id)
        .unwrap_or_else(|| panic!("stage {id} missing from order"))
}

#[test]
fn orders_stages_by_declared_constraints() {
    let pipeline = Pipeline::build(vec![
        tracing_stage("a").before("c"),
        tracing_stage("b").after("a"),
        tracing_stage("c"),
    ])
    .expect("valid stage set");

    let order = pipeline.order();
    assert!(position(&order, "a") < position(&order, "c"));
    assert!(position(&order, "a") < position(&order, "b"));
}

#[test]
fn requires_produces_the_same_edge_as_after() {
    let pipeline = Pipeline::build(vec![
        tracing_stage("consumer").requires("producer"),
        tracing_stage("producer"),
    ])
    .expect("valid stage set");

    let order = pipeline.order();
    assert!(position(&order, "producer") < position(&order, "consumer"));
}

#[test]
fn ordering_is_deterministic_for_identical_input() {
    let build = || {
        Pipeline::build(vec![
            tracing_stage("a").before("c"),
            tracing_stage("b").after("a"),
            tracing_stage("c"),
            tracing_stage("d").after("a"),
            tracing_stage("e").requires("b"),
        ])
        .expect("valid stage set")
    };
    let first: Vec<String> = build().order().iter().map(|s| (*s).to_owned()).collect();
    let second: Vec<String> = build().order().iter().map(|s| (*s).to_owned()).collect();
    assert_eq!(first, second);
}

#[test]
fn rejects_circular_dependencies() {
    let error = Pipeline::build(vec![
        tracing_stage("a").before("b"),
        tracing_stage("b").before("a"),
    ])
    .expect_err("cycle");
    assert!(matches!(error, SetupError::CircularDependency { .. }));
}

#[test]
fn rejects_self_dependency() {
    let error = Pipeline::build(vec![tracing_stage("a").before("a")]).expect_err("self cycle");
    assert!(matches!(error, SetupError::CircularDependency { .. }));
}

#[test]
fn rejects_duplicate_stage_ids() {
    let error =
        Pipeline::build(vec![tracing_stage("a"), tracing_stage("a")]).expect_err("duplicate");
    assert!(matches!(error, SetupError::DuplicateStage { ref id } if id == "a"));
}

#[test]
fn rejects_unknown_stage_references() {
    let error = Pipeline::build(vec![tracing_stage("a").after("ghost")]).expect_err("unknown");
    match error {
        SetupError::UnknownStage { from, id } => {
            assert_eq!(from, "a");
            assert_eq!(id, "ghost");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn executes_stages_in_computed_order() {
    let pipeline = Pipeline::build(vec![
        tracing_stage("third").after("second"),
        tracing_stage("first").before("second"),
        tracing_stage("second"),
    ])
    .expect("valid stage set");

    let run = pipeline.execute(Vec::new()).await;
    assert_eq!(run.context, vec!["first", "second", "third"]);
    assert_eq!(run.halted_at, None);
}

#[tokio::test]
async fn halting_stage_stops_the_pipeline_silently() {
    let pipeline = Pipeline::build(vec![
        tracing_stage("one"),
        Stage::new("gate", |mut trace: Trace| async move {
            trace.push("gate");
            StageFlow::Halt(trace)
        })
        .after("one"),
        tracing_stage("never").after("gate"),
    ])
    .expect("valid stage set");

    let run = pipeline.execute(Vec::new()).await;
    assert_eq!(run.context, vec!["one", "gate"]);
    assert_eq!(run.halted_at.as_deref(), Some("gate"));
}

#[tokio::test]
async fn executor_adopts_the_returned_context() {
    let pipeline = Pipeline::build(vec![
        Stage::new("replace", |_: Trace| async move {
            StageFlow::Continue(vec!["fresh"])
        }),
        tracing_stage("append").after("replace"),
    ])
    .expect("valid stage set");

    let run = pipeline.execute(vec!["stale"]).await;
    assert_eq!(run.context, vec!["fresh", "append"]);
}
