//! End-to-end dispatcher tests.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::error::SetupError;
use crate::{
    CheckOutcome, Command, Dispatcher, Outcome, STAGE_RESOLVE, STAGE_SPLIT, Stage, StageFlow,
    UsageSpec,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

fn add_command() -> Command<Log> {
    Command::<Log>::new("add", |call| async move {
        let sum: f64 = call.values.iter().filter_map(Value::as_f64).sum();
        call.context
            .lock()
            .expect("log lock")
            .push(format!("sum={sum}"));
        Ok(())
    })
    .usage("<a:number>")
    .usage("<b:number>")
}

fn build(commands: Vec<Command<Log>>) -> Dispatcher<Log> {
    let mut builder = Dispatcher::<Log>::builder().prefix("!");
    for command in commands {
        builder = builder.command(command);
    }
    builder.build().expect("valid configuration")
}

#[tokio::test]
async fn dispatches_a_command_end_to_end() {
    let dispatcher = build(vec![add_command()]);
    let log = new_log();
    let outcome = dispatcher.run("!add 2 3", Arc::clone(&log)).await;
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(entries(&log), vec!["sum=5"]);
}

#[tokio::test]
async fn missing_argument_reports_invalid_usage() {
    let dispatcher = build(vec![add_command()]);
    let outcome = dispatcher.run("!add 2", new_log()).await;
    match outcome {
        Outcome::InvalidUsage { errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].name, "b");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn input_without_prefix_is_ignored() {
    let dispatcher = build(vec![add_command()]);
    let log = new_log();
    assert_eq!(dispatcher.run("add 2 3", Arc::clone(&log)).await, Outcome::Ignored);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn unknown_command_is_reported_by_name() {
    let dispatcher = build(vec![add_command()]);
    let outcome = dispatcher.run("!nope", new_log()).await;
    assert_eq!(
        outcome,
        Outcome::UnknownCommand {
            name: "nope".to_owned()
        }
    );
}

#[tokio::test]
async fn command_names_are_case_folded() {
    let dispatcher = build(vec![add_command()]);
    assert_eq!(dispatcher.run("!ADD 2 3", new_log()).await, Outcome::Completed);
}

#[tokio::test]
async fn aliases_resolve_to_the_command() {
    let dispatcher = build(vec![add_command().alias("sum")]);
    let log = new_log();
    assert_eq!(
        dispatcher.run("!sum 1 2", Arc::clone(&log)).await,
        Outcome::Completed
    );
    assert_eq!(entries(&log), vec!["sum=3"]);
}

#[tokio::test]
async fn later_registration_overwrites_and_stale_aliases_follow() {
    let first = Command::<Log>::new("ping", |call| async move {
        call.context.lock().expect("log lock").push("old".to_owned());
        Ok(())
    })
    .alias("p");
    let second = Command::<Log>::new("ping", |call| async move {
        call.context.lock().expect("log lock").push("new".to_owned());
        Ok(())
    });

    let dispatcher = build(vec![first, second]);
    let log = new_log();
    assert_eq!(dispatcher.run("!ping", Arc::clone(&log)).await, Outcome::Completed);
    // The alias of the displaced command resolves to the new descriptor.
    assert_eq!(dispatcher.run("!p", Arc::clone(&log)).await, Outcome::Completed);
    assert_eq!(entries(&log), vec!["new", "new"]);
}

#[tokio::test]
async fn all_checks_run_and_failures_keep_declaration_order() {
    let command = Command::<Log>::new("guarded", |_| async move { Ok(()) })
        .check(|_| async move { CheckOutcome::Fail("x".to_owned()) })
        .check(|_| async move { CheckOutcome::Fail("y".to_owned()) })
        .check(|_| async move { CheckOutcome::Pass });

    let dispatcher = build(vec![command]);
    let outcome = dispatcher.run("!guarded", new_log()).await;
    assert_eq!(
        outcome,
        Outcome::FailedChecks {
            messages: vec!["x".to_owned(), "y".to_owned()]
        }
    );
}

#[tokio::test]
async fn handler_errors_are_captured_not_propagated() {
    let command = Command::<Log>::new("boom", |_| async move { Err("kaput".into()) });
    let dispatcher = build(vec![command]);
    match dispatcher.run("!boom", new_log()).await {
        Outcome::HandlerError { message } => assert!(message.contains("kaput"), "{message}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn caller_stage_can_halt_without_an_outcome() {
    let dispatcher = Dispatcher::<Log>::builder()
        .prefix("!")
        .command(add_command())
        .stage(
            Stage::new("audit", |ctx| async move { StageFlow::Halt(ctx) })
                .after(STAGE_SPLIT)
                .before(STAGE_RESOLVE),
        )
        .build()
        .expect("valid configuration");

    let log = new_log();
    let outcome = dispatcher.run("!add 2 3", Arc::clone(&log)).await;
    assert_eq!(
        outcome,
        Outcome::Halted {
            stage: "audit".to_owned()
        }
    );
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn caller_stage_interleaves_between_core_stages() {
    let dispatcher = Dispatcher::<Log>::builder()
        .prefix("!")
        .command(add_command())
        .stage(
            Stage::new("rewrite", |mut ctx: crate::Invocation<Log>| async move {
                ctx.command_name = Some("add".to_owned());
                StageFlow::Continue(ctx)
            })
            .after(STAGE_SPLIT)
            .before(STAGE_RESOLVE),
        )
        .build()
        .expect("valid configuration");

    let log = new_log();
    assert_eq!(
        dispatcher.run("!plus 4 5", Arc::clone(&log)).await,
        Outcome::Completed
    );
    assert_eq!(entries(&log), vec!["sum=9"]);
}

#[tokio::test]
async fn custom_usages_parse_through_registered_chains() {
    let spec: UsageSpec<Log> = UsageSpec::extends("text").with_parse(|input| {
        let text = input.value.as_str().unwrap_or_default();
        if text.chars().all(char::is_alphabetic) {
            Ok(json!(text.to_uppercase()))
        } else {
            Err(input.fail("must be letters only"))
        }
    });

    let command = Command::<Log>::new("shout", |call| async move {
        let word = call.values[0].as_str().unwrap_or_default().to_owned();
        call.context.lock().expect("log lock").push(word);
        Ok(())
    })
    .usage("<word:loud>");

    let dispatcher = Dispatcher::<Log>::builder()
        .prefix("!")
        .usage("loud", spec)
        .command(command)
        .build()
        .expect("valid configuration");

    let log = new_log();
    assert_eq!(dispatcher.run("!shout hey", Arc::clone(&log)).await, Outcome::Completed);
    assert_eq!(entries(&log), vec!["HEY"]);

    match dispatcher.run("!shout h3y", new_log()).await {
        Outcome::InvalidUsage { errors } => {
            assert_eq!(errors[0].message, "word: must be letters only");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn build_arguments_projection_reshapes_values() {
    let dispatcher = Dispatcher::<Log>::builder()
        .prefix("!")
        .build_arguments(|_, values| {
            let count = values.len();
            let mut values = values;
            values.push(json!(count));
            values
        })
        .command(
            Command::<Log>::new("count", |call| async move {
                let last = call.values.last().cloned().unwrap_or(Value::Null);
                call.context
                    .lock()
                    .expect("log lock")
                    .push(format!("count={last}"));
                Ok(())
            })
            .usage("<a:text>")
            .usage("<b:text>"),
        )
        .build()
        .expect("valid configuration");

    let log = new_log();
    assert_eq!(dispatcher.run("!count x y", Arc::clone(&log)).await, Outcome::Completed);
    assert_eq!(entries(&log), vec!["count=2"]);
}

#[test]
fn rest_usage_not_last_is_a_setup_error() {
    let command = Command::<Log>::new("bad", |_| async move { Ok(()) })
        .usage("<all:text...>")
        .usage("<tail:text>");
    let error = Dispatcher::<Log>::builder()
        .command(command)
        .build()
        .expect_err("rest not last");
    assert!(matches!(error, SetupError::RestNotLast { .. }));
}

#[test]
fn unknown_usage_type_is_a_setup_error() {
    let command = Command::<Log>::new("bad", |_| async move { Ok(()) }).usage("<x:nonesuch>");
    let error = Dispatcher::<Log>::builder()
        .command(command)
        .build()
        .expect_err("unknown usage type");
    assert!(matches!(error, SetupError::UnresolvedUsage { .. }));
}

#[test]
fn caller_stage_reusing_a_core_id_is_a_setup_error() {
    let error = Dispatcher::<Log>::builder()
        .stage(Stage::new(STAGE_SPLIT, |ctx| async move {
            StageFlow::Continue(ctx)
        }))
        .build()
        .expect_err("duplicate id");
    assert!(matches!(error, SetupError::DuplicateStage { .. }));
}

#[test]
fn core_stages_keep_their_relative_order() {
    let dispatcher = build(vec![add_command()]);
    let order = dispatcher.stage_order();
    let position = |id: &str| {
        order
            .iter()
            .position(|stage| *stage == id)
            .unwrap_or_else(|| panic!("stage {id} missing"))
    };
    assert!(position("split") < position("resolve"));
    assert!(position("resolve") < position("parse-usages"));
    assert!(position("parse-usages") < position("checks"));
    assert!(position("checks") < position("run"));
}

#[test]
fn usage_line_renders_the_command_usage_list() {
    let command = Command::<Log>::new("greet", |_| async move { Ok(()) })
        .usage("<who:text>")
        .usage("[style:text]");
    let dispatcher = build(vec![command]);
    assert_eq!(
        dispatcher.usage_line("greet").as_deref(),
        Some("<who: text> [style: text]")
    );
}

#[test]
fn command_names_exclude_aliases_and_sort() {
    let dispatcher = build(vec![
        add_command().alias("sum"),
        Command::<Log>::new("boom", |_| async move { Ok(()) }),
    ]);
    assert_eq!(dispatcher.command_names(), vec!["add", "boom"]);
}
