//! Console front-end for the palaver dispatcher.
//!
//! Reads lines from stdin, dispatches them with the `!` prefix, and prints
//! the outcome of each invocation. The binary doubles as a living example
//! of wiring commands, custom usages, and checks into a dispatcher.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use palaver::{CheckOutcome, Command, Dispatcher, Outcome, Value};
use tracing_subscriber::EnvFilter;

/// Per-dispatch context: where command output goes.
#[derive(Debug, Default)]
struct Console;

impl Console {
    fn say(&self, text: impl AsRef<str>) {
        println!("{}", text.as_ref());
    }
}

fn build_dispatcher(help: Arc<OnceLock<String>>) -> Result<Dispatcher<Console>> {
    let dispatcher = Dispatcher::<Console>::builder()
        .prefix("!")
        .command(
            Command::<Console>::new("add", |call| async move {
                let sum: f64 = call.values.iter().filter_map(Value::as_f64).sum();
                call.context.say(format!("= {sum}"));
                Ok(())
            })
            .describe("Adds two numbers.")
            .alias("sum")
            .usage("<a:number>")
            .usage("<b:number>"),
        )
        .command(
            Command::<Console>::new("echo", |call| async move {
                let text = call.values.first().and_then(Value::as_str).unwrap_or_default();
                call.context.say(text);
                Ok(())
            })
            .describe("Repeats the given text.")
            .usage("<text:text...>"),
        )
        .command(
            Command::<Console>::new("shout", |call| async move {
                let text = call.values.first().and_then(Value::as_str).unwrap_or_default();
                call.context.say(text.to_uppercase());
                Ok(())
            })
            .describe("Repeats the given text, loudly.")
            .check(|call| async move {
                let length = call
                    .values
                    .first()
                    .and_then(Value::as_str)
                    .map_or(0, str::len);
                if length > 80 {
                    CheckOutcome::Fail("that is too much to shout about".to_owned())
                } else {
                    CheckOutcome::Pass
                }
            })
            .usage("<text:text...>"),
        )
        .command(
            Command::<Console>::new("help", move |call| {
                let help = Arc::clone(&help);
                async move {
                    call.context
                        .say(help.get().map(String::as_str).unwrap_or_default());
                    Ok(())
                }
            })
            .describe("Lists the available commands."),
        )
        .build()?;
    Ok(dispatcher)
}

fn render_help(dispatcher: &Dispatcher<Console>) -> String {
    let mut listing = String::new();
    for name in dispatcher.command_names() {
        let usage = dispatcher.usage_line(&name).unwrap_or_default();
        let description = dispatcher
            .command(&name)
            .and_then(Command::description)
            .unwrap_or_default();
        let prefix = dispatcher.prefix();
        if usage.is_empty() {
            listing.push_str(&format!("{prefix}{name} - {description}\n"));
        } else {
            listing.push_str(&format!("{prefix}{name} {usage} - {description}\n"));
        }
    }
    listing.trim_end().to_owned()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let help: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
    let dispatcher = build_dispatcher(Arc::clone(&help))?;
    let _ = help.set(render_help(&dispatcher));

    println!("palaver repl - type !help for commands, exit to quit");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line == "exit" {
            break;
        }

        match dispatcher.run(line, Console).await {
            Outcome::Completed | Outcome::Ignored => {}
            Outcome::UnknownCommand { name } => println!("unknown command: {name}"),
            Outcome::InvalidUsage { errors } => {
                for error in errors {
                    println!("{error}");
                }
            }
            Outcome::FailedChecks { messages } => {
                for message in messages {
                    println!("{message}");
                }
            }
            Outcome::HandlerError { message } => println!("command failed: {message}"),
            Outcome::Halted { stage } => tracing::debug!(%stage, "dispatch halted"),
        }
    }

    Ok(())
}
