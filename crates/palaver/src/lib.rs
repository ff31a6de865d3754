//! Text-command dispatch for chat-bot style applications.
//!
//! Given a line of input text and a caller-supplied context, `palaver`
//! resolves the line to a registered command, parses its arguments against
//! a declarative usage grammar, runs pre-execution checks, and invokes the
//! command's handler. The whole flow is a dependency-ordered middleware
//! pipeline; callers can splice their own stages in between the core ones.
//!
//! # Core pieces
//!
//! - [`Dispatcher`] / [`DispatcherBuilder`] - registration and the dispatch
//!   entry point. Every dispatch returns a sum-typed [`Outcome`]; no
//!   dispatch-flow failure is ever an error escaping [`Dispatcher::run`].
//! - [`UsageRegistry`] - named, composable argument-type descriptors with
//!   inheritance chains terminating at the [`NATIVE_TYPE`] sentinel.
//! - [`ArgumentParser`] - positional parsing of a raw argument string
//!   against a resolved usage list.
//! - [`Pipeline`] / [`Stage`] - the dependency-ordered stage executor with
//!   cycle detection.
//!
//! # Example
//!
//! ```
//! use palaver::{Command, Dispatcher, Outcome};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), palaver::SetupError> {
//! let dispatcher = Dispatcher::<()>::builder()
//!     .prefix("!")
//!     .command(
//!         Command::new("add", |call| async move {
//!             let sum: f64 = call.values.iter().filter_map(|v| v.as_f64()).sum();
//!             assert_eq!(sum, 5.0);
//!             Ok(())
//!         })
//!         .usage("<a:number>")
//!         .usage("<b:number>"),
//!     )
//!     .build()?;
//!
//! assert_eq!(dispatcher.run("!add 2 3", ()).await, Outcome::Completed);
//! # Ok(())
//! # }
//! ```

mod command;
mod dispatch;
mod error;
mod parser;
mod pipeline;
mod reader;
mod registry;
mod tokenize;
mod usage;

pub use command::{CallArgs, Check, CheckOutcome, Command, Handler, HandlerError};
pub use dispatch::{
    ArgumentProjection, Dispatcher, DispatcherBuilder, Invocation, Outcome, STAGE_CHECKS,
    STAGE_PARSE_USAGES, STAGE_RESOLVE, STAGE_RUN, STAGE_SPLIT,
};
pub use error::{SetupError, UsageError};
pub use parser::{ArgumentParser, ParseOutcome};
pub use pipeline::{Pipeline, PipelineRun, Stage, StageFlow};
pub use reader::StringReader;
pub use registry::{ResolvedUsage, UsageRegistry};
pub use serde_json::Value;
pub use tokenize::split_args;
pub use usage::{
    DefaultInput, DefaultValue, NATIVE_TYPE, Opts, ParseFn, ParseInput, ParseResult, Styling,
    UsageFailure, UsageRef, UsageSpec, render_usage,
};

#[cfg(test)]
mod tests;
