//! Command dispatcher: the fixed stage sequence plus caller stages.
//!
//! The dispatcher wires the split, resolve, parse-usages, checks, and run
//! stages into a [`Pipeline`] over an [`Invocation`] context, interleaving
//! any caller-registered stages per their declared dependencies. Every
//! dispatch-flow failure is reported through the returned [`Outcome`];
//! only configuration problems surface as errors, and only from
//! [`DispatcherBuilder::build`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::command::{CallArgs, CheckOutcome, Command};
use crate::error::{SetupError, UsageError};
use crate::parser::ArgumentParser;
use crate::pipeline::{Pipeline, PipelineRun, Stage, StageFlow};
use crate::reader::StringReader;
use crate::registry::ResolvedUsage;
use crate::usage::{Styling, UsageSpec};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Id of the core stage splitting the input line.
pub const STAGE_SPLIT: &str = "split";
/// Id of the core stage resolving the command name.
pub const STAGE_RESOLVE: &str = "resolve";
/// Id of the core stage parsing arguments.
pub const STAGE_PARSE_USAGES: &str = "parse-usages";
/// Id of the core stage running pre-execution checks.
pub const STAGE_CHECKS: &str = "checks";
/// Id of the core stage invoking the handler.
pub const STAGE_RUN: &str = "run";

/// The result of one dispatch.
///
/// External collaborators pattern-match on this instead of subscribing to
/// side-channel events; every failure path of the pipeline maps to one
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    /// The handler ran to completion.
    Completed,
    /// The input did not carry the configured prefix; the dispatch was a
    /// no-op.
    Ignored,
    /// No command is registered under the parsed name or its aliases.
    UnknownCommand {
        /// The unresolvable command name.
        name: String,
    },
    /// Argument parsing failed; the handler never ran.
    InvalidUsage {
        /// One structured error per failing usage position.
        errors: Vec<UsageError>,
    },
    /// At least one pre-execution check failed; the handler never ran.
    FailedChecks {
        /// Failure messages in check declaration order.
        messages: Vec<String>,
    },
    /// The handler ran and returned an error.
    HandlerError {
        /// Rendering of the handler's error.
        message: String,
    },
    /// A caller stage halted the pipeline without recording an outcome.
    Halted {
        /// Id of the halting stage.
        stage: String,
    },
}

/// The execution context threaded through one dispatch invocation.
///
/// Core stages accumulate their fields here; caller stages may read any
/// field set by an earlier stage and must pass the context forward intact.
/// A stage that drops previously set fields truncates the context for
/// everything after it — the core stages treat a missing upstream field
/// as a silent halt.
pub struct Invocation<X> {
    /// The raw input line, prefix included.
    pub input: String,
    /// The caller-supplied per-dispatch context.
    pub context: Arc<X>,
    /// Case-folded command name, set by the split stage.
    pub command_name: Option<String>,
    /// Raw argument remainder, set by the split stage.
    pub raw_args: Option<String>,
    /// Resolved command, set by the resolve stage.
    pub command: Option<Arc<Command<X>>>,
    /// Built handler-call arguments, set by the parse-usages stage.
    pub call: Option<CallArgs<X>>,
    /// The outcome recorded by a halting or terminal stage.
    pub outcome: Option<Outcome>,
}

impl<X> std::fmt::Debug for Invocation<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("input", &self.input)
            .field("command_name", &self.command_name)
            .field("raw_args", &self.raw_args)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// Caller-overridable projection from parsed values to handler-call
/// values.
pub type ArgumentProjection<X> = Arc<dyn Fn(&X, Vec<Value>) -> Vec<Value> + Send + Sync>;

struct Shared<X> {
    prefix: String,
    commands: HashMap<String, Arc<Command<X>>>,
    aliases: HashMap<String, String>,
    parser: ArgumentParser<X>,
    resolved: HashMap<String, Arc<Vec<ResolvedUsage<X>>>>,
    projection: Option<ArgumentProjection<X>>,
}

/// Builder collecting the dispatcher's configuration.
///
/// All configuration validation happens in [`DispatcherBuilder::build`]:
/// stage graph construction, resolution of every command's usage list, and
/// rejection of rest usages that are not last.
pub struct DispatcherBuilder<X> {
    prefix: String,
    commands: HashMap<String, Arc<Command<X>>>,
    aliases: HashMap<String, String>,
    parser: ArgumentParser<X>,
    stages: Vec<Stage<Invocation<X>>>,
    projection: Option<ArgumentProjection<X>>,
}

impl<X: Send + Sync + 'static> Default for DispatcherBuilder<X> {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            commands: HashMap::new(),
            aliases: HashMap::new(),
            parser: ArgumentParser::new(),
            stages: Vec::new(),
            projection: None,
        }
    }
}

impl<X: Send + Sync + 'static> DispatcherBuilder<X> {
    /// Creates an empty builder with no prefix and the native usages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command prefix stripped by the split stage.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the argument-name styling used in validation messages.
    #[must_use]
    pub fn styling(mut self, styling: Styling) -> Self {
        self.parser.set_styling(styling);
        self
    }

    /// Registers a usage descriptor under `type_name`.
    #[must_use]
    pub fn usage(mut self, type_name: impl Into<String>, spec: UsageSpec<X>) -> Self {
        self.parser.registry_mut().register(type_name, spec);
        self
    }

    /// Registers a command.
    ///
    /// A later registration under an existing name or alias overwrites the
    /// prior entry with a warning. Aliases of a displaced command keep
    /// resolving to whatever the name now maps to.
    #[must_use]
    pub fn command(mut self, command: Command<X>) -> Self {
        let command = Arc::new(command);
        let name = command.name().to_owned();
        if self
            .commands
            .insert(name.clone(), Arc::clone(&command))
            .is_some()
        {
            warn!(target: DISPATCH_TARGET, command = %name, "command already registered; overwriting");
        }
        for alias in command.aliases() {
            if self.commands.contains_key(alias.as_str())
                || self.aliases.contains_key(alias.as_str())
            {
                warn!(
                    target: DISPATCH_TARGET,
                    %alias,
                    command = %name,
                    "alias shadows an existing registration; overwriting"
                );
            }
            self.aliases.insert(alias.clone(), name.clone());
        }
        self
    }

    /// Registers a caller stage, interleaved per its declared
    /// dependencies against the core stage ids.
    #[must_use]
    pub fn stage(mut self, stage: Stage<Invocation<X>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Overrides the projection from parsed values to handler-call
    /// values. The default passes the parsed values through untouched.
    #[must_use]
    pub fn build_arguments(
        mut self,
        projection: impl Fn(&X, Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        self.projection = Some(Arc::new(projection));
        self
    }

    /// Validates the configuration and assembles the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] for an empty command name, an unresolvable
    /// usage reference, a rest usage that is not last in its list, or a
    /// defective stage graph (duplicate ids, unknown references, cycles).
    pub fn build(self) -> Result<Dispatcher<X>, SetupError> {
        let mut resolved = HashMap::new();
        for (name, command) in &self.commands {
            if name.trim().is_empty() {
                return Err(SetupError::invalid_command("command name must not be empty"));
            }
            let usages = self.parser.resolve_all(command.usage_refs())?;
            if let Some(position) = usages.iter().position(|usage| usage.is_rest())
                && position + 1 < usages.len()
            {
                return Err(SetupError::rest_not_last(
                    name,
                    usages[position].display_name(),
                ));
            }
            resolved.insert(name.clone(), Arc::new(usages));
        }

        let shared = Arc::new(Shared {
            prefix: self.prefix,
            commands: self.commands,
            aliases: self.aliases,
            parser: self.parser,
            resolved,
            projection: self.projection,
        });

        let mut stages = core_stages(&shared);
        stages.extend(self.stages);
        let pipeline = Pipeline::build(stages)?;

        Ok(Dispatcher { shared, pipeline })
    }
}

/// The assembled dispatcher.
///
/// Registries are immutable after build; [`Dispatcher::run`] takes
/// `&self`, so independent dispatches may be in flight concurrently.
/// Checks run sequentially within one dispatch to keep failure ordering
/// deterministic.
pub struct Dispatcher<X> {
    shared: Arc<Shared<X>>,
    pipeline: Pipeline<Invocation<X>>,
}

impl<X: Send + Sync + 'static> Dispatcher<X> {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> DispatcherBuilder<X> {
        DispatcherBuilder::new()
    }

    /// Dispatches one input line.
    ///
    /// The invocation context is created fresh for this call and discarded
    /// when it returns; the outcome is the only observable result.
    pub async fn run(&self, input: impl Into<String>, context: X) -> Outcome {
        let invocation = Invocation {
            input: input.into(),
            context: Arc::new(context),
            command_name: None,
            raw_args: None,
            command: None,
            call: None,
            outcome: None,
        };
        finish(self.pipeline.execute(invocation).await)
    }

    /// The configured prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.shared.prefix
    }

    /// Registered command names, aliases excluded, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.commands.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Looks up a command by name or alias.
    #[must_use]
    pub fn command(&self, name: &str) -> Option<&Command<X>> {
        let canonical = if self.shared.commands.contains_key(name) {
            name
        } else {
            self.shared.aliases.get(name)?.as_str()
        };
        self.shared.commands.get(canonical).map(Arc::as_ref)
    }

    /// Renders a command's usage list for help output.
    ///
    /// Required usages render as `<name[: type]>`, optional ones as
    /// `[name[: type]]`, joined by single spaces.
    #[must_use]
    pub fn usage_line(&self, name: &str) -> Option<String> {
        let command = self.command(name)?;
        let usages = self.shared.resolved.get(command.name())?;
        Some(
            usages
                .iter()
                .map(ResolvedUsage::render)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    /// Stage ids in execution order, for diagnostics.
    #[must_use]
    pub fn stage_order(&self) -> Vec<&str> {
        self.pipeline.order()
    }
}

impl<X> std::fmt::Debug for Dispatcher<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.shared.prefix)
            .field("commands", &self.shared.commands.len())
            .finish_non_exhaustive()
    }
}

fn finish<X>(run: PipelineRun<Invocation<X>>) -> Outcome {
    if let Some(outcome) = run.context.outcome {
        return outcome;
    }
    match run.halted_at {
        Some(stage) => Outcome::Halted { stage },
        None => Outcome::Completed,
    }
}

/// Builds the five core stages, chained through `after`/`requires` edges
/// so caller stages interleave freely.
fn core_stages<X: Send + Sync + 'static>(
    shared: &Arc<Shared<X>>,
) -> Vec<Stage<Invocation<X>>> {
    vec![
        split_stage(Arc::clone(shared)),
        resolve_stage(Arc::clone(shared)).after(STAGE_SPLIT),
        parse_usages_stage(Arc::clone(shared)).after(STAGE_RESOLVE),
        checks_stage().requires(STAGE_PARSE_USAGES),
        run_stage().after(STAGE_CHECKS),
    ]
}

fn split_stage<X: Send + Sync + 'static>(shared: Arc<Shared<X>>) -> Stage<Invocation<X>> {
    Stage::new(STAGE_SPLIT, move |mut ctx: Invocation<X>| {
        let shared = Arc::clone(&shared);
        async move {
            if !ctx.input.starts_with(&shared.prefix) {
                ctx.outcome = Some(Outcome::Ignored);
                return StageFlow::Halt(ctx);
            }
            let body = ctx.input[shared.prefix.len()..].to_owned();
            let mut reader = StringReader::new(&body);
            ctx.command_name = Some(reader.read_until(char::is_whitespace).to_lowercase());
            ctx.raw_args = Some(reader.rest());
            StageFlow::Continue(ctx)
        }
    })
}

fn resolve_stage<X: Send + Sync + 'static>(shared: Arc<Shared<X>>) -> Stage<Invocation<X>> {
    Stage::new(STAGE_RESOLVE, move |mut ctx: Invocation<X>| {
        let shared = Arc::clone(&shared);
        async move {
            let Some(name) = ctx.command_name.clone() else {
                return StageFlow::Halt(ctx);
            };
            // Aliases are only consulted after a direct name miss.
            let command = shared.commands.get(&name).or_else(|| {
                shared
                    .aliases
                    .get(&name)
                    .and_then(|canonical| shared.commands.get(canonical))
            });
            match command {
                Some(command) => {
                    ctx.command = Some(Arc::clone(command));
                    StageFlow::Continue(ctx)
                }
                None => {
                    ctx.outcome = Some(Outcome::UnknownCommand { name });
                    StageFlow::Halt(ctx)
                }
            }
        }
    })
}

fn parse_usages_stage<X: Send + Sync + 'static>(
    shared: Arc<Shared<X>>,
) -> Stage<Invocation<X>> {
    Stage::new(STAGE_PARSE_USAGES, move |mut ctx: Invocation<X>| {
        let shared = Arc::clone(&shared);
        async move {
            let Some(command) = ctx.command.clone() else {
                return StageFlow::Halt(ctx);
            };
            let raw = ctx.raw_args.clone().unwrap_or_default();
            let usages = shared
                .resolved
                .get(command.name())
                .cloned()
                .unwrap_or_default();

            let parsed = shared.parser.parse_all(&raw, &usages, &ctx.context);
            if !parsed.errors.is_empty() {
                ctx.outcome = Some(Outcome::InvalidUsage {
                    errors: parsed.errors,
                });
                return StageFlow::Halt(ctx);
            }

            let values = match &shared.projection {
                Some(projection) => projection(&ctx.context, parsed.values),
                None => parsed.values,
            };
            ctx.call = Some(CallArgs::new(Arc::clone(&ctx.context), values));
            StageFlow::Continue(ctx)
        }
    })
}

fn checks_stage<X: Send + Sync + 'static>() -> Stage<Invocation<X>> {
    Stage::new(STAGE_CHECKS, move |mut ctx: Invocation<X>| async move {
        let (Some(command), Some(call)) = (ctx.command.clone(), ctx.call.clone()) else {
            return StageFlow::Halt(ctx);
        };
        // Checks are not short-circuited: all of them run so the caller
        // sees the complete failure set.
        let mut failures = Vec::new();
        for check in command.checks() {
            if let CheckOutcome::Fail(message) = check(call.clone()).await {
                failures.push(message);
            }
        }
        if failures.is_empty() {
            StageFlow::Continue(ctx)
        } else {
            ctx.outcome = Some(Outcome::FailedChecks { messages: failures });
            StageFlow::Halt(ctx)
        }
    })
}

fn run_stage<X: Send + Sync + 'static>() -> Stage<Invocation<X>> {
    Stage::new(STAGE_RUN, move |mut ctx: Invocation<X>| async move {
        let (Some(command), Some(call)) = (ctx.command.clone(), ctx.call.clone()) else {
            return StageFlow::Halt(ctx);
        };
        ctx.outcome = Some(match (command.handler())(call).await {
            Ok(()) => Outcome::Completed,
            Err(error) => Outcome::HandlerError {
                message: error.to_string(),
            },
        });
        StageFlow::Continue(ctx)
    })
}
