//! Command descriptors: name, aliases, usage list, checks, and handler.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::usage::UsageRef;

/// An error surfaced by a command handler.
///
/// Handler failures never propagate out of a dispatch; they are captured
/// and reported through the dispatch outcome.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The built handler-call arguments: the caller context plus the parsed
/// values, shared so every check and the handler see the same data.
pub struct CallArgs<X> {
    /// The caller-supplied dispatch context.
    pub context: Arc<X>,
    /// Parsed argument values in usage-list order.
    pub values: Arc<Vec<Value>>,
}

impl<X> CallArgs<X> {
    /// Creates call arguments from a shared context and parsed values.
    #[must_use]
    pub fn new(context: Arc<X>, values: Vec<Value>) -> Self {
        Self {
            context,
            values: Arc::new(values),
        }
    }
}

impl<X> Clone for CallArgs<X> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            values: Arc::clone(&self.values),
        }
    }
}

impl<X> std::fmt::Debug for CallArgs<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallArgs")
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

/// Verdict of one pre-execution check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The check passed.
    Pass,
    /// The check failed with a message for the caller.
    Fail(String),
}

/// An async pre-execution check.
pub type Check<X> = Arc<dyn Fn(CallArgs<X>) -> BoxFuture<'static, CheckOutcome> + Send + Sync>;

/// An async command handler.
pub type Handler<X> =
    Arc<dyn Fn(CallArgs<X>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// A registered command.
///
/// Construction requires a name and a handler; everything else is
/// declared through the chainable setters.
///
/// # Example
///
/// ```
/// use palaver::Command;
///
/// let command: Command<()> = Command::new("add", |call| async move {
///     let _ = call.values;
///     Ok(())
/// })
/// .alias("sum")
/// .describe("Adds two numbers.")
/// .usage("<a:number>")
/// .usage("<b:number>");
/// assert_eq!(command.name(), "add");
/// ```
pub struct Command<X> {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    usage: Vec<UsageRef<X>>,
    checks: Vec<Check<X>>,
    run: Handler<X>,
}

impl<X> Command<X> {
    /// Creates a command from its name and handler.
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(CallArgs<X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            usage: Vec::new(),
            checks: Vec::new(),
            run: Arc::new(move |call| Box::pin(run(call))),
        }
    }

    /// Adds an alternate name resolving to this command.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the human-readable description shown by help output.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends one positional usage reference.
    #[must_use]
    pub fn usage(mut self, reference: impl Into<UsageRef<X>>) -> Self {
        self.usage.push(reference.into());
        self
    }

    /// Appends one pre-execution check.
    ///
    /// Checks run in declaration order and are never short-circuited: all
    /// of them run even after one fails, so the caller sees the complete
    /// failure set.
    #[must_use]
    pub fn check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(CallArgs<X>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckOutcome> + Send + 'static,
    {
        self.checks.push(Arc::new(move |call| Box::pin(check(call))));
        self
    }

    /// The unique command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternate names for this command.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The description, if one was declared.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The ordered positional usage references.
    #[must_use]
    pub fn usage_refs(&self) -> &[UsageRef<X>] {
        &self.usage
    }

    /// The ordered pre-execution checks.
    #[must_use]
    pub fn checks(&self) -> &[Check<X>] {
        &self.checks
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Handler<X> {
        &self.run
    }
}

impl<X> std::fmt::Debug for Command<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("usage", &self.usage)
            .field("checks", &self.checks.len())
            .finish_non_exhaustive()
    }
}
