//! Positional argument parsing against a resolved usage list.
//!
//! [`ArgumentParser`] owns the usage registry and the name styling. Parsing
//! tokenizes the raw argument string, matches tokens to usages by position
//! (a rest usage takes the rejoined remainder), and runs each usage's
//! parser chain as a left fold from the native parser outward. Successes
//! and failures are accumulated separately; the dispatcher treats any
//! failure as total failure of the invocation.

use serde_json::Value;

use crate::error::{SetupError, UsageError};
use crate::registry::{ResolvedUsage, UsageRegistry};
use crate::tokenize::split_args;
use crate::usage::{ParseInput, Styling, UsageFailure, UsageRef};

/// The outcome of parsing one argument string against a usage list.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Parsed values in original usage order.
    pub values: Vec<Value>,
    /// Structured failures, one per failing usage position.
    pub errors: Vec<UsageError>,
}

/// Parses raw argument strings into typed values.
pub struct ArgumentParser<X> {
    registry: UsageRegistry<X>,
    styling: Styling,
}

impl<X: 'static> Default for ArgumentParser<X> {
    fn default() -> Self {
        Self {
            registry: UsageRegistry::new(),
            styling: Styling::default(),
        }
    }
}

impl<X: 'static> ArgumentParser<X> {
    /// Creates a parser with the native usages and identity styling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the name styling hook.
    pub fn set_styling(&mut self, styling: Styling) {
        self.styling = styling;
    }

    /// The usage registry backing this parser.
    #[must_use]
    pub fn registry(&self) -> &UsageRegistry<X> {
        &self.registry
    }

    /// Mutable access to the usage registry, for registration.
    pub fn registry_mut(&mut self) -> &mut UsageRegistry<X> {
        &mut self.registry
    }

    /// Resolves an ordered usage reference list.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures from the registry.
    pub fn resolve_all(
        &self,
        references: &[UsageRef<X>],
    ) -> Result<Vec<ResolvedUsage<X>>, SetupError> {
        references
            .iter()
            .map(|reference| self.registry.resolve(reference))
            .collect()
    }

    /// Parses `raw` positionally against `usages`.
    ///
    /// The i-th usage consumes the i-th token; a rest usage consumes the
    /// space-rejoined remainder from its position onward. A blank token
    /// against a required usage records a required-argument error without
    /// invoking the parser chain.
    pub fn parse_all(
        &self,
        raw: &str,
        usages: &[ResolvedUsage<X>],
        context: &X,
    ) -> ParseOutcome {
        let tokens = split_args(raw);
        let mut outcome = ParseOutcome::default();

        for (position, usage) in usages.iter().enumerate() {
            let raw_arg = if usage.is_rest() {
                if position < tokens.len() {
                    Some(tokens[position..].join(" "))
                } else {
                    None
                }
            } else {
                tokens.get(position).cloned()
            };
            let raw_arg = raw_arg.filter(|token| !token.trim().is_empty());

            if raw_arg.is_none() && !usage.is_optional() {
                outcome.errors.push(self.required_error(usage));
                continue;
            }

            match self.parse_usage(usage, raw_arg.as_deref(), context) {
                Ok(value) => outcome.values.push(value),
                Err(failure) => outcome.errors.push(UsageError::new(
                    usage.display_name(),
                    usage.type_name(),
                    failure.message,
                )),
            }
        }

        outcome
    }

    /// Runs one usage's parser chain over a single token.
    ///
    /// An absent token yields the resolved default when the usage is
    /// optional and a required failure otherwise. The chain folds the token
    /// through every parser native-first; the first failure
    /// short-circuits.
    ///
    /// # Errors
    ///
    /// Returns the first [`UsageFailure`] produced by the chain, or the
    /// required-argument failure for an absent token.
    pub fn parse_usage(
        &self,
        usage: &ResolvedUsage<X>,
        raw: Option<&str>,
        context: &X,
    ) -> Result<Value, UsageFailure> {
        let Some(raw) = raw else {
            if usage.is_optional() {
                return Ok(usage.default_value(context));
            }
            return Err(UsageFailure::new(self.required_message(usage)));
        };

        let mut value = Value::String(raw.to_owned());
        for parse in usage.parsers() {
            value = parse(ParseInput {
                value,
                name: usage.display_name(),
                opts: usage.opts(),
                style: &self.styling,
                context,
            })?;
        }
        Ok(value)
    }

    fn required_message(&self, usage: &ResolvedUsage<X>) -> String {
        format!("{} is required!", self.styling.arg(usage.display_name()))
    }

    fn required_error(&self, usage: &ResolvedUsage<X>) -> UsageError {
        UsageError::new(
            usage.display_name(),
            usage.type_name(),
            self.required_message(usage),
        )
    }
}

impl<X> std::fmt::Debug for ArgumentParser<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentParser").finish_non_exhaustive()
    }
}
