//! Usage registry, inheritance-chain resolution, and the native usages.
//!
//! The registry maps usage type names to canonical descriptors. Resolution
//! produces an immutable [`ResolvedUsage`] working copy: the inheritance
//! chain is walked once toward the [`NATIVE_TYPE`](crate::NATIVE_TYPE)
//! sentinel, parse functions are collected outermost-to-innermost and then
//! reversed so the most primitive parser runs first, and unset fields are
//! filled from ancestors with first-write-wins priority. Canonical
//! descriptors are never mutated by resolution.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::warn;

use crate::error::SetupError;
use crate::usage::{
    DefaultInput, DefaultValue, NATIVE_TYPE, Opts, ParseFn, ParseInput, ParseResult, Shorthand,
    UsageFailure, UsageRef, UsageSpec, parse_shorthand, render_usage,
};

/// Tracing target for usage registration and resolution.
pub(crate) const USAGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::usage");

/// A fully resolved usage: merged fields plus the ordered parser chain.
pub struct ResolvedUsage<X> {
    display_name: String,
    type_name: String,
    optional: bool,
    rest: bool,
    default: Option<DefaultValue<X>>,
    opts: Opts,
    parsers: Vec<ParseFn<X>>,
}

impl<X> ResolvedUsage<X> {
    /// Display / bind name of the argument.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The usage type name the reference pointed at.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the argument may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the argument captures all remaining tokens.
    #[must_use]
    pub fn is_rest(&self) -> bool {
        self.rest
    }

    /// Merged parse options.
    #[must_use]
    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Parse functions ordered native-first.
    #[must_use]
    pub fn parsers(&self) -> &[ParseFn<X>] {
        &self.parsers
    }

    /// Resolves the default for an absent optional argument.
    ///
    /// Computed defaults are invoked with the argument name, the merged
    /// opts, and the caller context. An absent default yields `Null`.
    #[must_use]
    pub fn default_value(&self, context: &X) -> Value {
        match &self.default {
            None => Value::Null,
            Some(DefaultValue::Value(value)) => value.clone(),
            Some(DefaultValue::Compute(f)) => f(DefaultInput {
                name: &self.display_name,
                opts: &self.opts,
                context,
            }),
        }
    }

    /// Renders this usage for display (`<name[: type]>` / `[name[: type]]`).
    #[must_use]
    pub fn render(&self) -> String {
        render_usage(&self.display_name, &self.type_name, self.optional)
    }
}

impl<X> Clone for ResolvedUsage<X> {
    fn clone(&self) -> Self {
        Self {
            display_name: self.display_name.clone(),
            type_name: self.type_name.clone(),
            optional: self.optional,
            rest: self.rest,
            default: self.default.clone(),
            opts: self.opts.clone(),
            parsers: self.parsers.clone(),
        }
    }
}

impl<X> std::fmt::Debug for ResolvedUsage<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedUsage")
            .field("display_name", &self.display_name)
            .field("type_name", &self.type_name)
            .field("optional", &self.optional)
            .field("rest", &self.rest)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// Registry of usage descriptors keyed by type name.
///
/// A fresh registry is seeded with the native usages: `text`, `string`,
/// `number`, and `integer`.
pub struct UsageRegistry<X> {
    entries: HashMap<String, UsageSpec<X>>,
}

impl<X: 'static> Default for UsageRegistry<X> {
    fn default() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register("text", UsageSpec::native().with_parse(parse_text));
        registry.register("string", UsageSpec::extends("text"));
        registry.register("number", UsageSpec::native().with_parse(parse_number));
        registry.register(
            "integer",
            UsageSpec::extends("number").with_opt("is_int", Value::Bool(true)),
        );
        registry
    }
}

impl<X: 'static> UsageRegistry<X> {
    /// Creates a registry seeded with the native usages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites a descriptor under `type_name`.
    ///
    /// Overwriting an existing entry is permitted and logged as a warning.
    pub fn register(&mut self, type_name: impl Into<String>, spec: UsageSpec<X>) {
        let type_name = type_name.into();
        if self.entries.contains_key(&type_name) {
            warn!(target: USAGE_TARGET, %type_name, "usage already registered; overwriting");
        }
        self.entries.insert(type_name, spec);
    }

    /// Looks up a canonical descriptor.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&UsageSpec<X>> {
        self.entries.get(type_name)
    }

    /// Resolves a reference into a fully populated usage.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::UnresolvedUsage`] when a shorthand or chain
    /// link names an unregistered type, [`SetupError::CyclicUsage`] when
    /// the inheritance chain loops, and bracket errors from the shorthand
    /// grammar.
    pub fn resolve(&self, reference: &UsageRef<X>) -> Result<ResolvedUsage<X>, SetupError> {
        match reference {
            UsageRef::Shorthand(token) => {
                let shorthand = parse_shorthand(token)?;
                let spec = self
                    .get(&shorthand.type_name)
                    .ok_or_else(|| SetupError::unresolved_usage(&shorthand.type_name))?
                    .clone();
                self.resolve_chain(apply_shorthand(spec, &shorthand), shorthand.type_name)
            }
            UsageRef::Inline(spec) => {
                let type_name = spec.type_name.clone();
                self.resolve_chain(spec.clone(), type_name)
            }
        }
    }

    /// Walks the inheritance chain of `working`, merging ancestor fields
    /// and collecting parse functions.
    fn resolve_chain(
        &self,
        mut working: UsageSpec<X>,
        display_type: String,
    ) -> Result<ResolvedUsage<X>, SetupError> {
        let mut parsers: Vec<ParseFn<X>> = Vec::new();
        if let Some(parse) = &working.parse {
            parsers.push(parse.clone());
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = working.type_name.clone();
        while cursor != NATIVE_TYPE {
            if !seen.insert(cursor.clone()) {
                return Err(SetupError::cyclic_usage(cursor));
            }
            let parent = self
                .get(&cursor)
                .ok_or_else(|| SetupError::unresolved_usage(&cursor))?;

            if let Some(parse) = &parent.parse {
                parsers.push(parse.clone());
            }
            if working.name.is_none() {
                working.name = parent.name.clone();
            }
            if working.optional.is_none() {
                working.optional = parent.optional;
            }
            if working.rest.is_none() {
                working.rest = parent.rest;
            }
            if working.default.is_none() {
                working.default = parent.default.clone();
            }
            for (key, value) in &parent.opts {
                working
                    .opts
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }

            cursor = parent.type_name.clone();
        }

        // The chain is collected most-specific first; the fold must start
        // at the native end.
        parsers.reverse();

        let display_name = working.name.unwrap_or_else(|| display_type.clone());
        Ok(ResolvedUsage {
            display_name,
            type_name: display_type,
            optional: working.optional.unwrap_or(false),
            rest: working.rest.unwrap_or(false),
            default: working.default,
            opts: working.opts,
            parsers,
        })
    }
}

/// Overlays the shorthand-carried fields on a registry copy.
///
/// Brackets are authoritative for `optional`; the shorthand name takes
/// priority over whatever the canonical descriptor declares. An absent
/// rest marker leaves `rest` unset so it can still be inherited.
fn apply_shorthand<X>(mut spec: UsageSpec<X>, shorthand: &Shorthand) -> UsageSpec<X> {
    if shorthand.name.is_some() {
        spec.name = shorthand.name.clone();
    }
    spec.optional = Some(shorthand.optional);
    if shorthand.rest {
        spec.rest = Some(true);
    }
    spec
}

fn opt_f64(opts: &Opts, key: &str) -> Option<f64> {
    opts.get(key).and_then(Value::as_f64)
}

/// Native `text` parser: passes the token through, enforcing length bounds.
fn parse_text<X>(input: ParseInput<'_, X>) -> ParseResult {
    let text = match &input.value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    #[expect(
        clippy::cast_precision_loss,
        reason = "argument lengths are nowhere near 2^52"
    )]
    let length = text.chars().count() as f64;

    if let Some(max) = opt_f64(input.opts, "max")
        && length > max
    {
        return Err(UsageFailure::new(format!(
            "{} cannot be longer than {max} characters!",
            input.styled_name()
        )));
    }
    if let Some(min) = opt_f64(input.opts, "min")
        && length < min
    {
        return Err(UsageFailure::new(format!(
            "{} cannot be shorter than {min} characters!",
            input.styled_name()
        )));
    }

    Ok(Value::String(text))
}

/// Native `number` parser: numeric conversion with optional bounds and
/// whole-number enforcement.
fn parse_number<X>(input: ParseInput<'_, X>) -> ParseResult {
    let styled = input.styled_name();
    let not_a_number = || UsageFailure::new(format!("{styled} must be a number!"));

    let number = match &input.value {
        Value::Number(n) => n.as_f64().ok_or_else(not_a_number)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| not_a_number())?,
        _ => return Err(not_a_number()),
    };

    if input
        .opts
        .get("is_int")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        && number.fract() != 0.0
    {
        return Err(UsageFailure::new(format!(
            "{styled} must be a whole number!"
        )));
    }
    if let Some(max) = opt_f64(input.opts, "max")
        && number > max
    {
        return Err(UsageFailure::new(format!(
            "{styled} cannot be greater than {max}!"
        )));
    }
    if let Some(min) = opt_f64(input.opts, "min")
        && number < min
    {
        return Err(UsageFailure::new(format!(
            "{styled} cannot be smaller than {min}!"
        )));
    }

    let number = serde_json::Number::from_f64(number).ok_or_else(not_a_number)?;
    Ok(Value::Number(number))
}
