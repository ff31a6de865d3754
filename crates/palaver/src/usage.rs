//! Usage descriptors, shorthand references, and parse-function plumbing.
//!
//! A usage is a named, composable argument-type descriptor. Descriptors may
//! inherit from one another through their `type_name` pointer; the chain
//! terminates at the [`NATIVE_TYPE`] sentinel. Commands reference usages
//! either through the shorthand string grammar (`"<name:type>"`,
//! `"[name:type]"`, `"type..."`) or as inline descriptors.

use std::sync::Arc;

use serde_json::Value;

use crate::error::SetupError;

/// Sentinel type name terminating a usage inheritance chain.
pub const NATIVE_TYPE: &str = "native";

/// Option map attached to a usage descriptor.
pub type Opts = serde_json::Map<String, Value>;

/// Hook decorating argument names inside validation messages.
///
/// The default styling is the identity; a chat front-end may wrap names in
/// markup (the Discord adapter of old wrapped them in inline code).
#[derive(Clone)]
pub struct Styling {
    arg: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl Styling {
    /// Creates a styling from a name-decoration function.
    pub fn new(arg: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self { arg: Arc::new(arg) }
    }

    /// Applies the styling to an argument name.
    #[must_use]
    pub fn arg(&self, name: &str) -> String {
        (self.arg)(name)
    }
}

impl Default for Styling {
    fn default() -> Self {
        Self::new(str::to_owned)
    }
}

impl std::fmt::Debug for Styling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Styling").finish_non_exhaustive()
    }
}

/// A rejection produced by a usage parse function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageFailure {
    /// Human-readable message, already templated with the argument name.
    pub message: String,
}

impl UsageFailure {
    /// Creates a failure from a finished message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of one parse function in a usage chain.
pub type ParseResult = Result<Value, UsageFailure>;

/// Input handed to each parse function in a usage chain.
///
/// The first parser in a chain receives the raw token as a string value;
/// each subsequent parser receives the previous parser's output.
pub struct ParseInput<'a, X> {
    /// The value produced by the previous parser in the chain.
    pub value: Value,
    /// Display name of the argument being parsed.
    pub name: &'a str,
    /// Merged option map of the resolved usage.
    pub opts: &'a Opts,
    /// Name styling for failure messages.
    pub style: &'a Styling,
    /// The caller-supplied dispatch context.
    pub context: &'a X,
}

impl<X> ParseInput<'_, X> {
    /// Returns the argument name with styling applied.
    #[must_use]
    pub fn styled_name(&self) -> String {
        self.style.arg(self.name)
    }

    /// Builds a failure whose message is prefixed with the argument name.
    #[must_use]
    pub fn fail(&self, message: impl Into<String>) -> UsageFailure {
        UsageFailure::new(format!("{}: {}", self.styled_name(), message.into()))
    }
}

/// A parse function stored on a usage descriptor.
pub type ParseFn<X> = Arc<dyn for<'a> Fn(ParseInput<'a, X>) -> ParseResult + Send + Sync>;

/// Input handed to a computed default value.
pub struct DefaultInput<'a, X> {
    /// Display name of the argument.
    pub name: &'a str,
    /// Merged option map of the resolved usage.
    pub opts: &'a Opts,
    /// The caller-supplied dispatch context.
    pub context: &'a X,
}

/// Default supplied when an optional argument is absent.
pub enum DefaultValue<X> {
    /// A fixed value.
    Value(Value),
    /// A function of the parse context.
    Compute(Arc<dyn for<'a> Fn(DefaultInput<'a, X>) -> Value + Send + Sync>),
}

impl<X> Clone for DefaultValue<X> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Compute(f) => Self::Compute(Arc::clone(f)),
        }
    }
}

impl<X> std::fmt::Debug for DefaultValue<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Compute(_) => f.debug_tuple("Compute").finish_non_exhaustive(),
        }
    }
}

/// A usage descriptor: one named argument kind.
///
/// `type_name` points at the parent descriptor in the registry; a value of
/// [`NATIVE_TYPE`] ends the chain. Fields left unset on a descriptor are
/// filled from ancestors during resolution, most-specific first.
pub struct UsageSpec<X> {
    /// Parent usage type, or [`NATIVE_TYPE`].
    pub type_name: String,
    /// Display / bind name; defaults to the referenced type name when unset.
    pub name: Option<String>,
    /// Whether the argument may be absent; unset inherits from ancestors.
    pub optional: Option<bool>,
    /// Whether the argument captures all remaining tokens; unset inherits
    /// from ancestors.
    pub rest: Option<bool>,
    /// Default supplied when an optional argument is absent.
    pub default: Option<DefaultValue<X>>,
    /// Options consumed by parse functions (`min`, `max`, ...).
    pub opts: Opts,
    /// This descriptor's own parse function, if any.
    pub parse: Option<ParseFn<X>>,
}

impl<X> UsageSpec<X> {
    /// Creates a chain-terminating descriptor with no parent.
    #[must_use]
    pub fn native() -> Self {
        Self::extends(NATIVE_TYPE)
    }

    /// Creates a descriptor inheriting from `type_name`.
    #[must_use]
    pub fn extends(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            optional: None,
            rest: None,
            default: None,
            opts: Opts::new(),
            parse: None,
        }
    }

    /// Sets the bind name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the argument optional.
    #[must_use]
    pub fn with_optional(mut self) -> Self {
        self.optional = Some(true);
        self
    }

    /// Marks the argument as a rest capture.
    #[must_use]
    pub fn with_rest(mut self) -> Self {
        self.rest = Some(true);
        self
    }

    /// Sets a fixed default value.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    /// Sets a computed default value.
    #[must_use]
    pub fn with_default_fn(
        mut self,
        f: impl for<'a> Fn(DefaultInput<'a, X>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(DefaultValue::Compute(Arc::new(f)));
        self
    }

    /// Sets one parse option.
    #[must_use]
    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.opts.insert(key.into(), value);
        self
    }

    /// Sets the parse function.
    #[must_use]
    pub fn with_parse(
        mut self,
        f: impl for<'a> Fn(ParseInput<'a, X>) -> ParseResult + Send + Sync + 'static,
    ) -> Self {
        self.parse = Some(Arc::new(f));
        self
    }
}

impl<X> Clone for UsageSpec<X> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            name: self.name.clone(),
            optional: self.optional,
            rest: self.rest,
            default: self.default.clone(),
            opts: self.opts.clone(),
            parse: self.parse.clone(),
        }
    }
}

impl<X> std::fmt::Debug for UsageSpec<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageSpec")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("optional", &self.optional)
            .field("rest", &self.rest)
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// An unresolved usage reference on a command.
pub enum UsageRef<X> {
    /// Shorthand string grammar (`"<name:type>"`, `"[name:type]"`,
    /// `"type..."`).
    Shorthand(String),
    /// A descriptor supplied directly, bypassing the registry lookup.
    Inline(UsageSpec<X>),
}

impl<X> Clone for UsageRef<X> {
    fn clone(&self) -> Self {
        match self {
            Self::Shorthand(s) => Self::Shorthand(s.clone()),
            Self::Inline(spec) => Self::Inline(spec.clone()),
        }
    }
}

impl<X> std::fmt::Debug for UsageRef<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shorthand(s) => f.debug_tuple("Shorthand").field(s).finish(),
            Self::Inline(spec) => f.debug_tuple("Inline").field(spec).finish(),
        }
    }
}

impl<X> From<&str> for UsageRef<X> {
    fn from(s: &str) -> Self {
        Self::Shorthand(s.to_owned())
    }
}

impl<X> From<String> for UsageRef<X> {
    fn from(s: String) -> Self {
        Self::Shorthand(s)
    }
}

impl<X> From<UsageSpec<X>> for UsageRef<X> {
    fn from(spec: UsageSpec<X>) -> Self {
        Self::Inline(spec)
    }
}

/// The fields carried by a parsed shorthand token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Shorthand {
    pub type_name: String,
    pub name: Option<String>,
    pub optional: bool,
    pub rest: bool,
}

/// Parses the shorthand usage grammar.
///
/// A trailing `...` (inside or outside the bracket pair) marks a rest
/// capture and is stripped before further parsing. `<...>` denotes a
/// required argument, `[...]` an optional one; a bare token is a required
/// type-only reference. A single `:` splits the bind name from the type.
pub(crate) fn parse_shorthand(token: &str) -> Result<Shorthand, SetupError> {
    let mut body = token;
    let mut rest = false;
    if let Some(stripped) = body.strip_suffix("...") {
        rest = true;
        body = stripped;
    }

    let mut optional = false;
    if let Some(inner) = body.strip_prefix('<') {
        body = inner
            .strip_suffix('>')
            .ok_or_else(|| SetupError::UnclosedBracket {
                kind: "required",
                token: token.to_owned(),
            })?;
    } else if let Some(inner) = body.strip_prefix('[') {
        optional = true;
        body = inner
            .strip_suffix(']')
            .ok_or_else(|| SetupError::UnclosedBracket {
                kind: "optional",
                token: token.to_owned(),
            })?;
    }

    if let Some(stripped) = body.strip_suffix("...") {
        rest = true;
        body = stripped;
    }

    let (name, type_name) = match body.split_once(':') {
        Some((name, type_name)) => (Some(name.trim().to_owned()), type_name.trim().to_owned()),
        None => (None, body.trim().to_owned()),
    };

    Ok(Shorthand {
        type_name,
        name,
        optional,
        rest,
    })
}

/// Renders one usage for display: `<name[: type]>` or `[name[: type]]`.
///
/// The type annotation appears only when the bind name differs from the
/// usage type name.
#[must_use]
pub fn render_usage(name: &str, type_name: &str, optional: bool) -> String {
    let (open, close) = if optional { ('[', ']') } else { ('<', '>') };
    if name == type_name || type_name == NATIVE_TYPE {
        format!("{open}{name}{close}")
    } else {
        format!("{open}{name}: {type_name}{close}")
    }
}
