/// Single-pass argv scanner.
///
/// Tokens are consumed strictly left to right with no backtracking:
///
/// 1. `--` ends option scanning; everything after it is positional.
/// 2. `--name` is a long option. If `name` (the whole remainder, `=` included)
///    is declared with a value, the next token is its value whatever it looks
///    like. Otherwise the remainder is split on the first `=`; without one the
///    option is recorded as [`OptionValue::Present`].
/// 3. A lone `-` is positional.
/// 4. `-abc` is a pack of short options. A character that is not itself a
///    declared name is resolved through the alias table. A value-taking option
///    claims the next token and ends the pack.
/// 5. Anything else is positional.
///
/// Undeclared names are recorded as-is; rejecting them is the validator's job.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::errors::ParseError;
use super::registry::OptionRegistry;

/// One occurrence of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Valueless flag. Renders as `1`.
    Present,
    /// Explicit value.
    Text(String),
}

impl OptionValue {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "1",
            Self::Text(s) => s,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Present => serializer.serialize_u8(1),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// The collapsed value of an option after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParsedValue {
    /// Non-repeatable option.
    Single(OptionValue),
    /// Repeatable option, values in command-line order.
    Multiple(Vec<OptionValue>),
}

/// Option name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParsedOptions {
    values: BTreeMap<String, ParsedValue>,
}

impl ParsedOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParsedValue> {
        self.values.get(name)
    }

    /// The single value of `name`; for a repeatable option, its first value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParsedValue::Single(v) => Some(v.as_str()),
            ParsedValue::Multiple(vs) => vs.first().map(OptionValue::as_str),
        }
    }

    /// Every value of `name`, in command-line order.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        match self.values.get(name) {
            Some(ParsedValue::Single(v)) => vec![v.as_str()],
            Some(ParsedValue::Multiple(vs)) => vs.iter().map(OptionValue::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Set a value directly, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: ParsedValue) {
        self.values.insert(name.into(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything one scan produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    pub options: ParsedOptions,
    pub args: Vec<String>,
    /// Every `(name, value)` as it appeared, duplicates included.
    pub ordered: Vec<(String, OptionValue)>,
}

impl ParsedInput {
    /// Record one occurrence of `name`.
    fn set(
        &mut self,
        registry: &OptionRegistry,
        name: &str,
        value: OptionValue,
    ) -> Result<(), ParseError> {
        self.ordered.push((name.to_owned(), value.clone()));

        if registry.is_repeatable(name) {
            match self.options.values.get_mut(name) {
                Some(ParsedValue::Multiple(vs)) => vs.push(value),
                _ => {
                    self.options
                        .insert(name, ParsedValue::Multiple(vec![value]));
                }
            }
            return Ok(());
        }

        if self.options.contains(name) {
            return Err(ParseError::DuplicateOption(name.to_owned()));
        }
        self.options.insert(name, ParsedValue::Single(value));
        Ok(())
    }
}

/// Scans argument vectors against a registry.
#[derive(Debug, Clone, Copy)]
pub struct ArgvParser<'r> {
    registry: &'r OptionRegistry,
}

impl<'r> ArgvParser<'r> {
    #[must_use]
    pub fn new(registry: &'r OptionRegistry) -> Self {
        Self { registry }
    }

    /// Parse `tokens` (program name already removed).
    ///
    /// # Errors
    ///
    /// - [`ParseError::MissingValue`] if a value-taking option is the last token
    /// - [`ParseError::DuplicateOption`] if a non-repeatable option repeats
    pub fn parse<I, S>(&self, tokens: I) -> Result<ParsedInput, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = tokens.into_iter().map(Into::into);
        let mut parsed = ParsedInput::default();

        while let Some(token) = tokens.next() {
            if token == "--" {
                parsed.args.extend(tokens.by_ref());
                break;
            } else if let Some(long) = token.strip_prefix("--") {
                if self.registry.takes_value(long) {
                    let value = tokens
                        .next()
                        .ok_or_else(|| ParseError::MissingValue(long.to_owned()))?;
                    parsed.set(self.registry, long, OptionValue::Text(value))?;
                } else if let Some((name, value)) = long.split_once('=') {
                    parsed.set(self.registry, name, OptionValue::from(value))?;
                } else {
                    parsed.set(self.registry, long, OptionValue::Present)?;
                }
            } else if token == "-" {
                parsed.args.push(token);
            } else if let Some(pack) = token.strip_prefix('-') {
                for c in pack.chars() {
                    let name = self.short_name(c);
                    if self.registry.takes_value(&name) {
                        let value = tokens
                            .next()
                            .ok_or_else(|| ParseError::MissingValue(name.clone()))?;
                        parsed.set(self.registry, &name, OptionValue::Text(value))?;
                        break;
                    }
                    parsed.set(self.registry, &name, OptionValue::Present)?;
                }
            } else {
                parsed.args.push(token);
            }
        }

        Ok(parsed)
    }

    fn short_name(&self, c: char) -> String {
        let literal = c.to_string();
        if self.registry.is_declared(&literal) {
            return literal;
        }
        self.registry
            .resolve_short(c)
            .map_or(literal, str::to_owned)
    }
}
