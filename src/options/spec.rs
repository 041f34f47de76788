/// Declarations for options and positional arguments.

/// Help grouping for a declared option. Metadata only, never behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionGroup {
    /// Pre-registered for every script (`--help`, `--quiet`, ...).
    Generic,
    /// Pre-registered depending on what the script uses (datastore, batches).
    Dependent,
    /// Declared by the script itself.
    Specific,
}

/// A named command-line switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Long name, used as `--name`.
    pub name: String,
    /// One-line description shown in help.
    pub description: String,
    /// Validation fails when the option is absent.
    pub required: bool,
    /// The option consumes the following token as its value.
    pub takes_value: bool,
    /// Optional single-character alias, used as `-c`.
    pub short_alias: Option<char>,
    /// The option may be given more than once; values accumulate.
    pub repeatable: bool,
}

impl OptionSpec {
    /// A valueless, optional, non-repeatable flag.
    #[must_use]
    pub fn flag(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            takes_value: false,
            short_alias: None,
            repeatable: false,
        }
    }

    /// An optional option that consumes a value.
    #[must_use]
    pub fn with_value(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            takes_value: true,
            ..Self::flag(name, description)
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn short(mut self, alias: char) -> Self {
        self.short_alias = Some(alias);
        self
    }

    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

/// A positional argument, matched by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PositionalSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
        }
    }
}
