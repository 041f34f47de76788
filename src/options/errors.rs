/// Errors from declaring, parsing and validating options.
use thiserror::Error;

/// Misuse of the registry during the configuration phase.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An option with this long name is already declared.
    #[error("Option '{0}' is already declared")]
    DuplicateOption(String),

    /// Another option already owns this short alias.
    #[error("Short alias '-{alias}' is already used by '--{owner}'")]
    DuplicateShortAlias {
        /// The contested alias character.
        alias: char,
        /// Long name of the option that holds it.
        owner: String,
    },

    /// The registry was frozen when parsing began.
    #[error("Cannot change option '{0}' after parameters were loaded")]
    Frozen(String),
}

/// Hard errors raised while scanning the argument vector.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A non-repeatable option was given twice.
    #[error("ERROR: {0} parameter given twice")]
    DuplicateOption(String),

    /// A value-taking option was the last token.
    #[error("ERROR: {0} parameter needs a value after it")]
    MissingValue(String),
}

/// Violations found after parsing. All of them are collected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Param {0} required!")]
    MissingRequiredOption(String),

    #[error("Argument <{0}> required!")]
    MissingRequiredArgument(String),

    #[error("Unexpected option {0}!")]
    UnknownOption(String),
}
