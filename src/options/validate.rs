/// Post-parse checks. Every check runs; all violations are returned together.
use super::errors::ValidationError;
use super::parser::ParsedOptions;
use super::registry::OptionRegistry;

/// Check parsed input against the registry.
///
/// Returns violations in a stable order: missing options (lexical order),
/// missing arguments (declaration order), unknown options (lexical order).
#[must_use]
pub fn validate(
    registry: &OptionRegistry,
    options: &ParsedOptions,
    args: &[String],
) -> Vec<ValidationError> {
    let mut violations = Vec::new();

    for name in registry.names_sorted() {
        let required = registry.get(name).is_some_and(|s| s.required);
        if required && !options.contains(name) {
            violations.push(ValidationError::MissingRequiredOption(name.to_owned()));
        }
    }

    for (index, positional) in registry.positionals().iter().enumerate() {
        if positional.required && args.get(index).is_none() {
            violations.push(ValidationError::MissingRequiredArgument(
                positional.name.clone(),
            ));
        }
    }

    if !registry.allows_unregistered() {
        for name in options.names() {
            if !registry.is_declared(name) {
                violations.push(ValidationError::UnknownOption(name.to_owned()));
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::parser::ArgvParser;
    use crate::options::spec::{OptionSpec, PositionalSpec};

    fn registry() -> OptionRegistry {
        let mut r = OptionRegistry::with_defaults(false);
        r.declare_option(OptionSpec::with_value("target", "Target").required())
            .unwrap();
        r.declare_positional(PositionalSpec::new("input", "Input file", true))
            .unwrap();
        r.declare_positional(PositionalSpec::new("output", "Output file", false))
            .unwrap();
        r
    }

    fn check(r: &OptionRegistry, tokens: &[&str]) -> Vec<ValidationError> {
        let p = ArgvParser::new(r).parse(tokens.iter().copied()).unwrap();
        validate(r, &p.options, &p.args)
    }

    #[test]
    fn test_valid_input_passes() {
        let r = registry();
        assert!(check(&r, &["--target", "x", "in.txt"]).is_empty());
    }

    #[test]
    fn test_reports_every_violation() {
        let r = registry();
        let violations = check(&r, &["--bogus"]);
        assert_eq!(
            violations,
            [
                ValidationError::MissingRequiredOption("target".to_owned()),
                ValidationError::MissingRequiredArgument("input".to_owned()),
                ValidationError::UnknownOption("bogus".to_owned()),
            ]
        );
    }

    #[test]
    fn test_optional_positional_may_be_absent() {
        let r = registry();
        let violations = check(&r, &["--target=x", "in.txt"]);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_unregistered_allowed_when_enabled() {
        let mut r = registry();
        r.set_allow_unregistered(true).unwrap();
        let violations = check(&r, &["--target=x", "--anything", "in.txt"]);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_unknown_short_is_rejected() {
        let r = registry();
        let violations = check(&r, &["--target=x", "-Z", "in.txt"]);
        assert_eq!(violations, [ValidationError::UnknownOption("Z".to_owned())]);
    }
}
