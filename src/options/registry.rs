/// The set of options and positional arguments a script recognizes.
///
/// A registry is mutable only during the configuration phase. Once the
/// lifecycle starts loading parameters it calls [`OptionRegistry::freeze`],
/// after which every mutation except the batch-size declaration fails with
/// [`RegistryError::Frozen`].
use std::collections::{BTreeMap, HashMap};

use super::errors::RegistryError;
use super::spec::{OptionGroup, OptionSpec, PositionalSpec};

/// Long name of the batch-size option.
pub const BATCH_SIZE: &str = "batch-size";

#[derive(Debug, Clone)]
struct Entry {
    spec: OptionSpec,
    group: OptionGroup,
}

/// Declared options and positionals for one script.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    entries: BTreeMap<String, Entry>,
    /// Long names in declaration order.
    order: Vec<String>,
    short_aliases: HashMap<char, String>,
    positionals: Vec<PositionalSpec>,
    description: String,
    allow_unregistered: bool,
    batch_size: Option<usize>,
    frozen: bool,
}

impl OptionRegistry {
    /// An empty registry with no default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the generic options, plus the datastore
    /// options when `datastore` is set.
    #[must_use]
    pub fn with_defaults(datastore: bool) -> Self {
        let mut registry = Self::new();
        let generic = [
            OptionSpec::flag("help", "Display this help message").short('h'),
            OptionSpec::flag("quiet", "Whether to suppress non-error output").short('q'),
            OptionSpec::with_value("conf", "Location of the settings file, if not default"),
            OptionSpec::with_value("wiki", "For specifying the wiki ID"),
            OptionSpec::flag(
                "globals",
                "Output effective options and configuration at the end of processing for debugging",
            ),
            OptionSpec::with_value(
                "memory-limit",
                "Set a specific memory limit for the script, \"max\" for no limit or \"default\" to avoid changing it",
            ),
            OptionSpec::with_value(
                "server",
                "The protocol and server name to use in URLs, e.g. https://example.org. \
                 This is sometimes necessary because server name detection may fail in command line scripts.",
            ),
            OptionSpec::with_value("profiler", "Profiler output format (usually \"text\")"),
            OptionSpec::flag("devmode", "Enable built-in development settings and debug logging"),
        ];
        for spec in generic {
            registry.insert(spec, OptionGroup::Generic);
        }
        if datastore {
            let dependent = [
                OptionSpec::with_value("dbuser", "The DB user to use for this script"),
                OptionSpec::with_value("dbpass", "The password to use for this script"),
                OptionSpec::with_value("dbgroupdefault", "The default DB group to use."),
            ];
            for spec in dependent {
                registry.insert(spec, OptionGroup::Dependent);
            }
        }
        registry
    }

    /// Declare a script-specific option.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Frozen`] after parameters were loaded
    /// - [`RegistryError::DuplicateOption`] if the name is taken
    /// - [`RegistryError::DuplicateShortAlias`] if the alias is taken
    pub fn declare_option(&mut self, spec: OptionSpec) -> Result<(), RegistryError> {
        self.ensure_mutable(&spec.name)?;
        if self.entries.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateOption(spec.name));
        }
        if let Some(alias) = spec.short_alias {
            if let Some(owner) = self.short_aliases.get(&alias) {
                return Err(RegistryError::DuplicateShortAlias {
                    alias,
                    owner: owner.clone(),
                });
            }
        }
        self.insert(spec, OptionGroup::Specific);
        Ok(())
    }

    /// Append a positional argument.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Frozen`] after parameters were loaded.
    pub fn declare_positional(&mut self, spec: PositionalSpec) -> Result<(), RegistryError> {
        self.ensure_mutable(&spec.name)?;
        self.positionals.push(spec);
        Ok(())
    }

    /// Remove a declared option, typically to retract a default.
    ///
    /// Returns the removed spec, or `None` if the name was not declared.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Frozen`] after parameters were loaded.
    pub fn undeclare(&mut self, name: &str) -> Result<Option<OptionSpec>, RegistryError> {
        self.ensure_mutable(name)?;
        let Some(entry) = self.entries.remove(name) else {
            return Ok(None);
        };
        self.order.retain(|n| n != name);
        if let Some(alias) = entry.spec.short_alias {
            self.short_aliases.remove(&alias);
        }
        Ok(Some(entry.spec))
    }

    /// Declare `--batch-size` with `size` as its default.
    ///
    /// Allowed even on a frozen registry; a size of zero declares nothing.
    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = Some(size);
        if size == 0 {
            return;
        }
        let spec = OptionSpec::with_value(
            BATCH_SIZE,
            format!("Run this many operations per batch, default: {size}"),
        );
        if let Some(entry) = self.entries.get_mut(BATCH_SIZE) {
            entry.spec = spec;
        } else {
            self.insert(spec, OptionGroup::Dependent);
        }
    }

    /// Default batch size declared via [`Self::set_batch_size`].
    #[must_use]
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Set the script description shown at the top of help.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Frozen`] after parameters were loaded.
    pub fn set_description(&mut self, text: impl Into<String>) -> Result<(), RegistryError> {
        self.ensure_mutable("description")?;
        self.description = text.into();
        Ok(())
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Accept options that were never declared instead of rejecting them.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Frozen`] after parameters were loaded.
    pub fn set_allow_unregistered(&mut self, allow: bool) -> Result<(), RegistryError> {
        self.ensure_mutable("allow-unregistered")?;
        self.allow_unregistered = allow;
        Ok(())
    }

    #[must_use]
    pub fn allows_unregistered(&self) -> bool {
        self.allow_unregistered
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.entries.get(name).map(|e| &e.spec)
    }

    #[must_use]
    pub fn group_of(&self, name: &str) -> Option<OptionGroup> {
        self.entries.get(name).map(|e| e.group)
    }

    /// Look up the long name behind a short alias. Unknown aliases are simply
    /// not found; callers fall back to treating the character as a name.
    #[must_use]
    pub fn resolve_short(&self, alias: char) -> Option<&str> {
        self.short_aliases.get(&alias).map(String::as_str)
    }

    /// Whether `name` is declared and consumes the following token.
    #[must_use]
    pub fn takes_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|s| s.takes_value)
    }

    /// Whether `name` is declared as repeatable.
    #[must_use]
    pub fn is_repeatable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|s| s.repeatable)
    }

    /// All options in declaration order.
    pub fn options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .map(|e| &e.spec)
    }

    /// Options of one help group, in declaration order.
    pub fn options_in(&self, group: OptionGroup) -> impl Iterator<Item = &OptionSpec> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name))
            .filter(move |e| e.group == group)
            .map(|e| &e.spec)
    }

    /// All long names in lexical order.
    pub fn names_sorted(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn positionals(&self) -> &[PositionalSpec] {
        &self.positionals
    }

    /// End the configuration phase.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_mutable(&self, what: &str) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen(what.to_owned()));
        }
        Ok(())
    }

    fn insert(&mut self, spec: OptionSpec, group: OptionGroup) {
        if let Some(alias) = spec.short_alias {
            self.short_aliases.insert(alias, spec.name.clone());
        }
        self.order.push(spec.name.clone());
        self.entries.insert(spec.name.clone(), Entry { spec, group });
    }
}
