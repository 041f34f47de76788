/// The phases of one script invocation.
///
/// A lifecycle moves strictly forward:
///
/// ```text
/// Constructed -> ParamsLoaded -> Validated -> Executing -> Done
///       \              \             \
///        +--------------+-------------+-----> Aborted
/// ```
///
/// Every fatal condition is reported on the console before it is returned,
/// so callers only need to turn the error into an exit code.
use log::{LevelFilter, debug, info, warn};

use super::env::Environment;
use super::errors::{MaintenanceError, SetupError};
use super::job::{DbType, Invocation, Job, JobContext, Outcome, Runtime};
use super::settings::{MemoryLimit, Settings, load_settings};
use crate::options::{self, ArgvParser, BATCH_SIZE, OptionRegistry};
use crate::output::render_help;
use crate::types::GlobalsReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Constructed,
    ParamsLoaded,
    Validated,
    Executing,
    Done,
    Aborted,
}

enum RuntimeSlot<'rt> {
    Owned(Runtime),
    /// Shared with the parent of a delegated run.
    Borrowed(&'rt mut Runtime),
}

impl RuntimeSlot<'_> {
    fn get(&mut self) -> &mut Runtime {
        match self {
            Self::Owned(runtime) => runtime,
            Self::Borrowed(runtime) => runtime,
        }
    }
}

pub struct Lifecycle<'rt> {
    state: State,
    registry: OptionRegistry,
    env: Environment,
    db_type: DbType,
    required_extensions: Vec<String>,
    invocation: Invocation,
    settings: Option<Settings>,
    memory_limit: MemoryLimit,
    batch_size: Option<usize>,
    /// Input was inherited from a parent that already validated it.
    delegated: bool,
    runtime: RuntimeSlot<'rt>,
}

impl Lifecycle<'static> {
    /// Check the execution context and let `job` declare its options.
    ///
    /// # Errors
    ///
    /// - [`SetupError::WrongContext`] under a web gateway
    /// - [`SetupError::MissingInstallRoot`] without an install root
    /// - [`MaintenanceError::Registry`] if the declarations conflict
    pub fn new(job: &dyn Job, env: Environment, runtime: Runtime) -> Result<Self, MaintenanceError> {
        Self::construct(job, env, RuntimeSlot::Owned(runtime), false)
    }

    /// Give back the runtime, e.g. to inspect the datastore after a run.
    #[must_use]
    pub fn into_runtime(self) -> Option<Runtime> {
        match self.runtime {
            RuntimeSlot::Owned(runtime) => Some(runtime),
            RuntimeSlot::Borrowed(_) => None,
        }
    }
}

impl<'rt> Lifecycle<'rt> {
    /// A child lifecycle that inherits its parent's input, settings and
    /// runtime. It starts in [`State::ParamsLoaded`].
    pub(crate) fn delegated(
        job: &dyn Job,
        env: Environment,
        invocation: Invocation,
        settings: Option<Settings>,
        runtime: &'rt mut Runtime,
    ) -> Result<Self, MaintenanceError> {
        let mut lifecycle = Self::construct(job, env, RuntimeSlot::Borrowed(runtime), true)?;
        lifecycle.settings = settings;
        lifecycle.load_params(invocation)?;
        Ok(lifecycle)
    }

    fn construct(
        job: &dyn Job,
        env: Environment,
        mut runtime: RuntimeSlot<'rt>,
        delegated: bool,
    ) -> Result<Self, MaintenanceError> {
        let db_type = job.db_type();
        let mut registry = OptionRegistry::with_defaults(db_type != DbType::None);
        let checked = if env.web_gateway {
            Err(SetupError::WrongContext.into())
        } else if env.install_root.is_none() {
            Err(SetupError::MissingInstallRoot.into())
        } else {
            job.configure(&mut registry).map_err(MaintenanceError::from)
        };
        if let Err(err) = checked {
            runtime.get().console.error(&err.to_string());
            return Err(err);
        }
        debug!(options = registry.options().count(), delegated; "Script configured");
        Ok(Self {
            state: State::Constructed,
            registry,
            env,
            db_type,
            required_extensions: job.required_extensions(),
            invocation: Invocation::default(),
            settings: None,
            memory_limit: MemoryLimit::default(),
            batch_size: None,
            delegated,
            runtime,
        })
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Loaded during [`Lifecycle::execute`].
    #[must_use]
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    #[must_use]
    pub fn memory_limit(&self) -> MemoryLimit {
        self.memory_limit
    }

    #[must_use]
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Parse a raw argument vector. The first element is the program name.
    ///
    /// # Errors
    ///
    /// [`SetupError::NoCommandLine`] for an empty vector, or the parse error
    /// after it has been printed together with the help text.
    pub fn load_argv<I, S>(&mut self, argv: I) -> Result<(), MaintenanceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expect_state(State::Constructed, "load parameters")?;
        let mut argv = argv.into_iter().map(Into::into);
        let Some(program) = argv.next() else {
            return Err(self.abort(SetupError::NoCommandLine.into()));
        };
        self.invocation.program = program;
        self.registry.freeze();
        let parsed = ArgvParser::new(&self.registry).parse(argv);
        match parsed {
            Ok(parsed) => {
                let invocation = Invocation {
                    program: std::mem::take(&mut self.invocation.program),
                    options: parsed.options,
                    args: parsed.args,
                    ordered: parsed.ordered,
                };
                self.install(invocation);
                Ok(())
            }
            Err(err) => Err(self.abort(err.into())),
        }
    }

    /// Use already-parsed input instead of an argument vector.
    ///
    /// # Errors
    ///
    /// Fails only when called out of order.
    pub fn load_params(&mut self, invocation: Invocation) -> Result<(), MaintenanceError> {
        self.expect_state(State::Constructed, "load parameters")?;
        self.registry.freeze();
        self.install(invocation);
        Ok(())
    }

    fn install(&mut self, invocation: Invocation) {
        // A delegated child shares its parent's console and quiet setting.
        if !self.delegated {
            let quiet = invocation.options.contains("quiet");
            self.runtime.get().console.set_quiet(quiet);
        }
        debug!(
            program = invocation.program.as_str(),
            options = invocation.options.len(),
            args = invocation.args.len();
            "Parameters loaded"
        );
        self.invocation = invocation;
        self.state = State::ParamsLoaded;
    }

    /// Honor `--help` and check the loaded input against the registry.
    ///
    /// All violations are printed before the help text.
    ///
    /// # Errors
    ///
    /// [`MaintenanceError::HelpRequested`] or [`MaintenanceError::Validation`].
    pub fn validate(&mut self) -> Result<(), MaintenanceError> {
        self.expect_state(State::ParamsLoaded, "validate")?;
        if !self.delegated {
            if self.invocation.options.contains("help") {
                return Err(self.abort(MaintenanceError::HelpRequested));
            }
            let violations = options::validate(
                &self.registry,
                &self.invocation.options,
                &self.invocation.args,
            );
            if !violations.is_empty() {
                return Err(self.abort(MaintenanceError::Validation(violations)));
            }
        }
        self.state = State::Validated;
        Ok(())
    }

    /// Finish setup and run the job body.
    ///
    /// # Errors
    ///
    /// Setup failures, or the job's own error after it has been printed.
    pub fn execute(&mut self, job: &mut dyn Job) -> Result<Outcome, MaintenanceError> {
        self.expect_state(State::Validated, "execute")?;
        if let Err(err) = self.final_setup() {
            return Err(self.abort(err.into()));
        }

        self.state = State::Executing;
        info!(script = self.invocation.program.as_str(), delegated = self.delegated; "Executing");
        let result = {
            let mut ctx = JobContext {
                invocation: &self.invocation,
                registry: &self.registry,
                settings: self.settings.as_ref(),
                env: &self.env,
                batch_size: self.batch_size,
                runtime: self.runtime.get(),
            };
            job.execute(&mut ctx)
        };

        if !self.delegated && self.invocation.options.contains("globals") {
            self.dump_globals();
        }
        let console = &mut self.runtime.get().console;
        console.close();
        self.state = State::Done;
        match result {
            Ok(outcome) => {
                info!(outcome:?; "Finished");
                Ok(outcome)
            }
            Err(err) => {
                console.error(&format!("{err:#}"));
                Err(MaintenanceError::Job(err))
            }
        }
    }

    /// Load parameters, validate and execute in one go.
    ///
    /// # Errors
    ///
    /// The first failing phase's error.
    pub fn run<I, S>(&mut self, job: &mut dyn Job, argv: I) -> Result<Outcome, MaintenanceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_argv(argv)?;
        self.validate()?;
        self.execute(job)
    }

    fn final_setup(&mut self) -> Result<(), SetupError> {
        let options = &self.invocation.options;
        self.memory_limit = options.value("memory-limit").unwrap_or("max").parse()?;
        debug!(memory_limit = self.memory_limit.to_string(); "Memory limit");

        self.batch_size = match options.value(BATCH_SIZE) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| SetupError::InvalidBatchSize(raw.to_owned()))?,
            ),
            None => self.registry.batch_size(),
        };

        let missing: Vec<String> = self
            .required_extensions
            .iter()
            .filter(|name| !self.env.extensions.contains(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SetupError::MissingExtensions(missing));
        }

        if self.settings.is_none() {
            self.settings = Some(load_settings(options, &self.env, self.db_type)?);
        }

        if options.contains("devmode") {
            log::set_max_level(LevelFilter::Debug);
            debug!("Development mode enabled");
        }
        if let Some(format) = options.value("profiler") {
            info!(format; "Profiler output requested");
        }
        Ok(())
    }

    fn dump_globals(&mut self) {
        let report = GlobalsReport {
            program: &self.invocation.program,
            options: &self.invocation.options,
            args: &self.invocation.args,
            batch_size: self.batch_size,
            memory_limit: self.memory_limit.to_string(),
            config: self.settings.as_ref().map(|s| &s.config),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => self.runtime.get().console.emit(&format!("{json}\n")),
            Err(err) => warn!(error = err.to_string(); "Could not serialize globals"),
        }
    }

    fn expect_state(&self, expected: State, action: &'static str) -> Result<(), MaintenanceError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(MaintenanceError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Report `err`, with help where it applies, and stop the lifecycle.
    fn abort(&mut self, err: MaintenanceError) -> MaintenanceError {
        self.state = State::Aborted;
        debug!(error = err.to_string(); "Aborting");
        let console = &mut self.runtime.get().console;
        match &err {
            MaintenanceError::HelpRequested => {}
            MaintenanceError::Validation(violations) => {
                for violation in violations {
                    console.error(&violation.to_string());
                }
            }
            other => console.error(&other.to_string()),
        }
        if err.shows_help() {
            console.emit(&render_help(&self.registry, &self.invocation.program));
        }
        err
    }
}

/// Run `job` with `argv` and return the process exit code.
///
/// Errors have already been printed by the time this returns.
pub fn run_script<I, S>(job: &mut dyn Job, env: Environment, runtime: Runtime, argv: I) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut lifecycle = match Lifecycle::new(&*job, env, runtime) {
        Ok(lifecycle) => lifecycle,
        Err(err) => return err.exit_code(),
    };
    match lifecycle.run(job, argv) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => err.exit_code(),
    }
}
