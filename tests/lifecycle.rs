use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::{TempDir, tempdir};

use maintkit::commands::{self, find_script};
use maintkit::options::{OptionRegistry, OptionSpec, PositionalSpec, RegistryError};
use maintkit::output::{Console, SharedBuffer};
use maintkit::script::{
    DbType, Environment, Job, JobContext, Lifecycle, MaintenanceError, Outcome, Runtime,
    SetupError, State, is_completed, run_script,
};
use maintkit::store::{
    Datastore, InsertMode, MemoryStore, ReplicationWaitTimeout, ReplicationWaiter, row,
};

const SETTINGS: &str = r#"
server = "https://wiki.example.org"
db_user = "app"
db_password = "secret"
"#;

fn install_root() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("LocalSettings.toml"), SETTINGS).unwrap();
    dir
}

fn env(root: &Path) -> Environment {
    Environment::with_install_root(root)
}

/// A console whose output and errors land in separate buffers.
fn split_runtime() -> (Runtime, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let console = Console::new(Box::new(out.clone()), Some(Box::new(err.clone())));
    (Runtime::new(console), out, err)
}

/// Copies `--source` into the `copies` table.
struct CopyJob {
    runs: usize,
}

impl Job for CopyJob {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.set_description("Copy a value into the datastore.")?;
        registry.declare_option(OptionSpec::with_value("source", "Value to copy").required())?;
        registry.declare_option(OptionSpec::flag("verbose", "Say more").short('v'))?;
        registry.declare_positional(PositionalSpec::new("table", "Target table", true))?;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        self.runs += 1;
        let source = ctx.option_or("source", "").to_owned();
        let table = ctx.arg_or(0, "copies").to_owned();
        ctx.require_db()?
            .insert(&table, row([("value", source.as_str())]), InsertMode::Strict)?;
        if ctx.has_option("verbose") {
            ctx.output(&format!("copied {source} into {table}\n"));
        }
        Ok(Outcome::Completed)
    }
}

#[test]
fn test_all_violations_reported_then_help() {
    let root = install_root();
    let (rt, out, err) = split_runtime();
    let mut job = CopyJob { runs: 0 };
    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    let result = lc.run(&mut job, ["copy", "--bogus"]);

    let Err(MaintenanceError::Validation(violations)) = result else {
        panic!("expected validation failure");
    };
    assert_eq!(violations.len(), 3);
    assert_eq!(lc.state(), State::Aborted);
    assert_eq!(job.runs, 0);
    assert_eq!(
        err.contents(),
        "Param source required!\nArgument <table> required!\nUnexpected option bogus!\n"
    );
    let help = out.contents();
    assert!(help.contains("Usage: copy [--"));
    assert!(help.contains("Script specific parameters:\n    --source: Value to copy\n"));
    assert!(help.contains("    --verbose (-v): Say more\n"));
    assert!(help.contains("Arguments:\n    <table>: Target table\n"));
}

#[test]
fn test_successful_run_writes_datastore() {
    let root = install_root();
    let (rt, out, _) = split_runtime();
    let rt = rt.with_datastore(Box::new(MemoryStore::new()));
    let mut job = CopyJob { runs: 0 };
    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    let outcome = lc.run(&mut job, ["copy", "-v", "--source", "x", "copies"]).unwrap();
    assert_eq!(outcome, Outcome::Completed);
    let settings = lc.settings().unwrap();
    assert_eq!(settings.config.get_str("server"), Some("https://wiki.example.org"));

    let mut runtime = lc.into_runtime().unwrap();
    let db = runtime.take_datastore().unwrap();
    assert_eq!(db.select("copies", &row([])).unwrap(), [row([("value", "x")])]);
    drop(runtime);
    assert_eq!(out.contents(), "copied x into copies\n");
}

#[test]
fn test_quiet_mode_keeps_errors() {
    let root = install_root();
    let (rt, out, err) = split_runtime();
    let rt = rt.with_datastore(Box::new(MemoryStore::new()));
    let mut job = CopyJob { runs: 0 };
    // Second run hits a strict duplicate and fails loudly even in quiet mode.
    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    lc.run(&mut job, ["copy", "-qv", "--source=a", "t"]).unwrap();
    let rt = lc.into_runtime().unwrap();

    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    let failure = lc.run(&mut job, ["copy", "-q", "--source=a", "t"]).unwrap_err();
    assert!(matches!(failure, MaintenanceError::Job(_)));
    assert_eq!(job.runs, 2);
    drop(lc);
    assert_eq!(out.contents(), "");
    assert_eq!(err.contents(), "Duplicate row in table 't'\n");
}

#[test]
fn test_missing_install_root_is_fatal() {
    let (rt, _, err) = split_runtime();
    let code = run_script(&mut CopyJob { runs: 0 }, Environment::default(), rt, ["copy"]);
    assert_eq!(code, 1);
    assert_eq!(err.contents(), "MAINT_INSTALL_PATH not set, aborting!\n");
}

#[test]
fn test_unreadable_conf_names_the_option() {
    let root = install_root();
    let (rt, _, err) = split_runtime();
    let mut job = CopyJob { runs: 0 };
    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    let missing = root.path().join("nope.toml");
    let conf = format!("--conf={}", missing.display());
    let failure = lc
        .run(&mut job, ["copy", "--source=a", "t", conf.as_str()])
        .unwrap_err();
    assert!(matches!(
        failure,
        MaintenanceError::Setup(SetupError::UnreadableSettings { .. })
    ));
    assert_eq!(job.runs, 0);
    assert!(err.contents().contains("Use --conf to specify it."));
}

#[test]
fn test_server_and_admin_overrides() {
    struct Admin;
    impl Job for Admin {
        fn db_type(&self) -> DbType {
            DbType::Admin
        }
        fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
            let config = ctx.config().unwrap();
            assert_eq!(config.get_str("server"), Some("https://other.example.org"));
            assert_eq!(config.get_str("db_user"), Some("root"));
            assert_eq!(config.get_str("db_password"), Some("hunter2"));
            let settings = ctx.settings().unwrap();
            assert_eq!(settings.server_name.as_deref(), Some("https://other.example.org"));
            assert!(settings.wiki.is_none());
            Ok(Outcome::Completed)
        }
    }
    let root = install_root();
    let (rt, _, _) = split_runtime();
    let code = run_script(
        &mut Admin,
        env(root.path()),
        rt,
        [
            "admin",
            "--server=https://other.example.org",
            "--dbuser",
            "root",
            "--dbpass",
            "hunter2",
        ],
    );
    assert_eq!(code, 0);
}

#[test]
fn test_wiki_id_is_split() {
    struct Wiki;
    impl Job for Wiki {
        fn db_type(&self) -> DbType {
            DbType::None
        }
        fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
            let settings = ctx.settings().unwrap();
            let wiki = settings.wiki.as_ref().unwrap();
            assert_eq!((wiki.db.as_str(), wiki.prefix.as_str()), ("enwiki", "mw"));
            assert!(settings.server_name.is_none());
            assert!(settings.db_user.is_none());
            Ok(Outcome::Completed)
        }
    }
    let root = install_root();
    let (rt, _, _) = split_runtime();
    let code = run_script(&mut Wiki, env(root.path()), rt, ["wiki", "--wiki=enwiki-mw"]);
    assert_eq!(code, 0);
}

/// Delegates to [`CopyJob`] with its own input.
struct Parent {
    child: CopyJob,
}

impl Job for Parent {
    fn configure(&self, registry: &mut OptionRegistry) -> Result<(), RegistryError> {
        registry.declare_option(OptionSpec::with_value("source", "Value to copy"))?;
        registry.declare_positional(PositionalSpec::new("table", "Target table", false))
    }

    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        ctx.output("parent\n");
        let outcome = ctx.run_child(&mut self.child)?;
        let copied = ctx.require_db()?.select("copies", &row([]))?.len();
        ctx.output(&format!("child {outcome:?}, {copied} row\n"));
        Ok(outcome)
    }
}

#[test]
fn test_run_child_shares_input_console_and_datastore() {
    let root = install_root();
    let (rt, out, _) = split_runtime();
    let rt = rt.with_datastore(Box::new(MemoryStore::new()));
    let mut job = Parent {
        child: CopyJob { runs: 0 },
    };
    let mut lc = Lifecycle::new(&job, env(root.path()), rt).unwrap();
    let outcome = lc.run(&mut job, ["parent", "--source", "from-parent", "copies"]).unwrap();
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(job.child.runs, 1);
    drop(lc);
    assert_eq!(out.contents(), "parent\nchild Completed, 1 row\n");
}

#[test]
fn test_child_skips_validation_of_inherited_input() {
    let root = install_root();
    let (rt, _, err) = split_runtime();
    let rt = rt.with_datastore(Box::new(MemoryStore::new()));
    let mut job = Parent {
        child: CopyJob { runs: 0 },
    };
    // The child requires --source, but inherited input is never re-validated.
    let code = run_script(&mut job, env(root.path()), rt, ["parent", "copies"]);
    assert_eq!(code, 0);
    assert_eq!(job.child.runs, 1);
    assert_eq!(err.contents(), "");
}

struct SlowReplicas;

impl ReplicationWaiter for SlowReplicas {
    fn wait_for_replication(
        &mut self,
        timeout: Duration,
        _if_writes_since: Option<SystemTime>,
    ) -> Result<(), ReplicationWaitTimeout> {
        Err(ReplicationWaitTimeout { timeout })
    }
}

struct Transactional;

impl Job for Transactional {
    fn execute(&mut self, ctx: &mut JobContext<'_>) -> anyhow::Result<Outcome> {
        ctx.begin_transaction("transactional")?;
        ctx.require_db()?
            .insert("t", row([("k", "v")]), InsertMode::Strict)?;
        let replicated = ctx.commit_transaction("transactional")?;
        ctx.output(&format!("replicated={replicated}\n"));

        ctx.begin_transaction("transactional")?;
        ctx.require_db()?
            .insert("t", row([("k", "w")]), InsertMode::Strict)?;
        ctx.rollback_transaction("transactional")?;
        let rows = ctx.require_db()?.select("t", &row([]))?.len();
        ctx.output(&format!("rows={rows}\n"));
        Ok(Outcome::Completed)
    }
}

#[test]
fn test_replication_timeout_is_soft() {
    let root = install_root();
    let (rt, out, _) = split_runtime();
    let rt = rt
        .with_datastore(Box::new(MemoryStore::new()))
        .with_replication(Box::new(SlowReplicas));
    let code = run_script(&mut Transactional, env(root.path()), rt, ["tx"]);
    assert_eq!(code, 0);
    assert_eq!(out.contents(), "replicated=false\nrows=1\n");
}

#[test]
fn test_replication_wait_succeeds_by_default() {
    let root = install_root();
    let (rt, out, _) = split_runtime();
    let rt = rt.with_datastore(Box::new(MemoryStore::new()));
    let code = run_script(&mut Transactional, env(root.path()), rt, ["tx"]);
    assert_eq!(code, 0);
    assert_eq!(out.contents(), "replicated=true\nrows=1\n");
}

#[test]
fn test_touch_update_is_idempotent_across_json_store_runs() {
    let root = install_root();
    let store = root.path().join("state").join("store.json");
    let entry = find_script("touch-update").unwrap();

    let run = |argv: &[&str]| {
        let (rt, out, _) = split_runtime();
        let mut rt_with_store = commands::open_runtime(Some(store.as_path()), &env(root.path())).unwrap();
        let rt = rt.with_datastore(rt_with_store.take_datastore().unwrap());
        let mut job = entry.build();
        let code = run_script(job.as_mut(), env(root.path()), rt, argv.iter().copied());
        (code, out.contents())
    };

    let (code, text) = run(&["touch-update", "k1"]);
    assert_eq!((code, text.as_str()), (0, "Touching update 'k1'.\n"));
    assert!(store.exists());

    let (code, text) = run(&["touch-update", "k1"]);
    assert_eq!(code, 0);
    assert_eq!(text, "...Update 'k1' already logged as completed.\n");

    let (code, text) = run(&["touch-update", "k1", "--force"]);
    assert_eq!((code, text.as_str()), (0, "Touching update 'k1'.\n"));

    let mut rt = commands::open_runtime(Some(store.as_path()), &env(root.path())).unwrap();
    let db = rt.take_datastore().unwrap();
    assert!(is_completed(db.as_ref(), "k1").unwrap());
}
