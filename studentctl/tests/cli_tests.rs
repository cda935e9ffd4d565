//! End-to-end tests of the command-line surface against the in-memory store.

use clap::Parser;
use std::io::Write;
use std::sync::{Arc, Mutex};
use studentctl::{Cli, execute};
use studentctl_core::{MemoryStore, StoreConfig, StoreErrorKind, logging::level_for};

/// Log sink shared with a test subscriber.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Run {
    code: u8,
    stdout: String,
    stderr: String,
}

async fn invoke(store: &mut MemoryStore, args: &[&str]) -> Run {
    let cli = Cli::try_parse_from(std::iter::once("studentctl").chain(args.iter().copied()))
        .expect("arguments should parse");
    let mut out = Vec::new();
    let mut err = Vec::new();

    let code = execute(&cli, store, &mut out, &mut err)
        .await
        .expect("writing to buffers should not fail");

    Run {
        code,
        stdout: String::from_utf8(out).expect("stdout is utf-8"),
        stderr: String::from_utf8(err).expect("stderr is utf-8"),
    }
}

#[test]
fn test_cli_parses_positionals_and_flags() {
    let cli = Cli::try_parse_from([
        "studentctl",
        "-vv",
        "create",
        "Ana",
        "123456789",
        "Primero",
        "1",
    ])
    .unwrap();

    assert_eq!(cli.global.verbose, 2);
    assert!(!cli.global.quiet);
    assert_eq!(cli.operation.as_deref(), Some("create"));

    let fields = cli.fields();
    assert_eq!(fields.name.as_deref(), Some("Ana"));
    assert_eq!(fields.national_id.as_deref(), Some("123456789"));
    assert_eq!(fields.class_name.as_deref(), Some("Primero"));
    assert_eq!(fields.level.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_extra_positionals_are_ignored() {
    let cli = Cli::try_parse_from(["studentctl", "list", "a", "b", "c", "d", "e", "-f"]).unwrap();
    assert_eq!(cli.level.as_deref(), Some("d"));
    assert_eq!(cli.ignored, ["e", "-f"]);

    let mut store = MemoryStore::new();
    let run = invoke(
        &mut store,
        &["create", "Ana", "123456789", "Primero", "1", "extra", "more"],
    )
    .await;
    assert_eq!(run.code, 0);
    assert!(run.stdout.starts_with("Student Ana created\n"));
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn test_dash_leading_national_id_reaches_the_store() {
    let cli = Cli::try_parse_from(["studentctl", "lookup", "", "-12345678"]).unwrap();
    assert_eq!(cli.national_id.as_deref(), Some("-12345678"));

    let mut store = MemoryStore::new();
    let created = invoke(&mut store, &["create", "Ana", "-12345678", "Primero", "1"]).await;
    assert_eq!(created.code, 0);
    assert!(created.stdout.contains("\"rut\": \"-12345678\""));

    let found = invoke(&mut store, &["lookup", "", "-12345678"]).await;
    assert_eq!(found.code, 0);
    assert!(found.stdout.contains("\"nombre\": \"Ana\""));

    let deleted = invoke(&mut store, &["delete", "", "-12345678"]).await;
    assert!(
        deleted
            .stdout
            .starts_with("Student record with national id -12345678 deleted\n")
    );
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_scenario_through_cli() {
    let mut store = MemoryStore::new();

    let created = invoke(&mut store, &["create", "Ana", "123456789", "Primero", "1"]).await;
    assert_eq!(created.code, 0);
    assert!(created.stdout.starts_with("Student Ana created\n"));
    assert!(created.stdout.contains("\"rut\": \"123456789\""));
    assert!(created.stdout.contains("\"id\": 1"));
    assert!(created.stderr.is_empty());

    let found = invoke(&mut store, &["lookup", "", "123456789"]).await;
    assert_eq!(found.code, 0);
    assert!(found.stdout.contains("\"nombre\": \"Ana\""));
    assert!(found.stdout.contains("\"curso\": \"Primero\""));

    let updated = invoke(&mut store, &["editar", "AnaMaria", "123456789", "Primero", "2"]).await;
    assert_eq!(updated.code, 0);
    assert!(updated.stdout.starts_with("Student AnaMaria updated\n"));
    assert!(updated.stdout.contains("\"nivel\": \"2\""));

    let deleted = invoke(&mut store, &["delete", "", "123456789"]).await;
    assert_eq!(deleted.code, 0);
    assert!(
        deleted
            .stdout
            .starts_with("Student record with national id 123456789 deleted\n")
    );

    let gone = invoke(&mut store, &["rut", "", "123456789"]).await;
    assert_eq!(gone.code, 0);
    assert_eq!(
        gone.stdout,
        "The record with national id 123456789 does not exist\n"
    );
}

#[tokio::test]
async fn test_list_messages() {
    let mut store = MemoryStore::new();

    let empty = invoke(&mut store, &["list"]).await;
    assert_eq!(empty.code, 0);
    assert_eq!(empty.stdout, "There are no records in the table yet\n");

    invoke(&mut store, &["create", "Ana", "123456789", "Primero", "1"]).await;
    invoke(&mut store, &["create", "Luis", "98.765.432-K", "Segundo", "2"]).await;

    let listed = invoke(&mut store, &["consulta"]).await;
    assert!(listed.stdout.starts_with("Current records:\n["));
    assert!(listed.stdout.contains("\"nombre\": \"Luis\""));
    let ana = listed.stdout.find("Ana").unwrap();
    let luis = listed.stdout.find("Luis").unwrap();
    assert!(ana < luis);
}

#[tokio::test]
async fn test_input_mistakes_exit_zero_without_store_access() {
    let cases: [(&[&str], &str); 6] = [
        (&["lookup"], "Please provide the national id\n"),
        (&["delete", "Ana"], "Please provide the national id\n"),
        (
            &["create", "Ana", "123456789"],
            "Please provide name, national id, class and level\n",
        ),
        (
            &["create", "Ana Maria", "123456789", "Primero", "1"],
            "Please enter valid data: name must contain letters only (A-Z, a-z)\n",
        ),
        (
            &["update", "Ana", "123456789", "Primero", "uno"],
            "Please enter valid data: level must contain digits only\n",
        ),
        (
            &["lookup", "", "1234"],
            "Please enter valid data: national id must be 9 to 12 characters of digits, '.', ',', '-' or 'K'\n",
        ),
    ];

    for (args, expected) in cases {
        let mut store = MemoryStore::new();
        let run = invoke(&mut store, args).await;
        assert_eq!(run.code, 0, "{args:?}");
        assert_eq!(run.stdout, expected, "{args:?}");
        assert!(run.stderr.is_empty(), "{args:?}");
        assert_eq!(store.round_trips(), 0, "{args:?}");
        assert_eq!(store.closes(), 1, "{args:?}");
    }
}

#[tokio::test]
async fn test_unknown_operation() {
    let mut store = MemoryStore::new();
    let run = invoke(&mut store, &["borrar", "", "123456789"]).await;
    assert_eq!(run.code, 0);
    assert_eq!(
        run.stdout,
        "Operation 'borrar' is not valid\nValid operations: list, lookup, create, update, delete\n"
    );
    assert_eq!(store.round_trips(), 0);

    let mut store = MemoryStore::new();
    let run = invoke(&mut store, &[]).await;
    assert!(run.stdout.starts_with("No operation given\n"));
    assert_eq!(store.round_trips(), 0);
}

#[tokio::test]
async fn test_store_failures_map_to_exit_codes() {
    let config = StoreConfig::default()
        .with_user("ana".to_string())
        .with_host("db.invalid".to_string())
        .with_port(5999)
        .with_database("school".to_string())
        .with_password("hunter2hunter2".to_string());

    let cases = [
        (
            StoreErrorKind::AuthFailure,
            2,
            "Error: authentication failed for user ana\n",
        ),
        (
            StoreErrorKind::UndefinedTable,
            2,
            "Error: table [estudiantes] does not exist\n",
        ),
        (
            StoreErrorKind::UndefinedDatabase,
            2,
            "Error: database [school] does not exist\n",
        ),
        (
            StoreErrorKind::HostNotFound,
            1,
            "Error: invalid host value: db.invalid\n",
        ),
        (
            StoreErrorKind::ConnectionRefused,
            1,
            "Error: connection error on port: 5999\n",
        ),
    ];

    for (kind, code, message) in cases {
        let mut store = MemoryStore::with_config(config.clone()).failing_with(kind);
        let run = invoke(&mut store, &["list"]).await;
        assert_eq!(run.code, code, "{kind:?}");
        assert_eq!(run.stderr, message, "{kind:?}");
        assert!(run.stdout.is_empty(), "{kind:?}");
        assert!(!run.stderr.contains("hunter2"), "{kind:?}");
        assert_eq!(store.closes(), 1, "{kind:?}");
    }
}

#[tokio::test]
async fn test_store_failure_is_reported_once_at_default_verbosity() {
    let logs = Captured::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_for(0, false))
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut store = MemoryStore::new().failing_with(StoreErrorKind::UndefinedTable);
    let run = invoke(&mut store, &["list"]).await;

    assert_eq!(run.code, 2);
    assert_eq!(run.stderr, "Error: table [estudiantes] does not exist\n");
    assert!(
        !logs.contents().contains("does not exist"),
        "failure also logged: {}",
        logs.contents()
    );
}

#[tokio::test]
async fn test_duplicate_create_is_a_server_fault() {
    let mut store = MemoryStore::new();
    invoke(&mut store, &["create", "Ana", "123456789", "Primero", "1"]).await;

    let run = invoke(&mut store, &["create", "Luis", "123456789", "Segundo", "2"]).await;
    assert_eq!(run.code, 1);
    assert!(run.stderr.starts_with("Error: unknown error: "));
    assert_eq!(store.records().len(), 1);
}

#[test]
fn test_invalid_port_is_a_client_fault() {
    temp_env::with_vars([("DB_PORT", Some("not-a-port")), ("DB_TABLE", None)], || {
        let cli = Cli::try_parse_from(["studentctl", "list"]).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let code = runtime.block_on(studentctl::run(&cli)).unwrap();
        assert_eq!(code, 2);
    });
}
