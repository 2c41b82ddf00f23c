use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

/// Writes a config whose API root points at `api_url`.
fn config_file(api_url: &str, extra: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    let yaml = format!(
        "gitRepositoryUrl: /nonexistent/remote.git\n\
         gitName: Paper Bot\n\
         gitEmail: bot@example.com\n\
         zoteroApiKey: test-key\n\
         zoteroUserId: 1\n\
         zoteroCollectionId: COLL\n\
         exportPath: papers\n\
         commitMessage: Update papers\n\
         zoteroApiUrl: {api_url}\n\
         maxDownloadDelaySecs: 0\n\
         {extra}"
    );
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("zotero-git-sync").expect("Binary exists");
    cmd.env_remove("ZOTERO_API_KEY");
    cmd
}

#[test]
fn help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync").and(predicate::str::contains("render")));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    cmd()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn missing_field_fails_before_any_request() {
    let mut server = mockito::Server::new();
    let api = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create();

    let config = NamedTempFile::new().unwrap();
    write(
        config.path(),
        format!("gitRepositoryUrl: /tmp/x\nzoteroApiUrl: {}\n", server.url()),
    )
    .unwrap();

    cmd()
        .arg("--config")
        .arg(config.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required config field 'gitName'"));
    api.assert();
}

#[test]
fn render_prints_bibliography() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/users/1/collections/COLL/items/top".into()))
        .match_header("Zotero-API-Key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{"key":"I1","meta":{"parsedDate":"1968"},"data":{"itemType":"book","title":"The Art of Computer Programming","creators":[{"creatorType":"author","firstName":"Donald","lastName":"Knuth"}],"publisher":"Addison-Wesley"}}]"#,
        )
        .create();
    let config = config_file(&server.url(), "");

    cmd()
        .arg("--config")
        .arg(config.path())
        .arg("render")
        .assert()
        .success()
        .stdout(
            "# Bibliography\n\n- Knuth, Donald (1968). *The Art of Computer Programming*. Addison-Wesley.\n",
        );
}

#[test]
fn render_writes_output_file() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/users/1/collections/COLL/items/top".into()))
        .with_status(200)
        .with_body("[]")
        .create();
    let config = config_file(&server.url(), "");
    let out_dir = tempdir().unwrap();
    let out = out_dir.path().join("bib.md");

    cmd()
        .arg("--config")
        .arg(config.path())
        .arg("render")
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(out).unwrap(), "# Bibliography\n");
}

#[test]
fn rejected_key_fails_sync_before_cloning() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", Matcher::Regex(r"^/users/1/collections/COLL/items/top".into()))
        .with_status(403)
        .with_body("Invalid key")
        .create();
    let config = config_file(&server.url(), "");

    cmd()
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("rejected the API key")
                .and(predicate::str::contains("git clone").not()),
        );
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use zotero_git_sync::cli::{run, Cli, Commands};

    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        command: Some(Commands::Sync),
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
