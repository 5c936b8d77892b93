use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tidepool_sync::cli::{run, Cli, Commands, Pipeline};

/// Creates a config file pointing both services at the given URLs.
fn create_config(tidepool_url: &str, nightscout_url: &str) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        format!(
            "sync:\n  since: \"2021-03-01T00:00:00Z\"\n  target_low: 3.7\ntidepool:\n  base_url: \"{tidepool_url}\"\nnightscout:\n  base_url: \"{nightscout_url}\"\n"
        ),
    )
    .expect("Writing temp config failed");
    config
}

fn set_secrets() {
    env::set_var("TIDEPOOL_USERNAME", "me@example.com");
    env::set_var("TIDEPOOL_PASSWORD", "hunter2");
    env::set_var("NIGHTSCOUT_API_SECRET", "s3cret");
}

async fn mount_tidepool(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-tidepool-session-token", "session-abc")
                .set_body_json(json!({ "userid": "u123" })),
        )
        .mount(server)
        .await;

    let data = [
        (
            "pumpSettings",
            json!([{
                "activeSchedule": "Standard",
                "deviceTime": "2021-03-01T08:15:00",
                "units": { "bg": "mmol/L" },
                "basalSchedules": { "Standard": [{ "start": 0, "rate": 0.8 }] },
                "bgTargets": { "Standard": [{ "start": 0, "target": 2.5 }] }
            }]),
        ),
        (
            "bolus",
            json!([{ "time": "2021-03-01T08:00:00.000Z", "normal": 2.0 }]),
        ),
        (
            "food",
            json!([{ "time": "2021-03-01T08:00:00.000Z", "nutrition": { "carbohydrate": { "net": 30 } } }]),
        ),
        ("physicalActivity", json!([])),
    ];
    for (data_type, body) in data {
        Mock::given(method("GET"))
            .and(path("/data/u123"))
            .and(query_param("type", data_type))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

async fn mount_nightscout(server: &MockServer, expected_profile_writes: u64, expected_treatment_writes: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "p1",
            "defaultProfile": "Standard",
            "mills": "1614586500000",
            "store": {}
        })))
        .expect(expected_profile_writes)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/treatments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "carbs": 30,
            "insulin": 2.0,
            "created_at": "2021-03-01T08:00:00Z",
            "enteredBy": "Tidepool"
        }])))
        .expect(expected_treatment_writes)
        .mount(server)
        .await;
}

#[tokio::test]
#[serial]
async fn sync_happy_flow_writes_profile_and_treatments() {
    let tidepool = MockServer::start().await;
    let nightscout = MockServer::start().await;
    mount_tidepool(&tidepool).await;
    mount_nightscout(&nightscout, 1, 1).await;
    let config = create_config(&tidepool.uri(), &nightscout.uri());
    set_secrets();

    let cli = Cli {
        command: Commands::Sync {
            config: config.path().to_path_buf(),
            since: None,
            till: None,
            only: None,
        },
    };
    run(cli).await.expect("sync should succeed");
}

#[tokio::test]
#[serial]
async fn sync_only_profiles_skips_treatments() {
    let tidepool = MockServer::start().await;
    let nightscout = MockServer::start().await;
    mount_tidepool(&tidepool).await;
    mount_nightscout(&nightscout, 1, 0).await;
    let config = create_config(&tidepool.uri(), &nightscout.uri());
    set_secrets();

    let cli = Cli {
        command: Commands::Sync {
            config: config.path().to_path_buf(),
            since: None,
            till: None,
            only: Some(Pipeline::Profiles),
        },
    };
    run(cli).await.expect("profile sync should succeed");
}

#[tokio::test]
#[serial]
async fn sync_fails_when_tidepool_rejects_login() {
    let tidepool = MockServer::start().await;
    let nightscout = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&tidepool)
        .await;
    mount_nightscout(&nightscout, 0, 0).await;
    let config = create_config(&tidepool.uri(), &nightscout.uri());
    set_secrets();

    let cli = Cli {
        command: Commands::Sync {
            config: config.path().to_path_buf(),
            since: None,
            till: None,
            only: None,
        },
    };
    let err = run(cli).await.expect_err("login failure must fail the run");
    assert!(err.to_string().contains("Tidepool login failed"));
}

#[test]
fn sync_cli_fails_on_missing_config() {
    let mut cmd = Command::cargo_bin("tidepool-sync").expect("Binary exists");
    cmd.arg("sync").arg("--config").arg("does/not/exist.yaml");
    cmd.assert().failure().stdout(
        predicate::str::contains("tidepool-sync starting")
            .and(predicate::str::contains("tidepool-sync failed")),
    );
}

#[test]
fn sync_cli_help_lists_options() {
    let mut cmd = Command::cargo_bin("tidepool-sync").expect("Binary exists");
    cmd.arg("sync").arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("--config")
            .and(predicate::str::contains("--since"))
            .and(predicate::str::contains("--only")),
    );
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
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
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
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

    // Provide minimum config for the Sync subcommand (using a dummy path).
    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
            since: None,
            till: None,
            only: None,
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
