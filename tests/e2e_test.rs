//! End-to-end runs of the `uncle` binary against a mock service.

mod common;

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use uncle::test_utils::make_completion_stream;

use common::{COMPLETION_PATH, CONVERSATIONS_PATH, StateFixture, TestLogger};

const LEAF: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
const OTHER: &str = "22222222-2222-4222-8222-222222222222";
const OTHER_LEAF: &str = "bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb";

async fn mount_refresh(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{CONVERSATIONS_PATH}/c1")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"uuid": "c1", "current_leaf_message_uuid": LEAF})),
        )
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn query_streams_answer_and_harvests_commands() {
    let log = TestLogger::new("query_streams_answer_and_harvests_commands");
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .and(body_partial_json(json!({
            "prompt": "how do I list files",
            "parent_message_uuid": "00000000-0000-0000-0000-000000000000",
            "timezone": "Europe/Paris",
            "rendering_mode": "raw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(make_completion_stream(&[
            "First:\n\n```sh\nls\n```\n\n",
            "Then:\n\n```\n\n```\n\n```\nls -la\n```\n",
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server).await;

    let state = StateFixture::bound(&server.uri());
    log.phase("run");
    let output = state.run(&["how", "do", "I", "list", "files"]).await;

    output.assert().success().stdout(predicate::str::starts_with("..\n\n"));
    let history = state.history();
    let entries: Vec<_> = history.lines().collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].ends_with(":0;ls -la"));
    assert!(entries[1].ends_with(":1;ls"));
    assert_eq!(state.dir.read_file("parent_uuid").unwrap(), LEAF);
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn preset_expands_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETION_PATH))
        .and(body_partial_json(json!({
            "prompt": "Reply with a single bash command that will count lines"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(make_completion_stream(&["wc -l"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server).await;

    let state = StateFixture::bound(&server.uri());
    let output = state.run(&["-psh", "count", "lines"]).await;

    output.assert().success().stdout(predicate::str::contains("wc -l"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_query_leaves_state_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal trouble"))
        .mount(&server)
        .await;

    let state = StateFixture::bound(&server.uri());
    state.dir.create_file("parent_uuid", LEAF);
    let output = state.run(&["hello"]).await;

    output
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(
            predicate::str::contains("HTTP 500").and(predicate::str::contains("internal trouble")),
        );
    assert_eq!(state.dir.read_file("parent_uuid").unwrap(), LEAF);
    assert!(!state.dir.file_exists("history"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unbound_query_fails_with_hint() {
    let server = MockServer::start().await;
    let state = StateFixture::unbound(&server.uri());

    let output = state.run(&["hello"]).await;

    output
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("no active conversation").and(predicate::str::contains("-n")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn create_adopts_conversation_and_clears_parent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CONVERSATIONS_PATH))
        .and(body_partial_json(json!({"name": "release notes"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"uuid": OTHER, "name": "release notes"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = StateFixture::bound(&server.uri());
    state.dir.create_file("parent_uuid", LEAF);
    let output = state.run(&["-n", "release", "notes"]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Created conversation release notes"));
    let creds = state.dir.read_json("creds.json");
    assert_eq!(creds["conversation"], OTHER);
    assert_eq!(creds["conversation_name"], "release notes");
    assert_eq!(creds["editor"], "vim");
    assert!(!state.dir.file_exists("parent_uuid"));
}

#[tokio::test(flavor = "multi_thread")]
async fn list_caches_listing_then_select_switches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CONVERSATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"uuid": "c1", "name": "scratch", "updated_at": "2026-01-01T00:00:00Z"},
            {"uuid": OTHER, "name": "deploys", "current_leaf_message_uuid": OTHER_LEAF,
             "updated_at": "2026-04-01T00:00:00Z"},
        ])))
        .mount(&server)
        .await;

    let state = StateFixture::bound(&server.uri());
    let output = state.run(&["-l"]).await;
    output
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("  deploys  {OTHER}\n* scratch  c1")));
    assert!(state.dir.file_exists("list_chats"));

    let output = state.run(&["-s", OTHER]).await;
    output.assert().success().stdout(predicate::str::contains("Switched to deploys"));
    assert_eq!(state.dir.read_json("creds.json")["conversation"], OTHER);
    assert_eq!(state.dir.read_file("parent_uuid").unwrap(), OTHER_LEAF);
}

#[tokio::test(flavor = "multi_thread")]
async fn list_with_id_selects_from_cache() {
    let server = MockServer::start().await;
    let state = StateFixture::bound(&server.uri());
    state.dir.create_file("list_chats", &json!([{"uuid": OTHER, "name": "deploys"}]).to_string());
    state.dir.create_file("parent_uuid", LEAF);

    let output = state.run(&["-l", OTHER]).await;

    output.assert().success().stdout(predicate::str::contains("new thread"));
    assert!(!state.dir.file_exists("parent_uuid"));
}

#[tokio::test(flavor = "multi_thread")]
async fn select_unknown_id_changes_nothing() {
    let server = MockServer::start().await;
    let state = StateFixture::bound(&server.uri());
    state.dir.create_file("list_chats", &json!([{"uuid": OTHER, "name": "deploys"}]).to_string());
    let before = state.dir.read_file("creds.json").unwrap();

    let output = state.run(&["-s", LEAF]).await;

    output.assert().success().stdout(predicate::str::contains("not in the last listing"));
    assert_eq!(state.dir.read_file("creds.json").unwrap(), before);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_select_id_exits_zero() {
    let server = MockServer::start().await;
    let state = StateFixture::bound(&server.uri());

    let output = state.run(&["-s", "abc"]).await;

    output
        .assert()
        .success()
        .stderr(predicate::str::contains("not a conversation id"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_preset_exits_one_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let state = StateFixture::bound(&server.uri());

    let output = state.run(&["-pmissing", "hi"]).await;

    output.assert().code(1).stderr(predicate::str::contains("unknown preset: missing"));
}

#[test]
fn missing_state_directory_names_the_file() {
    let state = StateFixture {
        dir: uncle::test_utils::TestDir::new(),
    };

    state
        .command(&["hello"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("target.json"));
}
