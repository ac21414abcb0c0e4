//! Integration tests for the extraction engine against a mocked API.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use slacktap_engine::{
    ApiConfig, AuxiliaryCall, CheckpointStore, EngineConfig, Endpoint, FileCheckpointStore,
    HookContext, HttpClient, HttpResponse, ManualClock, MemoryCheckpointStore, MemorySink,
    MockHttpClient, PaginatorKind, ResourceDescriptor, ResourceGraph, ResourceHooks,
    ResourceOutcome, SyncEngine,
};
use slacktap_protocol::{
    datetime_to_slack_ts, Context, FieldType, Message, PageToken, PartitionState, Record, Schema,
    StateDocument,
};
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_300;

fn ts(secs: i64) -> String {
    format!("{secs}.000000")
}

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW, 0).unwrap()
}

struct ChannelHooks;

impl ResourceHooks for ChannelHooks {
    fn child_context(&self, record: &Record, _context: &Context) -> Option<Context> {
        record
            .get("id")
            .and_then(Value::as_str)
            .map(|id| Context::root().with("channel_id", id))
    }
}

struct MessageHooks;

impl ResourceHooks for MessageHooks {
    fn url_params(&self, hook: &HookContext<'_>) -> Vec<(String, String)> {
        let mut params = vec![(
            "channel".to_string(),
            hook.context.get_str("channel_id").unwrap_or_default().to_string(),
        )];
        if let Some(floor) = hook.request_floor.and_then(Value::as_str) {
            params.push(("oldest".to_string(), floor.to_string()));
        }
        params
    }

    fn auxiliary_calls(
        &self,
        record: &Record,
        above_floor: bool,
        hook: &HookContext<'_>,
    ) -> Vec<AuxiliaryCall> {
        let mut calls = Vec::new();
        let replies = record.get("reply_count").and_then(Value::as_u64).unwrap_or(0);
        if let (Some(ts), true) = (record.get("ts").and_then(Value::as_str), replies > 0) {
            calls.push(AuxiliaryCall::new(
                "threads",
                hook.context.clone().with("thread_ts", ts),
            ));
        }
        if above_floor && record.contains_key("reactions") {
            calls.push(
                AuxiliaryCall::new("message_reactions", hook.context.clone())
                    .with_side_channel(record.clone()),
            );
        }
        calls
    }
}

struct ThreadHooks;

impl ResourceHooks for ThreadHooks {
    fn url_params(&self, hook: &HookContext<'_>) -> Vec<(String, String)> {
        vec![
            (
                "channel".to_string(),
                hook.context.get_str("channel_id").unwrap_or_default().to_string(),
            ),
            (
                "ts".to_string(),
                hook.context.get_str("thread_ts").unwrap_or_default().to_string(),
            ),
        ]
    }
}

struct ReactionHooks;

impl ResourceHooks for ReactionHooks {
    fn derive_records(&self, context: &Context, side_channel: Option<&Record>) -> Vec<Record> {
        let Some(message) = side_channel else {
            return Vec::new();
        };
        let ts = message.get("ts").and_then(Value::as_str).unwrap_or_default();
        let channel = context.get_str("channel_id").unwrap_or_default();
        let mut out = Vec::new();
        for reaction in message
            .get("reactions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let name = reaction.get("name").and_then(Value::as_str).unwrap_or_default();
            for user in reaction
                .get("users")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
            {
                let record = json!({
                    "id": format!("{channel}:{ts}:{name}:{user}"),
                    "channel_id": channel,
                    "ts": ts,
                    "reaction": name,
                    "user": user,
                });
                if let Value::Object(record) = record {
                    out.push(record);
                }
            }
        }
        out
    }
}

fn schema(fields: &[&str]) -> Schema {
    fields
        .iter()
        .fold(Schema::new(), |s, f| s.field(*f, FieldType::String))
}

fn slack_graph() -> ResourceGraph {
    let day = Duration::from_secs(86_400);
    ResourceGraph::new(vec![
        ResourceDescriptor::new("channels", schema(&["id", "name"]))
            .with_endpoint(Endpoint::get("/conversations.list"))
            .with_primary_keys(["id"])
            .with_records_path("/channels")
            .with_paginator(PaginatorKind::slack_cursor())
            .with_hooks(ChannelHooks),
        ResourceDescriptor::new(
            "messages",
            schema(&["channel_id", "ts", "thread_ts", "text"])
                .field("reply_count", FieldType::Integer)
                .field("reactions", FieldType::Any),
        )
        .with_endpoint(Endpoint::get("/conversations.history"))
        .with_primary_keys(["channel_id", "ts"])
        .with_incremental("ts")
        .with_records_path("/messages")
        .with_paginator(PaginatorKind::slack_cursor())
        .with_lookback(day)
        .with_sorted(false)
        .child_of("channels")
        .with_auxiliary("threads")
        .with_auxiliary("message_reactions")
        .with_hooks(MessageHooks),
        ResourceDescriptor::new("threads", schema(&["channel_id", "thread_ts", "ts", "text"]))
            .with_endpoint(Endpoint::get("/conversations.replies"))
            .with_primary_keys(["ts"])
            .with_incremental("ts")
            .with_records_path("/messages")
            .with_paginator(PaginatorKind::slack_cursor())
            .with_lookback(day)
            .auxiliary_of("messages")
            .with_hooks(ThreadHooks),
        ResourceDescriptor::new(
            "message_reactions",
            schema(&["id", "channel_id", "ts", "reaction", "user"]),
        )
        .with_primary_keys(["id"])
        .auxiliary_of("messages")
        .with_hooks(ReactionHooks),
        ResourceDescriptor::new("users", schema(&["id", "name"]))
            .with_endpoint(Endpoint::get("/users.list"))
            .with_primary_keys(["id"])
            .with_records_path("/members")
            .with_paginator(PaginatorKind::slack_cursor())
            .with_max_requests_per_minute(60),
    ])
    .unwrap()
}

fn engine_with(
    graph: ResourceGraph,
    client: &Arc<MockHttpClient>,
    store: Arc<dyn CheckpointStore>,
    config: EngineConfig,
    clock: &Arc<ManualClock>,
    selected: &[&str],
) -> SyncEngine<MemorySink> {
    let http: Arc<dyn HttpClient> = client.clone();
    let selection = graph.select(selected.iter().copied()).unwrap();
    SyncEngine::new(
        graph,
        config,
        http,
        ApiConfig::new("https://slack.test/api", "xoxb-test"),
        store,
        MemorySink::new(),
    )
    .with_clock(clock.clone())
    .with_selection(selection)
}

fn engine(
    client: &Arc<MockHttpClient>,
    store: Arc<dyn CheckpointStore>,
    config: EngineConfig,
    clock: &Arc<ManualClock>,
    selected: &[&str],
) -> SyncEngine<MemorySink> {
    engine_with(slack_graph(), client, store, config, clock, selected)
}

fn two_user_pages(client: &MockHttpClient) {
    client
        .respond_json(
            "/users.list",
            json!({
                "ok": true,
                "members": [{"id": "U1", "name": "ana"}, {"id": "U2", "name": "bo"}],
                "response_metadata": {"next_cursor": "c2"}
            }),
        )
        .respond_json(
            "/users.list",
            json!({
                "ok": true,
                "members": [{"id": "U3", "name": "cy"}, {"id": "U4", "name": "di"}],
                "response_metadata": {"next_cursor": ""}
            }),
        );
}

fn one_channel(client: &MockHttpClient) {
    client.respond_json(
        "/conversations.list",
        json!({"ok": true, "channels": [{"id": "C1", "name": "general"}]}),
    );
}

fn channel_ctx() -> Context {
    Context::root().with("channel_id", "C1")
}

#[test]
fn full_root_resource_emits_every_page_and_finalizes() {
    let client = Arc::new(MockHttpClient::new());
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(&client, store.clone(), EngineConfig::new(), &clock, &["users"]);
    let summary = engine.run().unwrap();

    let ids: Vec<_> = engine
        .sink()
        .records("users")
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["U1", "U2", "U3", "U4"]);
    assert_eq!(summary.outcome("users"), Some(ResourceOutcome::Completed));
    assert_eq!(summary.outcome("channels"), Some(ResourceOutcome::Skipped));

    let requests = client.requests_to("/users.list");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].param("cursor"), None);
    assert_eq!(requests[1].param("cursor"), Some("c2"));

    let messages = engine.sink().messages();
    assert_eq!(messages[0].type_name(), "SCHEMA");
    assert!(matches!(messages.last(), Some(Message::State { .. })));
    let state = store.snapshot();
    assert_eq!(state.finalized_count("users"), 1);
    let users = state.get("users", &Context::root()).unwrap();
    assert!(users.page_token.is_none());
}

#[test]
fn rate_limit_spaces_pages() {
    let client = Arc::new(MockHttpClient::new());
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(&client, store, EngineConfig::new(), &clock, &["users"]);
    let summary = engine.run().unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(1)]);
    assert_eq!(
        summary.resources["users"].stats.rate_limit_wait,
        Duration::from_secs(2)
    );
}

#[test]
fn transient_failures_are_retried() {
    let client = Arc::new(MockHttpClient::new());
    client
        .respond("/users.list", HttpResponse::with_status(503, "unavailable"))
        .respond_json(
            "/users.list",
            json!({"ok": true, "members": [{"id": "U1"}]}),
        );
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(&client, store, EngineConfig::new(), &clock, &["users"]);
    let summary = engine.run().unwrap();

    assert_eq!(summary.outcome("users"), Some(ResourceOutcome::Completed));
    assert_eq!(summary.resources["users"].stats.retries, 1);
    assert_eq!(summary.resources["users"].stats.requests, 2);
    assert_eq!(engine.sink().records("users").len(), 1);
}

#[test]
fn incremental_child_filters_below_floor_and_commits_max() {
    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    client.respond_json_when(
        "/conversations.history",
        "channel",
        "C1",
        json!({
            "ok": true,
            "messages": [
                {"ts": ts(1_700_000_050), "text": "old"},
                {"ts": ts(1_700_000_200), "text": "newest"},
                {"ts": ts(1_700_000_150), "text": "newer"}
            ]
        }),
    );
    let clock = Arc::new(ManualClock::new(now()));
    let mut prior = StateDocument::new();
    prior.set(
        "messages",
        &channel_ctx(),
        PartitionState {
            replication_key: Some("ts".into()),
            replication_value: Some(json!(ts(1_700_000_100))),
            finalized: true,
            ..PartitionState::default()
        },
    );
    let store = Arc::new(MemoryCheckpointStore::with_state(prior));

    let mut engine = engine(
        &client,
        store.clone(),
        EngineConfig::new(),
        &clock,
        &["channels", "messages"],
    );
    let summary = engine.run().unwrap();

    let texts: Vec<_> = engine
        .sink()
        .records("messages")
        .iter()
        .map(|r| r["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["newest", "newer"]);
    assert_eq!(summary.resources["messages"].stats.records_filtered, 1);

    let request = &client.requests_to("/conversations.history")[0];
    let lookback_floor = datetime_to_slack_ts(now() - chrono::Duration::days(1));
    assert_eq!(request.param("oldest"), Some(lookback_floor.as_str()));

    let state = store.get("messages", &channel_ctx()).unwrap();
    assert!(state.finalized);
    assert_eq!(state.replication_value, Some(json!(ts(1_700_000_200))));
}

#[test]
fn old_thread_parent_still_drives_thread_extraction() {
    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    let parent = ts(1_700_000_050);
    client
        .respond_json_when(
            "/conversations.history",
            "channel",
            "C1",
            json!({
                "ok": true,
                "messages": [{"ts": parent, "thread_ts": parent, "reply_count": 1}]
            }),
        )
        .respond_json_when(
            "/conversations.replies",
            "ts",
            &parent,
            json!({
                "ok": true,
                "messages": [
                    {"ts": parent, "thread_ts": parent, "text": "question"},
                    {"ts": ts(1_700_000_200), "thread_ts": parent, "text": "answer"}
                ]
            }),
        );
    let clock = Arc::new(ManualClock::new(now()));
    let mut prior = StateDocument::new();
    prior.set(
        "messages",
        &channel_ctx(),
        PartitionState {
            replication_key: Some("ts".into()),
            replication_value: Some(json!(ts(1_700_000_100))),
            finalized: true,
            ..PartitionState::default()
        },
    );
    let store = Arc::new(MemoryCheckpointStore::with_state(prior));
    let config = EngineConfig::new().with_start_date(Utc.timestamp_opt(1_699_990_000, 0).unwrap());

    let mut engine = engine(
        &client,
        store.clone(),
        config,
        &clock,
        &["channels", "messages", "threads"],
    );
    let summary = engine.run().unwrap();

    assert!(engine.sink().records("messages").is_empty());
    let replies = engine.sink().records("threads");
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["text"], json!("answer"));
    assert_eq!(summary.outcome("threads"), Some(ResourceOutcome::Completed));

    let thread_ctx = channel_ctx().with("thread_ts", parent.as_str());
    let state = store.get("threads", &thread_ctx).unwrap();
    assert!(state.finalized);
    assert_eq!(state.replication_value, Some(json!(ts(1_700_000_200))));
}

#[test]
fn reactions_are_derived_without_requests() {
    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    client.respond_json_when(
        "/conversations.history",
        "channel",
        "C1",
        json!({
            "ok": true,
            "messages": [{
                "ts": ts(1_700_000_200),
                "reactions": [{"name": "tada", "count": 2, "users": ["U1", "U2"]}]
            }]
        }),
    );
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(
        &client,
        store.clone(),
        EngineConfig::new(),
        &clock,
        &["message_reactions"],
    );
    let summary = engine.run().unwrap();

    let ids: Vec<_> = engine
        .sink()
        .records("message_reactions")
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    let message_ts = ts(1_700_000_200);
    assert_eq!(
        ids,
        vec![
            format!("C1:{message_ts}:tada:U1"),
            format!("C1:{message_ts}:tada:U2")
        ]
    );
    assert!(engine.sink().records("messages").is_empty());
    assert!(engine.sink().records("channels").is_empty());
    assert_eq!(client.requests().len(), 2);
    assert_eq!(summary.records_emitted("message_reactions"), 2);
    assert!(store.snapshot().partitions("message_reactions").next().is_none());
}

#[test]
fn fatal_error_is_isolated_to_its_resource() {
    let client = Arc::new(MockHttpClient::new());
    client.respond_json(
        "/conversations.list",
        json!({"ok": false, "error": "invalid_auth"}),
    );
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(
        &client,
        store.clone(),
        EngineConfig::new(),
        &clock,
        &["channels", "users"],
    );
    let summary = engine.run().unwrap();

    assert!(summary.has_failures());
    assert_eq!(summary.failed_resources(), vec!["channels"]);
    assert!(summary.resources["channels"].errors[0].contains("invalid_auth"));
    assert_eq!(summary.outcome("users"), Some(ResourceOutcome::Completed));
    assert_eq!(engine.sink().records("users").len(), 4);
    assert_eq!(client.requests_to("/conversations.list").len(), 1);
    assert!(store.get("channels", &Context::root()).is_none());
}

#[test]
fn soft_failure_ends_partition_normally() {
    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    client.respond_json_when(
        "/conversations.history",
        "channel",
        "C1",
        json!({"ok": false, "error": "not_in_channel"}),
    );
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine(
        &client,
        store.clone(),
        EngineConfig::new(),
        &clock,
        &["channels", "messages"],
    );
    let summary = engine.run().unwrap();

    assert!(!summary.has_failures());
    assert_eq!(summary.resources["messages"].stats.soft_failures, 1);
    assert!(store.get("messages", &channel_ctx()).unwrap().finalized);
}

#[test]
fn resumes_from_saved_page_token() {
    let client = Arc::new(MockHttpClient::new());
    client.respond_json_when(
        "/users.list",
        "cursor",
        "c2",
        json!({"ok": true, "members": [{"id": "U3"}]}),
    );
    let clock = Arc::new(ManualClock::new(now()));
    let mut prior = StateDocument::new();
    prior.set(
        "users",
        &Context::root(),
        PartitionState {
            page_token: Some(PageToken::Cursor("c2".into())),
            ..PartitionState::default()
        },
    );
    let store = Arc::new(MemoryCheckpointStore::with_state(prior));

    let mut engine = engine(&client, store.clone(), EngineConfig::new(), &clock, &["users"]);
    engine.run().unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].param("cursor"), Some("c2"));
    assert_eq!(engine.sink().records("users").len(), 1);
    assert!(store.get("users", &Context::root()).unwrap().finalized);
}

#[test]
fn run_limit_stops_at_page_boundary_and_keeps_token() {
    let client = Arc::new(MockHttpClient::new());
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let config = EngineConfig::new().with_record_limit(2);
    let mut engine = engine(&client, store.clone(), config, &clock, &["users"]);
    let summary = engine.run().unwrap();

    assert!(summary.stopped_by_limit);
    assert_eq!(summary.outcome("users"), Some(ResourceOutcome::Stopped));
    assert_eq!(engine.sink().records("users").len(), 2);
    assert_eq!(client.requests().len(), 1);

    let state = store.get("users", &Context::root()).unwrap();
    assert!(!state.finalized);
    assert_eq!(state.page_token, Some(PageToken::Cursor("c2".into())));
    assert!(matches!(
        engine.sink().messages().last(),
        Some(Message::State { .. })
    ));
}

#[test]
fn sorted_incremental_resource_commits_progress_when_stopped() {
    let graph = ResourceGraph::new(vec![ResourceDescriptor::new(
        "events",
        schema(&["id", "ts"]),
    )
    .with_endpoint(Endpoint::get("/events.list"))
    .with_primary_keys(["id"])
    .with_incremental("ts")
    .with_records_path("/events")
    .with_paginator(PaginatorKind::slack_cursor())])
    .unwrap();

    let client = Arc::new(MockHttpClient::new());
    client
        .respond_json(
            "/events.list",
            json!({
                "events": [{"id": "1", "ts": ts(100)}, {"id": "2", "ts": ts(200)}],
                "response_metadata": {"next_cursor": "c2"}
            }),
        )
        .respond_json(
            "/events.list",
            json!({"events": [{"id": "3", "ts": ts(300)}]}),
        );
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let config = EngineConfig::new().with_record_limit(2);
    let mut engine = engine_with(graph, &client, store.clone(), config, &clock, &["events"]);
    engine.run().unwrap();

    let state = store.get("events", &Context::root()).unwrap();
    assert!(state.finalized);
    assert!(state.page_token.is_none());
    assert_eq!(state.replication_value, Some(json!(ts(200))));
}

#[test]
fn resource_limit_stops_only_that_resource() {
    let client = Arc::new(MockHttpClient::new());
    client.respond_json(
        "/conversations.list",
        json!({"ok": true, "channels": [{"id": "C1"}, {"id": "C2"}]}),
    );
    for channel in ["C1", "C2"] {
        client.respond_json_when(
            "/conversations.history",
            "channel",
            channel,
            json!({"ok": true, "messages": [{"ts": ts(1)}, {"ts": ts(2)}]}),
        );
    }
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let config = EngineConfig::new().with_resource_record_limit(1);
    let mut engine = engine(
        &client,
        store.clone(),
        config,
        &clock,
        &["channels", "messages"],
    );
    let summary = engine.run().unwrap();

    assert!(!summary.stopped_by_limit);
    assert_eq!(summary.outcome("messages"), Some(ResourceOutcome::Stopped));
    assert_eq!(summary.outcome("channels"), Some(ResourceOutcome::Completed));
    assert_eq!(engine.sink().records("channels").len(), 2);
    assert_eq!(engine.sink().records("messages").len(), 2);
    assert_eq!(client.requests_to("/conversations.history").len(), 1);
    assert!(store.get("channels", &Context::root()).unwrap().finalized);
}

#[test]
fn state_is_emitted_every_interval() {
    let client = Arc::new(MockHttpClient::new());
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let config = EngineConfig::new().with_state_interval_pages(1);
    let mut engine = engine(&client, store, config, &clock, &["users"]);
    engine.run().unwrap();

    let states = engine.sink().states();
    assert_eq!(states.len(), 4);
    let first = states[0].get("users", &Context::root()).unwrap();
    assert!(!first.finalized);
    assert_eq!(first.page_token, Some(PageToken::Cursor("c2".into())));
}

#[test]
fn file_store_holds_final_state() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let client = Arc::new(MockHttpClient::new());
    two_user_pages(&client);
    let clock = Arc::new(ManualClock::new(now()));

    {
        let store = Arc::new(FileCheckpointStore::open(&path).unwrap());
        let mut engine = engine(&client, store, EngineConfig::new(), &clock, &["users"]);
        engine.run().unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let state = StateDocument::from_json(&text).unwrap();
    assert!(state.get("users", &Context::root()).unwrap().finalized);
}

fn history_graph(rpm: u32) -> ResourceGraph {
    ResourceGraph::new(vec![
        ResourceDescriptor::new("channels", schema(&["id", "name"]))
            .with_endpoint(Endpoint::get("/conversations.list"))
            .with_primary_keys(["id"])
            .with_records_path("/channels")
            .with_paginator(PaginatorKind::slack_cursor())
            .with_hooks(ChannelHooks),
        ResourceDescriptor::new("messages", schema(&["channel_id", "ts", "text"]))
            .with_endpoint(Endpoint::get("/conversations.history"))
            .with_primary_keys(["channel_id", "ts"])
            .with_incremental("ts")
            .with_records_path("/messages")
            .with_paginator(PaginatorKind::slack_cursor())
            .with_sorted(false)
            .with_max_requests_per_minute(rpm)
            .child_of("channels")
            .with_hooks(MessageHooks),
    ])
    .unwrap()
}

#[test]
fn failed_history_fetches_still_wait_their_turn() {
    let client = Arc::new(MockHttpClient::new());
    client.respond_json(
        "/conversations.list",
        json!({"ok": true, "channels": [{"id": "C1"}, {"id": "C2"}, {"id": "C3"}]}),
    );
    for (channel, code) in [
        ("C1", "not_in_channel"),
        ("C2", "invalid_auth"),
        ("C3", "not_in_channel"),
    ] {
        client.respond_json_when(
            "/conversations.history",
            "channel",
            channel,
            json!({"ok": false, "error": code}),
        );
    }
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let mut engine = engine_with(
        history_graph(60),
        &client,
        store.clone(),
        EngineConfig::new(),
        &clock,
        &["channels", "messages"],
    );
    let summary = engine.run().unwrap();

    assert_eq!(client.requests_to("/conversations.history").len(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 3]);
    let messages = &summary.resources["messages"];
    assert_eq!(messages.stats.rate_limit_wait, Duration::from_secs(3));
    assert_eq!(messages.stats.soft_failures, 2);
    assert_eq!(summary.outcome("messages"), Some(ResourceOutcome::Failed));
    assert!(store
        .get("messages", &Context::root().with("channel_id", "C3"))
        .unwrap()
        .finalized);
}

#[test]
fn soft_error_after_first_page_keeps_unsorted_partition_resumable() {
    let start = Utc.timestamp_opt(NOW - 1_000, 0).unwrap();
    let clock = Arc::new(ManualClock::new(now()));
    let store = Arc::new(MemoryCheckpointStore::new());

    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    client
        .respond_json(
            "/conversations.history",
            json!({
                "ok": true,
                "messages": [{"ts": ts(NOW - 100)}],
                "response_metadata": {"next_cursor": "p2"}
            }),
        )
        .respond_json(
            "/conversations.history",
            json!({"ok": false, "error": "internal_error"}),
        );
    let mut engine = engine_with(
        history_graph(0),
        &client,
        store.clone(),
        EngineConfig::new().with_start_date(start),
        &clock,
        &["channels", "messages"],
    );
    let summary = engine.run().unwrap();

    assert!(!summary.has_failures());
    assert_eq!(engine.sink().records("messages").len(), 1);
    let state = store.get("messages", &channel_ctx()).unwrap();
    assert!(!state.finalized);
    assert_eq!(state.page_token, Some(PageToken::Cursor("p2".into())));
    assert_eq!(state.replication_value, None);
    assert_eq!(state.progress_value, Some(json!(ts(NOW - 100))));

    let client = Arc::new(MockHttpClient::new());
    one_channel(&client);
    client.respond_json(
        "/conversations.history",
        json!({"ok": true, "messages": [{"ts": ts(NOW - 200)}]}),
    );
    let mut engine = engine_with(
        history_graph(0),
        &client,
        store.clone(),
        EngineConfig::new().with_start_date(start),
        &clock,
        &["channels", "messages"],
    );
    engine.run().unwrap();

    let requests = client.requests_to("/conversations.history");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].param("cursor"), Some("p2"));
    let ts_values: Vec<_> = engine
        .sink()
        .records("messages")
        .iter()
        .map(|r| r["ts"].clone())
        .collect();
    assert_eq!(ts_values, vec![json!(ts(NOW - 200))]);
    let state = store.get("messages", &channel_ctx()).unwrap();
    assert!(state.finalized);
    assert_eq!(state.replication_value, Some(json!(ts(NOW - 100))));
}
