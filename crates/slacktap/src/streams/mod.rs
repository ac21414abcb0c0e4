//! Resource descriptors of the Slack streams.
//!
//! ```text
//! channels ──child──▶ channel_members
//!    │
//!    └──child──▶ messages ──aux──▶ threads ──aux──▶ thread_reactions
//!                   │
//!                   └──aux──▶ message_reactions
//! users
//! user_groups        (admin)
//! integration_logs   (admin)
//! ```

mod admin;
mod conversations;
mod messages;
mod reactions;

use crate::config::TapConfig;
use crate::schemas;
use slacktap_engine::{Endpoint, PaginatorKind, ResourceDescriptor, ResourceGraph, SyncResult};

pub use admin::IntegrationLogHooks;
pub use conversations::{ChannelHooks, ChannelMemberHooks};
pub use messages::{MessageHooks, ThreadHooks};
pub use reactions::ReactionHooks;

/// `conversations.list`.
pub const CHANNELS: &str = "channels";
/// `conversations.members`.
pub const CHANNEL_MEMBERS: &str = "channel_members";
/// `conversations.history`.
pub const MESSAGES: &str = "messages";
/// `conversations.replies`.
pub const THREADS: &str = "threads";
/// Reactions on channel messages.
pub const MESSAGE_REACTIONS: &str = "message_reactions";
/// Reactions on thread replies.
pub const THREAD_REACTIONS: &str = "thread_reactions";
/// `users.list`.
pub const USERS: &str = "users";
/// `usergroups.list`.
pub const USER_GROUPS: &str = "user_groups";
/// `team.integrationLogs`.
pub const INTEGRATION_LOGS: &str = "integration_logs";

/// Request budget of most Slack methods (tier 2+).
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 200;

/// Request budget of `conversations.history` and `conversations.replies`.
pub const HISTORY_REQUESTS_PER_MINUTE: u32 = 60;

fn slack_resource(
    name: &str,
    schema: slacktap_protocol::Schema,
    path: &str,
    records_path: &str,
    config: &TapConfig,
) -> ResourceDescriptor {
    ResourceDescriptor::new(name, schema)
        .with_endpoint(Endpoint::get(path))
        .with_records_path(records_path)
        .with_paginator(PaginatorKind::slack_cursor())
        .with_page_size(config.page_size)
        .with_max_requests_per_minute(DEFAULT_REQUESTS_PER_MINUTE)
}

/// All resources for `config`, in extraction order.
pub fn resources(config: &TapConfig) -> Vec<ResourceDescriptor> {
    let lookback = config.thread_lookback();

    let mut resources = vec![
        slack_resource(
            CHANNELS,
            schemas::channels(),
            "/conversations.list",
            "/channels",
            config,
        )
        .with_primary_keys(["id"])
        .with_hooks(ChannelHooks::new(config.clone())),
        slack_resource(
            CHANNEL_MEMBERS,
            schemas::channel_members(),
            "/conversations.members",
            "/members",
            config,
        )
        .with_primary_keys(["channel_id", "user_id"])
        .child_of(CHANNELS)
        .with_selected_by_default(false)
        .with_hooks(ChannelMemberHooks),
        slack_resource(
            MESSAGES,
            schemas::messages(),
            "/conversations.history",
            "/messages",
            config,
        )
        .with_primary_keys(["channel_id", "ts"])
        .with_incremental("ts")
        .with_lookback(lookback)
        .with_sorted(false)
        .with_max_requests_per_minute(HISTORY_REQUESTS_PER_MINUTE)
        .child_of(CHANNELS)
        .with_auxiliary(THREADS)
        .with_auxiliary(MESSAGE_REACTIONS)
        .with_hooks(MessageHooks),
        slack_resource(
            THREADS,
            schemas::threads(),
            "/conversations.replies",
            "/messages",
            config,
        )
        .with_primary_keys(["channel_id", "thread_ts", "ts"])
        .with_incremental("ts")
        .with_lookback(lookback)
        .with_max_requests_per_minute(HISTORY_REQUESTS_PER_MINUTE)
        .auxiliary_of(MESSAGES)
        .with_auxiliary(THREAD_REACTIONS)
        .with_hooks(ThreadHooks),
        ResourceDescriptor::new(MESSAGE_REACTIONS, schemas::reactions_schema())
            .with_primary_keys(["id"])
            .auxiliary_of(MESSAGES)
            .with_hooks(ReactionHooks),
        ResourceDescriptor::new(THREAD_REACTIONS, schemas::reactions_schema())
            .with_primary_keys(["id"])
            .auxiliary_of(THREADS)
            .with_hooks(ReactionHooks),
        slack_resource(USERS, schemas::users(), "/users.list", "/members", config)
            .with_primary_keys(["id"]),
    ];

    if config.include_admin_streams {
        resources.extend(admin::resources(config));
    }
    resources
}

/// The validated resource graph for `config`.
pub fn graph(config: &TapConfig) -> SyncResult<ResourceGraph> {
    ResourceGraph::new(resources(config))
}
