//! Record schemas of the Slack streams.

use slacktap_protocol::{FieldType, Property, Schema};

use FieldType::{Any, Boolean, Integer, Number, String as Str};

fn prop(name: &str, field_type: FieldType) -> Property {
    Property::new(name, field_type)
}

fn strings() -> FieldType {
    FieldType::array_of(Str)
}

/// `{value, creator, last_set}` as used by topics and purposes.
fn text_meta() -> FieldType {
    FieldType::object([
        prop("value", Str),
        prop("creator", Str),
        prop("last_set", Integer),
    ])
}

fn reactions() -> FieldType {
    FieldType::array_of(FieldType::object([
        prop("count", Integer),
        prop("name", Str),
        prop("users", strings()),
    ]))
}

fn bot_profile() -> FieldType {
    FieldType::object([
        prop("app_id", Str),
        prop("deleted", Boolean),
        prop("id", Str),
        prop("name", Str),
        prop("team_id", Str),
        prop("updated", Integer),
    ])
}

/// Conversations returned by `conversations.list`.
pub fn channels() -> Schema {
    Schema::new()
        .required_field("id", Str)
        .field("name", Str)
        .field("name_normalized", Str)
        .field("is_channel", Boolean)
        .field("is_group", Boolean)
        .field("is_im", Boolean)
        .field("is_mpim", Boolean)
        .field("is_private", Boolean)
        .field("is_archived", Boolean)
        .field("is_general", Boolean)
        .field("is_shared", Boolean)
        .field("is_ext_shared", Boolean)
        .field("is_org_shared", Boolean)
        .field("is_pending_ext_shared", Boolean)
        .field("is_member", Boolean)
        .field("created", Integer)
        .field("updated", Integer)
        .field("creator", Str)
        .field("unlinked", Integer)
        .field("context_team_id", Str)
        .field("parent_conversation", Str)
        .field("shared_team_ids", strings())
        .field("pending_shared", strings())
        .field("previous_names", strings())
        .field("num_members", Integer)
        .field("topic", text_meta())
        .field("purpose", text_meta())
}

/// One membership row per (channel, user).
pub fn channel_members() -> Schema {
    Schema::new()
        .required_field("channel_id", Str)
        .required_field("user_id", Str)
}

/// Channel messages from `conversations.history`.
pub fn messages() -> Schema {
    Schema::new()
        .required_field("channel_id", Str)
        .property(
            Property::new("ts", Str)
                .required()
                .with_description("Epoch timestamp of when the message was posted."),
        )
        .field("blocks", FieldType::array_of(Any))
        .field("bot_id", Str)
        .field("bot_profile", bot_profile())
        .field("client_msg_id", Str)
        .field("display_as_bot", Boolean)
        .field("file_id", Str)
        .field("file_ids", strings())
        .field("icons", FieldType::object([prop("emoji", Str)]))
        .field("inviter", Str)
        .field("is_delayed_message", Boolean)
        .field("is_intro", Boolean)
        .field("is_locked", Boolean)
        .field("is_starred", Boolean)
        .field("last_read", Str)
        .field("latest_reply", Str)
        .field("name", Str)
        .field("old_name", Str)
        .field("parent_user_id", Str)
        .field("permalink", Str)
        .field("pinned_to", strings())
        .field("purpose", Str)
        .field("reactions", reactions())
        .field("reply_count", Integer)
        .field("reply_users", strings())
        .field("reply_users_count", Integer)
        .field("source_team", Str)
        .field("subscribed", Boolean)
        .field("subtype", Str)
        .field("team", Str)
        .field("text", Str)
        .field("thread_ts", Str)
        .field("topic", Str)
        .field("type", Str)
        .field("unread_count", Integer)
        .field("upload", Boolean)
        .field("user", Str)
        .field("user_team", Str)
        .field("username", Str)
}

/// Thread replies from `conversations.replies`.
pub fn threads() -> Schema {
    Schema::new()
        .required_field("channel_id", Str)
        .required_field("thread_ts", Str)
        .required_field("ts", Str)
        .field("client_msg_id", Str)
        .field("type", Str)
        .field("text", Str)
        .field("user", Str)
        .field("team", Str)
        .field(
            "edited",
            FieldType::object([prop("user", Str), prop("ts", Str)]),
        )
        .field("files", FieldType::array_of(Any))
        .field("upload", Boolean)
        .field("parent_user_id", Str)
        .field("display_as_bot", Boolean)
        .field("is_locked", Boolean)
        .field(
            "blocks",
            FieldType::array_of(FieldType::object([
                prop("block_id", Str),
                prop("type", Str),
                prop("elements", FieldType::array_of(Any)),
            ])),
        )
        .field("subtype", Str)
        .field("bot_id", Str)
        .field("bot_profile", Any)
        .field("root", Any)
        .field("app_id", Str)
        .field("reactions", reactions())
        .field("reply_count", Integer)
        .field("reply_users_count", Number)
        .field("latest_reply", Str)
        .field("reply_users", strings())
        .field("subscribed", Boolean)
}

/// Reactions derived from messages and thread replies.
pub fn reactions_schema() -> Schema {
    Schema::new()
        .required_field("id", Str)
        .required_field("channel_id", Str)
        .property(
            Property::new("ts", Str)
                .required()
                .with_description("Epoch timestamp of when the message was posted."),
        )
        .property(
            Property::new("thread_ts", Str)
                .with_description("Epoch timestamp of the thread parent, if applicable."),
        )
        .field("reaction", Str)
        .field("user", Str)
        .field("original_msg_author", Str)
}

/// Workspace members from `users.list`.
pub fn users() -> Schema {
    Schema::new()
        .required_field("id", Str)
        .field("team_id", Str)
        .field("name", Str)
        .field("deleted", Boolean)
        .field("color", Str)
        .field("real_name", Str)
        .field("tz", Str)
        .field("tz_label", Str)
        .field("tz_offset", Integer)
        .field("is_admin", Boolean)
        .field("is_owner", Boolean)
        .field("is_primary_owner", Boolean)
        .field("is_restricted", Boolean)
        .field("is_ultra_restricted", Boolean)
        .field("is_bot", Boolean)
        .field("updated", Integer)
        .field("is_app_user", Boolean)
        .field("is_email_confirmed", Boolean)
        .field("who_can_share_contact_card", Str)
        .field("profile", FieldType::object([prop("email", Str)]))
}

/// User groups from `usergroups.list`.
pub fn user_groups() -> Schema {
    Schema::new()
        .required_field("id", Str)
        .field("created", Integer)
        .field("creator", Str)
        .field("is_archived", Boolean)
        .field("is_deleted", Boolean)
        .field("is_group", Boolean)
        .field("is_moved", Integer)
        .field("is_mpim", Boolean)
        .field("is_open", Boolean)
        .field("is_pending_ext_shared", Boolean)
        .field("is_read_only", Boolean)
        .field("is_thread_only", Boolean)
        .field("last_read", Str)
        .field("members", strings())
        .field("name", Str)
        .field("name_normalized", Str)
        .field("num_members", Integer)
        .field("parent_group", Str)
        .field("priority", Number)
        .field("purpose", text_meta())
        .field("topic", text_meta())
        .field("unread_count", Integer)
        .field("unread_count_display", Integer)
}

/// App and integration changes from `team.integrationLogs`.
pub fn integration_logs() -> Schema {
    Schema::new()
        .required_field("user_id", Str)
        .field("user_name", Str)
        .required_field("date", Str)
        .field("change_type", Str)
        .field("app_type", Str)
        .field("app_id", Str)
        .field("service_id", Number)
        .field("service_type", Str)
        .field("reason", Str)
        .field("channel", Str)
}
