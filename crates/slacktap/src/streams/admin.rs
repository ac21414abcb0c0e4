//! Streams that need admin scopes.

use super::{slack_resource, INTEGRATION_LOGS, USER_GROUPS};
use crate::config::TapConfig;
use crate::schemas;
use serde_json::Value;
use slacktap_engine::{HookContext, PaginatorKind, ResourceDescriptor, ResourceHooks, SyncResult};
use slacktap_protocol::Record;

/// `team.integrationLogs` caps `count` at this value.
const MAX_LOG_PAGE_SIZE: u32 = 1000;

/// Hooks of `integration_logs`.
///
/// Log entries carry the date as epoch seconds in a string or a number;
/// it is normalized to a string so the primary key is stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationLogHooks;

impl ResourceHooks for IntegrationLogHooks {
    fn post_process(&self, raw: Value, _hook: &HookContext<'_>) -> SyncResult<Option<Record>> {
        let Value::Object(mut record) = raw else {
            return Ok(None);
        };
        if let Some(Value::Number(date)) = record.get("date") {
            let date = date.to_string();
            record.insert("date".into(), Value::String(date));
        }
        Ok(Some(record))
    }
}

pub(super) fn resources(config: &TapConfig) -> Vec<ResourceDescriptor> {
    let mut user_groups = slack_resource(
        USER_GROUPS,
        schemas::user_groups(),
        "/usergroups.list",
        "/usergroups",
        config,
    )
    .with_primary_keys(["id"])
    .with_paginator(PaginatorKind::SinglePage)
    .with_extra_param("include_users", "true")
    .with_extra_param("include_disabled", "true");
    user_groups.page_size = None;

    let mut integration_logs = slack_resource(
        INTEGRATION_LOGS,
        schemas::integration_logs(),
        "/team.integrationLogs",
        "/logs",
        config,
    )
    .with_primary_keys(["user_id", "date"])
    .with_paginator(PaginatorKind::slack_paging())
    .with_extra_param(
        "count",
        config.page_size.min(MAX_LOG_PAGE_SIZE).to_string(),
    )
    .with_hooks(IntegrationLogHooks);
    integration_logs.page_size = None;

    vec![user_groups, integration_logs]
}
