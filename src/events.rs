// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Notification event envelope.
//!
//! Backends publish this JSON shape when a todo changes; the notification
//! service consumes it. Neither the gateway nor the auth service touches the
//! channel, the type only pins the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subject prefix every todo event is published under.
pub const SUBJECT_PREFIX: &str = "todos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationEvent {
    /// Event kind, e.g. `created`, `due_date`, `completion`.
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: String,
    /// Producers that predate the envelope send `id`.
    #[serde(alias = "id")]
    pub todo_id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        kind: impl Into<String>,
        user_id: impl Into<String>,
        todo_id: impl Into<String>,
        title: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: kind.into(),
            user_id: user_id.into(),
            todo_id: todo_id.into(),
            title: title.into(),
            timestamp,
        }
    }

    /// Channel subject, `todos.<type>`.
    pub fn subject(&self) -> String {
        format!("{SUBJECT_PREFIX}.{}", self.kind)
    }
}
