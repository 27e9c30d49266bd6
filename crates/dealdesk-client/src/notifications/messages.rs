// Dealdesk
// Copyright (C) 2025 Dealdesk

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Wire messages for the notification channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A push notification delivered to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier
    pub id: String,

    /// Short headline
    pub title: String,

    /// Notification kind, e.g. `deal_update` or `payment_verified`
    #[serde(default)]
    pub category: Option<String>,

    /// Longer body text
    #[serde(default)]
    pub body: Option<String>,

    /// Deal this notification concerns, if any
    #[serde(default)]
    pub deal_id: Option<String>,

    /// Server-side creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Inbound message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A single notification
    Notification { notification: Notification },

    /// Several notifications delivered at once
    NotificationBatch { notifications: Vec<Notification> },

    /// Heartbeat acknowledgement
    Pong,
}

/// Outbound message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_envelope() {
        let json = r#"{"type":"notification","notification":{"id":"n1","title":"Deal updated","category":"deal_update","deal_id":"d42"}}"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();

        match message {
            ServerMessage::Notification { notification } => {
                assert_eq!(notification.id, "n1");
                assert_eq!(notification.category.as_deref(), Some("deal_update"));
                assert_eq!(notification.deal_id.as_deref(), Some("d42"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_batch_envelope() {
        let json = r#"{"type":"notification_batch","notifications":[{"id":"n1","title":"a"},{"id":"n2","title":"b"}]}"#;
        let message: ServerMessage = serde_json::from_str(json).unwrap();

        match message {
            ServerMessage::NotificationBatch { notifications } => assert_eq!(notifications.len(), 2),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_pong_envelope() {
        let message: ServerMessage = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert!(matches!(message, ServerMessage::Pong));
    }

    #[test]
    fn test_ping_wire_format() {
        let json = serde_json::to_string(&ClientMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }
}
