use crate::domain::models::{ActivityItem, ActivityKind, Session};

use super::{format::truncate, sessions::derive_agent_id};

pub const ACTIVITY_LIMIT: usize = 20;
const SUMMARY_CHARS: usize = 120;

/// Synthesizes the activity feed from sessions: one item per non-empty message
/// (newest message first within a session), or one session item when a session has
/// no messages. Ordered by timestamp, newest first, capped at [`ACTIVITY_LIMIT`].
pub fn build_activity(sessions: &[Session]) -> Vec<ActivityItem> {
    let mut items = Vec::new();

    for session in sessions {
        let agent = derive_agent_id(session);
        let updated_at = session.updated_at.unwrap_or_default();
        let before = items.len();

        for message in session.last_messages.iter().rev() {
            let text = message.text();
            if text.trim().is_empty() {
                continue;
            }
            items.push(ActivityItem {
                kind: ActivityKind::from_role(&message.role),
                agent: agent.clone(),
                summary: truncate(&text, SUMMARY_CHARS),
                timestamp_ms: message.timestamp.unwrap_or(updated_at),
            });
        }

        if items.len() == before && updated_at > 0 {
            items.push(ActivityItem {
                kind: ActivityKind::Session,
                agent,
                summary: format!("session {} updated", session.key),
                timestamp_ms: updated_at,
            });
        }
    }

    items.sort_by(|left, right| right.timestamp_ms.cmp(&left.timestamp_ms));
    items.truncate(ACTIVITY_LIMIT);
    items
}
