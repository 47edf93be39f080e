use serde::Serialize;

use crate::domain::{agents::DEFAULT_AGENT_ID, models::Session};

use super::format::{format_relative, format_tokens, truncate};

/// Sessions younger than this count as live agent activity.
pub const ACTIVE_WINDOW_MS: u64 = 5 * 60 * 1_000;

const PREVIEW_CHARS: usize = 80;

/// Explicit `agentId`, else the second `:` segment of the key, else the default agent.
pub fn derive_agent_id(session: &Session) -> String {
    if let Some(agent_id) = session
        .agent_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        return agent_id.to_owned();
    }

    session
        .key
        .split(':')
        .nth(1)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(DEFAULT_AGENT_ID)
        .to_owned()
}

/// Reported `ageMs` wins over a value derived from `updatedAt`.
pub fn session_age_ms(session: &Session, now_ms: u64) -> Option<u64> {
    session
        .age_ms
        .or_else(|| session.updated_at.map(|updated| now_ms.saturating_sub(updated)))
}

pub fn is_recent(session: &Session, now_ms: u64) -> bool {
    session_age_ms(session, now_ms).is_some_and(|age| age < ACTIVE_WINDOW_MS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub key: String,
    pub agent: String,
    pub updated: String,
    pub tokens: String,
    pub preview: String,
    pub active: bool,
}

/// Most recently updated first.
pub fn build_session_rows(sessions: &[Session], now_ms: u64) -> Vec<SessionRow> {
    let mut ordered = sessions.iter().collect::<Vec<_>>();
    ordered.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));

    ordered
        .into_iter()
        .map(|session| SessionRow {
            key: session.key.clone(),
            agent: derive_agent_id(session),
            updated: match session_age_ms(session, now_ms) {
                Some(age) => format_relative(now_ms, now_ms.saturating_sub(age)),
                None => "—".to_owned(),
            },
            tokens: session
                .total_tokens
                .map(format_tokens)
                .unwrap_or_else(|| "—".to_owned()),
            preview: session
                .last_messages
                .iter()
                .rev()
                .map(|message| message.text())
                .find(|text| !text.trim().is_empty())
                .map(|text| truncate(&text, PREVIEW_CHARS))
                .unwrap_or_default(),
            active: is_recent(session, now_ms),
        })
        .collect()
}
