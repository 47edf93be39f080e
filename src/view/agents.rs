use serde::Serialize;

use crate::domain::{agents::AgentRegistry, models::Session};

use super::sessions::{derive_agent_id, is_recent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCard {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub model: String,
    pub workspace: String,
    pub active: bool,
    pub last_activity_ms: Option<u64>,
    pub session_count: usize,
    pub total_tokens: u64,
    pub has_quick_task: bool,
}

/// One card per registered agent. Sessions of unregistered agents are ignored here.
pub fn build_agent_cards(
    registry: &AgentRegistry,
    sessions: &[Session],
    now_ms: u64,
) -> Vec<AgentCard> {
    let attributed = sessions
        .iter()
        .map(|session| (derive_agent_id(session), session))
        .collect::<Vec<_>>();

    registry
        .agents()
        .iter()
        .map(|agent| {
            let own = attributed
                .iter()
                .filter(|(agent_id, _)| *agent_id == agent.id)
                .map(|(_, session)| *session)
                .collect::<Vec<_>>();

            AgentCard {
                id: agent.id.clone(),
                name: agent.name.clone(),
                icon: agent.icon.clone(),
                model: agent.model.clone(),
                workspace: agent.workspace.clone(),
                active: own.iter().any(|session| is_recent(session, now_ms)),
                last_activity_ms: own.iter().filter_map(|session| session.updated_at).max(),
                session_count: own.len(),
                total_tokens: own
                    .iter()
                    .filter_map(|session| session.total_tokens)
                    .sum(),
                has_quick_task: registry.quick_task(&agent.id).is_some(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::build_agent_cards;
    use crate::domain::{agents::AgentRegistry, models::Session};

    const NOW: u64 = 1_800_000_000_000;

    fn session(key: &str, age_ms: u64) -> Session {
        Session {
            key: key.to_owned(),
            updated_at: Some(NOW - age_ms),
            total_tokens: Some(100),
            ..Session::default()
        }
    }

    #[test]
    fn agent_is_active_with_recent_matching_session() {
        let registry = AgentRegistry::builtin();
        let sessions = vec![
            session("agent:writer:main", 60_000),
            session("agent:ops:main", 10 * 60_000),
        ];
        let cards = build_agent_cards(&registry, &sessions, NOW);

        let writer = cards.iter().find(|card| card.id == "writer").expect("writer card");
        assert!(writer.active);
        let ops = cards.iter().find(|card| card.id == "ops").expect("ops card");
        assert!(!ops.active);
        assert_eq!(ops.session_count, 1);
        let main = cards.iter().find(|card| card.id == "main").expect("main card");
        assert!(!main.active);
        assert_eq!(main.last_activity_ms, None);
    }

    #[test]
    fn last_activity_is_latest_update() {
        let registry = AgentRegistry::builtin();
        let sessions = vec![
            session("agent:main:a", 30 * 60_000),
            session("garbage", 20 * 60_000),
            session("agent:main:b", 40 * 60_000),
        ];
        let cards = build_agent_cards(&registry, &sessions, NOW);
        let main = cards.iter().find(|card| card.id == "main").expect("main card");
        assert_eq!(main.session_count, 3);
        assert_eq!(main.last_activity_ms, Some(NOW - 20 * 60_000));
        assert_eq!(main.total_tokens, 300);
    }

    #[test]
    fn age_boundary_is_exclusive() {
        let registry = AgentRegistry::builtin();
        let cards = build_agent_cards(&registry, &[session("agent:ops:x", 5 * 60_000)], NOW);
        let ops = cards.iter().find(|card| card.id == "ops").expect("ops card");
        assert!(!ops.active);
    }
}
