use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::DashboardError;

pub const DEFAULT_AGENT_ID: &str = "main";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub quick_task: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    agents: Vec<Agent>,
}

/// Fixed set of agents the dashboard shows cards for.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl AgentRegistry {
    #[must_use]
    pub fn builtin() -> Self {
        let agent = |id: &str, name: &str, icon: &str, model: &str, workspace: &str, task: &str| {
            Agent {
                id: id.to_owned(),
                name: name.to_owned(),
                icon: icon.to_owned(),
                model: model.to_owned(),
                workspace: workspace.to_owned(),
                quick_task: Some(task.to_owned()),
            }
        };

        Self {
            agents: vec![
                agent(
                    DEFAULT_AGENT_ID,
                    "Main",
                    "🦞",
                    "ollama/qwen3:8b",
                    "~/.openclaw/workspace",
                    "Give me a short status report of every running session.",
                ),
                agent(
                    "writer",
                    "Writer",
                    "✍️",
                    "ollama/llama3.1:8b",
                    "~/.openclaw/workspace-writer",
                    "Draft today's blog post from the newest learning notes.",
                ),
                agent(
                    "researcher",
                    "Researcher",
                    "🔎",
                    "ollama/qwen3:8b",
                    "~/.openclaw/workspace-researcher",
                    "Summarize what changed in LEARNING_NOTES.md since yesterday.",
                ),
                agent(
                    "ops",
                    "Ops",
                    "🛠️",
                    "ollama/qwen3:4b",
                    "~/.openclaw/workspace-ops",
                    "Check gateway health and list cron jobs whose last run failed.",
                ),
            ],
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DashboardError> {
        let parsed: RegistryFile = toml::from_str(text)
            .map_err(|error| DashboardError::Validation(format!("invalid agents file: {error}")))?;
        Self::from_agents(parsed.agents)
    }

    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            DashboardError::Unavailable(format!(
                "failed to read agents file {}: {error}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&text)
    }

    fn from_agents(agents: Vec<Agent>) -> Result<Self, DashboardError> {
        if agents.is_empty() {
            return Err(DashboardError::Validation(
                "agents file must declare at least one agent".to_owned(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for agent in &agents {
            if agent.id.trim().is_empty() {
                return Err(DashboardError::Validation("agent id must not be empty".to_owned()));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(DashboardError::Validation(format!(
                    "duplicate agent id: {}",
                    agent.id
                )));
            }
        }
        Ok(Self { agents })
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    #[must_use]
    pub fn quick_task(&self, id: &str) -> Option<&str> {
        self.get(id)
            .and_then(|agent| agent.quick_task.as_deref())
            .map(str::trim)
            .filter(|task| !task.is_empty())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
