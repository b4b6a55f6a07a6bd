use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use shared_config::AppConfig;

use crate::models::{AgentEnvelope, AgentIntent, AgentProfile};

/// Strategy selection happens once, from configuration, and is fixed for
/// the life of the process. An unconfigured remote runtime silently selects
/// the mock strategy.
enum Strategy {
    Mock,
    Remote { client: Client, base_url: String },
}

pub struct AgentDispatcher {
    strategy: Strategy,
}

impl AgentDispatcher {
    pub fn from_config(config: &AppConfig) -> Self {
        if config.use_mock_agents || config.agent_runtime_url.is_empty() {
            info!("Agent dispatch using mock runtime");
            return Self { strategy: Strategy::Mock };
        }

        info!("Agent dispatch using remote runtime at {}", config.agent_runtime_url);
        Self {
            strategy: Strategy::Remote {
                client: Client::new(),
                base_url: config.agent_runtime_url.trim_end_matches('/').to_string(),
            },
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.strategy, Strategy::Mock)
    }

    /// Dispatch an intent. Always returns an envelope: the remote strategy
    /// degrades to the mock-shaped result on any transport failure, because
    /// nothing downstream depends on the agent for correctness.
    pub async fn dispatch(&self, intent: AgentIntent, task: &str, context: Value) -> AgentEnvelope {
        let profile = AgentProfile::for_intent(intent);

        match &self.strategy {
            Strategy::Mock => mock_envelope(&profile, task, context),
            Strategy::Remote { client, base_url } => {
                match remote_call(client, base_url, &profile, intent, task, &context).await {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("[{}] remote runtime failed ({}), using mock result", profile.name, e);
                        mock_envelope(&profile, task, context)
                    }
                }
            }
        }
    }
}

fn mock_envelope(profile: &AgentProfile, task: &str, context: Value) -> AgentEnvelope {
    info!("[{}] Executing task: {}", profile.name, task);
    info!("[{}] Context: {}", profile.name, context);

    AgentEnvelope {
        status: "success".to_string(),
        agent: profile.name.to_string(),
        task: task.to_string(),
        result: format!("Mock execution of {} by {}", task, profile.name),
        context,
    }
}

async fn remote_call(
    client: &Client,
    base_url: &str,
    profile: &AgentProfile,
    intent: AgentIntent,
    task: &str,
    context: &Value,
) -> Result<AgentEnvelope> {
    let body = json!({
        "agent": profile,
        "intent": intent,
        "task": task,
        "expected_output": format!("{} operation result", profile.role),
        "context": context,
    });

    let response = client
        .post(format!("{}/tasks", base_url))
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("agent runtime returned {}", response.status()));
    }

    let payload: Value = response.json().await?;
    let result = payload["result"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string());

    Ok(AgentEnvelope {
        status: "success".to_string(),
        agent: profile.name.to_string(),
        task: task.to_string(),
        result,
        context: context.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[tokio::test]
    async fn mock_dispatch_echoes_task_and_context() {
        let dispatcher = AgentDispatcher::from_config(&TestConfig::default().to_app_config());
        assert!(dispatcher.is_mock());

        let context = json!({"action": "book", "appointment_id": "apt-1"});
        let envelope = dispatcher
            .dispatch(AgentIntent::Book, "Book an appointment for Jane", context.clone())
            .await;

        assert_eq!(envelope.status, "success");
        assert_eq!(envelope.agent, "BookingAgent");
        assert_eq!(envelope.task, "Book an appointment for Jane");
        assert!(envelope.result.contains("BookingAgent"));
        assert_eq!(envelope.context, context);
    }

    #[tokio::test]
    async fn reminder_intents_route_to_the_reminder_agent() {
        let dispatcher = AgentDispatcher::from_config(&TestConfig::default().to_app_config());

        let envelope = dispatcher
            .dispatch(AgentIntent::SendImmediate, "Send immediate reminder", json!({}))
            .await;
        assert_eq!(envelope.agent, "ReminderAgent");

        let envelope = dispatcher
            .dispatch(AgentIntent::ProcessQuestionnaire, "Process questionnaire", json!({}))
            .await;
        assert_eq!(envelope.agent, "PreVisitAgent");
    }

    #[test]
    fn empty_runtime_url_falls_back_to_mock() {
        let mut config = TestConfig::default().to_app_config();
        config.use_mock_agents = false;
        config.agent_runtime_url = String::new();

        assert!(AgentDispatcher::from_config(&config).is_mock());
    }
}
