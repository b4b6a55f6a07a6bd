use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of operations the facade knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentIntent {
    Book,
    Reschedule,
    Cancel,
    ScheduleReminder,
    SendImmediate,
    ProcessQuestionnaire,
}

impl fmt::Display for AgentIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentIntent::Book => write!(f, "book"),
            AgentIntent::Reschedule => write!(f, "reschedule"),
            AgentIntent::Cancel => write!(f, "cancel"),
            AgentIntent::ScheduleReminder => write!(f, "schedule_reminder"),
            AgentIntent::SendImmediate => write!(f, "send_immediate"),
            AgentIntent::ProcessQuestionnaire => write!(f, "process_questionnaire"),
        }
    }
}

/// Descriptive metadata for the agent an intent maps to. These strings are
/// prompt/display material only; no appointment logic lives behind them.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AgentProfile {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
}

impl AgentProfile {
    pub fn for_intent(intent: AgentIntent) -> Self {
        match intent {
            AgentIntent::Book | AgentIntent::Reschedule | AgentIntent::Cancel => AgentProfile {
                name: "BookingAgent",
                role: "Appointment Manager",
                goal: "Book, reschedule, and cancel appointments.",
            },
            AgentIntent::ScheduleReminder | AgentIntent::SendImmediate => AgentProfile {
                name: "ReminderAgent",
                role: "Notification Handler",
                goal: "Send and manage appointment reminders.",
            },
            AgentIntent::ProcessQuestionnaire => AgentProfile {
                name: "PreVisitAgent",
                role: "Questionnaire Coordinator",
                goal: "Collect and summarize pre-consultation patient data.",
            },
        }
    }
}

/// Uniform result shape returned for every dispatched intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEnvelope {
    pub status: String,
    pub agent: String,
    pub task: String,
    pub result: String,
    pub context: Value,
}
