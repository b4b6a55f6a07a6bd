// =====================================================================================
// AGENT CELL - INTENT DISPATCH FACADE
// =====================================================================================
//
// Routes typed scheduling intents (book, reschedule, cancel, reminders,
// questionnaire processing) to either a deterministic mock runtime or an
// external agent runtime over HTTP, returning a uniform result envelope.
// The facade owns no state and never fails the calling operation.
//
// =====================================================================================

pub mod dispatch;
pub mod models;

pub use dispatch::AgentDispatcher;
pub use models::{AgentEnvelope, AgentIntent, AgentProfile};
