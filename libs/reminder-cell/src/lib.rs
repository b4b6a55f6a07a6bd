pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ReminderError, ScheduleReminderRequest, SendReminderRequest};
pub use router::reminder_routes;
pub use services::dispatch::ReminderDispatchService;
pub use services::scheduler::ReminderSchedulerService;
