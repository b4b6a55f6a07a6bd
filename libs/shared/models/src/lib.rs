pub mod auth;
pub mod error;
pub mod records;
pub mod time;

pub use auth::AuthUser;
pub use error::AppError;
pub use records::{
    Appointment, AppointmentStatus, Questionnaire, Reminder, ReminderChannel,
    ReminderStatus, UserRole,
};
pub use time::SlotTime;
