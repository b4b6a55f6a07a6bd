pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    AppointmentError, AutoBookRequest, AvailableSlot, BookAppointmentRequest,
    CancelAppointmentRequest, RescheduleAppointmentRequest, SlotQuery,
};
pub use router::appointment_routes;
pub use services::booking::AppointmentBookingService;
pub use services::slots::SlotService;
