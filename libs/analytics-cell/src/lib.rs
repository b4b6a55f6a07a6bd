pub mod handlers;
pub mod router;
pub mod services;

pub use router::analytics_routes;
pub use services::dashboard::AnalyticsService;
