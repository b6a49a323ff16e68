pub mod auth;
pub mod dashboard;

pub use auth::{AuthPhase, AuthStore};
pub use dashboard::DashboardStore;
