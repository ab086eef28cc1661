mod models;
mod role;

pub use models::*;
pub use role::{LicenseStatus, PlanType, Role};
