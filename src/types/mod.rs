mod models;
mod plan;
mod role;

pub use models::*;
pub use plan::SubscriptionType;
pub use role::Role;
