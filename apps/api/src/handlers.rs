pub mod analytics;
pub mod health;
pub mod rate_limits;
pub mod security;
pub mod violations;
