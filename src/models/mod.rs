pub mod audit;
pub mod organization;
pub mod task;
pub mod user;
