pub mod audit;
pub mod auth;
pub mod health;
pub mod organizations;
pub mod tasks;
pub mod users;
