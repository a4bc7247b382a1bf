pub mod admin;
pub mod auth;
pub mod health;
pub mod profile;
pub mod routes;
pub mod social;
pub mod utils;

pub use routes::{Router, build_router};
