//! Auth-domain primitives: the bearer credential and the routes exempt from refresh handling.

pub mod credential;
pub mod routes;

pub use credential::*;
pub use routes::*;
