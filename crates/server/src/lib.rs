pub mod errors;
pub mod keepalive;
pub mod routes;
pub mod startup;
pub mod state;

pub use startup::run;
