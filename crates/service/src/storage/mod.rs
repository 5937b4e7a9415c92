//! Storage for the service layer.
//!
//! The only persisted state is the list of authorized users, kept in a single
//! JSON document on disk.

pub mod record_store;

pub use record_store::{RecordStore, UserRecord};
