//! Service layer: the OAuth2 exchange, the bulk join operation and the
//! command dispatcher, independent of the web framework.
//! - `storage` owns the persisted user records.
//! - `discord` is the only module that talks to the network.

pub mod errors;
pub mod storage;
pub mod discord;
pub mod oauth;
pub mod membership;
pub mod commands;
pub mod observability;
