//! External service integrations

pub mod couchpotato;

pub use couchpotato::{CouchPotatoClient, ProgressSnapshot, SearchApi};
