//! Store internals: record model, wildcard matching, the storage engine,
//! the mutation gate, and the caching layer

pub mod caching;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod flags;
pub mod gate;
pub mod model;
pub mod store;
pub mod wildcard;
