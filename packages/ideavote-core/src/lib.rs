//! Core of the idea voting tool: the idea catalog, the vote store and the
//! services on top of it, and the two client-side session state machines
//! (star voting and survivor triage).

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod fallback;
pub mod persistence;
pub mod storage;
pub mod triage;
pub mod types;
pub mod voting;
