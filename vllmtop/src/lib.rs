//! Library surface for vllmtop: the session controller and its collaborators.

pub mod api;
pub mod config;
pub mod prefs;
pub mod session;
pub mod types;
