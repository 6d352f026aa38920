//! UI module root: exposes drawing functions for individual panels.

pub mod controls;
pub mod dialogs;
pub mod gpu;
pub mod header;
pub mod models;
pub mod scroll;
pub mod status;
pub mod theme;
pub mod util;
