//! UI module root: exposes drawing functions for individual panels.

pub mod charts;
pub mod header;
pub mod logs;
pub mod services;
pub mod status;
pub mod sysctl;
pub mod util;
