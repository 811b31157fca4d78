//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state mutation and persistence so route
//! handlers can stay focused on protocol translation.

pub mod history;
pub mod persistence;
pub mod presence;
pub mod room;
pub mod storage;
