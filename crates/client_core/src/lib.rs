//! Client core for the production-floor shift terminal.
//!
//! [`gateway`] talks to the spreadsheet-backed service, [`machine`] holds the
//! screen and session state, [`driver`] wires the two together with a
//! [`session_store`] so an active shift survives a restart.

pub mod driver;
pub mod gateway;
pub mod machine;
pub mod render;
pub mod session_store;

pub use driver::ShiftClient;
pub use gateway::{HttpGateway, RemoteGateway};
pub use machine::{
    Control, ControlKind, Controls, Effect, Event, LoadStatus, MachineConfig, ReportForm,
    ShiftMachine, ShiftState, SnapshotPurpose, StatusLine, StatusTone,
};
pub use render::render_reports_table;
pub use session_store::{MemorySessionStore, SessionStore, SqliteSessionStore};

#[cfg(test)]
#[path = "tests/mock_service.rs"]
mod mock_service;
