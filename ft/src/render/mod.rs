//! Board view: snapshots of the coordinator state and the observers that draw them

mod observer;
mod snapshot;

pub use observer::{BoardObserver, NullObserver, TerminalRenderer};
pub use snapshot::{BoardSnapshot, Cell};
