//! Freezetag - freeze-tag coordination over broadcast channels
//!
//! One seeker and N hiders wander a W×H grid while a coordinator keeps the
//! authoritative record of who has been tagged. The participants share no
//! state: they talk only through named pub/sub topics (READY, MOVE, STATUS,
//! BEGIN, FREEZE, STOP) with at-most-once delivery, and periodic STATUS
//! heartbeats repair whatever the bus loses.
//!
//! # Modules
//!
//! - [`domain`] - agent ids, positions, board bounds and the position index
//! - [`bus`] - message types, the `Transport` trait and the in-process broker
//! - [`coordinator`] - the game state machine and its recovery protocol
//! - [`agent`] - the shared agent lifecycle with hider and seeker strategies
//! - [`render`] - board snapshots and terminal drawing
//! - [`events`] - structured game events and the JSONL event log
//! - [`game`] - wiring one full game together
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod agent;
pub mod bus;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod events;
pub mod game;
pub mod render;

pub use config::Config;
pub use game::{Game, GameReport, GameSetup};
