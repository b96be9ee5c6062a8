//! Publish/subscribe plumbing between agents and the coordinator
//!
//! Components only ever see the [`Transport`] trait: publish a message to its
//! topic, or subscribe to a set of topics and receive raw [`Delivery`] values
//! that decode into [`GameMessage`]. Delivery is at-most-once.
//!
//! ```text
//!   hider 0 ─┐  READY/MOVE/STATUS   ┌──────────┐  READY/MOVE/STATUS  ┌─────────────┐
//!   hider 1 ─┼────────────────────▶│ LocalBus │────────────────────▶│ Coordinator │
//!   seeker  ─┘                      │  broker  │◀────────────────────│             │
//!      ▲                            └──────────┘  BEGIN/FREEZE/STOP  └─────────────┘
//!      └──────── MOVE (seeker only), BEGIN/FREEZE/STOP ───┘
//! ```

mod config;
mod local;
mod messages;
mod transport;

pub use config::BusConfig;
pub use local::{BusMetrics, LocalBus};
pub use messages::{DecodeError, FreezeOrder, GameMessage, MoveReport, ReadyReport, StatusReport, Topic};
pub use transport::{BusError, Delivery, Subscription, Transport};
