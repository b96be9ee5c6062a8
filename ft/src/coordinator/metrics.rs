//! Coordinator counters

use serde::Serialize;

/// Counters reported with the game outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorMetrics {
    pub messages_received: u64,
    pub ready_reports: u64,
    pub move_reports: u64,
    pub status_reports: u64,
    pub freezes_sent: u64,
    pub resyncs_issued: u64,
    pub decode_failures: u64,
    pub renders: u64,
}
