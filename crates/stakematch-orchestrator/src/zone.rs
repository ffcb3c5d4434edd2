//! Hand-off of zone provisioner callbacks to the tick thread.
//!
//! A provisioner may complete a [`ZoneCallback`] from any thread. The
//! callback only pushes a [`ZoneReport`] into an unbounded channel; the
//! orchestrator drains it at the start of every tick, so match state is
//! only ever touched on the tick thread.

use stakematch_types::{MatchId, ZoneCallback, ZoneId, ZoneLoadResult};
use tokio::sync::mpsc;
use tracing::debug;

/// Why a zone was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePurpose {
    /// The arena zone a starting match waits for.
    Arena,
    /// Post-match restoration (clone from template).
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneReport {
    pub match_id: MatchId,
    pub zone: ZoneId,
    pub purpose: ZonePurpose,
    pub result: ZoneLoadResult,
}

#[derive(Debug)]
pub struct ZoneInbox {
    tx: mpsc::UnboundedSender<ZoneReport>,
    rx: mpsc::UnboundedReceiver<ZoneReport>,
}

impl Default for ZoneInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneInbox {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// A callback that reports into this inbox.
    #[must_use]
    pub fn callback(&self, match_id: MatchId, zone: ZoneId, purpose: ZonePurpose) -> ZoneCallback {
        let tx = self.tx.clone();
        let reported = zone.clone();
        ZoneCallback::new(zone, move |result| {
            let report = ZoneReport {
                match_id,
                zone: reported,
                purpose,
                result,
            };
            if tx.send(report).is_err() {
                debug!(match_id = %match_id, "zone report dropped: inbox closed");
            }
        })
    }

    /// Every report received since the last drain, in arrival order.
    pub fn drain(&mut self) -> Vec<ZoneReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.rx.try_recv() {
            reports.push(report);
        }
        reports
    }
}
