//! Status overlay shown above a minion.

use crate::scheduler::{ScheduleHandle, Scheduler};
use crate::types::Position;
use crate::world::{VisualHandle, VisualHost};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Height of the overlay above the minion body.
const OVERLAY_HEIGHT: f64 = 1.0;

/// Owns at most one overlay and at most one pending expiry.
pub struct StatusAnnouncer {
    host: Arc<dyn VisualHost>,
    scheduler: Arc<dyn Scheduler>,
    anchor: Position,
    overlay: Arc<Mutex<Option<VisualHandle>>>,
    expiry: Option<ScheduleHandle>,
}

impl StatusAnnouncer {
    pub fn new(host: Arc<dyn VisualHost>, scheduler: Arc<dyn Scheduler>, minion_at: Position) -> Self {
        Self {
            host,
            scheduler,
            anchor: minion_at.offset(0.0, OVERLAY_HEIGHT, 0.0),
            overlay: Arc::new(Mutex::new(None)),
            expiry: None,
        }
    }

    /// Show `text`, replacing whatever is shown now.
    ///
    /// With `duration` of `None` the overlay stays until [`clear`](Self::clear);
    /// otherwise it is removed after that many ticks.
    pub fn set_message(&mut self, text: &str, duration: Option<u64>) {
        self.cancel_expiry();

        let handle = {
            let mut overlay = self.overlay.lock();
            *overlay.get_or_insert_with(|| self.host.place_overlay(self.anchor))
        };
        self.host.set_overlay_text(handle, text);
        debug!("Status overlay {}: {:?} (expires: {:?})", handle, text, duration);

        if let Some(ticks) = duration {
            let overlay = self.overlay.clone();
            let host = self.host.clone();
            self.expiry = Some(self.scheduler.schedule_once(
                Box::new(move || {
                    if let Some(handle) = overlay.lock().take() {
                        host.remove(handle);
                        debug!("Status overlay {} expired", handle);
                    }
                }),
                ticks,
            ));
        }
    }

    /// Remove the overlay, if any, and drop a pending expiry.
    pub fn clear(&mut self) {
        self.cancel_expiry();
        if let Some(handle) = self.overlay.lock().take() {
            self.host.remove(handle);
        }
    }

    pub fn is_showing(&self) -> bool {
        self.overlay.lock().is_some()
    }

    fn cancel_expiry(&mut self) {
        if let Some(expiry) = self.expiry.take() {
            expiry.cancel();
        }
    }
}
