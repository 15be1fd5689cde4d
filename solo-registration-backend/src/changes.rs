use std::sync::Arc;

use solo_registration_allocation::models::{
    PerformanceWeek, Registration, RepertoireSubmission, WaitlistEntry,
};
use solo_registration_allocation::sync::{Change, Patch};
use solo_registration_config::MAX_EVENT_BUFFER;
use tokio::sync::{broadcast, watch};
use tracing::trace;
use uuid::Uuid;

/// Fan-out of [`Change`]s to every event stream subscriber.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
    closed: Arc<watch::Sender<bool>>,
}

impl ChangeFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.clamp(1, MAX_EVENT_BUFFER));
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            closed: Arc::new(closed),
        }
    }

    pub fn publish(&self, change: Change) {
        // no subscribers is fine
        if let Err(err) = self.sender.send(change) {
            trace!("change dropped, nobody listens: {:?}", err.0);
        }
    }

    pub fn publish_all(&self, changes: impl IntoIterator<Item = Change>) {
        for change in changes {
            self.publish(change);
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }

    /// Resolves once [`ChangeFeed::close`] was called.
    #[must_use]
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Ends all event streams, used on shutdown.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }
}

pub fn registration_upserted(record: Registration) -> Change {
    Change::Registrations(Patch::Upsert { record })
}

pub const fn registration_removed(id: Uuid) -> Change {
    Change::Registrations(Patch::Remove { id })
}

pub fn submission_upserted(record: RepertoireSubmission) -> Change {
    Change::RepertoireSubmissions(Patch::Upsert { record })
}

pub const fn submission_removed(id: Uuid) -> Change {
    Change::RepertoireSubmissions(Patch::Remove { id })
}

pub fn waitlist_upserted(record: WaitlistEntry) -> Change {
    Change::Waitlist(Patch::Upsert { record })
}

pub const fn waitlist_removed(id: Uuid) -> Change {
    Change::Waitlist(Patch::Remove { id })
}

pub fn week_upserted(record: PerformanceWeek) -> Change {
    Change::PerformanceWeeks(Patch::Upsert { record })
}

pub const fn week_removed(id: Uuid) -> Change {
    Change::PerformanceWeeks(Patch::Remove { id })
}
