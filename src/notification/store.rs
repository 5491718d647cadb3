use std::collections::HashSet;

use tracing::debug;

use crate::notification::model::{Notification, NotificationId};
use crate::notification::reconcile::{reconcile, ReconciledView};

/// Last good server snapshot plus every id seen read this session.
///
/// `overrides` holds ids marked read locally, `server_read` ids any applied
/// poll reported read. Both only grow, so a later poll saying unread cannot
/// bring a notification back.
#[derive(Debug, Default)]
pub struct NotificationStore {
    notifications: Vec<Notification>,
    overrides: HashSet<NotificationId>,
    server_read: HashSet<NotificationId>,
    applied_sequence: Option<u64>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a poll result.
    ///
    /// Results carrying a sequence older than the last applied one are
    /// dropped, returning false.
    pub fn apply_snapshot(&mut self, sequence: u64, notifications: Vec<Notification>) -> bool {
        if let Some(applied) = self.applied_sequence {
            if sequence <= applied {
                debug!(
                    "Dropping stale notification snapshot {} (applied {})",
                    sequence, applied
                );
                return false;
            }
        }

        self.applied_sequence = Some(sequence);
        self.server_read.extend(
            notifications
                .iter()
                .filter(|notification| notification.read)
                .map(|notification| notification.id),
        );
        self.notifications = notifications;
        true
    }

    /// Add an id to the override set. Returns false if it was already there.
    pub fn mark_local(&mut self, id: NotificationId) -> bool {
        self.overrides.insert(id)
    }

    pub fn overrides(&self) -> &HashSet<NotificationId> {
        &self.overrides
    }

    pub fn find(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|notification| notification.id == id)
    }

    fn read_this_session(&self, id: NotificationId) -> bool {
        self.overrides.contains(&id) || self.server_read.contains(&id)
    }

    pub fn is_effectively_read(&self, id: NotificationId) -> Option<bool> {
        self.find(id)
            .map(|notification| notification.read || self.read_this_session(id))
    }

    pub fn view(&self) -> ReconciledView {
        let read: HashSet<NotificationId> =
            self.overrides.union(&self.server_read).copied().collect();
        reconcile(&self.notifications, &read)
    }
}
