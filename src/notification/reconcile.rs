use std::collections::HashSet;

use crate::notification::model::{Notification, NotificationId};

/// A notification paired with the read state used for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledEntry {
    pub notification: Notification,
    pub effective_read: bool,
}

/// Merged view of the server list and the local override set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledView {
    pub entries: Vec<ReconciledEntry>,
    pub unread_count: usize,
}

/// Merge server state with local overrides, keeping the server's order.
pub fn reconcile(
    notifications: &[Notification],
    overrides: &HashSet<NotificationId>,
) -> ReconciledView {
    let entries: Vec<ReconciledEntry> = notifications
        .iter()
        .map(|notification| ReconciledEntry {
            effective_read: notification.read || overrides.contains(&notification.id),
            notification: notification.clone(),
        })
        .collect();

    let unread_count = entries.iter().filter(|entry| !entry.effective_read).count();

    ReconciledView {
        entries,
        unread_count,
    }
}
