use chrono::{DateTime, Utc};

use crate::notification::model::NotificationId;
use crate::notification::reconcile::ReconciledView;
use crate::notification::time::{display_wall_clock, relative_time};

pub const HELP: &str = "Commands: list | open <id> | read <id> | refresh | help | quit";

/// A line typed into the watcher.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    List,
    Open(NotificationId),
    Read(NotificationId),
    Refresh,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let argument = parts.next();

        let id = argument.map(|raw| raw.parse::<NotificationId>());
        let with_id = |build: fn(NotificationId) -> Command| match &id {
            Some(Ok(id)) => build(*id),
            Some(Err(_)) => Command::Invalid(format!(
                "Not a notification id: {}",
                argument.unwrap_or_default()
            )),
            None => Command::Invalid(format!("Usage: {} <id>", name)),
        };

        match name.as_str() {
            "" | "list" | "ls" => Command::List,
            "open" => with_id(Command::Open),
            "read" => with_id(Command::Read),
            "refresh" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Invalid(format!("Unknown command: {}", other)),
        }
    }
}

/// Text rendering of the reconciled list with the unread badge on top.
pub fn render(view: &ReconciledView, now: DateTime<Utc>) -> String {
    let mut out = format!("Notifications ({} unread)\n", view.unread_count);

    if view.entries.is_empty() {
        out.push_str("  (no notifications)\n");
        return out;
    }

    for entry in &view.entries {
        let notification = &entry.notification;
        let marker = if entry.effective_read { ' ' } else { '*' };
        let when = notification
            .created_at
            .map(|created_at| {
                format!(
                    "{} ({})",
                    relative_time(created_at, now),
                    display_wall_clock(created_at).format("%m-%d %H:%M")
                )
            })
            .unwrap_or_default();

        out.push_str(&format!(
            "{} #{} [{}] {}: {} {}\n",
            marker,
            notification.id,
            notification.category.as_str(),
            notification.title,
            notification.body,
            when
        ));
    }

    out
}
