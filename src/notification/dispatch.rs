use std::fmt;

use tracing::info;

use crate::notification::model::{Notification, NotificationCategory, TargetId};

/// Screen a notification click leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Profile(TargetId),
    Feed(TargetId),
    MateRequests,
    DiaryCalendar,
    Recap,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Profile(user_id) => format!("/profile/{}", user_id),
            Route::Feed(feed_id) => format!("/feed/{}", feed_id),
            Route::MateRequests => "/petmate/requests".to_string(),
            Route::DiaryCalendar => "/diary/calendar".to_string(),
            Route::Recap => "/recap".to_string(),
            Route::Dashboard => "/mypage".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Where a notification should take the user, if anywhere.
pub fn route_for(notification: &Notification) -> Option<Route> {
    let target = notification.target_id.clone();

    match &notification.category {
        NotificationCategory::Follow => target.map(Route::Profile),
        NotificationCategory::Like | NotificationCategory::Comment => target.map(Route::Feed),
        NotificationCategory::Match => Some(Route::MateRequests),
        NotificationCategory::Diary => Some(Route::DiaryCalendar),
        NotificationCategory::Recap => Some(Route::Recap),
        NotificationCategory::Coin => Some(Route::Dashboard),
        NotificationCategory::Unknown(_) => None,
    }
}

/// Navigation collaborator.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// Navigator for the terminal watcher; it only reports the destination.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &Route) {
        info!("Navigating to {}", route);
    }
}
