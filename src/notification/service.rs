use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::client::{ApiError, NotificationApi};
use crate::notification::dispatch::{route_for, Navigator, Route};
use crate::notification::model::{NotificationError, NotificationId};
use crate::notification::reconcile::ReconciledView;
use crate::notification::store::NotificationStore;

/// Outcome of a mark-as-read request.
#[derive(Debug)]
pub enum MarkRead {
    /// Already read by server flag or override; nothing was sent
    AlreadyRead,
    /// Override applied; the server request runs on this task
    Pending(JoinHandle<()>),
}

/// Owns the notification store and the optimistic read state.
///
/// Every change to the store is published on a watch channel so a renderer
/// always sees the latest reconciled view.
pub struct NotificationService {
    api: Arc<dyn NotificationApi>,
    store: Mutex<NotificationStore>,
    view_tx: watch::Sender<ReconciledView>,
    refresh: Arc<Notify>,
    sequence: AtomicU64,
}

impl NotificationService {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        let (view_tx, _) = watch::channel(ReconciledView::default());
        Self {
            api,
            store: Mutex::new(NotificationStore::new()),
            view_tx,
            refresh: Arc::new(Notify::new()),
            sequence: AtomicU64::new(0),
        }
    }

    // Store mutations are single calls, so a poisoned lock still holds
    // consistent data.
    fn store(&self) -> MutexGuard<'_, NotificationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, view: ReconciledView) {
        self.view_tx.send_replace(view);
    }

    pub fn subscribe(&self) -> watch::Receiver<ReconciledView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ReconciledView {
        self.store().view()
    }

    /// Fetch the server list and apply it if nothing newer landed meanwhile.
    ///
    /// Returns whether the snapshot was applied. On error the previous
    /// snapshot is left untouched.
    pub async fn poll_once(&self) -> Result<bool, ApiError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.api.fetch_notifications().await?;
        let notifications = response.into_notifications();

        let view = {
            let mut store = self.store();
            if !store.apply_snapshot(sequence, notifications) {
                return Ok(false);
            }
            store.view()
        };

        debug!(
            "Applied notification snapshot {}: {} entries, {} unread",
            sequence,
            view.entries.len(),
            view.unread_count
        );
        self.publish(view);
        Ok(true)
    }

    /// Ask the poller for a fetch ahead of its next tick. Repeated requests
    /// before the poller wakes collapse into one.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub async fn refresh_requested(&self) {
        self.refresh.notified().await
    }

    /// Optimistically mark a notification read, then tell the server.
    ///
    /// The override is in place and published before this returns; the
    /// server request runs on a detached task, so it completes even if the
    /// caller goes away. A failed request is logged and the override kept.
    pub fn mark_as_read(&self, id: NotificationId) -> Result<MarkRead, NotificationError> {
        let view = {
            let mut store = self.store();
            match store.is_effectively_read(id) {
                None => return Err(NotificationError::NotFound(id)),
                Some(true) => return Ok(MarkRead::AlreadyRead),
                Some(false) => {}
            }
            store.mark_local(id);
            debug!(
                "Notification {} read locally ({} overrides this session)",
                id,
                store.overrides().len()
            );
            store.view()
        };
        self.publish(view);

        let request = self.api.mark_notification_read(id);
        let refresh = Arc::clone(&self.refresh);
        let handle = tokio::spawn(async move {
            match request.await {
                Ok(()) => {
                    info!("Notification {} marked as read", id);
                    refresh.notify_one();
                }
                Err(e) => {
                    warn!("Failed to mark notification {} as read: {}", id, e);
                }
            }
        });

        Ok(MarkRead::Pending(handle))
    }

    /// Handle a click: mark read first, then navigate by category.
    ///
    /// Returns the route taken, or None when the category has no destination.
    pub fn open(
        &self,
        id: NotificationId,
        navigator: &dyn Navigator,
    ) -> Result<Option<Route>, NotificationError> {
        let notification = self
            .store()
            .find(id)
            .cloned()
            .ok_or(NotificationError::NotFound(id))?;

        self.mark_as_read(id)?;

        let route = route_for(&notification);
        match &route {
            Some(route) => navigator.navigate(route),
            None => debug!(
                "No destination for notification {} of category {}",
                id,
                notification.category.as_str()
            ),
        }

        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockNotificationApi;
    use crate::notification::model::NotificationListResponse;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::time::Duration;

    const SCENARIO: &str = r#"{"notifications": [
        {"id": 1, "type": "LIKE", "targetId": 10, "read": false},
        {"id": 2, "type": "FOLLOW", "targetId": 20, "isRead": true}
    ]}"#;

    fn respond(json: &'static str) -> BoxFuture<'static, Result<NotificationListResponse, ApiError>> {
        async move { Ok::<_, ApiError>(serde_json::from_str::<NotificationListResponse>(json).unwrap()) }
            .boxed()
    }

    fn accepted() -> BoxFuture<'static, Result<(), ApiError>> {
        async { Ok::<(), ApiError>(()) }.boxed()
    }

    fn server_error<T: Send + 'static>() -> BoxFuture<'static, Result<T, ApiError>> {
        async {
            Err::<T, ApiError>(ApiError::StatusError {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "maintenance".to_string(),
            })
        }
        .boxed()
    }

    fn flags(view: &ReconciledView) -> Vec<(NotificationId, bool)> {
        view.entries
            .iter()
            .map(|entry| (entry.notification.id, entry.effective_read))
            .collect()
    }

    async fn polled(mut api: MockNotificationApi) -> NotificationService {
        api.expect_fetch_notifications().returning(|| respond(SCENARIO));
        let service = NotificationService::new(Arc::new(api));
        assert!(service.poll_once().await.unwrap());
        service
    }

    #[tokio::test]
    async fn test_poll_applies_snapshot() {
        let service = polled(MockNotificationApi::new()).await;

        let view = service.view();
        assert_eq!(flags(&view), vec![(1, false), (2, true)]);
        assert_eq!(view.unread_count, 1);
        assert_eq!(*service.subscribe().borrow(), view);
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_snapshot() {
        let mut api = MockNotificationApi::new();
        let mut calls = 0;
        api.expect_fetch_notifications().returning(move || {
            calls += 1;
            if calls == 1 {
                respond(SCENARIO)
            } else {
                server_error()
            }
        });

        let service = NotificationService::new(Arc::new(api));
        service.poll_once().await.unwrap();
        assert!(service.poll_once().await.is_err());

        assert_eq!(flags(&service.view()), vec![(1, false), (2, true)]);
    }

    #[tokio::test]
    async fn test_mark_as_read_is_visible_before_response() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read()
            .withf(|id| *id == 1)
            .times(1)
            .returning(|_| accepted());
        let service = polled(api).await;
        let rx = service.subscribe();

        let outcome = service.mark_as_read(1).unwrap();

        // Current-thread runtime: the request task has not run yet.
        let view = service.view();
        assert_eq!(flags(&view), vec![(1, true), (2, true)]);
        assert_eq!(view.unread_count, 0);
        assert_eq!(rx.borrow().unread_count, 0);

        match outcome {
            MarkRead::Pending(handle) => handle.await.unwrap(),
            MarkRead::AlreadyRead => panic!("Expected a pending request"),
        }
    }

    #[tokio::test]
    async fn test_mark_as_read_twice_sends_once() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read()
            .times(1)
            .returning(|_| accepted());
        let service = polled(api).await;

        assert!(matches!(service.mark_as_read(1).unwrap(), MarkRead::Pending(_)));
        assert!(matches!(service.mark_as_read(1).unwrap(), MarkRead::AlreadyRead));
        assert_eq!(service.store().overrides().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_server_read_is_noop() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read().never();
        let service = polled(api).await;

        assert!(matches!(service.mark_as_read(2).unwrap(), MarkRead::AlreadyRead));
        assert!(service.store().overrides().is_empty());
    }

    #[tokio::test]
    async fn test_mark_unknown_id() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read().never();
        let service = polled(api).await;

        assert!(matches!(
            service.mark_as_read(99),
            Err(NotificationError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_override() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read()
            .times(1)
            .returning(|_| server_error());
        let service = polled(api).await;

        if let MarkRead::Pending(handle) = service.mark_as_read(1).unwrap() {
            handle.await.unwrap();
        }

        // The next poll still reports id 1 unread.
        assert!(service.poll_once().await.unwrap());
        let view = service.view();
        assert_eq!(flags(&view), vec![(1, true), (2, true)]);
        assert_eq!(view.unread_count, 0);

        let refreshed =
            tokio::time::timeout(Duration::from_millis(50), service.refresh_requested()).await;
        assert!(refreshed.is_err());
    }

    #[tokio::test]
    async fn test_successful_mutation_requests_refresh() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read()
            .returning(|_| accepted());
        let service = polled(api).await;

        if let MarkRead::Pending(handle) = service.mark_as_read(1).unwrap() {
            handle.await.unwrap();
        }

        let refreshed =
            tokio::time::timeout(Duration::from_secs(1), service.refresh_requested()).await;
        assert!(refreshed.is_ok());
    }

    struct CheckingNavigator<'a> {
        service: &'a NotificationService,
        opened: NotificationId,
        visited: Mutex<Vec<Route>>,
    }

    impl<'a> CheckingNavigator<'a> {
        fn new(service: &'a NotificationService, opened: NotificationId) -> Self {
            Self {
                service,
                opened,
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    impl Navigator for CheckingNavigator<'_> {
        fn navigate(&self, route: &Route) {
            assert_eq!(
                self.service.store().is_effectively_read(self.opened),
                Some(true)
            );
            self.visited.lock().unwrap().push(route.clone());
        }
    }

    #[tokio::test]
    async fn test_open_marks_read_before_navigating() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read()
            .times(1)
            .returning(|_| accepted());
        let service = polled(api).await;
        let navigator = CheckingNavigator::new(&service, 1);

        let route = service.open(1, &navigator).unwrap();
        assert_eq!(route.map(|r| r.path()), Some("/feed/10".to_string()));
        assert_eq!(navigator.visited.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_read_notification_still_navigates() {
        let mut api = MockNotificationApi::new();
        api.expect_mark_notification_read().never();
        let service = polled(api).await;
        let navigator = CheckingNavigator::new(&service, 2);

        let route = service.open(2, &navigator).unwrap();
        assert_eq!(route.map(|r| r.path()), Some("/profile/20".to_string()));
    }

    #[tokio::test]
    async fn test_open_unknown_category_marks_read_without_navigating() {
        let mut api = MockNotificationApi::new();
        api.expect_fetch_notifications()
            .returning(|| respond(r#"{"notifications": [{"id": 5, "type": "BIRTHDAY"}]}"#));
        api.expect_mark_notification_read()
            .times(1)
            .returning(|_| accepted());
        let service = NotificationService::new(Arc::new(api));
        service.poll_once().await.unwrap();

        struct PanicNavigator;
        impl Navigator for PanicNavigator {
            fn navigate(&self, route: &Route) {
                panic!("Unexpected navigation to {}", route);
            }
        }

        let route = service.open(5, &PanicNavigator).unwrap();
        assert!(route.is_none());
        assert_eq!(service.view().unread_count, 0);
    }

    #[tokio::test]
    async fn test_open_unknown_id() {
        let service = polled(MockNotificationApi::new()).await;
        let navigator = CheckingNavigator::new(&service, 42);

        assert!(matches!(
            service.open(42, &navigator),
            Err(NotificationError::NotFound(42))
        ));
        assert!(navigator.visited.lock().unwrap().is_empty());
    }
}
