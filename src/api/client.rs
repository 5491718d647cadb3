use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::config::AppConfig;
use crate::notification::model::{NotificationId, NotificationListResponse};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    StatusError { status: StatusCode, body: String },

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Remote side of the notification feature.
///
/// Futures are `'static` so a request can outlive whatever issued it.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationApi: Send + Sync {
    fn fetch_notifications(&self) -> BoxFuture<'static, Result<NotificationListResponse, ApiError>>;

    fn mark_notification_read(&self, id: NotificationId) -> BoxFuture<'static, Result<(), ApiError>>;
}

/// reqwest-backed client for the pet-care REST API.
#[derive(Debug, Clone)]
pub struct HttpNotificationApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpNotificationApi {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!("Notification API client ready for {}", config.api_base_url);

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        // Keep any path prefix on the base URL, e.g. https://host/api/
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    // Attach the bearer token when one is configured
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response body>".to_string());
    Err(ApiError::StatusError { status, body })
}

impl NotificationApi for HttpNotificationApi {
    fn fetch_notifications(&self) -> BoxFuture<'static, Result<NotificationListResponse, ApiError>> {
        let request = self
            .endpoint("notifications")
            .map(|url| self.authorize(self.client.get(url)));

        async move {
            let response = request?.send().await?;
            let response = ensure_success(response).await?;
            let list = response.json::<NotificationListResponse>().await?;
            debug!("Fetched {} notifications", list.notifications.len());
            Ok(list)
        }
        .boxed()
    }

    fn mark_notification_read(&self, id: NotificationId) -> BoxFuture<'static, Result<(), ApiError>> {
        let request = self
            .endpoint(&format!("notifications/{}/read", id))
            .map(|url| self.authorize(self.client.patch(url)));

        async move {
            let response = request?.send().await?;
            ensure_success(response).await?;
            debug!("Server marked notification {} as read", id);
            Ok(())
        }
        .boxed()
    }
}
