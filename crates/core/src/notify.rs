//! Push notification bridge.
//!
//! Turns a push payload into a [`NotificationDescriptor`] and shows it
//! through a [`NotificationSink`]; a click closes the notification and
//! focuses an application window, or opens one. Delivery is at most once:
//! a failed display is reported, never retried or queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::Error;
use crate::config::NotificationConfig;
use crate::version::resolve;

/// Opaque data attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDescriptor {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// An open application window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: u64,
    pub url: Url,
    #[serde(default)]
    pub focused: bool,
}

/// What a notification click should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum ClickAction {
    Focus(u64),
    Open(Url),
}

/// Where notifications are displayed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &NotificationDescriptor) -> Result<(), Error>;

    async fn close(&self, id: u64) -> Result<(), Error>;
}

/// The application windows a click can act on.
#[async_trait]
pub trait WindowClients: Send + Sync {
    async fn list(&self) -> Result<Vec<WindowClient>, Error>;

    async fn focus(&self, id: u64) -> Result<(), Error>;

    async fn open(&self, url: &Url) -> Result<WindowClient, Error>;
}

/// Build the descriptor for one push.
///
/// An empty or missing payload gets the configured default body; anything
/// else is decoded as (lossy) UTF-8 text.
pub fn compose(
    config: &NotificationConfig, id: u64, payload: Option<&[u8]>, arrived: DateTime<Utc>,
) -> NotificationDescriptor {
    let body = match payload {
        Some(bytes) if !bytes.is_empty() => String::from_utf8_lossy(bytes).into_owned(),
        _ => config.default_body.clone(),
    };

    NotificationDescriptor {
        id,
        title: config.title.clone(),
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        data: NotificationData { date_of_arrival: arrived, primary_key: 1 },
    }
}

/// Focus the first window on the application origin, else open `start_url`.
pub fn plan_click(windows: &[WindowClient], origin: &Url, start_url: &Url) -> ClickAction {
    windows
        .iter()
        .find(|window| window.url.origin() == origin.origin())
        .map(|window| ClickAction::Focus(window.id))
        .unwrap_or_else(|| ClickAction::Open(start_url.clone()))
}

pub struct NotificationBridge {
    config: NotificationConfig,
    origin: Url,
    start_url: Url,
    next_id: AtomicU64,
    sink: Arc<dyn NotificationSink>,
    windows: Arc<dyn WindowClients>,
}

impl NotificationBridge {
    pub fn new(
        config: NotificationConfig, origin: Url, sink: Arc<dyn NotificationSink>, windows: Arc<dyn WindowClients>,
    ) -> Result<Self, Error> {
        let start_url = resolve(&origin, &config.start_url)?;
        Ok(Self { config, origin, start_url, next_id: AtomicU64::new(1), sink, windows })
    }

    /// Handle a push: compose and show, once.
    pub async fn on_push(&self, payload: Option<&[u8]>) -> Result<NotificationDescriptor, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = compose(&self.config, id, payload, Utc::now());

        if let Err(err) = self.sink.show(&notification).await {
            warn!(id, error = %err, "notification display failed; dropping");
            return Err(into_notification_error(err));
        }

        info!(id, title = %notification.title, "notification shown");
        Ok(notification)
    }

    /// Handle a click: close the notification, then focus or open a window.
    ///
    /// A click on a notification the sink no longer knows does nothing and
    /// returns [`Error::UnknownNotification`].
    pub async fn on_click(&self, id: u64) -> Result<ClickAction, Error> {
        match self.sink.close(id).await {
            Ok(()) => {}
            Err(err @ Error::UnknownNotification(_)) => return Err(err),
            Err(err) => debug!(id, error = %err, "close failed; continuing with click"),
        }

        let windows = self.windows.list().await.map_err(into_notification_error)?;
        let action = plan_click(&windows, &self.origin, &self.start_url);

        match &action {
            ClickAction::Focus(window) => self.windows.focus(*window).await,
            ClickAction::Open(url) => self.windows.open(url).await.map(|_| ()),
        }
        .map_err(into_notification_error)?;

        debug!(id, ?action, "notification click handled");
        Ok(action)
    }
}

fn into_notification_error(err: Error) -> Error {
    match err {
        Error::Notification(_) => err,
        other => Error::Notification(other.to_string()),
    }
}
