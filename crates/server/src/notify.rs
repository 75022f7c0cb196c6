//! In-memory notification display and window registry.
//!
//! Both live only as long as the process; nothing is persisted or redelivered.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use precache_core::Error;
use precache_core::notify::{NotificationDescriptor, NotificationSink, WindowClient, WindowClients};
use serde::Serialize;
use tokio::sync::Mutex;
use url::Url;

/// How many notifications [`RecentNotifications`] keeps.
pub const RECENT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ShownNotification {
    #[serde(flatten)]
    pub notification: NotificationDescriptor,
    pub closed: bool,
}

/// Bounded ring of shown notifications, oldest evicted first.
pub struct RecentNotifications {
    capacity: usize,
    shown: Mutex<VecDeque<ShownNotification>>,
}

impl RecentNotifications {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, shown: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<ShownNotification> {
        self.shown.lock().await.iter().rev().cloned().collect()
    }
}

impl Default for RecentNotifications {
    fn default() -> Self {
        Self::new(RECENT_CAPACITY)
    }
}

#[async_trait]
impl NotificationSink for RecentNotifications {
    async fn show(&self, notification: &NotificationDescriptor) -> Result<(), Error> {
        let mut shown = self.shown.lock().await;
        if shown.len() == self.capacity {
            shown.pop_front();
        }
        shown.push_back(ShownNotification { notification: notification.clone(), closed: false });
        Ok(())
    }

    async fn close(&self, id: u64) -> Result<(), Error> {
        let mut shown = self.shown.lock().await;
        match shown.iter_mut().find(|n| n.notification.id == id) {
            Some(entry) => {
                entry.closed = true;
                Ok(())
            }
            None => Err(Error::UnknownNotification(id)),
        }
    }
}

/// Windows the application has reported as open.
#[derive(Default)]
pub struct TrackedWindows {
    next_id: AtomicU64,
    windows: Mutex<Vec<WindowClient>>,
}

impl TrackedWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, url: Url) -> WindowClient {
        let window = WindowClient { id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1, url, focused: false };
        self.windows.lock().await.push(window.clone());
        window
    }
}

#[async_trait]
impl WindowClients for TrackedWindows {
    async fn list(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.windows.lock().await.clone())
    }

    async fn focus(&self, id: u64) -> Result<(), Error> {
        let mut windows = self.windows.lock().await;
        if !windows.iter().any(|w| w.id == id) {
            return Err(Error::Notification(format!("no window {id}")));
        }
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        Ok(())
    }

    async fn open(&self, url: &Url) -> Result<WindowClient, Error> {
        let window = self.register(url.clone()).await;
        self.focus(window.id).await?;
        Ok(WindowClient { focused: true, ..window })
    }
}
