use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Full page load; all in-memory state is discarded.
    Hard,
    /// Client-side route replacement.
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    pub url: String,
}

pub trait Navigator: Send + Sync {
    fn hard_redirect(&self, url: &str);
    fn replace(&self, url: &str);
}

/// Navigator that records every request instead of leaving the page.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavigationEvent>>,
    hard_redirected: Notify,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn hard_redirects(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == NavigationKind::Hard)
            .map(|event| event.url)
            .collect()
    }

    /// Resolves once a hard redirect has been recorded, including one that
    /// happened before the call.
    pub async fn wait_for_hard_redirect(&self) -> String {
        loop {
            let notified = self.hard_redirected.notified();
            if let Some(url) = self.hard_redirects().pop() {
                return url;
            }
            notified.await;
        }
    }

    fn record(&self, kind: NavigationKind, url: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(NavigationEvent {
                kind,
                url: url.to_string(),
            });
        }
    }
}

impl Navigator for RecordingNavigator {
    fn hard_redirect(&self, url: &str) {
        info!("Hard redirect to {url}");
        self.record(NavigationKind::Hard, url);
        self.hard_redirected.notify_waiters();
    }

    fn replace(&self, url: &str) {
        info!("Replacing route with {url}");
        self.record(NavigationKind::Replace, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_records_both_kinds() {
        let navigator = RecordingNavigator::new();
        navigator.replace("/auth/sign-in");
        navigator.hard_redirect("/auth/sign-in");

        assert_eq!(navigator.events().len(), 2);
        assert_eq!(navigator.hard_redirects(), vec!["/auth/sign-in".to_string()]);
    }

    #[tokio::test]
    async fn test_wait_for_hard_redirect_sees_past_and_future_events() {
        let navigator = Arc::new(RecordingNavigator::new());

        let waiter = {
            let navigator = Arc::clone(&navigator);
            tokio::spawn(async move { navigator.wait_for_hard_redirect().await })
        };
        tokio::task::yield_now().await;
        navigator.hard_redirect("/auth/sign-in");

        assert_eq!(waiter.await.ok().as_deref(), Some("/auth/sign-in"));
        assert_eq!(navigator.wait_for_hard_redirect().await, "/auth/sign-in");
    }
}
