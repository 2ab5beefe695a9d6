//! Single-slot, auto-dismissing user notifications

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How a notification is styled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Lifecycle of the notification slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Hidden,
    Visible,
    /// Hidden but still holding its content for the exit transition
    Fading,
}

/// What the notification slot currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationMessage {
    pub text: Option<String>,
    pub severity: Option<Severity>,
    pub visible: bool,
}

impl NotificationMessage {
    pub fn state(&self) -> NotificationState {
        match (self.visible, self.text.is_some()) {
            (true, _) => NotificationState::Visible,
            (false, true) => NotificationState::Fading,
            (false, false) => NotificationState::Hidden,
        }
    }
}

/// Notification slot shared by every screen.
///
/// A new message replaces the current one and restarts the display timer;
/// nothing is queued. Timers run on the tokio runtime, so `show` and `hide`
/// must be called from within one.
pub struct NotificationChannel {
    state: Arc<watch::Sender<NotificationMessage>>,
    generation: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    display: Duration,
    fade: Duration,
}

impl NotificationChannel {
    pub fn new(display: Duration, fade: Duration) -> Self {
        let (tx, _rx) = watch::channel(NotificationMessage::default());
        Self {
            state: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            display,
            fade,
        }
    }

    /// Show `text`, replacing whatever is shown now
    pub fn show(&self, text: &str, severity: Severity) {
        debug!("Notification ({:?}): {}", severity, text);
        let generation = self.next_generation();
        self.state.send_replace(NotificationMessage {
            text: Some(text.to_string()),
            severity: Some(severity),
            visible: true,
        });

        let state = self.state.clone();
        let current = self.generation.clone();
        let (display, fade) = (self.display, self.fade);
        self.replace_timer(tokio::spawn(async move {
            tokio::time::sleep(display).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            state.send_modify(|m| m.visible = false);
            tokio::time::sleep(fade).await;
            if current.load(Ordering::SeqCst) == generation {
                state.send_replace(NotificationMessage::default());
            }
        }));
    }

    /// Hide now and clear the content once the fade has finished
    pub fn hide(&self) {
        let generation = self.next_generation();
        let changed = self.state.send_if_modified(|m| {
            let was_visible = m.visible;
            m.visible = false;
            was_visible
        });
        if !changed && self.state.borrow().text.is_none() {
            self.cancel_timer();
            return;
        }

        let state = self.state.clone();
        let current = self.generation.clone();
        let fade = self.fade;
        self.replace_timer(tokio::spawn(async move {
            tokio::time::sleep(fade).await;
            if current.load(Ordering::SeqCst) == generation {
                state.send_replace(NotificationMessage::default());
            }
        }));
    }

    /// The current notification
    pub fn current(&self) -> NotificationMessage {
        self.state.borrow().clone()
    }

    /// Observe notification transitions
    pub fn subscribe(&self) -> watch::Receiver<NotificationMessage> {
        self.state.subscribe()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn replace_timer(&self, handle: JoinHandle<()>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.abort();
        }
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn channel() -> NotificationChannel {
        NotificationChannel::new(Duration::from_millis(3000), Duration::from_millis(300))
    }

    #[tokio::test(start_paused = true)]
    async fn newer_message_replaces_older() {
        let channel = channel();
        channel.show("a", Severity::Info);
        sleep(Duration::from_millis(1000)).await;
        channel.show("b", Severity::Success);

        assert_eq!(channel.current().text.as_deref(), Some("b"));

        // The first timer would have fired at 3000ms; "b" must still be up.
        sleep(Duration::from_millis(2500)).await;
        let current = channel.current();
        assert_eq!(current.state(), NotificationState::Visible);
        assert_eq!(current.text.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_hide_then_clear() {
        let channel = channel();
        channel.show("saved", Severity::Success);

        sleep(Duration::from_millis(3100)).await;
        let fading = channel.current();
        assert_eq!(fading.state(), NotificationState::Fading);
        assert_eq!(fading.text.as_deref(), Some("saved"));

        sleep(Duration::from_millis(300)).await;
        assert_eq!(channel.current(), NotificationMessage::default());
        assert_eq!(channel.current().state(), NotificationState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn hide_flips_visibility_immediately() {
        let channel = channel();
        channel.show("oops", Severity::Error);
        channel.hide();

        let current = channel.current();
        assert!(!current.visible);
        assert_eq!(current.severity, Some(Severity::Error));

        sleep(Duration::from_millis(350)).await;
        assert_eq!(channel.current().state(), NotificationState::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn show_during_fade_cancels_clear() {
        let channel = channel();
        channel.show("first", Severity::Info);
        channel.hide();
        sleep(Duration::from_millis(100)).await;
        channel.show("second", Severity::Warning);

        sleep(Duration::from_millis(500)).await;
        let current = channel.current();
        assert_eq!(current.state(), NotificationState::Visible);
        assert_eq!(current.text.as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_transitions() {
        let channel = channel();
        let mut rx = channel.subscribe();
        channel.show("hello", Severity::Info);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().visible);
    }
}
