//! State-change notifications for the presentation surface.

use tokio::sync::broadcast;

use crate::models::plan::PlanId;

/// Capacity of the notification channel; slow subscribers lose the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The user profile was refreshed from the backend.
    UserLoaded { plan: PlanId },
    /// The backend could not be reached; local defaults are in use.
    Degraded { reason: String },
    /// The plan catalog is ready.
    PlansLoaded { count: usize, from_cache: bool },
    /// The user moved to another plan.
    PlanSwitched { plan: PlanId },
    /// A plan switch was skipped because admin mode unlocks every plan.
    PlanAlreadyUnlocked { plan: PlanId },
    /// An admin session started.
    AdminActivated { seconds_remaining: u64, local_only: bool },
    /// One second of the admin session elapsed.
    AdminTick { seconds_remaining: u64 },
    /// The admin session was ended explicitly.
    AdminDeactivated { local_only: bool },
    /// The admin session ran out of time.
    AdminExpired,
    /// A generation request was accepted by the backend.
    GenerationStarted { job_id: String, slide_count: u32, design_style: String },
    /// The job is still running.
    GenerationProgress { message: &'static str, percent: u8 },
    /// The job finished.
    GenerationCompleted { filename: Option<String>, download_url: Option<String> },
    /// Free-form message for the surface.
    Notice { level: NoticeLevel, message: String },
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publishes an event. Having no subscriber is not an error.
    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!(?event, "session event");
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
