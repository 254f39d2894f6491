use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use crate::crypto::credential::AdminSecret;
use crate::error::{AppError, Result};
use crate::events::{NoticeLevel, SessionEvent};
use crate::models::admin::{ActivationOrigin, AdminSession, TickOutcome, format_time_remaining};
use crate::state::SessionContext;

const TICK: Duration = Duration::from_secs(1);

struct AdminInner {
    ctx: SessionContext,
    secret: Option<AdminSecret>,
    session: RwLock<AdminSession>,
    countdown: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the admin session and its one-second countdown.
///
/// ⚠️ The credential check is a client-side gate. The backend must still
/// authorize anything an admin does.
#[derive(Clone)]
pub struct AdminSessionManager {
    inner: Arc<AdminInner>,
}

impl AdminSessionManager {
    pub fn new(ctx: SessionContext) -> Self {
        let secret = ctx.config.admin_secret.clone().map(AdminSecret::new);

        Self {
            inner: Arc::new(AdminInner {
                ctx,
                secret,
                session: RwLock::new(AdminSession::Inactive),
                countdown: Mutex::new(None),
            }),
        }
    }

    pub async fn is_active(&self) -> bool {
        self.inner.session.read().await.is_active()
    }

    pub async fn session(&self) -> AdminSession {
        *self.inner.session.read().await
    }

    /// Verifies the credential locally, then asks the backend to elevate the
    /// user.
    ///
    /// # Arguments
    ///
    /// * `credential` - The admin password entered by the user.
    ///
    /// # Returns
    ///
    /// The new `AdminSession`. An unreachable backend yields a local session of
    /// the configured fallback length; an explicit refusal is an
    /// `AppError::Authorization`.
    pub async fn activate(&self, credential: &str) -> Result<AdminSession> {
        if credential.is_empty() {
            return Err(AppError::Validation(
                "Please enter the admin password".to_string(),
            ));
        }

        let Some(secret) = &self.inner.secret else {
            return Err(AppError::Authorization(
                "Admin access is not configured".to_string(),
            ));
        };

        if !secret.verify(credential) {
            tracing::warn!("🔒 Admin activation rejected locally");
            return Err(AppError::Authorization("Invalid admin password".to_string()));
        }

        let ctx = &self.inner.ctx;
        let fallback = ctx.config.admin_fallback.as_secs().max(1);

        let (seconds, origin) = match ctx.gateway.activate_admin(&ctx.user_id, credential).await {
            Ok(response) => {
                let refused = response.success == Some(false)
                    || response.admin_status.as_ref().is_some_and(|s| !s.is_admin);
                if refused {
                    tracing::warn!("🔒 Backend refused admin activation");
                    return Err(AppError::Authorization(
                        "Admin activation was refused by the server".to_string(),
                    ));
                }

                let seconds = response
                    .admin_status
                    .and_then(|s| s.time_remaining)
                    .filter(|&t| t > 0)
                    .unwrap_or(fallback);
                (seconds, ActivationOrigin::Backend)
            }
            Err(e) if e.is_client_rejection() => {
                tracing::warn!("🔒 Backend refused admin activation: {}", e);
                let message = match &e.last_error {
                    crate::error::TransportError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                return Err(AppError::Authorization(message));
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️  Admin activation could not reach the backend, using local session: {}",
                    e
                );
                (fallback, ActivationOrigin::LocalFallback)
            }
        };

        let session = self.start(seconds, origin).await;
        Ok(session)
    }

    /// Resumes a session the backend still considers active.
    ///
    /// A local fallback session is never resumed.
    pub async fn restore(&self) -> AdminSession {
        let ctx = &self.inner.ctx;

        match ctx.gateway.admin_status(&ctx.user_id).await {
            Ok(response) => match response.admin_status {
                Some(status) if status.is_admin => {
                    let seconds = status.time_remaining.unwrap_or(0);
                    if seconds == 0 {
                        tracing::debug!("Backend admin session has no time left");
                        return AdminSession::Inactive;
                    }
                    tracing::info!("🔁 Restoring admin session ({}s left)", seconds);
                    self.start(seconds, ActivationOrigin::Restored).await
                }
                _ => AdminSession::Inactive,
            },
            Err(e) => {
                tracing::debug!("Admin status unavailable: {}", e);
                AdminSession::Inactive
            }
        }
    }

    /// Ends the session, telling the backend when it can be reached.
    ///
    /// The local session ends before the backend is called, so a countdown
    /// running out meanwhile cannot also expire it.
    pub async fn deactivate(&self) -> Result<()> {
        let was_active = {
            let mut session = self.inner.session.write().await;
            std::mem::replace(&mut *session, AdminSession::Inactive).is_active()
        };
        if !was_active {
            tracing::debug!("Admin deactivation requested with no active session");
            return Ok(());
        }

        if let Some(handle) = self.take_countdown() {
            handle.abort();
        }
        let ctx = &self.inner.ctx;
        ctx.store.clear_admin_plan_override().await;

        let local_only = !self.end_on_backend().await;

        tracing::info!("🔓 Admin mode deactivated");
        ctx.events.emit(SessionEvent::AdminDeactivated { local_only });
        ctx.events.notice(NoticeLevel::Info, "Admin mode deactivated");
        Ok(())
    }

    /// Advances the countdown by one second.
    ///
    /// Reaching zero ends the session, emits `AdminExpired` exactly once and
    /// then ends the session on the backend too.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.inner.session.write().await.tick();
        let ctx = &self.inner.ctx;

        match outcome {
            TickOutcome::Running(seconds_remaining) => {
                ctx.events.emit(SessionEvent::AdminTick { seconds_remaining });
            }
            TickOutcome::Expired => {
                drop(self.take_countdown());
                ctx.store.clear_admin_plan_override().await;
                tracing::info!("⏰ Admin session expired");
                ctx.events.emit(SessionEvent::AdminExpired);
                ctx.events.notice(NoticeLevel::Warning, "Admin session expired");
                self.end_on_backend().await;
            }
            TickOutcome::Idle => {}
        }

        outcome
    }

    /// Returns `false` when the backend could not be told.
    async fn end_on_backend(&self) -> bool {
        let ctx = &self.inner.ctx;
        match ctx.gateway.deactivate_admin(&ctx.user_id).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("⚠️  Backend admin deactivation failed, ending locally: {}", e);
                false
            }
        }
    }

    async fn start(&self, seconds: u64, origin: ActivationOrigin) -> AdminSession {
        let session = AdminSession::Active {
            seconds_remaining: seconds,
            origin,
        };
        *self.inner.session.write().await = session;
        self.spawn_countdown();

        let local_only = origin == ActivationOrigin::LocalFallback;
        tracing::info!(
            "👑 Admin mode active for {} ({:?})",
            format_time_remaining(seconds),
            origin
        );

        let events = &self.inner.ctx.events;
        events.emit(SessionEvent::AdminActivated {
            seconds_remaining: seconds,
            local_only,
        });
        if local_only {
            events.notice(
                NoticeLevel::Warning,
                "Admin mode activated locally (server unreachable)",
            );
        } else {
            events.notice(NoticeLevel::Success, "Admin mode activated");
        }

        session
    }

    fn spawn_countdown(&self) {
        let weak: Weak<AdminInner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = AdminSessionManager { inner };
                if !matches!(manager.tick().await, TickOutcome::Running(_)) {
                    break;
                }
            }
        });

        let previous = self
            .inner
            .countdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn take_countdown(&self) -> Option<JoinHandle<()>> {
        self.inner
            .countdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
