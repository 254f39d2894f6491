use serde::{Deserialize, Serialize};

/// Where an active admin session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOrigin {
    /// The backend confirmed the activation.
    Backend,
    /// The backend was unreachable; the session exists only on this client.
    LocalFallback,
    /// A backend-confirmed session resumed at startup.
    Restored,
}

/// Represents the client-side admin elevation.
///
/// ⚠️ This is a convenience gate for the client only. The backend remains
/// the authority on what an admin may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminSession {
    #[default]
    Inactive,
    Active {
        seconds_remaining: u64,
        origin: ActivationOrigin,
    },
}

/// What a single countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session was running.
    Idle,
    /// The session is still active with this many seconds left.
    Running(u64),
    /// This tick ended the session.
    Expired,
}

impl AdminSession {
    pub fn is_active(&self) -> bool {
        matches!(self, AdminSession::Active { .. })
    }

    pub fn seconds_remaining(&self) -> u64 {
        match self {
            AdminSession::Active { seconds_remaining, .. } => *seconds_remaining,
            AdminSession::Inactive => 0,
        }
    }

    pub fn origin(&self) -> Option<ActivationOrigin> {
        match self {
            AdminSession::Active { origin, .. } => Some(*origin),
            AdminSession::Inactive => None,
        }
    }

    /// Consumes one second. The session becomes `Inactive` the instant the
    /// remaining time reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        match self {
            AdminSession::Inactive => TickOutcome::Idle,
            AdminSession::Active { seconds_remaining, .. } => {
                *seconds_remaining = seconds_remaining.saturating_sub(1);
                if *seconds_remaining == 0 {
                    *self = AdminSession::Inactive;
                    TickOutcome::Expired
                } else {
                    TickOutcome::Running(*seconds_remaining)
                }
            }
        }
    }
}

/// Admin status as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminStatus {
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub time_remaining: Option<u64>,
}

/// Formats a countdown as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_time_remaining(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_counts_down_and_expires_once() {
        let mut session = AdminSession::Active {
            seconds_remaining: 2,
            origin: ActivationOrigin::Backend,
        };

        assert_eq!(session.tick(), TickOutcome::Running(1));
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert!(!session.is_active());
        assert_eq!(session.tick(), TickOutcome::Idle);
    }

    #[test]
    fn time_remaining_format() {
        assert_eq!(format_time_remaining(3723), "1h 2m 3s");
        assert_eq!(format_time_remaining(125), "2m 5s");
        assert_eq!(format_time_remaining(9), "9s");
    }
}
