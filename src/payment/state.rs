//! Payment FSM State Definitions
//!
//! State IDs are stored in PostgreSQL as SMALLINT.

use std::fmt;

/// Payment FSM States
///
/// ```text
/// PENDING ──► VERIFYING ──► COMPLETED
///    │            ├──────► FAILED
///    │            └──────► CANCELLED
///    ├──► COMPLETED   (wallet method, no external round-trip)
///    └──► FAILED      (gateway request rejected or timed out)
/// ```
///
/// Terminal states: COMPLETED (20), FAILED (-10), CANCELLED (-20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum PaymentStatus {
    /// Row written, gateway not yet confirmed the request
    Pending = 0,

    /// Gateway accepted the request; waiting for the user and the callback.
    /// Entered only on a confirmed gateway acceptance.
    Verifying = 10,

    /// Terminal: money received and applied
    Completed = 20,

    /// Terminal: request or verification declined
    Failed = -10,

    /// Terminal: user abandoned the gateway page
    Cancelled = -20,
}

impl PaymentStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    /// Valid forward transitions
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Verifying)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Verifying, Completed)
                | (Verifying, Failed)
                | (Verifying, Cancelled)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(PaymentStatus::Pending),
            10 => Some(PaymentStatus::Verifying),
            20 => Some(PaymentStatus::Completed),
            -10 => Some(PaymentStatus::Failed),
            -20 => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Verifying => "VERIFYING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for PaymentStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        PaymentStatus::from_id(value).ok_or(())
    }
}

/// Outcome of one external gateway step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpResult<T> {
    /// Gateway confirmed
    Success(T),
    /// Gateway gave an explicit, final refusal
    Failed(String),
    /// No definitive answer (timeout, transport error); safe to retry
    Pending(String),
}

impl<T> OpResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OpResult::Success(_))
    }

    pub fn is_explicit_fail(&self) -> bool {
        matches!(self, OpResult::Failed(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OpResult::Pending(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Verifying,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());

        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Verifying.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_verifying_only_from_pending() {
        for from in ALL {
            assert_eq!(
                from.can_transition_to(PaymentStatus::Verifying),
                from == PaymentStatus::Pending
            );
        }
        assert!(!PaymentStatus::Verifying.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_state_id_roundtrip() {
        for s in ALL {
            assert_eq!(PaymentStatus::from_id(s.id()), Some(s));
            assert_eq!(PaymentStatus::try_from(s.id()), Ok(s));
        }
        assert_eq!(PaymentStatus::from_id(99), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PaymentStatus::Verifying), "VERIFYING");
        assert_eq!(format!("{}", PaymentStatus::Cancelled), "CANCELLED");
    }

    #[test]
    fn test_op_result() {
        let ok: OpResult<()> = OpResult::Success(());
        assert!(ok.is_success());
        assert!(OpResult::<()>::Failed("x".into()).is_explicit_fail());
        assert!(OpResult::<()>::Pending("timeout".into()).is_pending());
    }
}
