//! Transfer State Definitions
//!
//! One transfer lives entirely inside a single request, so states are only
//! tracked in memory and logged; nothing is persisted.

use std::fmt;

/// Transfer lifecycle
///
/// ```text
/// START → LOCKS_ACQUIRED → VALIDATED → COMMITTED → RELEASED
///               ↓               ↓          ↓
///               └───────────────┴──────────┴──────→ RELEASED
/// ```
///
/// A transfer that fails before any lock is held never leaves `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Request validated, no lock held
    Start,

    /// Both account locks held
    LocksAcquired,

    /// Both accounts read, source balance sufficient
    Validated,

    /// Two-row write succeeded
    Committed,

    /// Terminal: locks released (success or failure)
    Released,
}

impl TransferState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Released)
    }

    /// Whether locks are held in this state.
    #[inline]
    pub fn holds_locks(&self) -> bool {
        matches!(
            self,
            TransferState::LocksAcquired | TransferState::Validated | TransferState::Committed
        )
    }

    /// Legal forward edges. Every lock-holding state may also exit to
    /// `Released`.
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        match (self, next) {
            (Start, LocksAcquired) => true,
            (LocksAcquired, Validated) => true,
            (Validated, Committed) => true,
            (s, Released) => s.holds_locks(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Start => "START",
            TransferState::LocksAcquired => "LOCKS_ACQUIRED",
            TransferState::Validated => "VALIDATED",
            TransferState::Committed => "COMMITTED",
            TransferState::Released => "RELEASED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Released.is_terminal());

        assert!(!TransferState::Start.is_terminal());
        assert!(!TransferState::LocksAcquired.is_terminal());
        assert!(!TransferState::Validated.is_terminal());
        assert!(!TransferState::Committed.is_terminal());
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            TransferState::Start,
            TransferState::LocksAcquired,
            TransferState::Validated,
            TransferState::Committed,
            TransferState::Released,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_exits() {
        assert!(TransferState::LocksAcquired.can_transition_to(TransferState::Released));
        assert!(TransferState::Validated.can_transition_to(TransferState::Released));

        // nothing to release before locks are held
        assert!(!TransferState::Start.can_transition_to(TransferState::Released));
        // no skipping validation
        assert!(!TransferState::LocksAcquired.can_transition_to(TransferState::Committed));
        assert!(!TransferState::Released.can_transition_to(TransferState::Start));
    }

    #[test]
    fn test_display() {
        assert_eq!(TransferState::Start.to_string(), "START");
        assert_eq!(TransferState::LocksAcquired.to_string(), "LOCKS_ACQUIRED");
        assert_eq!(TransferState::Released.to_string(), "RELEASED");
    }
}
