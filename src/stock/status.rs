use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a stock transfer.
///
/// Legal transitions:
/// `Pending -> Approved | Rejected`, `Approved -> InTransit`,
/// `InTransit -> Completed`, and any non-terminal state `-> Cancelled`.
/// `Completed`, `Cancelled` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Approved,
    InTransit,
    Completed,
    Cancelled,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Approved => "APPROVED",
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Cancelled | TransferStatus::Rejected
        )
    }

    pub fn can_transition(self, to: TransferStatus) -> bool {
        use TransferStatus::*;
        match (self, to) {
            (Pending, Approved) | (Pending, Rejected) => true,
            (Approved, InTransit) => true,
            (InTransit, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// A transfer moves stock at creation; leaving the live path through
    /// cancellation or rejection must give it back.
    pub fn reverses_ledger(self) -> bool {
        matches!(self, TransferStatus::Cancelled | TransferStatus::Rejected)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransferStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(TransferStatus::Pending),
            "APPROVED" => Ok(TransferStatus::Approved),
            "IN_TRANSIT" => Ok(TransferStatus::InTransit),
            "COMPLETED" => Ok(TransferStatus::Completed),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            "REJECTED" => Ok(TransferStatus::Rejected),
            other => Err(format!("unknown transfer status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TransferStatus::*;
    use super::*;

    const ALL: [TransferStatus; 6] = [Pending, Approved, InTransit, Completed, Cancelled, Rejected];

    #[test]
    fn legal_transitions() {
        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(Pending.can_transition(Cancelled));
        assert!(Approved.can_transition(InTransit));
        assert!(Approved.can_transition(Cancelled));
        assert!(InTransit.can_transition(Completed));
        assert!(InTransit.can_transition(Cancelled));
    }

    #[test]
    fn illegal_transitions() {
        assert!(!Pending.can_transition(InTransit));
        assert!(!Pending.can_transition(Completed));
        assert!(!Approved.can_transition(Completed));
        assert!(!Approved.can_transition(Rejected));
        assert!(!InTransit.can_transition(Rejected));
        assert!(!Completed.can_transition(Pending));
    }

    #[test]
    fn terminal_states_permit_nothing() {
        for from in [Completed, Cancelled, Rejected] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition(to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn no_self_transitions() {
        for status in ALL {
            assert!(!status.can_transition(status));
        }
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in ALL {
            let parsed = TransferStatus::try_from(status.as_str().to_string()).unwrap();
            assert_eq!(parsed, status);
        }
        assert!(TransferStatus::try_from("SHIPPED".to_string()).is_err());
    }
}
