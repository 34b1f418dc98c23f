//! Lifecycle status machines.
//!
//! Order, payment and invoice statuses each list their outgoing edges as a
//! static table. Every status change in the domain goes through
//! [`StateMachine::transition_to`], so an illegal move surfaces as
//! `InvalidTransition` naming both statuses by their stored names.

use std::fmt;

use super::ValidationError;

pub trait StateMachine: Sized + Copy + PartialEq + fmt::Display + 'static {
    /// Statuses reachable in one step.
    fn valid_transitions(&self) -> &'static [Self];

    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_transition(
                self.to_string(),
                target.to_string(),
            ));
        }
        Ok(target)
    }

    /// No outgoing edges: completed, cancelled, refunded and the like.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ticket {
        Open,
        Held,
        Closed,
    }

    impl fmt::Display for Ticket {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                Ticket::Open => "open",
                Ticket::Held => "held",
                Ticket::Closed => "closed",
            };
            f.write_str(name)
        }
    }

    impl StateMachine for Ticket {
        fn valid_transitions(&self) -> &'static [Self] {
            match self {
                Ticket::Open => &[Ticket::Held, Ticket::Closed],
                Ticket::Held => &[Ticket::Closed],
                Ticket::Closed => &[],
            }
        }
    }

    #[test]
    fn listed_edge_is_taken() {
        assert_eq!(Ticket::Open.transition_to(Ticket::Held), Ok(Ticket::Held));
    }

    #[test]
    fn unlisted_edge_names_both_statuses() {
        let err = Ticket::Held.transition_to(Ticket::Open).unwrap_err();
        assert_eq!(err.to_string(), "Cannot transition from held to open");
    }

    #[test]
    fn closed_is_terminal() {
        assert!(Ticket::Closed.is_terminal());
        assert!(!Ticket::Held.is_terminal());
    }
}
