//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout in its lifecycle.
///
/// State transitions:
/// ```text
/// Initiated ──► Priced ──┬──► CouponApplied ──┬──► Authorized ──► Committed
///     │           │      └────────────────────┘         │
///     └───────────┴──────────────┴──────────────────────┴──► Aborted
/// ```
///
/// Before `Authorized` the only write is the cart hold, which an abort
/// releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Request accepted, cart not read yet.
    #[default]
    Initiated,

    /// Payable amount computed from current catalog prices.
    Priced,

    /// A coupon discount has been applied to the amount.
    CouponApplied,

    /// The payment has been captured by the gateway.
    Authorized,

    /// The order has been written (terminal state).
    Committed,

    /// Checkout stopped (terminal state).
    Aborted,
}

impl CheckoutState {
    /// Returns true if the checkout may move from this state to `next`.
    pub fn can_transition_to(&self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        match (self, next) {
            (Initiated, Priced) => true,
            (Priced, CouponApplied | Authorized) => true,
            (CouponApplied, Authorized) => true,
            (Authorized, Committed) => true,
            (state, Aborted) => !state.is_terminal(),
            _ => false,
        }
    }

    /// Returns true if a failure in this state may have left side effects.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, CheckoutState::Authorized | CheckoutState::Committed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Committed | CheckoutState::Aborted)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Initiated => "Initiated",
            CheckoutState::Priced => "Priced",
            CheckoutState::CouponApplied => "CouponApplied",
            CheckoutState::Authorized => "Authorized",
            CheckoutState::Committed => "Committed",
            CheckoutState::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_initiated() {
        assert_eq!(CheckoutState::default(), CheckoutState::Initiated);
    }

    #[test]
    fn test_happy_path_with_and_without_coupon() {
        use CheckoutState::*;
        assert!(Initiated.can_transition_to(Priced));
        assert!(Priced.can_transition_to(CouponApplied));
        assert!(CouponApplied.can_transition_to(Authorized));
        assert!(Priced.can_transition_to(Authorized));
        assert!(Authorized.can_transition_to(Committed));
    }

    #[test]
    fn test_no_skipping_payment() {
        use CheckoutState::*;
        assert!(!Priced.can_transition_to(Committed));
        assert!(!CouponApplied.can_transition_to(Committed));
        assert!(!Initiated.can_transition_to(Authorized));
    }

    #[test]
    fn test_abort_from_any_non_terminal_state() {
        use CheckoutState::*;
        for state in [Initiated, Priced, CouponApplied, Authorized] {
            assert!(state.can_transition_to(Aborted));
        }
        assert!(!Committed.can_transition_to(Aborted));
        assert!(!Aborted.can_transition_to(Aborted));
    }

    #[test]
    fn test_side_effects_start_at_authorization() {
        assert!(!CheckoutState::CouponApplied.has_side_effects());
        assert!(CheckoutState::Authorized.has_side_effects());
    }

    #[test]
    fn test_display() {
        assert_eq!(CheckoutState::CouponApplied.to_string(), "CouponApplied");
        assert_eq!(CheckoutState::Aborted.to_string(), "Aborted");
    }
}
