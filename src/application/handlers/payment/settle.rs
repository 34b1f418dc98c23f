//! Applying a payment outcome to the payment and its order together.

use crate::domain::ordering::{Order, OrderStatus, Payment, PaymentStatus};
use crate::domain::SalesError;

/// Moves `payment` to `status` and the order along with it.
///
/// - captured: order completes (already completed stays)
/// - authorized: a pending order starts processing
/// - refunded: order is reversed to cancelled
/// - failed: order untouched, a fresh attempt may follow
///
/// Nothing is persisted; callers save both in one repository call.
pub(crate) fn settle(
    payment: &mut Payment,
    order: &mut Order,
    status: PaymentStatus,
    transaction_id: Option<String>,
    reason: Option<String>,
) -> Result<(), SalesError> {
    if status == PaymentStatus::Captured
        && !matches!(order.status, OrderStatus::Completed)
        && !order.status.accepts_payment()
    {
        return Err(SalesError::invalid_state(
            order.status.as_str(),
            "capture a payment for this order",
        ));
    }

    payment.apply_status(status, transaction_id, reason)?;
    match status {
        PaymentStatus::Captured if order.status != OrderStatus::Completed => order.complete()?,
        PaymentStatus::Authorized if order.status == OrderStatus::Pending => order.mark_processing()?,
        PaymentStatus::Refunded => order.reverse_for_refund(),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ordering::test_support::pending_order;
    use crate::domain::ordering::Gateway;

    #[test]
    fn capture_completes_order() {
        let mut order = pending_order("u1");
        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        settle(&mut payment, &mut order, PaymentStatus::Captured, Some("pi_1".into()), None).unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(payment.status, PaymentStatus::Captured);
    }

    #[test]
    fn authorization_moves_order_to_processing() {
        let mut order = pending_order("u1");
        let mut payment = Payment::attempt(&order, Gateway::Bkash, "BDT");
        settle(&mut payment, &mut order, PaymentStatus::Authorized, None, None).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[test]
    fn failure_leaves_order_alone() {
        let mut order = pending_order("u1");
        let mut payment = Payment::attempt(&order, Gateway::Nagad, "BDT");
        settle(&mut payment, &mut order, PaymentStatus::Failed, None, Some("expired".into())).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(payment.failed_reason.as_deref(), Some("expired"));
    }

    #[test]
    fn capture_on_cancelled_order_is_rejected_untouched() {
        let mut order = pending_order("u1");
        order.cancel().unwrap();
        let mut payment = Payment::attempt(&order, Gateway::Stripe, "BDT");
        let err = settle(&mut payment, &mut order, PaymentStatus::Captured, None, None).unwrap_err();
        assert!(matches!(err, SalesError::InvalidState { .. }));
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
