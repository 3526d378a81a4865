use crate::resources::attendance::AttendanceRecord;
use crate::resources::payments::{Payment, PaymentStatus};

/// Share of records marked present or late, as a percentage. Zero when
/// there are no records.
pub fn attendance_rate(records: &[AttendanceRecord]) -> f64 {
  if records.is_empty() {
    return 0.0;
  }
  let attended = records.iter().filter(|r| r.status.attended()).count();
  attended as f64 / records.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PaymentTotals {
  /// Still owed, overdue included
  pub due: f64,
  pub paid: f64,
  pub overdue: f64,
  pub count: usize,
}

/// Sum a payment list by state. Cancelled and refunded payments count
/// towards nothing.
pub fn payment_totals(payments: &[Payment]) -> PaymentTotals {
  payments
    .iter()
    .fold(PaymentTotals::default(), |mut totals, payment| {
      totals.count += 1;
      let amount = payment.amount_due();
      match payment.status {
        PaymentStatus::Paid => totals.paid += amount,
        PaymentStatus::Cancelled | PaymentStatus::Refunded => {}
        status => {
          totals.due += amount;
          if payment.is_overdue || status == PaymentStatus::Overdue {
            totals.overdue += amount;
          }
        }
      }
      totals
    })
}
