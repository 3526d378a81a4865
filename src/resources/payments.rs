//! Student fee payments.
//!
//! Every payment mutation also invalidates the per-student summary and the
//! parent's payment list, so a balance shown next to a form is never left
//! reflecting the state before the write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{decimal, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "payments",
  detail: "payment",
  path: "/payments/",
  create: &invalidation::PAYMENT_CREATE,
  update: &invalidation::PAYMENT_UPDATE,
  delete: &invalidation::PAYMENT_DELETE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
  pub pay_id: u64,
  #[serde(default)]
  pub parent: Option<u64>,
  #[serde(default)]
  pub parent_name: Option<String>,
  pub student: String,
  #[serde(default)]
  pub student_name: String,
  #[serde(default)]
  pub payment_type: String,
  #[serde(deserialize_with = "decimal")]
  pub amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub late_fee: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub discount: f64,
  #[serde(default)]
  pub due_date: String,
  #[serde(default)]
  pub payment_date: Option<String>,
  pub status: PaymentStatus,
  #[serde(default)]
  pub is_overdue: bool,
  #[serde(default)]
  pub days_overdue: u32,
  #[serde(default)]
  pub academic_year: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Payment {
  /// What is owed: the total if the backend computed one, else the amount.
  pub fn amount_due(&self) -> f64 {
    if self.total_amount > 0.0 {
      self.total_amount
    } else {
      self.amount
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Overdue,
  Partial,
  Cancelled,
  Refunded,
  #[serde(other)]
  Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPayment {
  pub parent: u64,
  pub student: String,
  pub payment_type: String,
  pub amount: String,
  pub due_date: String,
  pub academic_year: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub semester: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub late_fee: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount: Option<String>,
}

/// A payment made from a parent's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentPayment {
  pub parent_id: u64,
  pub data: NewPayment,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentFilters {
  pub student: Option<String>,
  pub parent: Option<u64>,
  pub status: Option<String>,
  pub payment_type: Option<String>,
  pub academic_year: Option<String>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBucket {
  pub status: String,
  #[serde(default)]
  pub count: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
  #[serde(default)]
  pub total_payments: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub paid_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub pending_amount: f64,
  #[serde(default)]
  pub overdue_count: u64,
  #[serde(default)]
  pub by_status: Vec<StatusBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentPaymentSummary {
  #[serde(default, deserialize_with = "decimal")]
  pub total_due: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_paid: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_overdue: f64,
  #[serde(default)]
  pub pending_payments: u64,
  #[serde(default)]
  pub overdue_payments: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub payment_rate: f64,
}

#[derive(Clone)]
pub struct Payments {
  ctx: Ctx,
  crud: Crud<Payment>,
}

impl Payments {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &PaymentFilters) -> Query<Page<Payment>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Payment> {
    self.crud.get(&id)
  }

  pub fn summary(&self) -> Query<PaymentSummary> {
    self
      .ctx
      .query(QueryKey::new("payment-summary"), "/payments/summary/".into())
  }

  /// Balance for one student. Disabled for an empty id.
  pub fn student_summary(&self, student: &str) -> Query<StudentPaymentSummary> {
    self.ctx.query_with(
      QueryKey::new("student-payment-summary").with(student),
      format!("/payments/summary/{}/", student),
      QueryOptions::default().enabled(!student.is_empty()),
    )
  }

  pub fn pending(&self) -> Query<Page<Payment>> {
    self
      .ctx
      .page(QueryKey::new("pending-payments"), "/payments/pending/".into())
  }

  pub fn overdue(&self) -> Query<Page<Payment>> {
    self
      .ctx
      .page(QueryKey::new("overdue-payments"), "/payments/overdue/".into())
  }

  pub fn by_type(&self) -> Query<Value> {
    self
      .ctx
      .query(QueryKey::new("payments-by-type"), "/payments/by_type/".into())
  }

  pub fn by_status(&self) -> Query<Value> {
    self
      .ctx
      .query(QueryKey::new("payments-by-status"), "/payments/by_status/".into())
  }

  /// Disabled without a parent id.
  pub fn parent_payments(&self, parent: Option<u64>) -> Query<Page<Payment>> {
    let id = parent.map(|id| id.to_string()).unwrap_or_default();
    self.ctx.page_with(
      QueryKey::new("parent-payments").with(&id),
      format!("/parents/{}/payments/", id),
      QueryOptions::default().enabled(parent.is_some()),
    )
  }

  pub fn monthly(&self, student: &str, year: i32, month: u32) -> Query<Page<Payment>> {
    self.ctx.page_with(
      QueryKey::new("monthly-payments")
        .with(student)
        .with(year)
        .with(month),
      format!("/payments/monthly/{}/{}/{}/", student, year, month),
      QueryOptions::default().enabled(!student.is_empty() && (1..=12).contains(&month)),
    )
  }

  pub fn create(&self) -> Mutation<NewPayment, Payment> {
    self.crud.create()
  }

  /// Partial update.
  pub fn update(&self) -> Mutation<Update<Value>, Payment> {
    self.crud.update(Method::PATCH)
  }

  pub fn mark_paid(&self) -> Mutation<u64, Payment> {
    self
      .ctx
      .mutation(&invalidation::PAYMENT_MARK_PAID, |client, id: u64| async move {
        client
          .post_empty(&format!("/payments/{}/mark_paid/", id))
          .await
      })
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn create_parent_payment(&self) -> Mutation<ParentPayment, Payment> {
    self.ctx.mutation(
      &invalidation::PARENT_PAYMENT_CREATE,
      |client, payment: ParentPayment| async move {
        client
          .post(
            &format!("/parents/{}/make_payment/", payment.parent_id),
            &payment.data,
          )
          .await
      },
    )
  }
}
