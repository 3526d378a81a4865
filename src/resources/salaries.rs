//! Employee salary records.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::{decimal, id_string, Crud, Ctx, Resource, Update};
use crate::api::{ApiError, Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "salaries",
  detail: "salary",
  path: "/employee-salaries/",
  create: &invalidation::SALARY_CREATE,
  update: &invalidation::SALARY_UPDATE,
  delete: &invalidation::SALARY_DELETE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salary {
  pub sal_id: u64,
  #[serde(deserialize_with = "id_string")]
  pub employee: String,
  #[serde(default)]
  pub employee_name: String,
  #[serde(default)]
  pub department_name: Option<String>,
  #[serde(default)]
  pub salary_type: String,
  #[serde(default, deserialize_with = "decimal")]
  pub amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub net_salary: f64,
  #[serde(default)]
  pub month: String,
  #[serde(default)]
  pub pay_date: String,
  #[serde(default)]
  pub paid_date: Option<String>,
  pub status: String,
  #[serde(default)]
  pub is_overdue: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSalary {
  pub employee: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub salary_type: Option<String>,
  /// First day of the month, `YYYY-MM-DD`
  pub month: String,
  pub pay_date: String,
  pub basic_salary: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allowances: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deductions: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Salary added through the employee endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeSalary {
  pub employee_id: String,
  pub data: NewSalary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SalaryFilters {
  pub employee: Option<String>,
  pub status: Option<String>,
  pub salary_type: Option<String>,
  pub month: Option<String>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalarySummary {
  #[serde(default)]
  pub total_salaries: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub paid_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub pending_amount: f64,
  #[serde(default)]
  pub overdue_count: u64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Clone)]
pub struct Salaries {
  ctx: Ctx,
  crud: Crud<Salary>,
}

impl Salaries {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &SalaryFilters) -> Query<Page<Salary>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Salary> {
    self.crud.get(&id)
  }

  pub fn summary(&self) -> Query<SalarySummary> {
    self.ctx.query(
      QueryKey::new("salary-summary"),
      "/employee-salaries/summary/".into(),
    )
  }

  /// `month` is `YYYY-MM`; anything else leaves the query disabled.
  pub fn monthly_summary(&self, month: &str) -> Query<Value> {
    let filters = Filters::new().with("month", month);
    self.ctx.query_with(
      QueryKey::new("monthly-salary-summary").with(month),
      filters.apply_to("/employee-salaries/monthly_summary/"),
      QueryOptions::default().enabled(is_year_month(month)),
    )
  }

  pub fn pending(&self) -> Query<Page<Salary>> {
    self.ctx.page(
      QueryKey::new("pending-salaries"),
      "/employee-salaries/pending/".into(),
    )
  }

  pub fn overdue(&self) -> Query<Page<Salary>> {
    self.ctx.page(
      QueryKey::new("overdue-salaries"),
      "/employee-salaries/overdue/".into(),
    )
  }

  pub fn employee_records(&self, employee: &str) -> Query<Page<Salary>> {
    self.ctx.page_with(
      QueryKey::new("employee-salary-records").with(employee),
      format!("/employees/{}/salary_records/", employee),
      QueryOptions::default().enabled(!employee.is_empty()),
    )
  }

  pub fn create(&self) -> Mutation<NewSalary, Salary> {
    self.crud.create()
  }

  pub fn create_for_employee(&self) -> Mutation<EmployeeSalary, Salary> {
    self.ctx.mutation(
      &invalidation::SALARY_CREATE_FOR_EMPLOYEE,
      |client, salary: EmployeeSalary| async move {
        client
          .post(
            &format!("/employees/{}/add_salary/", salary.employee_id),
            &salary.data,
          )
          .await
      },
    )
  }

  pub fn update(&self) -> Mutation<Update<Value>, Salary> {
    self.crud.update(Method::PATCH)
  }

  pub fn mark_paid(&self) -> Mutation<u64, Salary> {
    self
      .ctx
      .mutation(&invalidation::SALARY_MARK_PAID, |client, id: u64| async move {
        client
          .post_empty(&format!("/employee-salaries/{}/mark_paid/", id))
          .await
      })
  }

  /// Marks every id concurrently. If only some go through, the salary
  /// caches are still invalidated and the error lists the failed ids.
  pub fn bulk_mark_paid(&self) -> Mutation<Vec<u64>, Vec<Salary>> {
    let cache = self.ctx.cache().clone();
    self
      .ctx
      .mutation(&invalidation::SALARY_BULK_MARK_PAID, move |client, ids: Vec<u64>| {
        let cache = cache.clone();
        async move {
          let results = join_all(ids.iter().map(|id| {
            let client = &client;
            async move {
              client
                .post_empty::<Salary>(&format!("/employee-salaries/{}/mark_paid/", id))
                .await
            }
          }))
          .await;

          let mut paid = Vec::with_capacity(ids.len());
          let mut failed = Vec::new();
          let mut first_error = None;
          for (id, result) in ids.iter().zip(results) {
            match result {
              Ok(salary) => paid.push(salary),
              Err(e) => {
                failed.push(id.to_string());
                first_error.get_or_insert(e);
              }
            }
          }

          let Some(first) = first_error else {
            return Ok(paid);
          };
          if paid.is_empty() {
            return Err(first);
          }

          warn!(paid = paid.len(), failed = ?failed, "bulk salary payment partly applied");
          for prefix in invalidation::SALARY_BULK_MARK_PAID.resolve(&Value::Null, &Value::Null) {
            cache.invalidate(&prefix);
          }
          Err(ApiError::Partial {
            total: ids.len(),
            failed,
            first: Box::new(first),
          })
        }
      })
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }
}

fn is_year_month(month: &str) -> bool {
  month.len() == 7 && chrono::NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::harness;
  use serde_json::json;

  fn salary_json(id: u64, employee: Value, status: &str) -> Value {
    json!({
      "sal_id": id,
      "employee": employee,
      "employee_name": "Musa",
      "amount": "2500.00",
      "net_salary": 2300,
      "month": "2024-09-01",
      "pay_date": "2024-09-30",
      "status": status,
    })
  }

  #[test]
  fn test_month_format() {
    assert!(is_year_month("2024-09"));
    assert!(!is_year_month("2024-13"));
    assert!(!is_year_month("2024-9"));
    assert!(!is_year_month(""));
  }

  #[tokio::test]
  async fn test_monthly_summary_query_string() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/employee-salaries/monthly_summary/?month=2024-09",
      200,
      json!({"month": "2024-09", "total_amount": 5000}),
    );
    let salaries = Salaries::new(Ctx::new(client, cache));

    let summary = salaries.monthly_summary("2024-09").load().await.unwrap().unwrap();
    assert_eq!(summary["total_amount"], json!(5000));
    assert_eq!(salaries.monthly_summary("Sept").load().await.unwrap(), None);
  }

  #[test]
  fn test_numeric_employee_id_decodes() {
    let salary: Salary = serde_json::from_value(salary_json(1, json!(42), "pending")).unwrap();
    assert_eq!(salary.employee, "42");
    assert_eq!(salary.amount, 2500.0);
    assert_eq!(salary.net_salary, 2300.0);
  }

  #[tokio::test]
  async fn test_bulk_mark_paid() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/employee-salaries/1/mark_paid/", 200, salary_json(1, json!("e-1"), "paid"));
    mock.on(Method::POST, "/employee-salaries/2/mark_paid/", 200, salary_json(2, json!("e-2"), "paid"));
    cache.set_data(&QueryKey::new("pending-salaries"), json!([]));
    let salaries = Salaries::new(Ctx::new(client, cache.clone()));

    let paid = salaries.bulk_mark_paid().mutate_async(vec![1, 2]).await.unwrap();
    assert_eq!(paid.len(), 2);
    assert!(paid.iter().all(|s| s.status == "paid"));
    assert!(cache.snapshot(&QueryKey::new("pending-salaries")).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_bulk_mark_paid_partial_failure_still_invalidates() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/employee-salaries/1/mark_paid/", 200, salary_json(1, json!("e-1"), "paid"));
    mock.on(Method::POST, "/employee-salaries/2/mark_paid/", 500, json!({"detail": "boom"}));
    mock.on(Method::POST, "/employee-salaries/3/mark_paid/", 200, salary_json(3, json!("e-3"), "paid"));
    cache.set_data(&QueryKey::new("pending-salaries"), json!([]));
    cache.set_data(&QueryKey::new("salary-summary"), json!({}));
    let salaries = Salaries::new(Ctx::new(client, cache.clone()));

    let err = salaries.bulk_mark_paid().mutate_async(vec![1, 2, 3]).await.unwrap_err();
    match &err {
      ApiError::Partial { total, failed, first } => {
        assert_eq!(*total, 3);
        assert_eq!(failed, &vec!["2".to_string()]);
        assert_eq!(first.status(), Some(500));
      }
      other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.calls(Method::POST, "/employee-salaries/3/mark_paid/"), 1);
    assert!(cache.snapshot(&QueryKey::new("pending-salaries")).unwrap().is_invalidated);
    assert!(cache.snapshot(&QueryKey::new("salary-summary")).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_bulk_mark_paid_total_failure_leaves_cache() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/employee-salaries/1/mark_paid/", 404, json!({"detail": "Not found."}));
    cache.set_data(&QueryKey::new("pending-salaries"), json!([]));
    let salaries = Salaries::new(Ctx::new(client, cache.clone()));

    let err = salaries.bulk_mark_paid().mutate_async(vec![1]).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!cache.snapshot(&QueryKey::new("pending-salaries")).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_employee_salary_invalidates_their_records() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/employees/e-5/add_salary/", 201, salary_json(8, json!("e-5"), "pending"));
    let records = QueryKey::from(["employee-salary-records", "e-5"]);
    cache.set_data(&records, json!([]));
    let salaries = Salaries::new(Ctx::new(client, cache.clone()));

    salaries
      .create_for_employee()
      .mutate_async(EmployeeSalary {
        employee_id: "e-5".into(),
        data: NewSalary {
          employee: "e-5".into(),
          month: "2024-09-01".into(),
          pay_date: "2024-09-30".into(),
          basic_salary: "2500.00".into(),
          ..NewSalary::default()
        },
      })
      .await
      .unwrap();
    assert!(cache.snapshot(&records).unwrap().is_invalidated);
  }
}
