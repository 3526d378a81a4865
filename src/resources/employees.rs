use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::{decimal, to_json, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{fetcher, invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "employees",
  detail: "employee",
  path: "/employees/",
  create: &invalidation::EMPLOYEE_CREATE,
  update: &invalidation::EMPLOYEE_UPDATE,
  delete: &invalidation::EMPLOYEE_DELETE,
};

const ATTENDANCE_STALE_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub id: u64,
  #[serde(default)]
  pub emp_id: String,
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub position: String,
  #[serde(default)]
  pub department: Option<String>,
  #[serde(default)]
  pub status: String,
  #[serde(default, deserialize_with = "decimal")]
  pub salary: f64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeAttendance {
  pub id: u64,
  #[serde(default)]
  pub employee_name: String,
  pub date: String,
  #[serde(default)]
  pub check_in_time: Option<String>,
  #[serde(default)]
  pub check_out_time: Option<String>,
  /// present, absent, late, half_day or on_leave
  pub status: String,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAttendance {
  pub employee_id: String,
  pub data: Value,
}

#[derive(Clone)]
pub struct Employees {
  ctx: Ctx,
  crud: Crud<Employee>,
}

impl Employees {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &Filters) -> Query<Page<Employee>> {
    self.crud.list(filters)
  }

  pub fn get(&self, id: u64) -> Query<Employee> {
    self.crud.get(&id)
  }

  pub fn attendance(&self, employee_id: &str) -> Query<Page<EmployeeAttendance>> {
    self.ctx.page_with(
      QueryKey::new("employee-attendance").with(employee_id),
      attendance_path(employee_id),
      QueryOptions::default()
        .enabled(!employee_id.is_empty())
        .stale_time(ATTENDANCE_STALE_TIME),
    )
  }

  /// The employee's records for one day. The backend has no date filter,
  /// so the full list is fetched and narrowed here.
  pub fn attendance_on(&self, employee_id: &str, date: &str) -> Query<Vec<EmployeeAttendance>> {
    let client = self.ctx.client().clone();
    let path = attendance_path(employee_id);
    let day = date.to_string();

    Query::new(
      self.ctx.cache().clone(),
      QueryKey::new("employee-attendance").with(employee_id).with(date),
      fetcher(move || {
        let client = client.clone();
        let path = path.clone();
        let day = day.clone();
        async move {
          let page = client.get_page::<EmployeeAttendance>(&path).await?;
          let records: Vec<EmployeeAttendance> =
            page.into_iter().filter(|record| record.date == day).collect();
          to_json(&records)
        }
      }),
      QueryOptions::default()
        .enabled(!employee_id.is_empty() && !date.is_empty())
        .stale_time(ATTENDANCE_STALE_TIME),
    )
  }

  pub fn create(&self) -> Mutation<Value, Employee> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Employee> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn mark_attendance(&self) -> Mutation<MarkAttendance, Value> {
    self.ctx.mutation(
      &invalidation::EMPLOYEE_MARK_ATTENDANCE,
      |client, mark: MarkAttendance| async move {
        client
          .post(
            &format!("{}{}/mark_attendance/", RESOURCE.path, mark.employee_id),
            &mark.data,
          )
          .await
      },
    )
  }
}

fn attendance_path(employee_id: &str) -> String {
  format!("{}{}/attendance/", RESOURCE.path, employee_id)
}
