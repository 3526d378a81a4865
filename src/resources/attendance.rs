//! Student attendance. Every key lives under `attendance`, so any write
//! refreshes records, summaries and histories together.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{id_string, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "attendance",
  detail: "attendance",
  path: "/attendance/",
  create: &invalidation::ATTENDANCE_CREATE,
  update: &invalidation::ATTENDANCE_UPDATE,
  delete: &invalidation::ATTENDANCE_DELETE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
  Excused,
  #[serde(other)]
  Unknown,
}

impl AttendanceStatus {
  /// Present and late both count as attended.
  pub fn attended(self) -> bool {
    matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id: u64,
  #[serde(deserialize_with = "id_string")]
  pub student: String,
  #[serde(default)]
  pub student_name: String,
  #[serde(default)]
  pub class_room: Option<u64>,
  #[serde(default)]
  pub subject: Option<Value>,
  pub date: String,
  pub status: AttendanceStatus,
  #[serde(default)]
  pub check_in_time: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendance {
  pub student: String,
  pub class_room: u64,
  pub subject: Value,
  pub date: String,
  pub status: AttendanceStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub check_in_time: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AttendanceFilters {
  pub student: Option<String>,
  pub class_room: Option<u64>,
  pub subject: Option<String>,
  pub date: Option<String>,
  pub date_from: Option<String>,
  pub date_to: Option<String>,
  pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
  #[serde(default)]
  pub total_students: u64,
  #[serde(default)]
  pub present: u64,
  #[serde(default)]
  pub absent: u64,
  #[serde(default)]
  pub late: u64,
  #[serde(default)]
  pub excused: u64,
  #[serde(default)]
  pub attendance_rate: f64,
}

#[derive(Clone)]
pub struct Attendance {
  ctx: Ctx,
  crud: Crud<AttendanceRecord>,
}

impl Attendance {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn records(&self, filters: &AttendanceFilters) -> Query<Page<AttendanceRecord>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<AttendanceRecord> {
    self.ctx.query(
      QueryKey::new("attendance").with("record").with(id),
      RESOURCE.detail_path(id),
    )
  }

  pub fn summary(&self, filters: &AttendanceFilters) -> Query<AttendanceSummary> {
    let filters = Filters::from_serialize(filters);
    self.ctx.query(
      QueryKey::new("attendance").with("summary").with_filters(&filters),
      filters.apply_to("/attendance/summary/"),
    )
  }

  /// One student's records. Disabled for an empty id.
  pub fn student_history(
    &self,
    student: &str,
    filters: &AttendanceFilters,
  ) -> Query<Page<AttendanceRecord>> {
    let filters = Filters::from_serialize(filters);
    self.ctx.page_with(
      QueryKey::new("attendance")
        .with("student")
        .with(student)
        .with_filters(&filters),
      filters.apply_to(&format!("/attendance/student/{}/", student)),
      QueryOptions::default().enabled(!student.is_empty()),
    )
  }

  /// A class roll call for one day (`YYYY-MM-DD`).
  pub fn class_on(&self, class_id: u64, date: &str) -> Query<Page<AttendanceRecord>> {
    self.ctx.page_with(
      QueryKey::new("attendance")
        .with("class")
        .with(class_id)
        .with(date),
      format!("/attendance/class/{}/date/{}/", class_id, date),
      QueryOptions::default().enabled(!date.is_empty()),
    )
  }

  pub fn create(&self) -> Mutation<NewAttendance, AttendanceRecord> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, AttendanceRecord> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn bulk_create(&self) -> Mutation<Vec<NewAttendance>, Value> {
    self.ctx.mutation(
      &invalidation::ATTENDANCE_BULK_CREATE,
      |client, records: Vec<NewAttendance>| async move {
        client
          .post("/attendance/bulk_create/", &json!({ "records": records }))
          .await
      },
    )
  }

  /// Each record must carry its `id`.
  pub fn bulk_update(&self) -> Mutation<Vec<Value>, Value> {
    self.ctx.mutation(
      &invalidation::ATTENDANCE_BULK_UPDATE,
      |client, records: Vec<Value>| async move {
        client
          .post("/attendance/bulk_update/", &json!({ "records": records }))
          .await
      },
    )
  }
}
