use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{decimal, id_string, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "exams",
  detail: "exam",
  path: "/exams/",
  create: &invalidation::EXAM_CREATE,
  update: &invalidation::EXAM_UPDATE,
  delete: &invalidation::EXAM_DELETE,
};

const RESULTS_PATH: &str = "/exam-results/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
  pub exam_id: u64,
  pub exam_name: String,
  #[serde(default)]
  pub exam_type: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub subject_name: Option<String>,
  #[serde(default)]
  pub level: Option<u64>,
  #[serde(default, deserialize_with = "decimal")]
  pub total_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub passing_marks: f64,
  #[serde(default)]
  pub exam_date: String,
  #[serde(default)]
  pub start_time: Option<String>,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub academic_year: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
  pub id: u64,
  pub exam: u64,
  #[serde(deserialize_with = "id_string")]
  pub student: String,
  #[serde(default)]
  pub student_name: String,
  #[serde(deserialize_with = "decimal")]
  pub marks_obtained: f64,
  #[serde(default)]
  pub grade: String,
  #[serde(default)]
  pub is_passed: bool,
  #[serde(default)]
  pub remarks: Option<String>,
  #[serde(default)]
  pub graded_at: Option<String>,
  #[serde(default)]
  pub updated_at: Option<String>,
  #[serde(default)]
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExamResult {
  pub exam: u64,
  pub student: String,
  pub marks_obtained: f64,
  pub grade: String,
  pub is_passed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExamFilters {
  pub subject: Option<String>,
  pub level: Option<u64>,
  pub section: Option<u64>,
  pub exam_type: Option<String>,
  pub status: Option<String>,
  pub academic_year: Option<String>,
  pub student: Option<String>,
  pub search: Option<String>,
}

#[derive(Clone)]
pub struct Exams {
  ctx: Ctx,
  crud: Crud<Exam>,
}

impl Exams {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &ExamFilters) -> Query<Page<Exam>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Exam> {
    self.crud.get(&id)
  }

  /// Results for one exam; lives under the exam's key.
  pub fn results(&self, exam_id: u64) -> Query<Page<ExamResult>> {
    self.ctx.page(
      RESOURCE.detail_key(exam_id).with("results"),
      format!("/exams/{}/results/", exam_id),
    )
  }

  /// Every result for a student across exams. Disabled for an empty id.
  pub fn results_by_student(&self, student: &str) -> Query<Page<ExamResult>> {
    let filters = Filters::new().with("student", student);
    self.ctx.page_with(
      QueryKey::new("exam-results-by-student").with(student),
      filters.apply_to(RESULTS_PATH),
      QueryOptions::default().enabled(!student.is_empty()),
    )
  }

  /// Exams a student sits. Shares the list cache, so exam writes refresh it.
  pub fn exams_by_student(&self, student: &str) -> Query<Page<Exam>> {
    let filters = Filters::new().with("student", student);
    self.ctx.page_with(
      RESOURCE.list_key(&filters),
      filters.apply_to(RESOURCE.path),
      QueryOptions::default().enabled(!student.is_empty()),
    )
  }

  pub fn create(&self) -> Mutation<Value, Exam> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Exam> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn create_result(&self) -> Mutation<NewExamResult, ExamResult> {
    self.ctx.mutation(
      &invalidation::EXAM_RESULT_CREATE,
      |client, result: NewExamResult| async move {
        client
          .post(&format!("/exams/{}/add_result/", result.exam), &result)
          .await
      },
    )
  }

  pub fn update_result(&self) -> Mutation<Update<Value>, ExamResult> {
    self.ctx.mutation(
      &invalidation::EXAM_RESULT_UPDATE,
      |client, update: Update<Value>| async move {
        client
          .put(&format!("{}{}/", RESULTS_PATH, update.id), &update.data)
          .await
      },
    )
  }

  pub fn delete_result(&self) -> Mutation<u64, Value> {
    self
      .ctx
      .mutation(&invalidation::EXAM_RESULT_DELETE, |client, id: u64| async move {
        client.delete(&format!("{}{}/", RESULTS_PATH, id)).await
      })
  }
}
