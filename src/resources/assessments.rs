use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{decimal, id_string, optional_decimal, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "assessments",
  detail: "assessment",
  path: "/assessments/",
  create: &invalidation::ASSESSMENT_CREATE,
  update: &invalidation::ASSESSMENT_UPDATE,
  delete: &invalidation::ASSESSMENT_DELETE,
};

const LIST_STALE_TIME: Duration = Duration::from_secs(2 * 60);
const REPORT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
  Quiz,
  Assignment,
  Exam,
  Project,
  Homework,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub subject: Value,
  #[serde(default)]
  pub subject_name: String,
  #[serde(default)]
  pub class_room: Option<u64>,
  #[serde(default)]
  pub class_name: String,
  #[serde(default)]
  pub teacher_name: String,
  pub assessment_type: AssessmentType,
  #[serde(default, deserialize_with = "decimal")]
  pub total_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub passing_marks: f64,
  pub due_date: String,
  #[serde(default)]
  pub is_published: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
  NotSubmitted,
  Submitted,
  Graded,
  Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub id: u64,
  pub assessment: u64,
  #[serde(deserialize_with = "id_string")]
  pub student: String,
  #[serde(default)]
  pub student_name: String,
  #[serde(default)]
  pub submitted_at: Option<String>,
  #[serde(default, deserialize_with = "optional_decimal")]
  pub marks_obtained: Option<f64>,
  #[serde(default)]
  pub grade: Option<String>,
  #[serde(default)]
  pub feedback: Option<String>,
  pub status: SubmissionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
  pub marks_obtained: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeSubmission {
  pub submission_id: u64,
  pub grade: Grade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkGrade {
  pub id: u64,
  pub marks_obtained: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssessmentFilters {
  pub subject: Option<String>,
  pub class_room: Option<u64>,
  pub teacher: Option<u64>,
  pub assessment_type: Option<AssessmentType>,
  pub is_published: Option<bool>,
  pub date_start: Option<String>,
  pub date_end: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentStatistics {
  #[serde(default)]
  pub total_assessments: u64,
  #[serde(default)]
  pub published_assessments: u64,
  #[serde(default)]
  pub total_submissions: u64,
  #[serde(default)]
  pub graded_submissions: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub average_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub pass_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAnalytics {
  #[serde(default)]
  pub total_students: u64,
  #[serde(default)]
  pub submitted_count: u64,
  #[serde(default)]
  pub graded_count: u64,
  #[serde(default, deserialize_with = "decimal")]
  pub average_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub highest_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub lowest_marks: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub pass_rate: f64,
  #[serde(default)]
  pub grade_distribution: BTreeMap<String, u64>,
}

#[derive(Clone)]
pub struct Assessments {
  ctx: Ctx,
  crud: Crud<Assessment>,
}

impl Assessments {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &AssessmentFilters) -> Query<Page<Assessment>> {
    let filters = Filters::from_serialize(filters);
    self.ctx.page_with(
      RESOURCE.list_key(&filters),
      filters.apply_to(RESOURCE.path),
      QueryOptions::default().stale_time(LIST_STALE_TIME),
    )
  }

  pub fn get(&self, id: u64) -> Query<Assessment> {
    self.crud.get(&id)
  }

  pub fn submissions(&self, id: u64) -> Query<Page<Submission>> {
    self.ctx.page_with(
      RESOURCE.detail_key(id).with("submissions"),
      format!("{}{}/submissions/", RESOURCE.path, id),
      QueryOptions::default().stale_time(LIST_STALE_TIME),
    )
  }

  pub fn analytics(&self, id: u64) -> Query<AssessmentAnalytics> {
    self.ctx.query_with(
      RESOURCE.detail_key(id).with("analytics"),
      format!("{}{}/analytics/", RESOURCE.path, id),
      QueryOptions::default().stale_time(REPORT_STALE_TIME),
    )
  }

  pub fn statistics(&self, filters: &AssessmentFilters) -> Query<AssessmentStatistics> {
    let filters = Filters::from_serialize(filters);
    self.ctx.query_with(
      QueryKey::new(RESOURCE.name).with("statistics").with_filters(&filters),
      filters.apply_to(&format!("{}statistics/", RESOURCE.path)),
      QueryOptions::default().stale_time(REPORT_STALE_TIME),
    )
  }

  /// A student's graded and pending submissions. Disabled for an empty id.
  pub fn student_history(
    &self,
    student: &str,
    filters: &AssessmentFilters,
  ) -> Query<Page<Submission>> {
    let filters = Filters::from_serialize(filters);
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name)
        .with("student")
        .with(student)
        .with_filters(&filters),
      filters.apply_to(&format!("{}student/{}/", RESOURCE.path, student)),
      QueryOptions::default()
        .enabled(!student.trim().is_empty())
        .stale_time(REPORT_STALE_TIME),
    )
  }

  pub fn upcoming(&self, teacher: Option<u64>, days: Option<u32>) -> Query<Page<Assessment>> {
    let filters = Filters::new().with("teacher", teacher).with("days", days);
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name).with("upcoming").with_filters(&filters),
      filters.apply_to(&format!("{}upcoming/", RESOURCE.path)),
      QueryOptions::default().stale_time(REPORT_STALE_TIME),
    )
  }

  pub fn create(&self) -> Mutation<Value, Assessment> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Assessment> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn grade_submission(&self) -> Mutation<GradeSubmission, Submission> {
    self.ctx.mutation(
      &invalidation::ASSESSMENT_GRADE_SUBMISSION,
      |client, graded: GradeSubmission| async move {
        client
          .post(
            &format!("{}submissions/{}/grade/", RESOURCE.path, graded.submission_id),
            &graded.grade,
          )
          .await
      },
    )
  }

  pub fn bulk_grade(&self) -> Mutation<Vec<BulkGrade>, Vec<Submission>> {
    self.ctx.mutation(
      &invalidation::ASSESSMENT_BULK_GRADE,
      |client, submissions: Vec<BulkGrade>| async move {
        client
          .post(
            &format!("{}bulk_grade/", RESOURCE.path),
            &json!({ "submissions": submissions }),
          )
          .await
      },
    )
  }
}
