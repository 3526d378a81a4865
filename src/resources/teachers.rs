use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{id_string, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "teachers",
  detail: "teacher",
  path: "/teachers/",
  create: &invalidation::TEACHER_CREATE,
  update: &invalidation::TEACHER_UPDATE,
  delete: &invalidation::TEACHER_DELETE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
  #[serde(deserialize_with = "id_string")]
  pub teacher_id: String,
  #[serde(default)]
  pub teacher_name: String,
  #[serde(default)]
  pub teacher_email: String,
  #[serde(default)]
  pub department_name: Option<String>,
  #[serde(default)]
  pub specialization: String,
  #[serde(default)]
  pub years_of_experience: u32,
  #[serde(default)]
  pub is_class_teacher: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
  Excellent,
  Good,
  Satisfactory,
  NeedsImprovement,
  Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerformance {
  pub teacher: String,
  pub evaluation_date: String,
  pub academic_performance: Rating,
  pub classroom_management: Rating,
  pub student_interaction: Rating,
  pub professional_development: Rating,
  pub overall_rating: Rating,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comments: Option<String>,
}

/// Body for `add_subject` / `add_class`, addressed to one teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
  pub teacher_id: String,
  pub data: Value,
}

#[derive(Clone)]
pub struct Teachers {
  ctx: Ctx,
  crud: Crud<Teacher, String>,
}

impl Teachers {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &Filters) -> Query<Page<Teacher>> {
    self.crud.list(filters)
  }

  pub fn get(&self, id: &str) -> Query<Teacher> {
    self.crud.get(&id.to_string())
  }

  pub fn subjects(&self, id: &str) -> Query<Page<Value>> {
    self.nested(id, "subjects")
  }

  pub fn classes(&self, id: &str) -> Query<Page<Value>> {
    self.nested(id, "classes")
  }

  pub fn performance(&self, id: &str) -> Query<Page<Value>> {
    self.nested(id, "performance")
  }

  /// `/teachers/{id}/{what}/`, keyed under the teacher so their writes
  /// refresh it.
  fn nested(&self, id: &str, what: &str) -> Query<Page<Value>> {
    self.ctx.page_with(
      RESOURCE.detail_key(id).with(what),
      format!("{}{}/{}/", RESOURCE.path, id, what),
      QueryOptions::default().enabled(!id.is_empty()),
    )
  }

  pub fn statistics(&self) -> Query<Value> {
    self.collection("statistics")
  }

  pub fn class_teachers(&self) -> Query<Value> {
    self.collection("class_teachers")
  }

  pub fn by_specialization(&self) -> Query<Value> {
    self.collection("by_specialization")
  }

  fn collection(&self, action: &str) -> Query<Value> {
    self.ctx.query(
      QueryKey::new(RESOURCE.name).with(action),
      format!("{}{}/", RESOURCE.path, action),
    )
  }

  pub fn create(&self) -> Mutation<Value, Teacher> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value, String>, Teacher> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<String, Value> {
    self.crud.delete()
  }

  pub fn add_subject(&self) -> Mutation<Assignment, Value> {
    self.assign(&invalidation::TEACHER_ADD_SUBJECT, "add_subject")
  }

  pub fn add_class(&self) -> Mutation<Assignment, Value> {
    self.assign(&invalidation::TEACHER_ADD_CLASS, "add_class")
  }

  fn assign(
    &self,
    spec: &'static crate::query::MutationSpec,
    action: &'static str,
  ) -> Mutation<Assignment, Value> {
    self.ctx.mutation(spec, move |client, assignment: Assignment| async move {
      client
        .post(
          &format!("{}{}/{}/", RESOURCE.path, assignment.teacher_id, action),
          &assignment.data,
        )
        .await
    })
  }

  pub fn create_performance(&self) -> Mutation<NewPerformance, Value> {
    self.ctx.mutation(
      &invalidation::TEACHER_ADD_PERFORMANCE,
      |client, record: NewPerformance| async move {
        client.post("/teacher-performance/", &record).await
      },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::harness;
  use serde_json::json;

  #[tokio::test]
  async fn test_numeric_teacher_id_and_nested_lists() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/teachers/",
      200,
      json!([{"teacher_id": 4, "teacher_name": "Mr. Bello", "specialization": "Physics"}]),
    );
    mock.on(
      Method::GET,
      "/teachers/4/subjects/",
      200,
      json!([{"id": 1, "subject_code": "PHYS"}]),
    );
    let teachers = Teachers::new(Ctx::new(client, cache));

    let page = teachers.list(&Filters::new()).load().await.unwrap().unwrap();
    let id = &page.items[0].teacher_id;
    assert_eq!(id, "4");

    let subjects = teachers.subjects(id).load().await.unwrap().unwrap();
    assert_eq!(subjects.items[0]["subject_code"], json!("PHYS"));
    assert_eq!(
      teachers.subjects(id).key(),
      &QueryKey::from(["teacher", "4", "subjects"])
    );
  }

  #[tokio::test]
  async fn test_add_class_refreshes_that_teacher() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/teachers/4/add_class/", 201, json!({"id": 9}));
    let classes = QueryKey::from(["teacher", "4", "classes"]);
    let stats = QueryKey::from(["teachers", "statistics"]);
    cache.set_data(&classes, json!([]));
    cache.set_data(&stats, json!({}));
    let teachers = Teachers::new(Ctx::new(client, cache.clone()));

    teachers
      .add_class()
      .mutate_async(Assignment {
        teacher_id: "4".into(),
        data: json!({"class_room": 2, "subject": "PHYS", "start_date": "2024-09-01"}),
      })
      .await
      .unwrap();
    assert_eq!(
      mock.last_body(Method::POST, "/teachers/4/add_class/").unwrap()["class_room"],
      json!(2)
    );
    assert!(cache.snapshot(&classes).unwrap().is_invalidated);
    assert!(cache.snapshot(&stats).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_performance_record_serializes_ratings() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/teacher-performance/", 201, json!({"id": 1}));
    let teachers = Teachers::new(Ctx::new(client, cache));

    teachers
      .create_performance()
      .mutate_async(NewPerformance {
        teacher: "4".into(),
        evaluation_date: "2024-10-01".into(),
        academic_performance: Rating::Excellent,
        classroom_management: Rating::Good,
        student_interaction: Rating::Good,
        professional_development: Rating::NeedsImprovement,
        overall_rating: Rating::Good,
        comments: None,
      })
      .await
      .unwrap();
    let body = mock.last_body(Method::POST, "/teacher-performance/").unwrap();
    assert_eq!(body["professional_development"], json!("needs_improvement"));
    assert!(body.get("comments").is_none());
  }
}
