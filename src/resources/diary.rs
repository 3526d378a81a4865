//! Homework diary entries.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{id_string, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "student-diary",
  detail: "student-diary-entry",
  path: "/student-diary/",
  create: &invalidation::DIARY_CREATE,
  update: &invalidation::DIARY_UPDATE,
  delete: &invalidation::DIARY_DELETE,
};

const LIST_STALE_TIME: Duration = Duration::from_secs(2 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
  pub id: u64,
  #[serde(deserialize_with = "id_string")]
  pub student: String,
  #[serde(default)]
  pub student_name: String,
  #[serde(default)]
  pub subject: String,
  #[serde(default)]
  pub subject_name: String,
  pub task: String,
  pub due_date: String,
  #[serde(default)]
  pub completion_date: Option<String>,
  #[serde(default)]
  pub feedback: Option<String>,
  #[serde(default)]
  pub grade: Option<String>,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiaryFilters {
  pub student: Option<String>,
  pub subject: Option<String>,
  pub is_completed: Option<bool>,
  /// Ask for overdue entries only; the other fields are then ignored.
  #[serde(skip)]
  pub overdue: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
  pub id: u64,
  /// Defaults to today
  pub completion_date: Option<String>,
  pub grade: Option<String>,
}

#[derive(Clone)]
pub struct Diary {
  ctx: Ctx,
  crud: Crud<DiaryEntry>,
}

impl Diary {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn entries(&self, filters: &DiaryFilters) -> Query<Page<DiaryEntry>> {
    let options = QueryOptions::default().stale_time(LIST_STALE_TIME);
    if filters.overdue {
      return self.ctx.page_with(
        QueryKey::new(RESOURCE.name).with("overdue"),
        format!("{}overdue/", RESOURCE.path),
        options,
      );
    }
    let filters = Filters::from_serialize(filters);
    self.ctx.page_with(
      RESOURCE.list_key(&filters),
      filters.apply_to(RESOURCE.path),
      options,
    )
  }

  pub fn get(&self, id: u64) -> Query<DiaryEntry> {
    self.crud.get(&id)
  }

  pub fn create(&self) -> Mutation<Value, DiaryEntry> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, DiaryEntry> {
    self.crud.update(Method::PATCH)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn mark_completed(&self) -> Mutation<Completion, DiaryEntry> {
    self.ctx.mutation(
      &invalidation::DIARY_MARK_COMPLETED,
      |client, completion: Completion| async move {
        let completion_date = completion
          .completion_date
          .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
        let body = json!({
          "is_completed": true,
          "completion_date": completion_date,
          "grade": completion.grade,
        });
        client
          .patch(&RESOURCE.detail_path(completion.id), &body)
          .await
      },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::harness;

  fn entry(id: u64, completed: bool) -> Value {
    json!({
      "id": id,
      "student": "s-1",
      "subject": "MATH",
      "task": "Exercise 4.2",
      "due_date": "2024-09-10",
      "is_completed": completed,
    })
  }

  #[tokio::test]
  async fn test_overdue_uses_its_own_endpoint() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::GET, "/student-diary/overdue/", 200, json!([entry(1, false)]));
    let diary = Diary::new(Ctx::new(client, cache));

    let query = diary.entries(&DiaryFilters {
      student: Some("s-1".into()),
      overdue: true,
      ..DiaryFilters::default()
    });
    assert_eq!(query.key(), &QueryKey::from(["student-diary", "overdue"]));
    assert_eq!(query.load().await.unwrap().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_completed_filter_serializes_bool() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/student-diary/?is_completed=false&student=s-1",
      200,
      json!({"count": 1, "results": [entry(2, false)]}),
    );
    let diary = Diary::new(Ctx::new(client, cache));

    let page = diary
      .entries(&DiaryFilters {
        student: Some("s-1".into()),
        is_completed: Some(false),
        ..DiaryFilters::default()
      })
      .load()
      .await
      .unwrap()
      .unwrap();
    assert!(!page.items[0].is_completed);
  }

  #[tokio::test]
  async fn test_mark_completed_defaults_to_today() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::PATCH, "/student-diary/2/", 200, entry(2, true));
    let entry_key = QueryKey::from(["student-diary-entry", "2"]);
    cache.set_data(&entry_key, entry(2, false));
    let diary = Diary::new(Ctx::new(client, cache.clone()));

    let done = diary
      .mark_completed()
      .mutate_async(Completion {
        id: 2,
        grade: Some("A".into()),
        ..Completion::default()
      })
      .await
      .unwrap();
    assert!(done.is_completed);

    let body = mock.last_body(Method::PATCH, "/student-diary/2/").unwrap();
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(body["completion_date"], json!(today));
    assert_eq!(body["grade"], json!("A"));
    assert!(cache.snapshot(&entry_key).unwrap().is_invalidated);
  }
}
