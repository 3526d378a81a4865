//! Classrooms and the weekly schedule held in them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Crud, Ctx, Resource, Update};
use crate::api::Page;
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey};

pub static RESOURCE: Resource = Resource {
  name: "classes",
  detail: "class",
  path: "/classes/",
  create: &invalidation::CLASS_CREATE,
  update: &invalidation::CLASS_UPDATE,
  delete: &invalidation::CLASS_DELETE,
};

pub type Classes = Crud<ClassRoom>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRoom {
  pub id: u64,
  #[serde(default)]
  pub floor: i32,
  pub room_no: String,
  #[serde(default)]
  pub room_name: Option<String>,
  #[serde(default)]
  pub room_type: String,
  #[serde(default)]
  pub capacity: u32,
  #[serde(default)]
  pub is_available: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// One weekly slot. `day_of_week` is the lowercase day name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
  pub id: u64,
  #[serde(default)]
  pub class_assigned: Option<u64>,
  #[serde(default)]
  pub subject: Option<String>,
  #[serde(default)]
  pub subject_name: Option<String>,
  #[serde(default)]
  pub teacher: Option<u64>,
  #[serde(default)]
  pub teacher_name: Option<String>,
  #[serde(default)]
  pub level: Option<u64>,
  #[serde(default)]
  pub section: Option<u64>,
  pub day_of_week: String,
  pub start_time: String,
  pub end_time: String,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn default_true() -> bool {
  true
}

/// Schedule filter. Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleFilters {
  pub level: Option<u64>,
  pub section: Option<u64>,
  pub teacher: Option<u64>,
  pub class_assigned: Option<u64>,
  pub day_of_week: Option<String>,
  pub is_active: Option<bool>,
}

const SCHEDULES_PATH: &str = "/class-schedules/";

#[derive(Clone)]
pub struct Schedules {
  ctx: Ctx,
}

impl Schedules {
  pub fn new(ctx: Ctx) -> Self {
    Self { ctx }
  }

  pub fn list(&self, filters: &ScheduleFilters) -> Query<Page<ScheduleItem>> {
    let filters = Filters::from_serialize(filters);
    self.ctx.page(
      QueryKey::new("class-schedules").with_filters(&filters),
      filters.apply_to(SCHEDULES_PATH),
    )
  }

  pub fn create(&self) -> Mutation<Value, ScheduleItem> {
    self
      .ctx
      .mutation(&invalidation::CLASS_SCHEDULE_CREATE, |client, body: Value| async move {
        client.post(SCHEDULES_PATH, &body).await
      })
  }

  pub fn update(&self) -> Mutation<Update<Value>, ScheduleItem> {
    self.ctx.mutation(
      &invalidation::CLASS_SCHEDULE_UPDATE,
      |client, update: Update<Value>| async move {
        client
          .patch(&format!("{}{}/", SCHEDULES_PATH, update.id), &update.data)
          .await
      },
    )
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self
      .ctx
      .mutation(&invalidation::CLASS_SCHEDULE_DELETE, |client, id: u64| async move {
        client.delete(&format!("{}{}/", SCHEDULES_PATH, id)).await
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::test_support::harness;
  use serde_json::json;

  #[tokio::test]
  async fn test_schedule_filters_skip_unset_fields() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/class-schedules/?is_active=true&level=2&section=5",
      200,
      json!([{
        "id": 1,
        "day_of_week": "monday",
        "start_time": "08:00",
        "end_time": "08:45",
        "subject_name": "Maths",
      }]),
    );
    let schedules = Schedules::new(Ctx::new(client, cache));

    let query = schedules.list(&ScheduleFilters {
      level: Some(2),
      section: Some(5),
      is_active: Some(true),
      ..ScheduleFilters::default()
    });
    assert_eq!(
      query.key(),
      &QueryKey::from(["class-schedules", "is_active=true&level=2&section=5"])
    );
    let page = query.load().await.unwrap().unwrap();
    assert_eq!(page.items[0].subject_name.as_deref(), Some("Maths"));
    assert!(page.items[0].is_active);
  }

  #[tokio::test]
  async fn test_class_delete_invalidates_schedules() {
    let (mock, _tokens, client, cache) = harness();
    mock.on_empty(Method::DELETE, "/classes/3/", 204);
    let schedules_key = QueryKey::from(["class-schedules", "level=2"]);
    cache.set_data(&schedules_key, json!([]));

    let classes = Classes::new(Ctx::new(client, cache.clone()), &RESOURCE);
    classes.delete().mutate_async(3).await.unwrap();
    assert!(cache.snapshot(&schedules_key).unwrap().is_invalidated);
  }
}
