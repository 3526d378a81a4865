use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "parents",
  detail: "parent",
  path: "/parents/",
  create: &invalidation::PARENT_CREATE,
  update: &invalidation::PARENT_UPDATE,
  delete: &invalidation::PARENT_DELETE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
  pub p_id: u64,
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub occupation: String,
  #[serde(default)]
  pub children_count: Option<u32>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentChild {
  pub s_id: String,
  pub name: String,
  #[serde(default)]
  pub student_number: String,
  #[serde(default)]
  pub level_name: Option<String>,
  #[serde(default)]
  pub section_name: Option<String>,
}

#[derive(Clone)]
pub struct Parents {
  ctx: Ctx,
  crud: Crud<Parent>,
}

impl Parents {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, search: Option<&str>) -> Query<Page<Parent>> {
    self.crud.list(&Filters::new().with("search", search))
  }

  pub fn get(&self, id: u64) -> Query<Parent> {
    self.crud.get(&id)
  }

  /// Students linked to a parent. Disabled without an id.
  pub fn children(&self, parent_id: Option<u64>) -> Query<Vec<ParentChild>> {
    let id = parent_id.map(|id| id.to_string()).unwrap_or_default();
    self.ctx.query_with(
      QueryKey::new("parent").with(&id).with("children"),
      format!("/parents/{}/children/", id),
      QueryOptions::default().enabled(parent_id.is_some()),
    )
  }

  pub fn create(&self) -> Mutation<Value, Parent> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Parent> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }
}
