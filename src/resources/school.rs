//! Departments, levels and sections: the school's fixed structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Crud, Resource};
use crate::query::invalidation;

pub static DEPARTMENTS: Resource = Resource {
  name: "departments",
  detail: "department",
  path: "/departments/",
  create: &invalidation::DEPARTMENT_CREATE,
  update: &invalidation::DEPARTMENT_UPDATE,
  delete: &invalidation::DEPARTMENT_DELETE,
};

pub static LEVELS: Resource = Resource {
  name: "levels",
  detail: "level",
  path: "/levels/",
  create: &invalidation::LEVEL_CREATE,
  update: &invalidation::LEVEL_UPDATE,
  delete: &invalidation::LEVEL_DELETE,
};

pub static SECTIONS: Resource = Resource {
  name: "sections",
  detail: "section",
  path: "/sections/",
  create: &invalidation::SECTION_CREATE,
  update: &invalidation::SECTION_UPDATE,
  delete: &invalidation::SECTION_DELETE,
};

/// Departments are addressed by name.
pub type Departments = Crud<Department, String>;
/// Levels are addressed by `level_no`.
pub type Levels = Crud<Level>;
pub type Sections = Crud<Section>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
  #[serde(default)]
  pub id: Option<u64>,
  pub d_name: String,
  #[serde(default)]
  pub location: String,
  #[serde(default)]
  pub d_type: String,
  #[serde(default)]
  pub head_of_department_name: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
  pub level_no: u64,
  pub level_name: String,
  #[serde(default)]
  pub level_type: String,
  #[serde(default)]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
  pub id: u64,
  pub level: u64,
  #[serde(default)]
  pub sec_no: String,
  pub section_name: String,
  #[serde(default)]
  pub max_students: u32,
  #[serde(default)]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}
