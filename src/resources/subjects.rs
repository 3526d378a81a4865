//! Subjects and which levels/sections teach them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::{to_json, Crud, Ctx, Resource};
use crate::api::Page;
use crate::query::{fetcher, invalidation, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "subjects",
  detail: "subject",
  path: "/subjects/",
  create: &invalidation::SUBJECT_CREATE,
  update: &invalidation::SUBJECT_UPDATE,
  delete: &invalidation::SUBJECT_DELETE,
};

/// Subjects are addressed by `s_code`.
pub type Subjects = Crud<Subject, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  pub s_code: String,
  pub s_name: String,
  #[serde(default)]
  pub subject_type: String,
  #[serde(default)]
  pub department: String,
  #[serde(default)]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSubject {
  pub id: u64,
  pub level: u64,
  pub subject: String,
  #[serde(default)]
  pub subject_name: String,
  #[serde(default)]
  pub is_compulsory: bool,
  #[serde(default)]
  pub weekly_hours: u32,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSubject {
  pub id: u64,
  pub section: u64,
  pub subject: String,
  #[serde(default)]
  pub subject_name: String,
  #[serde(default)]
  pub teacher: Option<u64>,
  #[serde(default)]
  pub teacher_name: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLevelSubject {
  pub level: u64,
  pub subject: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_compulsory: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub weekly_hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSectionSubject {
  pub section: u64,
  pub subject: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub teacher: Option<u64>,
}

const LEVEL_SUBJECTS_PATH: &str = "/level-subjects/";
const SECTION_SUBJECTS_PATH: &str = "/section-subjects/";

/// Level and section subject assignments.
#[derive(Clone)]
pub struct Curriculum {
  ctx: Ctx,
}

impl Curriculum {
  pub fn new(ctx: Ctx) -> Self {
    Self { ctx }
  }

  /// Disabled until a level is chosen.
  pub fn level_subjects(&self, level: Option<u64>) -> Query<Page<LevelSubject>> {
    let key = QueryKey::new("level-subjects").with(opt(level));
    let path = format!("{}?level={}", LEVEL_SUBJECTS_PATH, opt(level));
    self
      .ctx
      .page_with(key, path, QueryOptions::default().enabled(level.is_some()))
  }

  /// Disabled until a section is chosen.
  pub fn section_subjects(&self, section: Option<u64>) -> Query<Page<SectionSubject>> {
    let key = QueryKey::new("section-subjects").with(opt(section));
    let path = format!("{}?section={}", SECTION_SUBJECTS_PATH, opt(section));
    self
      .ctx
      .page_with(key, path, QueryOptions::default().enabled(section.is_some()))
  }

  /// Section subjects restricted to what the level offers.
  pub fn by_level_and_section(
    &self,
    level: Option<u64>,
    section: Option<u64>,
  ) -> Query<Vec<SectionSubject>> {
    let key = QueryKey::new("subjects-by-level-section")
      .with(opt(level))
      .with(opt(section));
    let options = QueryOptions::default().enabled(level.is_some() && section.is_some());
    let client = self.ctx.client().clone();

    Query::new(
      self.ctx.cache().clone(),
      key,
      fetcher(move || {
        let client = client.clone();
        async move {
          let (level, section) = match (level, section) {
            (Some(level), Some(section)) => (level, section),
            _ => return Ok(Value::Array(Vec::new())),
          };
          let level_path = format!("{}?level={}", LEVEL_SUBJECTS_PATH, level);
          let section_path = format!("{}?section={}", SECTION_SUBJECTS_PATH, section);
          let (offered, assigned) = futures::try_join!(
            client.get_page::<LevelSubject>(&level_path),
            client.get_page::<SectionSubject>(&section_path),
          )?;
          to_json(&restrict_to_level(&offered.items, assigned.items))
        }
      }),
      options,
    )
  }

  pub fn create_level_subject(&self) -> Mutation<NewLevelSubject, LevelSubject> {
    self.ctx.mutation(
      &invalidation::LEVEL_SUBJECT_CREATE,
      |client, body: NewLevelSubject| async move { client.post(LEVEL_SUBJECTS_PATH, &body).await },
    )
  }

  pub fn delete_level_subject(&self) -> Mutation<u64, Value> {
    self
      .ctx
      .mutation(&invalidation::LEVEL_SUBJECT_DELETE, |client, id: u64| async move {
        client.delete(&format!("{}{}/", LEVEL_SUBJECTS_PATH, id)).await
      })
  }

  pub fn create_section_subject(&self) -> Mutation<NewSectionSubject, SectionSubject> {
    self.ctx.mutation(
      &invalidation::SECTION_SUBJECT_CREATE,
      |client, body: NewSectionSubject| async move { client.post(SECTION_SUBJECTS_PATH, &body).await },
    )
  }

  pub fn delete_section_subject(&self) -> Mutation<u64, Value> {
    self
      .ctx
      .mutation(&invalidation::SECTION_SUBJECT_DELETE, |client, id: u64| async move {
        client.delete(&format!("{}{}/", SECTION_SUBJECTS_PATH, id)).await
      })
  }
}

fn opt(id: Option<u64>) -> String {
  id.map(|id| id.to_string()).unwrap_or_default()
}

fn restrict_to_level(offered: &[LevelSubject], assigned: Vec<SectionSubject>) -> Vec<SectionSubject> {
  let codes: HashSet<&str> = offered.iter().map(|ls| ls.subject.as_str()).collect();
  assigned
    .into_iter()
    .filter(|ss| codes.contains(ss.subject.as_str()))
    .collect()
}
