//! Clubs, their members and meeting attendance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{decimal, status_mutation, Crud, Ctx, Nested, Resource, StatusChange, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "clubs",
  detail: "club",
  path: "/clubs/",
  create: &invalidation::CLUB_CREATE,
  update: &invalidation::CLUB_UPDATE,
  delete: &invalidation::CLUB_DELETE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClubCategory {
  Academic,
  Arts,
  Technology,
  Service,
  Sports,
  Other,
}

impl ClubCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      ClubCategory::Academic => "academic",
      ClubCategory::Arts => "arts",
      ClubCategory::Technology => "technology",
      ClubCategory::Service => "service",
      ClubCategory::Sports => "sports",
      ClubCategory::Other => "other",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeLevel {
  #[default]
  All,
  Elementary,
  Middle,
  High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub category: ClubCategory,
  #[serde(default)]
  pub advisor_id: Option<u64>,
  #[serde(default)]
  pub meeting_schedule: String,
  #[serde(default)]
  pub meeting_location: String,
  #[serde(default)]
  pub max_members: u32,
  #[serde(default)]
  pub current_members: u32,
  #[serde(default)]
  pub grade_level: GradeLevel,
  #[serde(default)]
  pub requires_approval: bool,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClubFilters {
  pub category: Option<ClubCategory>,
  pub grade_level: Option<GradeLevel>,
  pub advisor_id: Option<u64>,
  pub is_active: Option<bool>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
  #[default]
  Member,
  President,
  VicePresident,
  Treasurer,
  Secretary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
  #[default]
  Active,
  Inactive,
  Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubMember {
  pub id: u64,
  pub club_id: u64,
  pub student_id: u64,
  #[serde(default)]
  pub role: MemberRole,
  #[serde(default)]
  pub joined_date: Option<String>,
  #[serde(default)]
  pub status: MemberStatus,
  #[serde(default, deserialize_with = "decimal")]
  pub attendance_rate: f64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
  pub student_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<MemberRole>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<MemberRole>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<MemberStatus>,
}

/// One meeting's roll call, by student id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
  pub meeting_date: String,
  pub attendees: Vec<u64>,
  pub absent: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubStatistics {
  #[serde(default)]
  pub total_members: u32,
  #[serde(default)]
  pub active_members: u32,
  #[serde(default, deserialize_with = "decimal")]
  pub average_attendance: f64,
  #[serde(default)]
  pub meeting_count: u32,
  #[serde(default)]
  pub last_meeting: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
  pub meeting_date: String,
  pub attendees: u32,
  pub absent: u32,
  #[serde(default, deserialize_with = "decimal")]
  pub attendance_rate: f64,
}

#[derive(Clone)]
pub struct Clubs {
  ctx: Ctx,
  crud: Crud<Club>,
}

impl Clubs {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &ClubFilters) -> Query<Page<Club>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Club> {
    self.crud.get(&id)
  }

  pub fn by_category(&self, category: ClubCategory) -> Query<Page<Club>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("category").with(category.as_str()),
      format!("{}category/{}/", RESOURCE.path, category.as_str()),
    )
  }

  pub fn by_advisor(&self, advisor: u64) -> Query<Page<Club>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("advisor").with(advisor),
      format!("{}advisor/{}/", RESOURCE.path, advisor),
    )
  }

  pub fn members(&self, club: u64) -> Query<Page<ClubMember>> {
    self.ctx.page(
      RESOURCE.detail_key(club).with("members"),
      format!("{}members/", RESOURCE.detail_path(club)),
    )
  }

  pub fn statistics(&self, club: u64) -> Query<ClubStatistics> {
    self.ctx.query(
      RESOURCE.detail_key(club).with("statistics"),
      format!("{}statistics/", RESOURCE.detail_path(club)),
    )
  }

  /// Past meetings, optionally bounded by `YYYY-MM-DD` dates.
  pub fn attendance_history(
    &self,
    club: u64,
    start: Option<&str>,
    end: Option<&str>,
  ) -> Query<Page<MeetingRecord>> {
    let filters = Filters::new().with("start_date", start).with("end_date", end);
    self.ctx.page_with(
      RESOURCE
        .detail_key(club)
        .with("attendance")
        .with_filters(&filters),
      filters.apply_to(&format!("{}attendance/", RESOURCE.detail_path(club))),
      QueryOptions::default(),
    )
  }

  pub fn create(&self) -> Mutation<Value, Club> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Club> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn update_status(&self) -> Mutation<StatusChange, Club> {
    status_mutation(&self.ctx, &RESOURCE, &invalidation::CLUB_STATUS)
  }

  pub fn add_member(&self) -> Mutation<Nested<NewMember>, ClubMember> {
    self.ctx.mutation(
      &invalidation::CLUB_ADD_MEMBER,
      |client, member: Nested<NewMember>| async move {
        client
          .post(&format!("{}members/", RESOURCE.detail_path(member.owner)), &member.data)
          .await
      },
    )
  }

  /// Takes the club as owner and the membership id as item.
  pub fn update_member(&self) -> Mutation<Nested<MemberUpdate>, ClubMember> {
    self.ctx.mutation(
      &invalidation::CLUB_UPDATE_MEMBER,
      |client, change: Nested<MemberUpdate>| async move {
        let member = change.item_id()?;
        client
          .patch(&member_path(change.owner, member), &change.data)
          .await
      },
    )
  }

  pub fn remove_member(&self) -> Mutation<Nested, Value> {
    self
      .ctx
      .mutation(&invalidation::CLUB_REMOVE_MEMBER, |client, target: Nested| async move {
        let member = target.item_id()?;
        client.delete(&member_path(target.owner, member)).await
      })
  }

  pub fn record_attendance(&self) -> Mutation<Nested<Meeting>, Value> {
    self.ctx.mutation(
      &invalidation::CLUB_RECORD_ATTENDANCE,
      |client, meeting: Nested<Meeting>| async move {
        client
          .post(&format!("{}attendance/", RESOURCE.detail_path(meeting.owner)), &meeting.data)
          .await
      },
    )
  }
}

fn member_path(club: u64, member: u64) -> String {
  format!("{}members/{}/", RESOURCE.detail_path(club), member)
}
