//! Student participation across clubs, teams and events, with per-session
//! attendance.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::{decimal, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "activity-participation",
  detail: "activity-participant",
  path: "/activity-participation/",
  create: &invalidation::PARTICIPATION_CREATE,
  update: &invalidation::PARTICIPATION_UPDATE,
  delete: &invalidation::PARTICIPATION_DELETE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
  Club,
  Sports,
  Event,
}

impl ActivityType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ActivityType::Club => "club",
      ActivityType::Sports => "sports",
      ActivityType::Event => "event",
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationRole {
  #[default]
  Member,
  President,
  VicePresident,
  Treasurer,
  Secretary,
  Captain,
  ViceCaptain,
  Participant,
  Volunteer,
}

impl ParticipationRole {
  pub fn is_leadership(&self) -> bool {
    !matches!(
      self,
      ParticipationRole::Member | ParticipationRole::Participant | ParticipationRole::Volunteer
    )
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
  #[default]
  Active,
  Inactive,
  Pending,
  Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
  pub id: u64,
  pub student_id: u64,
  pub activity_id: u64,
  pub activity_type: ActivityType,
  #[serde(default)]
  pub role: ParticipationRole,
  #[serde(default)]
  pub joined_date: Option<String>,
  #[serde(default)]
  pub status: ParticipationStatus,
  #[serde(default, deserialize_with = "decimal")]
  pub attendance_rate: f64,
  #[serde(default)]
  pub last_activity: Option<String>,
  #[serde(default)]
  pub notes: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParticipationFilters {
  pub student_id: Option<u64>,
  pub activity_id: Option<u64>,
  pub activity_type: Option<ActivityType>,
  pub role: Option<ParticipationRole>,
  pub status: Option<ParticipationStatus>,
  pub class_name: Option<String>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParticipation {
  pub student_id: u64,
  pub activity_id: u64,
  pub activity_type: ActivityType,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<ParticipationRole>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipationUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<ParticipationRole>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ParticipationStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub id: u64,
  pub status: ParticipationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMark {
  Present,
  Absent,
  Late,
  Excused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAttendance {
  pub id: u64,
  pub participation_id: u64,
  #[serde(default)]
  pub activity_id: Option<u64>,
  #[serde(default)]
  pub activity_type: Option<ActivityType>,
  pub attendance_date: String,
  pub status: AttendanceMark,
  #[serde(default)]
  pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivityAttendance {
  pub participation_id: u64,
  pub attendance_date: String,
  pub status: AttendanceMark,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendancePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub attendance_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<AttendanceMark>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatisticsFilters {
  pub student_id: Option<u64>,
  pub activity_id: Option<u64>,
  pub activity_type: Option<ActivityType>,
  pub class_name: Option<String>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopActivity {
  pub activity_name: String,
  pub participation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationStatistics {
  #[serde(default)]
  pub total_participations: u32,
  #[serde(default)]
  pub active_participations: u32,
  #[serde(default)]
  pub by_activity_type: BTreeMap<String, u32>,
  #[serde(default)]
  pub by_role: BTreeMap<String, u32>,
  #[serde(default, deserialize_with = "decimal")]
  pub average_attendance: f64,
  #[serde(default)]
  pub top_activities: Vec<TopActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentActivitySummary {
  #[serde(default)]
  pub total_activities: u32,
  #[serde(default)]
  pub active_activities: u32,
  #[serde(default)]
  pub by_type: BTreeMap<String, u32>,
  #[serde(default, deserialize_with = "decimal")]
  pub average_attendance: f64,
  #[serde(default)]
  pub leadership_roles: u32,
  #[serde(default)]
  pub recent_activities: Vec<Participation>,
}

#[derive(Clone)]
pub struct Activities {
  ctx: Ctx,
  crud: Crud<Participation>,
}

impl Activities {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &ParticipationFilters) -> Query<Page<Participation>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Participation> {
    self.crud.get(&id)
  }

  pub fn by_student(&self, student: u64) -> Query<Page<Participation>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("student").with(student),
      format!("{}student/{}/", RESOURCE.path, student),
    )
  }

  pub fn by_activity(&self, activity: u64, kind: ActivityType) -> Query<Page<Participation>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name)
        .with("activity")
        .with(activity)
        .with(kind.as_str()),
      format!("{}activity/{}/{}/", RESOURCE.path, activity, kind.as_str()),
    )
  }

  pub fn by_class(&self, class_name: &str) -> Query<Page<Participation>> {
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name).with("class").with(class_name),
      format!("{}class/{}/", RESOURCE.path, class_name),
      QueryOptions::default().enabled(!class_name.trim().is_empty()),
    )
  }

  pub fn by_type(&self, kind: ActivityType) -> Query<Page<Participation>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("type").with(kind.as_str()),
      format!("{}type/{}/", RESOURCE.path, kind.as_str()),
    )
  }

  /// Sessions for one participation, optionally bounded by date.
  pub fn attendance(
    &self,
    participation: u64,
    start: Option<&str>,
    end: Option<&str>,
  ) -> Query<Page<ActivityAttendance>> {
    let filters = Filters::new().with("start_date", start).with("end_date", end);
    self.ctx.page(
      RESOURCE
        .detail_key(participation)
        .with("attendance")
        .with_filters(&filters),
      filters.apply_to(&format!("{}attendance/", RESOURCE.detail_path(participation))),
    )
  }

  pub fn statistics(&self, filters: &StatisticsFilters) -> Query<ParticipationStatistics> {
    let filters = Filters::from_serialize(filters);
    self.ctx.query(
      QueryKey::new(RESOURCE.name)
        .with("statistics")
        .with_filters(&filters),
      filters.apply_to(&format!("{}statistics/", RESOURCE.path)),
    )
  }

  pub fn student_summary(&self, student: u64) -> Query<StudentActivitySummary> {
    self.ctx.query(
      QueryKey::new(RESOURCE.name)
        .with("student")
        .with(student)
        .with("summary"),
      format!("{}student/{}/summary/", RESOURCE.path, student),
    )
  }

  pub fn create(&self) -> Mutation<NewParticipation, Participation> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<ParticipationUpdate>, Participation> {
    self.crud.update(Method::PATCH)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn update_status(&self) -> Mutation<StatusUpdate, Participation> {
    self.ctx.mutation(
      &invalidation::PARTICIPATION_STATUS,
      |client, change: StatusUpdate| async move {
        client
          .patch(
            &format!("{}status/", RESOURCE.detail_path(change.id)),
            &json!({ "status": change.status }),
          )
          .await
      },
    )
  }

  pub fn record_attendance(&self) -> Mutation<NewActivityAttendance, ActivityAttendance> {
    self.ctx.mutation(
      &invalidation::ACTIVITY_ATTENDANCE_RECORD,
      |client, record: NewActivityAttendance| async move {
        client
          .post(&format!("{}attendance/", RESOURCE.path), &record)
          .await
      },
    )
  }

  /// Edits one attendance record; the refreshed participation comes from the
  /// server's reply.
  pub fn update_attendance(&self) -> Mutation<Update<AttendancePatch>, ActivityAttendance> {
    self.ctx.mutation(
      &invalidation::ACTIVITY_ATTENDANCE_UPDATE,
      |client, change: Update<AttendancePatch>| async move {
        client
          .patch(&attendance_path(change.id), &change.data)
          .await
      },
    )
  }

  pub fn delete_attendance(&self) -> Mutation<u64, Value> {
    self.ctx.mutation(
      &invalidation::ACTIVITY_ATTENDANCE_DELETE,
      |client, record: u64| async move { client.delete(&attendance_path(record)).await },
    )
  }
}

fn attendance_path(record: u64) -> String {
  format!("{}attendance/{}/", RESOURCE.path, record)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::harness;

  fn participation(id: u64, role: &str) -> Value {
    json!({
      "id": id,
      "student_id": 31,
      "activity_id": 3,
      "activity_type": "club",
      "role": role,
      "status": "active",
      "attendance_rate": "92.00",
    })
  }

  fn session(id: u64, participation: u64) -> Value {
    json!({
      "id": id,
      "participation_id": participation,
      "attendance_date": "2024-10-02",
      "status": "late",
    })
  }

  #[tokio::test]
  async fn test_by_activity_path_and_roles() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(
      Method::GET,
      "/activity-participation/activity/3/club/",
      200,
      json!([participation(1, "vice_president"), participation(2, "member")]),
    );
    let activities = Activities::new(Ctx::new(client, cache));

    let query = activities.by_activity(3, ActivityType::Club);
    assert_eq!(
      query.key(),
      &QueryKey::from(["activity-participation", "activity", "3", "club"])
    );
    let page = query.load().await.unwrap().unwrap();
    assert!(page.items[0].role.is_leadership());
    assert!(!page.items[1].role.is_leadership());
    assert_eq!(page.items[0].attendance_rate, 92.0);
  }

  #[tokio::test]
  async fn test_recording_attendance_refreshes_participant_and_summaries() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/activity-participation/attendance/", 201, session(5, 1));
    let sessions = QueryKey::from(["activity-participant", "1", "attendance"]);
    let other = QueryKey::from(["activity-participant", "2", "attendance"]);
    let summary = QueryKey::from(["activity-participation", "student", "31", "summary"]);
    for key in [&sessions, &other, &summary] {
      cache.set_data(key, json!([]));
    }
    let activities = Activities::new(Ctx::new(client, cache.clone()));

    let recorded = activities
      .record_attendance()
      .mutate_async(NewActivityAttendance {
        participation_id: 1,
        attendance_date: "2024-10-02".into(),
        status: AttendanceMark::Late,
        notes: None,
      })
      .await
      .unwrap();

    assert_eq!(recorded.status, AttendanceMark::Late);
    assert!(cache.snapshot(&sessions).unwrap().is_invalidated);
    assert!(cache.snapshot(&summary).unwrap().is_invalidated);
    assert!(!cache.snapshot(&other).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_attendance_edit_targets_participant_from_reply() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::PATCH, "/activity-participation/attendance/5/", 200, session(5, 2));
    let sessions = QueryKey::from(["activity-participant", "2", "attendance"]);
    let other = QueryKey::from(["activity-participant", "1", "attendance"]);
    cache.set_data(&sessions, json!([]));
    cache.set_data(&other, json!([]));
    let activities = Activities::new(Ctx::new(client, cache.clone()));

    activities
      .update_attendance()
      .mutate_async(Update::new(
        5,
        AttendancePatch {
          status: Some(AttendanceMark::Excused),
          ..AttendancePatch::default()
        },
      ))
      .await
      .unwrap();

    assert_eq!(
      mock.last_body(Method::PATCH, "/activity-participation/attendance/5/"),
      Some(json!({"status": "excused"}))
    );
    assert!(cache.snapshot(&sessions).unwrap().is_invalidated);
    assert!(!cache.snapshot(&other).unwrap().is_invalidated);
  }

  #[tokio::test]
  async fn test_status_and_statistics() {
    let (mock, _tokens, client, cache) = harness();
    let mut suspended = participation(1, "member");
    suspended["status"] = json!("suspended");
    mock.on(Method::PATCH, "/activity-participation/1/status/", 200, suspended);
    mock.on(
      Method::GET,
      "/activity-participation/statistics/?activity_type=sports",
      200,
      json!({
        "total_participations": 40,
        "active_participations": 35,
        "by_activity_type": {"club": 0, "sports": 40, "event": 0},
        "by_role": {"captain": 2, "member": 38},
        "average_attendance": "88.5",
        "top_activities": [{"activity_name": "Hawks", "participation_count": 18}],
      }),
    );
    let activities = Activities::new(Ctx::new(client, cache));

    let updated = activities
      .update_status()
      .mutate_async(StatusUpdate {
        id: 1,
        status: ParticipationStatus::Suspended,
      })
      .await
      .unwrap();
    assert_eq!(updated.status, ParticipationStatus::Suspended);
    assert_eq!(
      mock.last_body(Method::PATCH, "/activity-participation/1/status/"),
      Some(json!({"status": "suspended"}))
    );

    let stats = activities
      .statistics(&StatisticsFilters {
        activity_type: Some(ActivityType::Sports),
        ..StatisticsFilters::default()
      })
      .load()
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stats.by_activity_type["sports"], 40);
    assert_eq!(stats.average_attendance, 88.5);
  }
}
