//! School events and their participant lists.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{status_mutation, Crud, Ctx, Nested, Resource, StatusChange, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey, QueryOptions};

pub static RESOURCE: Resource = Resource {
  name: "events",
  detail: "event",
  path: "/events/",
  create: &invalidation::EVENT_CREATE,
  update: &invalidation::EVENT_UPDATE,
  delete: &invalidation::EVENT_DELETE,
};

const UPCOMING_STALE_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
  Academic,
  Sports,
  Cultural,
  Other,
}

impl EventType {
  pub fn as_str(&self) -> &'static str {
    match self {
      EventType::Academic => "academic",
      EventType::Sports => "sports",
      EventType::Cultural => "cultural",
      EventType::Other => "other",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub event_type: EventType,
  pub start_date: String,
  #[serde(default)]
  pub end_date: Option<String>,
  #[serde(default)]
  pub start_time: Option<String>,
  #[serde(default)]
  pub end_time: Option<String>,
  #[serde(default)]
  pub location: String,
  #[serde(default)]
  pub organizer_id: Option<u64>,
  #[serde(default)]
  pub max_participants: u32,
  #[serde(default)]
  pub current_participants: u32,
  #[serde(default = "default_true")]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Event {
  /// Zero means no cap.
  pub fn is_full(&self) -> bool {
    self.max_participants > 0 && self.current_participants >= self.max_participants
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventFilters {
  pub event_type: Option<EventType>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub organizer_id: Option<u64>,
  pub is_active: Option<bool>,
  pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
  Participant,
  Volunteer,
  Organizer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParticipant {
  pub id: u64,
  pub event_id: u64,
  pub user_id: u64,
  pub role: ParticipantRole,
  #[serde(default)]
  pub registration_date: Option<String>,
  #[serde(default)]
  pub is_confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
  pub user_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<ParticipantRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipients {
  All,
  Participants,
  Organizers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
  pub message: String,
  pub recipients: Recipients,
}

#[derive(Clone)]
pub struct Events {
  ctx: Ctx,
  crud: Crud<Event>,
}

impl Events {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      crud: Crud::new(ctx.clone(), &RESOURCE),
      ctx,
    }
  }

  pub fn list(&self, filters: &EventFilters) -> Query<Page<Event>> {
    self.crud.list(&Filters::from_serialize(filters))
  }

  pub fn get(&self, id: u64) -> Query<Event> {
    self.crud.get(&id)
  }

  pub fn participants(&self, event: u64) -> Query<Page<EventParticipant>> {
    self.ctx.page(
      RESOURCE.detail_key(event).with("participants"),
      format!("{}participants/", RESOURCE.detail_path(event)),
    )
  }

  pub fn upcoming(&self, limit: Option<u32>) -> Query<Page<Event>> {
    let filters = Filters::new().with("limit", limit);
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name).with("upcoming").with_filters(&filters),
      filters.apply_to(&format!("{}upcoming/", RESOURCE.path)),
      QueryOptions::default().stale_time(UPCOMING_STALE_TIME),
    )
  }

  /// Events overlapping `start..=end` (`YYYY-MM-DD`).
  pub fn by_date_range(&self, start: &str, end: &str) -> Query<Page<Event>> {
    let filters = Filters::new().with("start_date", start).with("end_date", end);
    self.ctx.page_with(
      QueryKey::new(RESOURCE.name).with("date-range").with_filters(&filters),
      filters.apply_to(&format!("{}date-range/", RESOURCE.path)),
      QueryOptions::default().enabled(!start.is_empty() && !end.is_empty()),
    )
  }

  pub fn by_type(&self, event_type: EventType) -> Query<Page<Event>> {
    self.ctx.page(
      QueryKey::new(RESOURCE.name).with("type").with(event_type.as_str()),
      format!("{}type/{}/", RESOURCE.path, event_type.as_str()),
    )
  }

  pub fn create(&self) -> Mutation<Value, Event> {
    self.crud.create()
  }

  pub fn update(&self) -> Mutation<Update<Value>, Event> {
    self.crud.update(Method::PUT)
  }

  pub fn delete(&self) -> Mutation<u64, Value> {
    self.crud.delete()
  }

  pub fn update_status(&self) -> Mutation<StatusChange, Event> {
    status_mutation(&self.ctx, &RESOURCE, &invalidation::EVENT_STATUS)
  }

  /// Sign a user up for the event `owner`.
  pub fn register(&self) -> Mutation<Nested<Registration>, EventParticipant> {
    self.ctx.mutation(
      &invalidation::EVENT_REGISTER,
      |client, signup: Nested<Registration>| async move {
        client
          .post(&format!("{}register/", RESOURCE.detail_path(signup.owner)), &signup.data)
          .await
      },
    )
  }

  /// Takes the event as owner and the user id as item.
  pub fn unregister(&self) -> Mutation<Nested, Value> {
    self
      .ctx
      .mutation(&invalidation::EVENT_UNREGISTER, |client, target: Nested| async move {
        let user = target.item_id()?;
        client
          .delete(&format!("{}unregister/{}/", RESOURCE.detail_path(target.owner), user))
          .await
      })
  }

  /// Takes the event as owner and the participant record id as item.
  pub fn confirm_participant(&self) -> Mutation<Nested, EventParticipant> {
    self.ctx.mutation(
      &invalidation::EVENT_CONFIRM_PARTICIPANT,
      |client, target: Nested| async move {
        let participant = target.item_id()?;
        let path = format!(
          "{}participants/{}/confirm/",
          RESOURCE.detail_path(target.owner),
          participant
        );
        client.patch(&path, &json!({})).await
      },
    )
  }

  pub fn notify(&self) -> Mutation<Nested<Notice>, Value> {
    self
      .ctx
      .mutation(&invalidation::EVENT_NOTIFY, |client, notice: Nested<Notice>| async move {
        client
          .post(&format!("{}notify/", RESOURCE.detail_path(notice.owner)), &notice.data)
          .await
      })
  }
}
