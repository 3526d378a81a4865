use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use super::{Crud, Resource};
use crate::query::invalidation;

pub static RESOURCE: Resource = Resource {
  name: "students",
  detail: "student",
  path: "/students/",
  create: &invalidation::STUDENT_CREATE,
  update: &invalidation::STUDENT_UPDATE,
  delete: &invalidation::STUDENT_DELETE,
};

/// Students are keyed by their `s_id` (a UUID string).
pub type Students = Crud<Student, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub s_id: String,
  #[serde(default)]
  pub student_number: String,
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub level: Option<u64>,
  #[serde(default)]
  pub level_name: Option<String>,
  #[serde(default)]
  pub section: Option<u64>,
  #[serde(default)]
  pub section_name: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Student {
  pub fn is_active(&self) -> bool {
    self.status == "active"
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewStudent {
  #[validate(length(min = 1, message = "Student number is required"))]
  pub student_number: String,
  #[validate(length(min = 1, message = "Name is required"))]
  pub name: String,
  #[validate(email(message = "Please enter a valid email address"))]
  pub email: String,
  pub gender: String,
  pub date_of_birth: String,
  pub enroll_date: String,
  pub address: String,
  pub level: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub section: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  pub emergency_contact_name: String,
  pub emergency_contact_phone: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Method;
  use crate::query::{Filters, QueryKey};
  use crate::resources::{Ctx, Update};
  use crate::test_support::harness;
  use serde_json::json;

  fn student_json(id: &str, name: &str) -> Value {
    json!({
      "s_id": id,
      "student_number": "S-001",
      "name": name,
      "email": "ada@school.test",
      "status": "active",
      "level": 3,
      "gender": "female",
    })
  }

  #[tokio::test]
  async fn test_student_keeps_unknown_fields() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::GET, "/students/abc/", 200, student_json("abc", "Ada"));
    let students = Students::new(Ctx::new(client, cache), &RESOURCE);

    let student = students.get(&"abc".to_string()).load().await.unwrap().unwrap();
    assert!(student.is_active());
    assert_eq!(student.level, Some(3));
    assert_eq!(student.extra.get("gender"), Some(&json!("female")));
  }

  #[tokio::test]
  async fn test_update_refreshes_observed_list() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::GET, "/students/?search=ada", 200, json!([student_json("abc", "Ada")]));
    mock.on(Method::GET, "/students/?search=ada", 200, json!([student_json("abc", "Ada L.")]));
    mock.on(Method::PUT, "/students/abc/", 200, student_json("abc", "Ada L."));
    let students = Students::new(Ctx::new(client, cache.clone()), &RESOURCE);

    let mut list = students.list(&Filters::new().with("search", "ada"));
    list.load().await.unwrap();
    list.poll();

    let updated = students
      .update(Method::PUT)
      .mutate_async(Update::new("abc".to_string(), json!({"name": "Ada L."})))
      .await
      .unwrap();
    assert_eq!(updated.name, "Ada L.");

    while list.data().map(|page| page.items[0].name.clone()) != Some("Ada L.".to_string()) {
      assert!(list.changed().await);
    }
    assert_eq!(mock.calls(Method::GET, "/students/?search=ada"), 2);
    assert!(cache.contains(&QueryKey::new("students").with("search=ada")));
  }

  #[tokio::test]
  async fn test_create_posts_payload() {
    let (mock, _tokens, client, cache) = harness();
    mock.on(Method::POST, "/students/", 201, student_json("new-id", "Grace"));
    let students = Students::new(Ctx::new(client, cache), &RESOURCE);

    let payload = NewStudent {
      student_number: "S-002".into(),
      name: "Grace".into(),
      email: "grace@school.test".into(),
      level: 2,
      ..NewStudent::default()
    };
    assert!(payload.validate().is_ok());

    let created = students.create().mutate_async(payload).await.unwrap();
    assert_eq!(created.s_id, "new-id");

    let body = mock.last_body(Method::POST, "/students/").unwrap();
    assert_eq!(body["level"], json!(2));
    assert!(body.get("section").is_none());
  }
}
