//! Typed bindings for the portal's REST resources.
//!
//! Every binding is a thin pairing of a query key with an endpoint. Reads
//! hand out `Query<T>` handles over the shared cache; writes hand out
//! `Mutation<I, O>` handles whose invalidation is declared in
//! `query::invalidation`.

pub mod accounts;
pub mod activities;
pub mod assessments;
pub mod attendance;
pub mod classes;
pub mod clubs;
pub mod diary;
pub mod employees;
pub mod events;
pub mod exams;
pub mod finance;
pub mod parents;
pub mod payments;
pub mod salaries;
pub mod school;
pub mod sports;
pub mod students;
pub mod subjects;
pub mod teachers;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;

use crate::api::{ApiClient, ApiError, FieldErrors, Method, Page};
use crate::query::{fetcher, Filters, Mutation, MutationSpec, Query, QueryCache, QueryKey, QueryOptions};

/// Client and cache, shared by every binding.
#[derive(Clone)]
pub struct Ctx {
  client: ApiClient,
  cache: QueryCache,
}

impl Ctx {
  pub fn new(client: ApiClient, cache: QueryCache) -> Self {
    Self { client, cache }
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  /// GET `path` and cache the body under `key`.
  pub fn query<T: DeserializeOwned>(&self, key: QueryKey, path: String) -> Query<T> {
    self.query_with(key, path, QueryOptions::default())
  }

  pub fn query_with<T: DeserializeOwned>(
    &self,
    key: QueryKey,
    path: String,
    options: QueryOptions,
  ) -> Query<T> {
    let client = self.client.clone();
    Query::new(
      self.cache.clone(),
      key,
      fetcher(move || {
        let client = client.clone();
        let path = path.clone();
        async move { client.get::<Value>(&path).await }
      }),
      options,
    )
  }

  /// GET a list endpoint; whatever envelope comes back is cached as a `Page`.
  pub fn page<T: DeserializeOwned>(&self, key: QueryKey, path: String) -> Query<Page<T>> {
    self.page_with(key, path, QueryOptions::default())
  }

  pub fn page_with<T: DeserializeOwned>(
    &self,
    key: QueryKey,
    path: String,
    options: QueryOptions,
  ) -> Query<Page<T>> {
    let client = self.client.clone();
    Query::new(
      self.cache.clone(),
      key,
      fetcher(move || {
        let client = client.clone();
        let path = path.clone();
        async move {
          let page = client.get_page::<Value>(&path).await?;
          to_json(&page)
        }
      }),
      options,
    )
  }

  /// A mutation whose runner gets its own client handle per call.
  pub fn mutation<I, O, F, Fut>(&self, spec: &'static MutationSpec, run: F) -> Mutation<I, O>
  where
    I: Serialize + Send + 'static,
    O: Serialize + Clone + Send + Sync + 'static,
    F: Fn(ApiClient, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
  {
    let client = self.client.clone();
    Mutation::new(self.cache.clone(), spec, move |input| run(client.clone(), input))
  }
}

/// Static description of a plain CRUD endpoint.
#[derive(Debug)]
pub struct Resource {
  /// Key root for lists (`students`)
  pub name: &'static str,
  /// Key root for single records (`student`)
  pub detail: &'static str,
  /// Collection path with trailing slash (`/students/`)
  pub path: &'static str,
  pub create: &'static MutationSpec,
  pub update: &'static MutationSpec,
  pub delete: &'static MutationSpec,
}

impl Resource {
  pub fn list_key(&self, filters: &Filters) -> QueryKey {
    QueryKey::new(self.name).with_filters(filters)
  }

  pub fn detail_key(&self, id: impl Display) -> QueryKey {
    QueryKey::new(self.detail).with(id)
  }

  pub fn detail_path(&self, id: impl Display) -> String {
    format!("{}{}/", self.path, id)
  }
}

/// Update payload: the record id plus the fields to send.
#[derive(Debug, Clone, Serialize)]
pub struct Update<B, K = u64> {
  pub id: K,
  pub data: B,
}

impl<B, K> Update<B, K> {
  pub fn new(id: K, data: B) -> Self {
    Self { id, data }
  }
}

/// A write under an owning record: a club's members, a team's games, an
/// event's participants. `item` names the nested record when the write
/// targets an existing one.
#[derive(Debug, Clone, Serialize)]
pub struct Nested<B = ()> {
  pub owner: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub item: Option<u64>,
  pub data: B,
}

impl<B> Nested<B> {
  pub fn new(owner: u64, data: B) -> Self {
    Self {
      owner,
      item: None,
      data,
    }
  }

  pub fn item(owner: u64, item: u64, data: B) -> Self {
    Self {
      owner,
      item: Some(item),
      data,
    }
  }

  pub(crate) fn item_id(&self) -> Result<u64, ApiError> {
    self.item.ok_or_else(|| {
      let mut fields = FieldErrors::new();
      fields.add("item", "No nested record selected");
      ApiError::Validation(fields)
    })
  }
}

impl Nested {
  /// Address a nested record with no body (removals, confirmations).
  pub fn target(owner: u64, item: u64) -> Self {
    Self::item(owner, item, ())
  }
}

/// Body for the `status/` action shared by events, clubs and teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
  pub id: u64,
  pub is_active: bool,
}

/// PATCH `{detail}status/` with the new active flag.
pub(crate) fn status_mutation<T>(
  ctx: &Ctx,
  resource: &'static Resource,
  spec: &'static MutationSpec,
) -> Mutation<StatusChange, T>
where
  T: DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
{
  ctx.mutation(spec, move |client, change: StatusChange| async move {
    client
      .patch(
        &format!("{}status/", resource.detail_path(change.id)),
        &serde_json::json!({ "is_active": change.is_active }),
      )
      .await
  })
}

/// List/get/create/update/delete over one `Resource`, with records of type
/// `T` identified by `K`.
pub struct Crud<T, K = u64> {
  ctx: Ctx,
  resource: &'static Resource,
  _marker: PhantomData<fn() -> (T, K)>,
}

impl<T, K> Clone for Crud<T, K> {
  fn clone(&self) -> Self {
    Self {
      ctx: self.ctx.clone(),
      resource: self.resource,
      _marker: PhantomData,
    }
  }
}

impl<T, K> Crud<T, K>
where
  T: DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
  K: Display + Serialize + Send + Sync + 'static,
{
  pub fn new(ctx: Ctx, resource: &'static Resource) -> Self {
    Self {
      ctx,
      resource,
      _marker: PhantomData,
    }
  }

  pub fn resource(&self) -> &'static Resource {
    self.resource
  }

  pub fn list(&self, filters: &Filters) -> Query<Page<T>> {
    self
      .ctx
      .page(self.resource.list_key(filters), filters.apply_to(self.resource.path))
  }

  /// A single record. Disabled while `id` renders empty.
  pub fn get(&self, id: &K) -> Query<T> {
    let id = id.to_string();
    let enabled = !id.trim().is_empty();
    self.ctx.query_with(
      self.resource.detail_key(&id),
      self.resource.detail_path(&id),
      QueryOptions::default().enabled(enabled),
    )
  }

  pub fn create<B>(&self) -> Mutation<B, T>
  where
    B: Serialize + Send + Sync + 'static,
  {
    let path = self.resource.path;
    self
      .ctx
      .mutation(self.resource.create, move |client, body: B| async move {
        client.post(path, &body).await
      })
  }

  /// `PUT` replaces, `PATCH` sends only the given fields.
  pub fn update<B>(&self, method: Method) -> Mutation<Update<B, K>, T>
  where
    B: Serialize + Send + Sync + 'static,
  {
    let resource = self.resource;
    self
      .ctx
      .mutation(resource.update, move |client, update: Update<B, K>| {
        let method = method.clone();
        async move {
          let body = to_json(&update.data)?;
          client
            .request(method, &resource.detail_path(&update.id), Some(body))
            .await
        }
      })
  }

  pub fn delete(&self) -> Mutation<K, Value> {
    let resource = self.resource;
    self
      .ctx
      .mutation(resource.delete, move |client, id: K| async move {
        client.delete(&resource.detail_path(&id)).await
      })
  }
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, ApiError> {
  serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Money and other decimals arrive as `"150.00"` or `150`; both become `f64`.
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(f64),
    Text(String),
    Null(()),
  }

  match Raw::deserialize(deserializer)? {
    Raw::Number(n) => Ok(n),
    Raw::Text(s) if s.trim().is_empty() => Ok(0.0),
    Raw::Text(s) => s
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("invalid decimal '{}'", s))),
    Raw::Null(()) => Ok(0.0),
  }
}

/// Like [`decimal`], but null and blank stay `None` (ungraded marks).
pub(crate) fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
    Some(value) => decimal(value).map(Some).map_err(serde::de::Error::custom),
  }
}

/// Ids that are numbers on some endpoints and strings on others.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    Value::Null => Ok(String::new()),
    other => Err(serde::de::Error::custom(format!("invalid id {}", other))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::invalidation;
  use crate::test_support::harness;
  use serde_json::json;

  static WIDGETS: Resource = Resource {
    name: "departments",
    detail: "department",
    path: "/departments/",
    create: &invalidation::DEPARTMENT_CREATE,
    update: &invalidation::DEPARTMENT_UPDATE,
    delete: &invalidation::DEPARTMENT_DELETE,
  };

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Widget {
    id: u64,
    d_name: String,
  }

  fn crud() -> (std::sync::Arc<crate::test_support::MockTransport>, QueryCache, Crud<Widget>) {
    let (mock, _tokens, client, cache) = harness();
    let crud = Crud::new(Ctx::new(client, cache.clone()), &WIDGETS);
    (mock, cache, crud)
  }

  #[tokio::test]
  async fn test_list_accepts_both_envelopes() {
    let (mock, _cache, crud) = crud();
    mock.on(
      Method::GET,
      "/departments/",
      200,
      json!({
        "count": 3,
        "next": null,
        "previous": null,
        "results": [
          {"id": 1, "d_name": "Science"},
          {"id": 2, "d_name": "Arts"},
          {"id": 3, "d_name": "Finance"},
        ],
      }),
    );
    mock.on(
      Method::GET,
      "/departments/?d_type=academic",
      200,
      json!([{"id": 1, "d_name": "Science"}, {"id": 4, "d_name": "Maths"}]),
    );

    let page = crud.list(&Filters::new()).load().await.unwrap().unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page.total, 3);

    let filtered = Filters::new().with("d_type", "academic");
    let page = crud.list(&filtered).load().await.unwrap().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.items[1].d_name, "Maths");
  }

  #[tokio::test]
  async fn test_get_with_empty_id_is_disabled() {
    let (mock, _tokens, client, cache) = harness();
    let by_name: Crud<Widget, String> = Crud::new(Ctx::new(client, cache), &WIDGETS);

    let query = by_name.get(&String::new());
    assert!(!query.is_enabled());
    assert_eq!(query.load().await.unwrap(), None);
    assert_eq!(mock.total_calls(), 0);
  }

  #[tokio::test]
  async fn test_filter_order_does_not_change_key() {
    let (mock, _cache, crud) = crud();
    mock.on(Method::GET, "/departments/?a=1&b=2", 200, json!([]));

    let first = crud.list(&Filters::new().with("b", 2u32).with("a", 1u32).with("c", ""));
    let second = crud.list(&Filters::new().with("a", 1u32).with("b", 2u32));
    assert_eq!(first.key(), second.key());

    first.load().await.unwrap();
    second.load().await.unwrap();
    assert_eq!(mock.calls(Method::GET, "/departments/?a=1&b=2"), 1);
  }

  #[tokio::test]
  async fn test_failed_update_keeps_cached_list() {
    let (mock, cache, crud) = crud();
    mock.on(Method::GET, "/departments/", 200, json!([{"id": 1, "d_name": "Science"}]));
    mock.on(
      Method::PATCH,
      "/departments/1/",
      400,
      json!({"d_name": ["This field may not be blank."]}),
    );

    let list = crud.list(&Filters::new());
    let before = list.load().await.unwrap();

    let update = crud.update::<Value>(Method::PATCH);
    let err = update
      .mutate_async(Update::new(1, json!({"d_name": ""})))
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.field_errors().unwrap().get("d_name").is_some());

    assert_eq!(list.data(), before);
    assert!(!cache.snapshot(list.key()).unwrap().is_invalidated);
    assert_eq!(mock.calls(Method::GET, "/departments/"), 1);
  }

  #[tokio::test]
  async fn test_delete_invalidates_list_and_record() {
    let (mock, cache, crud) = crud();
    mock.on(Method::GET, "/departments/", 200, json!([{"id": 1, "d_name": "Science"}]));
    mock.on(Method::GET, "/departments/1/", 200, json!({"id": 1, "d_name": "Science"}));
    mock.on_empty(Method::DELETE, "/departments/1/", 204);

    crud.list(&Filters::new()).load().await.unwrap();
    crud.get(&1).load().await.unwrap();

    let removed = crud.delete().mutate_async(1).await.unwrap();
    assert_eq!(removed, Value::Null);
    assert_eq!(mock.calls(Method::DELETE, "/departments/1/"), 1);

    assert!(cache.snapshot(&QueryKey::new("departments")).unwrap().is_invalidated);
    assert!(cache.snapshot(&QueryKey::from(["department", "1"])).unwrap().is_invalidated);
  }
}
