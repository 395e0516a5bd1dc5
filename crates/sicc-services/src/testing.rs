//! In-memory [`ItemStore`] for tests.
//!
//! Evaluates the subset of the Directus query language the services emit: `_eq`, `_in`,
//! `_icontains`, `_lte` and `_gte` filters over one or two path segments (arrays are
//! flattened at every step), `sort[]` with `-` for descending, `limit`/`page`, field
//! projection, `meta=filter_count` and `groupBy[]` with `aggregate[count]`. Every call is
//! recorded so tests can assert on the traffic.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sicc_core::query::{Filter, FilterOp};
use sicc_core::{ItemId, ItemQuery, ItemStore, ItemsMeta, ItemsResponse, SiccError, SiccResult};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMethod {
    List,
    Get,
    Create,
    CreateMany,
    Update,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub method: StoreMethod,
    pub collection: String,
    /// Query-string pairs of a list or get.
    pub params: Vec<(String, String)>,
    /// Body of a create or update.
    pub body: Option<Value>,
}

impl StoreCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
struct FailureRule {
    collection: String,
    method: Option<StoreMethod>,
    param: Option<String>,
    status: u16,
    message: String,
}

impl FailureRule {
    fn matches(&self, method: StoreMethod, collection: &str, params: &[(String, String)]) -> bool {
        self.collection == collection
            && self.method.is_none_or(|m| m == method)
            && self
                .param
                .as_ref()
                .is_none_or(|name| params.iter().any(|(key, _)| key == name))
    }
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<Value>>,
    next_id: i64,
    calls: Vec<StoreCall>,
    failures: Vec<FailureRule>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed rows into `collection`.
    pub fn insert(&self, collection: &str, rows: impl IntoIterator<Item = Value>) -> &Self {
        self.lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
        self
    }

    pub fn rows(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call on `collection` fails with `status`.
    pub fn fail(&self, collection: &str, status: u16, message: &str) -> &Self {
        self.push_rule(collection, None, None, status, message)
    }

    /// Calls of one method on `collection` fail with `status`.
    pub fn fail_method(
        &self,
        collection: &str,
        method: StoreMethod,
        status: u16,
        message: &str,
    ) -> &Self {
        self.push_rule(collection, Some(method), None, status, message)
    }

    /// Reads of `collection` carrying the query parameter `param` fail with `status`.
    pub fn fail_query(&self, collection: &str, param: &str, status: u16, message: &str) -> &Self {
        self.push_rule(
            collection,
            None,
            Some(param.to_string()),
            status,
            message,
        )
    }

    fn push_rule(
        &self,
        collection: &str,
        method: Option<StoreMethod>,
        param: Option<String>,
        status: u16,
        message: &str,
    ) -> &Self {
        self.lock().failures.push(FailureRule {
            collection: collection.to_string(),
            method,
            param,
            status,
            message: message.to_string(),
        });
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: StoreMethod, collection: &str) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.collection == collection)
            .cloned()
            .collect()
    }

    /// Record the call, then apply any matching failure rule.
    fn begin(
        state: &mut State,
        method: StoreMethod,
        collection: &str,
        params: Vec<(String, String)>,
        body: Option<Value>,
    ) -> SiccResult<()> {
        let failure = state
            .failures
            .iter()
            .find(|rule| rule.matches(method, collection, &params))
            .map(|rule| SiccError::Http {
                status: rule.status,
                message: rule.message.clone(),
            });
        state.calls.push(StoreCall {
            method,
            collection: collection.to_string(),
            params,
            body,
        });
        failure.map_or(Ok(()), Err)
    }

    fn assign_id(state: &mut State, mut row: Value) -> Value {
        let has_id = row.get("id").and_then(ItemId::from_value).is_some();
        if let (false, Value::Object(map)) = (has_id, &mut row) {
            state.next_id += 1;
            map.insert("id".to_string(), json!(state.next_id));
        }
        row
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn list(&self, collection: &str, query: &ItemQuery) -> SiccResult<ItemsResponse> {
        let mut state = self.lock();
        Self::begin(&mut state, StoreMethod::List, collection, query.to_pairs(), None)?;

        let mut rows: Vec<Value> = state
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let filter_count = rows.len() as u64;

        if !query.group_by.is_empty() {
            return Ok(ItemsResponse {
                data: group_rows(&rows, &query.group_by),
                meta: None,
            });
        }

        for key in query.sort.iter().rev() {
            let (field, descending) = match key.strip_prefix('-') {
                Some(field) => (field, true),
                None => (key.as_str(), false),
            };
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if let Some(limit) = query.limit.filter(|l| *l >= 0) {
            let limit = limit as usize;
            let offset = query.page.map_or(0, |p| p.saturating_sub(1) as usize * limit);
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }

        let data = rows
            .into_iter()
            .map(|row| project(row, &query.fields))
            .collect();
        Ok(ItemsResponse {
            data,
            meta: query.filter_count.then_some(ItemsMeta {
                filter_count: Some(filter_count),
                total_count: None,
            }),
        })
    }

    async fn get(
        &self,
        collection: &str,
        id: &ItemId,
        query: &ItemQuery,
    ) -> SiccResult<Option<Value>> {
        let mut state = self.lock();
        let mut params = query.to_pairs();
        params.push(("id".to_string(), id.to_string()));
        Self::begin(&mut state, StoreMethod::Get, collection, params, None)?;

        Ok(state.collections.get(collection).and_then(|rows| {
            rows.iter()
                .find(|row| row.get("id").and_then(ItemId::from_value).as_ref() == Some(id))
                .cloned()
                .map(|row| project(row, &query.fields))
        }))
    }

    async fn create(&self, collection: &str, item: Value) -> SiccResult<Value> {
        let mut state = self.lock();
        Self::begin(&mut state, StoreMethod::Create, collection, Vec::new(), Some(item.clone()))?;
        let row = Self::assign_id(&mut state, item);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn create_many(&self, collection: &str, items: Vec<Value>) -> SiccResult<Vec<Value>> {
        let mut state = self.lock();
        Self::begin(
            &mut state,
            StoreMethod::CreateMany,
            collection,
            Vec::new(),
            Some(Value::Array(items.clone())),
        )?;
        let rows: Vec<Value> = items
            .into_iter()
            .map(|item| Self::assign_id(&mut state, item))
            .collect();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update(&self, collection: &str, id: &ItemId, patch: Value) -> SiccResult<Value> {
        let mut state = self.lock();
        Self::begin(
            &mut state,
            StoreMethod::Update,
            collection,
            vec![("id".to_string(), id.to_string())],
            Some(patch.clone()),
        )?;

        let row = state
            .collections
            .get_mut(collection)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.get("id").and_then(ItemId::from_value).as_ref() == Some(id))
            })
            .ok_or_else(|| SiccError::NotFound(format!("{} {}", collection, id)))?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut *row, patch) {
            target.extend(changes);
        }
        Ok(row.clone())
    }
}

/// Leaf values at `path`, flattening arrays before and after each segment.
fn values_at<'a>(row: &'a Value, path: &[String]) -> Vec<&'a Value> {
    let mut current = vec![row];
    for segment in path {
        current = flatten(current)
            .into_iter()
            .filter_map(|v| v.get(segment.as_str()))
            .collect();
    }
    flatten(current)
}

fn flatten(values: Vec<&Value>) -> Vec<&Value> {
    values
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let expected = filter.value.as_str();
    values_at(row, &filter.path)
        .into_iter()
        .filter_map(scalar_text)
        .any(|actual| match filter.op {
            FilterOp::Eq => actual == expected,
            FilterOp::In => expected.split(',').any(|candidate| candidate.trim() == actual),
            FilterOp::IContains => actual.to_lowercase().contains(&expected.to_lowercase()),
            FilterOp::Lte => compare_text(&actual, expected) != Ordering::Greater,
            FilterOp::Gte => compare_text(&actual, expected) != Ordering::Less,
        })
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left.and_then(scalar_text), right.and_then(scalar_text)) {
        (Some(l), Some(r)) => compare_text(&l, &r),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn project(row: Value, fields: &[String]) -> Value {
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        return row;
    }
    match row {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| fields.iter().any(|f| f == key))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// `groupBy` rows in first-seen order, each with `count: {"*": n}`.
fn group_rows(rows: &[Value], group_by: &[String]) -> Vec<Value> {
    let mut groups: Vec<(Vec<Value>, u64)> = Vec::new();
    for row in rows {
        let key: Vec<Value> = group_by
            .iter()
            .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
            .collect();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }
    groups
        .into_iter()
        .map(|(key, count)| {
            let mut group: Map<String, Value> = group_by.iter().cloned().zip(key).collect();
            group.insert("count".to_string(), json!({ "*": count }));
            Value::Object(group)
        })
        .collect()
}
