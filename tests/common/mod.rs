#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use lightbnb_search::search::SqlParam;
use lightbnb_search::store::{Row, Store};
use lightbnb_search::ExecutionError;
use serde_json::{json, Value};

/// In-memory store that records every statement and replays canned rows
#[derive(Default)]
pub struct RecordingStore {
    rows: Vec<Row>,
    fail_with: Option<String>,
    calls: Mutex<Vec<(String, Vec<SqlParam>)>>,
}

impl RecordingStore {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: rows.into_iter().map(into_row).collect(),
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> (String, Vec<SqlParam>) {
        self.calls().pop().expect("no statement executed")
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, ExecutionError> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        match &self.fail_with {
            Some(message) => Err(ExecutionError::Query {
                message: message.clone(),
                code: Some("42601".to_string()),
            }),
            None => Ok(self.rows.clone()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

pub fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row fixture must be an object, got {other}"),
    }
}

pub fn property_row(id: i32, city: &str, cost_per_night: i64, average_rating: f64) -> Value {
    json!({
        "id": id,
        "owner_id": 7,
        "title": format!("Listing {id}"),
        "description": "description",
        "thumbnail_photo_url": "https://images.example/thumb.jpg",
        "cover_photo_url": "https://images.example/cover.jpg",
        "cost_per_night": cost_per_night,
        "parking_spaces": 1,
        "number_of_bathrooms": 2,
        "number_of_bedrooms": 3,
        "country": "Canada",
        "street": "651 Nami Road",
        "city": city,
        "province": "British Columbia",
        "post_code": "V6B 1A1",
        "active": true,
        "average_rating": average_rating,
    })
}
