mod common;

use std::sync::{Arc, Mutex};

use common::{property_row, RecordingStore};
use lightbnb_search::search::{SearchObserver, SqlParam};
use lightbnb_search::{
    search_properties, ExecutionError, PropertySearch, QueryPlan, ResultLimit, SearchOptions,
    StoreError,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn limit(n: u32) -> ResultLimit {
    ResultLimit::new(n).unwrap()
}

fn full_options() -> SearchOptions {
    SearchOptions {
        owner_id: Some(7),
        minimum_price_per_night: Some(Decimal::from(50)),
        maximum_price_per_night: Some(Decimal::from(200)),
        city: Some("Vancouver".to_string()),
        minimum_rating: Some(Decimal::from(4)),
    }
}

#[test]
fn all_filters_bind_in_fixed_order() {
    let plan = QueryPlan::build(&full_options(), limit(5));

    assert_eq!(
        plan.params,
        vec![
            SqlParam::Integer(7),
            SqlParam::Integer(5000),
            SqlParam::Integer(20000),
            SqlParam::Text("%Vancouver%".to_string()),
            SqlParam::Decimal(Decimal::from(4)),
            SqlParam::Integer(5),
        ]
    );
    assert!(plan.sql.contains(
        "WHERE owner_id = $1 AND cost_per_night >= $2 AND cost_per_night <= $3 AND city LIKE $4"
    ));

    let group = plan.sql.find("GROUP BY properties.id").unwrap();
    let having = plan
        .sql
        .find("HAVING avg(property_reviews.rating) >= $5")
        .unwrap();
    let order = plan.sql.find("ORDER BY cost_per_night ASC").unwrap();
    let limit_at = plan.sql.find("LIMIT $6").unwrap();
    assert!(plan.sql.find("WHERE").unwrap() < group);
    assert!(group < having && having < order && order < limit_at);
}

#[test]
fn building_twice_is_identical() {
    let first = QueryPlan::build(&full_options(), limit(5));
    let second = QueryPlan::build(&full_options(), limit(5));
    assert_eq!(first, second);
}

#[test]
fn options_from_form_json() {
    let options: SearchOptions = serde_json::from_value(json!({
        "owner_id": 7,
        "minimum_price_per_night": "50",
        "maximum_price_per_night": 200,
        "city": "Vancouver",
        "minimum_rating": 4
    }))
    .unwrap();
    assert_eq!(
        QueryPlan::build(&options, limit(5)),
        QueryPlan::build(&full_options(), limit(5))
    );
}

#[tokio::test]
async fn search_executes_the_built_plan() {
    let store = RecordingStore::with_rows(vec![
        property_row(1, "Vancouver", 9300, 4.5),
        property_row(2, "North Vancouver", 12000, 4.0),
    ]);

    let properties = search_properties(&store, &full_options(), limit(5))
        .await
        .unwrap();

    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].id, 1);
    assert_eq!(properties[0].cost_per_night, 9300);
    assert_eq!(properties[1].average_rating, Some(4.0));

    let expected = QueryPlan::build(&full_options(), limit(5));
    assert_eq!(store.calls().len(), 1);
    assert_eq!(store.last_call(), (expected.sql, expected.params));
}

#[tokio::test]
async fn no_matches_is_an_empty_success() {
    let store = RecordingStore::with_rows(vec![]);
    let properties = search_properties(&store, &SearchOptions::default(), ResultLimit::default())
        .await
        .unwrap();
    assert!(properties.is_empty());

    let (sql, params) = store.last_call();
    assert!(!sql.contains("WHERE"));
    assert_eq!(params, vec![SqlParam::Integer(10)]);
}

#[tokio::test]
async fn execution_failure_is_surfaced() {
    let store = RecordingStore::failing("syntax error at or near \"LIMT\"");

    let result = search_properties(&store, &SearchOptions::default(), limit(3)).await;

    match result {
        Err(StoreError::Execution(ExecutionError::Query { message, code })) => {
            assert!(message.contains("syntax error"));
            assert_eq!(code.as_deref(), Some("42601"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_row_is_a_decode_error() {
    let store = RecordingStore::with_rows(vec![json!({ "id": "not-a-number" })]);

    let result = search_properties(&store, &SearchOptions::default(), limit(3)).await;

    assert!(matches!(
        result,
        Err(StoreError::Decode {
            entity: "property",
            ..
        })
    ));
}

#[tokio::test]
async fn null_columns_do_not_drop_the_result_set() {
    let mut sparse = property_row(2, "Vancouver", 8000, 4.2);
    for column in ["description", "owner_id", "parking_spaces", "post_code", "active"] {
        sparse[column] = Value::Null;
    }
    let store = RecordingStore::with_rows(vec![
        property_row(1, "Vancouver", 7000, 4.8),
        sparse,
    ]);

    let properties = search_properties(&store, &SearchOptions::default(), limit(5))
        .await
        .unwrap();

    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].owner_id, Some(7));
    assert_eq!(properties[0].description.as_deref(), Some("description"));
    let sparse = &properties[1];
    assert_eq!(sparse.owner_id, None);
    assert_eq!(sparse.description, None);
    assert_eq!(sparse.parking_spaces, 0);
    assert_eq!(sparse.post_code, "");
    assert!(sparse.active);
}

#[derive(Default)]
struct CountingObserver {
    events: Mutex<Vec<String>>,
}

impl SearchObserver for CountingObserver {
    fn on_plan(&self, plan: &QueryPlan) {
        self.events
            .lock()
            .unwrap()
            .push(format!("plan:{}", plan.params.len()));
    }

    fn on_success(&self, backend: &str, _plan: &QueryPlan, rows: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ok:{backend}:{rows}"));
    }

    fn on_failure(&self, backend: &str, _plan: &QueryPlan, _error: &StoreError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed:{backend}"));
    }
}

#[tokio::test]
async fn observer_sees_success_and_failure() {
    let observer = Arc::new(CountingObserver::default());
    let search = PropertySearch::with_observer(observer.clone());

    let ok_store = RecordingStore::with_rows(vec![property_row(3, "Victoria", 5000, 3.5)]);
    let options = SearchOptions {
        city: Some("Victoria".to_string()),
        ..Default::default()
    };
    search.search(&ok_store, &options, limit(1)).await.unwrap();

    let bad_store = RecordingStore::failing("connection reset");
    assert!(search
        .search(&bad_store, &options, limit(1))
        .await
        .is_err());

    assert_eq!(
        *observer.events.lock().unwrap(),
        vec![
            "plan:2",
            "ok:recording:1",
            "plan:2",
            "failed:recording"
        ]
    );
}

#[tokio::test]
async fn concurrent_searches_are_independent() {
    let store = Arc::new(RecordingStore::with_rows(vec![]));

    let handles: Vec<_> = (1..=4)
        .map(|owner| {
            let store = store.clone();
            tokio::spawn(async move {
                let options = SearchOptions {
                    owner_id: Some(owner),
                    ..Default::default()
                };
                search_properties(store.as_ref(), &options, limit(2)).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut owners: Vec<_> = store
        .calls()
        .into_iter()
        .map(|(sql, params)| {
            assert!(sql.contains("WHERE owner_id = $1"));
            assert_eq!(params.len(), 2);
            params[0].clone()
        })
        .collect();
    owners.sort_by_key(|p| p.to_string());
    assert_eq!(
        owners,
        (1..=4).map(SqlParam::Integer).collect::<Vec<_>>()
    );
}
