mod common;

use std::cmp::Ordering;

use chrono::{TimeZone, Utc};
use serde_json::json;
use sqlite_select::statement::{CompareOp, Predicate, Projection, SortDirection};
use sqlite_select::{translate, Criteria, ErrorKind, Record, SelectError, SelectWarning, Stage, Value};

use common::{init_tracing, sqlite_datastore};

fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| match r["id"] {
            Value::Integer(id) => id,
            ref other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_where_greater_than() {
    init_tracing();
    let (datastore, _dir) = sqlite_datastore();

    let criteria: Criteria =
        serde_json::from_value(json!({ "where": { "age": { ">": 30 } } })).unwrap();
    let output = datastore.find("people", &criteria).await.unwrap();

    assert_eq!(output.records.len(), 1);
    let record = &output.records[0];
    assert_eq!(record.len(), 2);
    assert_eq!(record["id"], Value::Integer(2));
    assert_eq!(record["age"], Value::Integer(40));
    assert!(output.warnings.is_empty());
}

#[tokio::test]
async fn test_unregistered_table_is_invalid_datastore() {
    let (datastore, _dir) = sqlite_datastore();

    let err = datastore.find("ghosts", &Criteria::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDatastore);
}

#[tokio::test]
async fn test_values_are_normalized() {
    init_tracing();
    let (datastore, _dir) = sqlite_datastore();

    let output = datastore
        .find("users", &Criteria::new().sort(json!("id")))
        .await
        .unwrap();
    let records = &output.records;
    assert_eq!(ids(records), vec![1, 2, 3, 4, 5]);

    let ada = &records[0];
    assert_eq!(ada["active"], Value::Boolean(true));
    assert_eq!(ada["profile"], Value::Json(json!({ "langs": ["en"] })));
    assert_eq!(
        ada["joined_at"],
        Value::DateTime(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap())
    );
    assert_eq!(ada["balance"], Value::Real(10.5));

    let grace = &records[1];
    assert_eq!(grace["active"], Value::Boolean(false));
    assert_eq!(grace["profile"], Value::Null);
    assert_eq!(
        grace["joined_at"],
        Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(grace["balance"], Value::Real(3.0));

    // Best-effort: the unparseable document is passed through and reported.
    let mary = &records[3];
    assert_eq!(mary["profile"], Value::from("not json"));
    assert_eq!(mary["age"], Value::Null);
    assert_eq!(
        mary["joined_at"],
        Value::DateTime(Utc.with_ymd_and_hms(2022, 2, 2, 0, 0, 0).unwrap())
    );

    let coercion_misses: Vec<_> = output
        .warnings
        .iter()
        .filter_map(|w| match w {
            SelectWarning::Coercion(miss) => Some((miss.row, miss.column.as_str())),
            SelectWarning::Release(_) => None,
        })
        .collect();
    assert_eq!(coercion_misses, vec![(3, "profile")]);
    assert!(output.warnings.iter().all(|w| w.stage() == Stage::Normalize));
    assert!(!output.release_failed());
}

#[tokio::test]
async fn test_projection() {
    let (datastore, _dir) = sqlite_datastore();

    let output = datastore
        .find(
            "users",
            &Criteria::new()
                .select(["id", "name"])
                .filter(json!({ "id": 3 })),
        )
        .await
        .unwrap();
    assert_eq!(output.records.len(), 1);
    let record = &output.records[0];
    assert_eq!(record.len(), 2);
    assert_eq!(record["name"], Value::from("linus"));
}

#[tokio::test]
async fn test_schema_name_override_is_applied() {
    let (config, _dir) = common::create_temp_db();
    let datastore = sqlite_select::Datastore::open("default", &config)
        .unwrap()
        .with_model(sqlite_select::ModelDefinition::new("users").with_schema_name("archive"))
        .with_table(common::users_table());

    let err = datastore.find("users", &Criteria::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadConnection);
    assert_eq!(err.stage(), Stage::Execute);
    let cause = std::error::Error::source(&err).unwrap().to_string();
    assert!(cause.contains("archive"), "unexpected cause: {cause}");
}

#[tokio::test]
async fn test_translation_fault_is_internal() {
    let (datastore, _dir) = sqlite_datastore();

    let criteria = Criteria::new().filter(json!({ "age": { "~": 1 } }));
    let err = datastore.find("users", &criteria).await.unwrap_err();
    assert!(matches!(
        err,
        SelectError::Internal {
            stage: Stage::Translate,
            ..
        }
    ));
    assert!(err.to_string().contains("unknown operator"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selects_share_the_pool() {
    let (datastore, _dir) = sqlite_datastore();
    let criteria = Criteria::new().filter(json!({ "active": true }));

    let results =
        futures::future::join_all((0..8).map(|_| datastore.find("users", &criteria))).await;
    for result in results {
        assert_eq!(ids(&result.unwrap().records).len(), 3);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference evaluation: the compiled query must agree with evaluating the
// translated statement over the full table in memory.
// ─────────────────────────────────────────────────────────────────────────────

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn like(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like(&text[skip..], rest)),
        Some(('_', rest)) => !text.is_empty() && like(&text[1..], rest),
        Some(('\\', rest)) if !rest.is_empty() => {
            !text.is_empty() && text[0].eq_ignore_ascii_case(&rest[0]) && like(&text[1..], &rest[1..])
        }
        Some((c, rest)) => {
            !text.is_empty() && text[0].eq_ignore_ascii_case(c) && like(&text[1..], rest)
        }
    }
}

fn matches(predicate: &Predicate, row: &Record) -> bool {
    let present = |column: &String| row.get(column).filter(|v| !v.is_null());
    match predicate {
        Predicate::And(parts) => parts.iter().all(|p| matches(p, row)),
        Predicate::Or(parts) => parts.iter().any(|p| matches(p, row)),
        Predicate::Compare { column, op, value } => present(column)
            .and_then(|left| compare(left, value))
            .is_some_and(|ord| match op {
                CompareOp::Equal => ord == Ordering::Equal,
                CompareOp::NotEqual => ord != Ordering::Equal,
                CompareOp::GreaterThan => ord == Ordering::Greater,
                CompareOp::GreaterThanOrEqual => ord != Ordering::Less,
                CompareOp::LessThan => ord == Ordering::Less,
                CompareOp::LessThanOrEqual => ord != Ordering::Greater,
            }),
        Predicate::IsNull { column, negated } => present(column).is_none() != *negated,
        Predicate::InList {
            column,
            values,
            negated,
        } => present(column).is_some_and(|left| {
            values
                .iter()
                .any(|v| compare(left, v) == Some(Ordering::Equal))
                != *negated
        }),
        Predicate::Like { column, pattern } => match present(column) {
            Some(Value::Text(text)) => {
                let text: Vec<char> = text.chars().collect();
                let pattern: Vec<char> = pattern.chars().collect();
                like(&text, &pattern)
            }
            _ => false,
        },
    }
}

/// NULLs sort first, as in SQLite.
fn sort_key_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

fn evaluate(criteria: &Criteria, table: Vec<Record>) -> Vec<Record> {
    let statement = translate("users", criteria).unwrap();
    let mut rows: Vec<Record> = table
        .into_iter()
        .filter(|row| statement.filter.as_ref().map_or(true, |p| matches(p, row)))
        .collect();

    rows.sort_by(|a, b| {
        statement
            .order_by
            .iter()
            .map(|order| {
                let ord = sort_key_cmp(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let offset = statement.offset.unwrap_or(0) as usize;
    let limit = statement.limit.map_or(usize::MAX, |l| l as usize);
    assert_eq!(statement.projection, Projection::All);
    rows.into_iter().skip(offset).take(limit).collect()
}

#[tokio::test]
async fn test_compiled_queries_match_reference_evaluation() {
    init_tracing();
    let (datastore, _dir) = sqlite_datastore();
    let table = datastore
        .find("users", &Criteria::new())
        .await
        .unwrap()
        .records;

    let cases = [
        json!({ "where": { "age": { ">": 30 } }, "sort": "id" }),
        json!({ "where": { "or": [{ "name": "ada" }, { "age": { "<=": 33 } }] }, "sort": "age DESC, id" }),
        json!({ "where": { "age": { "!=": null }, "name": { "contains": "a" } }, "sort": [{ "id": "DESC" }] }),
        json!({ "where": { "id": { "nin": [1, 3] } }, "sort": "id", "limit": 2 }),
        json!({ "where": { "name": { "startsWith": "l" } }, "sort": "id" }),
        json!({ "where": { "name": { "endsWith": "N" } }, "sort": "id" }),
        json!({ "where": { "name": { "like": "mar\\_%" } }, "sort": "id" }),
        json!({ "where": { "age": null } }),
        json!({ "where": { "and": [{ "age": { ">=": 25 } }, { "age": { "<": 50 } }] }, "sort": "id" }),
        json!({ "where": { "id": [2, 4, 6] }, "sort": "id DESC" }),
        json!({ "where": { "age": { "!=": 40 } }, "sort": "id" }),
        json!({ "sort": "age", "skip": 1, "limit": 2 }),
        json!({ "sort": "id", "skip": 3 }),
        json!({ "where": { "or": [] } }),
    ];

    for case in cases {
        let criteria: Criteria = serde_json::from_value(case.clone()).unwrap();
        let expected = evaluate(&criteria, table.clone());
        let actual = datastore.find("users", &criteria).await.unwrap().records;

        let (mut expected_ids, mut actual_ids) = (ids(&expected), ids(&actual));
        if criteria.sort.is_none() {
            expected_ids.sort_unstable();
            actual_ids.sort_unstable();
        }
        assert_eq!(actual_ids, expected_ids, "criteria {case}");
    }
}
