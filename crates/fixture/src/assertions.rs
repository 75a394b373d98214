//! Assertions over fixture documents and query results.
//!
//! Every `assert_*` function panics with a descriptive message on mismatch.
//! The matching `check_*` function returns that message as an `Err` instead,
//! for callers that want to inspect failures.

use crate::canonical::{FIRST_NAME, LAST_NAME, NOTABLE_WORKS, SECOND_NAME};
use crate::procedures::{QueryResultRecord, QUERY_RESULT_KEY};
use docfix_core::{DocumentSnapshot, JsonObject};
use serde_json::Value;

static NULL: Value = Value::Null;

/// Outcome of a `check_*` function.
pub type CheckResult = std::result::Result<(), String>;

fn ensure(condition: bool, message: impl FnOnce() -> String) -> CheckResult {
    if condition {
        Ok(())
    } else {
        Err(message())
    }
}

/// `result["queryResult"]` is a list holding exactly one matching record.
pub fn check_single_list_result(result: &JsonObject, bucket: &str) -> CheckResult {
    let rows = result
        .get(QUERY_RESULT_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("`{}` is missing or not a list", QUERY_RESULT_KEY))?;
    ensure(rows.len() == 1, || {
        format!("expected exactly 1 row, got {}", rows.len())
    })?;
    let record = rows[0]
        .as_object()
        .ok_or_else(|| format!("row is not a map: {}", rows[0]))?;
    check_record_content(record, bucket)
}

/// The first record of `records` holds exactly one matching row.
///
/// Only the first record is consumed.
pub fn check_single_stream_result<I>(records: I, bucket: &str) -> CheckResult
where
    I: IntoIterator<Item = QueryResultRecord>,
{
    let first = records
        .into_iter()
        .next()
        .ok_or_else(|| "query stream is empty".to_string())?;
    let rows = &first.query_result;
    ensure(rows.len() == 1, || {
        format!("expected exactly 1 row, got {}", rows.len())
    })?;
    check_record_content(&rows[0], bucket)
}

/// `record[bucket]` is a map holding the canonical document.
pub fn check_record_content(record: &JsonObject, bucket: &str) -> CheckResult {
    let content = record
        .get(bucket)
        .and_then(Value::as_object)
        .ok_or_else(|| format!("record has no map under `{}`", bucket))?;
    let field = |name: &str| content.get(name).unwrap_or(&NULL);
    check_document_content(
        field("firstName"),
        field("secondName"),
        field("lastName"),
        field("notableWorks"),
    )
}

/// The four fields equal the canonical document's.
///
/// `notable_works` must be a list of exactly the five canonical works, in any
/// order.
pub fn check_document_content(
    first_name: &Value,
    second_name: &Value,
    last_name: &Value,
    notable_works: &Value,
) -> CheckResult {
    for (name, actual, expected) in [
        ("firstName", first_name, FIRST_NAME),
        ("secondName", second_name, SECOND_NAME),
        ("lastName", last_name, LAST_NAME),
    ] {
        ensure(actual.as_str() == Some(expected), || {
            format!("{}: expected {:?}, got {}", name, expected, actual)
        })?;
    }

    let works = notable_works
        .as_array()
        .ok_or_else(|| format!("notableWorks is not a list: {}", notable_works))?;
    ensure(works.len() == NOTABLE_WORKS.len(), || {
        format!(
            "notableWorks: expected {} entries, got {}",
            NOTABLE_WORKS.len(),
            works.len()
        )
    })?;
    for expected in NOTABLE_WORKS {
        ensure(works.iter().any(|w| w.as_str() == Some(expected)), || {
            format!("notableWorks is missing {:?}", expected)
        })?;
    }
    Ok(())
}

/// Metadata equals what was captured when the document was written.
pub fn check_document_metadata(
    expected: &DocumentSnapshot,
    id: &str,
    expiry: u32,
    cas: u64,
    mutation_token: &JsonObject,
) -> CheckResult {
    ensure(expected.id == id, || {
        format!("id: expected {:?}, got {:?}", expected.id, id)
    })?;
    ensure(expected.expiry == expiry, || {
        format!("expiry: expected {}, got {}", expected.expiry, expiry)
    })?;
    ensure(expected.cas == cas, || {
        format!("cas: expected {}, got {}", expected.cas, cas)
    })?;
    let token = expected.mutation_token_map();
    ensure(&token == mutation_token, || {
        format!(
            "mutation token: expected {}, got {}",
            Value::Object(token.clone()),
            Value::Object(mutation_token.clone())
        )
    })
}

fn or_panic(result: CheckResult) {
    if let Err(message) = result {
        panic!("{}", message);
    }
}

/// Panicking form of [`check_single_list_result`].
#[track_caller]
pub fn assert_single_list_result(result: &JsonObject, bucket: &str) {
    or_panic(check_single_list_result(result, bucket));
}

/// Panicking form of [`check_single_stream_result`].
#[track_caller]
pub fn assert_single_stream_result<I>(records: I, bucket: &str)
where
    I: IntoIterator<Item = QueryResultRecord>,
{
    or_panic(check_single_stream_result(records, bucket));
}

/// Panicking form of [`check_record_content`].
#[track_caller]
pub fn assert_record_content(record: &JsonObject, bucket: &str) {
    or_panic(check_record_content(record, bucket));
}

/// Panicking form of [`check_document_content`].
#[track_caller]
pub fn assert_document_content(
    first_name: &Value,
    second_name: &Value,
    last_name: &Value,
    notable_works: &Value,
) {
    or_panic(check_document_content(
        first_name,
        second_name,
        last_name,
        notable_works,
    ));
}

/// Panicking form of [`check_document_metadata`].
#[track_caller]
pub fn assert_document_metadata(
    expected: &DocumentSnapshot,
    id: &str,
    expiry: u32,
    cas: u64,
    mutation_token: &JsonObject,
) {
    or_panic(check_document_metadata(
        expected,
        id,
        expiry,
        cas,
        mutation_token,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_document;
    use docfix_core::MutationToken;
    use proptest::prelude::*;
    use serde_json::json;

    fn record_with(content: JsonObject) -> JsonObject {
        let mut record = JsonObject::new();
        record.insert("mybucket".into(), Value::Object(content));
        record
    }

    fn works_record(works: Vec<&str>) -> JsonObject {
        let mut content = canonical_document();
        content.insert("notableWorks".into(), json!(works));
        record_with(content)
    }

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            id: "artist:vincent_van_gogh".into(),
            expiry: 0,
            cas: 1_700_000_000_000_000_001,
            mutation_token: Some(MutationToken {
                bucket: "mybucket".into(),
                vbucket_id: 115,
                vbucket_uuid: 0x5eed,
                sequence_number: 1,
            }),
        }
    }

    proptest! {
        #[test]
        fn any_permutation_of_works_is_accepted(works in Just(NOTABLE_WORKS.to_vec()).prop_shuffle()) {
            prop_assert!(check_record_content(&works_record(works), "mybucket").is_ok());
        }

        #[test]
        fn dropping_a_work_is_rejected(
            works in Just(NOTABLE_WORKS.to_vec()).prop_shuffle(),
            missing in 0usize..5,
        ) {
            let mut works = works;
            works.remove(missing);
            prop_assert!(check_record_content(&works_record(works), "mybucket").is_err());
        }
    }

    #[test]
    fn canonical_record_passes() {
        assert_record_content(&record_with(canonical_document()), "mybucket");
    }

    #[test]
    fn unexpected_work_is_rejected() {
        let err = check_record_content(
            &works_record(vec![
                "Starry Night",
                "Sunflowers",
                "Bedroom in Arles",
                "Portrait of Dr Gachet",
                "The Potato Eaters",
            ]),
            "mybucket",
        )
        .unwrap_err();
        assert!(err.contains("Sorrow"), "{}", err);
    }

    #[test]
    fn six_works_are_rejected() {
        let mut works = NOTABLE_WORKS.to_vec();
        works.push("Sorrow");
        let err = check_record_content(&works_record(works), "mybucket").unwrap_err();
        assert!(err.contains("expected 5 entries, got 6"), "{}", err);
    }

    #[test]
    fn wrong_name_and_wrong_bucket_are_rejected() {
        let mut content = canonical_document();
        content.insert("secondName".into(), json!("Theo"));
        assert!(check_record_content(&record_with(content), "mybucket").is_err());
        assert!(check_record_content(&record_with(canonical_document()), "other").is_err());
    }

    #[test]
    fn list_result_needs_exactly_one_row() {
        let row = Value::Object(record_with(canonical_document()));
        let mut result = JsonObject::new();
        result.insert(QUERY_RESULT_KEY.into(), json!([row.clone()]));
        assert_single_list_result(&result, "mybucket");

        result.insert(QUERY_RESULT_KEY.into(), json!([row.clone(), row]));
        assert!(check_single_list_result(&result, "mybucket").is_err());
        assert!(check_single_list_result(&JsonObject::new(), "mybucket").is_err());
    }

    #[test]
    fn stream_result_uses_first_record() {
        let record = QueryResultRecord {
            query_result: vec![record_with(canonical_document())],
        };
        assert_single_stream_result(vec![record], "mybucket");

        let err = check_single_stream_result(Vec::new(), "mybucket").unwrap_err();
        assert_eq!(err, "query stream is empty");
    }

    #[test]
    fn metadata_must_match_exactly() {
        let expected = snapshot();
        let token = expected.mutation_token_map();
        assert_document_metadata(&expected, "artist:vincent_van_gogh", 0, expected.cas, &token);

        assert!(check_document_metadata(&expected, "artist:other", 0, expected.cas, &token).is_err());
        assert!(check_document_metadata(&expected, &expected.id, 60, expected.cas, &token).is_err());
        assert!(
            check_document_metadata(&expected, &expected.id, 0, expected.cas + 1, &token).is_err()
        );

        let mut other = token.clone();
        other.insert("sequenceNumber".into(), json!(2));
        assert!(check_document_metadata(&expected, &expected.id, 0, expected.cas, &other).is_err());
    }

    #[test]
    #[should_panic(expected = "cas: expected")]
    fn metadata_assertion_panics() {
        let expected = snapshot();
        assert_document_metadata(&expected, &expected.id, 0, 42, &expected.mutation_token_map());
    }
}
