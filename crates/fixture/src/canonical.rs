//! The canonical seed document.

use docfix_core::JsonObject;
use serde_json::{json, Value};

/// Key of the seeded document.
pub const DOCUMENT_ID: &str = "artist:vincent_van_gogh";

/// `firstName` of the seeded document.
pub const FIRST_NAME: &str = "Vincent";

/// `secondName` of the seeded document.
pub const SECOND_NAME: &str = "Willem";

/// `lastName` of the seeded document.
pub const LAST_NAME: &str = "Van Gogh";

/// `notableWorks` of the seeded document, in seed order.
pub const NOTABLE_WORKS: [&str; 5] = [
    "Starry Night",
    "Sunflowers",
    "Bedroom in Arles",
    "Portrait of Dr Gachet",
    "Sorrow",
];

/// Content of the seeded document.
pub fn canonical_document() -> JsonObject {
    let mut content = JsonObject::new();
    content.insert("firstName".into(), json!(FIRST_NAME));
    content.insert("secondName".into(), json!(SECOND_NAME));
    content.insert("lastName".into(), json!(LAST_NAME));
    content.insert(
        "notableWorks".into(),
        Value::Array(NOTABLE_WORKS.iter().map(|w| json!(w)).collect()),
    );
    content
}

/// Statement that should find exactly the seeded document in `bucket`.
pub fn verification_statement(bucket: &str) -> String {
    format!(
        "select * from {} where lastName = '{}'",
        quote_identifier(bucket),
        LAST_NAME
    )
}

// Plain identifiers stay bare; anything else (e.g. `-`) is backtick quoted.
fn quote_identifier(name: &str) -> String {
    let bare = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        name.to_string()
    } else {
        format!("`{}`", name)
    }
}
