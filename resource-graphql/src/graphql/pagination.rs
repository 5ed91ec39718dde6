//! Paginated collection envelopes.
//!
//! Cursor pagination follows the Relay connection shape:
//!
//! ```graphql
//! {
//!   totalCount
//!   edges { node cursor }
//!   pageInfo { startCursor endCursor hasNextPage hasPreviousPage }
//! }
//! ```
//!
//! A cursor is the base64 encoding of the decimal offset of an item within the full collection.
//! Cursors are opaque to clients, but they are stable: the same offset always encodes to the same
//! cursor. Page pagination wraps the page in `{ collection paginationInfo }` instead.

use super::{
    error::Error, object, operation::PaginationType, type_system::PageState, Map, Name, Value,
};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Encode the offset `offset` as a cursor.
pub fn encode_cursor(offset: u64) -> String {
    STANDARD.encode(offset.to_string())
}

/// Decode a cursor into the offset it encodes.
pub fn decode_cursor(cursor: &str) -> Result<u64, Error> {
    let invalid = || Error::InvalidCursor {
        cursor: cursor.to_string(),
    };
    if cursor.is_empty() {
        return Err(invalid());
    }
    let bytes = STANDARD.decode(cursor).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.parse().map_err(|_| invalid())
}

fn cursor_arg<'a>(args: &'a Map, name: &str) -> Option<&'a str> {
    match args.get(name) {
        Some(Value::String(cursor)) => Some(cursor.as_str()),
        _ => None,
    }
}

fn count_arg(args: &Map, name: &str) -> Option<u64> {
    match args.get(name) {
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    }
}

/// The offset of the first item of a page of `count` items, given the `after`/`before`/`last`
/// arguments.
///
/// An `after` cursor so large that the page would run past the last representable offset is
/// invalid.
fn page_offset(args: &Map, count: u64, total: Option<u64>) -> Result<u64, Error> {
    let mut offset = 0;
    if let Some(after) = cursor_arg(args, "after") {
        offset = decode_cursor(after)?
            .checked_add(1)
            .filter(|offset| offset.checked_add(count).is_some())
            .ok_or_else(|| Error::InvalidCursor {
                cursor: after.to_string(),
            })?;
    }
    if let Some(total) = total {
        if let Some(before) = cursor_arg(args, "before") {
            offset = decode_cursor(before)?.saturating_sub(count);
        } else if let Some(last) = count_arg(args, "last") {
            offset = total.saturating_sub(last);
        }
    }
    Ok(offset)
}

/// Build a cursor envelope around the normalized `nodes` of one page.
///
/// `page` is the paginator of the page. A partial paginator does not know the total, so the
/// envelope has no `totalCount` and `hasNextPage` is decided by whether the page is full.
pub fn cursor_page(nodes: Vec<Value>, page: &PageState, args: &Map) -> Result<Value, Error> {
    let count = nodes.len() as u64;
    let offset = page_offset(args, count, page.total_items)?;

    let ipp = page.items_per_page;
    let (total, has_next_page) = match page.total_items {
        Some(total) => {
            let first = if ipp > 0 { offset % ipp } else { offset };
            (
                total,
                first.saturating_add(ipp.saturating_mul(page.current_page)) < total,
            )
        }
        None => (1, count == ipp && ipp > 0),
    };
    if total == 0 {
        return Ok(empty_page(PaginationType::Cursor));
    }

    let edges = nodes
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            object([
                ("node", node),
                ("cursor", Value::from(encode_cursor(offset.saturating_add(i as u64)))),
            ])
        })
        .collect();
    let end = offset.saturating_add(count).saturating_sub(1);
    let mut envelope = Map::new();
    if page.total_items.is_some() {
        envelope.insert(Name::new("totalCount"), Value::from(total));
    }
    envelope.insert(Name::new("edges"), Value::List(edges));
    envelope.insert(
        Name::new("pageInfo"),
        object([
            ("startCursor", Value::from(encode_cursor(offset))),
            ("endCursor", Value::from(encode_cursor(end))),
            ("hasNextPage", Value::from(has_next_page)),
            ("hasPreviousPage", Value::from(offset > 0)),
        ]),
    );
    Ok(Value::Object(envelope))
}

/// Build a page-number envelope around the normalized `nodes` of one page.
///
/// The paginator must know the total number of items.
pub fn page_based(nodes: Vec<Value>, page: &PageState) -> Result<Value, Error> {
    let (Some(total), Some(last_page)) = (page.total_items, page.last_page()) else {
        return Err(Error::contract(
            "Collection returned by the collection data provider must implement a paginator with a known total for page-based pagination.",
        ));
    };
    Ok(object([
        ("collection", Value::List(nodes)),
        (
            "paginationInfo",
            object([
                ("itemsPerPage", Value::from(page.items_per_page)),
                ("totalCount", Value::from(total)),
                ("lastPage", Value::from(last_page)),
            ]),
        ),
    ]))
}

/// The envelope of an empty page.
pub fn empty_page(kind: PaginationType) -> Value {
    match kind {
        PaginationType::Cursor => object([
            ("totalCount", Value::from(0)),
            ("edges", Value::List(vec![])),
            (
                "pageInfo",
                object([
                    ("startCursor", Value::Null),
                    ("endCursor", Value::Null),
                    ("hasNextPage", Value::from(false)),
                    ("hasPreviousPage", Value::from(false)),
                ]),
            ),
        ]),
        PaginationType::Page => object([
            ("collection", Value::List(vec![])),
            (
                "paginationInfo",
                object([
                    ("itemsPerPage", Value::from(0)),
                    ("totalCount", Value::from(0)),
                    ("lastPage", Value::from(0)),
                ]),
            ),
        ]),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphql::{backend::mock::map, error::ErrorKind, value};
    use proptest::prelude::*;

    fn nodes(n: usize) -> Vec<Value> {
        (0..n).map(|i| value!({ "id": i })).collect()
    }

    fn page_info(envelope: &Value) -> Map {
        let Value::Object(envelope) = envelope else {
            panic!("expected an object")
        };
        map(envelope["pageInfo"].clone())
    }

    #[test]
    fn test_known_cursors() {
        assert_eq!(encode_cursor(0), "MA==");
        assert_eq!(encode_cursor(9), "OQ==");
        assert_eq!(encode_cursor(10), "MTA=");
        assert_eq!(decode_cursor("MTA=").unwrap(), 10);
    }

    #[test]
    fn test_invalid_cursors() {
        for cursor in ["", "not base64!", "YWJj"] {
            let err = decode_cursor(cursor).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Caller);
            assert_eq!(err.to_string(), format!("Cursor \"{cursor}\" is invalid."));
        }
    }

    #[test]
    fn test_first_page() {
        let envelope = cursor_page(nodes(3), &PageState::new(1, 3, 10), &Map::new()).unwrap();
        assert_eq!(
            envelope,
            value!({
                "totalCount": 10,
                "edges": [
                    { "node": { "id": 0 }, "cursor": "MA==" },
                    { "node": { "id": 1 }, "cursor": "MQ==" },
                    { "node": { "id": 2 }, "cursor": "Mg==" }
                ],
                "pageInfo": {
                    "startCursor": "MA==",
                    "endCursor": "Mg==",
                    "hasNextPage": true,
                    "hasPreviousPage": false
                }
            })
        );
    }

    #[test]
    fn test_after_cursor() {
        let args = map(value!({ "after": encode_cursor(2) }));
        let envelope = cursor_page(nodes(3), &PageState::new(2, 3, 10), &args).unwrap();
        let info = page_info(&envelope);
        assert_eq!(info["startCursor"], Value::from(encode_cursor(3)));
        assert_eq!(info["endCursor"], Value::from(encode_cursor(5)));
        assert_eq!(info["hasPreviousPage"], Value::from(true));
        assert_eq!(info["hasNextPage"], Value::from(true));
    }

    #[test]
    fn test_last_page() {
        let args = map(value!({ "last": 2 }));
        let envelope = cursor_page(nodes(2), &PageState::new(5, 2, 10), &args).unwrap();
        let info = page_info(&envelope);
        assert_eq!(info["startCursor"], Value::from(encode_cursor(8)));
        assert_eq!(info["endCursor"], Value::from(encode_cursor(9)));
        assert_eq!(info["hasNextPage"], Value::from(false));
    }

    #[test]
    fn test_before_cursor_clamps_at_zero() {
        let args = map(value!({ "before": encode_cursor(1) }));
        let envelope = cursor_page(nodes(3), &PageState::new(1, 3, 10), &args).unwrap();
        assert_eq!(page_info(&envelope)["startCursor"], Value::from(encode_cursor(0)));
    }

    #[test]
    fn test_invalid_after_cursor() {
        let args = map(value!({ "after": "garbage" }));
        let err = cursor_page(nodes(1), &PageState::new(1, 3, 10), &args).unwrap_err();
        assert_eq!(err.to_string(), "Cursor \"garbage\" is invalid.");
    }

    #[test]
    fn test_after_cursor_past_last_offset() {
        for after in [u64::MAX, u64::MAX - 1] {
            let cursor = encode_cursor(after);
            let args = map(value!({ "after": cursor.clone() }));
            let err = cursor_page(nodes(2), &PageState::new(1, 2, 10), &args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Caller);
            assert_eq!(err.to_string(), format!("Cursor \"{cursor}\" is invalid."));
        }
    }

    #[test]
    fn test_after_cursor_near_last_offset() {
        let args = map(value!({ "after": encode_cursor(u64::MAX - 3) }));
        let envelope = cursor_page(nodes(2), &PageState::new(1, 2, 10), &args).unwrap();
        let info = page_info(&envelope);
        assert_eq!(info["startCursor"], Value::from(encode_cursor(u64::MAX - 2)));
        assert_eq!(info["endCursor"], Value::from(encode_cursor(u64::MAX - 1)));
        assert_eq!(info["hasPreviousPage"], Value::from(true));
    }

    #[test]
    fn test_partial_paginator() {
        let envelope = cursor_page(nodes(2), &PageState::partial(1, 2), &Map::new()).unwrap();
        let Value::Object(fields) = &envelope else {
            panic!("expected an object")
        };
        assert!(!fields.contains_key("totalCount"));
        assert_eq!(page_info(&envelope)["hasNextPage"], Value::from(true));

        let envelope = cursor_page(nodes(1), &PageState::partial(1, 2), &Map::new()).unwrap();
        assert_eq!(page_info(&envelope)["hasNextPage"], Value::from(false));
    }

    #[test]
    fn test_empty_total() {
        let envelope = cursor_page(vec![], &PageState::new(1, 3, 0), &Map::new()).unwrap();
        assert_eq!(envelope, empty_page(PaginationType::Cursor));
    }

    #[test]
    fn test_page_based() {
        let envelope = page_based(nodes(1), &PageState::new(3, 2, 5)).unwrap();
        assert_eq!(
            envelope,
            value!({
                "collection": [{ "id": 0 }],
                "paginationInfo": { "itemsPerPage": 2, "totalCount": 5, "lastPage": 3 }
            })
        );

        let err = page_based(nodes(1), &PageState::partial(1, 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);
    }

    proptest! {
        #[test]
        fn proptest_cursor_round_trip(offset in any::<u64>()) {
            prop_assert_eq!(decode_cursor(&encode_cursor(offset)).unwrap(), offset);
        }
    }
}
