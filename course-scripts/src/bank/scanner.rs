//! Pages through an address's owned objects looking for one of a given type

use ledger_client::{Address, LedgerClient, LedgerClientError, ObjectId};
use tracing::{debug, info};

use crate::error::ScriptError;

/// The result of looking up an owned object by type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectLookup {
    /// The first object of the type, in page order
    Found(ObjectId),
    /// Every page was examined and none held an object of the type
    NotFound,
}

/// Find the first object owned by `owner` whose type is exactly `type_tag`
///
/// Pages are requested one at a time, starting without a cursor and
/// following each page's `next_cursor`. Scanning stops at the first match;
/// otherwise it continues until the node reports no further pages. Query
/// errors are returned as-is, without a partial result
pub async fn find_owned_object<C: LedgerClient + ?Sized>(
    client: &C,
    owner: Address,
    type_tag: &str,
) -> Result<ObjectLookup, ScriptError> {
    if type_tag.is_empty() {
        return Err(ScriptError::config("empty type tag"));
    }

    let mut cursor = None;
    let mut page_idx = 0usize;
    loop {
        let page = client
            .list_owned_objects(owner, cursor, Some(type_tag))
            .await
            .map_err(ScriptError::query)?;
        debug!("scanned page {page_idx} of {owner}: {} objects", page.data.len());

        if let Some(object) = page.data.iter().find(|object| object.has_type(type_tag)) {
            info!("found {type_tag} at {}", object.object_id);
            return Ok(ObjectLookup::Found(object.object_id));
        }

        if !page.has_next_page {
            info!("{owner} owns no {type_tag}");
            return Ok(ObjectLookup::NotFound);
        }

        // Re-requesting from the start would loop forever
        let Some(next) = page.next_cursor else {
            let msg = format!("page {page_idx} reports more pages but no cursor");
            return Err(ScriptError::query(LedgerClientError::parsing(msg)));
        };

        cursor = Some(next);
        page_idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use ledger_client::{OwnedObject, mock::MockLedger};

    use super::*;

    /// The type tag the tests scan for
    const ACCOUNT_TYPE: &str = "0x5::bank::Account";
    /// A type tag the tests use for non-matching objects
    const COIN_TYPE: &str = "0x2::coin::Coin<0x2::sui::SUI>";

    /// Build an owned object with the given id and type
    fn object(id: &str, type_tag: &str) -> OwnedObject {
        OwnedObject::new(id.parse().unwrap(), type_tag)
    }

    /// The owner used in tests
    fn owner() -> Address {
        "0x1".parse().unwrap()
    }

    /// Tests that an address owning nothing is scanned with a single request
    #[tokio::test]
    async fn test_no_owned_objects() {
        let ledger = MockLedger::default();

        let lookup = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap();
        assert_eq!(lookup, ObjectLookup::NotFound);
        assert_eq!(ledger.page_requests().await, vec![None]);
    }

    /// Tests finding a match on the second page
    #[tokio::test]
    async fn test_match_on_second_page() {
        let ledger = MockLedger::default().with_pages(vec![
            vec![object("0xa1", COIN_TYPE)],
            vec![object("0xa2", COIN_TYPE), object("0xa3", ACCOUNT_TYPE)],
        ]);

        let lookup = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap();
        assert_eq!(lookup, ObjectLookup::Found("0xa3".parse().unwrap()));
        assert_eq!(ledger.page_requests().await.len(), 2);
    }

    /// Tests that scanning stops at the first match, in page then in-page
    /// order
    #[tokio::test]
    async fn test_stops_at_first_match() {
        let ledger = MockLedger::default().with_pages(vec![
            vec![object("0xa1", COIN_TYPE)],
            vec![object("0xa2", ACCOUNT_TYPE), object("0xa3", ACCOUNT_TYPE)],
            vec![object("0xa4", ACCOUNT_TYPE)],
        ]);

        let lookup = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap();
        assert_eq!(lookup, ObjectLookup::Found("0xa2".parse().unwrap()));

        let requests = ledger.page_requests().await;
        assert_eq!(requests, vec![None, Some("cursor-1".to_string())]);
    }

    /// Tests that every page is requested exactly once before concluding
    /// that no object matches
    #[tokio::test]
    async fn test_exhausts_every_page() {
        let ledger = MockLedger::default().with_pages(vec![
            vec![object("0xa1", COIN_TYPE)],
            vec![],
            vec![object("0xa2", COIN_TYPE)],
        ]);

        let lookup = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap();
        assert_eq!(lookup, ObjectLookup::NotFound);

        let requests = ledger.page_requests().await;
        let expected = vec![None, Some("cursor-1".to_string()), Some("cursor-2".to_string())];
        assert_eq!(requests, expected);
    }

    /// Tests that types are matched exactly, not by prefix
    #[tokio::test]
    async fn test_exact_type_match() {
        let ledger = MockLedger::default().with_pages(vec![vec![
            object("0xa1", "0x5::bank::AccountCap"),
            object("0xa2", "0x5::bank::Account<u64>"),
        ]]);

        let lookup = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap();
        assert_eq!(lookup, ObjectLookup::NotFound);
    }

    /// Tests that a failing page request is surfaced as a query error
    #[tokio::test]
    async fn test_query_failure() {
        let ledger = MockLedger::default()
            .with_pages(vec![vec![object("0xa1", COIN_TYPE)], vec![object("0xa2", ACCOUNT_TYPE)]])
            .with_failing_page(1);

        let err = find_owned_object(&ledger, owner(), ACCOUNT_TYPE).await.unwrap_err();
        assert!(matches!(err, ScriptError::Query(_)));
    }
}
