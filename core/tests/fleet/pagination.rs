use std::sync::Arc;

use deskfleet::{
    config::Config,
    fleet::{FleetErrorKind, decode_cursor},
};

use crate::support::{fleet_over, fleet_with, tenant};

#[test]
fn configured_default_page_size_applies_without_cursor() {
    let directory = Arc::new(tenant());
    let mut config = Config::default();
    config.pagination.default_page_size = 4;
    let fleet = fleet_with(config, &directory);

    let page = fleet
        .paginate((0..10).collect(), None, None)
        .expect("first page");
    assert_eq!(page.items, vec![0, 1, 2, 3]);
    assert_eq!(page.page_size, 4);
    assert_eq!(page.current_page, 1);
    assert!(page.has_more);
}

#[test]
fn cursor_walk_visits_every_item_once() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);
    let items: Vec<u32> = (0..120).collect();

    let mut seen = Vec::new();
    let mut sizes = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fleet
            .paginate(items.clone(), cursor.as_deref(), Some(50))
            .expect("page decodes");
        assert_eq!(page.total_count, 120);
        sizes.push(page.items.len());
        seen.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(seen, items);
}

#[test]
fn cursor_pins_the_page_size() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let first = fleet
        .paginate((0..30).collect::<Vec<u32>>(), None, Some(10))
        .expect("first page");
    let token = first.next_cursor.expect("more pages follow");
    let decoded = decode_cursor(&token).expect("cursor is well formed");
    assert_eq!((decoded.skip, decoded.page_size, decoded.total_count), (10, 10, 30));

    let second = fleet
        .paginate((0..30).collect::<Vec<u32>>(), Some(&token), Some(25))
        .expect("second page");
    assert_eq!(second.items, (10..20).collect::<Vec<u32>>());
    assert_eq!(second.current_page, 2);
}

#[test]
fn empty_collection_has_a_single_empty_page() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let page = fleet
        .paginate(Vec::<u32>::new(), None, None)
        .expect("empty page");
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[test]
fn tampered_cursor_is_rejected() {
    let directory = Arc::new(tenant());
    let fleet = fleet_over(&directory);

    let err = fleet
        .paginate(vec![1, 2, 3], Some("definitely-not-a-cursor"), None)
        .expect_err("cursor must be rejected");
    assert_eq!(err.kind, FleetErrorKind::InvalidCursor);
    assert_eq!(err.message, "Invalid cursor format");
}
