use chrono::NaiveDate;
use wpbackup_core::retention::{parse_archive_record, select_expired};
use wpbackup_core::{RetentionManager, RetentionPolicy};

mod helpers;
use helpers::{setup_tracing, RecordingStore};

/// `count` daily archives for `site`, the oldest on 2024-03-01.
fn daily_archives(site: &str, count: u32) -> Vec<String> {
    (0..count)
        .map(|day| format!("{}_2024-03-{:02}-02-30-00.tar.gz", site, day + 1))
        .collect()
}

#[test]
fn it_parses_the_timestamp_suffix() {
    let record = parse_archive_record("my_site_2024-03-05-14-07-59.tar.gz").unwrap();

    assert_eq!(record.name, "my_site_2024-03-05-14-07-59.tar.gz");
    assert_eq!(
        record.timestamp,
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 7, 59).unwrap()
    );
}

#[test]
fn it_ignores_names_without_a_valid_suffix() {
    for name in [
        "README.md",
        "mysite_2024-03-05.tar.gz",
        "mysite_2024-13-05-14-07-59.tar.gz",
        "mysite_2024-03-05-14-07-59",
        "mysite_2024-03-05-14-07-59.",
        "notes-2024-03-05-14-07-59.txt",
    ] {
        assert!(parse_archive_record(name).is_none(), "{} should not parse", name);
    }
}

#[test]
fn it_selects_the_oldest_when_exactly_at_the_limit() {
    let mut names = daily_archives("mysite", 7);
    names.reverse();
    names.push("unrelated.txt".to_string());

    let expired = select_expired(&names, 7, RetentionPolicy::Exact);

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].name, "mysite_2024-03-01-02-30-00.tar.gz");
}

#[test]
fn it_selects_nothing_below_or_above_the_limit_with_exact_policy() {
    setup_tracing();
    assert!(select_expired(&daily_archives("mysite", 6), 7, RetentionPolicy::Exact).is_empty());
    assert!(select_expired(&daily_archives("mysite", 8), 7, RetentionPolicy::Exact).is_empty());
}

#[test]
fn it_trims_down_to_make_room_with_ceiling_policy() {
    let expired = select_expired(&daily_archives("mysite", 9), 7, RetentionPolicy::Ceiling);

    let names: Vec<_> = expired.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "mysite_2024-03-01-02-30-00.tar.gz",
            "mysite_2024-03-02-02-30-00.tar.gz",
            "mysite_2024-03-03-02-30-00.tar.gz",
        ]
    );
    assert!(select_expired(&daily_archives("mysite", 6), 7, RetentionPolicy::Ceiling).is_empty());
}

#[test]
fn it_deletes_exactly_the_oldest_key() {
    setup_tracing();
    // A non-archive object that embeds the oldest timestamp must never be the one deleted.
    let mut keys = daily_archives("mysite", 7);
    keys.push("notes-2024-03-01-02-30-00.txt".to_string());
    let store = RecordingStore::with_keys(keys);

    let deleted = RetentionManager::new(&store, 7, RetentionPolicy::Exact).prune().unwrap();

    assert_eq!(deleted, ["mysite_2024-03-01-02-30-00.tar.gz"]);
    assert_eq!(*store.deletes.borrow(), ["mysite_2024-03-01-02-30-00.tar.gz"]);
    assert!(store.keys().contains(&"notes-2024-03-01-02-30-00.txt".to_string()));
}

#[test]
fn it_makes_no_calls_to_delete_when_under_the_limit() {
    let store = RecordingStore::with_keys(daily_archives("mysite", 6));

    let deleted = RetentionManager::new(&store, 7, RetentionPolicy::Exact).prune().unwrap();

    assert!(deleted.is_empty());
    assert!(store.deletes.borrow().is_empty());
}
