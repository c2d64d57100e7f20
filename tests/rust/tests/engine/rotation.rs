//! Size-based rotation of latest.log

use blog_core::{ConfigUpdate, LATEST_LOG};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tests::files;
use tests::harness::TestLogger;

/// `YYYY-MM-DD_HH-MM-SS.log` or `YYYY-MM-DD_HH-MM-SS_xxxxxxxx.log`
fn is_rotated_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(".log") else {
        return false;
    };
    let (stamp, suffix) = match stem.len() {
        19 => (stem, None),
        28 => (&stem[..19], Some(&stem[20..])),
        _ => return false,
    };
    let stamp_ok = stamp.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 | 13 | 16 => b == b'-',
        10 => b == b'_',
        _ => b.is_ascii_digit(),
    });
    let suffix_ok = suffix.map_or(true, |s| {
        s.len() == 8 && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    });
    stamp_ok && suffix_ok
}

#[tokio::test]
async fn test_three_large_messages_produce_three_files() {
    let t = TestLogger::with_config(|c| {
        c.max_file_bytes = 100;
        c.max_buffer_bytes = 100;
        c.console = None;
    });

    for fill in ['a', 'b', 'c'] {
        t.logger
            .info(fill.to_string().repeat(1400))
            .await
            .unwrap();
    }
    t.logger.shutdown(Duration::from_secs(1)).await.unwrap();

    let names = files::list(t.path());
    assert_eq!(names.len(), 3, "files: {names:?}");
    assert!(names.contains(&LATEST_LOG.to_string()));

    let rotated = files::rotated(t.path());
    assert_eq!(rotated.len(), 2);
    assert!(rotated.iter().all(|n| is_rotated_name(n)), "rotated: {rotated:?}");

    let latest = files::latest_messages(t.path());
    assert_eq!(latest, vec!["c".repeat(1400)]);
}

#[tokio::test]
async fn test_rotation_boundary_rotates_exactly_once() {
    let t = TestLogger::with_config(|c| {
        c.max_file_bytes = 200;
        c.console = None;
    });

    // Fill latest.log past the limit; the first write itself never rotates.
    t.logger.info("x".repeat(200)).await.unwrap();
    t.sync_flush().await;
    assert!(files::rotated(t.path()).is_empty());
    let before = files::latest(t.path());

    t.logger.info("after rotation").await.unwrap();
    t.sync_flush().await;

    let rotated = files::rotated(t.path());
    assert_eq!(rotated.len(), 1);
    assert_eq!(
        std::fs::read_to_string(t.path().join(&rotated[0])).unwrap(),
        before
    );
    assert_eq!(
        files::latest_messages(t.path()),
        vec!["after rotation".to_string()]
    );
}

#[tokio::test]
async fn test_under_limit_appends_without_rotation() {
    let t = TestLogger::with_config(|c| c.max_file_bytes = 10_000);

    for i in 0..3 {
        t.logger.info(format!("entry {i}")).await.unwrap();
        t.sync_flush().await;
    }

    assert!(files::rotated(t.path()).is_empty());
    assert_eq!(files::latest_messages(t.path()).len(), 3);
}

#[tokio::test]
async fn test_lowering_max_file_bytes_takes_effect() {
    let t = TestLogger::new();

    t.logger.info("under the default limit").await.unwrap();
    t.sync_flush().await;
    assert!(files::rotated(t.path()).is_empty());

    t.logger
        .update_config(ConfigUpdate::new().max_file_bytes(10))
        .await
        .unwrap();
    t.logger.info("now over it").await.unwrap();
    t.sync_flush().await;

    assert_eq!(files::rotated(t.path()).len(), 1);
    assert_eq!(files::latest_messages(t.path()), vec!["now over it".to_string()]);
}

#[test]
fn test_rotated_name_shape() {
    assert!(is_rotated_name("2024-03-09_12-05-07.log"));
    assert!(is_rotated_name("2024-03-09_12-05-07_Ab-_9xYz.log"));
    assert!(!is_rotated_name("latest.log"));
    assert!(!is_rotated_name("2024-03-09_12-05-07_short.log"));
}
