mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tideq::queue::{DirLease, SystemClock};
use tideq::{FileQueueService, QueueError, QueueService};

const TIMEOUT: Duration = Duration::from_secs(30);

fn record(root: &std::path::Path, queue: &str) -> String {
    std::fs::read_to_string(root.join(queue).join("messages")).unwrap()
}

#[test]
fn test_root_must_be_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain-file");
    std::fs::write(&file, "").unwrap();

    assert!(matches!(
        FileQueueService::new(dir.path().join("missing"), TIMEOUT),
        Err(QueueError::Io(_))
    ));
    assert!(FileQueueService::new(&file, TIMEOUT).is_err());
    assert!(FileQueueService::new(dir.path(), TIMEOUT).is_ok());
}

#[tokio::test]
async fn test_push_writes_one_line_per_message() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);

    service.push("Test Queue 1", "msg1").await.unwrap();
    service.push("Test Queue 1", "msg2").await.unwrap();

    let contents = record(root.path(), "Test Queue 1");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(contents.ends_with('\n'));
    assert!(lines[0].starts_with(&format!("{}:msg1:30:", common::START_MS)));
    assert!(lines[1].starts_with(&format!("{}:msg2:30:", common::START_MS)));
    assert_eq!(service.size("Test Queue 1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_pull_rewrites_deadline_in_place() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);

    service.push("q", "a").await.unwrap();
    service.push("q", "b").await.unwrap();
    let a = service.pull("q").await.unwrap().unwrap();

    let contents = record(root.path(), "q");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], format!("{}:a:30:{}", common::START_MS + 30_000, a.id()));
    assert!(lines[1].starts_with(&format!("{}:b:30:", common::START_MS)));
}

#[tokio::test]
async fn test_state_is_shared_through_the_root() {
    let clock = common::manual_clock();
    let (writer, root) = common::file_service(TIMEOUT, clock.clone());
    let reader = FileQueueService::with_parts(
        root.path(),
        TIMEOUT,
        Arc::new(DirLease::default()),
        clock,
    )
    .unwrap();

    writer.push("q", "hello").await.unwrap();
    let message = reader.pull("q").await.unwrap().unwrap();
    assert_eq!(message.content(), "hello");

    assert!(writer.pull("q").await.unwrap().is_none());
    assert!(writer.delete("q", &message.receipt()).await.unwrap());
    assert_eq!(reader.size("q").await.unwrap(), 0);
}

#[tokio::test]
async fn test_reads_three_field_records() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);
    let queue_dir = root.path().join("legacy");
    std::fs::create_dir(&queue_dir).unwrap();
    std::fs::write(queue_dir.join("messages"), "0:msg1:5\n0:msg2:5\n").unwrap();

    let message = service.pull("legacy").await.unwrap().unwrap();
    assert_eq!(message.content(), "msg1");
    assert_eq!(message.visibility_timeout_secs(), 5);

    // The pulled line now carries its id, so the receipt stays valid.
    assert!(service.delete("legacy", &message.receipt()).await.unwrap());
    assert_eq!(service.size("legacy").await.unwrap(), 1);
}

#[tokio::test]
async fn test_malformed_record_fails_without_changes() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);
    let queue_dir = root.path().join("broken");
    std::fs::create_dir(&queue_dir).unwrap();
    let original = "0:fine:30\nnot-a-timestamp:bad:30\n";
    std::fs::write(queue_dir.join("messages"), original).unwrap();

    assert!(matches!(
        service.pull("broken").await,
        Err(QueueError::Decode { .. })
    ));
    assert!(matches!(
        service.push("broken", "more").await,
        Err(QueueError::Decode { .. })
    ));
    assert!(service.size("broken").await.is_err());

    assert_eq!(record(root.path(), "broken"), original);
    assert!(!queue_dir.join(".lock").exists());
}

#[tokio::test]
async fn test_lease_is_released_after_each_operation() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);
    let marker = root.path().join("q").join(".lock");

    service.push("q", "x").await.unwrap();
    assert!(!marker.exists());
    let message = service.pull("q").await.unwrap().unwrap();
    assert!(!marker.exists());
    service.delete("q", &message.receipt()).await.unwrap();
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_write_fault_keeps_previous_record() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);
    let queue_dir = root.path().join("q");

    service.push("q", "kept").await.unwrap();
    let before = record(root.path(), "q");

    // A directory in the staging file's place makes the write fail.
    std::fs::create_dir(queue_dir.join("messages.tmp")).unwrap();

    assert!(matches!(
        service.push("q", "lost").await,
        Err(QueueError::Io(_))
    ));
    assert_eq!(record(root.path(), "q"), before);
    assert!(!queue_dir.join(".lock").exists());

    std::fs::remove_dir(queue_dir.join("messages.tmp")).unwrap();
    let message = service.pull("q").await.unwrap().unwrap();
    assert_eq!(message.content(), "kept");
    assert_eq!(service.size("q").await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_queues_skips_foreign_entries() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);

    service.push("jobs", "x").await.unwrap();
    std::fs::write(root.path().join("notes.txt"), "not a queue").unwrap();
    std::fs::create_dir(root.path().join("empty")).unwrap();

    assert_eq!(
        service.list_queues().await.unwrap(),
        vec!["empty".to_string(), "jobs".to_string()]
    );
}

#[tokio::test]
async fn test_held_lease_blocks_until_released() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);
    service.push("q", "waiting").await.unwrap();

    let marker = root.path().join("q").join(".lock");
    std::fs::create_dir(&marker).unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(100), service.pull("q")).await;
    assert!(blocked.is_err(), "pull should wait for the lease");

    std::fs::remove_dir(&marker).unwrap();
    let message = service.pull("q").await.unwrap().unwrap();
    assert_eq!(message.content(), "waiting");
}

#[tokio::test]
async fn test_absent_queue_is_not_created_by_reads() {
    let clock = common::manual_clock();
    let (service, root) = common::file_service(TIMEOUT, clock);

    assert!(service.pull("ghost").await.unwrap().is_none());
    assert_eq!(service.size("ghost").await.unwrap(), 0);
    assert!(!root.path().join("ghost").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pullers_never_share_a_message() {
    let root = tempfile::tempdir().unwrap();
    let services: Vec<Arc<FileQueueService>> = (0..4)
        .map(|_| {
            Arc::new(
                FileQueueService::with_parts(
                    root.path(),
                    TIMEOUT,
                    Arc::new(DirLease::new(Duration::from_millis(1))),
                    Arc::new(SystemClock::new()),
                )
                .unwrap(),
            )
        })
        .collect();

    for i in 0..40 {
        services[0].push("shared", &format!("msg-{i}")).await.unwrap();
    }

    let handles: Vec<_> = services
        .iter()
        .cloned()
        .map(|service| {
            tokio::spawn(async move {
                let mut ids = vec![];
                while let Some(message) = service.pull("shared").await.unwrap() {
                    ids.push(message.id());
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(seen.insert(id), "message {id} delivered twice");
        }
    }
    assert_eq!(seen.len(), 40);
    assert_eq!(services[0].size("shared").await.unwrap(), 40);
}

#[tokio::test]
async fn test_timeout_elapses_in_real_time() {
    let root = tempfile::tempdir().unwrap();
    let service = FileQueueService::new(root.path(), Duration::from_secs(1)).unwrap();

    service.push("Test Queue 1", "msg1").await.unwrap();
    let first = service.pull("Test Queue 1").await.unwrap().unwrap();
    assert!(service.pull("Test Queue 1").await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(!service.delete("Test Queue 1", &first.receipt()).await.unwrap());
    let again = service.pull("Test Queue 1").await.unwrap().unwrap();
    assert_eq!(again.content(), "msg1");
    assert!(service.delete("Test Queue 1", &again.receipt()).await.unwrap());
    assert_eq!(service.size("Test Queue 1").await.unwrap(), 0);
}
