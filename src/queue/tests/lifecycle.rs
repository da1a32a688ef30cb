//! Terminal-state machine: finish, fail, destroy and their interactions.

use crate::queue::{AgentMessage, AgentQueue, QueueError, QueueOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_finish_drains_remaining_messages_then_none() {
    let queue = AgentQueue::new(QueueOptions::default());
    let mut consumer = queue.consumer().unwrap();

    queue
        .enqueue(AgentMessage::user_input("first").unwrap())
        .unwrap();
    queue
        .enqueue(AgentMessage::user_input("second").unwrap())
        .unwrap();
    queue.finish().unwrap();

    assert!(consumer.next().await.unwrap().is_some());
    assert!(consumer.next().await.unwrap().is_some());
    // Drained: end of sequence.
    assert!(consumer.next().await.unwrap().is_none());
    // End of sequence is sticky.
    assert!(consumer.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_finish_wakes_parked_reader_when_empty() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue.finish().unwrap();
    assert!(reader.await.unwrap().unwrap().is_none());
}

#[tokio::test]
async fn test_finish_is_idempotent() {
    let queue = AgentQueue::new(QueueOptions::default());
    queue.finish().unwrap();
    queue.finish().unwrap();
    assert!(queue.state().unwrap().done);
}

#[tokio::test]
async fn test_fail_wakes_parked_reader_with_reason() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue.fail("model backend unreachable").unwrap();

    match reader.await.unwrap() {
        Err(QueueError::Errored { reason }) => {
            assert_eq!(reason, "model backend unreachable");
        }
        other => panic!("expected Errored, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_error_state_is_absorbing() {
    let queue = AgentQueue::new(QueueOptions::default());
    let mut consumer = queue.consumer().unwrap();

    // A buffered message does not soften the error state.
    queue
        .enqueue(AgentMessage::user_input("never delivered").unwrap())
        .unwrap();
    queue.fail("first failure").unwrap();
    // First error wins.
    queue.fail("second failure").unwrap();

    match consumer.next().await {
        Err(QueueError::Errored { reason }) => assert_eq!(reason, "first failure"),
        other => panic!("expected Errored, got {:?}", other.map(|_| ())),
    }
    assert_eq!(
        queue.state().unwrap().errored.as_deref(),
        Some("first failure")
    );
}

#[tokio::test]
async fn test_fail_after_finish_still_latches() {
    let queue = AgentQueue::new(QueueOptions::default());
    queue.finish().unwrap();
    queue.fail("late failure").unwrap();

    // Error outranks done in rejection order.
    match queue.enqueue(AgentMessage::user_input("nope").unwrap()) {
        Err(QueueError::Errored { reason }) => assert_eq!(reason, "late failure"),
        other => panic!("expected Errored, got {:?}", other),
    }
}

#[tokio::test]
async fn test_destroy_rejects_parked_reader() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue.destroy().await.unwrap();

    match reader.await.unwrap() {
        Err(QueueError::Destroyed) => {}
        other => panic!("expected Destroyed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_destroy_empties_store_and_blocks_everything() {
    let queue = AgentQueue::new(QueueOptions::default());

    queue
        .enqueue(AgentMessage::user_input("doomed").unwrap())
        .unwrap();
    queue.destroy().await.unwrap();

    assert!(matches!(
        queue.enqueue(AgentMessage::user_input("late").unwrap()),
        Err(QueueError::Destroyed)
    ));
    assert!(matches!(queue.peek(), Err(QueueError::Destroyed)));
    assert!(matches!(queue.clear(), Err(QueueError::Destroyed)));
    assert!(matches!(queue.pause(), Err(QueueError::Destroyed)));
    assert!(matches!(queue.finish(), Err(QueueError::Destroyed)));
    assert!(matches!(queue.fail("x"), Err(QueueError::Destroyed)));
    assert!(queue.state().unwrap().destroyed);
}

#[tokio::test]
async fn test_destroy_is_idempotent_and_runs_hook_once() {
    let ran = Arc::new(AtomicBool::new(false));
    let ran_clone = Arc::clone(&ran);

    let queue = AgentQueue::new(QueueOptions::default().with_cleanup_hook(move || {
        let ran = Arc::clone(&ran_clone);
        async move {
            // A second run would trip the assertion below via swap.
            assert!(!ran.swap(true, Ordering::SeqCst));
        }
    }));

    queue.destroy().await.unwrap();
    queue.destroy().await.unwrap();
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_destroy_after_finish() {
    let queue = AgentQueue::new(QueueOptions::default());
    queue.finish().unwrap();
    queue.destroy().await.unwrap();
    assert!(matches!(queue.size(), Ok(0)));
    assert!(queue.state().unwrap().destroyed);
}

#[tokio::test]
async fn test_clear_does_not_end_the_sequence() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    queue
        .enqueue(AgentMessage::user_input("discarded").unwrap())
        .unwrap();
    assert_eq!(queue.clear().unwrap(), 1);

    // A cleared queue is still live: the next message flows normally.
    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue
        .enqueue(AgentMessage::user_input("fresh start").unwrap())
        .unwrap();
    assert!(reader.await.unwrap().unwrap().is_some());
}
