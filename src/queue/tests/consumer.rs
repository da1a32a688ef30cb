//! Iteration protocol: suspension, direct handoff, pause/resume holds.

use crate::queue::{AgentMessage, AgentQueue, Priority, QueueError, QueueOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn test_next_suspends_until_enqueue() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    let reader = tokio::spawn(async move { consumer.next().await });
    // Let the reader park.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    let message = AgentMessage::user_input("wake up").unwrap();
    let expected_id = message.id;
    queue.enqueue(message).unwrap();

    let delivered = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(delivered.id, expected_id);
}

#[tokio::test]
async fn test_direct_handoff_bypasses_store() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue
        .enqueue(AgentMessage::user_input("straight through").unwrap())
        .unwrap();

    // The message was never observable in the store.
    assert_eq!(queue.size().unwrap(), 0);
    assert!(queue.peek().unwrap().is_none());

    reader.await.unwrap().unwrap().unwrap();

    let stats = queue.stats().unwrap();
    assert_eq!(stats.direct_handoffs, 1);
    assert_eq!(stats.total_delivered, 1);
}

#[tokio::test]
async fn test_stored_delivery_is_not_a_handoff() {
    let queue = AgentQueue::new(QueueOptions::default());
    let mut consumer = queue.consumer().unwrap();

    // No reader waiting: goes through the store.
    queue
        .enqueue(AgentMessage::user_input("buffered").unwrap())
        .unwrap();
    assert_eq!(queue.size().unwrap(), 1);

    consumer.next().await.unwrap().unwrap();

    let stats = queue.stats().unwrap();
    assert_eq!(stats.direct_handoffs, 0);
    assert_eq!(stats.total_delivered, 1);
}

#[tokio::test]
async fn test_pause_holds_parked_reader_and_stores_enqueues() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    queue.pause().unwrap();
    assert!(queue.is_paused().unwrap());

    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // No handoff while paused: the message lands in the store.
    queue
        .enqueue(AgentMessage::user_input("held back").unwrap())
        .unwrap();
    assert_eq!(queue.size().unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    queue.resume().unwrap();
    let delivered = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(queue.size().unwrap(), 0);
    assert_eq!(delivered.priority, Priority::Normal);
    assert_eq!(queue.stats().unwrap().direct_handoffs, 0);
}

#[tokio::test]
async fn test_resume_with_empty_store_keeps_reader_waiting() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    queue.pause().unwrap();
    let reader = tokio::spawn(async move { consumer.next().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Nothing queued: the re-poll parks again.
    queue.resume().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!reader.is_finished());

    queue
        .enqueue(AgentMessage::user_input("finally").unwrap())
        .unwrap();
    reader.await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn test_pause_resume_idempotent() {
    let queue = AgentQueue::new(QueueOptions::default());

    queue.pause().unwrap();
    queue.pause().unwrap();
    assert!(queue.is_paused().unwrap());

    queue.resume().unwrap();
    queue.resume().unwrap();
    assert!(!queue.is_paused().unwrap());
}

#[tokio::test]
async fn test_cancelled_next_does_not_lose_messages() {
    let queue = Arc::new(AgentQueue::new(QueueOptions::default()));
    let mut consumer = queue.consumer().unwrap();

    // Cancel a parked next() by timing it out.
    let waited = timeout(Duration::from_millis(20), consumer.next()).await;
    assert!(waited.is_err());

    // The stale reader slot must not swallow this message.
    let message = AgentMessage::user_input("survivor").unwrap();
    let expected_id = message.id;
    queue.enqueue(message).unwrap();

    let delivered = consumer.next().await.unwrap().unwrap();
    assert_eq!(delivered.id, expected_id);
}

#[tokio::test]
async fn test_consumer_handle_reports_connection() {
    let queue = AgentQueue::new(QueueOptions::default());
    let mut consumer = queue.consumer().unwrap();
    assert!(consumer.is_connected());

    drop(queue);
    assert!(!consumer.is_connected());
    match consumer.next().await {
        Err(QueueError::Destroyed) => {}
        other => panic!("expected Destroyed, got {:?}", other.map(|_| ())),
    }
}
