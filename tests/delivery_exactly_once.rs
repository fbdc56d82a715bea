//! Integration tests for pass delivery.
//!
//! These tests verify that a pass reaches the member at most once however
//! many triggers race for it:
//! 1. Concurrent inline dispatches share one delivery lock
//! 2. A broken queue falls back to inline delivery
//! 3. Queue jobs that lost the race to an inline send are dropped
//! 4. Lock and executor races on a multi-threaded runtime grant one send

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

use common::Desk;

use registration_desk::adapters::memory::{InMemoryJobQueue, InMemoryMessagingGateway};
use registration_desk::application::delivery::{
    Acquisition, DeliveryOutcome, DispatchOutcome, JobDisposition, QueueHandle, QueueWorker,
};
use registration_desk::domain::foundation::{EventId, MemberId, RegistrationId};
use registration_desk::domain::registration::NewRegistration;
use registration_desk::ports::{DocumentMessage, JobQueue, MessagingError, RegistrationRepository};

const RACERS: usize = 8;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// A free registration written straight to the store, so no background
/// dispatch is started for it.
async fn settled_registration(desk: &Desk) -> RegistrationId {
    desk.add_event(1, 0, None);
    desk.add_member(1);
    desk.registrations
        .insert(NewRegistration::free(EventId::new(1), MemberId::new(1)))
        .await
        .unwrap()
        .id
}

fn queued(queue: &Arc<InMemoryJobQueue>) -> QueueHandle {
    let queue: Arc<dyn JobQueue> = queue.clone();
    QueueHandle::Available(queue)
}

fn pass_message() -> DocumentMessage {
    DocumentMessage {
        recipient: "919845000001".to_string(),
        document: b"pass".to_vec(),
        file_name: "pass.txt".to_string(),
        caption: "Expo - visitor pass".to_string(),
        sender_name: "Registration Desk".to_string(),
    }
}

fn is_sent(outcome: &DispatchOutcome) -> bool {
    matches!(
        outcome,
        DispatchOutcome::Delivered(DeliveryOutcome::Sent { .. })
    )
}

// =============================================================================
// Inline delivery
// =============================================================================

#[tokio::test]
async fn simultaneous_triggers_send_one_pass() {
    let desk = Desk::build(
        QueueHandle::unavailable("not configured"),
        InMemoryMessagingGateway::new().with_delay(Duration::from_millis(50)),
    );
    let id = settled_registration(&desk).await;

    let (a, b, c) = tokio::join!(
        desk.dispatcher.dispatch(id),
        desk.dispatcher.dispatch(id),
        desk.dispatcher.dispatch(id),
    );
    let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];

    assert_eq!(outcomes.iter().filter(|o| is_sent(o)).count(), 1);
    assert_eq!(desk.messaging.attempt_count(), 1);
    assert_eq!(desk.messaging.sent_count(), 1);
    assert!(desk.locks.peek(id).await.unwrap().is_sent());
}

#[tokio::test]
async fn free_registration_and_resend_race_sends_once() {
    let desk = Desk::build(
        QueueHandle::unavailable("not configured"),
        InMemoryMessagingGateway::new().with_delay(Duration::from_millis(30)),
    );
    desk.add_event(1, 0, Some(10));
    desk.add_member(1);

    // Intake spawns a background dispatch; race it with direct triggers
    let registered = desk.register(1, 1).await.unwrap();
    let id = registered.registration.id;
    let _ = tokio::join!(desk.dispatcher.dispatch(id), desk.dispatcher.dispatch(id));

    desk.wait_for_delivery(id).await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(desk.messaging.sent_count(), 1);
    assert_eq!(desk.attendees(1), 1);
}

#[tokio::test]
async fn delivered_pass_is_not_sent_again() {
    let desk = Desk::new();
    let id = settled_registration(&desk).await;

    let first = desk.dispatcher.dispatch(id).await.unwrap();
    assert!(is_sent(&first));

    let second = desk.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(
        second,
        DispatchOutcome::Skipped {
            reason: "already_sent"
        }
    );
    assert_eq!(desk.messaging.sent_count(), 1);
}

// =============================================================================
// Queue fallback
// =============================================================================

#[tokio::test]
async fn broken_queue_falls_back_to_inline_delivery() {
    let queue = Arc::new(InMemoryJobQueue::unavailable("connection refused"));
    let desk = Desk::build(queued(&queue), InMemoryMessagingGateway::new());
    let id = settled_registration(&desk).await;

    let outcome = desk.dispatcher.dispatch(id).await.unwrap();

    assert!(is_sent(&outcome));
    assert_eq!(desk.messaging.sent_count(), 1);
}

#[tokio::test]
async fn queued_job_is_delivered_by_worker() {
    let queue = Arc::new(InMemoryJobQueue::new());
    let desk = Desk::build(queued(&queue), InMemoryMessagingGateway::new());
    let id = settled_registration(&desk).await;

    let outcome = desk.dispatcher.dispatch(id).await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Enqueued { .. }));
    assert_eq!(queue.pending_count(), 1);
    assert_eq!(desk.messaging.sent_count(), 0);

    let worker = QueueWorker::new(queue.clone(), desk.registrations.clone(), desk.executor.clone());
    let disposition = worker.process_one().await.unwrap();

    assert_eq!(disposition, Some(JobDisposition::Delivered));
    assert_eq!(queue.acked_count(), 1);
    assert_eq!(desk.messaging.sent_count(), 1);
    assert!(desk.locks.peek(id).await.unwrap().is_sent());
}

#[tokio::test]
async fn queued_job_after_inline_send_is_dropped() {
    let queue = Arc::new(InMemoryJobQueue::new());
    let desk = Desk::build(queued(&queue), InMemoryMessagingGateway::new());
    let id = settled_registration(&desk).await;

    // Two triggers before the worker runs: both are enqueued
    desk.dispatcher.dispatch(id).await.unwrap();
    desk.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(queue.pending_count(), 2);

    let worker = QueueWorker::new(queue.clone(), desk.registrations.clone(), desk.executor.clone());
    let first = worker.process_one().await.unwrap();
    let second = worker.process_one().await.unwrap();

    assert_eq!(first, Some(JobDisposition::Delivered));
    assert_eq!(
        second,
        Some(JobDisposition::Dropped {
            reason: "already_sent"
        })
    );
    assert_eq!(queue.acked_count(), 2);
    assert!(queue.dead_letters().is_empty());
    assert_eq!(desk.messaging.sent_count(), 1);
}

#[tokio::test]
async fn failed_send_is_dead_lettered_and_lock_released() {
    let queue = Arc::new(InMemoryJobQueue::new());
    let desk = Desk::build(queued(&queue), InMemoryMessagingGateway::new());
    let id = settled_registration(&desk).await;
    desk.messaging.fail_next(MessagingError::Rejected {
        status: 400,
        message: "number not on chat".to_string(),
    });

    desk.dispatcher.dispatch(id).await.unwrap();
    let worker = QueueWorker::new(queue.clone(), desk.registrations.clone(), desk.executor.clone());
    let disposition = worker.process_one().await.unwrap();

    assert!(matches!(
        disposition,
        Some(JobDisposition::DeadLettered { .. })
    ));
    assert_eq!(queue.dead_letters().len(), 1);
    assert!(desk.locks.is_free(id).await.unwrap());
    assert!(!desk.locks.peek(id).await.unwrap().is_sent());
}

// =============================================================================
// Multi-threaded races
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_lock_acquisitions_grant_one_lease() {
    let desk = Desk::new();
    let id = settled_registration(&desk).await;
    let barrier = Arc::new(Barrier::new(RACERS));

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let locks = desk.locks.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                locks.acquire(id).await.unwrap()
            })
        })
        .collect();

    let mut acquired = 0;
    for task in tasks {
        match task.await.unwrap() {
            Acquisition::Acquired(_) => acquired += 1,
            Acquisition::Locked => {}
            Acquisition::AlreadySent { .. } => panic!("nothing was sent yet"),
        }
    }
    assert_eq!(acquired, 1);
    assert!(!desk.locks.is_free(id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_executors_call_the_gateway_once() {
    let desk = Desk::build(
        QueueHandle::unavailable("not configured"),
        InMemoryMessagingGateway::new().with_delay(Duration::from_millis(30)),
    );
    let id = settled_registration(&desk).await;
    let barrier = Arc::new(Barrier::new(RACERS));

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let executor = desk.executor.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                executor.deliver(id, &pass_message()).await.unwrap()
            })
        })
        .collect();

    let mut sent = 0;
    for task in tasks {
        match task.await.unwrap() {
            DeliveryOutcome::Sent { .. } => sent += 1,
            DeliveryOutcome::Locked
            | DeliveryOutcome::AlreadySent
            | DeliveryOutcome::ResolvedElsewhere => {}
            DeliveryOutcome::Failed { reason } => panic!("unexpected failure: {}", reason),
        }
    }
    assert_eq!(sent, 1);
    assert_eq!(desk.messaging.attempt_count(), 1);
    assert!(desk.locks.peek(id).await.unwrap().is_sent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_dispatches_send_one_pass() {
    let desk = Desk::build(
        QueueHandle::unavailable("not configured"),
        InMemoryMessagingGateway::new().with_delay(Duration::from_millis(30)),
    );
    let id = settled_registration(&desk).await;
    let barrier = Arc::new(Barrier::new(RACERS));

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let dispatcher = desk.dispatcher.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                dispatcher.dispatch(id).await.unwrap()
            })
        })
        .collect();

    let mut sent = 0;
    for task in tasks {
        if is_sent(&task.await.unwrap()) {
            sent += 1;
        }
    }
    assert_eq!(sent, 1);
    assert_eq!(desk.messaging.attempt_count(), 1);
}

#[tokio::test]
async fn queued_job_for_cancelled_registration_is_dropped() {
    let queue = Arc::new(InMemoryJobQueue::new());
    let desk = Desk::build(queued(&queue), InMemoryMessagingGateway::new());
    let id = settled_registration(&desk).await;

    desk.dispatcher.dispatch(id).await.unwrap();
    desk.cancel(id, None).await.unwrap();

    let worker = QueueWorker::new(queue.clone(), desk.registrations.clone(), desk.executor.clone());
    let disposition = worker.process_one().await.unwrap();

    assert_eq!(
        disposition,
        Some(JobDisposition::Dropped {
            reason: "not_counted"
        })
    );
    assert_eq!(queue.acked_count(), 1);
    assert_eq!(desk.messaging.attempt_count(), 0);
}
