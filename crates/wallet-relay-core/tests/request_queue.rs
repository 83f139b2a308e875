use std::time::Duration;

use serde_json::json;
use wallet_relay_core::{
    Decision, PendingEntry, PortError, Request, RequestId, RequestQueue, TimestampMs,
};

fn entry(id: u64, requires_approval: bool) -> PendingEntry {
    PendingEntry {
        request: Request::new(id, "personal_sign", json!([])),
        requires_approval,
        queued_at: TimestampMs(id),
    }
}

#[test]
fn auto_approved_entries_skip_the_pending_set() {
    let queue = RequestQueue::new();
    queue.push(entry(1, false)).expect("push");
    assert_eq!(queue.pending_count(), 0);
    assert_eq!(queue.ready_len(), 1);

    let ready = queue.try_next_ready().expect("ready entry");
    assert_eq!(ready.decision, Decision::AutoApproved);
}

#[test]
fn decisions_release_entries_in_decision_order() {
    let queue = RequestQueue::new();
    queue.push(entry(1, true)).expect("push 1");
    queue.push(entry(2, true)).expect("push 2");
    queue.push(entry(3, false)).expect("push 3");
    assert_eq!(queue.pending_count(), 2);
    assert_eq!(
        queue.pending_ids(),
        vec![RequestId::from(1u64), RequestId::from(2u64)]
    );

    queue.deny(&RequestId::from(2u64)).expect("deny 2");
    queue.approve(&RequestId::from(1u64)).expect("approve 1");
    assert_eq!(queue.pending_count(), 0);

    let order: Vec<(RequestId, Decision)> = std::iter::from_fn(|| queue.try_next_ready())
        .map(|r| (r.entry.request.id, r.decision))
        .collect();
    assert_eq!(
        order,
        vec![
            (RequestId::from(3u64), Decision::AutoApproved),
            (RequestId::from(2u64), Decision::Denied),
            (RequestId::from(1u64), Decision::Approved),
        ]
    );
}

#[test]
fn unknown_and_duplicate_ids_are_rejected() {
    let queue = RequestQueue::new();
    let err = queue.approve(&RequestId::from(9u64)).expect_err("unknown id");
    assert!(matches!(err, PortError::NotFound(_)));

    queue.push(entry(1, true)).expect("push");
    let err = queue.push(entry(1, true)).expect_err("duplicate id");
    assert!(matches!(err, PortError::Conflict(_)));
    assert!(queue.is_pending(&RequestId::from(1u64)));
}

#[tokio::test]
async fn next_ready_waits_for_a_decision() {
    let queue = RequestQueue::new();
    queue.push(entry(1, true)).expect("push");

    let (ready, ()) = tokio::join!(queue.next_ready(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.approve(&RequestId::from(1u64)).expect("approve");
    });
    let ready = ready.expect("entry after approval");
    assert_eq!(ready.entry.request.id, RequestId::from(1u64));
    assert_eq!(ready.decision, Decision::Approved);
}

#[tokio::test]
async fn closed_queue_drains_then_ends() {
    let queue = RequestQueue::new();
    queue.push(entry(1, false)).expect("push");
    queue.close();

    assert!(queue.push(entry(2, false)).is_err());
    assert!(queue.next_ready().await.is_some());
    assert!(queue.next_ready().await.is_none());
    assert!(queue.is_closed());
}
