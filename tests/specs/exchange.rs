//! Workplace exchange: pairwise swaps, full rotations, and chain handover.

use crate::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pairwise_swap_grants_both_sides() {
    let (ws, _) = counting_workshop(&["a", "b"]);
    ws.enter(uid("x"), wid("a")).await.unwrap().perform().await;
    ws.enter(uid("y"), wid("b")).await.unwrap().perform().await;

    let ws2 = Arc::clone(&ws);
    let first = tokio::spawn(async move {
        let seat = ws2.switch_to(uid("x"), wid("b")).await.unwrap();
        assert_eq!(seat.workplace_id(), &wid("b"));
        seat.perform().await;
    });
    wait_for_waiting(&ws, 1).await;

    let seat = ws.switch_to(uid("y"), wid("a")).await.unwrap();
    assert_eq!(seat.workplace_id(), &wid("a"));
    seat.perform().await;

    join_all_within(10, vec![first]).await;
    assert_eq!(ws.occupant(&wid("a")), Some(uid("y")));
    assert_eq!(ws.occupant(&wid("b")), Some(uid("x")));
}

async fn run_ring(n: usize) {
    let names: Vec<String> = (0..n).map(|i| format!("w{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let (ws, runs) = counting_workshop(&name_refs);

    let mut handles = Vec::new();
    for i in 0..n {
        let ws = Arc::clone(&ws);
        handles.push(tokio::spawn(async move {
            let user = uid(format!("u{i}"));
            let seat = ws.enter(user.clone(), wid(format!("w{i}"))).await.unwrap();
            seat.perform().await;

            let next = wid(format!("w{}", (i + 1) % n));
            let seat = ws.switch_to(user.clone(), next.clone()).await.unwrap();
            assert_eq!(seat.workplace_id(), &next);
            seat.perform().await;

            ws.leave(&user).unwrap();
        }));
    }
    join_all_within(10, handles).await;

    assert_eq!(runs.load(Ordering::SeqCst), 2 * n);
    assert_quiescent(&ws, &name_refs);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_ring_of_two_rotates() {
    run_ring(2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_ring_of_three_rotates() {
    run_ring(3).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn full_ring_of_five_rotates() {
    run_ring(5).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chain_behind_a_leaver_advances_every_link() {
    // A third workplace keeps the admission throttle out of the way.
    let (ws, _) = counting_workshop(&["w1", "w2", "w3"]);
    ws.enter(uid("u1"), wid("w1")).await.unwrap().perform().await;
    ws.enter(uid("u2"), wid("w2")).await.unwrap().perform().await;

    // Head waits for w1, whose occupant waits for w2.
    let ws_head = Arc::clone(&ws);
    let head = tokio::spawn(async move {
        let seat = ws_head.enter(uid("u0"), wid("w1")).await.unwrap();
        assert_eq!(seat.workplace_id(), &wid("w1"));
        seat.perform().await;
    });
    wait_for_waiting(&ws, 1).await;

    let ws_mid = Arc::clone(&ws);
    let mid = tokio::spawn(async move {
        let seat = ws_mid.switch_to(uid("u1"), wid("w2")).await.unwrap();
        assert_eq!(seat.workplace_id(), &wid("w2"));
        seat.perform().await;
    });
    wait_for_waiting(&ws, 2).await;

    // u2 leaving frees w2; the whole chain moves in one step.
    ws.leave(&uid("u2")).unwrap();
    join_all_within(10, vec![head, mid]).await;

    assert_eq!(ws.occupant(&wid("w1")), Some(uid("u0")));
    assert_eq!(ws.occupant(&wid("w2")), Some(uid("u1")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn switch_to_own_workplace_completes() {
    let (ws, runs) = counting_workshop(&["a"]);
    ws.enter(uid("x"), wid("a")).await.unwrap().perform().await;

    let seat = ws.switch_to(uid("x"), wid("a")).await.unwrap();
    timeout(Duration::from_secs(5), seat.perform())
        .await
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}
