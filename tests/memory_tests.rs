//! Integration tests for the bounded conversation memory.

use std::sync::Arc;

use prompt_relay::memory::{ConversationId, ConversationMemory, MemoryConfig, MessageTurn, Role};
use prompt_relay::CoreError;

fn memory(max_window_size: usize) -> ConversationMemory {
    ConversationMemory::new(MemoryConfig { max_window_size }).unwrap()
}

fn contents(turns: &[MessageTurn]) -> Vec<String> {
    turns.iter().map(|t| t.content.clone()).collect()
}

#[test]
fn test_fifo_eviction_keeps_last_k() {
    for (k, n) in [(1usize, 5usize), (3, 10), (7, 8), (4, 4)] {
        let memory = memory(k);
        let id = ConversationId::from("conv");
        for i in 0..n {
            memory.append(&id, MessageTurn::user(format!("turn-{i}")));
        }

        let expected: Vec<String> = (n.saturating_sub(k)..n).map(|i| format!("turn-{i}")).collect();
        assert_eq!(contents(&memory.snapshot(&id)), expected, "k={k} n={n}");
    }
}

#[test]
fn test_bound_two_keeps_b_and_c() {
    let memory = memory(2);
    let id = ConversationId::from("x");
    memory.append(&id, MessageTurn::user("A"));
    memory.append(&id, MessageTurn::assistant("B"));
    memory.append(&id, MessageTurn::user("C"));

    let snapshot = memory.snapshot(&id);
    assert_eq!(contents(&snapshot), vec!["B", "C"]);
    assert_eq!(snapshot[0].role, Role::Assistant);
}

#[test]
fn test_unknown_conversation_is_empty() {
    let memory = memory(5);
    assert!(memory.snapshot(&ConversationId::from("nobody")).is_empty());
}

#[test]
fn test_snapshot_does_not_mutate() {
    let memory = memory(3);
    let id = ConversationId::from("x");
    memory.append(&id, MessageTurn::user("A"));

    let first = memory.snapshot(&id);
    let second = memory.snapshot(&id);
    assert_eq!(first, second);
    assert_eq!(memory.stats().turns, 1);
}

#[test]
fn test_clear_removes_window() {
    let memory = memory(5);
    let id = ConversationId::from("x");
    memory.append(&id, MessageTurn::user("A"));
    memory.clear(&id);

    assert!(memory.snapshot(&id).is_empty());
    assert_eq!(memory.stats().conversations, 0);

    // Clearing an unknown conversation is harmless.
    memory.clear(&ConversationId::from("never-seen"));
}

#[test]
fn test_configure_rejects_non_positive() {
    let memory = memory(3);
    let id = ConversationId::from("x");
    for c in ["A", "B", "C"] {
        memory.append(&id, MessageTurn::user(c));
    }

    for bad in [0, -1, i64::MIN] {
        assert_eq!(
            memory.configure(bad),
            Err(CoreError::InvalidCapacity { requested: bad })
        );
    }

    assert_eq!(memory.max_window_size(), 3);
    assert_eq!(contents(&memory.snapshot(&id)), vec!["A", "B", "C"]);
}

#[test]
fn test_configure_trims_existing_windows_immediately() {
    let memory = memory(5);
    let a = ConversationId::from("a");
    let b = ConversationId::from("b");
    for i in 0..5 {
        memory.append(&a, MessageTurn::user(format!("a{i}")));
    }
    memory.append(&b, MessageTurn::user("b0"));

    memory.configure(2).unwrap();
    assert_eq!(contents(&memory.snapshot(&a)), vec!["a3", "a4"]);
    assert_eq!(contents(&memory.snapshot(&b)), vec!["b0"]);

    // Re-applying the same bound changes nothing.
    memory.configure(2).unwrap();
    assert_eq!(contents(&memory.snapshot(&a)), vec!["a3", "a4"]);
}

#[test]
fn test_append_all_is_atomic_under_contention() {
    let memory = Arc::new(memory(6));
    let id = ConversationId::from("shared");

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let memory = memory.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    memory.append_all(
                        &id,
                        [
                            MessageTurn::user(format!("{worker}-{i}")),
                            MessageTurn::assistant(format!("{worker}-{i}")),
                        ],
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = memory.snapshot(&id);
    assert_eq!(snapshot.len(), 6);
    // Pairs were appended whole, and the bound is even, so the window is
    // made of complete user/assistant pairs.
    for pair in snapshot.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[0].content, pair[1].content);
    }
    assert_eq!(memory.stats().evicted_turns, 8 * 200 * 2 - 6);
}

#[tokio::test]
async fn test_concurrent_tasks_never_exceed_bound() {
    let memory = Arc::new(memory(4));
    let ids: Vec<ConversationId> = (0..4).map(|i| ConversationId::from(format!("c{i}"))).collect();

    let mut tasks = Vec::new();
    for task in 0..16 {
        let memory = memory.clone();
        let id = ids[task % ids.len()].clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..50 {
                memory.append(&id, MessageTurn::user(format!("{task}-{i}")));
                assert!(memory.snapshot(&id).len() <= 4);
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for id in &ids {
        assert_eq!(memory.snapshot(id).len(), 4);
    }
}
