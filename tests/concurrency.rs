use std::sync::Arc;
use std::thread;

use tasktally::{Invocation, Quantity, Scope, Tally, HAS_STARTED, HAS_SUCCEEDED};

const THREADS: usize = 8;
const CALLS: usize = 500;

#[test]
fn shared_tree_counts_every_call_from_every_thread() {
    let root = Arc::new(Tally::new([Scope::module("svc")]));
    let leaf = Arc::new(root.child(Scope::function("handle")));

    thread::scope(|s| {
        for worker in 0..THREADS {
            let leaf = Arc::clone(&leaf);
            s.spawn(move || {
                for call in 0..CALLS {
                    let out = leaf.track("handle").returns(
                        Invocation::new().arg(worker).arg(call),
                        || {
                            Ok::<_, std::fmt::Error>(call * 2)
                        },
                    );
                    assert_eq!(out, Ok(call * 2));
                }
            });
        }
    });

    let expected = Quantity::Int((THREADS * CALLS) as i64);
    assert_eq!(root.count(HAS_STARTED), Some(expected));
    assert_eq!(root.count(HAS_SUCCEEDED), Some(expected));
    assert_eq!(leaf.count(HAS_SUCCEEDED), Some(expected));
    assert_eq!(root.pending_len(), 0);
    assert_eq!(leaf.pending_len(), 0);
}
