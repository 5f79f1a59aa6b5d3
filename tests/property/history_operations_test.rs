//! Property-based tests for undo/redo history.
//!
//! Random sequences of checkpoints, undos and redos (some with a failing
//! restore) are replayed against both the real history and a plain-Vec
//! model. Stacks must match the model after every step, stay within
//! capacity, and be untouched by a failed restore.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use tabio::database::MemoryStore;
use tabio::managers::group_mutator::RestoreReport;
use tabio::managers::history_manager::{HistoryManager, SnapshotHost, HISTORY_CAPACITY};
use tabio::types::errors::{HistoryError, MutationError};
use tabio::types::tab::{TabSnapshot, TabState, TAB_GROUP_ID_NONE};

struct Window {
    current: Mutex<TabSnapshot>,
    fail_restore: AtomicBool,
}

#[async_trait]
impl SnapshotHost for Window {
    async fn capture_state(&self) -> Option<TabSnapshot> {
        self.current.lock().ok().map(|s| s.clone())
    }

    async fn restore_state(&self, snapshot: &TabSnapshot) -> Result<RestoreReport, MutationError> {
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(MutationError::Host("restore rejected".to_string()));
        }
        *self.current.lock().unwrap() = snapshot.clone();
        Ok(RestoreReport::default())
    }
}

fn snap(n: i64) -> TabSnapshot {
    TabSnapshot::new(vec![TabState {
        id: n,
        index: 0,
        group_id: TAB_GROUP_ID_NONE,
        group_info: None,
    }])
}

#[derive(Debug, Clone)]
enum Op {
    /// Checkpoint, then change the window to the given state.
    Act(i64),
    Undo { fail: bool },
    Redo { fail: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0i64..1000).prop_map(Op::Act),
        2 => any::<bool>().prop_map(|fail| Op::Undo { fail }),
        2 => any::<bool>().prop_map(|fail| Op::Redo { fail }),
    ]
}

fn push_bounded(stack: &mut Vec<i64>, value: i64) {
    stack.push(value);
    if stack.len() > HISTORY_CAPACITY {
        stack.remove(0);
    }
}

fn ids(stack: &[TabSnapshot]) -> Vec<i64> {
    stack.iter().map(|s| s.entries()[0].id).collect()
}

fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async move {
        let mut history = HistoryManager::new(Arc::new(MemoryStore::new()));
        let window = Window {
            current: Mutex::new(snap(-1)),
            fail_restore: AtomicBool::new(false),
        };
        let mut model_window: i64 = -1;
        let mut model_undo: Vec<i64> = Vec::new();
        let mut model_redo: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Act(next) => {
                    prop_assert!(history.record_checkpoint(&window).await);
                    push_bounded(&mut model_undo, model_window);
                    model_redo.clear();
                    *window.current.lock().unwrap() = snap(next);
                    model_window = next;
                }
                Op::Undo { fail } | Op::Redo { fail } => {
                    let is_undo = matches!(op, Op::Undo { .. });
                    window.fail_restore.store(fail, Ordering::SeqCst);
                    let before = (history.undo_stack().clone(), history.redo_stack().clone());
                    let result = if is_undo {
                        history.undo(&window).await
                    } else {
                        history.redo(&window).await
                    };
                    window.fail_restore.store(false, Ordering::SeqCst);

                    let (from, to) = if is_undo {
                        (&mut model_undo, &mut model_redo)
                    } else {
                        (&mut model_redo, &mut model_undo)
                    };
                    if from.is_empty() {
                        prop_assert_eq!(result, Err(HistoryError::EmptyHistory));
                    } else if fail {
                        prop_assert!(matches!(result, Err(HistoryError::RestoreFailed(_))));
                        prop_assert_eq!(history.undo_stack(), &before.0);
                        prop_assert_eq!(history.redo_stack(), &before.1);
                    } else {
                        prop_assert!(result.is_ok());
                        let target = from.pop().unwrap();
                        push_bounded(to, model_window);
                        model_window = target;
                    }
                }
            }

            prop_assert_eq!(window.current.lock().unwrap().entries()[0].id, model_window);
            prop_assert_eq!(ids(&history.undo_stack().to_vec()), model_undo.clone());
            prop_assert_eq!(ids(&history.redo_stack().to_vec()), model_redo.clone());
            prop_assert!(history.undo_stack().len() <= HISTORY_CAPACITY);
            prop_assert!(history.redo_stack().len() <= HISTORY_CAPACITY);
        }
        Ok::<(), TestCaseError>(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn history_matches_bounded_stack_model(ops in prop::collection::vec(arb_op(), 1..80)) {
        run(ops)?;
    }
}
