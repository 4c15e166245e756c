//! Deferred command execution.
//!
//! [`LazyCommandInterface`] records calls instead of running them. Recorded
//! calls are replayed later, in insertion order, by an explicit
//! [`flush`](LazyCommandInterface::flush) against a direct or remote interface.
//! This is how configuration binds actions (a key press, a hook) that can only
//! be evaluated once the object tree exists.
//!
//! ## Flush policy
//!
//! Chosen when the interface is constructed; there is no default:
//!
//! - [`FlushPolicy::FailFast`]: stop at the first failing call. Later calls are
//!   not attempted and are reported as skipped.
//! - [`FlushPolicy::ContinueOnError`]: attempt every call and collect every
//!   failure.
//!
//! Either way the flushed calls leave the log; nothing is retried implicitly.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use cmdgraph_core::{
    Args, CommandGraphCall, CommandGraphError, CommandGraphNode, CommandResult, CommandValue,
    Kwargs, ObjectType,
};
use cmdgraph_interface::{CommandInterface, check_item_category};

/// What a flush does when a replayed call fails.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlushPolicy {
    FailFast,
    ContinueOnError,
}

/// A recorded call waiting for a flush.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    /// Position in the log; strictly increasing per interface.
    pub seq: u64,
    pub call: CommandGraphCall,
    pub args: Args,
    pub kwargs: Kwargs,
    pub queued_at: DateTime<Utc>,
}

/// A replayed call that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushFailure {
    pub deferred: DeferredCall,
    pub error: CommandGraphError,
}

/// Outcome of one flush.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReport {
    pub policy: FlushPolicy,
    /// `(seq, result)` of every call that succeeded, in replay order.
    pub completed: Vec<(u64, CommandValue)>,
    /// Failed calls, in replay order.
    pub failures: Vec<FlushFailure>,
    /// Calls never attempted because an earlier one failed under `FailFast`.
    pub skipped: Vec<DeferredCall>,
}

impl FlushReport {
    fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            completed: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&FlushFailure> {
        self.failures.first()
    }

    /// Results of all calls, or the first failure.
    pub fn into_result(mut self) -> Result<Vec<CommandValue>, FlushError> {
        if self.failures.is_empty() {
            return Ok(self.completed.into_iter().map(|(_, v)| v).collect());
        }
        let failed = self.failures.len();
        let first = self.failures.swap_remove(0);
        Err(FlushError {
            seq: first.deferred.seq,
            call: first.deferred.call,
            source: first.error,
            failed,
            skipped: self.skipped.len(),
        })
    }
}

/// First failure of a flush, plus how much else went wrong.
#[derive(Debug, Error)]
#[error("deferred call #{seq} ({call}) failed: {source}")]
pub struct FlushError {
    pub seq: u64,
    pub call: CommandGraphCall,
    #[source]
    pub source: CommandGraphError,
    /// Total number of failed calls (including this one).
    pub failed: usize,
    pub skipped: usize,
}

/// Command interface that records calls for later evaluation.
#[derive(Debug)]
pub struct LazyCommandInterface {
    policy: FlushPolicy,
    log: Mutex<Vec<DeferredCall>>,
    next_seq: AtomicU64,
}

impl LazyCommandInterface {
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            log: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    // Pushes and drains are single operations, so the log is intact even if a
    // holder panicked.
    fn log(&self) -> MutexGuard<'_, Vec<DeferredCall>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and return its handle.
    pub fn enqueue(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<DeferredCall> {
        let mut log = self.log();

        // Sequence numbers are taken under the lock so log order and seq agree.
        let deferred = DeferredCall {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            call: call.clone(),
            args,
            kwargs,
            queued_at: Utc::now(),
        };
        debug!(seq = deferred.seq, call = %deferred.call, "call deferred");
        log.push(deferred.clone());
        Ok(deferred)
    }

    /// Recorded calls not yet flushed, oldest first.
    pub fn pending(&self) -> Vec<DeferredCall> {
        self.log().clone()
    }

    pub fn len(&self) -> usize {
        self.log().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every recorded call without running it.
    pub fn clear(&self) -> usize {
        self.log().drain(..).count()
    }

    /// Replay the log against `target` in insertion order.
    ///
    /// The log is taken before replaying: calls recorded while a flush runs
    /// belong to the next flush.
    pub fn flush<I>(&self, target: &I) -> FlushReport
    where
        I: CommandInterface + ?Sized,
    {
        let batch: Vec<DeferredCall> = self.log().drain(..).collect();

        let mut report = FlushReport::new(self.policy);
        let mut calls = batch.into_iter();

        while let Some(deferred) = calls.next() {
            match target.execute(&deferred.call, deferred.args.clone(), deferred.kwargs.clone()) {
                Ok(value) => report.completed.push((deferred.seq, value)),
                Err(error) => {
                    warn!(seq = deferred.seq, call = %deferred.call, "deferred call failed: {error}");
                    report.failures.push(FlushFailure { deferred, error });
                    if self.policy == FlushPolicy::FailFast {
                        report.skipped.extend(calls.by_ref());
                        break;
                    }
                }
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "flushed deferred calls"
        );
        report
    }
}

impl CommandInterface for LazyCommandInterface {
    /// Records the call and returns `Null` as a placeholder; use
    /// [`enqueue`](LazyCommandInterface::enqueue) for the deferred handle.
    fn execute(
        &self,
        call: &CommandGraphCall,
        args: Args,
        kwargs: Kwargs,
    ) -> CommandResult<CommandValue> {
        self.enqueue(call, args, kwargs)?;
        Ok(CommandValue::Null)
    }

    /// Nothing is resolved until flush, so every command is assumed to exist.
    fn has_command(&self, _node: &CommandGraphNode, _command: &str) -> CommandResult<bool> {
        Ok(true)
    }

    /// Nothing is resolved until flush, so every well-formed item is assumed to
    /// exist.
    fn has_item(
        &self,
        node: &CommandGraphNode,
        object_type: ObjectType,
        _item: &str,
    ) -> CommandResult<bool> {
        check_item_category(node, object_type)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use cmdgraph_core::CommandFailure;
    use cmdgraph_interface::InMemoryObject;

    use crate::direct::DirectCommandInterface;

    /// A root with `record` (appends its first argument to a journal) and
    /// `fail`.
    fn setup() -> (DirectCommandInterface, Arc<StdMutex<Vec<i64>>>) {
        let journal = Arc::new(StdMutex::new(Vec::new()));
        let root = InMemoryObject::root();

        let sink = Arc::clone(&journal);
        root.add_command("record", move |args, _kwargs| {
            let n = args.first().and_then(CommandValue::as_i64).unwrap_or(-1);
            sink.lock().unwrap().push(n);
            Ok(CommandValue::Int(n))
        });
        root.add_command("fail", |_args, _kwargs| Err(CommandFailure::new("refused")));

        (DirectCommandInterface::new(root), journal)
    }

    fn record(lazy: &LazyCommandInterface, n: i64) {
        let call = CommandGraphNode::root().call("record");
        lazy.execute(&call, vec![CommandValue::Int(n)], Kwargs::new())
            .unwrap();
    }

    fn fail(lazy: &LazyCommandInterface) {
        let call = CommandGraphNode::root().call("fail");
        lazy.execute(&call, Args::new(), Kwargs::new()).unwrap();
    }

    #[test]
    fn execute_records_without_running() {
        let (_direct, journal) = setup();
        let lazy = LazyCommandInterface::new(FlushPolicy::FailFast);

        record(&lazy, 1);
        record(&lazy, 2);

        assert_eq!(lazy.len(), 2);
        assert!(journal.lock().unwrap().is_empty());
        let seqs: Vec<u64> = lazy.pending().iter().map(|d| d.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn flush_replays_in_insertion_order() {
        let (direct, journal) = setup();
        let lazy = LazyCommandInterface::new(FlushPolicy::FailFast);

        for n in [1, 2, 3] {
            record(&lazy, n);
        }
        let report = lazy.flush(&direct);

        assert!(report.is_success());
        assert_eq!(*journal.lock().unwrap(), vec![1, 2, 3]);
        assert!(lazy.is_empty());
        assert_eq!(
            report.into_result().unwrap(),
            vec![CommandValue::Int(1), CommandValue::Int(2), CommandValue::Int(3)]
        );
    }

    #[test]
    fn fail_fast_skips_the_rest() {
        let (direct, journal) = setup();
        let lazy = LazyCommandInterface::new(FlushPolicy::FailFast);

        record(&lazy, 1);
        fail(&lazy);
        record(&lazy, 3);

        let report = lazy.flush(&direct);
        assert_eq!(*journal.lock().unwrap(), vec![1]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].seq, 3);

        let err = report.into_result().unwrap_err();
        assert_eq!(err.seq, 2);
        assert!(matches!(err.source, CommandGraphError::Execution { .. }));
    }

    #[test]
    fn continue_on_error_attempts_everything() {
        let (direct, journal) = setup();
        let lazy = LazyCommandInterface::new(FlushPolicy::ContinueOnError);

        fail(&lazy);
        record(&lazy, 2);
        fail(&lazy);

        let report = lazy.flush(&direct);
        assert_eq!(*journal.lock().unwrap(), vec![2]);
        assert_eq!(report.failures.len(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(report.into_result().unwrap_err().failed, 2);
    }

    #[test]
    fn predicates_are_optimistic_but_reject_bad_categories() {
        let lazy = LazyCommandInterface::new(FlushPolicy::FailFast);
        let root = CommandGraphNode::root();
        let window = root.navigate(ObjectType::Window, None).unwrap();

        assert!(lazy.has_command(&window, "kill").unwrap());
        assert!(lazy.has_item(&root, ObjectType::Group, "anything").unwrap());
        assert!(lazy.has_item(&window, ObjectType::Bar, "top").is_err());
    }

    #[test]
    fn flush_survives_a_poisoned_log() {
        let (direct, journal) = setup();
        let lazy = Arc::new(LazyCommandInterface::new(FlushPolicy::FailFast));
        record(&lazy, 1);

        let poisoner = Arc::clone(&lazy);
        let _ = std::thread::spawn(move || {
            let _log = poisoner.log.lock().unwrap();
            panic!("recorder blew up");
        })
        .join();
        assert!(lazy.log.is_poisoned());

        record(&lazy, 2);
        assert_eq!(lazy.len(), 2);

        let report = lazy.flush(&direct);
        assert!(report.is_success());
        assert_eq!(*journal.lock().unwrap(), vec![1, 2]);
        assert!(lazy.is_empty());
    }

    #[test]
    fn clear_discards_pending_calls() {
        let lazy = LazyCommandInterface::new(FlushPolicy::ContinueOnError);
        record(&lazy, 1);
        assert_eq!(lazy.clear(), 1);
        assert!(lazy.is_empty());
    }
}
