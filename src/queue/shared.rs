//! # Shared event queue: bounded FIFO with drop-oldest overflow.
//!
//! [`EventQueue`] mediates any number of producers and the single consumer session.
//!
//! ## Architecture
//! ```text
//! Producers (many, any thread):          Consumer (one session):
//!   Producer ──┐                              ┌──► dequeue_blocking()    (async, cancellable)
//!   Producer ──┼──► enqueue() ──► [FIFO] ─────┼──► dequeue_nonblocking() (WouldBlock when empty)
//!   Ingress  ──┘     (never blocks)   │       └──► poll_readiness() / wait_readable()
//!                                     └──► Notify::notify_waiters() after every insert/close
//! ```
//!
//! ## Rules
//! - **Hard ceiling**: `len() <= capacity` after every operation; at capacity the oldest
//!   record is evicted *before* the new one is appended.
//! - **FIFO**: insertion order is delivery order.
//! - **Non-blocking producers**: `enqueue()` only takes the mutex for a bounded amount of work.
//! - **Rate-limited overload notice**: at most one notice per `notice_interval`.
//! - **No missed wakeups**: waiters enable their `Notified` future before checking state.
//!
//! ## Session epochs
//! Every `open()` starts a new epoch. A wait that observes a different epoch (or no
//! open session) returns [`QueueError::Closed`], so `close()` releases every blocked reader.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::QueueError;
use crate::events::EventRecord;
use crate::queue::{Producer, Session};
use crate::sinks::{LogSink, TracingSink};

/// Result of a zero-wait readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one record is queued.
    Readable,
    /// Nothing queued; use [`EventQueue::wait_readable`] to be woken.
    Empty,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Records currently queued.
    pub queued: usize,
    /// Configured ceiling.
    pub capacity: usize,
    /// Records accepted since creation.
    pub enqueued: u64,
    /// Records evicted by the drop-oldest policy.
    pub evicted: u64,
    /// Overload notices emitted.
    pub overflow_notices: u64,
}

/// Mutable state guarded by the queue mutex.
struct QueueState {
    records: VecDeque<EventRecord>,
    open: bool,
    non_blocking: bool,
    epoch: u64,
    enqueued: u64,
    evicted: u64,
    dropped_since_notice: u64,
    overflow_notices: u64,
    last_notice: Option<Instant>,
}

impl QueueState {
    fn is_current(&self, epoch: u64) -> bool {
        self.open && self.epoch == epoch
    }
}

/// Bounded, synchronized, pollable event queue.
pub struct EventQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    notice_interval: Option<Duration>,
    notices: Arc<dyn LogSink>,
}

impl EventQueue {
    /// Creates a queue sized and rate-limited from `cfg`, reporting overload through `tracing`.
    pub fn new(cfg: &Config) -> Arc<Self> {
        Self::with_notice_sink(cfg, Arc::new(TracingSink))
    }

    /// Creates a queue that reports overload notices to `notices`.
    pub fn with_notice_sink(cfg: &Config, notices: Arc<dyn LogSink>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                records: VecDeque::new(),
                open: false,
                non_blocking: false,
                epoch: 0,
                enqueued: 0,
                evicted: 0,
                dropped_since_notice: 0,
                overflow_notices: 0,
                last_notice: None,
            }),
            notify: Notify::new(),
            capacity: cfg.queue_capacity_clamped(),
            notice_interval: cfg.notice_interval(),
            notices,
        })
    }

    /// Creates a queue with the given capacity and default settings otherwise.
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let cfg = Config {
            queue_capacity: capacity,
            ..Config::default()
        };
        Self::new(&cfg)
    }

    /// Returns a producer handle for this queue.
    pub fn producer(self: &Arc<Self>) -> Producer {
        Producer::new(Arc::clone(self))
    }

    /// Configured capacity (already clamped to at least 1).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Returns a snapshot of the queue counters.
    pub fn stats(&self) -> QueueStats {
        let st = self.lock();
        QueueStats {
            queued: st.records.len(),
            capacity: self.capacity,
            enqueued: st.enqueued,
            evicted: st.evicted,
            overflow_notices: st.overflow_notices,
        }
    }

    /// Appends `record`, evicting the oldest records while at capacity.
    ///
    /// ### Flow
    /// 1. Reserve room for one more slot (failure → [`QueueError::OutOfMemory`], record dropped)
    /// 2. While `len >= capacity`: evict the head, maybe schedule an overload notice
    /// 3. Append at the tail
    /// 4. Release the lock, emit the notice (if any), wake every waiter
    ///
    /// Never awaits and never waits for the consumer.
    pub fn enqueue(&self, record: EventRecord) -> Result<(), QueueError> {
        let notice = {
            let mut st = self.lock();
            if st.records.len() < self.capacity && st.records.try_reserve(1).is_err() {
                return Err(QueueError::OutOfMemory);
            }

            let mut notice = None;
            while st.records.len() >= self.capacity {
                st.records.pop_front();
                st.evicted += 1;
                st.dropped_since_notice += 1;
                if self.notice_due(&st) {
                    st.last_notice = Some(Instant::now());
                    st.overflow_notices += 1;
                    notice = Some(std::mem::take(&mut st.dropped_since_notice));
                }
            }
            st.records.push_back(record);
            st.enqueued += 1;
            notice
        };

        if let Some(dropped) = notice {
            self.notices.emit(&format!(
                "event queue is full, messages are dropped ({dropped} since last notice)"
            ));
        }
        self.notify.notify_waiters();
        Ok(())
    }

    fn notice_due(&self, st: &QueueState) -> bool {
        match (self.notice_interval, st.last_notice) {
            (None, _) | (_, None) => true,
            (Some(interval), Some(last)) => last.elapsed() >= interval,
        }
    }

    /// Removes and returns the head, waiting while the queue is empty.
    ///
    /// ### Results
    /// - `Ok(record)` the oldest queued record
    /// - `Err(Closed)` no session is open, or it was closed while waiting
    /// - `Err(Interrupted)` `interrupt` was cancelled while waiting
    pub async fn dequeue_blocking(
        &self,
        interrupt: &CancellationToken,
    ) -> Result<EventRecord, QueueError> {
        let epoch = self.current_epoch()?;
        self.dequeue_blocking_in(epoch, interrupt).await
    }

    /// Removes and returns the head, or [`QueueError::WouldBlock`] when empty.
    pub fn dequeue_nonblocking(&self) -> Result<EventRecord, QueueError> {
        let epoch = self.current_epoch()?;
        self.dequeue_nonblocking_in(epoch)
    }

    /// Zero-wait readiness check.
    ///
    /// Returns [`Readiness::Empty`] without consuming anything when nothing is queued;
    /// pair it with [`EventQueue::wait_readable`] to be woken by the next enqueue or close.
    pub fn poll_readiness(&self) -> Result<Readiness, QueueError> {
        let epoch = self.current_epoch()?;
        self.poll_readiness_in(epoch)
    }

    /// Waits until a record is queued (without consuming it) or the session closes.
    pub async fn wait_readable(&self, interrupt: &CancellationToken) -> Result<(), QueueError> {
        let epoch = self.current_epoch()?;
        self.wait_readable_in(epoch, interrupt).await
    }

    /// Discards every queued record and returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut st = self.lock();
        let n = st.records.len();
        st.records.clear();
        n
    }

    // ---- session plumbing ----

    /// Opens the single consumer session.
    ///
    /// Fails with [`QueueError::Busy`] while another session is open.
    pub fn open(self: &Arc<Self>) -> Result<Session, QueueError> {
        self.open_with_interrupt(CancellationToken::new())
    }

    /// Opens the session; blocking waits made through it abort when `interrupt` is cancelled.
    pub fn open_with_interrupt(
        self: &Arc<Self>,
        interrupt: CancellationToken,
    ) -> Result<Session, QueueError> {
        let epoch = {
            let mut st = self.lock();
            if st.open {
                return Err(QueueError::Busy);
            }
            st.open = true;
            st.non_blocking = false;
            st.epoch += 1;
            st.epoch
        };
        tracing::debug!(epoch, "session opened");
        Ok(Session::new(Arc::clone(self), epoch, interrupt))
    }

    /// Closes the session identified by `epoch` and wakes every waiter.
    ///
    /// Returns `false` if that session was already closed.
    pub(crate) fn close_session(&self, epoch: u64) -> bool {
        let closed = {
            let mut st = self.lock();
            if st.is_current(epoch) {
                st.open = false;
                st.non_blocking = false;
                true
            } else {
                false
            }
        };
        if closed {
            tracing::debug!(epoch, "session closed");
            self.notify.notify_waiters();
        }
        closed
    }

    pub(crate) fn set_nonblocking_in(&self, epoch: u64, on: bool) -> Result<(), QueueError> {
        let mut st = self.lock();
        if !st.is_current(epoch) {
            return Err(QueueError::Closed);
        }
        st.non_blocking = on;
        Ok(())
    }

    pub(crate) fn is_nonblocking_in(&self, epoch: u64) -> Result<bool, QueueError> {
        let st = self.lock();
        if !st.is_current(epoch) {
            return Err(QueueError::Closed);
        }
        Ok(st.non_blocking)
    }

    pub(crate) fn dequeue_nonblocking_in(&self, epoch: u64) -> Result<EventRecord, QueueError> {
        let mut st = self.lock();
        if !st.is_current(epoch) {
            return Err(QueueError::Closed);
        }
        st.records.pop_front().ok_or(QueueError::WouldBlock)
    }

    pub(crate) async fn dequeue_blocking_in(
        &self,
        epoch: u64,
        interrupt: &CancellationToken,
    ) -> Result<EventRecord, QueueError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut st = self.lock();
                if !st.is_current(epoch) {
                    return Err(QueueError::Closed);
                }
                if let Some(record) = st.records.pop_front() {
                    return Ok(record);
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = interrupt.cancelled() => return Err(QueueError::Interrupted),
            }
        }
    }

    pub(crate) fn poll_readiness_in(&self, epoch: u64) -> Result<Readiness, QueueError> {
        let st = self.lock();
        if !st.is_current(epoch) {
            return Err(QueueError::Closed);
        }
        Ok(if st.records.is_empty() {
            Readiness::Empty
        } else {
            Readiness::Readable
        })
    }

    pub(crate) async fn wait_readable_in(
        &self,
        epoch: u64,
        interrupt: &CancellationToken,
    ) -> Result<(), QueueError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.poll_readiness_in(epoch)? == Readiness::Readable {
                return Ok(());
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = interrupt.cancelled() => return Err(QueueError::Interrupted),
            }
        }
    }

    fn current_epoch(&self) -> Result<u64, QueueError> {
        let st = self.lock();
        if st.open {
            Ok(st.epoch)
        } else {
            Err(QueueError::Closed)
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("capacity", &self.capacity)
            .field("notice_interval", &self.notice_interval)
            .field("notices", &self.notices.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Severity;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Collect(StdMutex<Vec<String>>);

    impl LogSink for Collect {
        fn emit(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn rec(text: &str) -> EventRecord {
        EventRecord::raw_string(Severity::Info, text).unwrap()
    }

    fn queue_with_sink(capacity: usize) -> (Arc<EventQueue>, Arc<Collect>) {
        let sink = Arc::new(Collect::default());
        let cfg = Config {
            queue_capacity: capacity,
            ..Config::default()
        };
        (EventQueue::with_notice_sink(&cfg, sink.clone()), sink)
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let q = EventQueue::with_capacity(3);
        for i in 0..10 {
            q.enqueue(rec(&i.to_string())).unwrap();
            assert!(q.len() <= 3);
        }
        let stats = q.stats();
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.enqueued, 10);
        assert_eq!(stats.evicted, 7);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let q = EventQueue::with_capacity(0);
        q.enqueue(rec("a")).unwrap();
        q.enqueue(rec("b")).unwrap();
        assert_eq!(q.capacity(), 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_dequeue_requires_open_session() {
        let q = EventQueue::with_capacity(2);
        q.enqueue(rec("a")).unwrap();
        assert_eq!(q.dequeue_nonblocking(), Err(QueueError::Closed));
        assert_eq!(q.poll_readiness(), Err(QueueError::Closed));
    }

    #[test]
    fn test_nonblocking_empty_would_block() {
        let q = EventQueue::with_capacity(2);
        let _s = q.open().unwrap();
        assert_eq!(q.dequeue_nonblocking(), Err(QueueError::WouldBlock));
        assert_eq!(q.poll_readiness(), Ok(Readiness::Empty));
        q.enqueue(rec("a")).unwrap();
        assert_eq!(q.poll_readiness(), Ok(Readiness::Readable));
        assert_eq!(q.dequeue_nonblocking().unwrap().text(), Some("a"));
    }

    #[test]
    fn test_overflow_notice_once_per_burst() {
        let (q, sink) = queue_with_sink(2);
        for i in 0..50 {
            q.enqueue(rec(&i.to_string())).unwrap();
        }
        let lines = sink.0.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("event queue is full"));
        assert_eq!(q.stats().overflow_notices, 1);
        assert_eq!(q.stats().evicted, 48);
    }

    #[test]
    fn test_unlimited_notices_when_interval_zero() {
        let sink = Arc::new(Collect::default());
        let cfg = Config {
            queue_capacity: 1,
            overflow_notice_interval: Duration::ZERO,
            ..Config::default()
        };
        let q = EventQueue::with_notice_sink(&cfg, sink.clone());
        for i in 0..5 {
            q.enqueue(rec(&i.to_string())).unwrap();
        }
        assert_eq!(sink.0.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_notices_rate_limited_over_time() {
        let (q, sink) = queue_with_sink(10);
        // Ten records fill the queue at t=0; the other sixty arrive one per second
        // from t=0 to t=59s, each evicting the head.
        for i in 0..70 {
            q.enqueue(rec(&i.to_string())).unwrap();
            if i >= 10 {
                tokio::time::advance(Duration::from_secs(1)).await;
            }
        }
        // Overflow starts at t=0 and runs until t=59s: notices at 0s and 30s.
        assert_eq!(sink.0.lock().unwrap().len(), 2);
        assert_eq!(q.stats().evicted, 60);
    }

    #[tokio::test]
    async fn test_blocking_dequeue_wakes_on_enqueue() {
        let q = EventQueue::with_capacity(4);
        let _s = q.open().unwrap();
        let token = CancellationToken::new();

        let q2 = Arc::clone(&q);
        let producer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            q2.enqueue(rec("late")).unwrap();
        });

        let got = q.dequeue_blocking(&token).await.unwrap();
        assert_eq!(got.text(), Some("late"));
        producer.await.unwrap();
    }

    #[tokio::test]
    async fn test_blocking_dequeue_interrupted() {
        let q = EventQueue::with_capacity(4);
        let _s = q.open().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(q.dequeue_blocking(&token).await, Err(QueueError::Interrupted));
    }
}
