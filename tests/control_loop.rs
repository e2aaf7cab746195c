use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eventd::{
    Config, ControlLoop, DaemonError, Detach, Endpoint, EventQueue, EventRecord, LogRouter,
    LogSink, LoopState, PidFile, QueueError, RECORD_SIZE, Readiness, Session, Severity, wire,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl LogSink for Recorder {
    fn emit(&self, line: &str) {
        self.0.lock().unwrap().push(line.to_string());
    }
}

struct Sinks {
    router: Arc<LogRouter>,
    attached: Arc<Recorder>,
    detached: Arc<Recorder>,
}

fn sinks() -> Sinks {
    let attached = Arc::new(Recorder::default());
    let detached = Arc::new(Recorder::default());
    let router = Arc::new(LogRouter::new(attached.clone(), detached.clone()));
    Sinks {
        router,
        attached,
        detached,
    }
}

#[derive(Clone, Default)]
struct CountingDetacher(Arc<AtomicUsize>);

impl Detach for CountingDetacher {
    fn detach(&mut self) -> io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingDetacher;

impl Detach for FailingDetacher {
    fn detach(&mut self) -> io::Result<()> {
        Err(io::Error::other("no fork for you"))
    }
}

/// Session wrapper counting `close()` calls.
struct CountingEndpoint {
    inner: Session,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Endpoint for CountingEndpoint {
    fn poll(&self) -> Result<Readiness, QueueError> {
        self.inner.poll()
    }
    async fn readable(&self) -> Result<(), QueueError> {
        self.inner.readable().await
    }
    async fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError> {
        self.inner.read(buf).await
    }
    fn close(&self) -> bool {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

enum Step {
    Chunk(Vec<u8>),
    Eof,
    Fail(QueueError),
}

/// Endpoint replaying scripted reads; readable only while steps remain.
struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    closes: Arc<AtomicUsize>,
    waits: Arc<Mutex<Vec<Instant>>>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let (endpoint, closes, _) = Self::timed(steps);
        (endpoint, closes)
    }

    /// Like `new`, also recording when each readiness wait starts.
    fn timed(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>, Arc<Mutex<Vec<Instant>>>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let waits = Arc::new(Mutex::new(Vec::new()));
        let endpoint = Self {
            steps: Mutex::new(steps.into()),
            closes: closes.clone(),
            waits: waits.clone(),
        };
        (endpoint, closes, waits)
    }
}

fn wait_offsets(start: Instant, waits: &Mutex<Vec<Instant>>) -> Vec<u64> {
    waits
        .lock()
        .unwrap()
        .iter()
        .map(|at| at.duration_since(start).as_secs())
        .collect()
}

#[async_trait]
impl Endpoint for Scripted {
    fn poll(&self) -> Result<Readiness, QueueError> {
        Ok(Readiness::Empty)
    }
    async fn readable(&self) -> Result<(), QueueError> {
        self.waits.lock().unwrap().push(Instant::now());
        if self.steps.lock().unwrap().is_empty() {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
    async fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError> {
        let mut steps = self.steps.lock().unwrap();
        match steps.pop_front() {
            Some(Step::Chunk(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    steps.push_front(Step::Chunk(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Step::Eof) | None => Ok(0),
            Some(Step::Fail(e)) => Err(e),
        }
    }
    fn close(&self) -> bool {
        self.closes.fetch_add(1, Ordering::SeqCst) == 0
    }
}

fn cancel_after(token: &CancellationToken, after: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        token.cancel();
    });
}

fn record_frame(severity: Severity, text: &str) -> Vec<u8> {
    wire::encode(&EventRecord::raw_string(severity, text).unwrap()).to_vec()
}

#[tokio::test(start_paused = true)]
async fn dispatches_raw_string_record() {
    let cfg = Config::default().with_attached(true);
    let queue = EventQueue::new(&cfg);
    let session = queue.open().unwrap();
    queue
        .producer()
        .submit_raw_string(Severity::Warning, "disk full")
        .unwrap();

    let s = sinks();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(1));

    control.run(&shutdown).await.unwrap();
    assert_eq!(
        s.attached.lines(),
        vec!["[EVT_LOG] level='WARNING'; message='disk full'".to_string()]
    );
    assert_eq!(control.dispatched(), 1);
    assert_eq!(control.state(), LoopState::Terminating);
}

#[tokio::test(start_paused = true)]
async fn attached_mode_never_detaches() {
    let cfg = Config::default().with_attached(true);
    let queue = EventQueue::new(&cfg);
    let session = queue.open().unwrap();
    queue.producer().submit_raw_string(Severity::Info, "hello").unwrap();

    let s = sinks();
    let detacher = CountingDetacher::default();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg)
        .with_detacher(Box::new(detacher.clone()));
    assert_eq!(control.state(), LoopState::Polling(eventd::PollSpeed::Slow));

    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(30));
    control.run(&shutdown).await.unwrap();

    assert_eq!(detacher.0.load(Ordering::SeqCst), 0);
    assert!(!s.router.is_detached());
    assert_eq!(s.attached.lines().len(), 1);
    assert!(s.detached.lines().is_empty());
}

#[tokio::test(start_paused = true)]
async fn detach_handshake_runs_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("eventd.pid");
    let cfg = Config {
        pid_file: pid_path.clone(),
        ..Config::default()
    };
    let queue = EventQueue::new(&cfg);
    let session = queue.open().unwrap();

    let s = sinks();
    let detacher = CountingDetacher::default();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg)
        .with_detacher(Box::new(detacher.clone()))
        .with_pid_file(PidFile::acquire(&pid_path).unwrap());
    assert_eq!(control.state(), LoopState::Bootstrapping);

    let producer = queue.producer();
    tokio::spawn(async move {
        for i in 0..3 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            producer.submit_raw_string(Severity::Error, &format!("e{i}")).unwrap();
        }
    });

    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(60));
    control.run(&shutdown).await.unwrap();

    assert_eq!(detacher.0.load(Ordering::SeqCst), 1);
    assert!(s.router.is_detached());
    assert!(s.attached.lines().is_empty());
    assert_eq!(
        s.detached.lines(),
        vec![
            "[EVT_LOG] level='ERROR'; message='e0'".to_string(),
            "[EVT_LOG] level='ERROR'; message='e1'".to_string(),
            "[EVT_LOG] level='ERROR'; message='e2'".to_string(),
        ]
    );

    let written = std::fs::read_to_string(&pid_path).unwrap();
    assert_eq!(written.trim(), std::process::id().to_string());
    control.take_pid_file().unwrap().remove().unwrap();
    assert!(!pid_path.exists());
}

#[tokio::test(start_paused = true)]
async fn detach_failure_ends_loop() {
    let cfg = Config::default();
    let queue = EventQueue::new(&cfg);
    let session = queue.open().unwrap();

    let s = sinks();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg)
        .with_detacher(Box::new(FailingDetacher));

    let err = control.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, DaemonError::Detach(_)));
    assert!(!s.router.is_detached());
    // The session was closed on the way out.
    assert!(queue.open().is_ok());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_readiness_wait_exits_promptly_and_closes_once() {
    let cfg = Config::default().with_attached(true);
    let queue = EventQueue::new(&cfg);
    let closes = Arc::new(AtomicUsize::new(0));
    let endpoint = CountingEndpoint {
        inner: queue.open().unwrap(),
        closes: closes.clone(),
    };

    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(3));

    let started = Instant::now();
    control.run(&shutdown).await.unwrap();

    assert!(started.elapsed() <= cfg.slow_poll);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    // Running again after termination does not close a second time.
    control.run(&shutdown).await.unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(queue.open().is_ok());
}

#[tokio::test(start_paused = true)]
async fn record_split_across_reads_is_reassembled() {
    let frame = record_frame(Severity::Info, "split");
    let (head, tail) = frame.split_at(500);
    let (endpoint, closes) = Scripted::new(vec![
        Step::Chunk(head.to_vec()),
        Step::Chunk(tail.to_vec()),
    ]);

    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(1));
    control.run(&shutdown).await.unwrap();

    assert_eq!(
        s.attached.lines(),
        vec!["[EVT_LOG] level='INFO'; message='split'".to_string()]
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_record_is_discarded_and_loop_continues() {
    let frame = record_frame(Severity::Info, "after");
    let (endpoint, _) = Scripted::new(vec![
        Step::Chunk(vec![0u8; RECORD_SIZE / 2]),
        Step::Eof,
        Step::Chunk(frame),
    ]);

    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(1));
    control.run(&shutdown).await.unwrap();

    assert_eq!(control.discarded(), 1);
    assert_eq!(control.dispatched(), 1);
    assert_eq!(
        s.attached.lines(),
        vec![
            "eventd fail to read".to_string(),
            "[EVT_LOG] level='INFO'; message='after'".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unsupported_kind_and_unknown_level_are_reported() {
    let mut frame = vec![0u8; RECORD_SIZE];
    frame[0..4].copy_from_slice(&7i32.to_ne_bytes());
    let mut odd_level = record_frame(Severity::Info, "odd");
    odd_level[4..8].copy_from_slice(&9i32.to_ne_bytes());

    let (endpoint, _) = Scripted::new(vec![Step::Chunk(frame), Step::Chunk(odd_level)]);
    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(1));
    control.run(&shutdown).await.unwrap();

    assert_eq!(
        s.attached.lines(),
        vec![
            "type not supported (kind 7)".to_string(),
            "[EVT_LOG] level='UNKNOWN'; message='odd'".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn hard_read_error_closes_and_exits() {
    let (endpoint, closes) = Scripted::new(vec![Step::Fail(QueueError::Closed)]);
    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);

    let err = control.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, DaemonError::Read(QueueError::Closed)));
    assert_eq!(s.attached.lines(), vec!["eventd fail to read".to_string()]);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(control.state(), LoopState::Terminating);
}

#[tokio::test(start_paused = true)]
async fn interrupted_wait_without_shutdown_is_an_error() {
    let cfg = Config::default().with_attached(true);
    let queue = EventQueue::new(&cfg);
    let interrupt = CancellationToken::new();
    let session = queue.open_with_interrupt(interrupt.clone()).unwrap();

    let s = sinks();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg);
    cancel_after(&interrupt, Duration::from_secs(1));

    let err = control.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, DaemonError::Readiness(QueueError::Interrupted)));
    assert!(queue.open().is_ok());
}

#[tokio::test(start_paused = true)]
async fn interrupt_from_shutdown_is_a_clean_exit() {
    let cfg = Config::default().with_attached(true);
    let queue = EventQueue::new(&cfg);
    let shutdown = CancellationToken::new();
    let session = queue.open_with_interrupt(shutdown.child_token()).unwrap();

    let s = sinks();
    let mut control = ControlLoop::new(session, s.router.clone(), &cfg);
    cancel_after(&shutdown, Duration::from_secs(1));
    control.run(&shutdown).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn overload_notice_reaches_active_sink() {
    let s = sinks();
    let cfg = Config {
        queue_capacity: 2,
        ..Config::default()
    };
    let queue = EventQueue::with_notice_sink(&cfg, s.router.clone());
    let producer = queue.producer();
    for i in 0..5 {
        producer.submit_raw_string(Severity::Info, &i.to_string()).unwrap();
    }
    s.router.switch_to_detached();
    tokio::time::advance(Duration::from_secs(31)).await;
    producer.submit_raw_string(Severity::Info, "5").unwrap();

    assert_eq!(s.attached.lines().len(), 1);
    assert_eq!(s.detached.lines().len(), 1);
    assert!(s.detached.lines()[0].starts_with("event queue is full"));
}

#[tokio::test(start_paused = true)]
async fn successful_read_shortens_next_wait_then_idle_falls_back_to_slow() {
    let (endpoint, _, waits) =
        Scripted::timed(vec![Step::Chunk(record_frame(Severity::Info, "once"))]);
    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(25));

    let start = Instant::now();
    control.run(&shutdown).await.unwrap();

    // Ready at once, 2s fast wait after the dispatch, then 10s slow waits.
    assert_eq!(wait_offsets(start, &waits), vec![0, 0, 2, 12, 22]);
    assert_eq!(control.dispatched(), 1);
}

#[tokio::test(start_paused = true)]
async fn discarded_read_keeps_slow_wait() {
    let (endpoint, _, waits) =
        Scripted::timed(vec![Step::Chunk(vec![0u8; RECORD_SIZE / 2]), Step::Eof]);
    let cfg = Config::default().with_attached(true);
    let s = sinks();
    let mut control = ControlLoop::new(endpoint, s.router.clone(), &cfg);
    let shutdown = CancellationToken::new();
    cancel_after(&shutdown, Duration::from_secs(25));

    let start = Instant::now();
    control.run(&shutdown).await.unwrap();

    assert_eq!(wait_offsets(start, &waits), vec![0, 0, 10, 20]);
    assert_eq!(control.discarded(), 1);
    assert_eq!(control.dispatched(), 0);
}
