//! `eventd` binary: hosts the event queue, its ingress socket and the consumer loop.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use eventd::cli::{self, Command, EXIT_BAD_OPTION};
use eventd::daemon::spawn_signal_watcher;
use eventd::{
    Config, ControlLoop, DaemonError, EventQueue, Ingress, LogRouter, LogSink, PidFile,
    StdoutSink, SyslogSink,
};

fn main() -> ExitCode {
    let args: Vec<OsString> = std::env::args_os().collect();
    let prog = args
        .first()
        .and_then(|p| Path::new(p).file_name())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "eventd".to_string());

    match cli::parse(args.clone()) {
        Command::Help => {
            eprint!("{}", cli::usage(&prog));
            ExitCode::SUCCESS
        }
        Command::Version => {
            println!("{}", cli::version(&prog));
            ExitCode::SUCCESS
        }
        Command::BadOption => {
            println!("{}", cli::version(&prog));
            ExitCode::from(EXIT_BAD_OPTION as u8)
        }
        Command::Run { attached } => run(Config::default().with_attached(attached)),
    }
}

fn run(cfg: Config) -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Single-threaded runtime: the detach handshake forks the process.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(serve(cfg)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(label = e.as_label(), "{}", e.as_message());
            ExitCode::FAILURE
        }
    }
}

async fn serve(cfg: Config) -> Result<(), DaemonError> {
    let attached: Arc<dyn LogSink> = Arc::new(StdoutSink::new());
    let detached: Arc<dyn LogSink> = if cfg.attached {
        attached.clone()
    } else {
        Arc::new(SyslogSink::open(&cfg.syslog_ident))
    };
    let router = Arc::new(LogRouter::new(attached, detached));
    let queue = EventQueue::with_notice_sink(&cfg, router.clone());
    let shutdown = CancellationToken::new();

    let pid_file = PidFile::acquire(&cfg.pid_file)?;

    let session = match queue.open_with_interrupt(shutdown.child_token()) {
        Ok(session) => session,
        Err(e) => {
            router.emit(&format!("Can't open event session: {e}"));
            return Err(DaemonError::Open(e));
        }
    };

    let ingress = match &cfg.ingress_socket {
        Some(path) => Some(Ingress::bind(path, queue.producer())?),
        None => None,
    };

    let signals = spawn_signal_watcher(shutdown.clone());
    let ingress_task = ingress.map(|ingress| tokio::spawn(ingress.run(shutdown.clone())));

    let mut control = ControlLoop::new(session, router.clone(), &cfg).with_pid_file(pid_file);
    let res = control.run(&shutdown).await;

    shutdown.cancel();
    if let Some(task) = ingress_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "ingress task failed");
        }
    }
    if let Ok(Err(e)) = signals.await {
        tracing::warn!(error = %e, "signal watcher failed");
    }

    let dropped = queue.clear();
    if dropped > 0 {
        tracing::info!(dropped, "undelivered records discarded at exit");
    }

    if res.is_ok() {
        if let Some(pid_file) = control.take_pid_file() {
            pid_file.remove()?;
        }
    }
    res
}
