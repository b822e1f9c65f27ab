//! Run a build command and stream its output through an [`OutputConsumer`].

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;

use crate::e_outputconsumer::{Channel, OutputConsumer};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static ACTIVE_RUNS: AtomicUsize = AtomicUsize::new(0);
static CTRLC: Once = Once::new();

/// Exit status used when Ctrl-C stops `cmake-e` itself.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CtrlCAction {
    KillChild,
    Exit,
}

/// While a build runs Ctrl-C stops the child; otherwise it stops us.
fn ctrlc_action(active_runs: usize) -> CtrlCAction {
    if active_runs > 0 {
        CtrlCAction::KillChild
    } else {
        CtrlCAction::Exit
    }
}

/// Counts a build as running until dropped.
struct ActiveRun;

impl ActiveRun {
    fn start() -> Self {
        ACTIVE_RUNS.fetch_add(1, Ordering::SeqCst);
        ActiveRun
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        ACTIVE_RUNS.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Copy every decoded line to our own stdout/stderr as it arrives.
    pub echo: bool,
}

fn lock(consumer: &Mutex<OutputConsumer>) -> MutexGuard<'_, OutputConsumer> {
    consumer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn install_ctrlc_handler() {
    CTRLC.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| match ctrlc_action(ACTIVE_RUNS.load(Ordering::SeqCst)) {
            CtrlCAction::KillChild => INTERRUPTED.store(true, Ordering::SeqCst),
            CtrlCAction::Exit => std::process::exit(INTERRUPTED_EXIT_CODE),
        }) {
            log::warn!("could not install Ctrl-C handler: {}", e);
        }
    });
}

fn pump<R>(
    reader: R,
    channel: Channel,
    consumer: Arc<Mutex<OutputConsumer>>,
    echo: bool,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let mut consumer = lock(&consumer);
                    let line = consumer.decoder().decode(&buf);
                    if echo {
                        match channel {
                            Channel::Output => println!("{}", line),
                            Channel::Error => eprintln!("{}", line),
                        }
                    }
                    consumer.feed(channel, &line);
                }
                Err(e) => {
                    log::warn!("reading {:?} failed: {}", channel, e);
                    break;
                }
            }
        }
        log::trace!("{:?} closed", channel);
        lock(&consumer).close(channel);
    })
}

/// Spawn `cmd`, feed both pipes to `consumer`, and wait for it to exit.
pub fn run_with_consumer(
    cmd: &mut Command,
    consumer: &Arc<Mutex<OutputConsumer>>,
) -> anyhow::Result<ExitStatus> {
    run_with_options(cmd, consumer, RunOptions::default())
}

/// Like [`run_with_consumer`]. Ctrl-C kills the child; whatever the
/// grammars were holding is still flushed into the consumer. Once no build
/// is running, Ctrl-C exits the process with [`INTERRUPTED_EXIT_CODE`].
pub fn run_with_options(
    cmd: &mut Command,
    consumer: &Arc<Mutex<OutputConsumer>>,
    options: RunOptions,
) -> anyhow::Result<ExitStatus> {
    log::debug!("running {:?}", cmd);
    let program = cmd.get_program().to_os_string();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {:?}", program))?;

    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;
    let out_handle = pump(stdout, Channel::Output, Arc::clone(consumer), options.echo);
    let err_handle = pump(stderr, Channel::Error, Arc::clone(consumer), options.echo);

    let _active = ActiveRun::start();
    install_ctrlc_handler();
    INTERRUPTED.store(false, Ordering::SeqCst);
    let status = loop {
        if INTERRUPTED.swap(false, Ordering::SeqCst) {
            log::warn!("interrupted, killing pid {}", child.id());
            if let Err(e) = child.kill() {
                log::warn!("kill failed: {}", e);
            }
        }
        if let Some(status) = child.try_wait().context("waiting for build process")? {
            break status;
        }
        thread::sleep(Duration::from_millis(25));
    };

    for handle in [out_handle, err_handle] {
        if handle.join().is_err() {
            log::warn!("output reader thread panicked");
        }
    }
    lock(consumer).finish();
    if options.echo {
        let _ = std::io::stdout().flush();
    }
    log::debug!("build process exited with {}", status);
    Ok(status)
}

/// Feed a captured build log to `consumer` as if it were stderr, then
/// finish it. Returns the number of lines read.
pub fn replay_log(path: &Path, consumer: &mut OutputConsumer) -> anyhow::Result<usize> {
    let bytes = fs::read(path).with_context(|| format!("reading build log {}", path.display()))?;
    let mut records: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    if records.last().is_some_and(|r| r.is_empty()) {
        records.pop();
    }
    for record in &records {
        consumer.error_bytes(record);
    }
    consumer.finish();
    log::debug!("replayed {} line(s) from {}", records.len(), path.display());
    Ok(records.len())
}
