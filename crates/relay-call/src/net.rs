//! `NetPullCmd` — a pull resolved by the transport.
//!
//! Construction splits the call into two halves:
//!
//! - `NetPullCmd`, held by the caller, which reads the outcome.
//! - `PullCompleter`, handed to whatever runs the send/receive cycle,
//!   which writes it exactly once.
//!
//! The caller's `result()` waits on the outcome while watching the call
//! context. If the context is cancelled or expires first, the waiter
//! resolves the call itself with a classified error and any later
//! completion is ignored. A completer dropped without completing resolves
//! the call the same way, so a caller can never hang on a lost task.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use relay_core::context::CANCEL_POLL;
use relay_core::{kdebug, Args, Context, Dispatcher, Packet, Ptype};
use rerror::{Rerror, RERR_CONN_CLOSED};

use crate::{done_rerror, PullCmd};

/// Resolved state. Written once, then read-only.
struct Outcome<R> {
    reply: Option<R>,
    rerr: Option<Rerror>,
    meta: Args,
    cost: Duration,
}

/// State shared by the command and its completer.
struct Shared<R> {
    output: Packet,
    outcome: OnceLock<Outcome<R>>,
    lock: Mutex<()>,
    cond: Condvar,
    start: Instant,
    count_time: bool,
}

impl<R> Shared<R> {
    fn elapsed(&self) -> Duration {
        if self.count_time {
            self.start.elapsed()
        } else {
            Duration::ZERO
        }
    }

    /// Publish an outcome. The caller must hold `lock`.
    fn publish_locked(&self, reply: Option<R>, rerr: Option<Rerror>, meta: Args) -> bool {
        let outcome = Outcome {
            reply,
            rerr,
            meta,
            cost: self.elapsed(),
        };
        if self.outcome.set(outcome).is_err() {
            return false;
        }
        self.cond.notify_all();
        true
    }

    fn publish(&self, reply: Option<R>, rerr: Option<Rerror>, meta: Args) -> bool {
        let _guard = lock(&self.lock);
        self.publish_locked(reply, rerr, meta)
    }

    /// Block until resolved, resolving from the context if it finishes first.
    fn wait(&self) -> &Outcome<R> {
        let ctx = self.output.context();
        let mut guard = lock(&self.lock);
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome;
            }
            if let Some(done) = ctx.done() {
                kdebug!("pull {} resolved by context: {:?}", self.output.uri(), done);
                self.publish_locked(None, Some(done_rerror(done)), Args::new());
                continue;
            }
            if ctx.is_background() {
                // Only a completer can resolve it.
                guard = self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            let step = ctx.remaining().map_or(CANCEL_POLL, |left| left.min(CANCEL_POLL));
            guard = self
                .cond
                .wait_timeout(guard, step.max(Duration::from_millis(1)))
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

/// Network-backed pull command
pub struct NetPullCmd<R> {
    shared: Arc<Shared<R>>,
}

/// Write half of a `NetPullCmd`. Owned by the task running the exchange.
pub struct PullCompleter<R> {
    shared: Arc<Shared<R>>,
}

impl<R> NetPullCmd<R> {
    /// Start a pull for `output`, forcing its type to `Pull`.
    ///
    /// With `count_time` the round-trip time is measured from this call
    /// to resolution; without it `cost_time()` is always zero.
    pub fn new(mut output: Packet, count_time: bool) -> (Self, PullCompleter<R>) {
        output.set_ptype(Ptype::Pull);
        let shared = Arc::new(Shared {
            output,
            outcome: OnceLock::new(),
            lock: Mutex::new(()),
            cond: Condvar::new(),
            start: Instant::now(),
            count_time,
        });
        (
            NetPullCmd {
                shared: Arc::clone(&shared),
            },
            PullCompleter { shared },
        )
    }

    /// The outcome if already resolved, without blocking.
    pub fn try_result(&self) -> Option<(Option<&R>, Option<&Rerror>)> {
        self.shared
            .outcome
            .get()
            .map(|o| (o.reply.as_ref(), o.rerr.as_ref()))
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.outcome.get().is_some()
    }
}

impl<R: Send + Sync> PullCmd<R> for NetPullCmd<R> {
    fn output(&self) -> &Packet {
        &self.shared.output
    }

    fn result(&self) -> (Option<&R>, Option<&Rerror>) {
        let outcome = self.shared.wait();
        (outcome.reply.as_ref(), outcome.rerr.as_ref())
    }

    fn input_meta(&self) -> &Args {
        &self.shared.wait().meta
    }

    /// Zero until resolved.
    fn cost_time(&self) -> Duration {
        self.shared.outcome.get().map_or(Duration::ZERO, |o| o.cost)
    }
}

impl<R> PullCompleter<R> {
    /// The packet to write.
    pub fn output(&self) -> &Packet {
        &self.shared.output
    }

    pub fn context(&self) -> &Context {
        self.shared.output.context()
    }

    /// Resolve with a reply and the response header metadata.
    ///
    /// `false` if the call was already resolved (e.g. it timed out).
    pub fn complete_reply(self, reply: R, meta: Args) -> bool {
        self.shared.publish(Some(reply), None, meta)
    }

    /// Resolve with an error.
    pub fn complete_error(self, rerr: Rerror) -> bool {
        self.shared.publish(None, Some(rerr), Args::new())
    }

    /// Resolve from an exchange result.
    pub fn complete(self, result: Result<(R, Args), Rerror>) -> bool {
        match result {
            Ok((reply, meta)) => self.complete_reply(reply, meta),
            Err(rerr) => self.complete_error(rerr),
        }
    }
}

impl<R> Drop for PullCompleter<R> {
    fn drop(&mut self) {
        if self.shared.outcome.get().is_some() {
            return;
        }
        let rerr = match self.context().done() {
            Some(done) => done_rerror(done),
            None => RERR_CONN_CLOSED.with_reason("pull abandoned before completion"),
        };
        self.shared.publish(None, Some(rerr), Args::new());
    }
}

/// Run one pull exchange on `dispatcher`.
///
/// `exchange` performs the send/receive cycle for the output packet and
/// returns the reply with its header metadata, or a classified error. It
/// runs on a worker thread; the returned command can be waited on from
/// the calling thread.
///
/// Under saturation this waits for capacity like `submit_retrying`, but
/// only until the packet's context is done. A call that never got a
/// worker resolves with the context's error.
pub fn go_pull<R, D, F>(
    dispatcher: &D,
    output: Packet,
    count_time: bool,
    exchange: F,
) -> NetPullCmd<R>
where
    R: Send + Sync + 'static,
    D: Dispatcher + ?Sized,
    F: FnOnce(&Packet, &Context) -> Result<(R, Args), Rerror> + Send + 'static,
{
    let (cmd, completer) = NetPullCmd::new(output, count_time);
    let ctx = cmd.shared.output.context().clone();
    let admitted = dispatcher.submit_retrying_until(
        Box::new(move || {
            let result = match completer.context().done() {
                Some(done) => Err(done_rerror(done)),
                None => exchange(completer.output(), completer.context()),
            };
            completer.complete(result);
        }),
        &ctx,
    );
    if !admitted {
        kdebug!("pull {} gave up waiting for a worker", cmd.shared.output.uri());
    }
    cmd
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_pool::GoPool;
    use rerror::{
        is_conn_rerror, CODE_CONN_CLOSED, CODE_HANDLE_TIMEOUT, RERR_BAD_PACKET, RERR_DIAL_FAILED,
    };
    use std::thread;

    fn pull(uri: &str) -> Packet {
        Packet::new().with_uri(uri).with_body(b"req".to_vec())
    }

    #[test]
    fn test_reply_from_other_thread() {
        let (cmd, completer) = NetPullCmd::<String>::new(pull("/echo"), false);
        assert!(!cmd.is_resolved());
        assert!(cmd.try_result().is_none());

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut meta = Args::new();
            meta.add("X-Server", "a");
            completer.complete_reply("pong".to_string(), meta)
        });

        let (reply, rerr) = cmd.result();
        assert_eq!(reply.map(String::as_str), Some("pong"));
        assert!(rerr.is_none());
        assert_eq!(cmd.input_meta().get("X-Server"), Some("a"));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_output_is_pull() {
        let (cmd, _completer) =
            NetPullCmd::<()>::new(pull("/a").with_ptype(Ptype::Push), false);
        assert_eq!(cmd.output().ptype(), Ptype::Pull);
        assert_eq!(cmd.output().body(), b"req");
    }

    #[test]
    fn test_error_resolution() {
        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/a"), false);
        assert!(completer.complete_error(RERR_DIAL_FAILED.with_reason("refused")));

        let (reply, rerr) = cmd.result();
        assert!(reply.is_none());
        assert!(is_conn_rerror(rerr));
        assert!(cmd.input_meta().is_empty());
    }

    #[test]
    fn test_deadline_resolves_handle_timeout() {
        let ctx = Context::with_timeout(Duration::from_millis(30));
        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/slow").with_context(ctx), false);

        let start = Instant::now();
        let rerr = cmd.rerror().cloned();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(rerr.map(|e| e.code()), Some(CODE_HANDLE_TIMEOUT));

        // Late completion is ignored.
        assert!(!completer.complete_reply(9, Args::new()));
        assert!(cmd.result().0.is_none());
    }

    #[test]
    fn test_cancel_resolves_conn_closed() {
        let ctx = Context::new();
        let (cmd, _completer) =
            NetPullCmd::<u8>::new(pull("/hang").with_context(ctx.clone()), false);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            ctx.cancel();
        });

        let rerr = cmd.rerror();
        assert_eq!(rerr.map(Rerror::code), Some(CODE_CONN_CLOSED));
        assert!(is_conn_rerror(rerr));
        canceller.join().unwrap();
    }

    #[test]
    fn test_dropped_completer_resolves() {
        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/lost"), false);
        drop(completer);
        assert_eq!(cmd.rerror().map(Rerror::code), Some(CODE_CONN_CLOSED));
    }

    #[test]
    fn test_background_wait_woken_by_completer() {
        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/bg"), false);
        assert!(cmd.context().is_background());

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(completer);
        });
        assert_eq!(cmd.rerror().map(Rerror::code), Some(CODE_CONN_CLOSED));
        handle.join().unwrap();

        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/bg"), false);
        let handle = thread::spawn(move || completer.complete_reply(9, Args::new()));
        assert_eq!(cmd.result().0, Some(&9));
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_single_resolution() {
        let (cmd, completer) = NetPullCmd::<u8>::new(pull("/a"), false);
        let ctx_view = completer.context().clone();
        assert!(completer.complete_reply(1, Args::new()));
        ctx_view.cancel();
        assert_eq!(cmd.result(), (Some(&1), None));
    }

    #[test]
    fn test_cost_time() {
        let (timed, completer) = NetPullCmd::<u8>::new(pull("/t"), true);
        thread::sleep(Duration::from_millis(10));
        completer.complete_reply(1, Args::new());
        timed.result();
        assert!(timed.cost_time() >= Duration::from_millis(10));

        let (untimed, completer) = NetPullCmd::<u8>::new(pull("/u"), false);
        thread::sleep(Duration::from_millis(5));
        completer.complete_reply(1, Args::new());
        untimed.result();
        assert_eq!(untimed.cost_time(), Duration::ZERO);
    }

    #[test]
    fn test_go_pull_runs_on_pool() {
        let pool = GoPool::new(2, Duration::from_secs(5));
        let cmd = go_pull(&pool, pull("/math/double?x=21"), true, |out, _ctx| {
            let x: u32 = out.query().get("x").and_then(|v| v.parse().ok()).unwrap_or(0);
            let mut meta = Args::new();
            meta.add("X-Worker", thread::current().name().unwrap_or("?"));
            Ok((x * 2, meta))
        });

        assert_eq!(cmd.result(), (Some(&42), None));
        assert!(cmd
            .input_meta()
            .get("X-Worker")
            .is_some_and(|n| n.starts_with("relay-worker-")));
    }

    #[test]
    fn test_go_pull_surfaces_exchange_error() {
        let pool = GoPool::new(1, Duration::from_secs(5));
        let cmd = go_pull::<u8, _, _>(&pool, pull("/bad"), false, |_, _| {
            Err(RERR_BAD_PACKET.with_reason("truncated frame"))
        });
        let rerr = cmd.rerror();
        assert_eq!(rerr.map(Rerror::reason), Some("truncated frame"));
        assert!(!is_conn_rerror(rerr));
    }

    #[test]
    fn test_go_pull_on_stopped_pool_times_out() {
        let pool = GoPool::new(1, Duration::from_secs(5));
        pool.stop();
        let ctx = Context::with_timeout(Duration::from_millis(40));
        let cmd = go_pull::<u8, _, _>(&pool, pull("/x").with_context(ctx), false, |_, _| {
            Ok((1, Args::new()))
        });
        assert_eq!(cmd.rerror().map(Rerror::code), Some(CODE_HANDLE_TIMEOUT));
    }
}
