//! # relay-call — call result futures
//!
//! A `PullCmd` is the caller's handle on one outstanding pull request. It
//! exposes the packet that was sent, the context governing the call, the
//! eventual reply or error, the response metadata and the round-trip
//! time.
//!
//! Two implementations share the contract:
//!
//! | Type          | Resolved by                     | `result()`            |
//! |---------------|---------------------------------|-----------------------|
//! | `NetPullCmd`  | transport via `PullCompleter`   | blocks until resolved |
//! | `FakePullCmd` | construction (canned outcome)   | returns immediately   |
//!
//! A pull resolves exactly once, with a reply or with an error, never
//! both. When its context is cancelled the pending pull resolves with
//! connection-closed; when the deadline passes, with handle-timeout.

pub mod fake;
pub mod net;

pub use fake::FakePullCmd;
pub use net::{go_pull, NetPullCmd, PullCompleter};

use relay_core::{Args, Context, Done, Packet};
use rerror::{Rerror, RERR_CONN_CLOSED, RERR_HANDLE_TIMEOUT};
use std::time::Duration;

/// Handle on one pull call's eventual outcome.
pub trait PullCmd<R>: Send + Sync {
    /// The packet that was (or would be) written.
    fn output(&self) -> &Packet;

    /// The context governing the call.
    fn context(&self) -> &Context {
        self.output().context()
    }

    /// The reply and the error. Exactly one is `Some` once resolved.
    ///
    /// Blocks the calling thread until resolution for network-backed calls.
    fn result(&self) -> (Option<&R>, Option<&Rerror>);

    /// The error half of `result()`.
    fn rerror<'a>(&'a self) -> Option<&'a Rerror>
    where
        R: 'a,
    {
        self.result().1
    }

    /// Header metadata of the response packet.
    fn input_meta(&self) -> &Args;

    /// Round-trip time. Zero when timing is disabled or no I/O happened.
    fn cost_time(&self) -> Duration;
}

/// The error a pending call resolves with when its context is done.
pub fn done_rerror(done: Done) -> Rerror {
    match done {
        Done::Cancelled => RERR_CONN_CLOSED.with_reason("context cancelled"),
        Done::DeadlineExceeded => RERR_HANDLE_TIMEOUT.with_reason("context deadline exceeded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rerror::{is_conn_rerror, CODE_CONN_CLOSED, CODE_HANDLE_TIMEOUT};

    #[test]
    fn test_done_rerror_classification() {
        let cancelled = done_rerror(Done::Cancelled);
        assert_eq!(cancelled.code(), CODE_CONN_CLOSED);
        assert!(is_conn_rerror(Some(&cancelled)));

        let expired = done_rerror(Done::DeadlineExceeded);
        assert_eq!(expired.code(), CODE_HANDLE_TIMEOUT);
        assert!(!is_conn_rerror(Some(&expired)));
    }

    #[test]
    fn test_variants_behind_one_trait() {
        let (net, completer) = NetPullCmd::<u32>::new(Packet::new().with_uri("/a"), false);
        assert!(completer.complete_reply(1, Args::new()));
        let fake = FakePullCmd::new("/b", Vec::<u8>::new(), Some(2u32), None);

        let cmds: Vec<Box<dyn PullCmd<u32>>> = vec![Box::new(net), Box::new(fake)];
        let replies: Vec<u32> = cmds.iter().filter_map(|c| c.result().0.copied()).collect();
        assert_eq!(replies, vec![1, 2]);
        assert!(cmds.iter().all(|c| c.rerror().is_none()));
    }

    #[test]
    fn test_rerror_through_trait_object() {
        fn first_error(cmd: &dyn PullCmd<String>) -> Option<i32> {
            cmd.rerror().map(Rerror::code)
        }

        let (net, completer) = NetPullCmd::<String>::new(Packet::new().with_uri("/gone"), false);
        assert!(completer.complete_error(RERR_CONN_CLOSED.clone()));
        assert_eq!(first_error(&net), Some(CODE_CONN_CLOSED));

        let fake = FakePullCmd::<String>::new("/ok", Vec::<u8>::new(), Some("up".into()), None);
        assert_eq!(first_error(&fake), None);
    }
}
