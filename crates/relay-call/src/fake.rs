//! `FakePullCmd` — a pre-resolved pull with no I/O.
//!
//! Lets handler code under test, or code serving a call from a local
//! cache, hand back an object with the same contract as a real network
//! call. The reply and error are whatever the caller chose; cost time is
//! always zero; the input metadata is a fresh, empty collection taken
//! from the pool and returned to it on drop.

use std::time::Duration;

use relay_core::{acquire_args, release_args, Args, Packet, Ptype};
use rerror::Rerror;

use crate::PullCmd;

/// Pre-resolved pull command
pub struct FakePullCmd<R> {
    output: Packet,
    reply: Option<R>,
    rerr: Option<Rerror>,
    input_meta: Args,
}

impl<R> FakePullCmd<R> {
    /// Build a fake pull to `uri` carrying `args` as its body.
    pub fn new(
        uri: impl Into<String>,
        args: impl Into<Vec<u8>>,
        reply: Option<R>,
        rerr: Option<Rerror>,
    ) -> Self {
        Self {
            output: Packet::new()
                .with_ptype(Ptype::Pull)
                .with_uri(uri)
                .with_body(args),
            reply,
            rerr,
            input_meta: acquire_args(),
        }
    }

    /// Build a fake pull around an existing packet, e.g. one carrying a context.
    pub fn from_packet(mut output: Packet, reply: Option<R>, rerr: Option<Rerror>) -> Self {
        output.set_ptype(Ptype::Pull);
        Self {
            output,
            reply,
            rerr,
            input_meta: acquire_args(),
        }
    }
}

impl<R: Send + Sync> PullCmd<R> for FakePullCmd<R> {
    fn output(&self) -> &Packet {
        &self.output
    }

    fn result(&self) -> (Option<&R>, Option<&Rerror>) {
        (self.reply.as_ref(), self.rerr.as_ref())
    }

    fn input_meta(&self) -> &Args {
        &self.input_meta
    }

    fn cost_time(&self) -> Duration {
        Duration::ZERO
    }
}

impl<R> Drop for FakePullCmd<R> {
    fn drop(&mut self) {
        release_args(std::mem::take(&mut self.input_meta));
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for FakePullCmd<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakePullCmd")
            .field("uri", &self.output.uri())
            .field("reply", &self.reply)
            .field("rerr", &self.rerr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Context;
    use rerror::{RERR_NOT_FOUND, CODE_NOT_FOUND};

    #[test]
    fn test_reply_only() {
        let cmd = FakePullCmd::new("/user/get?id=7", b"7".to_vec(), Some("alice".to_string()), None);

        let (reply, rerr) = cmd.result();
        assert_eq!(reply.map(String::as_str), Some("alice"));
        assert!(rerr.is_none());
        assert!(cmd.rerror().is_none());
        assert_eq!(cmd.cost_time(), Duration::ZERO);
        assert!(cmd.input_meta().is_empty());
    }

    #[test]
    fn test_output_packet() {
        let cmd = FakePullCmd::<()>::new("/math/add", b"1,2".to_vec(), None, None);
        let out = cmd.output();
        assert_eq!(out.ptype(), Ptype::Pull);
        assert_eq!(out.uri(), "/math/add");
        assert_eq!(out.body(), b"1,2");
        assert!(cmd.context().done().is_none());
    }

    #[test]
    fn test_error_only() {
        let cmd = FakePullCmd::<u8>::new("/missing", Vec::new(), None, Some(RERR_NOT_FOUND.clone()));
        let (reply, rerr) = cmd.result();
        assert!(reply.is_none());
        assert_eq!(rerr.map(Rerror::code), Some(CODE_NOT_FOUND));
        assert_eq!(cmd.rerror(), Some(&RERR_NOT_FOUND));
    }

    #[test]
    fn test_input_meta_is_independent() {
        let a = FakePullCmd::<u8>::new("/a", Vec::new(), Some(1), None);
        let mut b = FakePullCmd::<u8>::new("/b", Vec::new(), Some(2), None);

        b.input_meta.add("X-Cache", "hit");
        assert!(a.input_meta().is_empty());
        assert_eq!(b.input_meta().get("X-Cache"), Some("hit"));

        drop(b);
        let c = FakePullCmd::<u8>::new("/c", Vec::new(), Some(3), None);
        assert!(c.input_meta().is_empty());
        assert!(a.input_meta().is_empty());
    }

    #[test]
    fn test_from_packet_keeps_context() {
        let ctx = Context::new();
        let cmd = FakePullCmd::<u8>::from_packet(
            Packet::new().with_uri("/x").with_context(ctx.clone()),
            Some(0),
            None,
        );
        ctx.cancel();
        assert!(cmd.context().is_cancelled());
        assert_eq!(cmd.output().ptype(), Ptype::Pull);
        // Pre-resolved: cancellation after the fact changes nothing.
        assert_eq!(cmd.result().0, Some(&0));
    }
}
