//! In-memory request/response value
//!
//! `Packet` is the unit handed between callers and the transport: a type
//! tag, sequence number, target URI (with optional query string),
//! metadata, an opaque body and the context governing it. Framing and
//! body codecs belong to the transport and are not modelled here.
//!
//! Packets are recycled through a bounded free list:
//!
//! ```ignore
//! let packet = acquire_packet()
//!     .with_ptype(Ptype::Pull)
//!     .with_uri("/math/add?precise=1")
//!     .with_body(b"1,2".to_vec());
//! // ... send ...
//! release_packet(packet);
//! ```

use crossbeam_queue::ArrayQueue;
use std::sync::OnceLock;

use crate::args::Args;
use crate::constants::POOL_CAPACITY;
use crate::context::Context;
use crate::ptype::Ptype;

/// Request/response value
#[derive(Debug, Clone, Default)]
pub struct Packet {
    ptype: Ptype,
    seq: u64,
    uri: String,
    meta: Args,
    body: Vec<u8>,
    context: Context,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    // Builder methods

    pub fn with_ptype(mut self, ptype: Ptype) -> Self {
        self.ptype = ptype;
        self
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Append a `key=value` query parameter to the URI.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        let sep = if self.uri.contains('?') { '&' } else { '?' };
        self.uri.push(sep);
        self.uri.push_str(key);
        self.uri.push('=');
        self.uri.push_str(value);
        self
    }

    /// Add a metadata value. Existing values for `key` are kept.
    pub fn with_add_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.add(key, value);
        self
    }

    /// Set a metadata value, replacing existing ones.
    pub fn with_set_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.meta.set(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    // Accessors

    #[inline]
    pub fn ptype(&self) -> Ptype {
        self.ptype
    }

    #[inline]
    pub fn set_ptype(&mut self, ptype: Ptype) {
        self.ptype = ptype;
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Full target identifier, including any query string.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Target path without the query string.
    pub fn path(&self) -> &str {
        match self.uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.uri,
        }
    }

    /// Query parameters parsed from the URI, in order.
    ///
    /// Values are taken verbatim; percent-decoding is the transport's job.
    pub fn query(&self) -> Args {
        let mut args = Args::new();
        let Some((_, raw)) = self.uri.split_once('?') else {
            return args;
        };
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((k, v)) => args.add(k, v),
                None => args.add(pair, ""),
            }
        }
        args
    }

    #[inline]
    pub fn meta(&self) -> &Args {
        &self.meta
    }

    #[inline]
    pub fn meta_mut(&mut self) -> &mut Args {
        &mut self.meta
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[inline]
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Clear every field, keeping allocations where possible.
    pub fn reset(&mut self) {
        self.ptype = Ptype::Undefined;
        self.seq = 0;
        self.uri.clear();
        self.meta.reset();
        self.body.clear();
        self.context = Context::background();
    }
}

// ============================================================================
// Pool
// ============================================================================

fn packet_pool() -> &'static ArrayQueue<Packet> {
    static POOL: OnceLock<ArrayQueue<Packet>> = OnceLock::new();
    POOL.get_or_init(|| ArrayQueue::new(POOL_CAPACITY))
}

/// Take a blank packet from the free list, or allocate one.
pub fn acquire_packet() -> Packet {
    packet_pool().pop().unwrap_or_default()
}

/// Reset `packet` and return it to the free list. Dropped if the list is full.
pub fn release_packet(mut packet: Packet) {
    packet.reset();
    let _ = packet_pool().push(packet);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let p = Packet::new()
            .with_ptype(Ptype::Pull)
            .with_seq(7)
            .with_uri("/math/add")
            .with_add_meta("X-Trace", "a")
            .with_add_meta("X-Trace", "b")
            .with_body(b"1,2".to_vec());

        assert_eq!(p.ptype(), Ptype::Pull);
        assert_eq!(p.seq(), 7);
        assert_eq!(p.uri(), "/math/add");
        assert_eq!(p.meta().get_all("X-Trace"), vec!["a", "b"]);
        assert_eq!(p.body(), b"1,2");
    }

    #[test]
    fn test_set_meta_replaces() {
        let p = Packet::new()
            .with_add_meta("k", "1")
            .with_add_meta("k", "2")
            .with_set_meta("k", "3");
        assert_eq!(p.meta().get_all("k"), vec!["3"]);
    }

    #[test]
    fn test_query() {
        let p = Packet::new()
            .with_uri("/search")
            .with_query("q", "rust")
            .with_query("page", "2");
        assert_eq!(p.uri(), "/search?q=rust&page=2");
        assert_eq!(p.path(), "/search");

        let q = p.query();
        assert_eq!(q.get("q"), Some("rust"));
        assert_eq!(q.get("page"), Some("2"));
    }

    #[test]
    fn test_query_flags_and_empty() {
        let p = Packet::new().with_uri("/x?debug&&a=1");
        let q = p.query();
        assert_eq!(q.get("debug"), Some(""));
        assert_eq!(q.get("a"), Some("1"));
        assert_eq!(q.len(), 2);

        assert!(Packet::new().with_uri("/plain").query().is_empty());
    }

    #[test]
    fn test_reset() {
        let ctx = Context::new();
        let mut p = Packet::new()
            .with_ptype(Ptype::Push)
            .with_uri("/a?b=c")
            .with_add_meta("k", "v")
            .with_body(vec![1, 2, 3])
            .with_context(ctx.clone());
        p.reset();

        assert_eq!(p.ptype(), Ptype::Undefined);
        assert_eq!(p.uri(), "");
        assert!(p.meta().is_empty());
        assert!(p.body().is_empty());
        ctx.cancel();
        assert!(!p.context().is_cancelled());
    }

    #[test]
    fn test_pool_roundtrip_is_blank() {
        let p = acquire_packet().with_ptype(Ptype::Pull).with_uri("/dirty");
        release_packet(p);

        let fresh = acquire_packet();
        assert_eq!(fresh.ptype(), Ptype::Undefined);
        assert_eq!(fresh.uri(), "");
    }
}
