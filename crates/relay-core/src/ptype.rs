//! Packet type tag
//!
//! Every unit of work carries exactly one tag. Only `Pull` expects a reply.

use core::fmt;

/// Packet type
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ptype {
    #[default]
    Undefined = 0,
    /// Request expecting a reply
    Pull = 1,
    /// Reply to a pull
    Reply = 2,
    /// Fire-and-forget notification
    Push = 3,
}

impl Ptype {
    /// Decode a wire byte. Unknown values map to `Undefined`.
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Ptype::Pull,
            2 => Ptype::Reply,
            3 => Ptype::Push,
            _ => Ptype::Undefined,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a reply is expected for this packet.
    #[inline]
    pub fn expects_reply(self) -> bool {
        self == Ptype::Pull
    }

    pub fn text(self) -> &'static str {
        match self {
            Ptype::Pull => "PULL",
            Ptype::Reply => "REPLY",
            Ptype::Push => "PUSH",
            Ptype::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Ptype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(Ptype::from_u8(0), Ptype::Undefined);
        assert_eq!(Ptype::from_u8(1), Ptype::Pull);
        assert_eq!(Ptype::from_u8(2), Ptype::Reply);
        assert_eq!(Ptype::from_u8(3), Ptype::Push);
        assert_eq!(Ptype::from_u8(200), Ptype::Undefined);
    }

    #[test]
    fn test_only_pull_expects_reply() {
        assert!(Ptype::Pull.expects_reply());
        assert!(!Ptype::Reply.expects_reply());
        assert!(!Ptype::Push.expects_reply());
        assert!(!Ptype::Undefined.expects_reply());
    }

    #[test]
    fn test_text() {
        assert_eq!(Ptype::Pull.to_string(), "PULL");
        assert_eq!(Ptype::Reply.to_string(), "REPLY");
        assert_eq!(Ptype::Push.to_string(), "PUSH");
        assert_eq!(Ptype::from_u8(9).to_string(), "Undefined");
    }
}
