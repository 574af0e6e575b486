//! Message type tags.
//!
//! Every frame starts with a single-character tag. The host may only send
//! tags in [`SEND_TAGS`]; it accepts replies tagged with anything in
//! [`RECEIVE_TAGS`]. The device echoes the request tag, so the two sets
//! overlap.

/// Servo move request / settle-time reply.
pub const MOVE: char = 'M';

/// Distance sensor request / raw readings reply.
pub const SENSOR: char = 'S';

/// Link test (handshake) request / echo reply.
pub const TEST: char = 'T';

/// Generic reply tag used by older firmware.
pub const REPLY: char = 'R';

/// Tags the host is allowed to send.
pub const SEND_TAGS: &[char] = &[MOVE, SENSOR, TEST];

/// Tags the host recognizes in replies.
pub const RECEIVE_TAGS: &[char] = &[MOVE, SENSOR, TEST, REPLY];

/// Returns a human-readable name for a tag.
pub fn tag_name(tag: char) -> &'static str {
    match tag {
        MOVE => "MOVE",
        SENSOR => "SENSOR",
        TEST => "TEST",
        REPLY => "REPLY",
        _ => "UNKNOWN",
    }
}

/// Returns true if the host may send this tag.
pub fn is_send_tag(tag: char) -> bool {
    SEND_TAGS.contains(&tag)
}

/// Returns true if the host recognizes this tag in a reply.
pub fn is_receive_tag(tag: char) -> bool {
    RECEIVE_TAGS.contains(&tag)
}
