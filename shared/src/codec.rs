//! Line-oriented text codec for snapshots and reply-channel requests
//!
//! Every snapshot record is one line of comma-separated fields:
//!
//! ```text
//! Object,<name>,<x>,<y>
//! Player,<name>,<true|false>,<x>,<y>
//! Event,<kind>,<params...>
//! ```
//!
//! A snapshot payload is the newline-joined concatenation of such lines and
//! travels as a single datagram. Reply-channel requests use the same field
//! rules without a record tag: `<name>,<true|false>,<x>,<y>`.

use crate::error::ParseError;
use crate::MAX_NAME_LEN;
use std::fmt;

/// Tag of an object record.
pub const OBJECT_TAG: &str = "Object";
/// Tag of a player record.
pub const PLAYER_TAG: &str = "Player";
/// Tag of an event record.
pub const EVENT_TAG: &str = "Event";

const CLIENT_DISCONNECT: &str = "ClientDisconnect";

/// Lifecycle notification carried inside a snapshot.
///
/// Each kind carries exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A client left, either explicitly or by going silent.
    ClientDisconnect { name: String },
}

impl Event {
    /// Discriminator written in the second field of an event line.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::ClientDisconnect { .. } => CLIENT_DISCONNECT,
        }
    }
}

/// One decoded snapshot line.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Object { name: String, x: f64, y: f64 },
    Player { name: String, active: bool, x: f64, y: f64 },
    Event(Event),
}

/// State a client reports over the reply channel every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub name: String,
    pub active: bool,
    pub x: f64,
    pub y: f64,
}

/// Acknowledgment returned by the authority for each request.
///
/// Clients treat any acknowledgment as "request completed"; only
/// [`Ack::Rejected`] is surfaced as an error on the client side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Accepted,
    Disconnected,
    Rejected(String),
    Other(String),
}

const ACK_ACCEPTED: &str = "Reply Success!";
const ACK_DISCONNECTED: &str = "Client Disconnected";
const ACK_REJECTED_PREFIX: &str = "Error: ";

impl Ack {
    pub fn parse(text: &str) -> Self {
        match text {
            ACK_ACCEPTED => Ack::Accepted,
            ACK_DISCONNECTED => Ack::Disconnected,
            _ => match text.strip_prefix(ACK_REJECTED_PREFIX) {
                Some(reason) => Ack::Rejected(reason.to_string()),
                None => Ack::Other(text.to_string()),
            },
        }
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Accepted => f.write_str(ACK_ACCEPTED),
            Ack::Disconnected => f.write_str(ACK_DISCONNECTED),
            Ack::Rejected(reason) => write!(f, "{}{}", ACK_REJECTED_PREFIX, reason),
            Ack::Other(text) => f.write_str(text),
        }
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn encode_object(name: &str, x: f64, y: f64) -> String {
    format!("{},{},{:.6},{:.6}\n", OBJECT_TAG, name, x, y)
}

pub fn encode_player(name: &str, active: bool, x: f64, y: f64) -> String {
    format!(
        "{},{},{},{:.6},{:.6}\n",
        PLAYER_TAG,
        name,
        bool_field(active),
        x,
        y
    )
}

pub fn encode_event(event: &Event) -> String {
    match event {
        Event::ClientDisconnect { name } => {
            format!("{},{},{}\n", EVENT_TAG, event.kind_name(), name)
        }
    }
}

pub fn encode_request(state: &PlayerState) -> String {
    format!(
        "{},{},{:.6},{:.6}",
        state.name,
        bool_field(state.active),
        state.x,
        state.y
    )
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, ParseError> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ParseError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_name(value: &str) -> Result<String, ParseError> {
    if value.is_empty() {
        return Err(ParseError::EmptyName);
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ParseError::NameTooLong { len: value.len() });
    }
    Ok(value.to_string())
}

fn expect_arity(kind: &'static str, fields: &[&str], expected: usize) -> Result<(), ParseError> {
    if fields.len() != expected {
        return Err(ParseError::Arity {
            kind,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn decode_event(fields: &[&str]) -> Result<Event, ParseError> {
    let Some(kind) = fields.get(1) else {
        return Err(ParseError::Arity {
            kind: EVENT_TAG,
            expected: 3,
            found: fields.len(),
        });
    };

    match *kind {
        CLIENT_DISCONNECT => {
            expect_arity(EVENT_TAG, fields, 3)?;
            Ok(Event::ClientDisconnect {
                name: parse_name(fields[2])?,
            })
        }
        other => Err(ParseError::UnknownEventKind(other.to_string())),
    }
}

/// Decodes a single snapshot line (with or without its trailing newline).
pub fn decode_line(line: &str) -> Result<Record, ParseError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = line.split(',').collect();
    match fields[0] {
        OBJECT_TAG => {
            expect_arity(OBJECT_TAG, &fields, 4)?;
            Ok(Record::Object {
                name: parse_name(fields[1])?,
                x: parse_number("x", fields[2])?,
                y: parse_number("y", fields[3])?,
            })
        }
        PLAYER_TAG => {
            expect_arity(PLAYER_TAG, &fields, 5)?;
            Ok(Record::Player {
                name: parse_name(fields[1])?,
                active: parse_bool("active", fields[2])?,
                x: parse_number("x", fields[3])?,
                y: parse_number("y", fields[4])?,
            })
        }
        EVENT_TAG => decode_event(&fields).map(Record::Event),
        other => Err(ParseError::UnknownRecord(other.to_string())),
    }
}

/// Splits a snapshot payload into lines and decodes each one independently.
///
/// Blank lines (including the one after the final newline) are skipped.
/// A failure on one line never affects the others.
pub fn decode_payload(payload: &str) -> Vec<Result<Record, ParseError>> {
    payload
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(decode_line)
        .collect()
}

pub fn decode_request(message: &str) -> Result<PlayerState, ParseError> {
    let message = message.trim_end_matches(['\r', '\n']);
    if message.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let fields: Vec<&str> = message.split(',').collect();
    expect_arity("Request", &fields, 4)?;

    Ok(PlayerState {
        name: parse_name(fields[0])?,
        active: parse_bool("active", fields[1])?,
        x: parse_number("x", fields[2])?,
        y: parse_number("y", fields[3])?,
    })
}

/// Accumulates one snapshot payload.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    payload: String,
    records: usize,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&mut self, name: &str, x: f64, y: f64) -> &mut Self {
        self.payload.push_str(&encode_object(name, x, y));
        self.records += 1;
        self
    }

    pub fn player(&mut self, name: &str, active: bool, x: f64, y: f64) -> &mut Self {
        self.payload.push_str(&encode_player(name, active, x, y));
        self.records += 1;
        self
    }

    pub fn event(&mut self, event: &Event) -> &mut Self {
        self.payload.push_str(&encode_event(event));
        self.records += 1;
        self
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn finish(self) -> String {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_object_roundtrip() {
        let cases = [
            ("platform", 0.0, 0.0),
            ("floor", -120.5, 550.25),
            ("mover", 1234.567891, -0.000004),
        ];

        for (name, x, y) in cases {
            match decode_line(&encode_object(name, x, y)).unwrap() {
                Record::Object {
                    name: decoded,
                    x: dx,
                    y: dy,
                } => {
                    assert_eq!(decoded, name);
                    assert_approx_eq!(dx, x, 1e-5);
                    assert_approx_eq!(dy, y, 1e-5);
                }
                other => panic!("Unexpected record: {:?}", other),
            }
        }
    }

    #[test]
    fn test_player_line_format() {
        assert_eq!(
            encode_player("Two", true, 10.0, 20.0),
            "Player,Two,true,10.000000,20.000000\n"
        );
        assert_eq!(
            encode_player("Three", false, -1.5, 0.0),
            "Player,Three,false,-1.500000,0.000000\n"
        );
    }

    #[test]
    fn test_event_line_format() {
        let event = Event::ClientDisconnect {
            name: "Two".to_string(),
        };
        assert_eq!(encode_event(&event), "Event,ClientDisconnect,Two\n");
        assert_eq!(
            decode_line("Event,ClientDisconnect,Two\n").unwrap(),
            Record::Event(event)
        );
    }

    #[test]
    fn test_decode_player() {
        let record = decode_line("Player,One,false,3.5,-4.25").unwrap();
        assert_eq!(
            record,
            Record::Player {
                name: "One".to_string(),
                active: false,
                x: 3.5,
                y: -4.25,
            }
        );
    }

    #[test]
    fn test_decode_tolerates_carriage_return() {
        assert!(matches!(
            decode_line("Object,floor,1.0,2.0\r"),
            Ok(Record::Object { .. })
        ));
    }

    #[test]
    fn test_decode_arity_mismatch() {
        assert_eq!(
            decode_line("Object,floor,1.0"),
            Err(ParseError::Arity {
                kind: "Object",
                expected: 4,
                found: 3,
            })
        );
        assert_eq!(
            decode_line("Player,One,true,1.0,2.0,3.0"),
            Err(ParseError::Arity {
                kind: "Player",
                expected: 5,
                found: 6,
            })
        );
        assert!(matches!(decode_line("Event"), Err(ParseError::Arity { .. })));
    }

    #[test]
    fn test_decode_bad_fields() {
        assert!(matches!(
            decode_line("Object,floor,abc,2.0"),
            Err(ParseError::InvalidNumber { field: "x", .. })
        ));
        assert!(matches!(
            decode_line("Object,floor,1.0,NaN"),
            Err(ParseError::InvalidNumber { field: "y", .. })
        ));
        assert!(matches!(
            decode_line("Player,One,yes,1.0,2.0"),
            Err(ParseError::InvalidBool { .. })
        ));
        assert_eq!(decode_line("Object,,1.0,2.0"), Err(ParseError::EmptyName));
    }

    #[test]
    fn test_decode_rejects_overlong_names() {
        let name = "x".repeat(MAX_NAME_LEN + 1);

        assert_eq!(
            decode_request(&format!("{},true,1.0,1.0", name)),
            Err(ParseError::NameTooLong {
                len: MAX_NAME_LEN + 1
            })
        );
        assert!(matches!(
            decode_line(&format!("Player,{},true,1.0,1.0", name)),
            Err(ParseError::NameTooLong { .. })
        ));

        let longest = "x".repeat(MAX_NAME_LEN);
        assert!(decode_request(&format!("{},true,1.0,1.0", longest)).is_ok());
    }

    #[test]
    fn test_decode_unknown_tags() {
        assert_eq!(
            decode_line("Enemy,bat,1.0,2.0"),
            Err(ParseError::UnknownRecord("Enemy".to_string()))
        );
        // Degenerate line emitted for unhandled events by older authorities
        assert_eq!(
            decode_line("Event,none,"),
            Err(ParseError::UnknownEventKind("none".to_string()))
        );
        assert_eq!(decode_line("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_decode_payload_skips_blank_lines() {
        let payload = "Object,floor,0.000000,550.000000\n\nPlayer,One,true,1.0,2.0\nbogus\n";
        let records = decode_payload(payload);

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[1].is_ok());
        assert!(records[2].is_err());
    }

    #[test]
    fn test_request_roundtrip() {
        let state = PlayerState {
            name: "One".to_string(),
            active: true,
            x: 600.0,
            y: 400.5,
        };

        let encoded = encode_request(&state);
        assert_eq!(encoded, "One,true,600.000000,400.500000");
        assert_eq!(decode_request(&encoded).unwrap(), state);
    }

    #[test]
    fn test_decode_request_errors() {
        assert_eq!(decode_request(""), Err(ParseError::Empty));
        assert!(matches!(
            decode_request("Two,true,10.0"),
            Err(ParseError::Arity { expected: 4, found: 3, .. })
        ));
        assert!(matches!(
            decode_request("Two,true,ten,20.0"),
            Err(ParseError::InvalidNumber { field: "x", .. })
        ));
        assert_eq!(
            decode_request("Two,false,10.0,20.0").unwrap(),
            PlayerState {
                name: "Two".to_string(),
                active: false,
                x: 10.0,
                y: 20.0,
            }
        );
    }

    #[test]
    fn test_ack_text() {
        for ack in [
            Ack::Accepted,
            Ack::Disconnected,
            Ack::Rejected("bad field".to_string()),
        ] {
            assert_eq!(Ack::parse(&ack.to_string()), ack);
        }
        assert_eq!(Ack::parse("ok"), Ack::Other("ok".to_string()));
    }

    #[test]
    fn test_snapshot_writer_groups_records() {
        let mut writer = SnapshotWriter::new();
        writer
            .object("floor", 0.0, 550.0)
            .player("Two", true, 10.0, 20.0)
            .event(&Event::ClientDisconnect {
                name: "Three".to_string(),
            });

        assert_eq!(writer.record_count(), 3);
        assert_eq!(
            writer.finish(),
            "Object,floor,0.000000,550.000000\n\
             Player,Two,true,10.000000,20.000000\n\
             Event,ClientDisconnect,Three\n"
        );
    }
}
