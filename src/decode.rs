use std::fmt::{self, Display, Write};

use crate::codec::{latin1, split_reply};

/// How far a command extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// Escape commands have a fixed length and no terminator.
    Fixed(usize),
    /// Up to the next terminator.
    Delimited,
    /// Binary point data follows the prefix and one argument character.
    CutData,
}

#[derive(Debug)]
struct Entry {
    prefix: &'static [u8],
    signature: &'static str,
    name: &'static str,
    framing: Framing,
}

const fn entry(prefix: &'static [u8], signature: &'static str, name: &'static str) -> Entry {
    Entry {
        prefix,
        signature,
        name,
        framing: Framing::Delimited,
    }
}

const fn escape(prefix: &'static [u8], len: usize, signature: &'static str, name: &'static str) -> Entry {
    Entry {
        prefix,
        signature,
        name,
        framing: Framing::Fixed(len),
    }
}

const fn cut_data(prefix: &'static [u8], signature: &'static str, name: &'static str) -> Entry {
    Entry {
        prefix,
        signature,
        name,
        framing: Framing::CutData,
    }
}

/// Known commands, matched by prefix in this order.
#[rustfmt::skip]
const COMMANDS: &[Entry] = &[
    escape(b"\x1b\x00", 3, "d", "Button"),
    escape(b"\x1b\x04", 2, "", "Initialize Device"),
    escape(b"\x1b\x05", 2, "", "Query Status"),
    escape(b"\x1b\x0b", 2, "", "Query Firmware"),
    escape(b"\x1b\x0f", 2, "", "Query Tool Setup"),
    escape(b"\x1b\x11", 2, "", "Query Firmware"),
    escape(b"\x1b\x15", 2, "", "Query Tool Setup"),
    escape(b"\x1b\x1b", 2, "", "Escape"),
    entry(b"!", "n", "Speed"),
    cut_data(b"BD", "", "BDn, unknown, data follows"),
    cut_data(b"BE", "n", "BEn, Tool down? data follows"),
    entry(b"B", "l", "Line Scale"),
    entry(b"FA", "", "Calibration Query"),
    entry(b"FC", "p,q[,n]", "Cutter Offset"),
    entry(b"FE", "l[,n]", "Lift Control"),
    entry(b"FF", "s,e,n", "Sharpen Corners"),
    entry(b"FG", "", "Query Firmware"),
    entry(b"FN", "n", "Set Orientation"),
    entry(b"FW", "n", "Set Media"),
    entry(b"FX", "n", "Set Downward Force"),
    entry(b"FY", "n", "Track Enhancing"),
    entry(b"H", "", "Home"),
    entry(b"J", "n", "Select Tool"),
    entry(b"L", "p", "Line Type"),
    entry(b"M", "y,x", "Move Abs"),
    entry(b"D", "y,x", "Draw Abs"),
    entry(b"O", "", "Move Rel"),
    entry(b"SO", "n", "Set Origin"),
    entry(b"TB123,", "h,w,y,x", "Reg Mark Auto"),
    entry(b"TB23,", "h,w", "Reg Mark Manual"),
    entry(b"TB50,", "n", "Set Orientation"),
    entry(b"TB51,", "l", "Set Regmark Length"),
    entry(b"TB52,", "n", "Set Regmark Type"),
    entry(b"TB53,", "n", "Set Regmark Width"),
    entry(b"TB55,", "n", "?Do Registration?"),
    entry(b"TB71", "", "Calibration Query"),
    entry(b"TB99", "", "Use Regmarks"),
    entry(b"TF", "d,n", "Set Tool Depth"),
    entry(b"TG", "n", "Set Cutting Mat"),
    entry(b"TI", "", "Query Title"),
    entry(b"TJ", "a", "Set Acceleration"),
    entry(b"Z", "y,x", "Write Lower Right"),
    entry(b"[", "", "Read Upper Left"),
    entry(b"\\", "y,x", "Write Upper Left"),
];

/// One command of a recorded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Known {
        /// The command as sent, without terminator.
        raw: Vec<u8>,
        name: &'static str,
        signature: &'static str,
        args: String,
        /// Hex dump of binary point data.
        data: Option<String>,
    },
    /// Nothing in the table matches. Not an error, the text is reported as is.
    Unknown(Vec<u8>),
}

impl Decoded {
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Known { name, .. } => Some(*name),
            Self::Unknown(_) => None,
        }
    }
}

/// Quoted-printable rendering: printable ASCII as is, everything else as `=XX`.
fn quoted(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());

    for &b in bytes {
        if (b' '..=b'~').contains(&b) && b != b'=' {
            out.push(b as char);
        } else {
            let _ = write!(out, "={b:02X}");
        }
    }

    out
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known {
                raw,
                name,
                signature,
                args,
                data,
            } => {
                let raw = match data {
                    Some(_) => format!("{} <data>", latin1(raw)),
                    None => quoted(raw),
                };

                write!(f, "{raw:20} {name} {signature} {args}")?;

                if let Some(data) = data {
                    write!(f, "\n      {data}")?;
                }

                Ok(())
            }
            Self::Unknown(raw) => write!(f, "Unknown command: {}", latin1(raw)),
        }
    }
}

impl Entry {
    /// Splits the command off the stream.
    fn split<'a>(&self, stream: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        match self.framing {
            Framing::Fixed(len) => stream.split_at(len.min(stream.len())),
            Framing::Delimited | Framing::CutData => split_reply(stream),
        }
    }

    fn describe(&self, msg: &[u8]) -> Decoded {
        let tail = &msg[self.prefix.len()..];

        let (raw, args, data) = match self.framing {
            Framing::Fixed(_) if !tail.is_empty() => (msg, format!("{:x}", tail[0]), None),
            Framing::Fixed(_) | Framing::Delimited => (msg, latin1(tail), None),
            Framing::CutData => {
                let split = tail.len().min(1);
                let (arg, points) = tail.split_at(split);
                let raw = &msg[..self.prefix.len() + split];

                (raw, latin1(arg), Some(hex(points)))
            }
        };

        Decoded::Known {
            raw: raw.to_vec(),
            name: self.name,
            signature: self.signature,
            args,
            data,
        }
    }
}

/// Decodes one command off the stream, returns it and the remainder.
fn decode_one(stream: &[u8]) -> (Decoded, &[u8]) {
    match COMMANDS.iter().find(|e| stream.starts_with(e.prefix)) {
        Some(entry) => {
            let (msg, rest) = entry.split(stream);
            (entry.describe(msg), rest)
        }
        None => {
            let (msg, rest) = split_reply(stream);
            (Decoded::Unknown(msg.to_vec()), rest)
        }
    }
}

/// Decodes a stream of commands sent to the cutter, e.g. a transcript.
pub fn describe_commands(mut stream: &[u8]) -> Vec<Decoded> {
    let mut out = Vec::new();

    while !stream.is_empty() {
        let (decoded, rest) = decode_one(stream);
        out.push(decoded);
        stream = rest;
    }

    out
}

/// A reply of the cutter, quoted, without its terminator.
pub fn describe_response(data: &[u8]) -> String {
    let (reply, _) = split_reply(data);

    format!("\"{}\"", latin1(reply))
}

/// One line per command.
pub fn describe_transcript(stream: &[u8]) -> String {
    describe_commands(stream)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimited_commands() {
        let decoded = describe_commands(b"FN0\x03TB50,0\x03M200,90\x03");

        let names: Vec<_> = decoded.iter().map(Decoded::name).collect();
        assert_eq!(
            names,
            [Some("Set Orientation"), Some("Set Orientation"), Some("Move Abs")]
        );
        assert_eq!(
            decoded[2].to_string(),
            format!("{:20} Move Abs y,x 200,90", "M200,90")
        );
    }

    #[test]
    fn escapes_have_no_terminator() {
        let decoded = describe_commands(b"\x1b\x05\x1b\x00\x02H\x03");

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].name(), Some("Query Status"));
        assert_eq!(
            decoded[1].to_string(),
            format!("{:20} Button d 2", "=1B=00=02")
        );
        assert_eq!(decoded[2].name(), Some("Home"));
    }

    #[test]
    fn longest_prefix_comes_first() {
        let decoded = describe_commands(b"TB123,4600,3600,200,100\x03TB23,4600,3600\x03B5\x03");

        assert_eq!(decoded[0].name(), Some("Reg Mark Auto"));
        assert_eq!(decoded[1].name(), Some("Reg Mark Manual"));
        assert_eq!(decoded[2].name(), Some("Line Scale"));
    }

    #[test]
    fn cut_data_is_dumped() {
        let decoded = describe_commands(b"BE1\x10\x20\x7f\x03");

        assert_eq!(
            decoded[0].to_string(),
            format!("{:20} BEn, Tool down? data follows n 1\n      10 20 7f", "BE1 <data>")
        );
    }

    #[test]
    fn unknown_commands_are_reported_verbatim() {
        let decoded = describe_commands(b"U\x03QQ9");

        assert_eq!(decoded[0], Decoded::Unknown(b"U".to_vec()));
        assert_eq!(decoded[1].to_string(), "Unknown command: QQ9");
    }

    #[test]
    fn responses_are_quoted() {
        assert_eq!(describe_response(b"    0\x03"), "\"    0\"");
        assert_eq!(describe_response(b"CAMEO 4 V1.10"), "\"CAMEO 4 V1.10\"");
    }

    #[test]
    fn transcript_lines() {
        let text = describe_transcript(b"H\x03SO0\x03");

        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with("Set Origin n 0"));
    }
}
