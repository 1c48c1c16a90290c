use std::fmt;

use crate::{
    consts::{self, resp, CMD_ESC, CMD_ETX},
    units::mm_to_units,
};

/// A single command as it is sent to the cutter, without the terminator.
pub type Command = String;

/// Converts a command or a list of commands into a properly delimited byte sequence.
///
/// Every command is followed by exactly one ETX byte. An empty list yields an empty stream.
pub fn delimit_commands<I, C>(commands: I) -> Vec<u8>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut buf = Vec::new();

    for cmd in commands {
        buf.extend_from_slice(cmd.as_ref());
        buf.push(CMD_ETX);
    }

    buf
}

/// Builds a single byte escape command (ESC + code). Escape commands are not delimited.
pub fn escape(code: u8) -> [u8; 2] {
    [CMD_ESC, code]
}

/// Splits a buffer at the first terminator.
///
/// Returns the logical reply before it and the unconsumed remainder after it.
/// Without a terminator the whole buffer is the reply and the remainder is empty.
pub fn split_reply(buf: &[u8]) -> (&[u8], &[u8]) {
    match buf.iter().position(|&b| b == CMD_ETX) {
        Some(idx) => (&buf[..idx], &buf[idx + 1..]),
        None => (buf, &[]),
    }
}

/// Splits a delimited stream into its commands, in order.
/// A trailing fragment without terminator is returned as the last entry.
pub fn split_commands(mut stream: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();

    while !stream.is_empty() {
        let (cmd, rest) = split_reply(stream);
        out.push(cmd);
        stream = rest;
    }

    out
}

/// Decodes bytes as ISO-8859-1, which maps every byte to the code point of the same value.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Strips leading and trailing ASCII whitespace.
pub fn trim_ascii(bytes: &[u8]) -> &[u8] {
    bytes.trim_ascii()
}

/// The decoded reply to the status enquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    Moving,
    Unloaded,
    Fail,
    /// Any reply which is not one of the known codes, verbatim.
    Raw(Vec<u8>),
}

impl Status {
    /// Maps the status reply (without terminator and whitespace) to a status.
    pub fn decode(reply: &[u8]) -> Self {
        match reply {
            resp::READY => Self::Ready,
            resp::MOVING => Self::Moving,
            resp::UNLOADED => Self::Unloaded,
            resp::FAIL => Self::Fail,
            other => Self::Raw(other.to_vec()),
        }
    }

    /// The placeholder status used when the status could not be read at all.
    pub fn no_device() -> Self {
        Self::Raw(resp::NO_DEVICE.to_vec())
    }

    pub fn is_no_device(&self) -> bool {
        matches!(self, Self::Raw(raw) if raw == resp::NO_DEVICE)
    }

    pub fn is_ready(&self) -> bool {
        *self == Self::Ready
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Moving => write!(f, "moving"),
            Self::Unloaded => write!(f, "unloaded"),
            Self::Fail => write!(f, "fail"),
            Self::Raw(raw) => write!(f, "{:?}", latin1(raw)),
        }
    }
}

/// Decodes a complete status reply as read from the device.
///
/// Whitespace is stripped first, then the last byte must be the terminator.
pub fn decode_status(raw: &[u8]) -> Result<Status, Option<u8>> {
    let trimmed = trim_ascii(raw);

    match trimmed.split_last() {
        Some((&CMD_ETX, reply)) => Ok(Status::decode(reply)),
        Some((&last, _)) => Err(Some(last)),
        None => Err(None),
    }
}

/// Move absolute, `My,x`.
pub fn move_mm(mm_y: f64, mm_x: f64) -> Command {
    format!("M{},{}", mm_to_units(mm_y), mm_to_units(mm_x))
}

/// Draw absolute, `Dy,x`.
pub fn draw_mm(mm_y: f64, mm_x: f64) -> Command {
    format!("D{},{}", mm_to_units(mm_y), mm_to_units(mm_x))
}

/// Upper left corner of the cutting area, `\y,x`.
pub fn upper_left_mm(mm_y: f64, mm_x: f64) -> Command {
    format!("\\{},{}", mm_to_units(mm_y), mm_to_units(mm_x))
}

/// Lower right corner of the cutting area, `Zy,x`.
pub fn lower_right_mm(mm_y: f64, mm_x: f64) -> Command {
    format!("Z{},{}", mm_to_units(mm_y), mm_to_units(mm_x))
}

/// Both corners of the cutting area, given in device units.
pub fn boundary(top: i32, left: i32, bottom: i32, right: i32) -> [Command; 2] {
    [format!("\\{top},{left}"), format!("Z{bottom},{right}")]
}

/// Acceleration, `TJa`.
pub fn acceleration(accel: u32) -> Command {
    format!("TJ{accel}")
}

/// Orientation: `FN0` followed by `TB50,1` (landscape) or `TB50,0` (portrait).
pub fn orientation(landscape: bool) -> [Command; 2] {
    ["FN0".to_string(), format!("TB50,{}", landscape as u8)]
}

/// Cutting mat selection, `TGn`.
pub fn cutting_mat(code: char) -> Command {
    format!("TG{code}")
}

/// Media type, `FWn`. Only sent to cutters older than the Cameo3.
pub fn media(code: u16) -> Command {
    format!("FW{code}")
}

/// Track enhancing: `FY0` enables it (rollers move three times forward and back), `FY1` disables it.
pub fn track_enhancing(enable: bool) -> Command {
    let cmd = if enable { "FY0" } else { "FY1" };
    cmd.to_string()
}

/// Automatic registration mark search, `TB123,h,w,t,l`.
pub fn automatic_regmark_mm(height: f64, width: f64, top: f64, left: f64) -> Command {
    format!(
        "TB123,{},{},{},{}",
        mm_to_units(height),
        mm_to_units(width),
        mm_to_units(top),
        mm_to_units(left)
    )
}

/// Manual registration mark, `TB23,h,w`. The tool was positioned over the mark by hand.
pub fn manual_regmark_mm(height: f64, width: f64) -> Command {
    format!("TB23,{},{}", mm_to_units(height), mm_to_units(width))
}

/// Registration mark parameters: landscape off, use regmarks, type "Cameo,Portrait",
/// arm length 400, width 10, enable registration.
pub fn regmark_setup() -> [Command; 6] {
    [
        "TB50,0".to_string(),
        "TB99".to_string(),
        "TB52,2".to_string(),
        "TB51,400".to_string(),
        "TB53,10".to_string(),
        "TB55,1".to_string(),
    ]
}

/// The firmware version query, already delimited.
pub fn firmware_query() -> Vec<u8> {
    delimit_commands([consts::QUERY_FIRMWARE_VERSION])
}
