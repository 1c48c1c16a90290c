//! A Rust cross-platform userspace driver for Silhouette and Graphtec Craft Robo vinyl cutters.
//!
//! The cutters speak an ASCII command protocol over two USB bulk endpoints. Every command is
//! terminated by an ETX byte (0x03) and coordinates are given in Silhouette units (0.05 mm).
//! This library uses the [nusb] library for USB access. It converts cut paths given in millimeters
//! into device commands, sends them in fragments the cutter can digest and polls the device status
//! until it is ready again.
//!
//! [nusb]: https://github.com/kevinmehall/nusb
//!
//! ## Example
//!
//! More examples are provided in the `demos/` folder.
//!
//! ```no_run
//! use silhouette_lib_rs::{
//!     cutter::{open_cutter, OpenOptions, PlotJob, SetupOptions},
//!     link::LinkOptions,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cutter = open_cutter(OpenOptions::default(), LinkOptions::default())?;
//!
//!     cutter.setup(&SetupOptions::default())?;
//!
//!     // The letter Y, 20 mm tall and 9 mm wide.
//!     let paths = vec![
//!         vec![(0.0, 0.0).into(), (4.5, 10.0).into(), (4.5, 20.0).into()],
//!         vec![(9.0, 0.0).into(), (4.5, 10.0).into()],
//!     ];
//!
//!     let outcome = cutter.plot(&PlotJob::new(paths))?;
//!
//!     println!("Bounding box: {:?}", outcome.bbox.bounds);
//!
//!     Ok(())
//! }
//! ```

/// Contains the protocol bytes, USB endpoints and default timeouts.
pub mod consts;

/// Conversion of millimeters and inches into device units.
pub mod units;

/// Encoding of commands into delimited byte streams and decoding of replies.
pub mod codec;

/// Turns cut paths into move/draw commands, with bounding box and clipping.
pub mod geometry;

/// Command builders for the tool holders of the two command families.
pub mod tool;

/// Media presets, cutting mats and tool ids.
pub mod media;

/// The table of known cutters.
pub mod profile;

/// The raw transport interface and the resilient writer built on top of it.
pub mod transport;
pub mod link;

/// In-memory transport for dry runs and tests.
pub mod mock;

/// USB discovery and the nusb backed transport.
pub mod usb;

/// The cutter session.
pub mod cutter;
mod cameo;
mod portrait;

/// Offline decoding of recorded command streams into readable text.
pub mod decode;

/// Crate-specific error enum.
/// Every function interacting with the cutter returns a Result enum with this error type.
#[derive(thiserror::Error, Debug)]
pub enum CutterError {
    #[error("Error while transferring USB data")]
    UsbTransfer(#[from] nusb::transfer::TransferError),

    #[error("Internal I/O error occurred")]
    Io(#[from] std::io::Error),

    #[error("Timeout occurred during I/O operation")]
    Timeout,

    #[error("Writing {len} bytes failed, the cutter accepted {written} bytes")]
    WriteFailed { len: usize, written: usize },

    #[error("Writing all {expected} bytes failed, only {written} bytes were sent")]
    WriteIncomplete { expected: usize, written: usize },

    #[error("Read failed: no data received")]
    ReadFailed,

    #[error("Response not terminated with 0x03 (last byte: {last:?})")]
    UnterminatedResponse { last: Option<u8> },

    #[error("Couldn't find registration marks ({response})")]
    RegmarkNotFound { response: String },

    #[error("Waiting for ready but no device exists")]
    NoDevice,

    #[error("Couldn't find a Graphtec Silhouette device (VID {vid:#06X}), check USB and power. Devices: {seen}")]
    NoDeviceFound { vid: u16, seen: String },

    #[error("Failed to write the initialize command. Permissions?")]
    Initialize(#[source] Box<CutterError>),

    #[error("Unknown cutting mat: {0}")]
    UnknownCuttingMat(String),

    #[error("A previous plot was aborted while {phase}, initialize the cutter again")]
    NeedsReset { phase: cutter::Phase },
}

pub type CutterResult<T> = Result<T, CutterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(CutterError::Timeout.to_string(), "Timeout occurred during I/O operation");
        assert_eq!(
            CutterError::UnknownCuttingMat("cameo_99x99".to_string()).to_string(),
            "Unknown cutting mat: cameo_99x99"
        );
        assert_eq!(
            CutterError::Io(std::io::Error::other("gone")).to_string(),
            "Internal I/O error occurred"
        );
    }
}
