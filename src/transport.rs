use std::time::Duration;

use crate::CutterResult;

/// Raw access to the cutter's bulk endpoints.
///
/// Implementations perform exactly one transfer per call and do not retry.
/// A transfer which runs into its timeout must fail with [`crate::CutterError::Timeout`],
/// which the [`crate::link::Link`] treats as recoverable.
pub trait Transport: Send {
    /// Writes one chunk to the OUT endpoint and returns the number of bytes the device accepted.
    fn write(&mut self, chunk: &[u8], timeout: Duration) -> CutterResult<usize>;

    /// Reads at most `size` bytes from the IN endpoint.
    fn read(&mut self, size: usize, timeout: Duration) -> CutterResult<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, chunk: &[u8], timeout: Duration) -> CutterResult<usize> {
        (**self).write(chunk, timeout)
    }

    fn read(&mut self, size: usize, timeout: Duration) -> CutterResult<Vec<u8>> {
        (**self).read(size, timeout)
    }
}
