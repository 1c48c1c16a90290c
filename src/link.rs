use std::{io::Write, thread, time::Duration};

use log::{debug, info, warn};

use crate::{
    codec::{self, decode_status, delimit_commands, Status},
    consts::{self, resp, CMD_ETX},
    transport::Transport,
    CutterError, CutterResult,
};

/// Called with the bytes written so far, the total and the status flags of the running write.
/// The flags contain a `t` for every write timeout and an `r` for every retried zero-length write.
pub type ProgressCallback = Box<dyn FnMut(usize, usize, &str) + Send>;

/// Delays of the retry and polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause before retrying a chunk which timed out or was accepted with zero length.
    pub retry_backoff: Duration,
    /// How long to wait for the cutter to digest one plot fragment.
    pub fragment_ready_timeout: Duration,
    pub fragment_poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            retry_backoff: consts::WRITE_RETRY_BACKOFF,
            fragment_ready_timeout: consts::SAFE_WRITE_READY_TIMEOUT,
            fragment_poll_interval: consts::SAFE_WRITE_POLL_INTERVAL,
        }
    }
}

#[derive(Default)]
pub struct LinkOptions {
    /// Commands are recorded but never sent. Queries still reach the cutter.
    pub dry_run: bool,
    /// Receives a byte-for-byte transcript of the commands sent.
    pub transcript: Option<Box<dyn Write + Send>>,
    /// Also record queries in the transcript (never the replies).
    pub include_queries: bool,
    pub progress: Option<ProgressCallback>,
    pub timings: Timings,
}

/// The command channel to a cutter: chunked writes with retries, transcript recording and
/// status polling on top of a raw [`Transport`].
pub struct Link {
    transport: Box<dyn Transport>,
    options: LinkOptions,
}

impl Link {
    pub fn new(transport: Box<dyn Transport>, options: LinkOptions) -> Self {
        if options.dry_run {
            info!("Dry run specified; no commands will be sent to cutter.");
        }

        Self { transport, options }
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn timings(&self) -> Timings {
        self.options.timings
    }

    fn record(&mut self, data: &[u8], is_query: bool) -> CutterResult<()> {
        if is_query && !self.options.include_queries {
            return Ok(());
        }

        if let Some(sink) = self.options.transcript.as_mut() {
            sink.write_all(data)?;
        }

        Ok(())
    }

    /// Empties the inbound buffer. Whatever is found there was not asked for.
    fn drain(&mut self) {
        if let Ok(stray) = self
            .transport
            .read(consts::DEFAULT_RX_BUF_SIZE, consts::DRAIN_READ_TIMEOUT)
        {
            if !stray.is_empty() {
                warn!("Response before write: {:?}", codec::latin1(&stray));
            }
        }
    }

    fn report_progress(&mut self, done: usize, total: usize, flags: &str) {
        match self.options.progress.as_mut() {
            Some(callback) => callback(done, total, flags),
            None => debug!("{:.0}% {flags}", 100.0 * done as f64 / total as f64),
        }
    }

    /// Sends bytes to the cutter in chunks of 4096 bytes.
    ///
    /// Progress is reported before every chunk after the first one and once more when all bytes went out.
    /// A chunk which runs into its timeout is retried until it goes through. A chunk which is
    /// accepted with zero length is retried five times before the write fails.
    pub fn write(&mut self, data: &[u8], is_query: bool, timeout: Duration) -> CutterResult<()> {
        self.record(data, is_query)?;

        if self.options.dry_run && !is_query {
            return Ok(());
        }

        let backoff = self.options.timings.retry_backoff;
        let mut offset = 0;
        let mut retry = 0;
        let mut flags = String::new();

        while offset < data.len() {
            if offset > 0 {
                self.report_progress(offset, data.len(), &flags);
            }

            let end = (offset + consts::RAW_CHUNK_SIZE).min(data.len());
            let chunk = &data[offset..end];

            self.drain();

            let written = match self.transport.write(chunk, timeout) {
                Ok(written) => written,
                Err(CutterError::Timeout) => {
                    warn!("Write of {} bytes timed out, retrying", chunk.len());
                    thread::sleep(backoff);
                    flags.push('t');
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !flags.is_empty() {
                flags.clear();
            }

            if written == 0 {
                if retry >= consts::ZERO_WRITE_RETRIES {
                    return Err(CutterError::WriteFailed {
                        len: chunk.len(),
                        written,
                    });
                }

                thread::sleep(backoff);
                retry += 1;
                flags.push('r');
            } else {
                retry = 0;
            }

            offset += written;
        }

        if offset != data.len() {
            return Err(CutterError::WriteIncomplete {
                expected: data.len(),
                written: offset,
            });
        }

        if !data.is_empty() {
            self.report_progress(offset, data.len(), &flags);
        }

        Ok(())
    }

    /// Sends a plot stream in fragments of at most 1024 bytes, each ending at a command boundary,
    /// and waits for the cutter to become ready after every fragment.
    ///
    /// A command longer than a fragment is sent as a fragment of its own.
    pub fn safe_write(&mut self, data: &[u8]) -> CutterResult<()> {
        let Timings {
            fragment_ready_timeout,
            fragment_poll_interval,
            ..
        } = self.options.timings;

        let mut rest = data;

        while !rest.is_empty() {
            let window = &rest[..rest.len().min(consts::SAFE_CHUNK_SIZE)];

            let end = match window.iter().rposition(|&b| b == CMD_ETX) {
                Some(idx) => idx + 1,
                None => rest
                    .iter()
                    .position(|&b| b == CMD_ETX)
                    .map_or(rest.len(), |idx| idx + 1),
            };

            let (fragment, tail) = rest.split_at(end);

            self.write(fragment, false, consts::DEFAULT_WRITE_TIMEOUT)?;
            self.wait_for_ready(fragment_ready_timeout, fragment_poll_interval)?;

            rest = tail;
        }

        Ok(())
    }

    /// Sends a list of commands, each terminated.
    pub fn send_command<I, C>(&mut self, commands: I, is_query: bool, timeout: Duration) -> CutterResult<()>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.write(&delimit_commands(commands), is_query, timeout)
    }

    /// Sends a list of plot commands through [`Self::safe_write`]. Nothing is sent for an empty list.
    pub fn safe_send_command<I, C>(&mut self, commands: I) -> CutterResult<()>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let data = delimit_commands(commands);

        if data.is_empty() {
            return Ok(());
        }

        self.safe_write(&data)
    }

    pub fn send_escape(&mut self, code: u8, is_query: bool) -> CutterResult<()> {
        self.write(&codec::escape(code), is_query, consts::DEFAULT_WRITE_TIMEOUT)
    }

    /// A single bulk read. Receiving nothing is an error.
    pub fn read(&mut self, size: usize, timeout: Duration) -> CutterResult<Vec<u8>> {
        let data = self.transport.read(size, timeout)?;

        if data.is_empty() {
            return Err(CutterError::ReadFailed);
        }

        Ok(data)
    }

    /// Sends a query and returns the reply without its terminator.
    /// Returns `None` if nothing (or only a terminator) was received.
    pub fn send_receive_command(
        &mut self,
        command: &str,
        tx_timeout: Duration,
        rx_timeout: Duration,
    ) -> CutterResult<Option<String>> {
        self.send_command([command], true, tx_timeout)?;

        match self.read(consts::DEFAULT_RX_BUF_SIZE, rx_timeout) {
            Ok(reply) if reply.len() > 1 => Ok(Some(codec::latin1(&reply[..reply.len() - 1]))),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("No reply to {command:?}: {e}");
                Ok(None)
            }
        }
    }

    /// Queries the device status.
    ///
    /// A status which cannot be read at all is reported as the "no device" placeholder,
    /// see [`Status::is_no_device`].
    pub fn status(&mut self) -> CutterResult<Status> {
        self.send_escape(consts::esc::ENQ, true)?;

        let raw = match self.read(consts::DEFAULT_RX_BUF_SIZE, consts::STATUS_READ_TIMEOUT) {
            Ok(raw) => raw,
            Err(e @ (CutterError::Timeout | CutterError::UsbTransfer(_))) => {
                warn!("Reading the status failed: {e}");
                delimit_commands([resp::NO_DEVICE])
            }
            Err(e) => return Err(e),
        };

        decode_status(&raw).map_err(|last| CutterError::UnterminatedResponse { last })
    }

    /// Polls the status until the cutter is ready, at most `timeout / poll_interval` times.
    ///
    /// Running out of polls is not an error, the last status is returned and the caller decides.
    /// In a dry run the first status is returned right away.
    pub fn wait_for_ready(&mut self, timeout: Duration, poll_interval: Duration) -> CutterResult<Status> {
        let mut state = self.status()?;

        if self.options.dry_run {
            return Ok(state);
        }

        let npolls = (timeout.as_nanos() / poll_interval.as_nanos().max(1)) as usize;

        for i in 1..npolls {
            if state.is_ready() {
                break;
            }

            if state.is_no_device() {
                return Err(CutterError::NoDevice);
            }

            if state == Status::Unloaded {
                info!("{i}/{npolls}: please load media ...");
            } else if 3 * i > npolls {
                info!("{i}/{npolls}: status={state}");
            }

            thread::sleep(poll_interval);
            state = self.status()?;
        }

        Ok(state)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(sink) = self.options.transcript.as_mut() {
            if let Err(e) = sink.flush() {
                warn!("Failed to flush the transcript: {e}");
            }
        }
    }
}
