use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{
    codec,
    consts::{esc, CMD_ESC},
    transport::Transport,
    CutterError, CutterResult,
};

/// Scripted result of the next write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The transfer runs into its timeout.
    Timeout,
    /// The device accepts only this many bytes.
    Accept(usize),
}

#[derive(Debug, Default)]
struct MockState {
    /// Replies armed by writing exactly the key, used until the queue is empty.
    scripted: HashMap<Vec<u8>, VecDeque<Vec<u8>>>,
    /// Replies armed by writing exactly the key, every time.
    sticky: HashMap<Vec<u8>, Vec<u8>>,
    /// The reply returned by the next read.
    pending: Option<Vec<u8>>,
    outcomes: VecDeque<WriteOutcome>,
    writes: Vec<Vec<u8>>,
}

/// An in-memory cutter.
///
/// Every write is recorded. A write whose bytes match a known query arms the reply for the next read,
/// like a cutter would answer it. Without hardware it answers the status enquiry with "ready" and the
/// firmware query with "None". Cloning yields a handle to the same state, so a test can inspect the
/// traffic after handing the transport to a [`crate::cutter::Cutter`].
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A mock which answers nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock with the default replies of a dummy device.
    pub fn dummy() -> Self {
        let mock = Self::new();

        mock.respond_always(&codec::escape(esc::ENQ), b"0\x03");
        mock.respond_always(&codec::firmware_query(), b"None \x03");

        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the traffic from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replies with `reply` every time `request` is written.
    pub fn respond_always(&self, request: &[u8], reply: &[u8]) {
        self.state().sticky.insert(request.to_vec(), reply.to_vec());
    }

    /// Queues `reply` for the next write of `request`. Queued replies take precedence over
    /// the ones from [`Self::respond_always`].
    pub fn respond_once(&self, request: &[u8], reply: &[u8]) {
        self.state()
            .scripted
            .entry(request.to_vec())
            .or_default()
            .push_back(reply.to_vec());
    }

    /// Queues replies to the status enquiry, e.g. `b"1\x03"` for moving.
    pub fn queue_status(&self, replies: &[&[u8]]) {
        for reply in replies {
            self.respond_once(&codec::escape(esc::ENQ), reply);
        }
    }

    /// Scripts the outcome of the next writes. Unscripted writes accept everything.
    pub fn queue_write_outcome(&self, outcome: WriteOutcome) {
        self.state().outcomes.push_back(outcome);
    }

    /// All writes which did not time out, in order, truncated to the accepted bytes.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// All bytes accepted so far, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// The commands accepted so far, as text. Escape commands carry no terminator,
    /// each one is listed on its own.
    pub fn commands(&self) -> Vec<String> {
        let mut commands = Vec::new();
        let mut stream = Vec::new();

        let flush = |stream: &mut Vec<u8>, commands: &mut Vec<String>| {
            commands.extend(codec::split_commands(stream).into_iter().map(codec::latin1));
            stream.clear();
        };

        for write in self.writes() {
            if write.first() == Some(&CMD_ESC) {
                flush(&mut stream, &mut commands);
                commands.push(codec::latin1(&write));
            } else {
                stream.extend_from_slice(&write);
            }
        }

        flush(&mut stream, &mut commands);

        commands
    }

    /// Forgets the recorded traffic.
    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }
}

impl Transport for MockTransport {
    fn write(&mut self, chunk: &[u8], _timeout: Duration) -> CutterResult<usize> {
        let mut state = self.state();

        let accepted = match state.outcomes.pop_front() {
            Some(WriteOutcome::Timeout) => return Err(CutterError::Timeout),
            Some(WriteOutcome::Accept(n)) => n.min(chunk.len()),
            None => chunk.len(),
        };

        state.writes.push(chunk[..accepted].to_vec());

        let queued = state
            .scripted
            .get_mut(chunk)
            .and_then(|replies| replies.pop_front());

        if let Some(reply) = queued.or_else(|| state.sticky.get(chunk).cloned()) {
            state.pending = Some(reply);
        }

        Ok(accepted)
    }

    fn read(&mut self, size: usize, _timeout: Duration) -> CutterResult<Vec<u8>> {
        let mut reply = self.state().pending.take().unwrap_or_default();
        reply.truncate(size);

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_answers_status_and_version() {
        let mut mock = MockTransport::dummy();
        let timeout = Duration::from_millis(1);

        assert_eq!(mock.read(64, timeout).unwrap(), b"");

        mock.write(&[0x1b, 0x05], timeout).unwrap();
        assert_eq!(mock.read(64, timeout).unwrap(), b"0\x03");
        assert_eq!(mock.read(64, timeout).unwrap(), b"");

        mock.write(b"FG\x03", timeout).unwrap();
        assert_eq!(mock.read(64, timeout).unwrap(), b"None \x03");
    }

    #[test]
    fn queued_replies_come_first() {
        let mut mock = MockTransport::dummy();
        let timeout = Duration::from_millis(1);
        mock.queue_status(&[b"1\x03"]);

        mock.write(&[0x1b, 0x05], timeout).unwrap();
        assert_eq!(mock.read(64, timeout).unwrap(), b"1\x03");

        mock.write(&[0x1b, 0x05], timeout).unwrap();
        assert_eq!(mock.read(64, timeout).unwrap(), b"0\x03");
    }

    #[test]
    fn scripted_write_outcomes() {
        let mut mock = MockTransport::new();
        let timeout = Duration::from_millis(1);
        mock.queue_write_outcome(WriteOutcome::Timeout);
        mock.queue_write_outcome(WriteOutcome::Accept(2));

        assert!(matches!(mock.write(b"M0,0\x03", timeout), Err(CutterError::Timeout)));
        assert_eq!(mock.write(b"M0,0\x03", timeout).unwrap(), 2);
        assert_eq!(mock.write(b"M0,0\x03", timeout).unwrap(), 5);
        assert_eq!(mock.writes(), [b"M0".to_vec(), b"M0,0\x03".to_vec()]);
    }

    #[test]
    fn escapes_are_listed_separately() {
        let mut mock = MockTransport::dummy();
        let timeout = Duration::from_millis(1);

        mock.write(b"FN0\x03TB", timeout).unwrap();
        mock.write(b"50,0\x03", timeout).unwrap();
        mock.write(&[0x1b, 0x05], timeout).unwrap();
        mock.write(b"H\x03", timeout).unwrap();

        assert_eq!(mock.commands(), ["FN0", "TB50,0", "\u{1b}\u{5}", "H"]);
    }
}
