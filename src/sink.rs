//! Byte buffer in front of a raw output.

use std::io::{self, Write};

/// Default scratch buffer capacity (64KB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Buffered byte sink that never splits a single payload.
///
/// Payloads larger than the buffer are written straight through after the pending
/// bytes, so a huge entry is neither chunked nor reordered relative to its
/// neighbours. A capacity of zero makes every write reach the output immediately.
pub struct ByteBufferedSink<W: Write> {
    inner: Option<W>,
    buffer: Vec<u8>,
    capacity: usize,
}

impl<W: Write> ByteBufferedSink<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn unbuffered(inner: W) -> Self {
        Self::new(inner, 0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.inner.is_none() {
            return Err(closed_error());
        }

        if bytes.len() > self.capacity {
            self.write_pending()?;
            return self.inner_mut()?.write_all(bytes);
        }

        if self.buffer.len() + bytes.len() > self.capacity {
            self.write_pending()?;
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.write_pending()?;
        self.inner_mut()?.flush()
    }

    /// Flushes and releases the output. Closing an already closed sink is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        if self.inner.is_none() {
            return Ok(());
        }
        let result = self.flush();
        self.buffer = Vec::new();
        self.inner = None;
        result
    }

    /// Flushes and hands back the output.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        self.inner.take().ok_or_else(closed_error)
    }

    fn write_pending(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let inner = self.inner.as_mut().ok_or_else(closed_error)?;
        let result = inner.write_all(&self.buffer);
        // Dropped on failure as well, a retry must not duplicate a partial write
        self.buffer.clear();
        result
    }

    fn inner_mut(&mut self) -> io::Result<&mut W> {
        self.inner.as_mut().ok_or_else(closed_error)
    }
}

impl<W: Write> Drop for ByteBufferedSink<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.flush();
        }
    }
}

fn closed_error() -> io::Error {
    io::Error::other("sink is closed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records every call to `write` so tests can see how payloads reach the output.
    #[derive(Default)]
    struct RecordingOutput {
        writes: Vec<Vec<u8>>,
        flushes: usize,
        fail: bool,
    }

    impl RecordingOutput {
        fn contents(&self) -> Vec<u8> {
            self.writes.concat()
        }
    }

    impl Write for RecordingOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::other("disk full"));
            }
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_small_writes_stay_buffered() {
        let mut sink = ByteBufferedSink::new(RecordingOutput::default(), 16);
        sink.write(b"abc").unwrap();
        sink.write(b"def").unwrap();

        assert_eq!(sink.pending(), 6);
        assert!(sink.get_ref().unwrap().writes.is_empty());

        sink.flush().unwrap();
        let output = sink.get_ref().unwrap();
        assert_eq!(output.writes, vec![b"abcdef".to_vec()]);
        assert_eq!(output.flushes, 1);
    }

    #[test]
    fn test_full_buffer_is_written_before_next_payload() {
        let mut sink = ByteBufferedSink::new(RecordingOutput::default(), 8);
        sink.write(b"12345").unwrap();
        sink.write(b"6789").unwrap();

        let output = sink.get_ref().unwrap();
        assert_eq!(output.writes, vec![b"12345".to_vec()]);
        assert_eq!(sink.pending(), 4);
    }

    #[test]
    fn test_oversized_payload_is_written_whole_and_in_order() {
        let mut sink = ByteBufferedSink::new(RecordingOutput::default(), 4);
        let big = vec![b'x'; 10];

        sink.write(b"ab").unwrap();
        sink.write(&big).unwrap();
        sink.write(b"cd").unwrap();

        let output = sink.into_inner().unwrap();
        assert_eq!(output.writes[0], b"ab".to_vec());
        assert_eq!(output.writes[1], big);
        assert_eq!(output.writes[2], b"cd".to_vec());
    }

    #[test]
    fn test_unbuffered_writes_immediately() {
        let mut sink = ByteBufferedSink::unbuffered(RecordingOutput::default());
        sink.write(b"line\n").unwrap();

        assert_eq!(sink.pending(), 0);
        assert_eq!(sink.get_ref().unwrap().contents(), b"line\n".to_vec());
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut sink = ByteBufferedSink::new(RecordingOutput::default(), 16);
        sink.write(b"abc").unwrap();
        sink.close().unwrap();

        assert!(sink.is_closed());
        assert!(sink.write(b"def").is_err());
        assert!(sink.flush().is_err());
        // closing twice is harmless
        sink.close().unwrap();
    }

    #[test]
    fn test_failed_flush_drops_pending_bytes() {
        let mut sink = ByteBufferedSink::new(RecordingOutput::default(), 16);
        sink.write(b"lost").unwrap();
        sink.inner.as_mut().unwrap().fail = true;

        assert!(sink.flush().is_err());
        assert_eq!(sink.pending(), 0);

        sink.inner.as_mut().unwrap().fail = false;
        sink.write(b"kept").unwrap();
        let output = sink.into_inner().unwrap();
        assert_eq!(output.contents(), b"kept".to_vec());
    }

    proptest! {
        #[test]
        fn prop_buffer_is_transparent(chunks in proptest::collection::vec(".{0,40}", 0..50)) {
            let mut sink = ByteBufferedSink::new(Vec::new(), DEFAULT_BUFFER_CAPACITY);
            for chunk in &chunks {
                sink.write(chunk.as_bytes()).unwrap();
            }
            let output = sink.into_inner().unwrap();
            prop_assert_eq!(output, chunks.concat().into_bytes());
        }

        #[test]
        fn prop_small_capacity_preserves_order(
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..40),
            capacity in 0usize..32,
        ) {
            let mut sink = ByteBufferedSink::new(Vec::new(), capacity);
            for chunk in &chunks {
                sink.write(chunk).unwrap();
            }
            let output = sink.into_inner().unwrap();
            prop_assert_eq!(output, chunks.concat());
        }
    }
}
