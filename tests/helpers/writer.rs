#![allow(dead_code)]

use std::io;

/// An [`io::Write`] sink that starts failing after a number of writes.
pub struct Writer {
    buf: Vec<u8>,
    writes: usize,
    limit: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::failing_after(usize::MAX)
    }

    pub fn failing_after(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            writes: 0,
            limit,
        }
    }

    #[track_caller]
    pub fn into_string(self) -> String {
        String::from_utf8(self.buf).unwrap()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.writes == self.limit {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        self.writes += 1;
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
