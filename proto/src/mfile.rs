/// A growable in-memory byte buffer.
///
/// Used to assemble outgoing requests and to accumulate reply chunks read
/// off the socket. Formatted output goes through `write!` (both
/// `std::fmt::Write` and `std::io::Write` are implemented).
#[derive(Debug, Default, Clone)]
pub struct MFile {
    buf: Vec<u8>,
}

impl MFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append a string.
    pub fn puts(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Append raw bytes.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Drop everything from `len` onward.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Hand the accumulated bytes to the caller.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl std::fmt::Write for MFile {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.puts(s);
        Ok(())
    }
}

impl std::io::Write for MFile {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.append(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
