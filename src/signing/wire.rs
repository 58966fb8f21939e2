//! SSH wire encoding (RFC 4251 §5): big-endian `uint32` and length-prefixed
//! `string` values.

/// Failure to decode a wire-encoded structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed SSH encoding: {0}")]
pub struct WireError(pub &'static str);

/// Cursor over wire-encoded bytes.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Start reading `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    /// Take exactly `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.rest.len() < len {
            return Err(WireError("unexpected end of data"));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    /// Read a `uint32`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if fewer than four bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| WireError("unexpected end of data"))?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Read a length-prefixed `string` as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if the prefix or body is truncated.
    pub fn read_string(&mut self) -> Result<&'a [u8], WireError> {
        let len = usize::try_from(self.read_u32()?).map_err(|_| WireError("length overflow"))?;
        self.take(len)
    }

    /// Read a length-prefixed `string` that must be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if truncated or not UTF-8.
    pub fn read_utf8(&mut self) -> Result<&'a str, WireError> {
        std::str::from_utf8(self.read_string()?).map_err(|_| WireError("string is not UTF-8"))
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.rest
    }

    /// Whether every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

/// Builder for wire-encoded bytes.
///
/// Encoding never fails part-way; an oversized string is reported once by
/// [`Writer::finish`].
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
    overflow: bool,
}

impl Writer {
    /// Start an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes without a length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a `uint32`.
    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Append a length-prefixed `string`.
    pub fn put_string(&mut self, bytes: &[u8]) -> &mut Self {
        match u32::try_from(bytes.len()) {
            Ok(len) => self.put_u32(len).put_raw(bytes),
            Err(_) => {
                self.overflow = true;
                self
            }
        }
    }

    /// Finish and return the encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError`] if any string exceeded the `uint32` length
    /// prefix.
    pub fn finish(self) -> Result<Vec<u8>, WireError> {
        if self.overflow {
            Err(WireError("string longer than u32::MAX bytes"))
        } else {
            Ok(self.buf)
        }
    }
}
