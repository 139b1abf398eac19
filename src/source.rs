use std::io;

use dsv_core::CharSource;

use crate::error::{Error, Result};

/// The default size, in bytes, of the block a [`BufferedSource`] reads at a
/// time.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// A character source that decodes UTF-8 from any `io::Read`.
///
/// Input is pulled in blocks of a fixed size. A multi-byte character split
/// across two blocks is reassembled. Invalid UTF-8 is reported as
/// [`Error::Utf8`] with the line on which it was found.
///
/// Since the source reads in blocks, it is not necessary to wrap the
/// underlying reader in an `io::BufReader`.
#[derive(Debug)]
pub struct BufferedSource<R> {
    rdr: R,
    buf: CharBuffer,
}

impl<R: io::Read> BufferedSource<R> {
    /// Create a source with the default block size.
    pub fn new(rdr: R) -> BufferedSource<R> {
        BufferedSource::with_capacity(DEFAULT_BUFFER_CAPACITY, rdr)
    }

    /// Create a source that reads `capacity` bytes at a time.
    ///
    /// Capacities smaller than four bytes are rounded up, since a block must
    /// be able to hold any single UTF-8 encoded character.
    pub fn with_capacity(capacity: usize, rdr: R) -> BufferedSource<R> {
        BufferedSource { rdr, buf: CharBuffer::new(capacity) }
    }
}

impl<R> BufferedSource<R> {
    /// The line of the most recently decoded character, counting `\n`, `\r`
    /// and `\r\n` as one line break each.
    pub fn line(&self) -> u64 {
        self.buf.line()
    }

    /// Return a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Return a mutable reference to the underlying reader.
    ///
    /// Reading from it directly will confuse the source, since bytes may
    /// already be buffered.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwrap this source, returning the underlying reader.
    ///
    /// Any buffered but undecoded input is lost.
    pub fn into_inner(self) -> R {
        self.rdr
    }
}

impl<R: io::Read> CharSource for BufferedSource<R> {
    type Error = Error;

    fn next_char(&mut self) -> Result<Option<char>> {
        loop {
            match self.buf.decode() {
                Decoded::Char(ch) => return Ok(Some(ch)),
                Decoded::Eof => return Ok(None),
                Decoded::Invalid => {
                    return Err(Error::Utf8 { line: self.buf.line() })
                }
                Decoded::NeedMore => {
                    let n = loop {
                        match self.rdr.read(self.buf.spare()) {
                            Ok(n) => break n,
                            Err(ref err)
                                if err.kind() == io::ErrorKind::Interrupted =>
                            {
                                continue
                            }
                            Err(err) => return Err(Error::Io(err)),
                        }
                    };
                    self.buf.filled(n);
                }
            }
        }
    }
}

/// The result of decoding the next character from a [`CharBuffer`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Decoded {
    Char(char),
    /// The buffer is empty or ends with an incomplete character. Refill it
    /// through `spare` and `filled`.
    NeedMore,
    Invalid,
    Eof,
}

/// A block of undecoded bytes shared by the synchronous and asynchronous
/// sources.
#[derive(Debug)]
pub(crate) struct CharBuffer {
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    line: u64,
    after_cr: bool,
}

impl CharBuffer {
    pub(crate) fn new(capacity: usize) -> CharBuffer {
        CharBuffer {
            buf: vec![0; capacity.max(4)],
            start: 0,
            end: 0,
            eof: false,
            line: 1,
            after_cr: false,
        }
    }

    pub(crate) fn line(&self) -> u64 {
        self.line
    }

    pub(crate) fn decode(&mut self) -> Decoded {
        if self.start == self.end {
            return if self.eof { Decoded::Eof } else { Decoded::NeedMore };
        }
        let pending = &self.buf[self.start..self.end];
        let (ch, size) = bstr::decode_utf8(pending);
        match ch {
            Some(ch) => {
                self.start += size;
                self.count_line(ch);
                Decoded::Char(ch)
            }
            // A valid prefix that runs to the end of the block may be
            // completed by the next read.
            None if !self.eof && size == pending.len() => Decoded::NeedMore,
            None => Decoded::Invalid,
        }
    }

    /// Move any pending bytes to the front of the block and return the free
    /// space after them.
    pub(crate) fn spare(&mut self) -> &mut [u8] {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        &mut self.buf[self.end..]
    }

    /// Record that `n` bytes were written into the slice returned by
    /// `spare`. Zero marks the end of input.
    pub(crate) fn filled(&mut self, n: usize) {
        if n == 0 {
            self.eof = true;
        } else {
            self.end += n;
        }
    }

    fn count_line(&mut self, ch: char) {
        match ch {
            '\r' => {
                self.line += 1;
                self.after_cr = true;
            }
            '\n' => {
                if !self.after_cr {
                    self.line += 1;
                }
                self.after_cr = false;
            }
            _ => self.after_cr = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use dsv_core::CharSource;

    use crate::error::Error;

    use super::BufferedSource;

    /// A reader that hands out at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl<'a> io::Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn chars<R: io::Read>(mut src: BufferedSource<R>) -> Result<String, Error> {
        let mut out = String::new();
        while let Some(ch) = src.next_char()? {
            out.push(ch);
        }
        Ok(out)
    }

    #[test]
    fn ascii() {
        let src = BufferedSource::new("a;b\nc".as_bytes());
        assert_eq!(chars(src).unwrap(), "a;b\nc");
    }

    #[test]
    fn multibyte_across_blocks() {
        let text = "aß日本🎉z";
        for cap in 1..8 {
            let src = BufferedSource::with_capacity(cap, text.as_bytes());
            assert_eq!(chars(src).unwrap(), text, "capacity {}", cap);
        }
    }

    #[test]
    fn multibyte_across_short_reads() {
        let text = "€€€;日本";
        for chunk in 1..4 {
            let rdr = Trickle { data: text.as_bytes(), chunk };
            let src = BufferedSource::with_capacity(16, rdr);
            assert_eq!(chars(src).unwrap(), text, "chunk {}", chunk);
        }
    }

    #[test]
    fn sentinel_repeats() {
        let mut src = BufferedSource::new("x".as_bytes());
        assert_eq!(src.next_char().unwrap(), Some('x'));
        assert_eq!(src.next_char().unwrap(), None);
        assert_eq!(src.next_char().unwrap(), None);
    }

    #[test]
    fn invalid_utf8_has_line() {
        let data = b"ok\r\nstill ok\n\xFFbad";
        let err = chars(BufferedSource::new(&data[..])).unwrap_err();
        match err {
            Error::Utf8 { line } => assert_eq!(line, 3),
            err => panic!("expected UTF-8 error but got {:?}", err),
        }
    }

    #[test]
    fn truncated_utf8_at_eof() {
        let data = b"ab\xE6\x97";
        let err = chars(BufferedSource::with_capacity(2, &data[..]));
        assert!(matches!(err, Err(Error::Utf8 { line: 1 })));
    }
}
