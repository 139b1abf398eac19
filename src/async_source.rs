/*!
Character sources that can suspend.

The tokenizer itself never blocks: it is fed one character at a time through
[`Tokenizer::feed`]. The drivers in this module pull those characters from an
[`AsyncCharSource`], so the same state machine serves synchronous and
asynchronous readers.
*/

use std::future::poll_fn;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use dsv_core::{Outcome, ParseError, State, StrSource, Tokenizer};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{Error, Result};
use crate::source::{CharBuffer, Decoded, DEFAULT_BUFFER_CAPACITY};

/// A producer of characters that may not be ready yet.
///
/// `Ok(None)` signals the end of input and repeats once reached.
pub trait AsyncCharSource {
    /// The error produced when the next character cannot be obtained.
    type Error;

    /// Attempt to pull the next character.
    ///
    /// On `Poll::Pending`, no character has been consumed and the current
    /// task is woken once progress can be made.
    fn poll_next_char(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<Option<char>, Self::Error>>;
}

impl<'a, S: AsyncCharSource + ?Sized> AsyncCharSource for &'a mut S {
    type Error = S::Error;

    fn poll_next_char(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<Option<char>, S::Error>> {
        (**self).poll_next_char(cx)
    }
}

impl<'a> AsyncCharSource for StrSource<'a> {
    type Error = ParseError;

    fn poll_next_char(
        &mut self,
        _cx: &mut Context<'_>,
    ) -> Poll<std::result::Result<Option<char>, ParseError>> {
        Poll::Ready(Ok(self.next_char_infallible()))
    }
}

/// A character source that decodes UTF-8 from any `AsyncRead`.
///
/// This is the asynchronous counterpart of
/// [`BufferedSource`](crate::BufferedSource) and behaves the same way: input
/// is pulled in blocks, characters split across blocks are reassembled and
/// invalid UTF-8 is reported as [`Error::Utf8`].
#[derive(Debug)]
pub struct AsyncBufferedSource<R> {
    rdr: R,
    buf: CharBuffer,
}

impl<R: AsyncRead + Unpin> AsyncBufferedSource<R> {
    /// Create a source with the default block size.
    pub fn new(rdr: R) -> AsyncBufferedSource<R> {
        AsyncBufferedSource::with_capacity(DEFAULT_BUFFER_CAPACITY, rdr)
    }

    /// Create a source that reads `capacity` bytes at a time.
    pub fn with_capacity(capacity: usize, rdr: R) -> AsyncBufferedSource<R> {
        AsyncBufferedSource { rdr, buf: CharBuffer::new(capacity) }
    }
}

impl<R> AsyncBufferedSource<R> {
    /// The line of the most recently decoded character.
    pub fn line(&self) -> u64 {
        self.buf.line()
    }

    /// Return a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Return a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwrap this source, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.rdr
    }
}

impl<R: AsyncRead + Unpin> AsyncCharSource for AsyncBufferedSource<R> {
    type Error = Error;

    fn poll_next_char(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<char>>> {
        loop {
            match self.buf.decode() {
                Decoded::Char(ch) => return Poll::Ready(Ok(Some(ch))),
                Decoded::Eof => return Poll::Ready(Ok(None)),
                Decoded::Invalid => {
                    return Poll::Ready(Err(Error::Utf8 {
                        line: self.buf.line(),
                    }))
                }
                Decoded::NeedMore => {
                    let mut block = ReadBuf::new(self.buf.spare());
                    ready!(Pin::new(&mut self.rdr).poll_read(cx, &mut block))?;
                    let n = block.filled().len();
                    self.buf.filled(n);
                }
            }
        }
    }
}

/// Pull the next character from `src`.
pub async fn next_char<S>(
    src: &mut S,
) -> std::result::Result<Option<char>, S::Error>
where
    S: AsyncCharSource + ?Sized,
{
    poll_fn(|cx| src.poll_next_char(cx)).await
}

/// Read the next field, like [`Tokenizer::read_field`].
///
/// Returns `None` once the input is exhausted.
pub async fn read_field<'t, S>(
    tok: &'t mut Tokenizer,
    src: &mut S,
) -> std::result::Result<Option<&'t str>, S::Error>
where
    S: AsyncCharSource + ?Sized,
    S::Error: From<ParseError>,
{
    read_field_with(tok, src, From::from).await
}

/// Read the next field, converting parse errors with `on_error`.
///
/// This is the counterpart of [`Tokenizer::read_field_with`].
pub async fn read_field_with<'t, S, E, F>(
    tok: &'t mut Tokenizer,
    src: &mut S,
    mut on_error: F,
) -> std::result::Result<Option<&'t str>, E>
where
    S: AsyncCharSource + ?Sized,
    E: From<S::Error>,
    F: FnMut(ParseError) -> E,
{
    tok.clear_token();
    loop {
        let ch = next_char(src).await?;
        match tok.feed(ch) {
            Ok(Outcome::Continue) => {}
            Ok(Outcome::ConsumeToken) => return Ok(Some(tok.token())),
            Ok(Outcome::IgnoreToken) => return Ok(None),
            Err(err) => return Err(on_error(err)),
        }
    }
}

/// Read the next row, like [`Tokenizer::read_row`].
///
/// Each field is handed to `on_field` with its index. Returns the number of
/// fields read, which is zero once the input is exhausted.
pub async fn read_row<S, G>(
    tok: &mut Tokenizer,
    src: &mut S,
    on_field: G,
) -> std::result::Result<usize, S::Error>
where
    S: AsyncCharSource + ?Sized,
    S::Error: From<ParseError>,
    G: FnMut(usize, &str),
{
    read_row_with(tok, src, From::from, on_field).await
}

/// Like [`read_row`], but converts parse errors with `on_error`.
pub async fn read_row_with<S, E, F, G>(
    tok: &mut Tokenizer,
    src: &mut S,
    mut on_error: F,
    mut on_field: G,
) -> std::result::Result<usize, E>
where
    S: AsyncCharSource + ?Sized,
    E: From<S::Error>,
    F: FnMut(ParseError) -> E,
    G: FnMut(usize, &str),
{
    let mut count = 0;
    loop {
        match read_field_with(tok, src, &mut on_error).await? {
            None => return Ok(count),
            Some(field) => on_field(count, field),
        }
        count += 1;
        if tok.state() == State::EndOfLine {
            return Ok(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use dsv_core::{
        Dialect, ParseError, ParseErrorKind, StrSource, Tokenizer,
    };
    use tokio::io::{AsyncRead, ReadBuf};

    use crate::error::Error;

    use super::{read_field, read_row, read_row_with, AsyncBufferedSource};

    /// A reader that hands out one byte per poll and is pending in between.
    struct Drip {
        data: &'static [u8],
        ready: bool,
    }

    impl AsyncRead for Drip {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if !self.ready {
                self.ready = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            self.ready = false;
            let data = self.data;
            if let Some((&b, rest)) = data.split_first() {
                buf.put_slice(&[b]);
                self.data = rest;
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn rows_from_str() {
        let mut tok = Tokenizer::new(Dialect::default());
        let mut src = StrSource::new("a;\"b\nc\"\n\nd");
        let mut rows = vec![];
        loop {
            let mut row = vec![];
            let n = read_row(&mut tok, &mut src, |_, f| row.push(f.to_string()))
                .await
                .unwrap();
            if n == 0 {
                break;
            }
            rows.push(row);
        }
        assert_eq!(rows, vec![vec!["a", "b\nc"], vec!["d"]]);
    }

    #[tokio::test]
    async fn pending_reader() {
        let rdr = Drip { data: "x;ü\n€".as_bytes(), ready: false };
        let mut src = AsyncBufferedSource::with_capacity(2, rdr);
        let mut tok = Tokenizer::new(Dialect::default());
        let mut fields = vec![];
        while let Some(f) = read_field(&mut tok, &mut src).await.unwrap() {
            fields.push(f.to_string());
        }
        assert_eq!(fields, vec!["x", "ü", "€"]);
        assert_eq!(src.line(), 2);
    }

    #[tokio::test]
    async fn parse_error_converted() {
        let data: &[u8] = b"a\n\"b";
        let mut src = AsyncBufferedSource::new(data);
        let mut tok = Tokenizer::new(Dialect::default());
        assert_eq!(read_row(&mut tok, &mut src, |_, _| {}).await.unwrap(), 1);
        match read_row(&mut tok, &mut src, |_, _| {}).await {
            Err(Error::Parse(err)) => {
                assert_eq!(err.kind(), ParseErrorKind::UnterminatedQuote);
                assert_eq!(err.line(), 2);
            }
            r => panic!("expected parse error but got {:?}", r),
        }
    }

    #[tokio::test]
    async fn invalid_utf8() {
        let data: &[u8] = b"ok\n\xC3(";
        let mut src = AsyncBufferedSource::new(data);
        let mut tok = Tokenizer::new(Dialect::default());
        read_row(&mut tok, &mut src, |_, _| {}).await.unwrap();
        let err = read_row(&mut tok, &mut src, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, Error::Utf8 { line: 2 }));
    }

    #[derive(Debug, PartialEq)]
    enum RowError {
        Structure(u64),
        Io(std::io::ErrorKind),
    }

    impl From<Error> for RowError {
        fn from(err: Error) -> RowError {
            match err {
                Error::Io(err) => RowError::Io(err.kind()),
                err => RowError::Structure(err.line().unwrap_or(0)),
            }
        }
    }

    #[tokio::test]
    async fn parse_error_with_factory() {
        let data: &[u8] = b"x;y\nab\"c\n";
        let mut src = AsyncBufferedSource::new(data);
        let mut tok = Tokenizer::new(Dialect::default());
        let mut kinds = vec![];
        let mut on_error = |err: ParseError| {
            kinds.push(err.kind());
            RowError::Structure(err.line())
        };

        let n = read_row_with(&mut tok, &mut src, &mut on_error, |_, _| {})
            .await
            .unwrap();
        assert_eq!(n, 2);
        let err = read_row_with(&mut tok, &mut src, &mut on_error, |_, _| {})
            .await
            .unwrap_err();
        assert_eq!(err, RowError::Structure(2));
        assert_eq!(kinds, vec![ParseErrorKind::UnexpectedQuote]);
    }
}
