use dsv_core::{Dialect, State, Tokenizer};
use tokio::io::AsyncRead;

use crate::async_source::{read_row, AsyncBufferedSource};
use crate::error::{Error, Result};
use crate::reader::ReaderBuilder;
use crate::string_record::StringRecord;

/// An asynchronous reader of delimited data.
///
/// This behaves like [`Reader`](crate::Reader), except that reads suspend
/// instead of blocking. Build one with
/// [`ReaderBuilder::from_async_reader`].
///
/// Dropping a read future before it completes is safe as long as it had not
/// started consuming a row. Otherwise the position within the stream is
/// lost, and every later read fails with [`Error::Abandoned`].
///
/// # Example
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use dsv::{AsyncReader, StringRecord};
///
/// let mut rdr = AsyncReader::from_reader("a;b\n\n\"c\nd\";e\n".as_bytes());
/// let mut record = StringRecord::new();
/// let mut rows = vec![];
/// while rdr.read_record(&mut record).await.unwrap() {
///     rows.push(record.clone());
/// }
/// assert_eq!(rows, vec![vec!["a", "b"], vec!["c\nd", "e"]]);
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncReader<R> {
    tok: Tokenizer,
    src: AsyncBufferedSource<R>,
    state: AsyncReaderState,
}

#[derive(Debug)]
struct AsyncReaderState {
    has_headers: bool,
    headers: Option<StringRecord>,
    first: Option<StringRecord>,
    header_err: Option<Error>,
    eof: bool,
    /// Set while a row is being read. Still set at the start of a read if
    /// the previous read future was dropped.
    in_row: bool,
}

impl<R: AsyncRead + Unpin> AsyncReader<R> {
    pub(crate) fn new(
        dialect: Dialect,
        has_headers: bool,
        capacity: usize,
        rdr: R,
    ) -> AsyncReader<R> {
        AsyncReader {
            tok: Tokenizer::new(dialect),
            src: AsyncBufferedSource::with_capacity(capacity, rdr),
            state: AsyncReaderState {
                has_headers,
                headers: None,
                first: None,
                header_err: None,
                eof: false,
                in_row: false,
            },
        }
    }

    /// Create a new asynchronous reader with the default configuration.
    pub fn from_reader(rdr: R) -> AsyncReader<R> {
        ReaderBuilder::new().from_async_reader(rdr)
    }

    /// Returns the first row, reading it if necessary.
    ///
    /// See [`Reader::headers`](crate::Reader::headers).
    pub async fn headers(&mut self) -> Result<&StringRecord> {
        if let Some(ref err) = self.state.header_err {
            return Err(err.duplicate());
        }
        if self.state.headers.is_none() {
            let mut record = StringRecord::new();
            if let Err(err) = self.read_row(&mut record).await {
                self.state.header_err = Some(err.duplicate());
                return Err(err);
            }
            if !self.state.has_headers && !record.is_empty() {
                self.state.first = Some(record.clone());
            }
            self.state.headers = Some(record);
        }
        Ok(self.state.headers.get_or_insert_with(StringRecord::new))
    }

    /// Returns true if the first row is treated as a header row.
    pub fn has_headers(&self) -> bool {
        self.state.has_headers
    }

    /// Read a single row into the given record.
    ///
    /// Returns false when no more records could be read.
    pub async fn read_record(
        &mut self,
        record: &mut StringRecord,
    ) -> Result<bool> {
        if self.state.headers.is_none() {
            self.headers().await?;
        }
        if let Some(first) = self.state.first.take() {
            *record = first;
            return Ok(true);
        }
        self.read_row(record).await
    }

    async fn read_row(&mut self, record: &mut StringRecord) -> Result<bool> {
        record.clear();
        if self.state.in_row && self.tok.state() != State::EndOfLine {
            return Err(Error::Abandoned);
        }
        if self.state.eof {
            return Ok(false);
        }
        self.state.in_row = true;
        let result = read_row(&mut self.tok, &mut self.src, |_, field| {
            record.push_field(field)
        })
        .await;
        self.state.in_row = false;
        if result? == 0 {
            self.state.eof = true;
            return Ok(false);
        }
        record.set_line(Some(self.tok.row_line()));
        Ok(true)
    }

    /// Returns true once the end of input has been reached.
    pub fn is_done(&self) -> bool {
        self.state.eof && self.state.first.is_none()
    }

    /// The current line of the underlying input.
    pub fn line(&self) -> u64 {
        self.tok.line()
    }

    /// The dialect used by this reader.
    pub fn dialect(&self) -> &Dialect {
        self.tok.dialect()
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        self.src.get_ref()
    }

    /// Unwraps this reader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.src.into_inner()
    }
}
