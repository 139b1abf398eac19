use std::fs::File;
use std::io;
#[cfg(feature = "serde")]
use std::marker::PhantomData;
use std::path::Path;

use dsv_core::{Dialect, Tokenizer};
#[cfg(feature = "serde")]
use serde::de::DeserializeOwned;

#[cfg(feature = "async")]
use crate::async_reader::AsyncReader;
use crate::error::{Error, Result};
use crate::source::{BufferedSource, DEFAULT_BUFFER_CAPACITY};
use crate::string_record::StringRecord;

/// Builds a reader with various configuration knobs.
///
/// This builder can be used to tweak the dialect, whether the first row is
/// a header row and the size of the read buffer. Once a reader is built,
/// its configuration cannot be changed.
#[derive(Debug)]
pub struct ReaderBuilder {
    dialect: Dialect,
    has_headers: bool,
    capacity: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            dialect: Dialect::default(),
            has_headers: false,
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring reader parsing.
    ///
    /// # Example
    ///
    /// ```
    /// use dsv::{ReaderBuilder, StringRecord};
    ///
    /// let data = "\
    /// city;country;pop
    /// Boston;United States;4628910
    /// ";
    /// let mut rdr = ReaderBuilder::new()
    ///     .has_headers(true)
    ///     .from_reader(data.as_bytes());
    ///
    /// let records = rdr
    ///     .records()
    ///     .collect::<Result<Vec<StringRecord>, dsv::Error>>()
    ///     .unwrap();
    /// assert_eq!(records, vec![vec!["Boston", "United States", "4628910"]]);
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a reader from this configuration that reads data from `rdr`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr)
    }

    /// Build a reader from this configuration that reads data from the
    /// file at the given path.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        Ok(Reader::new(self, File::open(path)?))
    }

    /// Build an asynchronous reader from this configuration that reads data
    /// from `rdr`.
    #[cfg(feature = "async")]
    pub fn from_async_reader<R>(&self, rdr: R) -> AsyncReader<R>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        AsyncReader::new(self.dialect, self.has_headers, self.capacity, rdr)
    }

    /// Replace the whole dialect at once.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut ReaderBuilder {
        self.dialect = dialect;
        self
    }

    /// The field separator to use when parsing.
    ///
    /// The default is `;`.
    pub fn separator(&mut self, separator: char) -> &mut ReaderBuilder {
        self.dialect.separator = separator;
        self
    }

    /// The quote character to use when parsing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut ReaderBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The comment marker to use when comments are allowed.
    ///
    /// The default is `#`.
    pub fn comment(&mut self, comment: char) -> &mut ReaderBuilder {
        self.dialect.comment = comment;
        self
    }

    /// Whether a comment marker at the start of a field starts a comment
    /// running to the end of the line.
    ///
    /// This is disabled by default.
    pub fn allow_comments(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.dialect.allow_comments = yes;
        self
    }

    /// Whether quotes are treated as ordinary characters.
    ///
    /// This is disabled by default.
    pub fn ignore_quotes(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.dialect.ignore_quotes = yes;
        self
    }

    /// Whether the first row is treated as a header row.
    ///
    /// When enabled, the first row is returned by [`Reader::headers`] and is
    /// never yielded as a record. When disabled, [`Reader::headers`] still
    /// returns the first row, which is also yielded as a record.
    ///
    /// This is disabled by default.
    pub fn has_headers(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the size of the block read from the underlying reader at a time.
    ///
    /// The default is 1024 bytes.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }
}

/// A reader of delimited data.
///
/// The reader decodes UTF-8 from any `io::Read` and parses it with a strict
/// tokenizer: blank lines are skipped, quoted fields may span lines and
/// malformed quoting is reported as [`Error::Parse`](crate::Error::Parse)
/// carrying the line on which it was found.
///
/// Rows may have any number of fields. No check is made that every row has
/// the same length.
///
/// # Example
///
/// ```
/// let data = "a;\"b;c\";d\n\n1;2;3\n";
/// let mut rdr = dsv::Reader::from_reader(data.as_bytes());
/// let mut rows = vec![];
/// for result in rdr.records() {
///     let record = result.unwrap();
///     rows.push(record.iter().map(|f| f.to_string()).collect::<Vec<_>>());
/// }
/// assert_eq!(rows, vec![vec!["a", "b;c", "d"], vec!["1", "2", "3"]]);
/// ```
#[derive(Debug)]
pub struct Reader<R> {
    tok: Tokenizer,
    src: BufferedSource<R>,
    state: ReaderState,
}

#[derive(Debug)]
struct ReaderState {
    /// When set, the first row is not yielded as a record.
    has_headers: bool,
    /// The first row, once it has been read.
    headers: Option<StringRecord>,
    /// The first row, kept for the next read when it is also a record.
    first: Option<StringRecord>,
    /// Why the first row could not be read. Reported on every later read.
    header_err: Option<Error>,
    /// Whether the end of input has been reached.
    eof: bool,
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, rdr: R) -> Reader<R> {
        Reader {
            tok: Tokenizer::new(builder.dialect),
            src: BufferedSource::with_capacity(builder.capacity, rdr),
            state: ReaderState {
                has_headers: builder.has_headers,
                headers: None,
                first: None,
                header_err: None,
                eof: false,
            },
        }
    }

    /// Create a new reader with the default configuration.
    ///
    /// To customize parsing, use [`ReaderBuilder`].
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Returns a borrowed iterator over all records as strings.
    ///
    /// Each item yielded by this iterator is a `Result<StringRecord,
    /// Error>`. The iterator stops after the first error.
    pub fn records(&mut self) -> StringRecordsIter<R> {
        StringRecordsIter { rdr: self, rec: StringRecord::new(), done: false }
    }

    /// Returns an owned iterator over all records as strings.
    pub fn into_records(self) -> StringRecordsIntoIter<R> {
        StringRecordsIntoIter {
            rdr: self,
            rec: StringRecord::new(),
            done: false,
        }
    }

    /// Returns a borrowed iterator over deserialized records.
    ///
    /// When the reader has headers, structs and maps are filled by column
    /// name. Otherwise fields are consumed in order.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Deserialize;
    ///
    /// #[derive(Debug, Deserialize, PartialEq)]
    /// struct Row {
    ///     id: u32,
    ///     name: String,
    ///     score: Option<f64>,
    /// }
    ///
    /// let data = "name;id;score\nann;1;2.5\nbob;2;\n";
    /// let mut rdr = dsv::ReaderBuilder::new()
    ///     .has_headers(true)
    ///     .from_reader(data.as_bytes());
    /// let rows: Vec<Row> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
    /// assert_eq!(rows[0], Row { id: 1, name: "ann".into(), score: Some(2.5) });
    /// assert_eq!(rows[1], Row { id: 2, name: "bob".into(), score: None });
    /// ```
    #[cfg(feature = "serde")]
    pub fn deserialize<D>(&mut self) -> DeserializeRecordsIter<R, D>
    where
        D: DeserializeOwned,
    {
        DeserializeRecordsIter::new(self)
    }

    /// Returns the first row.
    ///
    /// If no row has been read yet, the first row is read now. If the input
    /// is empty, an empty record is returned.
    ///
    /// When the reader was not configured with headers, the first row is
    /// still yielded as the first record.
    ///
    /// If the first row cannot be read, the same error is returned by every
    /// later call.
    pub fn headers(&mut self) -> Result<&StringRecord> {
        if let Some(ref err) = self.state.header_err {
            return Err(err.duplicate());
        }
        if self.state.headers.is_none() {
            let mut record = StringRecord::new();
            if let Err(err) = self.read_row(&mut record) {
                self.state.header_err = Some(err.duplicate());
                return Err(err);
            }
            if !self.state.has_headers && !record.is_empty() {
                self.state.first = Some(record.clone());
            }
            self.state.headers = Some(record);
        }
        // Set just above when absent.
        Ok(self.state.headers.get_or_insert_with(StringRecord::new))
    }

    /// Returns true if the first row is treated as a header row.
    pub fn has_headers(&self) -> bool {
        self.state.has_headers
    }

    /// Read a single row into the given record.
    ///
    /// Returns false when no more records could be read. The record is
    /// cleared first, and carries the line on which the row starts.
    ///
    /// # Example
    ///
    /// ```
    /// use dsv::StringRecord;
    ///
    /// let mut rdr = dsv::Reader::from_reader("x;y\n\nz".as_bytes());
    /// let mut record = StringRecord::new();
    /// assert!(rdr.read_record(&mut record).unwrap());
    /// assert_eq!(record, vec!["x", "y"]);
    /// assert!(rdr.read_record(&mut record).unwrap());
    /// assert_eq!(record, vec!["z"]);
    /// assert_eq!(record.line(), Some(3));
    /// assert!(!rdr.read_record(&mut record).unwrap());
    /// ```
    pub fn read_record(&mut self, record: &mut StringRecord) -> Result<bool> {
        if self.state.headers.is_none() {
            self.headers()?;
        }
        if let Some(first) = self.state.first.take() {
            *record = first;
            return Ok(true);
        }
        self.read_row(record)
    }

    fn read_row(&mut self, record: &mut StringRecord) -> Result<bool> {
        record.clear();
        if self.state.eof {
            return Ok(false);
        }
        let n = self
            .tok
            .read_row(&mut self.src, |_, field| record.push_field(field))?;
        if n == 0 {
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

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        self.src.get_mut()
    }

    /// Unwraps this reader, returning the underlying reader.
    ///
    /// Note that any leftover data inside this reader's internal buffer is
    /// lost.
    pub fn into_inner(self) -> R {
        self.src.into_inner()
    }
}

impl Reader<File> {
    /// Create a new reader with the default configuration that reads from
    /// the file at the given path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

/// A borrowed iterator over records as strings.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying
/// reader.
pub struct StringRecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    rec: StringRecord,
    done: bool,
}

impl<'r, R: io::Read> StringRecordsIter<'r, R> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        self.rdr
    }
}

impl<'r, R: io::Read> Iterator for StringRecordsIter<'r, R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Result<StringRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record(&mut self.rec) {
            Ok(true) => Some(Ok(self.rec.clone())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// An owned iterator over records as strings.
pub struct StringRecordsIntoIter<R> {
    rdr: Reader<R>,
    rec: StringRecord,
    done: bool,
}

impl<R: io::Read> StringRecordsIntoIter<R> {
    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for StringRecordsIntoIter<R> {
    type Item = Result<StringRecord>;

    fn next(&mut self) -> Option<Result<StringRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record(&mut self.rec) {
            Ok(true) => Some(Ok(self.rec.clone())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// A borrowed iterator over deserialized records.
///
/// The type parameter `D` refers to the type that each record is
/// deserialized into.
#[cfg(feature = "serde")]
pub struct DeserializeRecordsIter<'r, R: 'r, D> {
    rdr: &'r mut Reader<R>,
    rec: StringRecord,
    headers: Option<StringRecord>,
    /// A failure to read the header row, yielded before anything else.
    header_err: Option<Error>,
    done: bool,
    _priv: PhantomData<D>,
}

#[cfg(feature = "serde")]
impl<'r, R: io::Read, D: DeserializeOwned> DeserializeRecordsIter<'r, R, D> {
    fn new(rdr: &'r mut Reader<R>) -> DeserializeRecordsIter<'r, R, D> {
        let (headers, header_err) = if !rdr.state.has_headers {
            (None, None)
        } else {
            match rdr.headers() {
                Ok(headers) => (Some(headers.clone()), None),
                Err(err) => (None, Some(err)),
            }
        };
        DeserializeRecordsIter {
            rdr,
            rec: StringRecord::new(),
            headers,
            header_err,
            done: false,
            _priv: PhantomData,
        }
    }

    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        self.rdr
    }
}

#[cfg(feature = "serde")]
impl<'r, R: io::Read, D: DeserializeOwned> Iterator
    for DeserializeRecordsIter<'r, R, D>
{
    type Item = Result<D>;

    fn next(&mut self) -> Option<Result<D>> {
        if self.done {
            return None;
        }
        if let Some(err) = self.header_err.take() {
            self.done = true;
            return Some(Err(err));
        }
        match self.rdr.read_record(&mut self.rec) {
            Ok(true) => Some(self.rec.deserialize(self.headers.as_ref())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
