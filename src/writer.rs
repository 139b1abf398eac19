use std::fs::File;
use std::io;
use std::path::Path;

use dsv_core::{Dialect, LineBuilder};
#[cfg(feature = "serde")]
use serde::Serialize;

#[cfg(feature = "async")]
use crate::async_writer::AsyncWriter;
use crate::error::{IntoInnerError, Result};
#[cfg(feature = "serde")]
use crate::serializer::{serialize, serialize_header};

/// The default number of bytes buffered before the writer flushes.
pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 8 * (1 << 10);

/// A record terminator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Terminator {
    /// `\r\n`
    CRLF,
    /// `\n`
    LF,
    /// `\r`
    CR,
}

impl Default for Terminator {
    fn default() -> Terminator {
        Terminator::LF
    }
}

impl Terminator {
    /// The terminator as text.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Terminator::CRLF => "\r\n",
            Terminator::LF => "\n",
            Terminator::CR => "\r",
        }
    }
}

/// Builds a writer with various configuration knobs.
///
/// This builder can be used to tweak the dialect, the record terminator and
/// the buffer size. Once a writer is built, its configuration cannot be
/// changed.
#[derive(Debug)]
pub struct WriterBuilder {
    dialect: Dialect,
    terminator: Terminator,
    has_headers: bool,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            dialect: Dialect::default(),
            terminator: Terminator::default(),
            has_headers: true,
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring writers.
    ///
    /// # Example
    ///
    /// ```
    /// use dsv::{Terminator, WriterBuilder};
    ///
    /// let mut wtr = WriterBuilder::new()
    ///     .separator(',')
    ///     .terminator(Terminator::CRLF)
    ///     .from_writer(vec![]);
    /// wtr.write_record(&["a", "b,c"]).unwrap();
    ///
    /// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "a,\"b,c\"\r\n");
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a writer from this configuration that writes data to `wtr`.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a writer from this configuration that writes data to the file
    /// at the given path. The file is truncated if it already exists.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        Ok(Writer::new(self, File::create(path)?))
    }

    /// Build an asynchronous writer from this configuration that writes
    /// data to `wtr`.
    ///
    /// The header setting does not apply, since asynchronous writers do not
    /// serialize.
    #[cfg(feature = "async")]
    pub fn from_async_writer<W>(&self, wtr: W) -> AsyncWriter<W>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        AsyncWriter::new(self.dialect, self.terminator, self.capacity, wtr)
    }

    /// Replace the whole dialect at once.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut WriterBuilder {
        self.dialect = dialect;
        self
    }

    /// The field separator to use when writing.
    ///
    /// The default is `;`.
    pub fn separator(&mut self, separator: char) -> &mut WriterBuilder {
        self.dialect.separator = separator;
        self
    }

    /// The quote character to use when writing.
    ///
    /// The default is `"`.
    pub fn quote(&mut self, quote: char) -> &mut WriterBuilder {
        self.dialect.quote = quote;
        self
    }

    /// The comment marker. When comments are allowed, fields starting with
    /// it are quoted so that they are not read back as comments.
    ///
    /// The default is `#`.
    pub fn comment(&mut self, comment: char) -> &mut WriterBuilder {
        self.dialect.comment = comment;
        self
    }

    /// Whether the data will be read by a reader that allows comments.
    ///
    /// This is disabled by default.
    pub fn allow_comments(&mut self, yes: bool) -> &mut WriterBuilder {
        self.dialect.allow_comments = yes;
        self
    }

    /// Whether every field is quoted, including empty and missing ones.
    ///
    /// This is disabled by default.
    pub fn force_quotes(&mut self, yes: bool) -> &mut WriterBuilder {
        self.dialect.force_quotes = yes;
        self
    }

    /// The record terminator to use when writing.
    ///
    /// The default is `\n`.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.terminator = term;
        self
    }

    /// Whether [`Writer::serialize`] writes a header row, derived from the
    /// field names of the first struct serialized.
    ///
    /// Rows written with [`Writer::write_record`] are never affected.
    ///
    /// This is enabled by default.
    pub fn has_headers(&mut self, yes: bool) -> &mut WriterBuilder {
        self.has_headers = yes;
        self
    }

    /// Set the number of bytes buffered before they are written to the
    /// underlying writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A writer of delimited data.
///
/// Fields are quoted only when necessary, unless the dialect forces quotes.
/// A record with a single empty field is always written as two quotes, since
/// a blank line would be skipped when reading it back.
///
/// Output is buffered. The buffer is flushed when the writer is dropped,
/// but errors that happen then are ignored. Call [`Writer::flush`] or
/// [`Writer::into_inner`] to observe them.
///
/// # Example
///
/// ```
/// let mut wtr = dsv::Writer::from_writer(vec![]);
/// wtr.write_record(&["name", "quote"]).unwrap();
/// wtr.write_record(&["ann", "Say \"Hi\""]).unwrap();
/// wtr.write_record(&[""]).unwrap();
///
/// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "name;quote\nann;\"Say \"\"Hi\"\"\"\n\"\"\n");
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    wtr: Option<W>,
    buf: Vec<u8>,
    capacity: usize,
    line: LineBuilder,
    term: Terminator,
    state: WriterState,
}

#[derive(Debug)]
struct WriterState {
    header: HeaderState,
    /// Set while the underlying writer is in use, so that a panic in its
    /// `write` does not cause a second write from `Drop`.
    panicked: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HeaderState {
    /// The next call to `serialize` writes a header row first.
    Write,
    DidWrite,
    /// The first serialized value had no field names.
    DidNotWrite,
    /// Headers are disabled.
    None,
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() && !self.state.panicked {
            let _ = self.flush();
        }
    }
}

impl Writer<File> {
    /// Create a new writer with the default configuration that writes to
    /// the file at the given path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        let header = if builder.has_headers {
            HeaderState::Write
        } else {
            HeaderState::None
        };
        Writer {
            wtr: Some(wtr),
            buf: Vec::with_capacity(builder.capacity),
            capacity: builder.capacity,
            line: LineBuilder::new(builder.dialect),
            term: builder.terminator,
            state: WriterState { header, panicked: false },
        }
    }

    /// Create a new writer with the default configuration.
    ///
    /// To customize writing, use [`WriterBuilder`].
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// The dialect used by this writer.
    pub fn dialect(&self) -> &Dialect {
        self.line.dialect()
    }

    /// Write a single record.
    ///
    /// A record with no fields is written as an empty line.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for field in record {
            self.line.append(field.as_ref());
        }
        self.write_terminator()
    }

    /// Write a record in which `None` is a missing value.
    ///
    /// Missing values are written like empty ones.
    pub fn write_optional_record<'a, I>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        self.line.append_all(record);
        self.write_terminator()
    }

    /// Write a single field of the current record.
    ///
    /// The record is not finished until [`Writer::write_record`] with no
    /// fields or [`Writer::write_terminator`] is called.
    pub fn write_field<T: AsRef<str>>(&mut self, field: T) -> Result<()> {
        self.line.append(field.as_ref());
        Ok(())
    }

    /// Finish the current record.
    pub fn write_terminator(&mut self) -> Result<()> {
        finish_line(&mut self.line, self.term, &mut self.buf);
        if self.buf.len() >= self.capacity {
            self.flush_buf()?;
        }
        Ok(())
    }

    /// Serialize a single record using Serde.
    ///
    /// Structs, tuples and sequences are written as one row. When the
    /// writer has headers enabled and the first value serialized is a
    /// struct, a header row with its field names is written first.
    ///
    /// # Example
    ///
    /// ```
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// let mut wtr = dsv::Writer::from_writer(vec![]);
    /// wtr.serialize(Row { city: "Boston", population: Some(4628910) }).unwrap();
    /// wtr.serialize(Row { city: "Concord", population: None }).unwrap();
    ///
    /// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "city;population\nBoston;4628910\nConcord;\n");
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        if self.state.header == HeaderState::Write {
            let wrote = match serialize_header(self, &record) {
                Ok(wrote) => wrote,
                Err(err) => {
                    self.line.clear();
                    return Err(err);
                }
            };
            if wrote {
                self.write_terminator()?;
                self.state.header = HeaderState::DidWrite;
            } else {
                self.line.clear();
                self.state.header = HeaderState::DidNotWrite;
            }
        }
        if let Err(err) = serialize(self, &record) {
            self.line.clear();
            return Err(err);
        }
        self.write_terminator()
    }

    /// Flush the buffered records to the underlying writer, then flush the
    /// underlying writer.
    ///
    /// A record that is only partially written is kept.
    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        match self.wtr {
            Some(ref mut wtr) => wtr.flush(),
            None => Ok(()),
        }
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        let wtr = match self.wtr {
            Some(ref mut wtr) => wtr,
            None => return Ok(()),
        };
        self.state.panicked = true;
        let result = wtr.write_all(&self.buf);
        self.state.panicked = false;
        result?;
        self.buf.clear();
        Ok(())
    }

    /// Flush and unwrap this writer, returning the underlying writer.
    ///
    /// If flushing fails, the error is returned along with this writer.
    pub fn into_inner(
        mut self,
    ) -> std::result::Result<W, IntoInnerError<Writer<W>>> {
        match self.flush() {
            Ok(()) => match self.wtr.take() {
                Some(wtr) => Ok(wtr),
                None => {
                    let err = io::Error::new(
                        io::ErrorKind::Other,
                        "writer was already unwrapped",
                    );
                    Err(IntoInnerError::new(self, err))
                }
            },
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }
}

/// Move the line built so far into `buf`, followed by the terminator.
///
/// A line holding one empty field is written as two quotes.
pub(crate) fn finish_line(
    line: &mut LineBuilder,
    term: Terminator,
    buf: &mut Vec<u8>,
) {
    if line.has_field() && line.as_str().is_empty() {
        let quote = line.dialect().quote;
        push_char(buf, quote);
        push_char(buf, quote);
    } else {
        buf.extend_from_slice(line.as_str().as_bytes());
    }
    line.clear();
    buf.extend_from_slice(term.as_str().as_bytes());
}

fn push_char(buf: &mut Vec<u8>, ch: char) {
    let mut tmp = [0; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::error::Error;

    use super::{Terminator, Writer, WriterBuilder};

    fn wtr_as_string(wtr: Writer<Vec<u8>>) -> String {
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn one_record() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a", "b", "c"]).unwrap();

        assert_eq!(wtr_as_string(wtr), "a;b;c\n");
    }

    #[test]
    fn one_empty_record() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&[""]).unwrap();

        assert_eq!(wtr_as_string(wtr), "\"\"\n");
    }

    #[test]
    fn two_empty_fields() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["", ""]).unwrap();

        assert_eq!(wtr_as_string(wtr), ";\n");
    }

    #[test]
    fn no_fields() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(Vec::<String>::new()).unwrap();

        assert_eq!(wtr_as_string(wtr), "\n");
    }

    #[test]
    fn quoting() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(&["a;b", "c\nd", "\"", " e "]).unwrap();

        assert_eq!(wtr_as_string(wtr), "\"a;b\";\"c\nd\";\"\"\"\"; e \n");
    }

    #[test]
    fn missing_values() {
        let mut wtr = WriterBuilder::new().force_quotes(true).from_writer(vec![]);
        wtr.write_optional_record(vec![Some("1"), None, Some("")]).unwrap();

        assert_eq!(wtr_as_string(wtr), "\"1\";\"\";\"\"\n");
    }

    #[test]
    fn field_by_field() {
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(vec![]);
        wtr.write_field("a").unwrap();
        wtr.write_field(String::from("b")).unwrap();
        wtr.write_terminator().unwrap();
        wtr.write_field("").unwrap();
        wtr.write_terminator().unwrap();

        assert_eq!(wtr_as_string(wtr), "a;b\r\n\"\"\r\n");
    }

    #[test]
    fn comment_marker_quoted() {
        let mut wtr = WriterBuilder::new()
            .allow_comments(true)
            .comment('%')
            .from_writer(vec![]);
        wtr.write_record(&["%x", "y%"]).unwrap();

        assert_eq!(wtr_as_string(wtr), "\"%x\";y%\n");
    }

    #[test]
    fn small_buffer_flushes() {
        let mut wtr = WriterBuilder::new()
            .buffer_capacity(1)
            .terminator(Terminator::CR)
            .from_writer(vec![]);
        for i in 0..3 {
            wtr.write_record(&[i.to_string()]).unwrap();
        }

        assert_eq!(wtr_as_string(wtr), "0\r1\r2\r");
    }

    #[derive(Debug)]
    struct Failing;

    impl io::Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn into_inner_error() {
        let mut wtr = Writer::from_writer(Failing);
        wtr.write_record(&["a"]).unwrap();
        let err = wtr.into_inner().unwrap_err();
        assert_eq!(err.error().to_string(), "disk full");
    }

    #[test]
    fn write_error_is_io() {
        let mut wtr =
            WriterBuilder::new().buffer_capacity(1).from_writer(Failing);
        match wtr.write_record(&["a"]) {
            Err(Error::Io(ref err)) => assert_eq!(err.to_string(), "disk full"),
            r => panic!("expected I/O error but got {:?}", r),
        }
    }

    #[cfg(feature = "serde")]
    mod serde_records {
        use serde::Serialize;

        use super::super::{Writer, WriterBuilder};
        use super::wtr_as_string;

        #[derive(Serialize)]
        struct Row {
            id: u32,
            name: &'static str,
            score: Option<f64>,
        }

        #[test]
        fn header_written_once() {
            let mut wtr = Writer::from_writer(vec![]);
            wtr.serialize(Row { id: 1, name: "a;b", score: Some(1.5) })
                .unwrap();
            wtr.serialize(Row { id: 2, name: "c", score: None }).unwrap();

            assert_eq!(
                wtr_as_string(wtr),
                "id;name;score\n1;\"a;b\";1.5\n2;c;\n"
            );
        }

        #[test]
        fn no_header() {
            let mut wtr =
                WriterBuilder::new().has_headers(false).from_writer(vec![]);
            wtr.serialize(Row { id: 1, name: "x", score: None }).unwrap();

            assert_eq!(wtr_as_string(wtr), "1;x;\n");
        }

        #[test]
        fn tuples_have_no_header() {
            let mut wtr = Writer::from_writer(vec![]);
            wtr.serialize((1, "a")).unwrap();
            wtr.serialize((2, "b")).unwrap();

            assert_eq!(wtr_as_string(wtr), "1;a\n2;b\n");
        }

        #[test]
        fn unsupported_leaves_no_partial_row() {
            use std::collections::BTreeMap;

            let mut wtr = Writer::from_writer(vec![]);
            let mut map = BTreeMap::new();
            map.insert("k", 1);
            assert!(wtr.serialize(&map).is_err());
            wtr.serialize((1, 2)).unwrap();

            assert_eq!(wtr_as_string(wtr), "1;2\n");
        }
    }
}
