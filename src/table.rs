/*!
Rows addressed by column name.

A [`TableReader`] reads the header row once and yields [`Row`]s that share
it. Fields can then be looked up by name and converted to typed values with a
[`Converters`] registry. A [`TableWriter`] does the opposite: it writes the
header row once and lays out every row in header order. A [`Dictionary`]
indexes rows by the value of a key column.

Rows may be shorter than the header row. Missing trailing columns read as
empty fields.

```
use dsv::convert::Converters;
use dsv::table::TableReader;

let data = "Id;Name;Score\n1;ann;2.5\n2;bob\n";
let mut rdr = TableReader::from_reader(data.as_bytes()).unwrap();
let convs = Converters::with_defaults();

let rows: Vec<_> = rdr.rows().collect::<Result<_, _>>().unwrap();
assert_eq!(rows[0].get("Name").unwrap(), "ann");
assert_eq!(rows[0].parse::<f64>("Score", &convs).unwrap(), 2.5);
assert_eq!(rows[1].parse_opt::<f64>("Score", &convs).unwrap(), None);
```
*/

use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use crate::convert::Converters;
use crate::error::{Error, Lookup, Result};
use crate::headers::Headers;
use crate::reader::{Reader, ReaderBuilder};
use crate::string_record::StringRecord;
use crate::writer::Writer;

/// A record paired with the header row it was read under.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    headers: Arc<Headers>,
    record: StringRecord,
}

impl Row {
    /// Pair a record with a header row.
    pub fn new(headers: Arc<Headers>, record: StringRecord) -> Row {
        Row { headers, record }
    }

    /// The header row of this row.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The field in the column with the given name.
    ///
    /// An unknown column is an [`Error::NotFound`].
    pub fn get(&self, name: &str) -> Result<&str> {
        let i = self.headers.require(name)?;
        Ok(self.record.get(i).unwrap_or(""))
    }

    /// The field at index `i` of the underlying record.
    pub fn get_index(&self, i: usize) -> Result<&str> {
        self.record.get(i).ok_or(Error::NotFound(Lookup::Index(i)))
    }

    /// Parse the field in the named column as a `T`.
    pub fn parse<T: 'static>(&self, name: &str, convs: &Converters) -> Result<T> {
        convs.parse(self.get(name)?)
    }

    /// Like [`Row::parse`], but an empty field is `None`.
    pub fn parse_opt<T: 'static>(
        &self,
        name: &str,
        convs: &Converters,
    ) -> Result<Option<T>> {
        let field = self.get(name)?;
        if field.is_empty() {
            Ok(None)
        } else {
            convs.parse(field).map(Some)
        }
    }

    /// The line on which this row starts, if it was read from input.
    pub fn line(&self) -> Option<u64> {
        self.record.line()
    }

    /// The underlying record.
    pub fn record(&self) -> &StringRecord {
        &self.record
    }

    /// Unwrap the underlying record.
    pub fn into_record(self) -> StringRecord {
        self.record
    }

    /// Iterate over `(column name, field)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.headers
            .iter()
            .enumerate()
            .map(move |(i, name)| (name, self.record.get(i).unwrap_or("")))
    }

    /// Returns true if both rows hold the same field under every column
    /// name, regardless of column order.
    pub fn same_values(&self, other: &Row) -> bool {
        self.headers.len() == other.headers.len()
            && self
                .iter()
                .all(|(name, field)| other.get(name).ok() == Some(field))
    }
}

/// A reader that yields rows addressed by column name.
#[derive(Debug)]
pub struct TableReader<R> {
    rdr: Reader<R>,
    headers: Arc<Headers>,
}

impl<R: io::Read> TableReader<R> {
    /// Wrap a reader configured with a header row.
    ///
    /// The header row is read immediately. A reader without a header row is
    /// an [`Error::InvalidArgument`], and so is a header row that names a
    /// column twice.
    pub fn new(mut rdr: Reader<R>) -> Result<TableReader<R>> {
        if !rdr.has_headers() {
            return Err(Error::InvalidArgument(
                "a table reader requires a header row".to_string(),
            ));
        }
        let headers = Arc::new(Headers::from_record(rdr.headers()?)?);
        Ok(TableReader { rdr, headers })
    }

    /// Read a table with the default dialect.
    pub fn from_reader(rdr: R) -> Result<TableReader<R>> {
        TableReader::new(ReaderBuilder::new().has_headers(true).from_reader(rdr))
    }

    /// The header row.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Read the next row. Returns `None` once the input is exhausted.
    pub fn read_row(&mut self) -> Result<Option<Row>> {
        let mut record = StringRecord::new();
        if !self.rdr.read_record(&mut record)? {
            return Ok(None);
        }
        Ok(Some(Row::new(Arc::clone(&self.headers), record)))
    }

    /// Returns a borrowed iterator over all rows.
    pub fn rows(&mut self) -> RowsIter<'_, R> {
        RowsIter { rdr: self, done: false }
    }

    /// Unwrap the underlying reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

/// A borrowed iterator over the rows of a [`TableReader`].
///
/// The iterator stops after the first error.
pub struct RowsIter<'r, R> {
    rdr: &'r mut TableReader<R>,
    done: bool,
}

impl<'r, R: io::Read> Iterator for RowsIter<'r, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        if self.done {
            return None;
        }
        match self.rdr.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
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

/// A value that can be written as a field through a [`Converters`]
/// registry.
pub trait ToField {
    /// Format this value with the converter registered for its type.
    fn to_field(&self, convs: &Converters) -> Result<String>;
}

impl<T: Any> ToField for T {
    fn to_field(&self, convs: &Converters) -> Result<String> {
        convs.format(self)
    }
}

/// A writer that lays out rows in the order of a fixed header row.
///
/// The header row is written before the first row, or by
/// [`TableWriter::write_header`].
///
/// ```
/// use dsv::convert::Converters;
/// use dsv::table::TableWriter;
/// use dsv::{Headers, Writer};
///
/// let headers = Headers::new(vec!["Id", "Price"]).unwrap();
/// let mut wtr = TableWriter::new(Writer::from_writer(vec![]), headers);
/// let convs = Converters::with_defaults();
/// wtr.write_values(&convs, &[&7u32, &9.5f64]).unwrap();
///
/// let data = wtr.into_inner().into_inner().unwrap();
/// assert_eq!(String::from_utf8(data).unwrap(), "Id;Price\n7;9.5\n");
/// ```
#[derive(Debug)]
pub struct TableWriter<W: io::Write> {
    wtr: Writer<W>,
    headers: Headers,
    wrote_header: bool,
}

impl<W: io::Write> TableWriter<W> {
    /// Wrap a writer. Nothing is written yet.
    pub fn new(wtr: Writer<W>, headers: Headers) -> TableWriter<W> {
        TableWriter { wtr, headers, wrote_header: false }
    }

    /// Write to `wtr` with the default dialect.
    pub fn from_writer(wtr: W, headers: Headers) -> TableWriter<W> {
        TableWriter::new(Writer::from_writer(wtr), headers)
    }

    /// The header row.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Write the header row, unless it was already written.
    pub fn write_header(&mut self) -> Result<()> {
        if !self.wrote_header {
            self.wtr.write_record(self.headers.as_record())?;
            self.wrote_header = true;
        }
        Ok(())
    }

    /// Write a record whose fields are already in header order.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.write_header()?;
        self.wtr.write_record(record)
    }

    /// Write a row, taking each field from the column of the same name.
    ///
    /// A column of this writer that the row does not have is an
    /// [`Error::NotFound`]. Columns of the row that this writer does not have
    /// are dropped.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        let fields = self
            .headers
            .iter()
            .map(|name| row.get(name))
            .collect::<Result<Vec<&str>>>()?;
        self.write_record(fields)
    }

    /// Format typed values with `convs` and write them as a record.
    pub fn write_values(
        &mut self,
        convs: &Converters,
        values: &[&dyn ToField],
    ) -> Result<()> {
        let fields = values
            .iter()
            .map(|v| (**v).to_field(convs))
            .collect::<Result<Vec<String>>>()?;
        self.write_record(fields)
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.wtr.flush()?)
    }

    /// Unwrap the underlying writer without flushing it.
    pub fn into_inner(self) -> Writer<W> {
        self.wtr
    }
}

/// Rows indexed by the value of a key column, in insertion order.
#[derive(Clone, Debug)]
pub struct Dictionary {
    key: String,
    rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl Dictionary {
    /// Create an empty dictionary keyed on the column named `key`.
    ///
    /// An empty column name is an [`Error::InvalidArgument`].
    pub fn new(key: &str) -> Result<Dictionary> {
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "the key column name is empty".to_string(),
            ));
        }
        Ok(Dictionary {
            key: key.to_string(),
            rows: vec![],
            index: HashMap::new(),
        })
    }

    /// Read every row of a table into a dictionary keyed on `key`.
    ///
    /// The key column must exist in the header row even if the table has
    /// no rows.
    ///
    /// ```
    /// use dsv::table::{Dictionary, TableReader};
    ///
    /// let data = "Id;Name\n1;ann\n2;bob\n";
    /// let mut rdr = TableReader::from_reader(data.as_bytes()).unwrap();
    /// let dict = Dictionary::from_table(&mut rdr, "Id").unwrap();
    /// assert_eq!(dict.get("2").unwrap().get("Name").unwrap(), "bob");
    /// assert!(Dictionary::from_table(&mut rdr, "Missing").is_err());
    /// ```
    pub fn from_table<R: io::Read>(
        rdr: &mut TableReader<R>,
        key: &str,
    ) -> Result<Dictionary> {
        let mut dict = Dictionary::new(key)?;
        rdr.headers().require(key)?;
        for row in rdr.rows() {
            dict.insert(row?)?;
        }
        Ok(dict)
    }

    /// The name of the key column.
    pub fn key_column(&self) -> &str {
        &self.key
    }

    /// Add a row.
    ///
    /// A row whose key is already present is an [`Error::DuplicateKey`], and
    /// a row without the key column is an [`Error::NotFound`].
    pub fn insert(&mut self, row: Row) -> Result<()> {
        let key = row.get(&self.key)?;
        if self.index.contains_key(key) {
            return Err(Error::DuplicateKey {
                key: key.to_string(),
                line: row.line().unwrap_or(0),
            });
        }
        self.index.insert(key.to_string(), self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    /// The row with the given key.
    pub fn get(&self, key: &str) -> Option<&Row> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Returns true if a row with the given key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the rows in insertion order.
    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Iterate over `(key, row)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Row)> + '_ {
        self.rows.iter().map(move |row| {
            // Every stored row has the key column.
            (row.get(&self.key).unwrap_or(""), row)
        })
    }
}
