/*!
The `dsv` crate reads and writes delimiter-separated values: rows of fields
split by a separator character, with optional quoting and comments.

The default dialect uses `;` as the separator, `"` as the quote and `#` as
the comment marker (comments are disabled unless asked for). Every character
is configurable through [`ReaderBuilder`] and [`WriterBuilder`].

Parsing is strict. Blank lines are skipped, quoted fields may span lines and
contain doubled quotes, and malformed quoting is reported as an
[`Error::Parse`] that carries the line on which it was found. Writing quotes
a field only when it needs it, unless quotes are forced.

# Overview

* [`Reader`] and [`Writer`] stream records over `io::Read` and `io::Write`.
  With the default `serde` feature, records can be deserialized into and
  serialized from your own types.
* [`table`] addresses fields by column name, and [`convert`] parses and
  formats typed fields through an explicit registry of converters.
* [`diff`] compares two tables keyed on a column.
* With the `async` feature, `AsyncReader` and `AsyncWriter` do the same over
  `tokio`'s `AsyncRead` and `AsyncWrite`.
* The tokenizer and line builder live in the `dsv-core` crate and are
  re-exported here.

# Example: reading

```
use dsv::ReaderBuilder;

let data = "\
# cities
city;pop
Boston;4628910

\"Concord; MA\";42695
";
let mut rdr = ReaderBuilder::new()
    .allow_comments(true)
    .has_headers(true)
    .from_reader(data.as_bytes());
assert_eq!(rdr.headers().unwrap(), &vec!["city", "pop"]);

let mut cities = vec![];
for result in rdr.records() {
    let record = result.unwrap();
    cities.push(record[0].to_string());
}
assert_eq!(cities, vec!["Boston", "Concord; MA"]);
```

# Example: writing

```
let mut wtr = dsv::Writer::from_writer(vec![]);
wtr.write_record(&["a", "b;c", "say \"hi\""]).unwrap();

let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
assert_eq!(data, "a;\"b;c\";\"say \"\"hi\"\"\"\n");
```
*/

#![deny(missing_docs)]

pub use dsv_core::{
    decode_line, encode_row, CharSource, Class, Dialect, DialectError,
    LineBuilder, Outcome, ParseError, ParseErrorKind, State, StrSource,
    Tokenizer,
};

#[cfg(feature = "async")]
pub use crate::async_reader::AsyncReader;
#[cfg(feature = "async")]
pub use crate::async_source::{AsyncBufferedSource, AsyncCharSource};
#[cfg(feature = "async")]
pub use crate::async_writer::AsyncWriter;
#[cfg(feature = "serde")]
pub use crate::deserializer::{DeserializeError, DeserializeErrorKind};
pub use crate::error::{Error, IntoInnerError, Lookup, Result};
pub use crate::headers::Headers;
#[cfg(feature = "serde")]
pub use crate::reader::DeserializeRecordsIter;
pub use crate::reader::{
    Reader, ReaderBuilder, StringRecordsIntoIter, StringRecordsIter,
};
pub use crate::source::BufferedSource;
pub use crate::string_record::{StringRecord, StringRecordIter};
pub use crate::writer::{Terminator, Writer, WriterBuilder};

#[cfg(feature = "async")]
mod async_reader;
#[cfg(feature = "async")]
pub mod async_source;
#[cfg(feature = "async")]
mod async_writer;
pub mod convert;
#[cfg(feature = "serde")]
mod deserializer;
pub mod diff;
mod error;
mod headers;
mod reader;
#[cfg(feature = "serde")]
mod serializer;
mod source;
mod string_record;
pub mod table;
mod writer;
