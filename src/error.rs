use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;

use dsv_core::ParseError;

use crate::convert::ConvertError;
#[cfg(feature = "serde")]
use crate::deserializer::DeserializeError;

/// A type alias for `Result<T, dsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing delimited data.
///
/// Every error is terminal for the operation that produced it. In
/// particular, a reader that returned a parse error should not be read from
/// again.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing data.
    Io(io::Error),
    /// The input was not valid UTF-8.
    Utf8 {
        /// The line on which the invalid sequence was found.
        line: u64,
    },
    /// The input is structurally malformed.
    Parse(ParseError),
    /// The caller passed an argument that cannot be used, for example a
    /// header row that names the same column twice.
    InvalidArgument(String),
    /// A lookup by column name, column index or converter type failed.
    NotFound(Lookup),
    /// A field could not be converted to or from a typed value.
    Convert(ConvertError),
    /// Two rows of a keyed table share the same key.
    DuplicateKey {
        /// The duplicated key.
        key: String,
        /// The line of the second row with this key.
        line: u64,
    },
    /// An asynchronous read was cancelled in the middle of a row. The
    /// reader's position within the stream is lost.
    Abandoned,
    /// A row could not be deserialized into the requested type.
    #[cfg(feature = "serde")]
    Deserialize {
        /// The line on which the row starts.
        line: u64,
        /// The underlying error.
        err: DeserializeError,
    },
    /// A value could not be serialized as a row.
    #[cfg(feature = "serde")]
    Serialize(String),
}

/// The subject of a failed lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Lookup {
    /// A column name.
    Column(String),
    /// A column index.
    Index(usize),
    /// The name of a type with no registered converter.
    Converter(&'static str),
}

impl Error {
    /// Returns the line associated with this error, if one is known.
    pub fn line(&self) -> Option<u64> {
        match *self {
            Error::Utf8 { line } => Some(line),
            Error::Parse(ref err) => Some(err.line()),
            Error::DuplicateKey { line, .. } => Some(line),
            #[cfg(feature = "serde")]
            Error::Deserialize { line, .. } => Some(line),
            _ => None,
        }
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// A copy of a failed read, so that a reader can report it again.
    ///
    /// I/O errors keep their kind and message but lose their source.
    pub(crate) fn duplicate(&self) -> Error {
        match *self {
            Error::Io(ref err) => {
                Error::Io(io::Error::new(err.kind(), err.to_string()))
            }
            Error::Utf8 { line } => Error::Utf8 { line },
            Error::Parse(err) => Error::Parse(err),
            Error::Abandoned => Error::Abandoned,
            ref err => Error::InvalidArgument(err.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<ConvertError> for Error {
    fn from(err: ConvertError) -> Error {
        Error::Convert(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Parse(ref err) => Some(err),
            Error::Convert(ref err) => Some(err),
            #[cfg(feature = "serde")]
            Error::Deserialize { ref err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Utf8 { line } => {
                write!(f, "line {}: invalid UTF-8 in input", line)
            }
            Error::Parse(ref err) => err.fmt(f),
            Error::InvalidArgument(ref msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Error::NotFound(ref what) => write!(f, "{}", what),
            Error::Convert(ref err) => err.fmt(f),
            Error::DuplicateKey { ref key, line } => {
                write!(f, "line {}: duplicate key {:?}", line, key)
            }
            Error::Abandoned => write!(
                f,
                "reader was abandoned in the middle of a row and can no \
                 longer be used"
            ),
            #[cfg(feature = "serde")]
            Error::Deserialize { line, ref err } => {
                write!(f, "line {}: {}", line, err)
            }
            #[cfg(feature = "serde")]
            Error::Serialize(ref msg) => {
                write!(f, "serialization error: {}", msg)
            }
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Lookup::Column(ref name) => write!(f, "no column named {:?}", name),
            Lookup::Index(i) => write!(f, "no column at index {}", i),
            Lookup::Converter(ty) => {
                write!(f, "no converter registered for type {}", ty)
            }
        }
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails, then
/// this error is returned, which contains both the original `Writer` and
/// the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: io::Error,
}

impl<W> IntoInnerError<W> {
    pub(crate) fn new(wtr: W, err: io::Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    pub fn error(&self) -> &io::Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: std::any::Any> StdError for IntoInnerError<W> {}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}
