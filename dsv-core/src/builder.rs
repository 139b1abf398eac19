use alloc::string::String;

use crate::dialect::Dialect;

/// How a single field must be written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Quoting {
    /// Written as is.
    Verbatim,
    /// Surrounded by quotes.
    Wrap,
    /// Surrounded by quotes with every embedded quote doubled.
    Escape,
}

/// An encoder that accumulates one line of delimited text.
///
/// Fields are appended one at a time. Each field is quoted only when
/// necessary (or always, when the dialect forces quotes):
///
/// * a field containing a line break or the quote character is quoted and
///   its quotes are doubled,
/// * a field containing the separator, or starting with the comment marker
///   while comments are allowed, is quoted,
/// * a missing or empty field is written as nothing, or as `""` when quotes
///   are forced.
///
/// Once every field of a row has been appended, [`LineBuilder::materialize`]
/// hands out the line and readies the builder for the next row. Line
/// terminators are never written by the builder.
#[derive(Clone, Debug)]
pub struct LineBuilder {
    dialect: Dialect,
    line: String,
    has_field: bool,
}

impl Default for LineBuilder {
    fn default() -> LineBuilder {
        LineBuilder::new(Dialect::default())
    }
}

impl LineBuilder {
    /// Create a new builder for the given dialect.
    pub fn new(dialect: Dialect) -> LineBuilder {
        LineBuilder { dialect, line: String::new(), has_field: false }
    }

    /// The dialect used by this builder.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect.
    ///
    /// This should only be done when the builder is empty.
    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// Append a field. `None` is a missing value and is written like an
    /// empty field.
    pub fn append<'a, F: Into<Option<&'a str>>>(&mut self, field: F) {
        if self.has_field {
            self.line.push(self.dialect.separator);
        }
        self.has_field = true;

        let field = field.into().unwrap_or("");
        if field.is_empty() {
            if self.dialect.force_quotes {
                self.line.push(self.dialect.quote);
                self.line.push(self.dialect.quote);
            }
            return;
        }
        match quoting(&self.dialect, field) {
            Quoting::Verbatim => self.line.push_str(field),
            Quoting::Wrap => {
                self.line.push(self.dialect.quote);
                self.line.push_str(field);
                self.line.push(self.dialect.quote);
            }
            Quoting::Escape => {
                let quote = self.dialect.quote;
                self.line.push(quote);
                for (i, part) in field.split(quote).enumerate() {
                    if i > 0 {
                        self.line.push(quote);
                        self.line.push(quote);
                    }
                    self.line.push_str(part);
                }
                self.line.push(quote);
            }
        }
    }

    /// Append every field yielded by `fields`.
    pub fn append_all<'a, I, F>(&mut self, fields: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<Option<&'a str>>,
    {
        for field in fields {
            self.append(field);
        }
    }

    /// Whether at least one field has been appended since the last clear.
    pub fn has_field(&self) -> bool {
        self.has_field
    }

    /// The line built so far.
    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Discard the line built so far.
    pub fn clear(&mut self) {
        self.line.clear();
        self.has_field = false;
    }

    /// Return the line built so far and clear the builder.
    pub fn materialize(&mut self) -> String {
        let line = core::mem::take(&mut self.line);
        self.has_field = false;
        line
    }
}

/// Encode a single row.
///
/// This is a convenience for driving a [`LineBuilder`] over `fields`.
pub fn encode_row<'a, I, F>(dialect: &Dialect, fields: I) -> String
where
    I: IntoIterator<Item = F>,
    F: Into<Option<&'a str>>,
{
    let mut builder = LineBuilder::new(*dialect);
    builder.append_all(fields);
    builder.materialize()
}

fn quoting(dialect: &Dialect, field: &str) -> Quoting {
    if needs_escape(dialect.quote, field) {
        Quoting::Escape
    } else if dialect.force_quotes
        || field.contains(dialect.separator)
        || (dialect.allow_comments && field.starts_with(dialect.comment))
    {
        Quoting::Wrap
    } else {
        Quoting::Verbatim
    }
}

fn needs_escape(quote: char, field: &str) -> bool {
    if quote.is_ascii() {
        memchr::memchr3(b'\n', b'\r', quote as u8, field.as_bytes()).is_some()
    } else {
        field.contains(|c: char| c == '\n' || c == '\r' || c == quote)
    }
}
