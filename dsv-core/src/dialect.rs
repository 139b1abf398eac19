use core::fmt;

/// The parameters that govern how fields are separated, quoted and commented.
///
/// A dialect is a small `Copy` value. A [`Tokenizer`](crate::Tokenizer) and a
/// [`LineBuilder`](crate::LineBuilder) each hold their own copy, so using the
/// same dialect for reading and writing is just a matter of passing the same
/// value to both.
///
/// No validation is performed when a dialect is used. Callers that want to
/// reject ambiguous configurations (for example, a separator equal to the
/// quote) can call [`Dialect::validate`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Dialect {
    /// The character that separates fields. The default is `;`.
    pub separator: char,
    /// The character used to quote fields. The default is `"`.
    pub quote: char,
    /// The character that starts a comment. The default is `#`.
    ///
    /// This is only recognized when `allow_comments` is enabled.
    pub comment: char,
    /// Whether comment lines are recognized. Disabled by default.
    pub allow_comments: bool,
    /// Whether every field, including an empty one, is quoted when writing.
    /// Disabled by default.
    pub force_quotes: bool,
    /// Whether the quote character is treated as ordinary data when reading.
    /// Disabled by default.
    pub ignore_quotes: bool,
    /// A hint that identical field values may be shared by readers that
    /// materialize many rows. Enabled by default. It never changes what is
    /// parsed.
    pub cache_values: bool,
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect {
            separator: ';',
            quote: '"',
            comment: '#',
            allow_comments: false,
            force_quotes: false,
            ignore_quotes: false,
            cache_values: true,
        }
    }
}

/// The category of a single input character under a particular dialect.
///
/// Categories are computed fresh for every character by
/// [`Dialect::classify`] and are never stored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Class {
    /// Any character not covered by another category.
    Ordinary(char),
    /// A whitespace character that is not a line break.
    Whitespace(char),
    /// The dialect's quote character (unless quotes are ignored).
    Quote,
    /// The dialect's separator.
    Separator,
    /// The dialect's comment marker (only when comments are allowed).
    Comment,
    /// `\n` or `\r`.
    LineBreak(char),
    /// The end of input.
    EndOfFile,
}

impl Dialect {
    /// Classify a character. `None` stands for the end of input.
    ///
    /// Categories are checked in priority order: end of input, line break,
    /// quote, separator, comment marker, whitespace and finally ordinary
    /// characters.
    #[inline]
    pub fn classify(&self, ch: Option<char>) -> Class {
        let c = match ch {
            None => return Class::EndOfFile,
            Some(c) => c,
        };
        if c == '\n' || c == '\r' {
            Class::LineBreak(c)
        } else if c == self.quote && !self.ignore_quotes {
            Class::Quote
        } else if c == self.separator {
            Class::Separator
        } else if c == self.comment && self.allow_comments {
            Class::Comment
        } else if c.is_whitespace() {
            Class::Whitespace(c)
        } else {
            Class::Ordinary(c)
        }
    }

    /// Check that this dialect is unambiguous.
    ///
    /// The separator, the quote and (when comments are allowed) the comment
    /// marker must be pairwise distinct, and none of them may be a line
    /// break.
    pub fn validate(&self) -> Result<(), DialectError> {
        for &c in &[self.separator, self.quote, self.comment] {
            if c == '\n' || c == '\r' {
                return Err(DialectError::LineBreak(c));
            }
        }
        if self.separator == self.quote {
            return Err(DialectError::Conflict(self.separator));
        }
        if self.allow_comments
            && (self.comment == self.separator || self.comment == self.quote)
        {
            return Err(DialectError::Conflict(self.comment));
        }
        Ok(())
    }
}

/// An error describing why a dialect is ambiguous.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DialectError {
    /// The same character was given two different roles.
    Conflict(char),
    /// A line break was given a role.
    LineBreak(char),
}

impl fmt::Display for DialectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DialectError::Conflict(c) => {
                write!(f, "character {:?} is used for more than one role", c)
            }
            DialectError::LineBreak(c) => {
                write!(f, "line break {:?} cannot be a dialect character", c)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DialectError {}
