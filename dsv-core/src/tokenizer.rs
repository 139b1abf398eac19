use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::dialect::{Class, Dialect};
use crate::source::{CharSource, StrSource};

/// The state of a [`Tokenizer`].
///
/// Exactly one state is live at a time. Transitions are a pure function of
/// the current state and the [`Class`] of the next character.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// At the start of a field that follows a separator.
    SeekingStart,
    /// Inside a field that did not start with a quote.
    InPlain,
    /// Inside a quoted field.
    InQuoted,
    /// Just after a quote that may close a quoted field.
    AfterEndQuote,
    /// Skipping whitespace between a closing quote and the next separator.
    SkippingTail,
    /// Inside a comment.
    InComment,
    /// Just after the line break that ends a comment.
    AfterComment,
    /// At a row boundary. This is also the state of a fresh tokenizer.
    EndOfLine,
}

/// The outcome of feeding one character to a [`Tokenizer`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// More characters are needed before a field is available.
    Continue,
    /// A field is complete. Its text is available via
    /// [`Tokenizer::token`].
    ConsumeToken,
    /// No field is available and the current row has no more fields.
    IgnoreToken,
}

/// The kind of structural error found in the input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// A quote appeared inside a field that did not start with a quote.
    UnexpectedQuote,
    /// The input ended inside a quoted field.
    UnterminatedQuote,
    /// Something other than whitespace, a separator or a line break followed
    /// a closing quote.
    MissingSeparator,
}

impl ParseErrorKind {
    /// A short human readable description of this kind of error.
    pub fn message(&self) -> &'static str {
        match *self {
            ParseErrorKind::UnexpectedQuote => "quote missing at the beginning",
            ParseErrorKind::UnterminatedQuote => "quote missing at the end",
            ParseErrorKind::MissingSeparator => {
                "separator missing after quote"
            }
        }
    }
}

/// A structural error in delimited text.
///
/// These errors are never recovered from. The tokenizer that produced one
/// should be discarded or reset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseError {
    kind: ParseErrorKind,
    line: u64,
}

impl ParseError {
    /// Create a new parse error found on the given 1-based line.
    pub fn new(kind: ParseErrorKind, line: u64) -> ParseError {
        ParseError { kind, line }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// The 1-based line on which the error was found.
    pub fn line(&self) -> u64 {
        self.line
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind.message())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// A pull based tokenizer for delimited text.
///
/// The tokenizer consumes one character at a time and assembles fields in an
/// internal buffer. Characters are either pushed with [`Tokenizer::feed`] or
/// pulled from a [`CharSource`] with [`Tokenizer::read_field`] and
/// [`Tokenizer::read_row`].
///
/// # Format
///
/// * `\n`, `\r` and `\r\n` all end a row. Blank lines are skipped.
/// * A field may be quoted. Inside quotes, separators, comment markers and
///   line breaks are data, and a doubled quote stands for one quote. Every
///   other whitespace character inside quotes is read as a single space.
/// * Whitespace outside quotes is kept as part of the field. A line with only
///   whitespace is a row with one field.
/// * Whitespace between a closing quote and the next separator is skipped.
/// * When comments are allowed, a comment marker at the start of a field
///   runs to the end of the line and produces no fields. In the middle of a
///   row, the row continues on the next line.
///
/// Unlike many CSV parsers, malformed quoting is an error rather than
/// something to be guessed at. See [`ParseErrorKind`].
#[derive(Clone, Debug)]
pub struct Tokenizer {
    dialect: Dialect,
    state: State,
    token: String,
    line: u64,
    row_line: u64,
    after_cr: bool,
    /// Whether the current comment started at a row boundary.
    leading_comment: bool,
}

impl Default for Tokenizer {
    fn default() -> Tokenizer {
        Tokenizer::new(Dialect::default())
    }
}

impl Tokenizer {
    /// Create a tokenizer for the given dialect.
    pub fn new(dialect: Dialect) -> Tokenizer {
        Tokenizer {
            dialect,
            state: State::EndOfLine,
            token: String::new(),
            line: 1,
            row_line: 1,
            after_cr: false,
            leading_comment: false,
        }
    }

    /// The dialect used by this tokenizer.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Replace the dialect.
    ///
    /// This should only be done at a row boundary.
    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.dialect = dialect;
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The text of the field assembled so far.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The current 1-based line, counting `\n`, `\r` and `\r\n` as one line
    /// break each.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The line on which the most recently started row begins.
    pub fn row_line(&self) -> u64 {
        self.row_line
    }

    /// Reset the tokenizer such that it behaves as if it had never been
    /// used.
    pub fn reset(&mut self) {
        self.state = State::EndOfLine;
        self.token.clear();
        self.line = 1;
        self.row_line = 1;
        self.after_cr = false;
        self.leading_comment = false;
    }

    /// Feed a single character, or `None` for the end of input.
    ///
    /// The token buffer is not cleared by this method. Callers driving the
    /// tokenizer by hand should call [`Tokenizer::clear_token`] after taking
    /// each field.
    pub fn feed(&mut self, ch: Option<char>) -> Result<Outcome, ParseError> {
        self.count_line(ch);
        if self.state == State::EndOfLine
            || (self.state == State::AfterComment && self.leading_comment)
        {
            self.row_line = self.line;
        }
        let class = self.dialect.classify(ch);
        match self.state {
            State::SeekingStart | State::EndOfLine => {
                Ok(self.at_field_start(class))
            }
            State::InComment => Ok(self.in_comment(class)),
            State::AfterComment => Ok(self.after_comment(class)),
            State::InPlain => self.in_plain(class),
            State::InQuoted => self.in_quoted(class),
            State::AfterEndQuote => self.after_end_quote(class),
            State::SkippingTail => self.skipping_tail(class),
        }
    }

    /// Clear the token buffer.
    pub fn clear_token(&mut self) {
        self.token.clear();
    }

    /// Read at most one field from `src`.
    ///
    /// Returns `Some(field)` when a field is complete, or `None` when the
    /// current row has no more fields (which, at a row boundary, means the
    /// input is exhausted).
    ///
    /// Parse errors are converted with `From`. See
    /// [`Tokenizer::read_field_with`] to supply an error factory instead.
    pub fn read_field<S>(&mut self, src: &mut S) -> Result<Option<&str>, S::Error>
    where
        S: CharSource + ?Sized,
        S::Error: From<ParseError>,
    {
        self.read_field_with(src, From::from)
    }

    /// Read at most one field from `src`, converting parse errors with
    /// `on_error`.
    pub fn read_field_with<S, E, F>(
        &mut self,
        src: &mut S,
        mut on_error: F,
    ) -> Result<Option<&str>, E>
    where
        S: CharSource + ?Sized,
        E: From<S::Error>,
        F: FnMut(ParseError) -> E,
    {
        self.token.clear();
        loop {
            let ch = src.next_char()?;
            match self.feed(ch) {
                Ok(Outcome::Continue) => {}
                Ok(Outcome::ConsumeToken) => {
                    return Ok(Some(self.token.as_str()))
                }
                Ok(Outcome::IgnoreToken) => return Ok(None),
                Err(err) => return Err(on_error(err)),
            }
        }
    }

    /// Read one row from `src`, calling `on_field` with the index and value
    /// of each field.
    ///
    /// Returns the number of fields read. Zero means the input is exhausted.
    pub fn read_row<S, G>(
        &mut self,
        src: &mut S,
        on_field: G,
    ) -> Result<usize, S::Error>
    where
        S: CharSource + ?Sized,
        S::Error: From<ParseError>,
        G: FnMut(usize, &str),
    {
        self.read_row_with(src, From::from, on_field)
    }

    /// Like [`Tokenizer::read_row`], but converts parse errors with
    /// `on_error`.
    pub fn read_row_with<S, E, F, G>(
        &mut self,
        src: &mut S,
        mut on_error: F,
        mut on_field: G,
    ) -> Result<usize, E>
    where
        S: CharSource + ?Sized,
        E: From<S::Error>,
        F: FnMut(ParseError) -> E,
        G: FnMut(usize, &str),
    {
        let mut count = 0;
        loop {
            match self.read_field_with(src, &mut on_error)? {
                None => return Ok(count),
                Some(field) => on_field(count, field),
            }
            count += 1;
            if self.state == State::EndOfLine {
                return Ok(count);
            }
        }
    }

    fn count_line(&mut self, ch: Option<char>) {
        match ch {
            Some('\r') => {
                self.line += 1;
                self.after_cr = true;
            }
            Some('\n') => {
                if !self.after_cr {
                    self.line += 1;
                }
                self.after_cr = false;
            }
            _ => self.after_cr = false,
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.line)
    }

    fn at_field_start(&mut self, class: Class) -> Outcome {
        let at_row_end = self.state == State::EndOfLine;
        match class {
            Class::Ordinary(c) | Class::Whitespace(c) => {
                self.token.push(c);
                self.state = State::InPlain;
                Outcome::Continue
            }
            Class::Quote => {
                self.state = State::InQuoted;
                Outcome::Continue
            }
            Class::Separator => {
                self.state = State::SeekingStart;
                Outcome::ConsumeToken
            }
            Class::Comment => {
                self.leading_comment = at_row_end;
                self.state = State::InComment;
                Outcome::Continue
            }
            Class::LineBreak(_) | Class::EndOfFile if !at_row_end => {
                self.state = State::EndOfLine;
                Outcome::ConsumeToken
            }
            Class::LineBreak(_) => Outcome::Continue,
            Class::EndOfFile => Outcome::IgnoreToken,
        }
    }

    fn in_comment(&mut self, class: Class) -> Outcome {
        match class {
            Class::LineBreak(_) => {
                self.state = State::AfterComment;
                Outcome::Continue
            }
            Class::EndOfFile => {
                self.state = State::EndOfLine;
                Outcome::IgnoreToken
            }
            _ => Outcome::Continue,
        }
    }

    fn after_comment(&mut self, class: Class) -> Outcome {
        match class {
            Class::Ordinary(c) => {
                self.token.push(c);
                self.state = State::InPlain;
                Outcome::Continue
            }
            Class::Whitespace(_) => {
                self.state = State::SeekingStart;
                Outcome::Continue
            }
            Class::Quote => {
                self.state = State::InQuoted;
                Outcome::Continue
            }
            Class::Separator => {
                self.state = State::SeekingStart;
                Outcome::ConsumeToken
            }
            Class::Comment => {
                self.state = State::InComment;
                Outcome::Continue
            }
            Class::LineBreak(_) => Outcome::Continue,
            Class::EndOfFile => {
                self.state = State::EndOfLine;
                Outcome::IgnoreToken
            }
        }
    }

    fn in_plain(&mut self, class: Class) -> Result<Outcome, ParseError> {
        match class {
            Class::Ordinary(c) | Class::Whitespace(c) => self.token.push(c),
            Class::Comment => self.token.push(self.dialect.comment),
            Class::Quote => {
                return Err(self.error(ParseErrorKind::UnexpectedQuote))
            }
            Class::Separator => {
                self.state = State::SeekingStart;
                return Ok(Outcome::ConsumeToken);
            }
            Class::LineBreak(_) | Class::EndOfFile => {
                self.state = State::EndOfLine;
                return Ok(Outcome::ConsumeToken);
            }
        }
        Ok(Outcome::Continue)
    }

    fn in_quoted(&mut self, class: Class) -> Result<Outcome, ParseError> {
        match class {
            Class::Ordinary(c) | Class::LineBreak(c) => self.token.push(c),
            Class::Separator => self.token.push(self.dialect.separator),
            Class::Comment => self.token.push(self.dialect.comment),
            Class::Whitespace(_) => self.token.push(' '),
            Class::Quote => self.state = State::AfterEndQuote,
            Class::EndOfFile => {
                return Err(self.error(ParseErrorKind::UnterminatedQuote))
            }
        }
        Ok(Outcome::Continue)
    }

    fn after_end_quote(&mut self, class: Class) -> Result<Outcome, ParseError> {
        match class {
            Class::Ordinary(_) | Class::Comment => {
                Err(self.error(ParseErrorKind::MissingSeparator))
            }
            Class::Whitespace(_) => {
                self.state = State::SkippingTail;
                Ok(Outcome::Continue)
            }
            Class::Quote => {
                self.token.push(self.dialect.quote);
                self.state = State::InQuoted;
                Ok(Outcome::Continue)
            }
            Class::Separator => {
                self.state = State::SeekingStart;
                Ok(Outcome::ConsumeToken)
            }
            Class::LineBreak(_) | Class::EndOfFile => {
                self.state = State::EndOfLine;
                Ok(Outcome::ConsumeToken)
            }
        }
    }

    fn skipping_tail(&mut self, class: Class) -> Result<Outcome, ParseError> {
        match class {
            Class::Ordinary(_) | Class::Comment | Class::Quote => {
                Err(self.error(ParseErrorKind::MissingSeparator))
            }
            Class::Whitespace(_) => Ok(Outcome::Continue),
            Class::Separator => {
                self.state = State::SeekingStart;
                Ok(Outcome::ConsumeToken)
            }
            Class::LineBreak(_) | Class::EndOfFile => {
                self.state = State::EndOfLine;
                Ok(Outcome::ConsumeToken)
            }
        }
    }
}

/// Decode the first row of `text` into its fields.
///
/// Leading blank lines (and, when enabled, comment lines) are skipped. An
/// input without any row yields an empty vector.
pub fn decode_line(
    dialect: &Dialect,
    text: &str,
) -> Result<Vec<String>, ParseError> {
    let mut tok = Tokenizer::new(*dialect);
    let mut src = StrSource::new(text);
    let mut fields = Vec::new();
    tok.read_row(&mut src, |_, field| fields.push(field.to_string()))?;
    Ok(fields)
}
