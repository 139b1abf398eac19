use crate::tokenizer::ParseError;

/// A producer of characters for a [`Tokenizer`](crate::Tokenizer).
///
/// `Ok(None)` signals the end of input. Once a source has returned `None`, it
/// must keep returning `None`.
pub trait CharSource {
    /// The error produced when the next character cannot be obtained.
    type Error;

    /// Pull the next character.
    fn next_char(&mut self) -> Result<Option<char>, Self::Error>;
}

impl<'a, S: CharSource + ?Sized> CharSource for &'a mut S {
    type Error = S::Error;

    #[inline]
    fn next_char(&mut self) -> Result<Option<char>, S::Error> {
        (**self).next_char()
    }
}

/// A character source over an in-memory string.
///
/// This never fails. Its error type is [`ParseError`] so that it can be used
/// directly with [`Tokenizer::read_field`](crate::Tokenizer::read_field).
#[derive(Clone, Debug)]
pub struct StrSource<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> StrSource<'a> {
    /// Create a source that yields the characters of `text`.
    pub fn new(text: &'a str) -> StrSource<'a> {
        StrSource { text, pos: 0 }
    }

    /// The byte offset of the next character to be returned.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The text that has not been pulled yet.
    pub fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Pull the next character without the `Result` wrapper.
    #[inline]
    pub fn next_char_infallible(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

impl<'a> CharSource for StrSource<'a> {
    type Error = ParseError;

    #[inline]
    fn next_char(&mut self) -> Result<Option<char>, ParseError> {
        Ok(self.next_char_infallible())
    }
}
