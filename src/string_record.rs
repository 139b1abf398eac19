use std::fmt;
use std::iter::FromIterator;
use std::ops::{self, Range};

#[cfg(feature = "serde")]
use serde::de::Deserialize;

#[cfg(feature = "serde")]
use crate::deserializer::deserialize_string_record;
#[cfg(feature = "serde")]
use crate::error::{Error, Result};

/// A single row of delimited data.
///
/// All fields are stored contiguously in a single `String`, with the end of
/// each field recorded separately. Reusing one record across many reads
/// therefore amortizes allocation.
///
/// A record also remembers the line on which it started in its input, when
/// it was produced by a reader.
#[derive(Clone, Eq)]
pub struct StringRecord {
    /// All fields in this record, stored contiguously.
    fields: String,
    /// The number of and location of each field in this record.
    bounds: Bounds,
    /// The line on which this record starts, if known.
    line: Option<u64>,
}

impl PartialEq for StringRecord {
    fn eq(&self, other: &StringRecord) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.iter().eq(other.iter().map(|f| f.as_ref()))
    }
}

impl<'a, T: AsRef<str>> PartialEq<[T]> for &'a StringRecord {
    fn eq(&self, other: &[T]) -> bool {
        (**self).eq(other)
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        self.eq(other.as_slice())
    }
}

impl<'a, T: AsRef<str>> PartialEq<Vec<T>> for &'a StringRecord {
    fn eq(&self, other: &Vec<T>) -> bool {
        (**self).eq(other.as_slice())
    }
}

impl Default for StringRecord {
    fn default() -> StringRecord {
        StringRecord::new()
    }
}

impl fmt::Debug for StringRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        write!(f, "StringRecord({:?})", fields)
    }
}

impl StringRecord {
    /// Create a new empty `StringRecord`.
    pub fn new() -> StringRecord {
        StringRecord::with_capacity(0, 0)
    }

    /// Create a new empty `StringRecord` with room for `buffer` bytes of
    /// field data spread over `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> StringRecord {
        StringRecord {
            fields: String::with_capacity(buffer),
            bounds: Bounds::with_capacity(fields),
            line: None,
        }
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.bounds.get(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this record.
    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Clear this record so that it has zero fields.
    ///
    /// The line is cleared too. Allocations are kept.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.bounds.clear();
        self.line = None;
    }

    /// Shrink this record to its first `n` fields.
    ///
    /// If `n` is at least the current number of fields, nothing happens.
    pub fn truncate(&mut self, n: usize) {
        if n < self.len() {
            self.bounds.truncate(n);
            self.fields.truncate(self.bounds.end());
        }
    }

    /// Add a new field to the end of this record.
    #[inline]
    pub fn push_field(&mut self, field: &str) {
        self.fields.push_str(field);
        self.bounds.add(self.fields.len());
    }

    /// The line on which this record starts in its input.
    ///
    /// This is `None` for records that were not produced by a reader.
    pub fn line(&self) -> Option<u64> {
        self.line
    }

    /// Set the line on which this record starts.
    pub fn set_line(&mut self, line: Option<u64>) {
        self.line = line;
    }

    /// Returns the contents of all fields concatenated together.
    pub fn as_slice(&self) -> &str {
        &self.fields[..self.bounds.end()]
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> StringRecordIter {
        StringRecordIter { r: self, i_forward: 0, i_reverse: self.len() }
    }

    /// Deserialize this record.
    ///
    /// When `headers` is given, structs and maps are matched by column name.
    /// Otherwise fields are consumed in order.
    ///
    /// # Example
    ///
    /// ```
    /// use dsv::StringRecord;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Row {
    ///     city: String,
    ///     pop: u64,
    /// }
    ///
    /// let headers = StringRecord::from(vec!["pop", "city"]);
    /// let record = StringRecord::from(vec!["7", "Oslo"]);
    /// let row: Row = record.deserialize(Some(&headers)).unwrap();
    /// assert_eq!(row.city, "Oslo");
    /// assert_eq!(row.pop, 7);
    /// ```
    #[cfg(feature = "serde")]
    pub fn deserialize<'de, D: Deserialize<'de>>(
        &'de self,
        headers: Option<&'de StringRecord>,
    ) -> Result<D> {
        deserialize_string_record(self, headers).map_err(|err| {
            Error::Deserialize { line: self.line.unwrap_or(0), err }
        })
    }
}

impl ops::Index<usize> for StringRecord {
    type Output = str;

    #[inline]
    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "index out of bounds: the record has {} fields but the index \
                 is {}",
                self.len(),
                i
            ),
        }
    }
}

impl<T: AsRef<str>> From<Vec<T>> for StringRecord {
    fn from(xs: Vec<T>) -> StringRecord {
        StringRecord::from_iter(xs)
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for StringRecord {
    fn from(xs: &'a [T]) -> StringRecord {
        StringRecord::from_iter(xs)
    }
}

impl<T: AsRef<str>> FromIterator<T> for StringRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> StringRecord {
        let mut record = StringRecord::new();
        record.extend(iter);
        record
    }
}

impl<T: AsRef<str>> Extend<T> for StringRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push_field(x.as_ref());
        }
    }
}

impl<'a> IntoIterator for &'a StringRecord {
    type IntoIter = StringRecordIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> StringRecordIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a string record.
#[derive(Clone)]
pub struct StringRecordIter<'r> {
    r: &'r StringRecord,
    i_forward: usize,
    i_reverse: usize,
}

impl<'r> Iterator for StringRecordIter<'r> {
    type Item = &'r str;

    #[inline]
    fn next(&mut self) -> Option<&'r str> {
        if self.i_forward == self.i_reverse {
            return None;
        }
        let field = self.r.get(self.i_forward);
        self.i_forward += 1;
        field
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.i_reverse - self.i_forward;
        (n, Some(n))
    }
}

impl<'r> DoubleEndedIterator for StringRecordIter<'r> {
    #[inline]
    fn next_back(&mut self) -> Option<&'r str> {
        if self.i_forward == self.i_reverse {
            return None;
        }
        self.i_reverse -= 1;
        self.r.get(self.i_reverse)
    }
}

impl<'r> ExactSizeIterator for StringRecordIter<'r> {}

/// The bounds of fields in a single record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Bounds {
    /// The ending index of each field. Every end falls on a UTF-8 boundary.
    ends: Vec<usize>,
}

impl Bounds {
    fn with_capacity(n: usize) -> Bounds {
        Bounds { ends: Vec::with_capacity(n) }
    }

    /// Returns the bounds of field `i`.
    #[inline]
    fn get(&self, i: usize) -> Option<Range<usize>> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(j) => self.ends[j],
        };
        Some(start..end)
    }

    /// Return the last position of the last field.
    ///
    /// If there are no fields, this returns `0`.
    #[inline]
    fn end(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    #[inline]
    fn len(&self) -> usize {
        self.ends.len()
    }

    fn clear(&mut self) {
        self.ends.clear();
    }

    fn truncate(&mut self, n: usize) {
        self.ends.truncate(n);
    }

    /// Add a new field with the given ending position.
    #[inline]
    fn add(&mut self, pos: usize) {
        self.ends.push(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::StringRecord;

    #[test]
    fn record_1() {
        let mut rec = StringRecord::new();
        rec.push_field("foo");

        assert_eq!(rec.len(), 1);
        assert_eq!(rec.get(0), Some("foo"));
        assert_eq!(rec.get(1), None);
        assert_eq!(rec.get(2), None);
    }

    #[test]
    fn record_2() {
        let mut rec = StringRecord::new();
        rec.push_field("foo");
        rec.push_field("quux");

        assert_eq!(rec.len(), 2);
        assert_eq!(rec.get(0), Some("foo"));
        assert_eq!(rec.get(1), Some("quux"));
        assert_eq!(rec.get(2), None);
        assert_eq!(&rec[1], "quux");
    }

    #[test]
    fn empty_record() {
        let rec = StringRecord::new();

        assert!(rec.is_empty());
        assert_eq!(rec.get(0), None);
        assert_eq!(rec.iter().count(), 0);
    }

    #[test]
    fn empty_surround() {
        let mut rec = StringRecord::new();
        rec.push_field("foo");
        rec.push_field("");
        rec.push_field("quux");
        rec.push_field("");

        assert_eq!(rec.len(), 4);
        assert_eq!(rec.get(0), Some("foo"));
        assert_eq!(rec.get(1), Some(""));
        assert_eq!(rec.get(2), Some("quux"));
        assert_eq!(rec.get(3), Some(""));
        assert_eq!(rec.get(4), None);
        assert_eq!(rec.as_slice(), "fooquux");
    }

    #[test]
    fn multibyte_fields() {
        let rec = StringRecord::from(vec!["日本", "", "ü"]);
        assert_eq!(rec.get(0), Some("日本"));
        assert_eq!(rec.get(1), Some(""));
        assert_eq!(rec.get(2), Some("ü"));
    }

    #[test]
    fn iter_both_ends() {
        let rec = StringRecord::from(vec!["a", "b", "c"]);
        let mut it = rec.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some("a"));
        assert_eq!(it.next_back(), Some("c"));
        assert_eq!(it.next(), Some("b"));
        assert_eq!(it.next_back(), None);
        assert_eq!(it.next(), None);

        let rev: Vec<&str> = rec.iter().rev().collect();
        assert_eq!(rev, vec!["c", "b", "a"]);
    }

    #[test]
    fn clear_and_reuse() {
        let mut rec = StringRecord::from(vec!["a", "b"]);
        rec.set_line(Some(4));
        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(rec.line(), None);
        rec.push_field("z");
        assert_eq!(rec, vec!["z"]);
    }

    #[test]
    fn truncate() {
        let mut rec = StringRecord::from(vec!["a", "bb", "ccc"]);
        rec.truncate(5);
        assert_eq!(rec.len(), 3);
        rec.truncate(2);
        assert_eq!(rec, vec!["a", "bb"]);
        rec.push_field("d");
        assert_eq!(rec, vec!["a", "bb", "d"]);
        rec.truncate(0);
        assert!(rec.is_empty());
    }

    #[test]
    fn equality_ignores_line() {
        let mut a = StringRecord::from(vec!["x", "y"]);
        let b = StringRecord::from(vec!["x", "y"]);
        a.set_line(Some(9));
        assert_eq!(a, b);
        assert_ne!(a, StringRecord::from(vec!["xy"]));
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let rec = StringRecord::from(vec!["a"]);
        let _ = &rec[1];
    }
}
