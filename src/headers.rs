use std::collections::HashMap;

use crate::error::{Error, Lookup, Result};
use crate::string_record::{StringRecord, StringRecordIter};

/// An ordered set of column names.
///
/// Names are unique and looked up in constant time. The order is the order
/// of the columns in the header row.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    names: StringRecord,
    index: HashMap<String, usize>,
}

impl PartialEq for Headers {
    fn eq(&self, other: &Headers) -> bool {
        self.names == other.names
    }
}

impl Eq for Headers {}

impl Headers {
    /// Build a header set from column names.
    ///
    /// A name that appears twice is an [`Error::InvalidArgument`].
    ///
    /// # Example
    ///
    /// ```
    /// use dsv::Headers;
    ///
    /// let headers = Headers::new(vec!["Id", "Name"]).unwrap();
    /// assert_eq!(headers.index_of("Name"), Some(1));
    /// assert_eq!(headers.name(0), Some("Id"));
    /// assert!(Headers::new(vec!["Id", "Id"]).is_err());
    /// ```
    pub fn new<I, T>(names: I) -> Result<Headers>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut headers = Headers::default();
        for name in names {
            headers.push(name.as_ref())?;
        }
        Ok(headers)
    }

    /// Build a header set from a header row.
    pub fn from_record(record: &StringRecord) -> Result<Headers> {
        Headers::new(record)
    }

    fn push(&mut self, name: &str) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Error::InvalidArgument(format!(
                "column {:?} appears more than once in the header row",
                name
            )));
        }
        self.index.insert(name.to_string(), self.names.len());
        self.names.push_field(name);
        Ok(())
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The index of the column with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Like [`Headers::index_of`], but a missing column is an
    /// [`Error::NotFound`].
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| Error::NotFound(Lookup::Column(name.to_string())))
    }

    /// The name of the column at index `i`.
    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i)
    }

    /// Returns true if a column with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over the column names in order.
    pub fn iter(&self) -> StringRecordIter {
        self.names.iter()
    }

    /// The column names as a record, ready to be written as a header row.
    pub fn as_record(&self) -> &StringRecord {
        &self.names
    }
}

impl<'a> IntoIterator for &'a Headers {
    type IntoIter = StringRecordIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> StringRecordIter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Error, Lookup};
    use crate::string_record::StringRecord;

    use super::Headers;

    #[test]
    fn lookup() {
        let h = Headers::new(vec!["a", "b", "c"]).unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.index_of("c"), Some(2));
        assert_eq!(h.index_of("d"), None);
        assert_eq!(h.name(1), Some("b"));
        assert_eq!(h.name(3), None);
        assert!(h.contains("a"));
        assert_eq!(h.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(h.as_record(), &vec!["a", "b", "c"]);
    }

    #[test]
    fn require() {
        let h = Headers::new(vec!["Id"]).unwrap();
        assert_eq!(h.require("Id").unwrap(), 0);
        match h.require("id") {
            Err(Error::NotFound(Lookup::Column(name))) => {
                assert_eq!(name, "id")
            }
            r => panic!("expected NotFound but got {:?}", r),
        }
    }

    #[test]
    fn duplicates_rejected() {
        let rec = StringRecord::from(vec!["x", "y", "x"]);
        match Headers::from_record(&rec) {
            Err(Error::InvalidArgument(msg)) => assert!(msg.contains("\"x\"")),
            r => panic!("expected InvalidArgument but got {:?}", r),
        }
    }

    #[test]
    fn empty_names_allowed_once() {
        assert!(Headers::new(vec!["", "a"]).is_ok());
        assert!(Headers::new(vec!["", ""]).is_err());
        assert!(Headers::new(Vec::<String>::new()).unwrap().is_empty());
    }
}
