/*!
Keyed comparison of two tables.

Two [`Dictionary`]s keyed on the same column are compared row by row. A key
only in the new table is [`Change::Added`], a key only in the old table is
[`Change::Removed`], and a key in both is [`Change::Updated`] or
[`Change::Unchanged`] depending on whether every column holds the same
field.

```
use dsv::diff::{self, DiffMode};
use dsv::table::{Dictionary, TableReader, TableWriter};

fn keyed(data: &str) -> Dictionary {
    let mut rdr = TableReader::from_reader(data.as_bytes()).unwrap();
    Dictionary::from_table(&mut rdr, "Id").unwrap()
}

let old = keyed("Id;F2\n1;x\n2;y\n");
let new = keyed("Id;F2\n1;x\n2;z\n");

let changes = diff::compare(&old, &new, DiffMode::UpdatedOnly);
assert_eq!(changes.len(), 1);

let headers = new.rows().next().unwrap().headers().clone();
let mut wtr = TableWriter::from_writer(vec![], headers);
diff::write_changes(&mut wtr, &changes).unwrap();
let out = wtr.into_inner().into_inner().unwrap();
assert_eq!(String::from_utf8(out).unwrap(), "Id;F2\n2;z\n");
```
*/

use std::io;

use crate::error::Result;
use crate::table::{Dictionary, Row, TableWriter};

/// Which changes [`compare`] reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiffMode {
    /// Every key, including unchanged ones.
    All,
    /// Added, removed and updated keys.
    Changes,
    /// Only keys missing from the old table.
    AddedOnly,
    /// Only keys missing from the new table.
    RemovedOnly,
    /// Only keys whose rows differ.
    UpdatedOnly,
}

impl Default for DiffMode {
    fn default() -> DiffMode {
        DiffMode::Changes
    }
}

impl DiffMode {
    /// Returns true if changes of the given kind are reported in this mode.
    pub fn includes(&self, kind: ChangeKind) -> bool {
        match *self {
            DiffMode::All => true,
            DiffMode::Changes => kind != ChangeKind::Unchanged,
            DiffMode::AddedOnly => kind == ChangeKind::Added,
            DiffMode::RemovedOnly => kind == ChangeKind::Removed,
            DiffMode::UpdatedOnly => kind == ChangeKind::Updated,
        }
    }
}

/// The kind of a [`Change`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChangeKind {
    /// See [`Change::Added`].
    Added,
    /// See [`Change::Removed`].
    Removed,
    /// See [`Change::Updated`].
    Updated,
    /// See [`Change::Unchanged`].
    Unchanged,
}

/// The difference for a single key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Change<'a> {
    /// The key is only in the new table.
    Added(&'a Row),
    /// The key is only in the old table.
    Removed(&'a Row),
    /// The key is in both tables with different fields.
    Updated {
        /// The row in the old table.
        old: &'a Row,
        /// The row in the new table.
        new: &'a Row,
    },
    /// The key is in both tables with the same fields.
    Unchanged(&'a Row),
}

impl<'a> Change<'a> {
    /// The kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match *self {
            Change::Added(_) => ChangeKind::Added,
            Change::Removed(_) => ChangeKind::Removed,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Unchanged(_) => ChangeKind::Unchanged,
        }
    }

    /// The most recent version of the row: the old row for removals, the
    /// new row otherwise.
    pub fn row(&self) -> &'a Row {
        match *self {
            Change::Added(row)
            | Change::Removed(row)
            | Change::Unchanged(row) => row,
            Change::Updated { new, .. } => new,
        }
    }
}

/// Compare two tables keyed on the same column.
///
/// Keys of the new table are reported first, in its order. Removed keys
/// follow, in the order of the old table.
pub fn compare<'a>(
    old: &'a Dictionary,
    new: &'a Dictionary,
    mode: DiffMode,
) -> Vec<Change<'a>> {
    let mut changes = vec![];
    for (key, row) in new.iter() {
        let change = match old.get(key) {
            None => Change::Added(row),
            Some(prev) if prev.same_values(row) => Change::Unchanged(row),
            Some(prev) => Change::Updated { old: prev, new: row },
        };
        if mode.includes(change.kind()) {
            changes.push(change);
        }
    }
    if mode.includes(ChangeKind::Removed) {
        for (key, row) in old.iter() {
            if !new.contains_key(key) {
                changes.push(Change::Removed(row));
            }
        }
    }
    changes
}

/// Write the row of every change.
///
/// Returns the number of rows written.
pub fn write_changes<W: io::Write>(
    wtr: &mut TableWriter<W>,
    changes: &[Change<'_>],
) -> Result<usize> {
    for change in changes {
        wtr.write_row(change.row())?;
    }
    Ok(changes.len())
}
