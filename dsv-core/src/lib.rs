/*!
`dsv-core` provides a character-level tokenizer and a line builder for
delimiter-separated values.

This crate is the engine under the `dsv` crate. It does no I/O of its own.
Instead, a [`Tokenizer`] pulls characters from anything implementing
[`CharSource`], and a [`LineBuilder`] accumulates one encoded line at a time
in memory.

# Example: decoding a line

```
use dsv_core::{decode_line, Dialect};

let fields = decode_line(&Dialect::default(), r#"a;"b;c";"d""e""#).unwrap();
assert_eq!(fields, vec!["a", "b;c", r#"d"e"#]);
```

# Example: encoding a line

```
use dsv_core::{encode_row, Dialect};

let line = encode_row(&Dialect::default(), vec![Some("a"), None, Some("c;d")]);
assert_eq!(line, r#"a;;"c;d""#);
```

# Example: pulling fields one at a time

```
use dsv_core::{Dialect, State, StrSource, Tokenizer};

let mut src = StrSource::new("x;y\nz");
let mut tok = Tokenizer::new(Dialect::default());

let mut rows = vec![];
loop {
    let mut row = vec![];
    let n = tok.read_row(&mut src, |_, field| row.push(field.to_string()))
        .unwrap();
    if n == 0 {
        break;
    }
    assert_eq!(tok.state(), State::EndOfLine);
    rows.push(row);
}
assert_eq!(rows, vec![vec!["x", "y"], vec!["z"]]);
```
*/

#![deny(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use crate::builder::{encode_row, LineBuilder};
pub use crate::dialect::{Class, Dialect, DialectError};
pub use crate::source::{CharSource, StrSource};
pub use crate::tokenizer::{
    decode_line, Outcome, ParseError, ParseErrorKind, State, Tokenizer,
};

mod builder;
mod dialect;
mod source;
mod tokenizer;
