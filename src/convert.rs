/*!
Typed conversion of fields.

A [`Converter<T>`] parses a field into a `T` and formats a `T` back into a
field. Converters are collected in a [`Converters`] registry keyed by the
target type. The registry is an ordinary value that is passed to whatever
needs it; there is no process wide registry.

```
use dsv::convert::Converters;

let convs = Converters::with_defaults();
let n: i64 = convs.parse(" -42 ").unwrap();
assert_eq!(n, -42);
assert_eq!(convs.format(&2.5f64).unwrap(), "2.5");
assert!(convs.parse::<bool>("maybe").is_err());
```
*/

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Lookup, Result};

/// Parses fields into values of type `T` and formats them back.
pub trait Converter<T>: Send + Sync {
    /// Parse a single field.
    fn parse(&self, field: &str) -> std::result::Result<T, ConvertError>;

    /// Format a value as a single field.
    fn format(&self, value: &T) -> String;
}

/// An error converting between a field and a typed value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertError {
    target: &'static str,
    value: String,
    msg: String,
}

impl ConvertError {
    /// Create an error for a field that could not be parsed as `T`.
    pub fn new<T: ?Sized, M: fmt::Display>(value: &str, msg: M) -> ConvertError {
        ConvertError {
            target: any::type_name::<T>(),
            value: value.to_string(),
            msg: msg.to_string(),
        }
    }

    /// The name of the target type.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// The field that failed to convert.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "cannot convert {:?} to {}: {}",
            self.value, self.target, self.msg
        )
    }
}

impl StdError for ConvertError {}

struct Entry {
    name: &'static str,
    conv: Box<dyn Any + Send + Sync>,
}

/// A registry of converters keyed by target type.
///
/// Each type has at most one converter. Registering a second converter for
/// the same type replaces the first.
#[derive(Default)]
pub struct Converters {
    map: HashMap<TypeId, Entry>,
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&str> = self.map.values().map(|e| e.name).collect();
        names.sort();
        f.debug_struct("Converters").field("types", &names).finish()
    }
}

impl Converters {
    /// Create an empty registry.
    pub fn new() -> Converters {
        Converters::default()
    }

    /// Create a registry with a converter for every primitive integer and
    /// float type, `bool`, `char`, `String`, `chrono::NaiveDate` and
    /// `chrono::NaiveDateTime`.
    pub fn with_defaults() -> Converters {
        let mut convs = Converters::new();
        convs
            .register::<i8, _>(IntConverter)
            .register::<i16, _>(IntConverter)
            .register::<i32, _>(IntConverter)
            .register::<i64, _>(IntConverter)
            .register::<i128, _>(IntConverter)
            .register::<isize, _>(IntConverter)
            .register::<u8, _>(IntConverter)
            .register::<u16, _>(IntConverter)
            .register::<u32, _>(IntConverter)
            .register::<u64, _>(IntConverter)
            .register::<u128, _>(IntConverter)
            .register::<usize, _>(IntConverter)
            .register::<f32, _>(FloatConverter)
            .register::<f64, _>(FloatConverter)
            .register::<bool, _>(BoolConverter)
            .register::<char, _>(CharConverter)
            .register::<String, _>(StringConverter)
            .register::<NaiveDate, _>(DateConverter::default())
            .register::<NaiveDateTime, _>(DateTimeConverter::default());
        convs
    }

    /// Register `conv` as the converter for `T`.
    pub fn register<T, C>(&mut self, conv: C) -> &mut Converters
    where
        T: 'static,
        C: Converter<T> + 'static,
    {
        let boxed: Box<dyn Converter<T>> = Box::new(conv);
        self.map.insert(
            TypeId::of::<T>(),
            Entry { name: any::type_name::<T>(), conv: Box::new(boxed) },
        );
        self
    }

    /// Returns true if a converter for `T` is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// The converter registered for `T`.
    pub fn get<T: 'static>(&self) -> Result<&dyn Converter<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|e| e.conv.downcast_ref::<Box<dyn Converter<T>>>())
            .map(|c| &**c)
            .ok_or_else(|| {
                Error::NotFound(Lookup::Converter(any::type_name::<T>()))
            })
    }

    /// Parse `field` with the converter registered for `T`.
    pub fn parse<T: 'static>(&self, field: &str) -> Result<T> {
        Ok(self.get::<T>()?.parse(field)?)
    }

    /// Format `value` with the converter registered for `T`.
    pub fn format<T: 'static>(&self, value: &T) -> Result<String> {
        Ok(self.get::<T>()?.format(value))
    }
}

/// Converts primitive integers. Surrounding whitespace is ignored when
/// parsing. Formatting uses `itoa`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntConverter;

macro_rules! int_converter {
    ($($ty:ty),*) => {$(
        impl Converter<$ty> for IntConverter {
            fn parse(
                &self,
                field: &str,
            ) -> std::result::Result<$ty, ConvertError> {
                field
                    .trim()
                    .parse()
                    .map_err(|err| ConvertError::new::<$ty, _>(field, err))
            }

            fn format(&self, value: &$ty) -> String {
                itoa::Buffer::new().format(*value).to_string()
            }
        }
    )*}
}

int_converter!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Converts `f32` and `f64`. Surrounding whitespace is ignored when parsing.
/// Formatting uses `ryu`, which writes the shortest representation that
/// parses back to the same value.
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatConverter;

macro_rules! float_converter {
    ($($ty:ty),*) => {$(
        impl Converter<$ty> for FloatConverter {
            fn parse(
                &self,
                field: &str,
            ) -> std::result::Result<$ty, ConvertError> {
                field
                    .trim()
                    .parse()
                    .map_err(|err| ConvertError::new::<$ty, _>(field, err))
            }

            fn format(&self, value: &$ty) -> String {
                if value.is_finite() {
                    let mut buf = ryu::Buffer::new();
                    let s = buf.format_finite(*value);
                    s.strip_suffix(".0").unwrap_or(s).to_string()
                } else {
                    value.to_string()
                }
            }
        }
    )*}
}

float_converter!(f32, f64);

/// Converts `bool`. `true` and `false` are accepted in any case.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolConverter;

impl Converter<bool> for BoolConverter {
    fn parse(&self, field: &str) -> std::result::Result<bool, ConvertError> {
        let t = field.trim();
        if t.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if t.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConvertError::new::<bool, _>(field, "expected true or false"))
        }
    }

    fn format(&self, value: &bool) -> String {
        let s = if *value { "true" } else { "false" };
        s.to_string()
    }
}

/// Converts `char`. The field must hold exactly one character.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharConverter;

impl Converter<char> for CharConverter {
    fn parse(&self, field: &str) -> std::result::Result<char, ConvertError> {
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConvertError::new::<char, _>(
                field,
                format!(
                    "expected a single character but got {}",
                    field.chars().count()
                ),
            )),
        }
    }

    fn format(&self, value: &char) -> String {
        value.to_string()
    }
}

/// Converts `String`. Fields are taken verbatim.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn parse(&self, field: &str) -> std::result::Result<String, ConvertError> {
        Ok(field.to_string())
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }
}

/// Converts `chrono::NaiveDate` using a `strftime` style format.
///
/// The default format is `%Y-%m-%d`.
#[derive(Clone, Debug)]
pub struct DateConverter {
    format: String,
}

impl Default for DateConverter {
    fn default() -> DateConverter {
        DateConverter::new("%Y-%m-%d")
    }
}

impl DateConverter {
    /// Create a converter for the given format.
    pub fn new(format: &str) -> DateConverter {
        DateConverter { format: format.to_string() }
    }
}

impl Converter<NaiveDate> for DateConverter {
    fn parse(
        &self,
        field: &str,
    ) -> std::result::Result<NaiveDate, ConvertError> {
        NaiveDate::parse_from_str(field.trim(), &self.format)
            .map_err(|err| ConvertError::new::<NaiveDate, _>(field, err))
    }

    fn format(&self, value: &NaiveDate) -> String {
        value.format(&self.format).to_string()
    }
}

/// Converts `chrono::NaiveDateTime` using a `strftime` style format.
///
/// The default format is `%Y-%m-%d %H:%M:%S`. When parsing, an ISO 8601
/// timestamp such as `2024-01-31T08:00:00` is accepted as well.
#[derive(Clone, Debug)]
pub struct DateTimeConverter {
    format: String,
}

impl Default for DateTimeConverter {
    fn default() -> DateTimeConverter {
        DateTimeConverter::new("%Y-%m-%d %H:%M:%S")
    }
}

impl DateTimeConverter {
    /// Create a converter for the given format.
    pub fn new(format: &str) -> DateTimeConverter {
        DateTimeConverter { format: format.to_string() }
    }
}

impl Converter<NaiveDateTime> for DateTimeConverter {
    fn parse(
        &self,
        field: &str,
    ) -> std::result::Result<NaiveDateTime, ConvertError> {
        let t = field.trim();
        NaiveDateTime::parse_from_str(t, &self.format)
            .or_else(|err| t.parse().map_err(|_| err))
            .map_err(|err| ConvertError::new::<NaiveDateTime, _>(field, err))
    }

    fn format(&self, value: &NaiveDateTime) -> String {
        value.format(&self.format).to_string()
    }
}
