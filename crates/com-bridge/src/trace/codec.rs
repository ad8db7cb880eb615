//! XML-like structural dump of trace records
//!
//! Write-only. The value is taken through `serde` into a structural tree and
//! written as nested elements:
//!
//! ```text
//! <TypeResolutionFailure xmlns:i="http://www.w3.org/2001/XMLSchema-instance">
//!   <key>IID 11281bb7-...</key>
//!   <is_server>false</is_server>
//! </TypeResolutionFailure>
//! ```
//!
//! (shown indented; the codec emits no whitespace between elements)

use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

/// Instance namespace used for `i:nil`
pub const INSTANCE_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Element name used for absent values (the generic object type)
pub const ANY_TYPE: &str = "anyType";

/// Serializer for diagnostic trace records
pub struct TraceRecordCodec;

impl TraceRecordCodec {
    /// Write `value` (or a nil element of the generic object type) to `writer`
    ///
    /// Values that cannot be represented are written as an element carrying
    /// a `serializationError` attribute. Only writer errors are returned.
    pub fn serialize<W, T>(writer: &mut W, value: Option<&T>) -> io::Result<()>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let value = match value {
            Some(value) => value,
            None => {
                return write!(
                    writer,
                    "<{ANY_TYPE} xmlns:i=\"{INSTANCE_NAMESPACE}\" i:nil=\"true\"/>"
                );
            }
        };

        let root = root_name::<T>();
        match serde_json::to_value(value) {
            Ok(tree) => write_element(writer, &root, &tree, true),
            Err(e) => write!(
                writer,
                "<{root} xmlns:i=\"{INSTANCE_NAMESPACE}\" serializationError=\"{}\"/>",
                escape(&e.to_string())
            ),
        }
    }

    /// Render into a string
    pub fn to_string<T: Serialize + ?Sized>(value: Option<&T>) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = Self::serialize(&mut buf, value);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn write_element<W: Write + ?Sized>(writer: &mut W, name: &str, value: &Value, root: bool) -> io::Result<()> {
    let ns = if root {
        format!(" xmlns:i=\"{INSTANCE_NAMESPACE}\"")
    } else {
        String::new()
    };

    match value {
        Value::Null => write!(writer, "<{name}{ns} i:nil=\"true\"/>"),
        Value::Bool(b) => write!(writer, "<{name}{ns}>{b}</{name}>"),
        Value::Number(n) => write!(writer, "<{name}{ns}>{n}</{name}>"),
        Value::String(s) => write!(writer, "<{name}{ns}>{}</{name}>", escape(s)),
        Value::Array(items) => {
            write!(writer, "<{name}{ns}>")?;
            for item in items {
                write_element(writer, "item", item, false)?;
            }
            write!(writer, "</{name}>")
        }
        Value::Object(fields) => {
            write!(writer, "<{name}{ns}>")?;
            for (key, field) in fields {
                write_element(writer, &element_name(key), field, false)?;
            }
            write!(writer, "</{name}>")
        }
    }
}

/// Last path segment of the type name, without generic arguments
fn root_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let last = base.rsplit("::").next().unwrap_or(base);
    element_name(last.trim_start_matches('&'))
}

fn element_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    match name.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => name.insert(0, '_'),
    }
    name
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
