//! Attribute values of one filesystem entry.

use std::collections::HashMap;
use std::fs::Metadata;

use chrono::{DateTime, Utc};

use crate::context::Attribute;
use crate::mime;
use crate::value::Value;
use crate::walker::Entry;

static NULL: Value = Value::Null;

/// Snapshot of the attributes a query needs for one entry.
///
/// Attributes that cannot be resolved (no metadata, unsupported platform
/// field) hold `Null`; an attribute that was never materialized reads as
/// `Null` as well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<Attribute, Value>,
}

impl Row {
    /// Resolves `attributes` against the entry.
    pub fn materialize(entry: &Entry, attributes: &[Attribute]) -> Self {
        let values = attributes
            .iter()
            .map(|&attribute| (attribute, resolve(entry, attribute)))
            .collect();
        Row { values }
    }

    /// Builds a row from explicit values.
    pub fn from_values(values: impl IntoIterator<Item = (Attribute, Value)>) -> Self {
        Row {
            values: values.into_iter().collect(),
        }
    }

    pub fn get(&self, attribute: Attribute) -> &Value {
        self.values.get(&attribute).unwrap_or(&NULL)
    }
}

fn resolve(entry: &Entry, attribute: Attribute) -> Value {
    let metadata = entry.metadata.as_ref();
    match attribute {
        Attribute::Name => Value::String(entry.name()),
        Attribute::Path => Value::String(entry.path.to_string_lossy().into_owned()),
        Attribute::AbsPath => std::path::absolute(&entry.path)
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .unwrap_or(Value::Null),
        Attribute::Dir => entry
            .path
            .parent()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .unwrap_or(Value::Null),
        Attribute::Extension => entry
            .path
            .extension()
            .map(|ext| Value::String(ext.to_string_lossy().into_owned()))
            .unwrap_or(Value::Null),
        Attribute::Depth => Value::Integer(entry.depth as i64),
        Attribute::IsHidden => Value::Boolean(entry.name().starts_with('.')),
        Attribute::Size => metadata
            .map(|m| Value::Integer(m.len() as i64))
            .unwrap_or(Value::Null),
        Attribute::IsDir => flag(metadata, |m| m.is_dir()),
        Attribute::IsFile => flag(metadata, |m| m.is_file()),
        Attribute::IsSymlink => flag(metadata, |m| m.file_type().is_symlink()),
        Attribute::Mode => metadata
            .map(|m| Value::String(mode_string(m)))
            .unwrap_or(Value::Null),
        Attribute::Uid => metadata.and_then(owner_ids).map(|(uid, _)| uid).unwrap_or(Value::Null),
        Attribute::Gid => metadata.and_then(owner_ids).map(|(_, gid)| gid).unwrap_or(Value::Null),
        Attribute::Modified => time(metadata.map(Metadata::modified)),
        Attribute::Accessed => time(metadata.map(Metadata::accessed)),
        Attribute::Created => time(metadata.map(Metadata::created)),
        Attribute::Mime => Value::String(mime_of(entry).to_string()),
    }
}

fn flag(metadata: Option<&Metadata>, f: impl Fn(&Metadata) -> bool) -> Value {
    metadata.map(|m| Value::Boolean(f(m))).unwrap_or(Value::Null)
}

fn time(result: Option<std::io::Result<std::time::SystemTime>>) -> Value {
    match result {
        Some(Ok(t)) => Value::Time(DateTime::<Utc>::from(t)),
        _ => Value::Null,
    }
}

fn mime_of(entry: &Entry) -> &'static str {
    match &entry.metadata {
        Some(m) if m.is_dir() => mime::DIRECTORY,
        Some(m) if m.file_type().is_symlink() => mime::SYMLINK,
        _ => entry
            .path
            .extension()
            .map(|ext| mime::from_extension(&ext.to_string_lossy()))
            .unwrap_or(mime::UNKNOWN),
    }
}

#[cfg(unix)]
fn owner_ids(metadata: &Metadata) -> Option<(Value, Value)> {
    use std::os::unix::fs::MetadataExt;
    Some((
        Value::Integer(metadata.uid() as i64),
        Value::Integer(metadata.gid() as i64),
    ))
}

#[cfg(not(unix))]
fn owner_ids(_metadata: &Metadata) -> Option<(Value, Value)> {
    None
}

#[cfg(unix)]
fn mode_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else {
        '-'
    };

    let mut result = String::with_capacity(10);
    result.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        result.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        result.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        result.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    result
}

#[cfg(not(unix))]
fn mode_string(metadata: &Metadata) -> String {
    let kind = if metadata.is_dir() { 'd' } else { '-' };
    let write = if metadata.permissions().readonly() { '-' } else { 'w' };
    format!("{}r{}-r{}-r{}-", kind, write, write, write)
}
