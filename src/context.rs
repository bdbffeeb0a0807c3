//! The context registry: the catalog of attributes and functions a query can
//! reference.
//!
//! The registry is built once, at startup, and is read-only afterwards. The
//! parser resolves every identifier through it and the evaluator dispatches on
//! the [`Attribute`] and [`Function`] values it hands out. Lookups accept the
//! canonical name or any alias, case-insensitively.
//!
//! ```
//! use fsq_lang::context::{Attribute, Registry};
//!
//! let registry = Registry::builtin();
//! let def = registry.attribute_by_name("MTIME").unwrap();
//! assert_eq!(def.attribute, Attribute::Modified);
//! assert_eq!(def.name(), "modified");
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::value::ValueKind;

/// File metadata fields that can appear in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Name,
    Path,
    AbsPath,
    Dir,
    Extension,
    Size,
    Depth,
    IsDir,
    IsFile,
    IsSymlink,
    IsHidden,
    Mode,
    Uid,
    Gid,
    Modified,
    Accessed,
    Created,
    Mime,
}

impl Attribute {
    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Name => "name",
            Attribute::Path => "path",
            Attribute::AbsPath => "abspath",
            Attribute::Dir => "dir",
            Attribute::Extension => "extension",
            Attribute::Size => "size",
            Attribute::Depth => "depth",
            Attribute::IsDir => "is_dir",
            Attribute::IsFile => "is_file",
            Attribute::IsSymlink => "is_symlink",
            Attribute::IsHidden => "is_hidden",
            Attribute::Mode => "mode",
            Attribute::Uid => "uid",
            Attribute::Gid => "gid",
            Attribute::Modified => "modified",
            Attribute::Accessed => "accessed",
            Attribute::Created => "created",
            Attribute::Mime => "mime",
        }
    }
}

/// Built-in functions. Scalar functions map one row's values to a value;
/// aggregates fold the whole filtered row set into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Lower,
    Upper,
    Length,
    Trim,
    Concat,
    Substr,
    Replace,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    FmtSize,
    FmtTime,
    Year,
    Month,
    Day,
    Abs,
    Round,
    Coalesce,
    IsText,
    IsImage,
    IsPdf,
    IsAudio,
    IsVideo,
    IsArchive,
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl Function {
    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Length => "length",
            Function::Trim => "trim",
            Function::Concat => "concat",
            Function::Substr => "substr",
            Function::Replace => "replace",
            Function::Contains => "contains",
            Function::StartsWith => "startsWith",
            Function::EndsWith => "endsWith",
            Function::Matches => "matches",
            Function::FmtSize => "fmtSize",
            Function::FmtTime => "fmtTime",
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Coalesce => "coalesce",
            Function::IsText => "isText",
            Function::IsImage => "isImage",
            Function::IsPdf => "isPdf",
            Function::IsAudio => "isAudio",
            Function::IsVideo => "isVideo",
            Function::IsArchive => "isArchive",
            Function::Count => "count",
            Function::Sum => "sum",
            Function::Min => "min",
            Function::Max => "max",
            Function::Avg => "avg",
        }
    }

    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Function::Count | Function::Sum | Function::Min | Function::Max | Function::Avg
        )
    }
}

/// Accepted argument count of a function. `max: None` means variadic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Arity {
            min: n,
            max: Some(n),
        }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Arity {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Arity { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Where a function may be used, beyond the projection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Usable inside a `where` predicate
    Where,
}

#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub attribute: Attribute,
    pub aliases: &'static [&'static str],
    pub kind: ValueKind,
    pub description: &'static str,
    /// Included when a projection is written as `*`
    pub default_column: bool,
}

impl AttributeDef {
    pub fn name(&self) -> &'static str {
        self.attribute.name()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub function: Function,
    pub aliases: &'static [&'static str],
    pub arity: Arity,
    pub capabilities: &'static [Capability],
    pub description: &'static str,
}

impl FunctionDef {
    pub fn name(&self) -> &'static str {
        self.function.name()
    }

    pub fn is_aggregate(&self) -> bool {
        self.function.is_aggregate()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("alias '{alias}' is registered for both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Immutable catalog of attributes and functions with alias lookup.
#[derive(Debug, Clone)]
pub struct Registry {
    attributes: Vec<AttributeDef>,
    functions: Vec<FunctionDef>,
    attribute_index: HashMap<String, usize>,
    function_index: HashMap<String, usize>,
}

impl Registry {
    /// Builds a registry from explicit definitions.
    ///
    /// Canonical names count as aliases; an alias claimed twice within the
    /// attributes (or within the functions) is rejected.
    pub fn new(
        attributes: Vec<AttributeDef>,
        functions: Vec<FunctionDef>,
    ) -> Result<Self, RegistryError> {
        let attribute_index = build_index(attributes.iter().map(|def| (def.name(), def.aliases)))?;
        let function_index = build_index(functions.iter().map(|def| (def.name(), def.aliases)))?;

        Ok(Registry {
            attributes,
            functions,
            attribute_index,
            function_index,
        })
    }

    /// The built-in catalog.
    ///
    /// # Panics
    ///
    /// Panics if the built-in tables contain a duplicate alias, which is a
    /// configuration error in this crate rather than a runtime condition.
    pub fn builtin() -> Self {
        match Registry::new(builtin_attributes(), builtin_functions()) {
            Ok(registry) => registry,
            Err(e) => panic!("invalid built-in registry: {}", e),
        }
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&AttributeDef> {
        self.attribute_index
            .get(&name.to_lowercase())
            .map(|&i| &self.attributes[i])
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionDef> {
        self.function_index
            .get(&name.to_lowercase())
            .map(|&i| &self.functions[i])
    }

    pub fn attribute(&self, attribute: Attribute) -> Option<&AttributeDef> {
        self.attributes.iter().find(|def| def.attribute == attribute)
    }

    /// All attributes in registration order, aliases included
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// All functions in registration order, aliases included
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// Functions usable in a `where` clause
    pub fn where_functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions
            .iter()
            .filter(|def| def.has_capability(Capability::Where))
    }

    /// Attributes that `*` expands to, in registration order
    pub fn default_columns(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter().filter(|def| def.default_column)
    }

    /// One-line description of an attribute or function, looked up by any alias.
    pub fn describe(&self, term: &str) -> Option<String> {
        if let Some(def) = self.attribute_by_name(term) {
            return Some(format!(
                "{} ({} attribute{}): {}",
                def.name(),
                def.kind,
                format_aliases(def.aliases),
                def.description
            ));
        }

        self.function_by_name(term).map(|def| {
            let kind = if def.is_aggregate() {
                "aggregate"
            } else {
                "scalar"
            };
            format!(
                "{} ({} function, {} argument(s){}): {}",
                def.name(),
                kind,
                def.arity,
                format_aliases(def.aliases),
                def.description
            )
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builtin()
    }
}

fn format_aliases(aliases: &[&str]) -> String {
    if aliases.is_empty() {
        String::new()
    } else {
        format!("; aliases: {}", aliases.join(", "))
    }
}

fn build_index<'a>(
    entries: impl Iterator<Item = (&'static str, &'a [&'static str])>,
) -> Result<HashMap<String, usize>, RegistryError> {
    let mut index = HashMap::new();
    let mut owners: Vec<&'static str> = Vec::new();

    for (i, (name, aliases)) in entries.enumerate() {
        owners.push(name);
        for alias in std::iter::once(name).chain(aliases.iter().copied()) {
            let key = alias.to_lowercase();
            if let Some(&existing) = index.get(&key) {
                let first: &'static str = owners[existing];
                return Err(RegistryError::DuplicateAlias {
                    alias: alias.to_string(),
                    first,
                    second: name,
                });
            }
            index.insert(key, i);
        }
    }

    Ok(index)
}

fn attr(
    attribute: Attribute,
    aliases: &'static [&'static str],
    kind: ValueKind,
    description: &'static str,
) -> AttributeDef {
    AttributeDef {
        attribute,
        aliases,
        kind,
        description,
        default_column: false,
    }
}

fn builtin_attributes() -> Vec<AttributeDef> {
    use Attribute::*;

    let mut attributes = vec![
        attr(Name, &["filename"], ValueKind::String, "File name without the directory"),
        attr(Path, &[], ValueKind::String, "Path of the entry as reached from the source"),
        attr(
            AbsPath,
            &["absolute_path", "fullpath"],
            ValueKind::String,
            "Absolute path of the entry",
        ),
        attr(
            Dir,
            &["directory", "parent"],
            ValueKind::String,
            "Directory containing the entry",
        ),
        attr(Extension, &["ext"], ValueKind::String, "File extension without the dot"),
        attr(Size, &["bytes", "length_bytes"], ValueKind::Integer, "Size in bytes"),
        attr(
            Depth,
            &[],
            ValueKind::Integer,
            "Nesting depth below the source directory (immediate children are 1)",
        ),
        attr(IsDir, &["isdir"], ValueKind::Boolean, "Whether the entry is a directory"),
        attr(IsFile, &["isfile"], ValueKind::Boolean, "Whether the entry is a regular file"),
        attr(
            IsSymlink,
            &["issymlink", "symlink"],
            ValueKind::Boolean,
            "Whether the entry is a symbolic link",
        ),
        attr(
            IsHidden,
            &["hidden"],
            ValueKind::Boolean,
            "Whether the entry name starts with a dot",
        ),
        attr(
            Mode,
            &["permissions", "perms"],
            ValueKind::String,
            "Permission string, e.g. drwxr-xr-x",
        ),
        attr(Uid, &[], ValueKind::Integer, "Owner user id"),
        attr(Gid, &[], ValueKind::Integer, "Owner group id"),
        attr(
            Modified,
            &["mtime", "last_modified"],
            ValueKind::Time,
            "Last modification time",
        ),
        attr(Accessed, &["atime"], ValueKind::Time, "Last access time"),
        attr(
            Created,
            &["birthtime"],
            ValueKind::Time,
            "Creation time, where the platform records it",
        ),
        attr(
            Mime,
            &["mimetype", "mime_type"],
            ValueKind::String,
            "MIME type guessed from the extension",
        ),
    ];

    for def in attributes.iter_mut() {
        def.default_column = matches!(def.attribute, Name | Size | Mode | Modified | Path);
    }
    attributes
}

const WHERE: &[Capability] = &[Capability::Where];

fn scalar(
    function: Function,
    aliases: &'static [&'static str],
    arity: Arity,
    description: &'static str,
) -> FunctionDef {
    FunctionDef {
        function,
        aliases,
        arity,
        capabilities: WHERE,
        description,
    }
}

fn aggregate(
    function: Function,
    aliases: &'static [&'static str],
    arity: Arity,
    description: &'static str,
) -> FunctionDef {
    FunctionDef {
        function,
        aliases,
        arity,
        capabilities: &[],
        description,
    }
}

fn builtin_functions() -> Vec<FunctionDef> {
    use Function::*;

    vec![
        scalar(Lower, &["lcase"], Arity::exactly(1), "Converts a string to lowercase"),
        scalar(Upper, &["ucase"], Arity::exactly(1), "Converts a string to uppercase"),
        scalar(Length, &["len"], Arity::exactly(1), "Number of characters in a string"),
        scalar(Trim, &[], Arity::exactly(1), "Removes leading and trailing whitespace"),
        scalar(
            Concat,
            &[],
            Arity::at_least(1),
            "Joins the arguments as strings, skipping nulls",
        ),
        scalar(
            Substr,
            &["substring"],
            Arity::between(2, 3),
            "Substring from a 1-based start, optionally limited to a length",
        ),
        scalar(
            Replace,
            &[],
            Arity::exactly(3),
            "Replaces every occurrence of a pattern string",
        ),
        scalar(
            Contains,
            &[],
            Arity::exactly(2),
            "Whether the first string contains the second",
        ),
        scalar(
            StartsWith,
            &["starts_with"],
            Arity::exactly(2),
            "Whether the first string starts with the second",
        ),
        scalar(
            EndsWith,
            &["ends_with"],
            Arity::exactly(2),
            "Whether the first string ends with the second",
        ),
        scalar(
            Matches,
            &["regexp", "rlike"],
            Arity::exactly(2),
            "Whether the string matches a regular expression",
        ),
        scalar(
            FmtSize,
            &["format_size"],
            Arity::between(1, 2),
            "Formats a byte count with binary units, optionally with a precision",
        ),
        scalar(
            FmtTime,
            &["format_time"],
            Arity::between(1, 2),
            "Formats a time, optionally with a strftime pattern",
        ),
        scalar(Year, &[], Arity::exactly(1), "Year of a time value"),
        scalar(Month, &[], Arity::exactly(1), "Month (1-12) of a time value"),
        scalar(Day, &[], Arity::exactly(1), "Day of month of a time value"),
        scalar(Abs, &[], Arity::exactly(1), "Absolute value of a number"),
        scalar(
            Round,
            &[],
            Arity::between(1, 2),
            "Rounds a number, optionally to a number of decimal places",
        ),
        scalar(
            Coalesce,
            &["ifnull"],
            Arity::at_least(1),
            "First argument that is not null",
        ),
        scalar(IsText, &["is_text"], Arity::exactly(1), "Whether a MIME type denotes text"),
        scalar(IsImage, &["is_image"], Arity::exactly(1), "Whether a MIME type denotes an image"),
        scalar(IsPdf, &["is_pdf"], Arity::exactly(1), "Whether a MIME type denotes a PDF document"),
        scalar(IsAudio, &["is_audio"], Arity::exactly(1), "Whether a MIME type denotes audio"),
        scalar(IsVideo, &["is_video"], Arity::exactly(1), "Whether a MIME type denotes video"),
        scalar(
            IsArchive,
            &["is_archive"],
            Arity::exactly(1),
            "Whether a MIME type denotes an archive",
        ),
        aggregate(
            Count,
            &[],
            Arity::between(0, 1),
            "Number of matching entries, or of non-null argument values",
        ),
        aggregate(Sum, &["total"], Arity::exactly(1), "Sum of numeric values"),
        aggregate(Min, &[], Arity::exactly(1), "Smallest value"),
        aggregate(Max, &[], Arity::exactly(1), "Largest value"),
        aggregate(Avg, &["average", "mean"], Arity::exactly(1), "Average of numeric values"),
    ]
}
