use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key of the module root folder in the tree, and its display package name.
pub const ROOT_KEY: &str = "/";

/// Whether a package builds an executable or a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Main,
    #[default]
    Lib,
}

impl PackageKind {
    /// `package main` declares an executable; everything else is a library.
    pub fn from_clause(name: &str) -> Self {
        if name == "main" {
            PackageKind::Main
        } else {
            PackageKind::Lib
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::Main => write!(f, "main"),
            PackageKind::Lib => write!(f, "lib"),
        }
    }
}

/// Ordinary source file vs test file, decided by filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Code,
    Test,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Code => write!(f, "code"),
            FileKind::Test => write!(f, "test"),
        }
    }
}

/// Structural category of one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Code,
    ErrorBlock,
    Header,
    Comment,
    Blank,
}

impl LineType {
    pub const ALL: [LineType; 5] = [
        LineType::Code,
        LineType::ErrorBlock,
        LineType::Header,
        LineType::Comment,
        LineType::Blank,
    ];
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineType::Code => write!(f, "code"),
            LineType::ErrorBlock => write!(f, "error"),
            LineType::Header => write!(f, "header"),
            LineType::Comment => write!(f, "comment"),
            LineType::Blank => write!(f, "blank"),
        }
    }
}

/// Declaration family a counted declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Function,
    Type,
    Global,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Function => write!(f, "function"),
            BlockType::Type => write!(f, "type"),
            BlockType::Global => write!(f, "global"),
        }
    }
}

/// Declaration sub-type of a code line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    NotCode,
    Group,
    PubFunction,
    PrivFunction,
    PubMethod,
    PrivMethod,
    PubStruct,
    PrivStruct,
    PubInterface,
    PrivInterface,
    PubAlias,
    PrivAlias,
    PubConst,
    PrivConst,
    PubVar,
    PrivVar,
}

impl CodeType {
    pub const FUNCTIONS: [CodeType; 4] = [
        CodeType::PubFunction,
        CodeType::PrivFunction,
        CodeType::PubMethod,
        CodeType::PrivMethod,
    ];

    pub const TYPES: [CodeType; 6] = [
        CodeType::PubStruct,
        CodeType::PrivStruct,
        CodeType::PubInterface,
        CodeType::PrivInterface,
        CodeType::PubAlias,
        CodeType::PrivAlias,
    ];

    pub const GLOBALS: [CodeType; 4] = [
        CodeType::PubConst,
        CodeType::PrivConst,
        CodeType::PubVar,
        CodeType::PrivVar,
    ];

    /// The declaration family this sub-type is counted under, if any.
    pub fn block(&self) -> Option<BlockType> {
        match self {
            CodeType::NotCode | CodeType::Group => None,
            CodeType::PubFunction
            | CodeType::PrivFunction
            | CodeType::PubMethod
            | CodeType::PrivMethod => Some(BlockType::Function),
            CodeType::PubStruct
            | CodeType::PrivStruct
            | CodeType::PubInterface
            | CodeType::PrivInterface
            | CodeType::PubAlias
            | CodeType::PrivAlias => Some(BlockType::Type),
            CodeType::PubConst | CodeType::PrivConst | CodeType::PubVar | CodeType::PrivVar => {
                Some(BlockType::Global)
            }
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, CodeType::PubAlias | CodeType::PrivAlias)
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CodeType::NotCode => "not_code",
            CodeType::Group => "group",
            CodeType::PubFunction => "pub_function",
            CodeType::PrivFunction => "priv_function",
            CodeType::PubMethod => "pub_method",
            CodeType::PrivMethod => "priv_method",
            CodeType::PubStruct => "pub_struct",
            CodeType::PrivStruct => "priv_struct",
            CodeType::PubInterface => "pub_interface",
            CodeType::PrivInterface => "priv_interface",
            CodeType::PubAlias => "pub_alias",
            CodeType::PrivAlias => "priv_alias",
            CodeType::PubConst => "pub_const",
            CodeType::PrivConst => "priv_const",
            CodeType::PubVar => "pub_var",
            CodeType::PrivVar => "priv_var",
        };
        write!(f, "{label}")
    }
}

/// Classification of one line. Only code lines carry a declaration sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum LineKind {
    Code(CodeType),
    ErrorBlock,
    Header,
    Comment,
    Blank,
}

impl LineKind {
    pub fn line_type(&self) -> LineType {
        match self {
            LineKind::Code(_) => LineType::Code,
            LineKind::ErrorBlock => LineType::ErrorBlock,
            LineKind::Header => LineType::Header,
            LineKind::Comment => LineType::Comment,
            LineKind::Blank => LineType::Blank,
        }
    }
}

/// One physical source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub kind: LineKind,
    /// Character count of the raw line; blank lines count as 1.
    pub length: usize,
}

impl Line {
    pub fn new(kind: LineKind, raw: &str) -> Self {
        let length = match kind {
            LineKind::Blank => 1,
            _ => raw.chars().count(),
        };
        Self { kind, length }
    }

    pub fn line_type(&self) -> LineType {
        self.kind.line_type()
    }
}

/// Counters kept identically at file, package, and module level.
///
/// Every field is a plain sum, so [`Tally::merge`] is commutative and the
/// order in which concurrent results arrive does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub blocks: BTreeMap<BlockType, usize>,
    pub codes: BTreeMap<CodeType, usize>,
    pub lines: BTreeMap<LineType, usize>,
    pub chars: BTreeMap<LineType, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one declaration under its sub-type and family.
    pub fn add_declaration(&mut self, code: CodeType) {
        if let Some(block) = code.block() {
            *self.blocks.entry(block).or_default() += 1;
            *self.codes.entry(code).or_default() += 1;
        }
    }

    /// Count one classified line under its line type.
    pub fn add_line(&mut self, line: &Line) {
        let line_type = line.line_type();
        *self.lines.entry(line_type).or_default() += 1;
        *self.chars.entry(line_type).or_default() += line.length;
    }

    pub fn merge(&mut self, other: &Tally) {
        for (k, v) in &other.blocks {
            *self.blocks.entry(*k).or_default() += v;
        }
        for (k, v) in &other.codes {
            *self.codes.entry(*k).or_default() += v;
        }
        for (k, v) in &other.lines {
            *self.lines.entry(*k).or_default() += v;
        }
        for (k, v) in &other.chars {
            *self.chars.entry(*k).or_default() += v;
        }
    }

    pub fn block(&self, block: BlockType) -> usize {
        self.blocks.get(&block).copied().unwrap_or(0)
    }

    pub fn code(&self, code: CodeType) -> usize {
        self.codes.get(&code).copied().unwrap_or(0)
    }

    pub fn lines_of(&self, line_type: LineType) -> usize {
        self.lines.get(&line_type).copied().unwrap_or(0)
    }

    pub fn chars_of(&self, line_type: LineType) -> usize {
        self.chars.get(&line_type).copied().unwrap_or(0)
    }

    pub fn line_count(&self) -> usize {
        self.lines.values().sum()
    }

    pub fn char_count(&self) -> usize {
        self.chars.values().sum()
    }
}

/// One filesystem folder inside the module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

impl Node {
    /// Folders without source files are traversed but never become packages.
    pub fn is_package(&self) -> bool {
        !self.files.is_empty()
    }
}

/// One classified source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub kind: FileKind,
    /// Name from the file's `package` clause, if it had one.
    pub package_clause: Option<String>,
    pub lines: Vec<Line>,
    /// Dependency name => is internal.
    pub deps: BTreeMap<String, bool>,
    pub tally: Tally,
}

impl File {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.length).sum()
    }
}

/// Aggregate over all source files in one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Display name (`sub/dir`, or `/` for the module root).
    pub name: String,
    /// Tree key of the folder (`/sub/dir`, or `/`).
    pub folder: String,
    pub kind: PackageKind,
    /// Files sorted by name.
    pub files: Vec<File>,
    /// Dependency name => is internal. Internal names are tree keys.
    pub deps: BTreeMap<String, bool>,
    pub tally: Tally,
}

impl Package {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn line_count(&self) -> usize {
        self.tally.line_count()
    }

    pub fn char_count(&self) -> usize {
        self.tally.char_count()
    }

    pub fn internal_deps(&self) -> impl Iterator<Item = &str> {
        self.deps
            .iter()
            .filter(|(_, internal)| **internal)
            .map(|(name, _)| name.as_str())
    }

    pub fn external_deps(&self) -> impl Iterator<Item = &str> {
        self.deps
            .iter()
            .filter(|(_, internal)| !**internal)
            .map(|(name, _)| name.as_str())
    }
}

/// File, line, and char totals split by file kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub package_count: usize,
    pub file_count: usize,
    pub files: BTreeMap<FileKind, usize>,
    pub lines: BTreeMap<FileKind, usize>,
    pub chars: BTreeMap<FileKind, usize>,
}

impl Stats {
    pub fn add_file(&mut self, file: &File) {
        self.file_count += 1;
        *self.files.entry(file.kind).or_default() += 1;
        *self.lines.entry(file.kind).or_default() += file.line_count();
        *self.chars.entry(file.kind).or_default() += file.char_count();
    }

    pub fn files_of(&self, kind: FileKind) -> usize {
        self.files.get(&kind).copied().unwrap_or(0)
    }

    pub fn lines_of(&self, kind: FileKind) -> usize {
        self.lines.get(&kind).copied().unwrap_or(0)
    }

    pub fn chars_of(&self, kind: FileKind) -> usize {
        self.chars.get(&kind).copied().unwrap_or(0)
    }
}
