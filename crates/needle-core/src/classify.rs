//! Single-pass line classifier.
//!
//! Each line is tagged by prefix/suffix matching against a mode register that
//! remembers the token closing the currently open block. Nothing is parsed:
//! block ends are found by comparing the right-trimmed raw line against that
//! remembered closer.

use std::path::Path;

use crate::deps::candidate_from_import;
use crate::error::{NeedleError, Result};
use crate::types::{CodeType, Line, LineKind, Tally};
use crate::visibility::Visibility;

const BODY_CLOSER: &str = "}";
const GROUP_CLOSER: &str = ")";
const COMMENT_CLOSER: &str = "*/";

/// Scanner state between two lines.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    None,
    /// Inside `/* ... */`.
    Comment,
    /// Inside `import ( ... )`.
    Header,
    /// Inside an error-handling block closed by `closer`.
    ErrorBlock { closer: String },
    FunctionBody { code: CodeType },
    TypeBody { code: CodeType },
    TypeGroup,
    ConstGroup,
    VarGroup,
}

impl Mode {
    /// Token that ends the open block, if any.
    fn closer(&self) -> Option<&str> {
        match self {
            Mode::None => None,
            Mode::Comment => Some(COMMENT_CLOSER),
            Mode::ErrorBlock { closer } => Some(closer),
            Mode::FunctionBody { .. } | Mode::TypeBody { .. } => Some(BODY_CLOSER),
            Mode::Header | Mode::TypeGroup | Mode::ConstGroup | Mode::VarGroup => {
                Some(GROUP_CLOSER)
            }
        }
    }

    fn is_closed_by(&self, raw: &str) -> bool {
        self.closer().is_some_and(|closer| raw.trim_end() == closer)
    }
}

/// Everything learned from one file's lines.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub lines: Vec<Line>,
    pub tally: Tally,
    /// Name from the first `package` clause.
    pub package_clause: Option<String>,
    /// Raw import paths, in source order, as written (still quoted).
    pub candidates: Vec<String>,
}

struct Scan {
    out: Classified,
    mode: Mode,
    /// Set once the first code or error line is seen; imports after it are ignored.
    past_header: bool,
}

pub struct Classifier<'a> {
    error_guard: String,
    error_suffix: String,
    visibility: &'a dyn Visibility,
}

impl<'a> Classifier<'a> {
    pub fn new(error_guard: &str, visibility: &'a dyn Visibility) -> Self {
        let error_guard = error_guard.trim().to_string();
        let error_suffix = format!("; {error_guard}");
        Self {
            error_guard,
            error_suffix,
            visibility,
        }
    }

    /// Read and classify one source file.
    pub fn classify_file(&self, path: &Path) -> Result<Classified> {
        let bytes = std::fs::read(path).map_err(|e| NeedleError::io(path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(self.classify(text.lines()))
    }

    pub fn classify<'l>(&self, lines: impl IntoIterator<Item = &'l str>) -> Classified {
        let start = Scan {
            out: Classified::default(),
            mode: Mode::None,
            past_header: false,
        };
        let scan = lines.into_iter().fold(start, |mut scan, raw| {
            let mode = std::mem::replace(&mut scan.mode, Mode::None);
            let (kind, next) = self.step(mode, raw, &mut scan);
            let line = Line::new(kind, raw);
            scan.out.tally.add_line(&line);
            scan.out.lines.push(line);
            scan.mode = next;
            scan
        });
        scan.out
    }

    fn step(&self, mode: Mode, raw: &str, scan: &mut Scan) -> (LineKind, Mode) {
        let clean = raw.trim();

        if clean.is_empty() {
            return (LineKind::Blank, mode);
        }

        if clean.starts_with("//") {
            return (LineKind::Comment, mode);
        }
        if clean.starts_with("/*") {
            let closes = clean.len() >= 4 && clean.ends_with(COMMENT_CLOSER);
            let next = if closes { mode } else { Mode::Comment };
            return (LineKind::Comment, next);
        }
        if mode == Mode::Comment {
            let next = if clean.ends_with(COMMENT_CLOSER) {
                Mode::None
            } else {
                mode
            };
            return (LineKind::Comment, next);
        }

        if let Some(rest) = clean.strip_prefix("package ") {
            if scan.out.package_clause.is_none() {
                scan.out.package_clause = rest.split_whitespace().next().map(str::to_string);
            }
            return (LineKind::Header, mode);
        }
        if let Some(rest) = import_target(clean) {
            if rest.ends_with('(') {
                return (LineKind::Header, Mode::Header);
            }
            self.record_candidate(scan, rest);
            return (LineKind::Header, mode);
        }
        if mode == Mode::Header {
            if mode.is_closed_by(clean) {
                return (LineKind::Header, Mode::None);
            }
            self.record_candidate(scan, clean);
            return (LineKind::Header, mode);
        }

        scan.past_header = true;

        if clean == self.error_guard || clean.ends_with(&self.error_suffix) {
            let closer = format!("{}{BODY_CLOSER}", indentation(raw));
            return (LineKind::ErrorBlock, Mode::ErrorBlock { closer });
        }
        if let Mode::ErrorBlock { .. } = mode {
            let next = if mode.is_closed_by(raw) { Mode::None } else { mode };
            return (LineKind::ErrorBlock, next);
        }

        let (code, next) = self.code_line(mode, raw, clean, &mut scan.out.tally);
        (LineKind::Code(code), next)
    }

    /// Sub-type of a code line and the mode after it.
    fn code_line(
        &self,
        mode: Mode,
        raw: &str,
        clean: &str,
        tally: &mut Tally,
    ) -> (CodeType, Mode) {
        if raw.starts_with("func ") {
            let code = self.classify_function(clean);
            tally.add_declaration(code);
            let next = if opens_body(clean) {
                Mode::FunctionBody { code }
            } else {
                Mode::None
            };
            return (code, next);
        }
        if let Mode::FunctionBody { code } = mode {
            let next = if mode.is_closed_by(raw) { Mode::None } else { mode };
            return (code, next);
        }

        if raw.starts_with("type ") {
            let code = self.classify_type(clean);
            if code == CodeType::Group {
                return (code, Mode::TypeGroup);
            }
            tally.add_declaration(code);
            let next = if code.is_alias() || !opens_body(clean) {
                Mode::None
            } else {
                Mode::TypeBody { code }
            };
            return (code, next);
        }
        if let Mode::TypeBody { code } = mode {
            let next = if mode.is_closed_by(raw) { Mode::None } else { mode };
            return (code, next);
        }
        if mode == Mode::TypeGroup {
            if mode.is_closed_by(raw) {
                return (CodeType::Group, Mode::None);
            }
            let code = self.classify_type(&format!("type {clean}"));
            tally.add_declaration(code);
            return (code, mode);
        }

        if raw.starts_with("const ") || raw.starts_with("var ") {
            let code = self.classify_global(clean);
            if code == CodeType::Group {
                let next = if raw.starts_with("const ") {
                    Mode::ConstGroup
                } else {
                    Mode::VarGroup
                };
                return (code, next);
            }
            tally.add_declaration(code);
            return (code, Mode::None);
        }
        if mode == Mode::ConstGroup || mode == Mode::VarGroup {
            if mode.is_closed_by(raw) {
                return (CodeType::Group, Mode::None);
            }
            let keyword = if mode == Mode::ConstGroup { "const" } else { "var" };
            let code = self.classify_global(&format!("{keyword} {clean}"));
            tally.add_declaration(code);
            return (code, mode);
        }

        (CodeType::NotCode, mode)
    }

    fn record_candidate(&self, scan: &mut Scan, line: &str) {
        if scan.past_header {
            return;
        }
        if let Some(candidate) = candidate_from_import(line) {
            scan.out.candidates.push(candidate.to_string());
        }
    }

    /// `func Name(...)` or `func (recv) Name(...)`.
    pub fn classify_function(&self, line: &str) -> CodeType {
        let second = line.split_whitespace().nth(1).unwrap_or_default();
        if second.starts_with('(') {
            let name = line.split(')').nth(1).map(str::trim).unwrap_or_default();
            if self.visibility.is_public(name) {
                CodeType::PubMethod
            } else {
                CodeType::PrivMethod
            }
        } else if self.visibility.is_public(second) {
            CodeType::PubFunction
        } else {
            CodeType::PrivFunction
        }
    }

    /// `type (`, `type Name interface {`, `type Name struct {`, or an alias.
    pub fn classify_type(&self, line: &str) -> CodeType {
        let second = line.split_whitespace().nth(1).unwrap_or_default();
        if second == "(" {
            return CodeType::Group;
        }
        let public = self.visibility.is_public(second);
        match (public, line) {
            (true, l) if l.ends_with(" interface {") => CodeType::PubInterface,
            (false, l) if l.ends_with(" interface {") => CodeType::PrivInterface,
            (true, l) if l.ends_with(" struct {") => CodeType::PubStruct,
            (false, l) if l.ends_with(" struct {") => CodeType::PrivStruct,
            (true, _) => CodeType::PubAlias,
            (false, _) => CodeType::PrivAlias,
        }
    }

    /// `const (`/`var (`, or a single const/var declaration.
    pub fn classify_global(&self, line: &str) -> CodeType {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();
        if second == "(" {
            return CodeType::Group;
        }
        let public = self.visibility.is_public(second);
        match (keyword == "const", public) {
            (true, true) => CodeType::PubConst,
            (true, false) => CodeType::PrivConst,
            (false, true) => CodeType::PubVar,
            (false, false) => CodeType::PrivVar,
        }
    }
}

/// Text after the `import` keyword, if the line is an import statement.
fn import_target(clean: &str) -> Option<&str> {
    let rest = clean.strip_prefix("import")?;
    if rest.starts_with(' ') || rest.starts_with('(') {
        Some(rest.trim())
    } else {
        None
    }
}

/// `func f() {}` and `type t struct{}` close on the same line.
fn opens_body(clean: &str) -> bool {
    !clean.ends_with(BODY_CLOSER)
}

fn indentation(raw: &str) -> &str {
    &raw[..raw.len() - raw.trim_start().len()]
}
