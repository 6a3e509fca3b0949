//! Import extraction: Python source → structured [`ImportStatement`]s.
//!
//! The extractor performs two passes over the input:
//! 1. **Logical lines**: physical lines are scrubbed of comments and string
//!    contents (tracking triple-quoted strings across lines), then joined
//!    across backslash and parenthesis continuations.
//! 2. **Statement parse**: logical lines opening with `import` or `from` are
//!    tokenized and parsed into import statements, preserving source order.
//!
//! The parser is hand-rolled (no external parser dependency) for full control
//! over error messages and the small fixed grammar. It parses the syntax of
//! the *scanned* language — Python import grammar — regardless of what the
//! rest of the file contains. Malformed import statements raise a
//! distinguished [`ExtractError::ParseFailure`]; callers downgrade that to a
//! warning-severity violation instead of aborting a batch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use crate::error::ExtractError;

/// A structured import statement from Python code.
///
/// A plain `import a.b, c` yields one statement per imported module; a
/// `from a.b import x, y` yields exactly one statement listing both names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStatement {
    /// Dotted module being imported (e.g. "src.storage.gcs"). Empty for
    /// purely relative `from . import x`.
    pub module: String,
    /// Imported names. For plain imports this is the alias (or the module
    /// itself); for from-imports, the names listed after `import`.
    pub names: Vec<String>,
    /// Relative import level: number of leading dots, 0 for absolute.
    pub level: usize,
    /// File containing this import.
    pub source_file: PathBuf,
    /// 1-based line where the statement starts.
    pub line_number: usize,
    /// True for `from X import Y` statements.
    pub is_from_import: bool,
}

impl ImportStatement {
    /// The dotted module in directory form: dots become `/`, with a trailing
    /// `/` so it compares prefix-wise against ownership entries
    /// (e.g. "a.b.c" → "a/b/c/").
    pub fn module_path(&self) -> String {
        if self.module.is_empty() {
            return String::new();
        }
        format!("{}/", self.module.replace('.', "/"))
    }
}

/// Extract all import statements from a Python file, in source order.
///
/// Non-Python extensions yield an empty sequence rather than an error; a
/// missing file is a distinguished [`ExtractError::NotFound`].
pub fn extract_imports(path: &Path) -> Result<Vec<ImportStatement>, ExtractError> {
    if path.extension().and_then(|e| e.to_str()) != Some("py") {
        return Ok(Vec::new());
    }

    let source = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ExtractError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_source(&source, path)
}

/// Parse already-read Python source into import statements.
pub fn parse_source(source: &str, path: &Path) -> Result<Vec<ImportStatement>, ExtractError> {
    let mut imports = Vec::new();
    for line in logical_lines(source, path)? {
        let trimmed = line.text.trim();
        if opens_statement(trimmed, "import") || opens_statement(trimmed, "from") {
            let tokens = tokenize(trimmed, line.number, path)?;
            imports.extend(parse_statement(&tokens, line.number, path)?);
        }
    }
    trace!(file = %path.display(), count = imports.len(), "extracted imports");
    Ok(imports)
}

/// Whether a scrubbed line begins with the given keyword.
fn opens_statement(line: &str, keyword: &str) -> bool {
    line == keyword
        || line
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.starts_with([' ', '\t', '.', '(']))
}

// ---------------------------------------------------------------------------
// Pass 1: logical lines
// ---------------------------------------------------------------------------

struct LogicalLine {
    text: String,
    /// Line number of the first physical line.
    number: usize,
}

/// Scrub comments and string contents, then join continuation lines.
///
/// String contents are blanked (quotes kept) so that a `#`, `(`, or keyword
/// inside a literal can never confuse statement assembly. Only parentheses
/// opened by an `import`/`from` line extend it; an unbalanced paren at end of
/// input is a parse failure.
fn logical_lines(source: &str, path: &Path) -> Result<Vec<LogicalLine>, ExtractError> {
    let mut lines = Vec::new();
    let mut scrubber = Scrubber::default();
    let mut pending: Option<LogicalLine> = None;
    let mut depth: usize = 0;
    let mut last_number = 0;

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        last_number = number;
        let scrubbed = scrubber.scrub(raw);

        match pending.take() {
            Some(mut line) => {
                depth = depth
                    .saturating_add(count(&scrubbed, '('))
                    .saturating_sub(count(&scrubbed, ')'));
                line.text.push(' ');
                line.text
                    .push_str(scrubbed.trim_end_matches('\\').trim());
                let continues = depth > 0 || scrubbed.trim_end().ends_with('\\');
                if continues {
                    pending = Some(line);
                } else {
                    lines.push(line);
                }
            }
            None => {
                let trimmed = scrubbed.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let is_import =
                    opens_statement(trimmed, "import") || opens_statement(trimmed, "from");
                depth = if is_import {
                    count(&scrubbed, '(').saturating_sub(count(&scrubbed, ')'))
                } else {
                    0
                };
                let continues =
                    is_import && (depth > 0 || scrubbed.trim_end().ends_with('\\'));
                let line = LogicalLine {
                    text: trimmed.trim_end_matches('\\').trim().to_string(),
                    number,
                };
                if continues {
                    pending = Some(line);
                } else {
                    lines.push(line);
                }
            }
        }
    }

    if pending.is_some() {
        return Err(ExtractError::ParseFailure {
            path: path.to_path_buf(),
            line: last_number,
            message: "unexpected end of file inside import statement".to_string(),
        });
    }

    Ok(lines)
}

fn count(text: &str, ch: char) -> usize {
    text.chars().filter(|c| *c == ch).count()
}

/// Streaming comment/string scrubber carrying triple-quote state across lines.
#[derive(Default)]
struct Scrubber {
    /// Open triple-quote delimiter, if we are inside a multi-line string.
    in_triple: Option<char>,
}

impl Scrubber {
    /// Return the line with comments removed and string contents blanked.
    fn scrub(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            if let Some(quote) = self.in_triple {
                if chars[i] == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
                {
                    self.in_triple = None;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }

            let c = chars[i];
            match c {
                '#' => break,
                '\'' | '"' => {
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        self.in_triple = Some(c);
                        i += 3;
                    } else {
                        // Single-line string: skip to the closing quote,
                        // honoring backslash escapes. Unterminated strings
                        // swallow the rest of the line.
                        i += 1;
                        while i < chars.len() {
                            if chars[i] == '\\' {
                                i += 2;
                            } else if chars[i] == c {
                                i += 1;
                                break;
                            } else {
                                i += 1;
                            }
                        }
                        out.push_str("''");
                    }
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        out
    }
}

// ---------------------------------------------------------------------------
// Pass 2: statement tokens and parse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Star,
}

fn tokenize(text: &str, line: usize, path: &Path) -> Result<Vec<Tok>, ExtractError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '.' => {
                chars.next();
                tokens.push(Tok::Dot);
            }
            ',' => {
                chars.next();
                tokens.push(Tok::Comma);
            }
            '(' => {
                chars.next();
                tokens.push(Tok::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Tok::RParen);
            }
            '*' => {
                chars.next();
                tokens.push(Tok::Star);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Ident(ident));
            }
            // Leftover quotes from scrubbed string literals land here too:
            // a string has no business inside an import statement.
            other => {
                return Err(ExtractError::ParseFailure {
                    path: path.to_path_buf(),
                    line,
                    message: format!("unexpected character `{other}` in import statement"),
                });
            }
        }
    }

    Ok(tokens)
}

/// Cursor over a token slice with parse-failure helpers.
struct Cursor<'a> {
    tokens: &'a [Tok],
    pos: usize,
    line: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Tok> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn fail(&self, message: impl Into<String>) -> ExtractError {
        ExtractError::ParseFailure {
            path: self.path.to_path_buf(),
            line: self.line,
            message: message.into(),
        }
    }

    /// Parse `ident (DOT ident)*` into a dotted name.
    fn dotted_name(&mut self) -> Result<String, ExtractError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some(Tok::Ident(name)) => {
                    parts.push(name.clone());
                    self.pos += 1;
                }
                _ => {
                    return Err(self.fail(if parts.is_empty() {
                        "expected module name".to_string()
                    } else {
                        "dangling `.` in module name".to_string()
                    }));
                }
            }
            if matches!(self.peek(), Some(Tok::Dot)) {
                self.pos += 1;
            } else {
                return Ok(parts.join("."));
            }
        }
    }
}

fn parse_statement(
    tokens: &[Tok],
    line: usize,
    path: &Path,
) -> Result<Vec<ImportStatement>, ExtractError> {
    let mut cursor = Cursor {
        tokens,
        pos: 0,
        line,
        path,
    };

    match cursor.bump() {
        Some(Tok::Ident(kw)) if kw == "import" => parse_plain_import(&mut cursor),
        Some(Tok::Ident(kw)) if kw == "from" => parse_from_import(&mut cursor),
        _ => Err(cursor.fail("expected `import` or `from`")),
    }
}

/// `import a.b [as x], c.d [as y], ...` — one statement per module.
fn parse_plain_import(cursor: &mut Cursor<'_>) -> Result<Vec<ImportStatement>, ExtractError> {
    let mut statements = Vec::new();

    loop {
        if cursor.at_end() {
            return Err(cursor.fail("expected module name after `import`"));
        }
        let module = cursor.dotted_name()?;
        let name = match cursor.peek() {
            Some(Tok::Ident(kw)) if kw == "as" => {
                cursor.pos += 1;
                match cursor.bump() {
                    Some(Tok::Ident(alias)) => alias.clone(),
                    _ => return Err(cursor.fail("expected alias after `as`")),
                }
            }
            _ => module.clone(),
        };

        statements.push(ImportStatement {
            module,
            names: vec![name],
            level: 0,
            source_file: cursor.path.to_path_buf(),
            line_number: cursor.line,
            is_from_import: false,
        });

        match cursor.bump() {
            None => return Ok(statements),
            Some(Tok::Comma) => continue,
            Some(_) => return Err(cursor.fail("expected `,` between imported modules")),
        }
    }
}

/// `from [dots]module import x [as a], y` — exactly one statement.
fn parse_from_import(cursor: &mut Cursor<'_>) -> Result<Vec<ImportStatement>, ExtractError> {
    let mut level = 0;
    while matches!(cursor.peek(), Some(Tok::Dot)) {
        cursor.pos += 1;
        level += 1;
    }

    let module = match cursor.peek() {
        Some(Tok::Ident(kw)) if kw == "import" && level > 0 => String::new(),
        Some(Tok::Ident(_)) => cursor.dotted_name()?,
        _ => return Err(cursor.fail("expected module name after `from`")),
    };

    if module.is_empty() && level == 0 {
        return Err(cursor.fail("expected module name after `from`"));
    }

    match cursor.bump() {
        Some(Tok::Ident(kw)) if kw == "import" => {}
        _ => return Err(cursor.fail("expected `import` after module name")),
    }

    let names = parse_name_list(cursor)?;

    Ok(vec![ImportStatement {
        module,
        names,
        level,
        source_file: cursor.path.to_path_buf(),
        line_number: cursor.line,
        is_from_import: true,
    }])
}

/// `*` | `( name [as alias], ... [,] )` | `name [as alias], ...`
///
/// Records the imported names, not their aliases, since boundary checks care
/// about what was reached into, not what it was locally called.
fn parse_name_list(cursor: &mut Cursor<'_>) -> Result<Vec<String>, ExtractError> {
    if matches!(cursor.peek(), Some(Tok::Star)) {
        cursor.pos += 1;
        if !cursor.at_end() {
            return Err(cursor.fail("unexpected tokens after `import *`"));
        }
        return Ok(vec!["*".to_string()]);
    }

    let parenthesized = matches!(cursor.peek(), Some(Tok::LParen));
    if parenthesized {
        cursor.pos += 1;
    }

    let mut names = Vec::new();
    loop {
        match cursor.peek() {
            Some(Tok::Ident(name)) => {
                names.push(name.clone());
                cursor.pos += 1;
            }
            Some(Tok::RParen) if parenthesized && !names.is_empty() => {
                // Trailing comma before the closing paren.
                break;
            }
            _ => return Err(cursor.fail("expected imported name")),
        }

        // Optional alias.
        if let Some(Tok::Ident(kw)) = cursor.peek() {
            if kw == "as" {
                cursor.pos += 1;
                match cursor.bump() {
                    Some(Tok::Ident(_)) => {}
                    _ => return Err(cursor.fail("expected alias after `as`")),
                }
            }
        }

        match cursor.peek() {
            Some(Tok::Comma) => {
                cursor.pos += 1;
            }
            Some(Tok::RParen) if parenthesized => break,
            None if !parenthesized => return Ok(names),
            _ => return Err(cursor.fail("expected `,` between imported names")),
        }
    }

    // Consume the closing paren and require the statement to end there.
    cursor.pos += 1;
    if !cursor.at_end() {
        return Err(cursor.fail("unexpected tokens after import list"));
    }
    Ok(names)
}
