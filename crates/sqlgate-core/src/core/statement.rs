// crates/sqlgate-core/src/core/statement.rs
// ============================================================================
// Module: SQL Gate Statement Compiler
// Description: Placeholder extraction and shape classification for SQL text.
// Purpose: Validate statement templates once, before they reach an engine.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`compile`] scans SQL text with a small lexer that understands string
//! literals, quoted identifiers, and comments. It collects `:name`
//! placeholders in order of first appearance and rejects every other
//! parameter syntax (`?`, `?NNN`, `@name`, `$name`) so bindings are always
//! matched by name. The SQL text is trimmed but otherwise passed through
//! unmodified; the engine prepares it exactly as written.
//!
//! Security posture: the compiler never rewrites SQL. Parameter values are
//! bound by the engine and cannot alter statement structure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum SQL text size accepted by the compiler.
pub const MAX_STATEMENT_BYTES: usize = 64 * 1024;
/// Maximum number of distinct placeholders in one statement.
pub const MAX_PLACEHOLDERS: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Statement compilation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Statement contains no SQL after trimming whitespace and comments.
    #[error("statement is empty")]
    Empty,
    /// Statement exceeds the size limit.
    #[error("statement exceeds {max} bytes")]
    TooLarge {
        /// Configured limit.
        max: usize,
    },
    /// A `:` is not followed by a valid placeholder name.
    #[error("malformed placeholder at byte {offset}")]
    MalformedPlaceholder {
        /// Byte offset of the `:`.
        offset: usize,
    },
    /// Parameter syntax other than `:name` was used.
    #[error("unsupported parameter syntax `{token}` at byte {offset}; use :name placeholders")]
    UnsupportedParameter {
        /// Offending marker character.
        token: char,
        /// Byte offset of the marker.
        offset: usize,
    },
    /// A literal, quoted identifier, or comment never closes.
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated {
        /// Construct that was left open.
        what: &'static str,
        /// Byte offset where it opened.
        offset: usize,
    },
    /// More than one statement in the text.
    #[error("multiple statements are not supported (extra text at byte {offset})")]
    MultipleStatements {
        /// Byte offset of the second statement.
        offset: usize,
    },
    /// Too many distinct placeholders.
    #[error("statement declares more than {max} placeholders")]
    TooManyPlaceholders {
        /// Configured limit.
        max: usize,
    },
}

// ============================================================================
// SECTION: Compiled Statements
// ============================================================================

/// Coarse statement classification derived from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// Read-only statement (`SELECT`, `VALUES`, `PRAGMA`, `EXPLAIN`).
    Read,
    /// Writing or schema statement (`INSERT`, `UPDATE`, `CREATE`, ...).
    Write,
    /// Statement whose intent is not visible from the first keyword (`WITH`).
    Either,
}

impl StatementShape {
    /// Returns true when the statement may be registered as a query.
    #[must_use]
    pub const fn allows_query(self) -> bool {
        matches!(self, Self::Read | Self::Either)
    }

    /// Returns true when the statement may be registered as a mutation.
    #[must_use]
    pub const fn allows_mutation(self) -> bool {
        matches!(self, Self::Write | Self::Either)
    }
}

/// A validated SQL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    /// Trimmed SQL text handed to the engine.
    sql: String,
    /// Distinct placeholder names, in order of first appearance.
    placeholders: Vec<String>,
    /// Upper-cased leading keyword, if any.
    keyword: Option<String>,
}

impl CompiledStatement {
    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns placeholder names (without the leading `:`).
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Returns the upper-cased leading keyword.
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// Classifies the statement by its leading keyword.
    #[must_use]
    pub fn shape(&self) -> StatementShape {
        match self.keyword.as_deref() {
            Some("SELECT" | "VALUES" | "PRAGMA" | "EXPLAIN") => StatementShape::Read,
            Some("WITH") | None => StatementShape::Either,
            Some(_) => StatementShape::Write,
        }
    }
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.sql.fmt(f)
    }
}

// ============================================================================
// SECTION: Compiler
// ============================================================================

/// Compiles SQL text into a [`CompiledStatement`].
///
/// # Errors
///
/// Returns [`CompileError`] when the text is empty, oversized, contains more
/// than one statement, leaves a literal or comment open, or uses a parameter
/// syntax other than `:name`.
pub fn compile(sql: &str) -> Result<CompiledStatement, CompileError> {
    if sql.len() > MAX_STATEMENT_BYTES {
        return Err(CompileError::TooLarge {
            max: MAX_STATEMENT_BYTES,
        });
    }
    let sql = sql.trim();
    let mut lexer = Lexer::new(sql.as_bytes());
    lexer.run()?;
    if !lexer.saw_token {
        return Err(CompileError::Empty);
    }
    Ok(CompiledStatement {
        sql: sql.to_string(),
        placeholders: lexer.placeholders,
        keyword: lexer.keyword,
    })
}

/// Byte-level SQL lexer. Only ASCII bytes are significant; multi-byte UTF-8
/// sequences never match a delimiter and pass through untouched.
struct Lexer<'a> {
    /// Input bytes.
    bytes: &'a [u8],
    /// Cursor.
    pos: usize,
    /// Distinct placeholders in first-appearance order.
    placeholders: Vec<String>,
    /// Leading keyword, captured from the first significant token.
    keyword: Option<String>,
    /// Whether any significant token has been seen.
    saw_token: bool,
    /// Offset of the first significant token.
    first_offset: Option<usize>,
    /// Whether a `;` already ended the statement.
    terminated: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over SQL bytes.
    const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            placeholders: Vec::new(),
            keyword: None,
            saw_token: false,
            first_offset: None,
            terminated: false,
        }
    }

    /// Returns the byte at `pos + ahead`.
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// Scans the full input.
    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(byte) = self.peek(0) {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0c => self.pos += 1,
                b'-' if self.peek(1) == Some(b'-') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                _ => {
                    self.significant()?;
                    match byte {
                        b'\'' => self.skip_quoted(b'\'', "string literal")?,
                        b'"' => self.skip_quoted(b'"', "quoted identifier")?,
                        b'`' => self.skip_quoted(b'`', "quoted identifier")?,
                        b'[' => self.skip_quoted(b']', "bracketed identifier")?,
                        b':' => self.placeholder()?,
                        b'?' => {
                            return Err(CompileError::UnsupportedParameter {
                                token: '?',
                                offset: self.pos,
                            });
                        }
                        b'@' | b'$' if self.marker_starts_parameter() => {
                            return Err(CompileError::UnsupportedParameter {
                                token: char::from(byte),
                                offset: self.pos,
                            });
                        }
                        b';' => {
                            self.terminated = true;
                            self.pos += 1;
                        }
                        _ if is_ident_start(byte) => self.word(),
                        _ => self.pos += 1,
                    }
                }
            }
        }
        Ok(())
    }

    /// Records a significant token and rejects text after a terminating `;`.
    fn significant(&mut self) -> Result<(), CompileError> {
        if self.terminated {
            // Stray semicolons after the statement are harmless.
            if self.peek(0) == Some(b';') {
                return Ok(());
            }
            return Err(CompileError::MultipleStatements {
                offset: self.pos,
            });
        }
        if self.peek(0) != Some(b';') {
            self.saw_token = true;
            self.first_offset.get_or_insert(self.pos);
        }
        Ok(())
    }

    /// Consumes an identifier or keyword, capturing the first one.
    fn word(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(|byte| is_ident_continue(byte) || byte == b'$') {
            self.pos += 1;
        }
        if self.keyword.is_none() && self.first_offset == Some(start) {
            let text = String::from_utf8_lossy(&self.bytes[start .. self.pos]);
            self.keyword = Some(text.to_ascii_uppercase());
        }
    }

    /// Consumes a `:name` placeholder, or a `::` pair.
    fn placeholder(&mut self) -> Result<(), CompileError> {
        let offset = self.pos;
        if self.peek(1) == Some(b':') {
            self.pos += 2;
            return Ok(());
        }
        let name_start = self.pos + 1;
        if !self.bytes.get(name_start).copied().is_some_and(is_ident_start) {
            return Err(CompileError::MalformedPlaceholder {
                offset,
            });
        }
        self.pos = name_start;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        // The engine keeps reading past these, so the name it binds would
        // differ from the one recorded here.
        let extends_name = match self.peek(0) {
            Some(b':') => self.peek(1) == Some(b':'),
            Some(byte) => byte >= 0x80 || byte == b'$' || byte == b'(',
            None => false,
        };
        if extends_name {
            return Err(CompileError::MalformedPlaceholder {
                offset,
            });
        }
        let name = String::from_utf8_lossy(&self.bytes[name_start .. self.pos]).into_owned();
        if !self.placeholders.contains(&name) {
            if self.placeholders.len() == MAX_PLACEHOLDERS {
                return Err(CompileError::TooManyPlaceholders {
                    max: MAX_PLACEHOLDERS,
                });
            }
            self.placeholders.push(name);
        }
        Ok(())
    }

    /// Returns true when an `@`/`$` marker begins a parameter rather than
    /// continuing an identifier.
    fn marker_starts_parameter(&self) -> bool {
        let prev_is_ident = self
            .pos
            .checked_sub(1)
            .and_then(|index| self.bytes.get(index))
            .is_some_and(|byte| is_ident_continue(*byte));
        !prev_is_ident && self.peek(1).is_some_and(is_ident_continue)
    }

    /// Skips a quoted section; doubled closing quotes are escapes.
    fn skip_quoted(&mut self, close: u8, what: &'static str) -> Result<(), CompileError> {
        let offset = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => {
                    return Err(CompileError::Unterminated {
                        what,
                        offset,
                    });
                }
                Some(byte) if byte == close => {
                    self.pos += 1;
                    if close != b']' && self.peek(0) == Some(close) {
                        self.pos += 1;
                        continue;
                    }
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skips a `--` comment through end of line.
    fn skip_line_comment(&mut self) {
        while let Some(byte) = self.peek(0) {
            self.pos += 1;
            if byte == b'\n' {
                break;
            }
        }
    }

    /// Skips a `/* */` comment.
    fn skip_block_comment(&mut self) -> Result<(), CompileError> {
        let offset = self.pos;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => {
                    return Err(CompileError::Unterminated {
                        what: "block comment",
                        offset,
                    });
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

/// Returns true for bytes that may start an identifier.
const fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

/// Returns true for bytes that may continue an identifier.
const fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

// ============================================================================
// SECTION: Tests
// ============================================================================
