use std::fmt;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

impl Position {
    /// Locate a byte offset inside `input`.
    pub fn locate(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count();
        Position {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// No grammar alternative matched at `position`, or input was left over
/// after the last statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
    /// The source line containing `position`, without its line ending.
    pub context: String,
}

impl ParseError {
    pub fn new(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let position = Position::locate(input, offset);
        let line_start = input[..position.offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = input[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(input.len());
        ParseError {
            message: message.into(),
            position,
            context: input[line_start..line_end].trim_end_matches('\r').to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} near {:?}", self.position, self.message, self.context)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Unknown action shape: {0}")]
    Build(String),
    #[error("Cannot {operation}: recipe action is not a nested block")]
    NotAContainer { operation: &'static str },
    #[error("Statement {0:?} has no parent")]
    NoParent(String),
    #[error("Cannot {operation}: index {index} out of range for {len} statements")]
    IndexOutOfRange {
        operation: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Cannot {operation}: statement not found")]
    NotFound { operation: &'static str },
    #[error("Rendered output does not parse back: {0}")]
    Consistency(#[source] Box<Error>),
    #[error("Statement {0} reads back as a different statement")]
    Reshaped(String),
    #[error("Unknown encoding {0:?}")]
    UnknownEncoding(String),
    #[error("Input is not valid {0}")]
    Decode(&'static str),
    #[error("Text cannot be represented in {0}")]
    Encode(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
