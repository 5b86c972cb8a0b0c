//! Parse, edit and rewrite procmail rc files.
//!
//! ```
//! use procmailrc::{parse_text, Container};
//!
//! let mut doc = parse_text(":0:\n* ^From.*spam\nspam-folder/\n").unwrap();
//! assert_eq!(doc.len().unwrap(), 1);
//! doc.insert(0, procmailrc::ast::Comment::new("filters")).unwrap();
//! assert_eq!(doc.render(), "# filters\n\n:0:\n* ^From.*spam\nspam-folder/\n");
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod procmail;
pub mod store;

use std::io::Read;
use std::path::Path;

pub use config::Charset;
pub use error::{Error, ParseError, Position, Result};
pub use model::enums::{Flag, QuoteKind, SizeSign};
pub use procmail::ast;
pub use procmail::container::{Block, Container, Deleted, Document, Parent, StatementMut};

/// Parse rc text that is already decoded.
pub fn parse_text(text: &str) -> Result<Document> {
    text.parse()
}

/// Read and parse the rc file at `path`.
pub fn parse(path: impl AsRef<Path>, charset: Charset) -> Result<Document> {
    store::rc_io::load_rc(path.as_ref(), charset)
}

/// Read and parse an rc file from an open handle.
pub fn parse_reader(reader: impl Read, charset: Charset) -> Result<Document> {
    store::rc_io::read_rc(reader, charset)
}
