use std::fs;
use std::io::{Read, Write};
use std::mem;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Charset;
use crate::error::{Error, Result};
use crate::procmail::ast::{Recipe, Statement};
use crate::procmail::container::{Block, Document};

pub fn load_rc(path: &Path, charset: Charset) -> Result<Document> {
    debug!(path = %path.display(), %charset, "loading rc file");
    let bytes = fs::read(path)?;
    charset.decode(&bytes)?.parse()
}

pub fn read_rc<R: Read>(mut reader: R, charset: Charset) -> Result<Document> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    charset.decode(&bytes)?.parse()
}

/// Render `document`, make sure the text parses back into the same
/// statements, then replace `path` through a temporary file in the same
/// directory. The target is left untouched on any failure.
pub fn save_rc(document: &Document, path: &Path, charset: Charset) -> Result<Document> {
    let text = document.render();
    let reparsed: Document = text
        .parse()
        .map_err(|err| Error::Consistency(Box::new(err)))?;
    if let Some(id) = first_mismatch(document.body(), reparsed.body(), "") {
        return Err(Error::Consistency(Box::new(Error::Reshaped(id))));
    }
    let bytes = charset.encode(&text)?;
    debug!(path = %path.display(), bytes = bytes.len(), "writing rc file");

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    if let Ok(metadata) = fs::metadata(path) {
        file.as_file().set_permissions(metadata.permissions())?;
    }
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| Error::Io(err.error))?;
    info!(path = %path.display(), statements = reparsed.body().len(), "replaced rc file");
    Ok(reparsed)
}

/// Dotted id of the first statement whose kind or nesting differs.
fn first_mismatch(expected: &Block, actual: &Block, prefix: &str) -> Option<String> {
    for index in 0..expected.len().max(actual.len()) {
        let id = format!("{prefix}{index}");
        let (Some(want), Some(got)) = (expected.get(index), actual.get(index)) else {
            return Some(id);
        };
        if mem::discriminant(want.kind()) != mem::discriminant(got.kind()) {
            return Some(id);
        }
        match (nested(want), nested(got)) {
            (None, None) => {}
            (Some(want), Some(got)) => {
                if let Some(id) = first_mismatch(want, got, &format!("{id}.")) {
                    return Some(id);
                }
            }
            _ => return Some(id),
        }
    }
    None
}

fn nested(statement: &Statement) -> Option<&Block> {
    statement.as_recipe().and_then(Recipe::nested)
}
