use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::str::FromStr;
use tracing::trace;

use crate::config::Charset;
use crate::error::{Error, Result};
use crate::procmail::ast::{Recipe, Slot, Statement};
use crate::procmail::{builder, emitter, parser};

/// The container a statement belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parent {
    Document,
    /// The recipe with this id, whose action is a nested block.
    Recipe(String),
}

impl Parent {
    /// Dotted id of the container; empty for the document root.
    pub fn id(&self) -> &str {
        match self {
            Parent::Document => "",
            Parent::Recipe(id) => id,
        }
    }

    fn child_id(&self, index: usize) -> String {
        match self {
            Parent::Document => index.to_string(),
            Parent::Recipe(id) => format!("{id}.{index}"),
        }
    }
}

/// An ordered run of statements: the document body or a nested action.
///
/// Every structural change renumbers the whole block and, through nested
/// recipes, everything below it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct Block {
    owner: Option<Parent>,
    statements: Vec<Statement>,
}

impl Block {
    /// A block not attached to any container yet. Its statements get ids
    /// once it is placed in a document.
    pub fn new(statements: Vec<Statement>) -> Self {
        let mut block = Block {
            owner: None,
            statements,
        };
        block.renumber();
        block
    }

    pub fn owner(&self) -> Option<&Parent> {
        self.owner.as_ref()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn as_slice(&self) -> &[Statement] {
        &self.statements
    }

    pub fn get(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    /// Mutable access to one statement. The block is renumbered when the
    /// returned handle is dropped, so the statement may be replaced whole.
    pub fn get_mut(&mut self, index: usize) -> Option<StatementMut<'_>> {
        if index >= self.statements.len() {
            return None;
        }
        Some(StatementMut { block: self, index })
    }

    fn statement_mut(&mut self, index: usize) -> Option<&mut Statement> {
        self.statements.get_mut(index)
    }

    pub fn append(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
        self.renumber();
    }

    /// Insert before `index`; an index past the end appends.
    pub fn insert(&mut self, index: usize, statement: impl Into<Statement>) {
        let index = index.min(self.statements.len());
        self.statements.insert(index, statement.into());
        self.renumber();
    }

    pub fn extend<I>(&mut self, statements: I)
    where
        I: IntoIterator,
        I::Item: Into<Statement>,
    {
        self.statements.extend(statements.into_iter().map(Into::into));
        self.renumber();
    }

    /// Remove the first statement equal to `statement`.
    pub fn remove(&mut self, statement: &Statement) -> Result<Statement> {
        let index = self.index(statement).ok_or(Error::NotFound {
            operation: "remove",
        })?;
        Ok(self.take_at(index))
    }

    /// Remove the statement at `index`, or the last one.
    pub fn pop(&mut self, index: Option<usize>) -> Result<Statement> {
        let len = self.statements.len();
        let index = match index {
            Some(index) if index < len => index,
            None if len > 0 => len - 1,
            other => {
                return Err(Error::IndexOutOfRange {
                    operation: "pop",
                    index: other.unwrap_or(0),
                    len,
                })
            }
        };
        Ok(self.take_at(index))
    }

    /// Replace the statement at `index`, returning the old one detached.
    pub fn set(&mut self, index: usize, statement: impl Into<Statement>) -> Result<Statement> {
        let len = self.statements.len();
        let slot = self.statements.get_mut(index).ok_or(Error::IndexOutOfRange {
            operation: "set",
            index,
            len,
        })?;
        let mut old = std::mem::replace(slot, statement.into());
        old.detach();
        self.renumber();
        Ok(old)
    }

    pub fn reverse(&mut self) {
        self.statements.reverse();
        self.renumber();
    }

    /// Stable sort with a caller supplied ordering.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Statement, &Statement) -> Ordering,
    {
        self.statements.sort_by(compare);
        self.renumber();
    }

    pub fn index(&self, statement: &Statement) -> Option<usize> {
        self.statements.iter().position(|s| s == statement)
    }

    pub fn count(&self, statement: &Statement) -> usize {
        self.statements.iter().filter(|s| *s == statement).count()
    }

    fn take_at(&mut self, index: usize) -> Statement {
        let mut statement = self.statements.remove(index);
        statement.detach();
        self.renumber();
        statement
    }

    pub(crate) fn adopt(&mut self, owner: Option<Parent>) {
        self.owner = owner;
        self.renumber();
    }

    fn renumber(&mut self) {
        let Some(owner) = self.owner.clone() else {
            self.statements.iter_mut().for_each(Statement::detach);
            return;
        };
        trace!(parent = owner.id(), statements = self.statements.len(), "renumbering block");
        let last = self.statements.len().saturating_sub(1);
        let mut recipes = 0;
        for (index, statement) in self.statements.iter_mut().enumerate() {
            let id = owner.child_id(index);
            let recipe_number = statement.is_recipe().then(|| {
                recipes += 1;
                recipes
            });
            statement.slot = Slot {
                id: Some(id.clone()),
                parent: Some(owner.clone()),
                is_first: index == 0,
                is_last: index == last,
                recipe_number,
            };
            if let Some(recipe) = statement.as_recipe_mut() {
                recipe.adopt(Some(id));
            }
        }
    }
}

/// A statement borrowed mutably out of its block.
#[derive(Debug)]
pub struct StatementMut<'a> {
    block: &'a mut Block,
    index: usize,
}

impl Deref for StatementMut<'_> {
    type Target = Statement;

    fn deref(&self) -> &Statement {
        &self.block.statements[self.index]
    }
}

impl DerefMut for StatementMut<'_> {
    fn deref_mut(&mut self) -> &mut Statement {
        &mut self.block.statements[self.index]
    }
}

impl Drop for StatementMut<'_> {
    fn drop(&mut self) {
        self.block.renumber();
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.statements == other.statements
    }
}

impl From<Vec<Statement>> for Block {
    fn from(statements: Vec<Statement>) -> Self {
        Block::new(statements)
    }
}

impl From<Block> for Vec<Statement> {
    fn from(block: Block) -> Self {
        let mut statements = block.statements;
        statements.iter_mut().for_each(Statement::detach);
        statements
    }
}

impl<'a> IntoIterator for &'a Block {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

mod sealed {
    use super::Block;
    use crate::error::Result;

    /// Access to the underlying block stays inside the crate so a block can
    /// never be swapped out from under its owner.
    pub trait Blocks {
        fn block(&self, operation: &'static str) -> Result<&Block>;
        fn block_mut(&mut self, operation: &'static str) -> Result<&mut Block>;
    }
}

use sealed::Blocks;

/// List operations shared by the document and by recipes with a nested
/// action. On any other recipe every operation fails with
/// [`Error::NotAContainer`].
pub trait Container: Blocks {
    fn len(&self) -> Result<usize> {
        Ok(self.block("len")?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.block("is_empty")?.is_empty())
    }

    fn item(&self, index: usize) -> Result<&Statement> {
        let block = self.block("get")?;
        block.get(index).ok_or(Error::IndexOutOfRange {
            operation: "get",
            index,
            len: block.len(),
        })
    }

    fn set_item(&mut self, index: usize, statement: impl Into<Statement>) -> Result<Statement>
    where
        Self: Sized,
    {
        self.block_mut("set")?.set(index, statement)
    }

    fn append(&mut self, statement: impl Into<Statement>) -> Result<()>
    where
        Self: Sized,
    {
        self.block_mut("append")?.append(statement);
        Ok(())
    }

    fn insert(&mut self, index: usize, statement: impl Into<Statement>) -> Result<()>
    where
        Self: Sized,
    {
        self.block_mut("insert")?.insert(index, statement);
        Ok(())
    }

    fn extend<I>(&mut self, statements: I) -> Result<()>
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: Into<Statement>,
    {
        self.block_mut("extend")?.extend(statements);
        Ok(())
    }

    fn remove(&mut self, statement: &Statement) -> Result<Statement> {
        self.block_mut("remove")?.remove(statement)
    }

    fn pop(&mut self, index: Option<usize>) -> Result<Statement> {
        self.block_mut("pop")?.pop(index)
    }

    fn reverse(&mut self) -> Result<()> {
        self.block_mut("reverse")?.reverse();
        Ok(())
    }

    fn sort_by<F>(&mut self, compare: F) -> Result<()>
    where
        Self: Sized,
        F: FnMut(&Statement, &Statement) -> Ordering,
    {
        self.block_mut("sort")?.sort_by(compare);
        Ok(())
    }

    fn index(&self, statement: &Statement) -> Result<usize> {
        self.block("index")?
            .index(statement)
            .ok_or(Error::NotFound { operation: "index" })
    }

    fn count(&self, statement: &Statement) -> Result<usize> {
        Ok(self.block("count")?.count(statement))
    }
}

impl Container for Recipe {}

impl Blocks for Recipe {
    fn block(&self, operation: &'static str) -> Result<&Block> {
        self.nested().ok_or(Error::NotAContainer { operation })
    }

    fn block_mut(&mut self, operation: &'static str) -> Result<&mut Block> {
        self.nested_mut().ok_or(Error::NotAContainer { operation })
    }
}

/// A parsed rc file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct Document {
    body: Block,
}

/// What [`Document::delete`] took out of the tree.
#[derive(Debug, Clone)]
pub struct Deleted {
    pub parent: Parent,
    pub statement: Statement,
}

impl Document {
    pub fn new(statements: Vec<Statement>) -> Self {
        let mut body = Block::new(statements);
        body.adopt(Some(Parent::Document));
        Document { body }
    }

    pub fn body(&self) -> &Block {
        &self.body
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.body.iter()
    }

    pub fn render(&self) -> String {
        emitter::emit(self)
    }

    /// Look a statement up by its dotted id.
    pub fn get(&self, id: &str) -> Option<&Statement> {
        let path = parse_id(id)?;
        let (last, ancestors) = path.split_last()?;
        let mut block = &self.body;
        for &index in ancestors {
            block = block.get(index)?.as_recipe()?.nested()?;
        }
        block.get(*last)
    }

    /// Mutable lookup by dotted id. See [`Block::get_mut`].
    pub fn get_mut(&mut self, id: &str) -> Option<StatementMut<'_>> {
        let path = parse_id(id)?;
        let (last, ancestors) = path.split_last()?;
        let mut block = &mut self.body;
        for &index in ancestors {
            block = block.statement_mut(index)?.as_recipe_mut()?.nested_mut()?;
        }
        block.get_mut(*last)
    }

    /// Detach the statement with this id from its container.
    pub fn delete(&mut self, id: &str) -> Result<Deleted> {
        let no_parent = || Error::NoParent(id.to_string());
        let path = parse_id(id).ok_or_else(no_parent)?;
        let (&last, ancestors) = path.split_last().ok_or_else(no_parent)?;
        let mut block = &mut self.body;
        for &index in ancestors {
            block = block
                .statement_mut(index)
                .and_then(Statement::as_recipe_mut)
                .and_then(Recipe::nested_mut)
                .ok_or_else(no_parent)?;
        }
        if last >= block.len() {
            return Err(no_parent());
        }
        let parent = block.owner().cloned().ok_or_else(no_parent)?;
        let statement = block.take_at(last);
        Ok(Deleted { parent, statement })
    }

    /// Render, check the result parses back, and atomically replace `path`.
    /// Returns the re-parsed document.
    pub fn write(&self, path: impl AsRef<Path>, charset: Charset) -> Result<Document> {
        crate::store::rc_io::save_rc(self, path.as_ref(), charset)
    }
}

fn parse_id(id: &str) -> Option<Vec<usize>> {
    id.split('.').map(|segment| segment.parse().ok()).collect()
}

impl Default for Document {
    fn default() -> Self {
        Document::new(Vec::new())
    }
}

impl Container for Document {}

impl Blocks for Document {
    fn block(&self, _operation: &'static str) -> Result<&Block> {
        Ok(&self.body)
    }

    fn block_mut(&mut self, _operation: &'static str) -> Result<&mut Block> {
        Ok(&mut self.body)
    }
}

impl From<Vec<Statement>> for Document {
    fn from(statements: Vec<Statement>) -> Self {
        Document::new(statements)
    }
}

impl From<Document> for Vec<Statement> {
    fn from(document: Document) -> Self {
        document.body.into()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.body.iter()
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let raw = parser::parse(text)?;
        builder::build(raw)
    }
}
