/// AST node types for procmail rc files.
///
/// Equality between nodes is structural and ignores attached comments,
/// meta lines and positional bookkeeping, so a document compares equal to
/// the result of rendering and re-parsing it.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::enums::{Flag, QuoteKind, SizeSign};
use crate::procmail::container::{Block, Parent};
use crate::procmail::emitter;

/// Where a statement sits in its document. Recomputed by the owning
/// block after every structural change.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Slot {
    pub id: Option<String>,
    pub parent: Option<Parent>,
    pub is_first: bool,
    pub is_last: bool,
    pub recipe_number: Option<usize>,
}

/// One entry of a document or nested block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    kind: StatementKind,
    #[serde(skip)]
    pub(crate) slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Comment(Comment),
    Assignment(Assignment),
    Recipe(Recipe),
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        let mut statement = Statement {
            kind,
            slot: Slot::default(),
        };
        statement.detach();
        statement
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    /// Mutable access to the node. Replacing a recipe's nested block
    /// through this leaves its children unnumbered until the owning block
    /// changes; use [`Block::set`] to swap whole statements.
    pub fn kind_mut(&mut self) -> &mut StatementKind {
        &mut self.kind
    }

    pub fn into_kind(self) -> StatementKind {
        self.kind
    }

    /// Dotted position path, e.g. `"2.0"`. `None` once detached.
    pub fn id(&self) -> Option<&str> {
        self.slot.id.as_deref()
    }

    pub fn parent(&self) -> Option<&Parent> {
        self.slot.parent.as_ref()
    }

    pub fn is_first(&self) -> bool {
        self.slot.is_first
    }

    pub fn is_last(&self) -> bool {
        self.slot.is_last
    }

    /// 1-based position among the recipes of the same block.
    pub fn recipe_number(&self) -> Option<usize> {
        self.slot.recipe_number
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, StatementKind::Comment(_))
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, StatementKind::Assignment(_))
    }

    pub fn is_recipe(&self) -> bool {
        matches!(self.kind, StatementKind::Recipe(_))
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match &self.kind {
            StatementKind::Comment(comment) => Some(comment),
            _ => None,
        }
    }

    pub fn as_assignment(&self) -> Option<&Assignment> {
        match &self.kind {
            StatementKind::Assignment(assignment) => Some(assignment),
            _ => None,
        }
    }

    pub fn as_assignment_mut(&mut self) -> Option<&mut Assignment> {
        match &mut self.kind {
            StatementKind::Assignment(assignment) => Some(assignment),
            _ => None,
        }
    }

    pub fn as_recipe(&self) -> Option<&Recipe> {
        match &self.kind {
            StatementKind::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn as_recipe_mut(&mut self) -> Option<&mut Recipe> {
        match &mut self.kind {
            StatementKind::Recipe(recipe) => Some(recipe),
            _ => None,
        }
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_statement(&mut out, self, depth);
        out
    }

    /// Short human-facing label.
    pub fn title(&self) -> String {
        match &self.kind {
            StatementKind::Comment(comment) => {
                let head: String = comment.text.chars().take(10).collect();
                if comment.text.chars().count() > 10 {
                    format!("# {head}…")
                } else {
                    format!("# {head}")
                }
            }
            StatementKind::Assignment(assignment) => {
                let Some(first) = assignment.variables.first() else {
                    return String::new();
                };
                let value = first.value.as_deref().unwrap_or("");
                let long = first.name.chars().count() + value.chars().count() > 10;
                let head: String = format!("{}=\"{value}\"", first.name).chars().take(11).collect();
                if long || assignment.variables.len() > 1 {
                    format!("{head}…")
                } else {
                    head
                }
            }
            StatementKind::Recipe(recipe) => match (&recipe.meta.title, self.recipe_number()) {
                (Some(title), _) => title.clone(),
                (None, Some(number)) => format!("Recipe {number}"),
                (None, None) => "Recipe".to_string(),
            },
        }
    }

    /// Forget position and parent, including those of nested children.
    pub(crate) fn detach(&mut self) {
        self.slot = Slot::default();
        if let StatementKind::Recipe(recipe) = &mut self.kind {
            recipe.adopt(None);
        }
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<StatementKind> for Statement {
    fn from(kind: StatementKind) -> Self {
        Statement::new(kind)
    }
}

impl From<Comment> for Statement {
    fn from(comment: Comment) -> Self {
        Statement::new(StatementKind::Comment(comment))
    }
}

impl From<Assignment> for Statement {
    fn from(assignment: Assignment) -> Self {
        Statement::new(StatementKind::Assignment(assignment))
    }
}

impl From<Recipe> for Statement {
    fn from(recipe: Recipe) -> Self {
        Statement::new(StatementKind::Recipe(recipe))
    }
}

/// `# text`, either on its own line or trailing another construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Comment { text: text.into() }
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_comment_line(&mut out, self, depth);
        out
    }
}

/// `# title:`, `# comment:` and `# custom:` annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub custom: Option<String>,
}

impl Meta {
    pub fn is_empty(&self) -> bool {
        [&self.title, &self.comment, &self.custom]
            .iter()
            .all(|field| field.as_deref().map_or(true, str::is_empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    /// `None` for a bare `NAME`, `Some("")` for `NAME=`.
    pub value: Option<String>,
    pub quote: QuoteKind,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, quote: QuoteKind) -> Self {
        Variable {
            name: name.into(),
            value: Some(value.into()),
            quote,
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            value: None,
            quote: QuoteKind::None,
        }
    }
}

/// One line of `NAME[=VALUE]` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub variables: Vec<Variable>,
    pub comment: Option<Comment>,
    pub meta: Meta,
}

impl Assignment {
    pub fn new(variables: Vec<Variable>) -> Self {
        Assignment {
            variables,
            comment: None,
            meta: Meta::default(),
        }
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_assignment(&mut out, self, depth);
        out
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.variables == other.variables
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lockfile {
    #[default]
    Absent,
    /// `:0:`: procmail derives the lock name from the destination.
    Unnamed,
    Named(String),
}

/// The `:0flags:lockfile` line opening a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub number: String,
    /// Flag letters as written, in order.
    pub flags: String,
    pub lockfile: Lockfile,
    pub comment: Option<Comment>,
}

impl Header {
    pub fn new(number: impl Into<String>, flags: impl Into<String>, lockfile: Lockfile) -> Self {
        Header {
            number: number.into(),
            flags: flags.into(),
            lockfile,
            comment: None,
        }
    }

    fn written(&self, flag: Flag) -> bool {
        self.flags.contains(flag.as_procmail())
    }

    /// Flags in effect, implicit defaults included: `H` unless `B` is
    /// written, and `h` plus `b` unless either is written.
    pub fn effective_flags(&self) -> BTreeSet<Flag> {
        let mut flags: BTreeSet<Flag> =
            self.flags.chars().filter_map(Flag::from_procmail).collect();
        if !self.written(Flag::Headers) && !self.written(Flag::Body) {
            flags.insert(Flag::Headers);
        }
        if !self.written(Flag::PipeHeaders) && !self.written(Flag::PipeBody) {
            flags.insert(Flag::PipeHeaders);
            flags.insert(Flag::PipeBody);
        }
        flags
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.effective_flags().contains(&flag)
    }

    /// Turn a flag on or off. Turning off `h` or `b` while both are
    /// implicit writes the other one out so it stays on.
    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        let letter = flag.as_procmail();
        if value {
            if !self.written(flag) {
                self.flags.push(letter);
            }
            return;
        }
        let other = match flag {
            Flag::PipeHeaders => Some(Flag::PipeBody),
            Flag::PipeBody => Some(Flag::PipeHeaders),
            _ => None,
        };
        if let Some(other) = other {
            if !self.written(flag) && !self.written(other) {
                self.flags.push(other.as_procmail());
            }
        }
        self.flags.retain(|c| c != letter);
    }

    /// The flag string with implicit defaults dropped: `h` and `b` when
    /// both are written, `H` when written without `B`.
    pub fn rendered_flags(&self) -> String {
        let drop_hb = self.written(Flag::PipeHeaders) && self.written(Flag::PipeBody);
        let drop_h = self.written(Flag::Headers) && !self.written(Flag::Body);
        self.flags
            .chars()
            .filter(|&c| match c {
                'h' | 'b' => !drop_hb,
                'H' => !drop_h,
                _ => true,
            })
            .collect()
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_header(&mut out, self, depth);
        out
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
            && self.lockfile == other.lockfile
            && self.effective_flags() == other.effective_flags()
    }
}

/// A `*` line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub comment: Option<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionKind {
    /// A bare `*`, always true.
    Empty,
    /// `? command`: true when the command exits successfully.
    Shell(String),
    /// `> size` / `< size` in bytes.
    Size { sign: SizeSign, size: u64 },
    Regex(String),
    /// `NAME ?? condition`: test a variable instead of the message.
    Variable {
        name: String,
        condition: Box<Condition>,
    },
    Negate(Box<Condition>),
    /// `$ condition`: expand variables before testing.
    Substitute(Box<Condition>),
    /// `x ^ y condition`: weighted scoring.
    Score {
        x: i64,
        y: i64,
        condition: Box<Condition>,
    },
}

impl Condition {
    pub fn new(kind: ConditionKind) -> Self {
        Condition {
            kind,
            comment: None,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Condition::new(ConditionKind::Regex(pattern.into()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ConditionKind::Empty)
    }

    pub fn is_shell(&self) -> bool {
        matches!(self.kind, ConditionKind::Shell(_))
    }

    pub fn is_size(&self) -> bool {
        matches!(self.kind, ConditionKind::Size { .. })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self.kind, ConditionKind::Regex(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ConditionKind::Variable { .. })
    }

    pub fn is_negate(&self) -> bool {
        matches!(self.kind, ConditionKind::Negate(_))
    }

    pub fn is_substitute(&self) -> bool {
        matches!(self.kind, ConditionKind::Substitute(_))
    }

    pub fn is_score(&self) -> bool {
        matches!(self.kind, ConditionKind::Score { .. })
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_condition(&mut out, self, depth);
        out
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub comment: Option<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionKind {
    /// `! address...`
    Forward(Vec<String>),
    /// `[VAR=]| command`. Capturing into a variable makes the recipe
    /// non-delivering.
    Shell {
        command: String,
        variable: Option<String>,
    },
    /// Mailbox file or directory.
    Save(String),
    /// `{ ... }`: a whole block of statements.
    Nested(Block),
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Action {
            kind,
            comment: None,
        }
    }

    pub fn forward<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Action::new(ActionKind::Forward(
            recipients.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn shell(command: impl Into<String>, variable: Option<String>) -> Self {
        Action::new(ActionKind::Shell {
            command: command.into(),
            variable,
        })
    }

    pub fn save(path: impl Into<String>) -> Self {
        Action::new(ActionKind::Save(path.into()))
    }

    pub fn nested(statements: Vec<Statement>) -> Self {
        Action::new(ActionKind::Nested(Block::new(statements)))
    }

    pub fn is_forward(&self) -> bool {
        matches!(self.kind, ActionKind::Forward(_))
    }

    pub fn is_shell(&self) -> bool {
        matches!(self.kind, ActionKind::Shell { .. })
    }

    pub fn is_save(&self) -> bool {
        matches!(self.kind, ActionKind::Save(_))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.kind, ActionKind::Nested(_))
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_action(&mut out, self, depth);
        out
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Header, conditions and one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub meta: Meta,
    pub header: Header,
    /// Comment line between the header and the first condition.
    pub condition_comment: Option<Comment>,
    pub conditions: Vec<Condition>,
    /// Comment line right before the action.
    pub action_comment: Option<Comment>,
    action: Action,
    #[serde(skip)]
    id: Option<String>,
}

impl Recipe {
    pub fn new(header: Header, conditions: Vec<Condition>, action: Action) -> Self {
        let mut recipe = Recipe {
            meta: Meta::default(),
            header,
            condition_comment: None,
            conditions,
            action_comment: None,
            action,
            id: None,
        };
        recipe.adopt(None);
        recipe
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Replace the action, numbering a nested block under this recipe.
    pub fn set_action(&mut self, action: Action) -> Action {
        let mut old = std::mem::replace(&mut self.action, action);
        if let ActionKind::Nested(block) = &mut old.kind {
            block.adopt(None);
        }
        self.adopt(self.id.clone());
        old
    }

    pub fn nested(&self) -> Option<&Block> {
        match &self.action.kind {
            ActionKind::Nested(block) => Some(block),
            _ => None,
        }
    }

    pub(crate) fn nested_mut(&mut self) -> Option<&mut Block> {
        match &mut self.action.kind {
            ActionKind::Nested(block) => Some(block),
            _ => None,
        }
    }

    /// Id of the statement holding this recipe.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub(crate) fn adopt(&mut self, id: Option<String>) {
        if let ActionKind::Nested(block) = &mut self.action.kind {
            block.adopt(id.clone().map(Parent::Recipe));
        }
        self.id = id;
    }

    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        emitter::emit_recipe(&mut out, self, depth);
        out
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.conditions == other.conditions
            && self.action == other.action
    }
}
