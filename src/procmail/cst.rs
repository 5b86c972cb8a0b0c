/// Raw parse records produced by the grammar, before the typed AST is built.
///
/// These mirror what each grammar rule captured; the builder decides what
/// the captures mean.
use crate::model::enums::SizeSign;

#[derive(Debug, Clone, PartialEq)]
pub enum RawStatement {
    Comment(String),
    Assignments(RawAssignments),
    /// A bare top-level substitution, kept as its source text.
    Substitution(String),
    Recipe(RawRecipe),
}

/// `# title:`, `# comment:` and `# custom:` lines seen before a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMeta {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub custom: Option<String>,
}

impl RawMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.comment.is_none() && self.custom.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAssignments {
    pub meta: RawMeta,
    pub pairs: Vec<RawPair>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPair {
    pub name: String,
    /// `None` when no `=` followed the name.
    pub value: Option<RawValue>,
}

/// Which value alternative matched. Quoted text is kept raw (escapes intact).
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Bare(String),
    DoubleQuoted(String),
    SingleQuoted(String),
    Backtick(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawHeader {
    pub number: String,
    pub flags: String,
    /// The lockfile tokens: `[":"]` or `[":", name]`.
    pub lockfile: Vec<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecipe {
    pub meta: RawMeta,
    pub header: RawHeader,
    pub comment_condition: Option<String>,
    pub conditions: Vec<RawConditionLine>,
    pub comment_action: Option<String>,
    pub action: RawAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawConditionLine {
    /// `None` for a bare `*` line.
    pub condition: Option<RawCondition>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawCondition {
    Variable {
        name: String,
        inner: Box<RawCondition>,
    },
    Size { sign: SizeSign, size: u64 },
    Shell(String),
    Negate(Box<RawCondition>),
    Substitute(Box<RawCondition>),
    Score {
        x: i64,
        y: i64,
        inner: Box<RawCondition>,
    },
    Regex(String),
}

/// The action line, as named captures. Exactly one capture is expected to
/// be set; the builder rejects anything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAction {
    pub forward: Option<Vec<String>>,
    pub statements: Option<Vec<RawStatement>>,
    pub shell: Option<RawShell>,
    pub path: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawShell {
    pub variable: Option<String>,
    pub command: String,
}
