/// Recursive descent procmail rc parser.
///
/// Each grammar rule tries its alternatives in a fixed order and rewinds the
/// cursor when one does not match. A rule returns `Ok(None)` when it does
/// not apply and `Err` once it has committed (a recipe header was read) and
/// the rest of the construct is malformed.
use tracing::debug;

use crate::error::ParseError;
use crate::model::enums::{Flag, SizeSign};
use crate::procmail::cst::*;
use crate::procmail::lexer::{self, Cursor};

type Attempt<T> = Result<Option<T>, ParseError>;

/// Characters that cannot start a save path: they introduce the other
/// action forms, a comment, or close a nested block.
const NOT_SAVE_START: &[char] = &['{', '}', '!', '|', '*', '#'];

pub fn parse(input: &str) -> Result<Vec<RawStatement>, ParseError> {
    debug!(bytes = input.len(), "parsing rc text");
    let mut parser = Parser {
        cur: Cursor::new(input),
    };
    let statements = parser.statements(false)?;
    parser.cur.skip_whitespace();
    if !parser.cur.is_eof() {
        return Err(parser.error("expected a comment, assignment, substitution or recipe"));
    }
    debug!(statements = statements.len(), "parsed rc text");
    Ok(statements)
}

#[derive(Clone, Copy, PartialEq)]
enum MetaKind {
    Title,
    Comment,
    Custom,
}

struct Parser<'a> {
    cur: Cursor<'a>,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.cur.input(), self.cur.pos(), message)
    }

    fn statements(&mut self, nested: bool) -> Result<Vec<RawStatement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.cur.skip_whitespace();
            if self.cur.is_eof() || (nested && self.cur.peek() == Some('}')) {
                break;
            }
            match self.statement()? {
                Some(statement) => statements.push(statement),
                None => break,
            }
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Attempt<RawStatement> {
        let start = self.cur.pos();
        if let Some(text) = self.comment(false) {
            return Ok(Some(RawStatement::Comment(text)));
        }
        if let Some(assignments) = self.assignments() {
            return Ok(Some(RawStatement::Assignments(assignments)));
        }
        if let Some(text) = self.substitution() {
            return Ok(Some(RawStatement::Substitution(text)));
        }
        if let Some(recipe) = self.recipe()? {
            return Ok(Some(RawStatement::Recipe(recipe)));
        }
        // A meta line with nothing to attach to reads as a plain comment.
        self.cur.reset(start);
        Ok(self.comment(true).map(RawStatement::Comment))
    }

    // ── Comments ────────────────────────────────────────────────────

    /// `# text` up to the end of the line. Meta lines are refused unless
    /// `allow_meta` is set.
    fn comment(&mut self, allow_meta: bool) -> Option<String> {
        let start = self.cur.pos();
        self.cur.skip_blank();
        if !self.cur.eat('#') || (!allow_meta && self.at_meta_flag()) {
            self.cur.reset(start);
            return None;
        }
        self.cur.skip_blank();
        let text = self.cur.rest_of_line().trim_end().to_string();
        if !self.cur.eat_line_end() {
            self.cur.reset(start);
            return None;
        }
        Some(text)
    }

    fn at_meta_flag(&mut self) -> bool {
        let start = self.cur.pos();
        let found = self.meta_flag().is_some();
        self.cur.reset(start);
        found
    }

    fn meta_flag(&mut self) -> Option<MetaKind> {
        self.cur.skip_blank();
        let kind = match self.cur.identifier()? {
            "title" => MetaKind::Title,
            "comment" => MetaKind::Comment,
            "custom" => MetaKind::Custom,
            _ => return None,
        };
        self.cur.skip_blank();
        self.cur.eat(':').then_some(kind)
    }

    fn meta_line(&mut self) -> Option<(MetaKind, Option<String>)> {
        let start = self.cur.pos();
        self.cur.skip_blank();
        let parsed = if self.cur.eat('#') {
            self.meta_flag()
        } else {
            None
        };
        let Some(kind) = parsed else {
            self.cur.reset(start);
            return None;
        };
        self.cur.skip_blank();
        let text = self.cur.rest_of_line().trim_end();
        if !self.cur.eat_line_end() {
            self.cur.reset(start);
            return None;
        }
        let text = (!text.is_empty()).then(|| text.to_string());
        Some((kind, text))
    }

    fn metas(&mut self) -> RawMeta {
        let mut meta = RawMeta::default();
        loop {
            let before = self.cur.pos();
            self.cur.skip_whitespace();
            match self.meta_line() {
                Some((MetaKind::Title, text)) => meta.title = text,
                Some((MetaKind::Comment, text)) => meta.comment = text,
                Some((MetaKind::Custom, text)) => meta.custom = text,
                None => {
                    self.cur.reset(before);
                    break;
                }
            }
        }
        meta
    }

    /// Optional trailing comment, then the end of the line.
    fn end_of_line(&mut self, what: &str) -> Result<Option<String>, ParseError> {
        self.cur.skip_blank();
        let comment = if self.cur.eat('#') {
            self.cur.skip_blank();
            Some(self.cur.rest_of_line().trim_end().to_string())
        } else {
            None
        };
        if !self.cur.eat_line_end() {
            return Err(self.error(format!("unexpected text after {what}")));
        }
        Ok(comment)
    }

    /// A freestanding comment line inside a recipe.
    fn recipe_comment(&mut self) -> Option<String> {
        let start = self.cur.pos();
        self.cur.skip_whitespace();
        let comment = self.comment(false);
        if comment.is_none() {
            self.cur.reset(start);
        }
        comment
    }

    // ── Assignments ─────────────────────────────────────────────────

    fn assignments(&mut self) -> Option<RawAssignments> {
        let start = self.cur.pos();
        let meta = self.metas();
        self.cur.skip_whitespace();
        let Some(first) = self.pair() else {
            self.cur.reset(start);
            return None;
        };
        let mut pairs = vec![first];
        loop {
            let before = self.cur.pos();
            self.cur.skip_blank();
            if self.cur.at_line_end() || self.cur.peek() == Some('#') {
                self.cur.reset(before);
                break;
            }
            match self.pair() {
                Some(pair) => pairs.push(pair),
                None => {
                    self.cur.reset(before);
                    break;
                }
            }
        }
        let before = self.cur.pos();
        self.cur.skip_blank();
        let comment = if self.cur.eat('#') {
            self.cur.skip_blank();
            Some(self.cur.rest_of_line().trim_end().to_string())
        } else {
            self.cur.reset(before);
            None
        };
        Some(RawAssignments {
            meta,
            pairs,
            comment,
        })
    }

    fn pair(&mut self) -> Option<RawPair> {
        let name = self.cur.identifier()?.to_string();
        let before = self.cur.pos();
        self.cur.skip_blank();
        let value = if self.cur.eat('=') {
            Some(self.value())
        } else {
            self.cur.reset(before);
            None
        };
        Some(RawPair { name, value })
    }

    fn value(&mut self) -> RawValue {
        let start = self.cur.pos();
        let skipped = self.cur.skip_blank();
        if self.cur.at_line_end() || (skipped && self.cur.peek() == Some('#')) {
            self.cur.reset(start);
            return RawValue::Bare(String::new());
        }
        if let Some(raw) = self.cur.quoted('"') {
            return RawValue::DoubleQuoted(raw.to_string());
        }
        if let Some(raw) = self.cur.quoted('\'') {
            return RawValue::SingleQuoted(raw.to_string());
        }
        if let Some(raw) = self.cur.quoted('`') {
            return RawValue::Backtick(raw.to_string());
        }
        RawValue::Bare(self.cur.take_while(lexer::is_printable).to_string())
    }

    // ── Substitutions ───────────────────────────────────────────────

    fn substitution(&mut self) -> Option<String> {
        let start = self.cur.pos();
        self.cur.skip_blank();
        let begin = self.cur.pos();
        if self.cur.quoted('`').is_some() || self.dollar_substitution() {
            return Some(self.cur.input()[begin..self.cur.pos()].to_string());
        }
        self.cur.reset(start);
        None
    }

    fn dollar_substitution(&mut self) -> bool {
        let start = self.cur.pos();
        if !self.cur.eat('$') {
            return false;
        }
        let after_dollar = self.cur.pos();
        if self.substitution_variable() {
            return true;
        }
        self.cur.reset(after_dollar);
        if self.cur.eat('\\') && self.substitution_variable() {
            return true;
        }
        self.cur.reset(after_dollar);
        if self.cur.eat('{') && self.substitution_variable() {
            self.cur.eat(':');
            if (self.cur.eat('-') || self.cur.eat('+'))
                && !self
                    .cur
                    .take_while(|c| lexer::is_printable(c) && c != '}')
                    .is_empty()
                && self.cur.eat('}')
            {
                return true;
            }
        }
        self.cur.reset(start);
        false
    }

    fn substitution_variable(&mut self) -> bool {
        if self.cur.identifier().is_some() || self.cur.digits().is_some() {
            return true;
        }
        match self.cur.peek() {
            Some('#' | '$' | '-' | '=' | '?' | '@') => {
                self.cur.bump();
                true
            }
            _ => false,
        }
    }

    // ── Recipes ─────────────────────────────────────────────────────

    fn recipe(&mut self) -> Attempt<RawRecipe> {
        let start = self.cur.pos();
        let meta = self.metas();
        self.cur.skip_whitespace();
        let Some(header) = self.header()? else {
            self.cur.reset(start);
            return Ok(None);
        };
        let comment_condition = self.recipe_comment();
        let mut conditions = Vec::new();
        loop {
            let before = self.cur.pos();
            self.cur.skip_whitespace();
            if !self.cur.eat('*') {
                self.cur.reset(before);
                break;
            }
            conditions.push(self.condition_line()?);
        }
        let comment_action = self.recipe_comment();
        self.cur.skip_whitespace();
        let Some(action) = self.action()? else {
            return Err(self.error("expected an action"));
        };
        Ok(Some(RawRecipe {
            meta,
            header,
            comment_condition,
            conditions,
            comment_action,
            action,
        }))
    }

    fn header(&mut self) -> Attempt<RawHeader> {
        let start = self.cur.pos();
        self.cur.skip_blank();
        if !self.cur.eat(':') {
            self.cur.reset(start);
            return Ok(None);
        }
        self.cur.skip_blank();
        let Some(number) = self.cur.digits() else {
            self.cur.reset(start);
            return Ok(None);
        };
        let number = number.to_string();

        let mut flags = String::new();
        loop {
            let before = self.cur.pos();
            self.cur.skip_blank();
            match self.cur.peek() {
                Some(c) if Flag::from_procmail(c).is_some() => {
                    self.cur.bump();
                    flags.push(c);
                }
                _ => {
                    self.cur.reset(before);
                    break;
                }
            }
        }

        let mut lockfile = Vec::new();
        let before = self.cur.pos();
        self.cur.skip_blank();
        if self.cur.eat(':') {
            lockfile.push(":".to_string());
            let before_name = self.cur.pos();
            self.cur.skip_blank();
            match self.cur.peek() {
                Some(c) if c.is_ascii_graphic() && c != '#' => {
                    lockfile.push(self.cur.take_while(|c| c.is_ascii_graphic()).to_string());
                }
                _ => self.cur.reset(before_name),
            }
        } else {
            self.cur.reset(before);
        }

        let comment = self.end_of_line("recipe header")?;
        Ok(Some(RawHeader {
            number,
            flags,
            lockfile,
            comment,
        }))
    }

    // ── Conditions ──────────────────────────────────────────────────

    /// The rest of a line whose leading `*` has been consumed.
    fn condition_line(&mut self) -> Result<RawConditionLine, ParseError> {
        self.cur.skip_blank();
        if self.cur.at_line_end() {
            self.cur.eat_line_end();
            return Ok(RawConditionLine {
                condition: None,
                comment: None,
            });
        }
        let Some(condition) = self.condition()? else {
            return Err(self.error("expected a condition"));
        };
        let comment = self.end_of_line("condition")?;
        Ok(RawConditionLine {
            condition: Some(condition),
            comment,
        })
    }

    fn condition(&mut self) -> Attempt<RawCondition> {
        let start = self.cur.pos();

        if let Some(name) = self.cur.identifier() {
            let name = name.to_string();
            self.cur.skip_blank();
            if self.cur.eat_str("??") {
                if let Some(inner) = self.nested_condition()? {
                    return Ok(Some(RawCondition::Variable {
                        name,
                        inner: Box::new(inner),
                    }));
                }
            }
        }
        self.cur.reset(start);

        if let Some(sign) = self.cur.peek().and_then(SizeSign::from_procmail) {
            self.cur.bump();
            self.cur.skip_blank();
            // a size too wide for u64 is left to the regex alternative
            if let Some(size) = self.cur.digits().and_then(|d| d.parse::<u64>().ok()) {
                return Ok(Some(RawCondition::Size { sign, size }));
            }
        }
        self.cur.reset(start);

        if self.cur.eat('?') {
            self.cur.skip_blank();
            let command = self.cur.rest_of_line().trim_end();
            if !command.is_empty() {
                return Ok(Some(RawCondition::Shell(command.to_string())));
            }
        }
        self.cur.reset(start);

        if self.cur.eat('!') {
            if let Some(inner) = self.nested_condition()? {
                return Ok(Some(RawCondition::Negate(Box::new(inner))));
            }
        }
        self.cur.reset(start);

        if self.cur.eat('$') {
            if let Some(inner) = self.nested_condition()? {
                return Ok(Some(RawCondition::Substitute(Box::new(inner))));
            }
        }
        self.cur.reset(start);

        if let Some(x) = self.weight() {
            self.cur.skip_blank();
            if self.cur.eat('^') {
                self.cur.skip_blank();
                if let Some(y) = self.weight() {
                    if let Some(inner) = self.nested_condition()? {
                        return Ok(Some(RawCondition::Score {
                            x,
                            y,
                            inner: Box::new(inner),
                        }));
                    }
                }
            }
        }
        self.cur.reset(start);

        Ok(self.regex()?.map(RawCondition::Regex))
    }

    fn nested_condition(&mut self) -> Attempt<RawCondition> {
        self.cur.skip_blank();
        if self.cur.at_line_end() {
            return Ok(None);
        }
        self.condition()
    }

    /// A score weight: an integer with an optional minus sign.
    fn weight(&mut self) -> Option<i64> {
        let start = self.cur.pos();
        self.cur.eat('-');
        let parsed = self
            .cur
            .digits()
            .and_then(|_| self.cur.input()[start..self.cur.pos()].parse().ok());
        if parsed.is_none() {
            self.cur.reset(start);
        }
        parsed
    }

    /// The rest of the line as a pattern. A line ending in an odd number of
    /// backslashes continues on the next one.
    fn regex(&mut self) -> Attempt<String> {
        let mut pattern = String::new();
        let mut fragment = self.cur.rest_of_line();
        if fragment.is_empty() {
            return Ok(None);
        }
        loop {
            let trailing = fragment.len() - fragment.trim_end_matches('\\').len();
            if trailing % 2 == 0 {
                pattern.push_str(fragment);
                return Ok(Some(pattern));
            }
            pattern.push_str(&fragment[..fragment.len() - 1]);
            if !self.cur.eat_line_end() || self.cur.is_eof() {
                return Err(self.error("line continuation at end of input"));
            }
            self.cur.skip_blank();
            fragment = self.cur.rest_of_line();
        }
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// The rest of the line up to a `#` that follows whitespace, leaving
    /// the cursor on that `#`.
    fn text_before_comment(&mut self) -> &'a str {
        let start = self.cur.pos();
        let line = self.cur.rest_of_line();
        let end = line
            .char_indices()
            .find(|&(i, c)| c == '#' && line[..i].ends_with(lexer::is_horizontal_space))
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        self.cur.reset(start + end);
        &line[..end]
    }

    fn action(&mut self) -> Attempt<RawAction> {
        let start = self.cur.pos();
        self.cur.skip_blank();

        if self.cur.eat('!') {
            self.cur.skip_blank();
            let recipients: Vec<String> = self
                .text_before_comment()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if !recipients.is_empty() {
                let comment = self.end_of_line("forward action")?;
                return Ok(Some(RawAction {
                    forward: Some(recipients),
                    comment,
                    ..Default::default()
                }));
            }
            self.cur.reset(start);
            self.cur.skip_blank();
        }

        if self.cur.eat('{') {
            let statements = self.statements(true)?;
            self.cur.skip_whitespace();
            if !self.cur.eat('}') {
                return Err(self.error("expected `}` to close nested block"));
            }
            let comment = self.end_of_line("nested block")?;
            return Ok(Some(RawAction {
                statements: Some(statements),
                comment,
                ..Default::default()
            }));
        }

        let before_shell = self.cur.pos();
        let mut variable = None;
        if let Some(name) = self.cur.identifier() {
            let name = name.to_string();
            self.cur.skip_blank();
            if self.cur.eat('=') {
                variable = Some(name);
                self.cur.skip_blank();
            } else {
                self.cur.reset(before_shell);
            }
        }
        if self.cur.eat('|') {
            self.cur.skip_blank();
            let command = self.cur.rest_of_line().trim_end().to_string();
            if !command.is_empty() {
                let comment = self.end_of_line("pipe action")?;
                return Ok(Some(RawAction {
                    shell: Some(RawShell { variable, command }),
                    comment,
                    ..Default::default()
                }));
            }
        }
        self.cur.reset(before_shell);

        match self.cur.peek() {
            Some(c) if lexer::is_printable(c) && !NOT_SAVE_START.contains(&c) => {
                let path = self.text_before_comment().trim_end().to_string();
                let comment = self.end_of_line("save action")?;
                Ok(Some(RawAction {
                    path: Some(path),
                    comment,
                    ..Default::default()
                }))
            }
            _ => {
                self.cur.reset(start);
                Ok(None)
            }
        }
    }
}
