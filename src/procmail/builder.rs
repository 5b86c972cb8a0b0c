/// Build the typed AST from raw parse records.
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::enums::QuoteKind;
use crate::procmail::ast::*;
use crate::procmail::container::Document;
use crate::procmail::cst::*;
use crate::procmail::lexer::unescape_quote;

pub fn build(raw: Vec<RawStatement>) -> Result<Document> {
    let statements = build_statements(raw)?;
    debug!(statements = statements.len(), "built document");
    Ok(Document::new(statements))
}

fn build_statements(raw: Vec<RawStatement>) -> Result<Vec<Statement>> {
    let mut statements = Vec::with_capacity(raw.len());
    for item in raw {
        let statement = match item {
            RawStatement::Comment(text) => Comment::new(text).into(),
            RawStatement::Assignments(group) => build_assignment(group).into(),
            RawStatement::Recipe(recipe) => build_recipe(recipe)?.into(),
            RawStatement::Substitution(text) => {
                warn!(substitution = %text, "dropping bare substitution statement");
                continue;
            }
        };
        statements.push(statement);
    }
    Ok(statements)
}

fn comment(text: Option<String>) -> Option<Comment> {
    text.map(Comment::new)
}

fn build_meta(raw: RawMeta) -> Meta {
    Meta {
        title: raw.title,
        comment: raw.comment,
        custom: raw.custom,
    }
}

fn build_assignment(group: RawAssignments) -> Assignment {
    let variables = group
        .pairs
        .into_iter()
        .map(|pair| match pair.value {
            None => Variable::bare(pair.name),
            Some(RawValue::Bare(value)) => Variable::new(pair.name, value, QuoteKind::None),
            Some(RawValue::DoubleQuoted(raw)) => {
                Variable::new(pair.name, unescape_quote(&raw, '"'), QuoteKind::Double)
            }
            Some(RawValue::SingleQuoted(raw)) => {
                Variable::new(pair.name, unescape_quote(&raw, '\''), QuoteKind::Single)
            }
            Some(RawValue::Backtick(raw)) => {
                Variable::new(pair.name, unescape_quote(&raw, '`'), QuoteKind::Backtick)
            }
        })
        .collect();
    Assignment {
        variables,
        comment: comment(group.comment),
        meta: build_meta(group.meta),
    }
}

fn build_header(raw: RawHeader) -> Header {
    let mut tokens = raw.lockfile.into_iter();
    let lockfile = match (tokens.next(), tokens.next()) {
        (None, _) => Lockfile::Absent,
        (Some(_), None) => Lockfile::Unnamed,
        (Some(_), Some(name)) => Lockfile::Named(name),
    };
    Header {
        number: raw.number,
        flags: raw.flags,
        lockfile,
        comment: comment(raw.comment),
    }
}

fn build_condition(raw: RawCondition) -> Condition {
    let kind = match raw {
        RawCondition::Variable { name, inner } => ConditionKind::Variable {
            name,
            condition: Box::new(build_condition(*inner)),
        },
        RawCondition::Size { sign, size } => ConditionKind::Size { sign, size },
        RawCondition::Shell(command) => ConditionKind::Shell(command),
        RawCondition::Negate(inner) => ConditionKind::Negate(Box::new(build_condition(*inner))),
        RawCondition::Substitute(inner) => {
            ConditionKind::Substitute(Box::new(build_condition(*inner)))
        }
        RawCondition::Score { x, y, inner } => ConditionKind::Score {
            x,
            y,
            condition: Box::new(build_condition(*inner)),
        },
        RawCondition::Regex(pattern) => ConditionKind::Regex(pattern),
    };
    Condition::new(kind)
}

fn build_condition_line(line: RawConditionLine) -> Condition {
    let mut condition = match line.condition {
        Some(raw) => build_condition(raw),
        None => Condition::new(ConditionKind::Empty),
    };
    condition.comment = comment(line.comment);
    condition
}

fn build_action(raw: RawAction) -> Result<Action> {
    let RawAction {
        forward,
        statements,
        shell,
        path,
        comment: text,
    } = raw;
    let kind = match (statements, forward, shell, path) {
        (Some(statements), ..) => ActionKind::Nested(build_statements(statements)?.into()),
        (None, Some(recipients), ..) => ActionKind::Forward(recipients),
        (None, None, Some(shell), _) => ActionKind::Shell {
            command: shell.command,
            variable: shell.variable,
        },
        (None, None, None, Some(path)) => ActionKind::Save(path),
        (None, None, None, None) => {
            return Err(Error::Build("action line captured nothing".into()))
        }
    };
    Ok(Action {
        kind,
        comment: comment(text),
    })
}

fn build_recipe(raw: RawRecipe) -> Result<Recipe> {
    let mut recipe = Recipe::new(
        build_header(raw.header),
        raw.conditions.into_iter().map(build_condition_line).collect(),
        build_action(raw.action)?,
    );
    recipe.meta = build_meta(raw.meta);
    recipe.condition_comment = comment(raw.comment_condition);
    recipe.action_comment = comment(raw.comment_action);
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::enums::{Flag, SizeSign};
    use crate::procmail::container::{Container, Parent};
    use crate::procmail::parser::parse;

    fn build_text(text: &str) -> Document {
        build(parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_build_spam_recipe() {
        let doc = build_text(":0:\n* ^From.*spam\nspam-folder/\n");
        assert_eq!(doc.len().unwrap(), 1);
        let recipe = doc.body().get(0).unwrap().as_recipe().unwrap();
        assert_eq!(recipe.header.number, "0");
        assert_eq!(recipe.header.lockfile, Lockfile::Unnamed);
        assert!(recipe.header.has_flag(Flag::Headers));
        assert_eq!(recipe.conditions, vec![Condition::regex("^From.*spam")]);
        assert_eq!(recipe.action().kind, ActionKind::Save("spam-folder/".into()));
        assert_eq!(doc.render(), "\n:0:\n* ^From.*spam\nspam-folder/\n");
    }

    #[test]
    fn test_build_quoted_values() {
        let doc = build_text("VAR=\"a\\\"b\" W='x' Z=`id -u` B N=\n");
        let assignment = doc.body().get(0).unwrap().as_assignment().unwrap();
        let values: Vec<_> = assignment
            .variables
            .iter()
            .map(|v| (v.value.as_deref(), v.quote))
            .collect();
        assert_eq!(
            values,
            vec![
                (Some("a\"b"), QuoteKind::Double),
                (Some("x"), QuoteKind::Single),
                (Some("id -u"), QuoteKind::Backtick),
                (None, QuoteKind::None),
                (Some(""), QuoteKind::None),
            ]
        );
    }

    #[test]
    fn test_build_lockfile_kinds() {
        let doc = build_text(":0\nx\n:0:\nx\n:0: x.lock\nx\n");
        let lockfiles: Vec<_> = doc
            .iter()
            .map(|s| s.as_recipe().unwrap().header.lockfile.clone())
            .collect();
        assert_eq!(
            lockfiles,
            vec![
                Lockfile::Absent,
                Lockfile::Unnamed,
                Lockfile::Named("x.lock".into())
            ]
        );
    }

    #[test]
    fn test_build_nested_ids() {
        let doc = build_text("A=1\n:0\n* x\n{\n  :0\n  * > 5\n  /dev/null\n  B=2\n}\n");
        let outer = doc.body().get(1).unwrap();
        assert_eq!(outer.id(), Some("1"));
        assert_eq!(outer.as_recipe().unwrap().len().unwrap(), 2);
        let inner = doc.get("1.0").unwrap();
        assert_eq!(inner.parent(), Some(&Parent::Recipe("1".into())));
        assert_eq!(inner.recipe_number(), Some(1));
        assert!(inner.is_first());
        assert!(doc.get("1.1").unwrap().is_last());
        let condition = &inner.as_recipe().unwrap().conditions[0];
        assert_eq!(
            condition.kind,
            ConditionKind::Size {
                sign: SizeSign::Greater,
                size: 5
            }
        );
    }

    #[test]
    fn test_substitution_is_dropped() {
        let doc = build_text("$HOME\nA=1\n");
        assert_eq!(doc.len().unwrap(), 1);
        assert!(doc.body().get(0).unwrap().is_assignment());
    }

    #[test]
    fn test_empty_action_shape_is_rejected() {
        let raw = RawAction::default();
        assert!(matches!(build_action(raw), Err(Error::Build(_))));
    }

    #[test]
    fn test_comments_attach() {
        let doc = build_text(":0 # head\n# conds\n* > 10 # big\n# act\n! me@x # fw\n");
        let recipe = doc.body().get(0).unwrap().as_recipe().unwrap();
        assert_eq!(recipe.header.comment, Some(Comment::new("head")));
        assert_eq!(recipe.condition_comment, Some(Comment::new("conds")));
        assert_eq!(recipe.conditions[0].comment, Some(Comment::new("big")));
        assert_eq!(recipe.action_comment, Some(Comment::new("act")));
        assert_eq!(recipe.action().comment, Some(Comment::new("fw")));
    }
}
