/// Emit procmail rc text from AST nodes.
///
/// Indentation is regenerated from nesting depth. Trailing comments are
/// written only where the parser can read them back: condition and action
/// texts that run to the end of the line (regex, shell) would swallow them.
use crate::procmail::ast::*;
use crate::procmail::container::Document;
use crate::procmail::lexer::escape_quote;

const INDENT: &str = "    ";

pub fn emit(document: &Document) -> String {
    document
        .iter()
        .map(|statement| statement.render(0))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn emit_trailing_comment(out: &mut String, comment: &Option<Comment>) {
    if let Some(comment) = comment {
        out.push_str(" #");
        if !comment.text.is_empty() {
            out.push(' ');
            out.push_str(&comment.text);
        }
    }
}

pub fn emit_statement(out: &mut String, statement: &Statement, depth: usize) {
    match statement.kind() {
        StatementKind::Comment(comment) => emit_comment_line(out, comment, depth),
        StatementKind::Assignment(assignment) => emit_assignment(out, assignment, depth),
        StatementKind::Recipe(recipe) => emit_recipe(out, recipe, depth),
    }
}

pub fn emit_comment_line(out: &mut String, comment: &Comment, depth: usize) {
    indent(out, depth);
    out.push('#');
    if !comment.text.is_empty() {
        out.push(' ');
        out.push_str(&comment.text);
    }
}

fn emit_meta(out: &mut String, meta: &Meta, depth: usize) {
    let lines = [
        ("title", &meta.title),
        ("comment", &meta.comment),
        ("custom", &meta.custom),
    ];
    for (key, value) in lines {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            indent(out, depth);
            out.push_str(&format!("# {key}: {value}\n"));
        }
    }
}

pub fn emit_assignment(out: &mut String, assignment: &Assignment, depth: usize) {
    emit_meta(out, &assignment.meta, depth);
    indent(out, depth);
    let pairs: Vec<String> = assignment.variables.iter().map(variable_text).collect();
    out.push_str(&pairs.join(" "));
    emit_trailing_comment(out, &assignment.comment);
}

fn variable_text(variable: &Variable) -> String {
    let Some(value) = &variable.value else {
        return variable.name.clone();
    };
    match variable.quote.delimiter() {
        Some(delim) => format!(
            "{}={delim}{}{delim}",
            variable.name,
            escape_quote(value, delim)
        ),
        None => format!("{}={value}", variable.name),
    }
}

pub fn emit_header(out: &mut String, header: &Header, depth: usize) {
    indent(out, depth);
    out.push(':');
    out.push_str(&header.number);
    out.push_str(&header.rendered_flags());
    match &header.lockfile {
        Lockfile::Absent => {}
        Lockfile::Unnamed => out.push(':'),
        Lockfile::Named(name) => {
            out.push(':');
            out.push_str(name);
        }
    }
    emit_trailing_comment(out, &header.comment);
}

/// Text of a condition after the `*`, without its comment.
fn condition_text(condition: &Condition) -> String {
    match &condition.kind {
        ConditionKind::Empty => String::new(),
        ConditionKind::Shell(command) => format!("? {command}"),
        ConditionKind::Size { sign, size } => format!("{sign} {size}"),
        ConditionKind::Regex(pattern) => pattern.clone(),
        ConditionKind::Variable { name, condition } => {
            format!("{name} ?? {}", condition_text(condition))
        }
        ConditionKind::Negate(condition) => format!("! {}", condition_text(condition)),
        ConditionKind::Substitute(condition) => format!("$ {}", condition_text(condition)),
        ConditionKind::Score { x, y, condition } => {
            format!("{x} ^ {y} {}", condition_text(condition))
        }
    }
}

/// Whether a trailing comment after this condition would be read back as
/// a comment.
fn condition_ends_cleanly(condition: &Condition) -> bool {
    match &condition.kind {
        ConditionKind::Size { .. } => true,
        ConditionKind::Empty | ConditionKind::Shell(_) | ConditionKind::Regex(_) => false,
        ConditionKind::Variable { condition, .. }
        | ConditionKind::Negate(condition)
        | ConditionKind::Substitute(condition)
        | ConditionKind::Score { condition, .. } => condition_ends_cleanly(condition),
    }
}

pub fn emit_condition(out: &mut String, condition: &Condition, depth: usize) {
    indent(out, depth);
    out.push('*');
    let text = condition_text(condition);
    if !text.is_empty() {
        out.push(' ');
        out.push_str(&text);
    }
    if condition_ends_cleanly(condition) {
        emit_trailing_comment(out, &condition.comment);
    }
}

pub fn emit_action(out: &mut String, action: &Action, depth: usize) {
    indent(out, depth);
    match &action.kind {
        ActionKind::Forward(recipients) => {
            out.push_str("! ");
            out.push_str(&recipients.join(" "));
            emit_trailing_comment(out, &action.comment);
        }
        ActionKind::Shell { command, variable } => {
            if let Some(variable) = variable {
                out.push_str(variable);
                out.push('=');
            }
            out.push('|');
            out.push_str(command);
        }
        ActionKind::Save(path) => {
            out.push_str(path);
            emit_trailing_comment(out, &action.comment);
        }
        ActionKind::Nested(block) => {
            out.push_str("{\n");
            let children: Vec<String> = block.iter().map(|s| s.render(depth + 1)).collect();
            if !children.is_empty() {
                out.push_str(&children.join("\n"));
                out.push('\n');
            }
            indent(out, depth);
            out.push('}');
            emit_trailing_comment(out, &action.comment);
        }
    }
}

pub fn emit_recipe(out: &mut String, recipe: &Recipe, depth: usize) {
    out.push('\n');
    emit_meta(out, &recipe.meta, depth);
    emit_header(out, &recipe.header, depth);
    out.push('\n');
    if let Some(comment) = &recipe.condition_comment {
        emit_comment_line(out, comment, depth);
        out.push('\n');
    }
    for condition in &recipe.conditions {
        emit_condition(out, condition, depth);
        out.push('\n');
    }
    if let Some(comment) = &recipe.action_comment {
        emit_comment_line(out, comment, depth);
        out.push('\n');
    }
    emit_action(out, recipe.action(), depth);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::enums::{QuoteKind, SizeSign};

    fn size(size: u64) -> Condition {
        Condition::new(ConditionKind::Size {
            sign: SizeSign::Greater,
            size,
        })
    }

    #[test]
    fn test_emit_assignment_quotes() {
        let assignment = Assignment::new(vec![
            Variable::new("A", "a\"b", QuoteKind::Double),
            Variable::new("B", "it's", QuoteKind::Single),
            Variable::new("C", "date", QuoteKind::Backtick),
            Variable::new("D", "bare", QuoteKind::None),
            Variable::new("E", "", QuoteKind::None),
            Variable::bare("F"),
        ]);
        assert_eq!(
            assignment.render(0),
            r#"A="a\"b" B='it\'s' C=`date` D=bare E= F"#
        );
    }

    #[test]
    fn test_emit_assignment_meta_and_comment() {
        let mut assignment = Assignment::new(vec![Variable::new("X", "1", QuoteKind::None)]);
        assignment.meta.title = Some("Settings".into());
        assignment.meta.custom = Some("k=v".into());
        assignment.comment = Some(Comment::new("note"));
        assert_eq!(
            assignment.render(1),
            "    # title: Settings\n    # custom: k=v\n    X=1 # note"
        );
    }

    #[test]
    fn test_emit_header() {
        let mut header = Header::new("0", "Hhbc", Lockfile::Named("x.lock".into()));
        header.comment = Some(Comment::new("copy"));
        assert_eq!(header.render(0), ":0c:x.lock # copy");
        assert_eq!(Header::new("0", "B", Lockfile::Unnamed).render(2), "        :0B:");
    }

    #[test]
    fn test_emit_conditions() {
        let nested = Condition::new(ConditionKind::Score {
            x: 10,
            y: 1,
            condition: Box::new(Condition::new(ConditionKind::Negate(Box::new(
                Condition::regex("^From: x"),
            )))),
        });
        assert_eq!(nested.render(0), "* 10 ^ 1 ! ^From: x");

        let variable = Condition::new(ConditionKind::Variable {
            name: "B".into(),
            condition: Box::new(Condition::new(ConditionKind::Substitute(Box::new(
                Condition::new(ConditionKind::Shell("test -z $X".into())),
            )))),
        });
        assert_eq!(variable.render(0), "* B ?? $ ? test -z $X");
        assert_eq!(Condition::new(ConditionKind::Empty).render(1), "    *");
    }

    #[test]
    fn test_condition_comment_only_where_readable() {
        let mut big = size(1000);
        big.comment = Some(Comment::new("big"));
        assert_eq!(big.render(0), "* > 1000 # big");

        let mut regex = Condition::regex("^Subject");
        regex.comment = Some(Comment::new("lost"));
        assert_eq!(regex.render(0), "* ^Subject");
    }

    #[test]
    fn test_emit_actions() {
        let mut forward = Action::forward(["a@x", "b@x"]);
        forward.comment = Some(Comment::new("fw"));
        assert_eq!(forward.render(0), "! a@x b@x # fw");
        assert_eq!(
            Action::shell("formail -x To:", Some("TO".into())).render(0),
            "TO=|formail -x To:"
        );
        assert_eq!(Action::save("Mail/").render(1), "    Mail/");
        assert_eq!(Action::nested(vec![]).render(1), "    {\n    }");
    }

    #[test]
    fn test_emit_nested_recipe() {
        let inner = Recipe::new(
            Header::new("0", "", Lockfile::Absent),
            vec![size(10)],
            Action::save("/dev/null"),
        );
        let outer = Recipe::new(
            Header::new("0", "", Lockfile::Unnamed),
            vec![],
            Action::nested(vec![inner.into()]),
        );
        assert_eq!(
            outer.render(0),
            "\n:0:\n{\n\n    :0\n    * > 10\n    /dev/null\n\n}\n"
        );
    }

    #[test]
    fn test_emit_document_joins_with_newline() {
        let doc = Document::new(vec![
            Comment::new("top").into(),
            Assignment::new(vec![Variable::new("A", "1", QuoteKind::None)]).into(),
        ]);
        assert_eq!(doc.render(), "# top\nA=1");
    }
}
