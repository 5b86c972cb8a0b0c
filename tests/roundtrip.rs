mod common;

use std::collections::HashSet;

use procmailrc::ast::{
    Action, ActionKind, Assignment, Comment, Condition, ConditionKind, Header, Lockfile, Recipe,
    Statement, Variable,
};
use procmailrc::{parse_text, Block, Container, Document, Error, Flag, Parent, QuoteKind};

fn check_ids(block: &Block, prefix: &str, seen: &mut HashSet<String>) {
    let len = block.len();
    for (index, statement) in block.iter().enumerate() {
        let expected = format!("{prefix}{index}");
        assert_eq!(statement.id(), Some(expected.as_str()));
        assert!(seen.insert(expected.clone()), "duplicate id {expected}");
        assert_eq!(statement.is_first(), index == 0);
        assert_eq!(statement.is_last(), index + 1 == len);
        let parent = statement.parent().expect("attached statement has a parent");
        assert_eq!(parent.id(), prefix.trim_end_matches('.'));
        if let Some(nested) = statement.as_recipe().and_then(Recipe::nested) {
            check_ids(nested, &format!("{expected}."), seen);
        }
    }
}

fn assert_consistent(doc: &Document) {
    check_ids(doc.body(), "", &mut HashSet::new());
}

fn save(path: &str) -> Statement {
    Recipe::new(Header::new("0", "", Lockfile::Unnamed), vec![], Action::save(path)).into()
}

#[test]
fn test_sample_round_trip() {
    common::init_tracing();
    let doc = parse_text(common::SAMPLE).unwrap();
    let rendered = doc.render();
    let reparsed = parse_text(&rendered).unwrap();
    assert_eq!(reparsed, doc);
    assert_eq!(reparsed.render(), rendered);
    assert_consistent(&doc);
}

#[test]
fn test_sample_structure() {
    common::init_tracing();
    let doc = parse_text(common::SAMPLE).unwrap();
    let kinds: Vec<&str> = doc
        .iter()
        .map(|s| match s {
            s if s.is_comment() => "comment",
            s if s.is_assignment() => "assignment",
            _ => "recipe",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "comment",
            "comment",
            "assignment",
            "assignment",
            "assignment",
            "assignment",
            "assignment",
            "recipe",
            "recipe",
            "recipe",
            "recipe"
        ]
    );

    let lists = doc.get("7").unwrap();
    assert_eq!(lists.title(), "Mailing lists");
    let lists = lists.as_recipe().unwrap();
    assert_eq!(lists.meta.comment.as_deref(), Some("one folder per list"));
    assert_eq!(lists.header.lockfile, Lockfile::Named("lists.lock".into()));
    assert_eq!(lists.header.rendered_flags(), "c");

    let body = doc.get("8").unwrap();
    assert_eq!(body.title(), "Recipe 2");
    let body = body.as_recipe().unwrap();
    assert_eq!(body.conditions.len(), 5);
    assert!(body.conditions[0].is_size());
    assert!(body.conditions[1].is_negate());
    assert!(body.conditions[2].is_substitute());
    assert!(body.conditions[3].is_score());
    match &body.conditions[4].kind {
        ConditionKind::Score {
            x: -100,
            y: 0,
            condition,
        } => assert!(condition.is_variable()),
        other => panic!("Expected score, got {other:?}"),
    }
    assert_eq!(body.action_comment, Some(Comment::new("drop it")));

    let boss = doc.get("9").unwrap().as_recipe().unwrap();
    assert_eq!(boss.len().unwrap(), 5);
    assert!(doc.get("9.0").unwrap().as_recipe().unwrap().action().is_forward());
    assert!(doc.get("9.1").unwrap().as_recipe().unwrap().action().is_shell());
    assert_eq!(doc.get("9.4").unwrap().recipe_number(), Some(3));

    let vacation = doc.get("10").unwrap().as_recipe().unwrap();
    assert_eq!(
        vacation.action().kind,
        ActionKind::Shell {
            command: "vacation $LOGNAME".into(),
            variable: Some("RESULT".into()),
        }
    );
    assert!(vacation.conditions[0].is_shell());
}

#[test]
fn test_quote_preservation() {
    let doc = parse_text(r#"VAR="a\"b""#).unwrap();
    assert_eq!(doc.render(), r#"VAR="a\"b""#);
    let doc = parse_text("VAR=bare").unwrap();
    assert_eq!(doc.render(), "VAR=bare");
    let doc = parse_text("A='x y' B=`date +%s` C").unwrap();
    assert_eq!(doc.render(), "A='x y' B=`date +%s` C");
}

#[test]
fn test_flag_canonicalization_on_render() {
    for (flags, rendered) in [("Hhb", ""), ("hb", ""), ("B", "B"), ("HBhb", "HB"), ("Hfw", "fw")] {
        let doc = parse_text(&format!(":0{flags}\n/dev/null\n")).unwrap();
        let recipe = doc.get("0").unwrap().as_recipe().unwrap();
        assert_eq!(recipe.header.render(0), format!(":0{rendered}"), "flags {flags:?}");
    }
}

#[test]
fn test_set_flag_survives_round_trip() {
    let mut doc = parse_text(":0\n* ^From\nfolder/\n").unwrap();
    let mut entry = doc.get_mut("0").unwrap();
    let recipe = entry.as_recipe_mut().unwrap();
    recipe.header.set_flag(Flag::Copy, true);
    recipe.header.set_flag(Flag::PipeBody, false);
    drop(entry);
    let reparsed = parse_text(&doc.render()).unwrap();
    let header = &reparsed.get("0").unwrap().as_recipe().unwrap().header;
    assert!(header.has_flag(Flag::Copy));
    assert!(header.has_flag(Flag::PipeHeaders));
    assert!(!header.has_flag(Flag::PipeBody));
}

#[test]
fn test_ids_after_mutations() {
    common::init_tracing();
    let mut doc = parse_text(common::SAMPLE).unwrap();
    doc.insert(0, Comment::new("inserted")).unwrap();
    assert_consistent(&doc);

    let mut entry = doc.get_mut("10").unwrap();
    let boss = entry.as_recipe_mut().unwrap();
    boss.append(save("more/")).unwrap();
    boss.insert(0, Comment::new("first")).unwrap();
    boss.pop(Some(2)).unwrap();
    drop(entry);
    assert_consistent(&doc);

    let popped = doc.pop(None).unwrap();
    assert_eq!(popped.id(), None);
    doc.extend([popped, save("last/")]).unwrap();
    assert_consistent(&doc);

    doc.reverse().unwrap();
    assert_consistent(&doc);
    doc.sort_by(|a, b| a.is_recipe().cmp(&b.is_recipe())).unwrap();
    assert_consistent(&doc);

    let target = doc.item(0).unwrap().clone();
    doc.remove(&target).unwrap();
    assert_consistent(&doc);

    let nested_id = doc
        .iter()
        .find(|s| s.as_recipe().is_some_and(|r| r.action().is_nested()))
        .and_then(|s| s.id())
        .unwrap()
        .to_string();
    let deleted = doc.delete(&format!("{nested_id}.0")).unwrap();
    assert_eq!(deleted.parent, Parent::Recipe(nested_id));
    assert_consistent(&doc);
}

#[test]
fn test_replacing_through_get_mut_renumbers() {
    let mut doc = parse_text("A=1\nB=2\n").unwrap();
    *doc.get_mut("0").unwrap() = Statement::from(Comment::new("x"));
    assert_eq!(doc.len().unwrap(), 2);
    let first = doc.get("0").unwrap();
    assert_eq!(first.id(), Some("0"));
    assert!(first.is_first());
    assert_consistent(&doc);

    *doc.get_mut("1").unwrap().kind_mut() = save("b/").into_kind();
    assert_eq!(doc.get("1").unwrap().recipe_number(), Some(1));
    assert_consistent(&doc);

    let nested: Statement = Recipe::new(
        Header::new("0", "", Lockfile::Absent),
        vec![],
        Action::nested(vec![save("inner/")]),
    )
    .into();
    *doc.get_mut("0").unwrap() = nested;
    let inner = doc.get("0.0").unwrap();
    assert_eq!(inner.parent(), Some(&Parent::Recipe("0".into())));
    assert_consistent(&doc);

    let mut outer = doc.get_mut("0").unwrap();
    let recipe = outer.as_recipe_mut().unwrap();
    *recipe = Recipe::new(
        Header::new("0", "", Lockfile::Absent),
        vec![],
        Action::nested(vec![Comment::new("a").into(), Comment::new("b").into()]),
    );
    drop(outer);
    assert_eq!(doc.get("0.1").unwrap().id(), Some("0.1"));
    assert!(doc.get("0.1").unwrap().is_last());
    assert_consistent(&doc);
}

#[test]
fn test_recipe_numbering_independence() {
    let mut doc = parse_text(":0\na/\n:0\nb/\n").unwrap();
    doc.insert(1, Comment::new("between")).unwrap();
    assert_eq!(doc.get("0").unwrap().recipe_number(), Some(1));
    assert_eq!(doc.get("2").unwrap().recipe_number(), Some(2));

    doc.insert(1, save("new/")).unwrap();
    let numbers: Vec<_> = doc.iter().map(Statement::recipe_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2), None, Some(3)]);
}

#[test]
fn test_nested_only_mutation_guard() {
    let mut doc = parse_text("A=1\nB=2\nC=3\n:0:\nspam/\n:0\n{\n}\n").unwrap();
    let mut saver = doc.get_mut("3").unwrap();
    let result = saver.as_recipe_mut().unwrap().append(Comment::new("x"));
    assert!(matches!(result, Err(Error::NotAContainer { operation: "append" })));
    drop(saver);

    let mut nested = doc.get_mut("4").unwrap();
    let recipe = nested.as_recipe_mut().unwrap();
    recipe.append(Assignment::new(vec![Variable::bare("X")])).unwrap();
    drop(nested);
    assert_eq!(doc.get("4.0").unwrap().id(), Some("4.0"));
}

#[test]
fn test_concrete_nested_block() {
    let doc = parse_text(":0\n{ :0 \n * size \n /dev/null \n }\n").unwrap();
    let outer = doc.get("0").unwrap().as_recipe().unwrap();
    assert_eq!(outer.len().unwrap(), 1);
    let inner = doc.get("0.0").unwrap().as_recipe().unwrap();
    assert_eq!(inner.conditions, vec![Condition::regex("size ")]);
    assert_eq!(inner.action().kind, ActionKind::Save("/dev/null".into()));
}

#[test]
fn test_concrete_spam_recipe() {
    let text = ":0:\n* ^From.*spam\nspam-folder/\n";
    let doc = parse_text(text).unwrap();
    assert_eq!(doc.len().unwrap(), 1);
    let recipe = doc.get("0").unwrap().as_recipe().unwrap();
    assert_eq!(recipe.header, Header::new("0", "", Lockfile::Unnamed));
    assert_eq!(recipe.conditions, vec![Condition::regex("^From.*spam")]);
    assert_eq!(recipe.action(), &Action::save("spam-folder/"));
    assert_eq!(doc.render(), format!("\n{text}"));
}

#[test]
fn test_parse_error_reports_position() {
    let err = parse_text("A=1\n:0\n* ^x\n").unwrap_err();
    let Error::Parse(err) = err else {
        panic!("Expected parse error, got {err:?}");
    };
    assert_eq!(err.position.line, 3);
    assert_eq!(err.message, "expected an action");
}

#[test]
fn test_quoted_value_with_crlf() {
    let doc = parse_text("NAME=\"x\"\r\n:0\r\n* ^a\r\nbox\r\n").unwrap();
    let assignment = doc.get("0").unwrap().as_assignment().unwrap();
    assert_eq!(assignment.variables[0].quote, QuoteKind::Double);
    let recipe = doc.get("1").unwrap().as_recipe().unwrap();
    assert_eq!(recipe.conditions, vec![Condition::regex("^a")]);
}
