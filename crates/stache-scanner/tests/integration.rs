//! End-to-end tests against a brace-delimited grammar shaped like the one
//! template dialects use.

use stache_scanner::{line_col, Role, ScanError, Scanner, Segment, TagDef, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Reserved,
    Unescaped,
    Comment,
    Run,
    Escaped,
    UnescapedClose,
    Close,
}

fn grammar() -> Scanner<Kind> {
    Scanner::new(vec![
        TagDef::open(Kind::Reserved, "{{$"),
        TagDef::open(Kind::Unescaped, "{{{").with_pattern(r"\{\{[\{&]"),
        TagDef::open(Kind::Comment, "{{!").with_pattern(r"\n[ \t]*\{\{!|\{\{!"),
        TagDef::open(Kind::Run, "{{~"),
        TagDef::open(Kind::Escaped, "{{"),
        TagDef::close(Kind::UnescapedClose, "}}}"),
        TagDef::close(Kind::Close, "}}"),
    ])
    .unwrap()
}

fn tags(input: &str) -> Vec<(Kind, String, Kind)> {
    grammar()
        .scan(input)
        .unwrap()
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Tag(tag) => Some((tag.open, tag.content.to_string(), tag.close)),
            Segment::Text { .. } => None,
        })
        .collect()
}

#[test]
fn every_opening_form_is_recognized() {
    let found = tags("{{a}}{{{b}}}{{&c}}{{!d}}{{~e}}{{$f}}");
    assert_eq!(
        found,
        vec![
            (Kind::Escaped, "a".into(), Kind::Close),
            (Kind::Unescaped, "b".into(), Kind::UnescapedClose),
            (Kind::Unescaped, "c".into(), Kind::Close),
            (Kind::Comment, "d".into(), Kind::Close),
            (Kind::Run, "e".into(), Kind::Close),
            (Kind::Reserved, "f".into(), Kind::Close),
        ]
    );
}

#[test]
fn triple_braces_never_read_as_escaped() {
    let found = tags("{{{x}}}");
    assert_eq!(found, vec![(Kind::Unescaped, "x".into(), Kind::UnescapedClose)]);
}

#[test]
fn section_markers_are_plain_content() {
    let found = tags("{{#list}}item{{/list}}");
    assert_eq!(
        found,
        vec![
            (Kind::Escaped, "#list".into(), Kind::Close),
            (Kind::Escaped, "/list".into(), Kind::Close),
        ]
    );
}

#[test]
fn comment_swallows_preceding_indentation() {
    let segments = grammar().scan("line\n    {{! note }}\nnext").unwrap();
    assert_eq!(
        segments[0],
        Segment::Text {
            text: "line",
            offset: 0
        }
    );
    match &segments[1] {
        Segment::Tag(tag) => {
            assert_eq!(tag.open, Kind::Comment);
            assert_eq!(tag.open_text, "\n    {{!");
            let (line, col) = line_col("line\n    {{! note }}\nnext", tag.position());
            assert_eq!((line, col), (2, 5));
        }
        other => panic!("expected comment tag, got {:?}", other),
    }
    assert_eq!(
        segments[2],
        Segment::Text {
            text: "\nnext",
            offset: 20
        }
    );
}

#[test]
fn roles_follow_definitions() {
    let roles: Vec<Role> = grammar()
        .tokens("{{x}}")
        .filter_map(|token| match token {
            Token::Delimiter { role, .. } => Some(role),
            Token::Text { .. } => None,
        })
        .collect();
    assert_eq!(roles, vec![Role::Open, Role::Close]);
}

#[test]
fn unclosed_reports_position_of_open() {
    let err = grammar().scan("ok\n\n  {{{ name").unwrap_err();
    assert!(matches!(
        err,
        ScanError::Unclosed {
            line: 3,
            col: 3,
            ..
        }
    ));
    assert!(err.to_string().contains("{{{"));
}

#[test]
fn text_only_input_is_untouched() {
    let input = "no tags { here } at all";
    let segments = grammar().scan(input).unwrap();
    assert_eq!(
        segments,
        vec![Segment::Text {
            text: input,
            offset: 0
        }]
    );
}
