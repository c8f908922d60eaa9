//! Priority-ordered delimiter scanner for template dialects.
//!
//! This crate provides the tokenizing engine underneath template compilers:
//! it walks raw text against an ordered table of delimiter definitions and
//! splits it into plain text and delimited tags. It knows nothing about what
//! a tag *means*; the dialect on top decides that.
//!
//! # Example
//!
//! ```rust
//! use stache_scanner::{Scanner, Segment, TagDef};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind {
//!     Open,
//!     Close,
//! }
//!
//! let scanner = Scanner::new(vec![
//!     TagDef::open(Kind::Open, "<%"),
//!     TagDef::close(Kind::Close, "%>"),
//! ])
//! .unwrap();
//!
//! let segments = scanner.scan("a <% b %> c").unwrap();
//! assert_eq!(segments.len(), 3);
//! match &segments[1] {
//!     Segment::Tag(tag) => assert_eq!(tag.content, " b "),
//!     Segment::Text { .. } => unreachable!(),
//! }
//! ```
//!
//! # Priority
//!
//! The order of the definitions is their priority. All definitions are joined
//! into a single leftmost-first alternation, so at any position the earliest
//! definition that matches wins. A delimiter that has a shorter delimiter as
//! a prefix (`{{{` vs `{{`) must therefore come first, or the shorter one
//! will always be picked.
//!
//! A definition normally matches its literal text. An optional pattern
//! overrides that with a regular expression, which lets one definition cover
//! several spellings (`{{{` and `{{&`) or swallow surrounding whitespace.
//!
//! # Pairing
//!
//! Every tag is an opening delimiter, its raw content, and the next closing
//! delimiter. Tags do not nest: an opening delimiter inside an open tag is an
//! error, as is a tag left open at the end of the input. A closing delimiter
//! outside of a tag is ordinary text.

use regex::{Captures, Regex};
use thiserror::Error;

/// Whether a delimiter starts or ends a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Starts a tag; the content runs until the next closing delimiter.
    Open,
    /// Ends the currently open tag.
    Close,
}

/// One entry of the ordered delimiter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef<K> {
    /// Dialect-specific kind reported back for matches of this definition.
    pub kind: K,
    /// Canonical spelling of the delimiter, used in diagnostics.
    pub literal: &'static str,
    /// Optional regular expression overriding the literal match.
    pub pattern: Option<&'static str>,
    /// Whether the delimiter opens or closes a tag.
    pub role: Role,
}

impl<K> TagDef<K> {
    /// Creates an opening delimiter matched by its literal text.
    pub fn open(kind: K, literal: &'static str) -> Self {
        Self {
            kind,
            literal,
            pattern: None,
            role: Role::Open,
        }
    }

    /// Creates a closing delimiter matched by its literal text.
    pub fn close(kind: K, literal: &'static str) -> Self {
        Self {
            kind,
            literal,
            pattern: None,
            role: Role::Close,
        }
    }

    /// Overrides the literal match with a regular expression.
    pub fn with_pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    fn regex_source(&self) -> String {
        match self.pattern {
            Some(pattern) => pattern.to_string(),
            None => regex::escape(self.literal),
        }
    }
}

/// Errors produced while building a scanner or scanning input.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The delimiter table is empty.
    #[error("grammar has no delimiters")]
    EmptyGrammar,

    /// A delimiter pattern is not a valid regular expression.
    #[error("invalid pattern for delimiter `{literal}`: {source}")]
    InvalidPattern {
        literal: String,
        #[source]
        source: regex::Error,
    },

    /// A delimiter pattern matches the empty string and would never advance.
    #[error("pattern for delimiter `{literal}` matches the empty string")]
    EmptyPattern { literal: String },

    /// A tag was still open at the end of the input.
    #[error("unclosed tag `{open}` at line {line}, column {col}")]
    Unclosed {
        open: String,
        offset: usize,
        line: usize,
        col: usize,
    },

    /// An opening delimiter appeared inside a tag that was still open.
    #[error("tag `{open}` at line {line}, column {col} opened inside an unclosed tag")]
    NestedOpen {
        open: String,
        offset: usize,
        line: usize,
        col: usize,
    },
}

impl ScanError {
    fn unclosed(input: &str, open_text: &str, offset: usize) -> Self {
        let offset = offset + leading_whitespace(open_text);
        let (line, col) = line_col(input, offset);
        Self::Unclosed {
            open: open_text.trim_start().to_string(),
            offset,
            line,
            col,
        }
    }

    fn nested(input: &str, open_text: &str, offset: usize) -> Self {
        let offset = offset + leading_whitespace(open_text);
        let (line, col) = line_col(input, offset);
        Self::NestedOpen {
            open: open_text.trim_start().to_string(),
            offset,
            line,
            col,
        }
    }

    /// Byte offset in the input the error points at, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Unclosed { offset, .. } | Self::NestedOpen { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// A raw token: either plain text or a single delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a, K> {
    /// Text between delimiters.
    Text { text: &'a str, offset: usize },
    /// A matched delimiter.
    Delimiter {
        kind: K,
        role: Role,
        text: &'a str,
        offset: usize,
    },
}

/// A delimited tag with its raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a, K> {
    /// Kind of the opening delimiter.
    pub open: K,
    /// Exact text the opening delimiter matched.
    pub open_text: &'a str,
    /// Everything between the delimiters, untrimmed.
    pub content: &'a str,
    /// Kind of the closing delimiter.
    pub close: K,
    /// Exact text the closing delimiter matched.
    pub close_text: &'a str,
    /// Byte offset where the opening match starts.
    pub offset: usize,
}

impl<K> Tag<'_, K> {
    /// Byte offset of the first non-whitespace character of the opening
    /// delimiter. Differs from [`Tag::offset`] when the opening pattern
    /// consumes leading whitespace.
    pub fn position(&self) -> usize {
        self.offset + leading_whitespace(self.open_text)
    }
}

/// Output of [`Scanner::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a, K> {
    /// Plain text, including stray closing delimiters.
    Text { text: &'a str, offset: usize },
    /// A complete tag.
    Tag(Tag<'a, K>),
}

/// A compiled delimiter table.
///
/// `Scanner` is immutable after construction and can be shared freely.
#[derive(Debug, Clone)]
pub struct Scanner<K> {
    defs: Vec<TagDef<K>>,
    groups: Vec<String>,
    regex: Regex,
}

impl<K: Copy> Scanner<K> {
    /// Compiles an ordered delimiter table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, a pattern is invalid, or a
    /// pattern can match the empty string.
    pub fn new(defs: Vec<TagDef<K>>) -> Result<Self, ScanError> {
        if defs.is_empty() {
            return Err(ScanError::EmptyGrammar);
        }

        let mut groups = Vec::with_capacity(defs.len());
        let mut alternatives = Vec::with_capacity(defs.len());
        for (index, def) in defs.iter().enumerate() {
            let source = def.regex_source();
            let single = Regex::new(&source).map_err(|source| ScanError::InvalidPattern {
                literal: def.literal.to_string(),
                source,
            })?;
            if single.is_match("") {
                return Err(ScanError::EmptyPattern {
                    literal: def.literal.to_string(),
                });
            }

            let group = format!("d{index}");
            alternatives.push(format!("(?P<{group}>{source})"));
            groups.push(group);
        }

        let regex = Regex::new(&alternatives.join("|")).map_err(|source| {
            ScanError::InvalidPattern {
                literal: defs
                    .iter()
                    .map(|def| def.literal)
                    .collect::<Vec<_>>()
                    .join(" "),
                source,
            }
        })?;

        Ok(Self {
            defs,
            groups,
            regex,
        })
    }

    /// The delimiter table, in priority order.
    pub fn defs(&self) -> &[TagDef<K>] {
        &self.defs
    }

    /// Returns an iterator over raw tokens of `input`.
    pub fn tokens<'s, 'a>(&'s self, input: &'a str) -> Tokens<'s, 'a, K> {
        Tokens {
            scanner: self,
            input,
            pos: 0,
            pending: None,
        }
    }

    /// Splits `input` into text and complete tags.
    ///
    /// Adjacent text (including stray closing delimiters) is merged into a
    /// single segment.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NestedOpen`] when a tag opens inside another tag
    /// and [`ScanError::Unclosed`] when the input ends inside a tag.
    pub fn scan<'a>(&self, input: &'a str) -> Result<Vec<Segment<'a, K>>, ScanError> {
        let mut segments = Vec::new();
        let mut open: Option<(K, &'a str, usize)> = None;

        for token in self.tokens(input) {
            match token {
                Token::Text { text, offset } => {
                    // Inside a tag the text is content; it is sliced out when the tag closes.
                    if open.is_none() {
                        push_text(&mut segments, input, offset, offset + text.len());
                    }
                }
                Token::Delimiter {
                    kind,
                    role: Role::Open,
                    text,
                    offset,
                } => {
                    if open.is_some() {
                        return Err(ScanError::nested(input, text, offset));
                    }
                    open = Some((kind, text, offset));
                }
                Token::Delimiter {
                    kind,
                    role: Role::Close,
                    text,
                    offset,
                } => match open.take() {
                    Some((open_kind, open_text, open_offset)) => {
                        let content_start = open_offset + open_text.len();
                        segments.push(Segment::Tag(Tag {
                            open: open_kind,
                            open_text,
                            content: &input[content_start..offset],
                            close: kind,
                            close_text: text,
                            offset: open_offset,
                        }));
                    }
                    None => push_text(&mut segments, input, offset, offset + text.len()),
                },
            }
        }

        if let Some((_, open_text, offset)) = open {
            return Err(ScanError::unclosed(input, open_text, offset));
        }

        Ok(segments)
    }

    fn matched(&self, caps: &Captures<'_>) -> Option<&TagDef<K>> {
        self.groups
            .iter()
            .position(|group| caps.name(group).is_some())
            .map(|index| &self.defs[index])
    }
}

/// Iterator over raw tokens, created by [`Scanner::tokens`].
pub struct Tokens<'s, 'a, K> {
    scanner: &'s Scanner<K>,
    input: &'a str,
    pos: usize,
    pending: Option<Token<'a, K>>,
}

impl<'a, K: Copy> Iterator for Tokens<'_, 'a, K> {
    type Item = Token<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }
        if self.pos >= self.input.len() {
            return None;
        }

        let start = self.pos;
        let caps = match self.scanner.regex.captures_at(self.input, start) {
            Some(caps) => caps,
            None => {
                self.pos = self.input.len();
                return Some(Token::Text {
                    text: &self.input[start..],
                    offset: start,
                });
            }
        };

        let whole = caps.get(0)?;
        let def = self.scanner.matched(&caps)?;
        let delimiter = Token::Delimiter {
            kind: def.kind,
            role: def.role,
            text: whole.as_str(),
            offset: whole.start(),
        };
        self.pos = whole.end();

        if whole.start() > start {
            self.pending = Some(delimiter);
            Some(Token::Text {
                text: &self.input[start..whole.start()],
                offset: start,
            })
        } else {
            Some(delimiter)
        }
    }
}

fn push_text<'a, K>(segments: &mut Vec<Segment<'a, K>>, input: &'a str, start: usize, end: usize) {
    if start == end {
        return;
    }
    if let Some(Segment::Text { text, offset }) = segments.last_mut() {
        if *offset + text.len() == start {
            *text = &input[*offset..end];
            return;
        }
    }
    segments.push(Segment::Text {
        text: &input[start..end],
        offset: start,
    });
}

fn leading_whitespace(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Converts a byte offset into a 1-based `(line, column)` pair.
///
/// Columns count characters, not bytes. Offsets past the end clamp to the
/// end of the input.
pub fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let before = input.get(..offset.min(input.len())).unwrap_or(input);
    let line = before.matches('\n').count() + 1;
    let col = before
        .rsplit('\n')
        .next()
        .map_or(0, |last| last.chars().count())
        + 1;
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Triple,
        Comment,
        Double,
        TripleClose,
        Close,
    }

    fn braces() -> Scanner<Kind> {
        Scanner::new(vec![
            TagDef::open(Kind::Triple, "{{{").with_pattern(r"\{\{[\{&]"),
            TagDef::open(Kind::Comment, "{{!").with_pattern(r"\n[ \t]*\{\{!|\{\{!"),
            TagDef::open(Kind::Double, "{{"),
            TagDef::close(Kind::TripleClose, "}}}"),
            TagDef::close(Kind::Close, "}}"),
        ])
        .unwrap()
    }

    fn tag<'a>(segment: &'a Segment<'a, Kind>) -> &'a Tag<'a, Kind> {
        match segment {
            Segment::Tag(tag) => tag,
            Segment::Text { text, .. } => panic!("expected tag, got text {:?}", text),
        }
    }

    // ==================== Construction ====================

    mod construction {
        use super::*;

        #[test]
        fn empty_grammar_rejected() {
            let result = Scanner::<Kind>::new(Vec::new());
            assert!(matches!(result, Err(ScanError::EmptyGrammar)));
        }

        #[test]
        fn invalid_pattern_rejected() {
            let result = Scanner::new(vec![TagDef::open(Kind::Double, "{{").with_pattern("(")]);
            match result {
                Err(ScanError::InvalidPattern { literal, .. }) => assert_eq!(literal, "{{"),
                other => panic!("unexpected result: {:?}", other.map(|_| ())),
            }
        }

        #[test]
        fn empty_matching_pattern_rejected() {
            let result = Scanner::new(vec![TagDef::open(Kind::Double, "{{").with_pattern("x*")]);
            assert!(matches!(result, Err(ScanError::EmptyPattern { .. })));
        }

        #[test]
        fn literals_are_escaped() {
            let scanner = Scanner::new(vec![
                TagDef::open(Kind::Double, "$("),
                TagDef::close(Kind::Close, ")$"),
            ])
            .unwrap();
            let segments = scanner.scan("a$(b)$c").unwrap();
            assert_eq!(tag(&segments[1]).content, "b");
        }
    }

    // ==================== Tokens ====================

    mod tokens {
        use super::*;

        #[test]
        fn plain_text() {
            let scanner = braces();
            let tokens: Vec<_> = scanner.tokens("hello world").collect();
            assert_eq!(
                tokens,
                vec![Token::Text {
                    text: "hello world",
                    offset: 0
                }]
            );
        }

        #[test]
        fn text_and_delimiters() {
            let scanner = braces();
            let tokens: Vec<_> = scanner.tokens("a{{b}}c").collect();
            assert_eq!(
                tokens,
                vec![
                    Token::Text { text: "a", offset: 0 },
                    Token::Delimiter {
                        kind: Kind::Double,
                        role: Role::Open,
                        text: "{{",
                        offset: 1
                    },
                    Token::Text { text: "b", offset: 3 },
                    Token::Delimiter {
                        kind: Kind::Close,
                        role: Role::Close,
                        text: "}}",
                        offset: 4
                    },
                    Token::Text { text: "c", offset: 6 },
                ]
            );
        }

        #[test]
        fn earlier_definition_wins_on_shared_prefix() {
            let scanner = braces();
            let kinds: Vec<_> = scanner
                .tokens("{{{x}}}")
                .filter_map(|token| match token {
                    Token::Delimiter { kind, .. } => Some(kind),
                    Token::Text { .. } => None,
                })
                .collect();
            assert_eq!(kinds, vec![Kind::Triple, Kind::TripleClose]);
        }

        #[test]
        fn pattern_override_matches_alternate_spelling() {
            let scanner = braces();
            let first = scanner.tokens("{{&x}}").next().unwrap();
            assert_eq!(
                first,
                Token::Delimiter {
                    kind: Kind::Triple,
                    role: Role::Open,
                    text: "{{&",
                    offset: 0
                }
            );
        }

        #[test]
        fn pattern_can_consume_leading_whitespace() {
            let scanner = braces();
            let tokens: Vec<_> = scanner.tokens("a\n  {{!x}}").collect();
            assert_eq!(tokens[0], Token::Text { text: "a", offset: 0 });
            assert_eq!(
                tokens[1],
                Token::Delimiter {
                    kind: Kind::Comment,
                    role: Role::Open,
                    text: "\n  {{!",
                    offset: 1
                }
            );
        }
    }

    // ==================== Scan ====================

    mod scan {
        use super::*;

        #[test]
        fn empty_input() {
            assert!(braces().scan("").unwrap().is_empty());
        }

        #[test]
        fn single_tag() {
            let scanner = braces();
            let segments = scanner.scan("Hello {{ name }}!").unwrap();
            assert_eq!(segments.len(), 3);
            assert_eq!(
                segments[0],
                Segment::Text {
                    text: "Hello ",
                    offset: 0
                }
            );
            let t = tag(&segments[1]);
            assert_eq!(t.open, Kind::Double);
            assert_eq!(t.content, " name ");
            assert_eq!(t.close, Kind::Close);
            assert_eq!(t.offset, 6);
            assert_eq!(segments[2], Segment::Text { text: "!", offset: 16 });
        }

        #[test]
        fn adjacent_tags() {
            let scanner = braces();
            let segments = scanner.scan("{{a}}{{b}}").unwrap();
            assert_eq!(segments.len(), 2);
            assert_eq!(tag(&segments[0]).content, "a");
            assert_eq!(tag(&segments[1]).content, "b");
        }

        #[test]
        fn stray_close_is_text() {
            let scanner = braces();
            let segments = scanner.scan("a }} b").unwrap();
            assert_eq!(
                segments,
                vec![Segment::Text {
                    text: "a }} b",
                    offset: 0
                }]
            );
        }

        #[test]
        fn triple_open_double_close_is_reported_as_is() {
            let scanner = braces();
            let segments = scanner.scan("{{{x}}").unwrap();
            let t = tag(&segments[0]);
            assert_eq!(t.open, Kind::Triple);
            assert_eq!(t.close, Kind::Close);
        }

        #[test]
        fn unclosed_tag() {
            let scanner = braces();
            let err = scanner.scan("line one\nsay {{ name").unwrap_err();
            match err {
                ScanError::Unclosed {
                    open, line, col, ..
                } => {
                    assert_eq!(open, "{{");
                    assert_eq!(line, 2);
                    assert_eq!(col, 5);
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        #[test]
        fn nested_open() {
            let scanner = braces();
            let err = scanner.scan("{{ a {{ b }}").unwrap_err();
            assert!(matches!(err, ScanError::NestedOpen { col: 6, .. }));
            assert_eq!(err.offset(), Some(5));
        }

        #[test]
        fn tag_position_skips_consumed_whitespace() {
            let scanner = braces();
            let segments = scanner.scan("a\n  {{!note}}").unwrap();
            let t = tag(&segments[1]);
            assert_eq!(t.offset, 1);
            assert_eq!(t.position(), 4);
        }

        #[test]
        fn multiline_content() {
            let scanner = braces();
            let segments = scanner.scan("{{! one\ntwo }}").unwrap();
            assert_eq!(tag(&segments[0]).content, " one\ntwo ");
        }
    }

    // ==================== Line/Column ====================

    mod positions {
        use super::*;

        #[test]
        fn first_character() {
            assert_eq!(line_col("abc", 0), (1, 1));
        }

        #[test]
        fn after_newlines() {
            assert_eq!(line_col("ab\ncd\nef", 7), (3, 2));
        }

        #[test]
        fn counts_characters_not_bytes() {
            let input = "héllo {{";
            let offset = input.find("{{").unwrap();
            assert_eq!(line_col(input, offset), (1, 7));
        }

        #[test]
        fn clamps_past_end() {
            assert_eq!(line_col("ab", 99), (1, 3));
        }
    }
}
