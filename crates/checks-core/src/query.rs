//! Checker applicability queries.
//!
//! A restricted change-query language evaluated against a
//! [`ChangeSnapshot`]:
//!
//! ```text
//! query   := or
//! or      := and ("OR" and)*
//! and     := unary (["AND"] unary)*
//! unary   := "-" unary | "NOT" unary | primary
//! primary := "(" or ")" | operator ":" value
//! value   := word | '"' quoted '"' | "{" braced "}"
//! ```
//!
//! Only operators in [`ALLOWED_OPERATORS`] are accepted. Values starting
//! with `^` are regular expressions for operators that take a pattern.
//! A query without any `status` predicate only matches open changes.

use std::collections::BTreeSet;

use regex::Regex;

use crate::domain::{ChangeSnapshot, ChangeStatus, ChecksError, Result, DEFAULT_QUERY};

/// Operators a checker query may use.
pub const ALLOWED_OPERATORS: &[&str] = &[
    "added",
    "assignee",
    "author",
    "branch",
    "committer",
    "deleted",
    "delta",
    "dir",
    "directory",
    "ext",
    "extension",
    "f",
    "file",
    "footer",
    "hashtag",
    "intopic",
    "onlyextensions",
    "onlyexts",
    "path",
    "r",
    "ref",
    "reviewer",
    "size",
    "status",
    "topic",
    "unresolved",
    "wip",
];

/// Deepest nesting of `NOT`, `-` and parentheses a query may use.
pub const MAX_QUERY_DEPTH: usize = 100;

fn invalid(message: impl Into<String>) -> ChecksError {
    ChecksError::InvalidQuery(message.into())
}

// ---------------------------------------------------------------------------
// QueryMatcher
// ---------------------------------------------------------------------------

/// Entry points for validating and evaluating checker queries.
pub struct QueryMatcher;

impl QueryMatcher {
    /// Validate `query` and return it trimmed. An empty query stays empty.
    pub fn clean(query: &str) -> Result<String> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        CheckerQuery::parse(trimmed)?;
        Ok(trimmed.to_string())
    }

    /// Whether `change` satisfies `query`. `None` or blank means
    /// [`DEFAULT_QUERY`].
    pub fn matches(query: Option<&str>, change: &ChangeSnapshot) -> Result<bool> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY);
        Ok(CheckerQuery::parse(query)?.matches(change))
    }
}

// ---------------------------------------------------------------------------
// Compiled query
// ---------------------------------------------------------------------------

/// A parsed, validated query.
#[derive(Debug)]
pub struct CheckerQuery {
    root: Node,
}

#[derive(Debug)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Term(Term),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    Open,
    Closed,
    Merged,
    Abandoned,
}

#[derive(Debug, Clone, Copy)]
enum CountField {
    Added,
    Deleted,
    Delta,
    Unresolved,
}

#[derive(Debug, Clone, Copy)]
enum Comparison {
    Eq(i64),
    Gt(i64),
    Ge(i64),
    Lt(i64),
    Le(i64),
}

#[derive(Debug)]
enum TextPattern {
    Exact(String),
    Regex(Regex),
}

#[derive(Debug)]
enum Term {
    Status(StatusFilter),
    Count(CountField, Comparison),
    Author(String),
    Committer(String),
    /// `None` matches changes without an assignee.
    Assignee(Option<String>),
    Reviewer(String),
    Branch(TextPattern),
    Ref(TextPattern),
    Directory(TextPattern),
    Extension(String),
    OnlyExtensions(BTreeSet<String>),
    File(TextPattern),
    Path(TextPattern),
    Footer { key: String, value: Option<String> },
    Hashtag(String),
    Topic(TextPattern),
    InTopic(TextPattern),
    Wip(bool),
}

impl CheckerQuery {
    /// Parse and validate `query`.
    pub fn parse(query: &str) -> Result<Self> {
        let tokens = tokenize(query)?;
        if tokens.is_empty() {
            return Err(invalid("empty query"));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let node = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(invalid(format!(
                "unexpected {} in query",
                parser.tokens[parser.pos].describe()
            )));
        }

        let root = if node.has_status() {
            node
        } else {
            Node::And(vec![node, Node::Term(Term::Status(StatusFilter::Open))])
        };
        Ok(Self { root })
    }

    pub fn matches(&self, change: &ChangeSnapshot) -> bool {
        self.root.matches(change)
    }
}

impl Node {
    fn has_status(&self) -> bool {
        match self {
            Node::And(nodes) | Node::Or(nodes) => nodes.iter().any(Node::has_status),
            Node::Not(node) => node.has_status(),
            Node::Term(term) => matches!(term, Term::Status(_)),
        }
    }

    fn matches(&self, change: &ChangeSnapshot) -> bool {
        match self {
            Node::And(nodes) => nodes.iter().all(|n| n.matches(change)),
            Node::Or(nodes) => nodes.iter().any(|n| n.matches(change)),
            Node::Not(node) => !node.matches(change),
            Node::Term(term) => term.matches(change),
        }
    }
}

// ---------------------------------------------------------------------------
// Term compilation and evaluation
// ---------------------------------------------------------------------------

impl TextPattern {
    fn parse(value: &str) -> Result<Self> {
        if value.starts_with('^') {
            let re = Regex::new(value)
                .map_err(|e| invalid(format!("invalid regular expression {value:?}: {e}")))?;
            Ok(TextPattern::Regex(re))
        } else {
            Ok(TextPattern::Exact(value.to_string()))
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            TextPattern::Exact(v) => v == text,
            TextPattern::Regex(re) => re.is_match(text),
        }
    }
}

impl Comparison {
    fn parse(value: &str) -> Result<Self> {
        let (ctor, number): (fn(i64) -> Comparison, &str) =
            if let Some(rest) = value.strip_prefix(">=") {
                (Comparison::Ge, rest)
            } else if let Some(rest) = value.strip_prefix("<=") {
                (Comparison::Le, rest)
            } else if let Some(rest) = value.strip_prefix('>') {
                (Comparison::Gt, rest)
            } else if let Some(rest) = value.strip_prefix('<') {
                (Comparison::Lt, rest)
            } else if let Some(rest) = value.strip_prefix('=') {
                (Comparison::Eq, rest)
            } else {
                (Comparison::Eq, value)
            };
        let n = number
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("not a number: {value:?}")))?;
        Ok(ctor(n))
    }

    fn holds(&self, actual: i64) -> bool {
        match *self {
            Comparison::Eq(n) => actual == n,
            Comparison::Gt(n) => actual > n,
            Comparison::Ge(n) => actual >= n,
            Comparison::Lt(n) => actual < n,
            Comparison::Le(n) => actual <= n,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Extension of the file name in `path`, lowercased; empty if none.
fn extension_of(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rfind('.') {
        Some(idx) if idx > 0 => file[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Every directory containing `path`: `a/b/c.txt` gives `a` and `a/b`.
fn directories_of(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(idx, _)| &path[..idx])
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(format!("not a boolean: {value:?}"))),
    }
}

impl Term {
    fn compile(op: &str, value: &str) -> Result<Self> {
        if !ALLOWED_OPERATORS.contains(&op) {
            return Err(invalid(format!("Unsupported operator: {op}")));
        }
        let lower = value.to_lowercase();
        let term = match op {
            "status" => Term::Status(match lower.as_str() {
                "open" | "pending" | "new" => StatusFilter::Open,
                "closed" => StatusFilter::Closed,
                "merged" => StatusFilter::Merged,
                "abandoned" => StatusFilter::Abandoned,
                _ => return Err(invalid(format!("Unrecognized value: {value}"))),
            }),
            "added" => Term::Count(CountField::Added, Comparison::parse(value)?),
            "deleted" => Term::Count(CountField::Deleted, Comparison::parse(value)?),
            "delta" | "size" => Term::Count(CountField::Delta, Comparison::parse(value)?),
            "unresolved" => Term::Count(CountField::Unresolved, Comparison::parse(value)?),
            "author" => Term::Author(lower),
            "committer" => Term::Committer(lower),
            "assignee" => Term::Assignee((lower != "none").then_some(lower)),
            "r" | "reviewer" => Term::Reviewer(lower),
            "branch" => Term::Branch(TextPattern::parse(
                value.strip_prefix("refs/heads/").unwrap_or(value),
            )?),
            "ref" => Term::Ref(TextPattern::parse(value)?),
            "dir" | "directory" => Term::Directory(match TextPattern::parse(value)? {
                TextPattern::Exact(dir) => {
                    TextPattern::Exact(dir.trim_matches('/').to_lowercase())
                }
                regex => regex,
            }),
            "ext" | "extension" => Term::Extension(normalize_extension(value)),
            "onlyexts" | "onlyextensions" => {
                let exts: BTreeSet<String> = value.split(',').map(normalize_extension).collect();
                Term::OnlyExtensions(exts)
            }
            "f" | "file" => Term::File(TextPattern::parse(value)?),
            "path" => Term::Path(TextPattern::parse(value)?),
            "footer" => {
                let split = value.split_once('=').or_else(|| value.split_once(':'));
                match split {
                    Some((key, v)) => Term::Footer {
                        key: key.trim().to_lowercase(),
                        value: Some(v.trim().to_string()),
                    },
                    None => Term::Footer {
                        key: lower.trim().to_string(),
                        value: None,
                    },
                }
            }
            "hashtag" => Term::Hashtag(lower.trim_start_matches('#').to_string()),
            "topic" => Term::Topic(TextPattern::parse(value)?),
            "intopic" => Term::InTopic(match TextPattern::parse(value)? {
                TextPattern::Exact(_) => TextPattern::Exact(lower),
                regex => regex,
            }),
            "wip" => Term::Wip(parse_bool(value)?),
            _ => return Err(invalid(format!("Unsupported operator: {op}"))),
        };
        Ok(term)
    }

    fn matches(&self, change: &ChangeSnapshot) -> bool {
        match self {
            Term::Status(filter) => match filter {
                StatusFilter::Open => change.status.is_open(),
                StatusFilter::Closed => !change.status.is_open(),
                StatusFilter::Merged => change.status == ChangeStatus::Merged,
                StatusFilter::Abandoned => change.status == ChangeStatus::Abandoned,
            },
            Term::Count(field, cmp) => {
                let actual = match field {
                    CountField::Added => change.insertions(),
                    CountField::Deleted => change.deletions(),
                    CountField::Delta => change.insertions() + change.deletions(),
                    CountField::Unresolved => u64::from(change.unresolved_comments),
                };
                cmp.holds(i64::try_from(actual).unwrap_or(i64::MAX))
            }
            Term::Author(who) => ident_matches(&change.author, who),
            Term::Committer(who) => ident_matches(&change.committer, who),
            Term::Assignee(None) => change.assignee.is_none(),
            Term::Assignee(Some(who)) => change
                .assignee
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(who)),
            Term::Reviewer(who) => change
                .reviewers
                .iter()
                .any(|r| r.eq_ignore_ascii_case(who)),
            Term::Branch(pattern) => pattern.is_match(&change.branch),
            Term::Ref(pattern) => pattern.is_match(&change.dest_ref()),
            Term::Directory(pattern) => change.files.iter().any(|f| {
                directories_of(&f.path).any(|dir| match pattern {
                    TextPattern::Exact(d) => dir.to_lowercase() == *d,
                    regex => regex.is_match(dir),
                })
            }),
            Term::Extension(ext) => change.files.iter().any(|f| extension_of(&f.path) == *ext),
            Term::OnlyExtensions(exts) => {
                !change.files.is_empty()
                    && change
                        .files
                        .iter()
                        .all(|f| exts.contains(&extension_of(&f.path)))
            }
            Term::File(pattern) => change.files.iter().any(|f| match pattern {
                TextPattern::Exact(name) if !name.contains('/') => {
                    f.path == *name || f.path.split('/').any(|part| part == name)
                }
                other => other.is_match(&f.path),
            }),
            Term::Path(pattern) => change.files.iter().any(|f| pattern.is_match(&f.path)),
            Term::Footer { key, value } => change.footers.iter().any(|(k, v)| {
                k.eq_ignore_ascii_case(key) && value.as_ref().map_or(true, |want| v.trim() == want)
            }),
            Term::Hashtag(tag) => change
                .hashtags
                .iter()
                .any(|h| h.trim_start_matches('#').to_lowercase() == *tag),
            Term::Topic(pattern) => change.topic.as_deref().is_some_and(|t| pattern.is_match(t)),
            Term::InTopic(pattern) => change.topic.as_deref().is_some_and(|t| match pattern {
                TextPattern::Exact(part) => t.to_lowercase().contains(part.as_str()),
                regex => regex.is_match(t),
            }),
            Term::Wip(wip) => change.work_in_progress == *wip,
        }
    }
}

fn ident_matches(ident: &checks_state::PersonIdent, who: &str) -> bool {
    ident.name.to_lowercase().contains(who) || ident.email.to_lowercase().contains(who)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Neg,
    And,
    Or,
    Not,
    Term { op: String, value: String },
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Neg => "'-'".to_string(),
            Token::And => "AND".to_string(),
            Token::Or => "OR".to_string(),
            Token::Not => "NOT".to_string(),
            Token::Term { op, value } => format!("{op}:{value}"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
                continue;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
                continue;
            }
            '-' if chars.get(i + 1).is_some_and(|n| !n.is_whitespace()) => {
                tokens.push(Token::Neg);
                i += 1;
                continue;
            }
            _ => {}
        }

        let start = i;
        while i < chars.len() && !is_word_end(chars[i]) && chars[i] != ':' {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();

        if chars.get(i) == Some(&':') {
            i += 1;
            if word.is_empty() {
                return Err(invalid("missing operator before ':'"));
            }
            let value = read_value(&chars, &mut i)?;
            if value.is_empty() {
                return Err(invalid(format!("missing value for operator {word}")));
            }
            tokens.push(Token::Term {
                op: word.to_ascii_lowercase(),
                value,
            });
        } else {
            tokens.push(match word.as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "NOT" => Token::Not,
                _ => {
                    return Err(invalid(format!(
                        "Specific search operator required: {word}"
                    )))
                }
            });
        }
    }
    Ok(tokens)
}

fn is_word_end(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

fn read_value(chars: &[char], i: &mut usize) -> Result<String> {
    let mut value = String::new();
    match chars.get(*i) {
        Some('"') => {
            *i += 1;
            loop {
                match chars.get(*i) {
                    None => return Err(invalid("unterminated quoted value")),
                    Some('"') => {
                        *i += 1;
                        break;
                    }
                    Some('\\') if *i + 1 < chars.len() => {
                        value.push(chars[*i + 1]);
                        *i += 2;
                    }
                    Some(&c) => {
                        value.push(c);
                        *i += 1;
                    }
                }
            }
        }
        Some('{') => {
            *i += 1;
            loop {
                match chars.get(*i) {
                    None => return Err(invalid("unterminated braced value")),
                    Some('}') => {
                        *i += 1;
                        break;
                    }
                    Some(&c) => {
                        value.push(c);
                        *i += 1;
                    }
                }
            }
        }
        _ => {
            while *i < chars.len() && !chars[*i].is_whitespace() && chars[*i] != ')' {
                value.push(chars[*i]);
                *i += 1;
            }
        }
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Run `parse` one nesting level deeper, bounded by [`MAX_QUERY_DEPTH`].
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Node>) -> Result<Node> {
        if self.depth >= MAX_QUERY_DEPTH {
            return Err(invalid("query nested too deeply"));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut parts = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Node::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Node> {
        let mut parts = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    parts.push(self.parse_unary()?);
                }
                Some(Token::LParen | Token::Neg | Token::Not | Token::Term { .. }) => {
                    parts.push(self.parse_unary()?);
                }
                _ => break,
            }
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Node::And(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Neg | Token::Not) => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.nested(Self::parse_unary)?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| invalid("unexpected end of query"))?;
        self.pos += 1;
        match token {
            Token::LParen => {
                let node = self.nested(Self::parse_or)?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(invalid("missing ')'"));
                }
                self.pos += 1;
                Ok(node)
            }
            Token::Term { op, value } => Ok(Node::Term(Term::compile(&op, &value)?)),
            other => Err(invalid(format!("unexpected {}", other.describe()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileChange;

    fn open_change() -> ChangeSnapshot {
        let mut change = ChangeSnapshot::new(1, "my/repo", "main")
            .with_file(FileChange::new("src/lib/mod.rs", 30, 5))
            .with_file(FileChange::new("docs/README.md", 2, 0));
        change.topic = Some("Big-Refactor".to_string());
        change.hashtags = vec!["#security".to_string()];
        change.reviewers = vec!["alice@example.com".to_string()];
        change.footers = vec![("Bug".to_string(), "1234".to_string())];
        change.unresolved_comments = 2;
        change
    }

    fn check(query: &str) -> bool {
        QueryMatcher::matches(Some(query), &open_change()).unwrap()
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let too_deep = MAX_QUERY_DEPTH + 1;
        for query in [
            format!("{}status:open", "-".repeat(too_deep)),
            format!("{}status:open", "NOT ".repeat(too_deep)),
            format!("{}status:open{}", "(".repeat(too_deep), ")".repeat(too_deep)),
        ] {
            let err = CheckerQuery::parse(&query).unwrap_err();
            assert!(
                matches!(&err, ChecksError::InvalidQuery(m) if m == "query nested too deeply"),
                "{err:?}"
            );
        }

        let deepest = format!(
            "{}status:open{}",
            "(".repeat(MAX_QUERY_DEPTH),
            ")".repeat(MAX_QUERY_DEPTH)
        );
        assert!(CheckerQuery::parse(&deepest).is_ok());
        assert!(check("--status:open"));
    }

    #[test]
    fn default_query_matches_open_changes_only() {
        let open = open_change();
        let merged = open_change().with_status(ChangeStatus::Merged);
        assert!(QueryMatcher::matches(None, &open).unwrap());
        assert!(!QueryMatcher::matches(None, &merged).unwrap());
        assert!(QueryMatcher::matches(Some("  "), &open).unwrap());
    }

    #[test]
    fn status_predicates() {
        assert!(check("status:open"));
        assert!(!check("status:merged"));
        assert!(!check("status:closed"));
        let merged = open_change().with_status(ChangeStatus::Merged);
        assert!(QueryMatcher::matches(Some("status:merged"), &merged).unwrap());
        assert!(QueryMatcher::matches(Some("status:closed"), &merged).unwrap());
    }

    #[test]
    fn implicit_open_without_status_predicate() {
        let merged = open_change().with_status(ChangeStatus::Merged);
        assert!(!QueryMatcher::matches(Some("branch:main"), &merged).unwrap());
        assert!(QueryMatcher::matches(Some("branch:main OR status:merged"), &merged).unwrap());
    }

    #[test]
    fn boolean_structure() {
        assert!(check("branch:main ext:rs"));
        assert!(check("branch:main AND ext:rs"));
        assert!(!check("branch:main -ext:rs"));
        assert!(check("branch:other OR ext:md"));
        assert!(!check("NOT (branch:main OR branch:other)"));
        assert!(check("(branch:other OR ext:md) AND status:open"));
    }

    #[test]
    fn file_and_directory_predicates() {
        assert!(check("dir:src"));
        assert!(check("directory:src/lib/"));
        assert!(!check("dir:lib"));
        assert!(check("file:mod.rs"));
        assert!(check("file:src/lib/mod.rs"));
        assert!(check("path:docs/README.md"));
        assert!(!check("path:README.md"));
        assert!(check("path:^docs/.*"));
        assert!(check("onlyexts:rs,md"));
        assert!(!check("onlyextensions:rs"));
        assert!(check("extension:.MD"));
    }

    #[test]
    fn count_predicates() {
        assert!(check("added:32"));
        assert!(check("added:>30"));
        assert!(check("deleted:<=5"));
        assert!(check("delta:>=37"));
        assert!(!check("size:<37"));
        assert!(check("unresolved:>0"));
    }

    #[test]
    fn people_and_labels() {
        assert!(check("reviewer:Alice@example.com"));
        assert!(check("author:owner"));
        assert!(check("assignee:none"));
        assert!(check("hashtag:Security"));
        assert!(check("topic:Big-Refactor"));
        assert!(!check("topic:big-refactor"));
        assert!(check("intopic:refactor"));
        assert!(check("footer:Bug=1234"));
        assert!(check("footer:\"bug: 1234\""));
        assert!(check("wip:false"));
    }

    #[test]
    fn quoted_and_braced_values() {
        assert!(check("branch:\"main\""));
        assert!(check("topic:{Big-Refactor}"));
    }

    #[test]
    fn clean_trims_and_validates() {
        assert_eq!(QueryMatcher::clean("  status:open  ").unwrap(), "status:open");
        assert_eq!(QueryMatcher::clean("   ").unwrap(), "");
    }

    #[test]
    fn rejects_bare_words() {
        let err = QueryMatcher::clean("foo").unwrap_err();
        assert!(err.to_string().contains("Specific search operator required"));
    }

    #[test]
    fn rejects_disallowed_operators() {
        let err = QueryMatcher::clean("is:open").unwrap_err();
        assert!(matches!(err, ChecksError::InvalidQuery(ref m) if m.contains("is")));
        assert!(QueryMatcher::clean("project:foo").is_err());
        assert!(QueryMatcher::clean("label:Code-Review+2").is_err());
    }

    #[test]
    fn rejects_malformed_syntax_and_values() {
        for bad in [
            "status:bogus",
            "(status:open",
            "status:open)",
            "branch:\"main",
            "added:lots",
            "path:^(",
            "wip:maybe",
            ":value",
            "status:",
            "status:open OR",
        ] {
            assert!(QueryMatcher::clean(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
