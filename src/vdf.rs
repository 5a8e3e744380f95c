//! Valve KeyValues ("VDF") text format
//!
//! Steam keeps both `loginusers.vdf` and `registry.vdf` in this format: quoted
//! keys followed by either a quoted value or a `{ ... }` block, optionally
//! tagged with a `[$PLATFORM]` conditional. Keys are compared
//! case-insensitively, the same way Steam reads them. Entry order and
//! conditionals are kept so a parse/serialize cycle only touches what was
//! changed.

use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// Deepest `{` nesting accepted before the input is rejected
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Section(Section),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: String,
    value: Value,
    /// Platform conditional without brackets, e.g. `$WIN32`
    condition: Option<String>,
}

/// Ordered key/value block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: Vec<Entry>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates win, matching how Steam resolves repeated keys
    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.key.eq_ignore_ascii_case(key))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::Str(s) => Some(s),
            Value::Section(_) => None,
        }
    }

    pub fn get_section(&self, key: &str) -> Option<&Section> {
        match self.get(key)? {
            Value::Section(s) => Some(s),
            Value::Str(_) => None,
        }
    }

    pub fn get_section_mut(&mut self, key: &str) -> Option<&mut Section> {
        let i = self.position(key)?;
        match &mut self.entries[i].value {
            Value::Section(s) => Some(s),
            Value::Str(_) => None,
        }
    }

    /// Follow a chain of nested sections
    pub fn path(&self, keys: &[&str]) -> Option<&Section> {
        keys.iter().try_fold(self, |section, key| section.get_section(key))
    }

    pub fn path_mut(&mut self, keys: &[&str]) -> Option<&mut Section> {
        let mut section = self;
        for key in keys {
            section = section.get_section_mut(key)?;
        }
        Some(section)
    }

    /// Replace an existing value in place (keeping its key spelling,
    /// position and conditional) or append a new entry
    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        let value = Value::Str(value.into());
        match self.position(key) {
            Some(i) => self.entries[i].value = value,
            None => self.push(key.to_string(), value, None),
        }
    }

    fn push(&mut self, key: String, value: Value, condition: Option<String>) {
        self.entries.push(Entry {
            key,
            value,
            condition,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|entry| (entry.key.as_str(), &entry.value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Condition(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self {
            chars: text.chars().peekable(),
            line: 1,
            peeked: None,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skip whitespace and `//` comments
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    self.bump();
                    if self.chars.peek() != Some(&'/') {
                        return Err(self.error("stray '/'"));
                    }
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn peek_token(&mut self) -> Result<Option<&Token>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.read_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.read_token(),
        }
    }

    /// Take a `[$PLATFORM]` conditional if one comes next
    fn next_condition(&mut self) -> Result<Option<String>, ParseError> {
        if !matches!(self.peek_token()?, Some(Token::Condition(_))) {
            return Ok(None);
        }
        match self.next_token()? {
            Some(Token::Condition(condition)) => Ok(Some(condition)),
            _ => Ok(None),
        }
    }

    fn read_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;
        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };
        match c {
            '{' => {
                self.bump();
                Ok(Some(Token::Open))
            }
            '}' => {
                self.bump();
                Ok(Some(Token::Close))
            }
            '"' => {
                self.bump();
                self.quoted().map(|s| Some(Token::Text(s)))
            }
            '[' => {
                self.bump();
                self.condition().map(|s| Some(Token::Condition(s)))
            }
            _ => Ok(Some(Token::Text(self.bare()))),
        }
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let start = self.line;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(ParseError {
            line: start,
            message: "unterminated string".to_string(),
        })
    }

    fn condition(&mut self) -> Result<String, ParseError> {
        let start = self.line;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                ']' => return Ok(out),
                '\n' => break,
                c => out.push(c),
            }
        }
        Err(ParseError {
            line: start,
            message: "unterminated conditional".to_string(),
        })
    }

    fn bare(&mut self) -> String {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | '"' | '[') {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }
}

fn parse_section(lexer: &mut Lexer<'_>, depth: usize) -> Result<Section, ParseError> {
    if depth > MAX_DEPTH {
        return Err(lexer.error(format!("sections nested deeper than {MAX_DEPTH} levels")));
    }
    let nested = depth > 0;
    let mut section = Section::new();
    loop {
        let key = match lexer.next_token()? {
            Some(Token::Text(key)) => key,
            Some(Token::Close) if nested => return Ok(section),
            Some(Token::Close) => return Err(lexer.error("unexpected '}'")),
            Some(Token::Open) => return Err(lexer.error("expected key, found '{'")),
            Some(Token::Condition(_)) => {
                return Err(lexer.error("conditional without a preceding key"));
            }
            None if nested => return Err(lexer.error("unexpected end of input, missing '}'")),
            None => return Ok(section),
        };
        // A section's conditional may sit between its key and the '{'
        let mut condition = lexer.next_condition()?;
        let value = match lexer.next_token()? {
            Some(Token::Text(value)) => Value::Str(value),
            Some(Token::Open) => Value::Section(parse_section(lexer, depth + 1)?),
            Some(Token::Close | Token::Condition(_)) | None => {
                return Err(lexer.error(format!("key \"{key}\" has no value")));
            }
        };
        if let Some(trailing) = lexer.next_condition()? {
            condition = Some(trailing);
        }
        section.push(key, value, condition);
    }
}

pub fn parse(text: &str) -> Result<Section, ParseError> {
    parse_section(&mut Lexer::new(text), 0)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn write_section(out: &mut String, section: &Section, depth: usize) {
    let indent = "\t".repeat(depth);
    for entry in &section.entries {
        let key = escape(&entry.key);
        let condition = entry
            .condition
            .as_ref()
            .map(|c| format!("\t\t[{c}]"))
            .unwrap_or_default();
        match &entry.value {
            Value::Str(s) => {
                let _ = writeln!(out, "{indent}\"{key}\"\t\t\"{}\"{condition}", escape(s));
            }
            Value::Section(child) => {
                let _ = writeln!(out, "{indent}\"{key}\"{condition}");
                let _ = writeln!(out, "{indent}{{");
                write_section(out, child, depth + 1);
                let _ = writeln!(out, "{indent}}}");
            }
        }
    }
}

/// Serialize in the tab-indented layout Steam writes itself
pub fn to_string(section: &Section) -> String {
    let mut out = String::new();
    write_section(&mut out, section, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_USERS: &str = r#""users"
{
	"76561198000000001"
	{
		"AccountName"		"bob99"
		"PersonaName"		"Bob"
		"MostRecent"		"1"
	}
	"76561198000000002"
	{
		"AccountName"		"carol_w"
	}
}
"#;

    #[test]
    fn test_parse_nested_sections_in_order() {
        let doc = parse(LOGIN_USERS).unwrap();
        let users = doc.get_section("users").unwrap();
        let ids: Vec<&str> = users.iter().map(|(k, _)| k).collect();
        assert_eq!(ids, vec!["76561198000000001", "76561198000000002"]);

        let bob = users.get_section("76561198000000001").unwrap();
        assert_eq!(bob.get_str("AccountName"), Some("bob99"));
        assert_eq!(bob.get_str("PersonaName"), Some("Bob"));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let doc = parse(LOGIN_USERS).unwrap();
        let users = doc.get_section("Users").unwrap();
        let carol = users.get_section("76561198000000002").unwrap();
        assert_eq!(carol.get_str("accountname"), Some("carol_w"));
    }

    #[test]
    fn test_serialized_output_parses_back_identically() {
        let doc = parse(LOGIN_USERS).unwrap();
        let text = to_string(&doc);
        assert_eq!(parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_escapes_survive_serialization() {
        let mut doc = Section::new();
        doc.set_str("path", "C:\\Games\\\"Steam\"");
        let text = to_string(&doc);
        assert_eq!(text, "\"path\"\t\t\"C:\\\\Games\\\\\\\"Steam\\\"\"\n");
        assert_eq!(parse(&text).unwrap().get_str("path"), Some("C:\\Games\\\"Steam\""));
    }

    #[test]
    fn test_comments_conditionals_and_bare_tokens() {
        let text = "// header comment\n\"root\"\n{\n  key value [$LINUX]\n  \
                    \"other\" \"x\" // trailing\n}\n";
        let doc = parse(text).unwrap();
        let root = doc.get_section("root").unwrap();
        assert_eq!(root.get_str("key"), Some("value"));
        assert_eq!(root.get_str("other"), Some("x"));
        let out = to_string(&doc);
        assert!(out.contains("\t\"key\"\t\t\"value\"\t\t[$LINUX]\n"), "{out}");
        assert!(out.contains("\t\"other\"\t\t\"x\"\n"), "{out}");
    }

    #[test]
    fn test_conditionals_survive_rewrite() {
        let text = "\"Steam\"\n{\n\"AutoLoginUser\" \"a\"\n\"WinOnly\" \"1\" [$WIN32]\n\
                    \"Linux\" [$LINUX]\n{\n\"k\" \"v\"\n}\n}\n";
        let mut doc = parse(text).unwrap();
        let steam = doc.get_section_mut("Steam").unwrap();
        steam.set_str("AutoLoginUser", "b");

        let out = to_string(&doc);
        assert!(out.contains("\"WinOnly\"\t\t\"1\"\t\t[$WIN32]"), "{out}");
        assert!(out.contains("\"Linux\"\t\t[$LINUX]"), "{out}");

        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed, doc);
        let steam = reparsed.get_section("Steam").unwrap();
        assert_eq!(steam.get_str("AutoLoginUser"), Some("b"));
        assert_eq!(steam.path(&["linux"]).unwrap().get_str("k"), Some("v"));
    }

    #[test]
    fn test_set_str_keeps_conditional() {
        let mut doc = parse("\"k\" \"old\" [$OSX]").unwrap();
        doc.set_str("K", "new");
        assert_eq!(to_string(&doc), "\"k\"\t\t\"new\"\t\t[$OSX]\n");
    }

    #[test]
    fn test_bad_conditionals_are_errors() {
        assert!(parse("\"k\" \"v\" [$WIN32").is_err());
        assert!(parse("[$WIN32] \"k\" \"v\"").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let text = "\"k\" {".repeat(100_000);
        let err = parse(&text).unwrap_err();
        assert!(err.message.contains("nested deeper"), "{}", err.message);

        let open = "\"k\" { ".repeat(MAX_DEPTH);
        let close = "} ".repeat(MAX_DEPTH);
        assert!(parse(&format!("{open}\"leaf\" \"v\" {close}")).is_ok());
    }

    #[test]
    fn test_set_str_replaces_in_place() {
        let mut doc = parse("\"a\" \"1\"\n\"B\" \"2\"\n\"c\" \"3\"\n").unwrap();
        doc.set_str("b", "20");
        let keys: Vec<&str> = doc.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "B", "c"]);
        assert_eq!(doc.get_str("B"), Some("20"));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let doc = parse("\"k\" \"first\"\n\"k\" \"second\"\n").unwrap();
        assert_eq!(doc.get_str("k"), Some("second"));
    }

    #[test]
    fn test_path_lookup() {
        let doc = parse("\"A\" { \"B\" { \"C\" \"leaf\" } }").unwrap();
        assert_eq!(doc.path(&["a", "b"]).unwrap().get_str("c"), Some("leaf"));
        assert!(doc.path(&["a", "missing"]).is_none());
    }

    #[test]
    fn test_unbalanced_braces_are_errors() {
        let err = parse("\"root\"\n{\n\"k\" \"v\"\n").unwrap_err();
        assert!(err.message.contains("missing '}'"));
        assert!(parse("\"k\" \"v\" }").is_err());
    }

    #[test]
    fn test_unterminated_string_reports_start_line() {
        let err = parse("\"ok\" \"v\"\n\"broken\n\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_key_without_value_is_error() {
        assert!(parse("\"lonely\"").is_err());
    }
}
