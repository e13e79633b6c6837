//! Single-pass tokenizer shared by the rewrite pipeline and the compiler
//!
//! User queries and rewritten text use the same token set. A few tokens
//! only ever appear in user text (`Percent`, `Height`, `Assign`) and are
//! turned into canonical tokens by the rewrite.

use std::fmt;

use crate::expr::{QueryError, QueryResult};
use crate::resolver::FieldPath;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier, possibly dotted: `off_ppp`, `style.Transition.possPct`
    Ident(String),
    /// `$`-rooted accessor path
    Path(FieldPath),
    Number(f64),
    /// `45%`
    Percent(f64),
    /// Shorthand height `6-7`
    Height { feet: u8, inches: u8 },
    Str(String),
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Ge,
    Le,
    Gt,
    Lt,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    /// Bare `=`
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl TokenKind {
    /// True for tokens after which a `-` is a binary minus
    fn ends_operand(&self) -> bool {
        match self {
            // keyword spellings of `&&`, `||` and `!` are operators
            TokenKind::Ident(name) => !matches!(name.as_str(), "AND" | "OR" | "NOT"),
            _ => matches!(
                self,
                TokenKind::Path(_)
                    | TokenKind::Number(_)
                    | TokenKind::Percent(_)
                    | TokenKind::Height { .. }
                    | TokenKind::Str(_)
                    | TokenKind::RParen
                    | TokenKind::RBracket
            ),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::Path(path) => write!(f, "{}", path),
            TokenKind::Number(n) => write!(f, "{}", format_number(*n)),
            TokenKind::Percent(n) => write!(f, "{}%", format_number(*n)),
            TokenKind::Height { feet, inches } => write!(f, "{}-{}", feet, inches),
            TokenKind::Str(s) => write_quoted(f, s),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::Le => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
        }
    }
}

/// Renders a number the way it must be re-lexed: integers without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// A token and its byte offset in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Tokenizes `input`
pub fn tokenize(input: &str) -> QueryResult<Vec<Token>> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, position: usize) {
        self.tokens.push(Token { kind, position });
    }

    fn in_operand_position(&self) -> bool {
        self.tokens
            .last()
            .map(|t| !t.kind.ends_operand())
            .unwrap_or(true)
    }

    fn run(mut self) -> QueryResult<Vec<Token>> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            if is_ident_start(c) {
                let name = self.read_ident();
                self.push(TokenKind::Ident(name), start);
            } else if c == '$' {
                let path = self.read_path();
                self.push(TokenKind::Path(path), start);
            } else if c.is_ascii_digit() || (c == '.' && self.peek_at(1).map_or(false, |d| d.is_ascii_digit())) {
                if self.in_operand_position() {
                    if let Some((feet, inches)) = self.try_read_height() {
                        self.push(TokenKind::Height { feet, inches }, start);
                        continue;
                    }
                }
                let n = self.read_number()?;
                if self.peek() == Some('%') {
                    self.advance();
                    self.push(TokenKind::Percent(n), start);
                } else {
                    self.push(TokenKind::Number(n), start);
                }
            } else if c == '"' || c == '\'' {
                let s = self.read_string(c)?;
                self.push(TokenKind::Str(s), start);
            } else {
                let kind = self.read_operator()?;
                self.push(kind, start);
            }
        }
        Ok(self.tokens)
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.advance();
            } else if c == '.' && self.peek_at(1).map_or(false, is_ident_start) {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn read_path(&mut self) -> FieldPath {
        // Skip `$`
        self.advance();
        let mut path = FieldPath::root();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('.'), Some(next)) if is_ident_start(next) => {
                    self.advance();
                    let start = self.pos;
                    while self.peek().map_or(false, is_ident_char) {
                        self.advance();
                    }
                    path.push_key(&self.input[start..self.pos]);
                }
                (Some('['), Some(next)) if next.is_ascii_digit() => {
                    let save = self.pos;
                    self.advance();
                    let start = self.pos;
                    while self.peek().map_or(false, |d| d.is_ascii_digit()) {
                        self.advance();
                    }
                    let digits = &self.input[start..self.pos];
                    match (self.peek(), digits.parse::<usize>()) {
                        (Some(']'), Ok(index)) => {
                            self.advance();
                            path.push_index(index);
                        }
                        _ => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        path
    }

    /// `F-I` with F in 4..=7 and I in 0..=11, no whitespace, not followed
    /// by another identifier or number character
    fn try_read_height(&mut self) -> Option<(u8, u8)> {
        let rest = &self.input[self.pos..];
        let bytes = rest.as_bytes();
        if bytes.len() < 3 || !(b'4'..=b'7').contains(&bytes[0]) || bytes[1] != b'-' {
            return None;
        }
        let inch_len = bytes[2..]
            .iter()
            .take(2)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if inch_len == 0 {
            return None;
        }
        let end = 2 + inch_len;
        if let Some(next) = bytes.get(end) {
            if next.is_ascii_alphanumeric() || *next == b'_' || *next == b'.' {
                return None;
            }
        }
        let feet = bytes[0] - b'0';
        let inches: u8 = rest[2..end].parse().ok()?;
        if inches > 11 {
            return None;
        }
        self.pos += end;
        Some((feet, inches))
    }

    fn read_number(&mut self) -> QueryResult<f64> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_dot && self.peek_at(1).map_or(false, |d| d.is_ascii_digit()) {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| QueryError::compile("invalid number", start))
    }

    fn read_string(&mut self, quote: char) -> QueryResult<String> {
        let start = self.pos;
        self.advance();
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.advance();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                match self.peek() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(other) => out.push(other),
                    None => break,
                }
                self.advance();
            } else {
                out.push(c);
            }
        }
        Err(QueryError::compile("unterminated string", start))
    }

    fn read_operator(&mut self) -> QueryResult<TokenKind> {
        let start = self.pos;
        let c = self.peek().unwrap_or('\0');
        let next = self.peek_at(1);
        let (kind, width) = match (c, next) {
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            _ => {
                return Err(QueryError::compile(
                    format!("unexpected character '{}'", c),
                    start,
                ))
            }
        };
        for _ in 0..width {
            self.advance();
        }
        Ok(kind)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            kinds("off_ppp >= 95"),
            vec![
                TokenKind::Ident("off_ppp".into()),
                TokenKind::Ge,
                TokenKind::Number(95.0)
            ]
        );
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            kinds("style.Transition.possPct"),
            vec![TokenKind::Ident("style.Transition.possPct".into())]
        );
    }

    #[test]
    fn test_percent_and_height() {
        assert_eq!(
            kinds("efg > 52.5% && height >= 6-7"),
            vec![
                TokenKind::Ident("efg".into()),
                TokenKind::Gt,
                TokenKind::Percent(52.5),
                TokenKind::AndAnd,
                TokenKind::Ident("height".into()),
                TokenKind::Ge,
                TokenKind::Height { feet: 6, inches: 7 },
            ]
        );
    }

    #[test]
    fn test_minus_after_operand_is_not_height() {
        assert_eq!(
            kinds("x 6-7"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Number(6.0),
                TokenKind::Minus,
                TokenKind::Number(7.0),
            ]
        );
        // Inches out of range
        assert_eq!(
            kinds("6-15"),
            vec![TokenKind::Number(6.0), TokenKind::Minus, TokenKind::Number(15.0)]
        );
    }

    #[test]
    fn test_height_after_keyword_operator() {
        let height = TokenKind::Height { feet: 6, inches: 7 };
        assert_eq!(kinds("x AND 6-7 <= h")[2], height);
        assert_eq!(kinds("x OR 6-7 <= h")[2], height);
        assert_eq!(kinds("NOT 6-7 == h")[1], height);
        // an ordinary identifier still ends an operand
        assert_eq!(kinds("ANDY 6-7")[2], TokenKind::Minus);
    }

    #[test]
    fn test_paths() {
        let tokens = kinds("$.prev.stat.posFreqs[2] > 0");
        let mut expected = FieldPath::from_dotted("prev.stat.posFreqs");
        expected.push_index(2);
        assert_eq!(tokens[0], TokenKind::Path(expected));
        assert_eq!(kinds("$")[0], TokenKind::Path(FieldPath::root()));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#"team == 'Saint Mary\'s' || conf == "Big Ten""#),
            vec![
                TokenKind::Ident("team".into()),
                TokenKind::EqEq,
                TokenKind::Str("Saint Mary's".into()),
                TokenKind::OrOr,
                TokenKind::Ident("conf".into()),
                TokenKind::EqEq,
                TokenKind::Str("Big Ten".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_position() {
        let err = tokenize("conf == 'ACC").unwrap_err();
        assert_eq!(err.position(), Some(8));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("off_ppp # 1").unwrap_err();
        assert_eq!(err.position(), Some(8));
        assert!(tokenize("a & b").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let source = r#"$.stat.off_ppp >= 0.45 && $.meta.conf != "A \"B\"""#;
        let printed: Vec<String> = tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind.to_string())
            .collect();
        let joined = printed.join(" ");
        assert_eq!(kinds(&joined), kinds(source));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(95.0), "95");
        assert_eq!(format_number(0.525), "0.525");
        assert_eq!(format_number(-3.0), "-3");
    }
}
