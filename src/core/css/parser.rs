use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Unexpected end of input")]
    UnexpectedEOF,
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    String(String),
    Number(f64),
    Dimension(f64, String),
    Percentage(f64),
    Hash(String),
    Url(String),
    Function(String),
    AtKeyword(String),
    Delim(char),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Colon,
    Semicolon,
    Comma,
    Whitespace,
    Comment(String),
}

impl Token {
    pub fn is_whitespace(&self) -> bool {
        matches!(self, Token::Whitespace | Token::Comment(_))
    }
}

/// A token together with the byte range it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Range<usize>,
}

pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    byte_offset: usize,
    current_char: Option<char>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            byte_offset: 0,
            current_char,
        }
    }

    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();

        loop {
            let start = self.byte_offset;
            match self.next_token() {
                Some(token) => tokens.push(SpannedToken {
                    token,
                    span: start..self.byte_offset,
                }),
                None => break,
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        let ch = self.current_char?;

        let token = match ch {
            ' ' | '\t' | '\n' | '\r' | '\x0C' => {
                self.consume_whitespace();
                Token::Whitespace
            }
            '/' if self.peek_char(1) == Some('*') => self.consume_comment(),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            '{' => self.single(Token::LeftBrace),
            '}' => self.single(Token::RightBrace),
            ':' => self.single(Token::Colon),
            ';' => self.single(Token::Semicolon),
            ',' => self.single(Token::Comma),
            '#' => self.consume_hash(),
            '"' | '\'' => self.consume_string(ch),
            '@' => self.consume_at_keyword(),
            '0'..='9' => self.consume_numeric(),
            '+' | '.' if self.starts_number() => self.consume_numeric(),
            '-' if self.starts_number() => self.consume_numeric(),
            '-' if self.peek_char(1).is_some_and(|c| c == '-' || is_ident_start(c)) => {
                self.consume_ident_like()
            }
            c if is_ident_start(c) || c == '\\' => self.consume_ident_like(),
            c => self.single(Token::Delim(c)),
        };

        Some(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char {
            self.byte_offset += ch.len_utf8();
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn starts_number(&self) -> bool {
        let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());

        match self.current_char {
            Some('+') | Some('-') => {
                is_digit(self.peek_char(1))
                    || (self.peek_char(1) == Some('.') && is_digit(self.peek_char(2)))
            }
            Some('.') => is_digit(self.peek_char(1)),
            other => is_digit(other),
        }
    }

    fn consume_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_comment(&mut self) -> Token {
        let mut comment = String::new();
        self.advance(); // consume '/'
        self.advance(); // consume '*'

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek_char(1) == Some('/') {
                self.advance();
                self.advance();
                break;
            }
            comment.push(ch);
            self.advance();
        }

        Token::Comment(comment)
    }

    fn consume_string(&mut self, quote: char) -> Token {
        let mut string = String::new();
        self.advance(); // consume quote

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance();
                break;
            }

            if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    string.push(escaped);
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Token::String(string)
    }

    fn consume_hash(&mut self) -> Token {
        self.advance(); // consume '#'
        Token::Hash(self.consume_name())
    }

    fn consume_at_keyword(&mut self) -> Token {
        self.advance(); // consume '@'
        Token::AtKeyword(self.consume_name())
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();

        while let Some(ch) = self.current_char {
            if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    name.push(escaped);
                    self.advance();
                }
            } else if is_name_char(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        name
    }

    fn consume_numeric(&mut self) -> Token {
        let mut number_str = String::new();

        if let Some(sign @ ('+' | '-')) = self.current_char {
            number_str.push(sign);
            self.advance();
        }

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.current_char == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            number_str.push('.');
            self.advance();

            while let Some(ch) = self.current_char {
                if ch.is_ascii_digit() {
                    number_str.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let number: f64 = number_str.parse().unwrap_or(0.0);

        if self.current_char == Some('%') {
            self.advance();
            return Token::Percentage(number);
        }

        let mut unit = String::new();
        while let Some(ch) = self.current_char {
            if ch.is_alphabetic() {
                unit.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if unit.is_empty() {
            Token::Number(number)
        } else {
            Token::Dimension(number, unit)
        }
    }

    fn consume_ident_like(&mut self) -> Token {
        let ident = self.consume_name();

        if self.current_char == Some('(') {
            if ident.eq_ignore_ascii_case("url") {
                return self.consume_url();
            }
            return Token::Function(ident);
        }

        Token::Ident(ident)
    }

    fn consume_url(&mut self) -> Token {
        self.advance(); // consume '('
        self.consume_whitespace();

        let mut url = String::new();
        let mut quote = None;

        if let Some(ch @ ('"' | '\'')) = self.current_char {
            quote = Some(ch);
            self.advance();
        }

        while let Some(ch) = self.current_char {
            match quote {
                Some(q) if ch == q => {
                    self.advance();
                    break;
                }
                None if ch == ')' || ch.is_whitespace() => break,
                _ => {
                    url.push(ch);
                    self.advance();
                }
            }
        }

        while let Some(ch) = self.current_char {
            if ch == ')' {
                self.advance();
                break;
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }

        Token::Url(url)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

/// One stylesheet as seen by the declaration scanner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleSheet {
    /// `id` attribute of the element that owns the sheet.
    pub owner_id: Option<String>,
    /// Media condition declared on the owning element, if any.
    pub media: Option<String>,
    /// `None` when the rule list cannot be read (e.g. cross-origin).
    pub rules: Option<Vec<CssRule>>,
}

impl StyleSheet {
    pub fn parse(css: &str) -> Self {
        Self {
            owner_id: None,
            media: None,
            rules: Some(CSSParser::new().parse(css)),
        }
    }

    pub fn inaccessible() -> Self {
        Self::default()
    }

    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }
}

/// Rules are told apart by what they carry: declarations, nested rules, a
/// whole text value, or nothing the scanner can use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CssRule {
    Style(StyleRule),
    Media(MediaRule),
    Keyframes(KeyframesRule),
    Opaque(OpaqueRule),
}

impl CssRule {
    /// Direct style declarations, for rules that carry them.
    pub fn declarations(&self) -> Option<&[Declaration]> {
        match self {
            CssRule::Style(rule) => Some(&rule.declarations),
            _ => None,
        }
    }

    /// Nested rules of a conditional group.
    pub fn child_rules(&self) -> Option<&[CssRule]> {
        match self {
            CssRule::Media(rule) => Some(&rule.rules),
            _ => None,
        }
    }

    /// Condition text of a conditional group, as written in its prelude.
    pub fn condition_text(&self) -> Option<&str> {
        match self {
            CssRule::Media(rule) => Some(&rule.media_text),
            _ => None,
        }
    }

    /// Rules rewritten as one piece of text rather than per declaration.
    pub fn whole_value(&self) -> Option<&str> {
        match self {
            CssRule::Keyframes(rule) => Some(&rule.css_text),
            _ => None,
        }
    }

    pub fn selector_text(&self) -> Option<&str> {
        match self {
            CssRule::Style(rule) => Some(&rule.selector_text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector_text: String,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRule {
    pub media_text: String,
    pub rules: Vec<CssRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframesRule {
    pub name: String,
    /// The complete `@keyframes ... { ... }` source.
    pub css_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueRule {
    pub at_keyword: String,
    pub css_text: String,
}

pub struct CSSParser {
    source: String,
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl CSSParser {
    pub fn new() -> Self {
        Self {
            source: String::new(),
            tokens: Vec::new(),
            position: 0,
        }
    }

    /// Parses a whole stylesheet. Malformed rules are dropped and parsing
    /// resumes at the next rule boundary.
    pub fn parse(&mut self, input: &str) -> Vec<CssRule> {
        self.source = input.to_string();
        self.tokens = Tokenizer::new(input).tokenize();
        self.position = 0;

        let mut rules = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            match self.parse_rule() {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!("CSS parse error: {}", e);
                    self.recover_from_error(false);
                }
            }
        }

        rules
    }

    fn parse_rule(&mut self) -> Result<CssRule> {
        self.skip_whitespace();

        match self.current_token() {
            Some(Token::AtKeyword(keyword)) => {
                let keyword = keyword.to_ascii_lowercase();
                if keyword == "media" {
                    self.parse_media_rule()
                } else if keyword == "keyframes" || keyword.ends_with("-keyframes") {
                    self.parse_keyframes_rule()
                } else {
                    Ok(self.parse_opaque_rule(keyword))
                }
            }
            Some(Token::RightBrace) => Err(ParseError::UnexpectedToken("}".to_string())),
            Some(_) => self.parse_style_rule(),
            None => Err(ParseError::UnexpectedEOF),
        }
    }

    fn parse_style_rule(&mut self) -> Result<CssRule> {
        let prelude = self.consume_prelude()?;
        let selector_text = self.text_between(prelude);

        if selector_text.is_empty() {
            return Err(ParseError::InvalidSyntax("Empty selector".to_string()));
        }

        self.expect_token(&Token::LeftBrace)?;
        let declarations = self.parse_declarations_block();
        self.close_block()?;

        Ok(CssRule::Style(StyleRule {
            selector_text,
            declarations,
        }))
    }

    fn parse_media_rule(&mut self) -> Result<CssRule> {
        self.advance(); // consume @media

        let prelude = self.consume_prelude()?;
        let media_text = self.text_between(prelude);

        self.expect_token(&Token::LeftBrace)?;
        let rules = self.parse_nested_rules();
        self.close_block()?;

        Ok(CssRule::Media(MediaRule { media_text, rules }))
    }

    fn parse_nested_rules(&mut self) -> Vec<CssRule> {
        let mut rules = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() || self.check_token(&Token::RightBrace) {
                break;
            }

            match self.parse_rule() {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!("CSS parse error in block: {}", e);
                    self.recover_from_error(true);
                }
            }
        }

        rules
    }

    fn parse_keyframes_rule(&mut self) -> Result<CssRule> {
        let start = self.current_span_start();
        self.advance(); // consume @keyframes
        self.skip_whitespace();

        let name = match self.current_token() {
            Some(Token::Ident(name)) | Some(Token::String(name)) => {
                let name = name.clone();
                self.advance();
                name
            }
            _ => {
                return Err(ParseError::InvalidSyntax(
                    "Expected identifier in @keyframes".to_string(),
                ))
            }
        };

        self.skip_whitespace();
        if !self.check_token(&Token::LeftBrace) {
            return Err(ParseError::InvalidSyntax(format!("Expected '{{' after @keyframes {}", name)));
        }
        self.skip_block();

        let css_text = self.source[start..self.previous_span_end()].to_string();

        Ok(CssRule::Keyframes(KeyframesRule { name, css_text }))
    }

    fn parse_opaque_rule(&mut self, at_keyword: String) -> CssRule {
        let start = self.current_span_start();
        self.advance(); // consume the at-keyword

        while let Some(token) = self.current_token() {
            match token {
                Token::Semicolon => {
                    self.advance();
                    break;
                }
                Token::LeftBrace => {
                    self.skip_block();
                    break;
                }
                Token::RightBrace => break,
                _ => self.advance(),
            }
        }

        let css_text = self.source[start..self.previous_span_end()].trim().to_string();

        CssRule::Opaque(OpaqueRule {
            at_keyword,
            css_text,
        })
    }

    fn parse_declarations_block(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();

        loop {
            self.skip_whitespace();

            match self.current_token() {
                None | Some(Token::RightBrace) => break,
                Some(Token::Semicolon) => {
                    self.advance();
                    continue;
                }
                Some(_) => {}
            }

            match self.parse_declaration() {
                Ok(declaration) => declarations.push(declaration),
                Err(e) => {
                    tracing::debug!("Skipping declaration: {}", e);
                    self.recover_in_block();
                }
            }
        }

        declarations
    }

    fn parse_declaration(&mut self) -> Result<Declaration> {
        let property = match self.current_token() {
            Some(Token::Ident(prop)) => {
                let property = if prop.starts_with("--") {
                    prop.clone()
                } else {
                    prop.to_ascii_lowercase()
                };
                self.advance();
                property
            }
            other => {
                return Err(ParseError::InvalidSyntax(format!(
                    "Expected property name, found {:?}",
                    other
                )))
            }
        };

        self.skip_whitespace();
        self.expect_token(&Token::Colon)?;

        let value_start = self.position;
        let mut depth = 0usize;

        while let Some(token) = self.current_token() {
            match token {
                Token::Semicolon | Token::RightBrace if depth == 0 => break,
                Token::LeftParen | Token::LeftBracket => depth += 1,
                Token::RightParen | Token::RightBracket => depth = depth.saturating_sub(1),
                Token::LeftBrace => {
                    return Err(ParseError::InvalidValue(format!(
                        "Unexpected block in value of {}",
                        property
                    )))
                }
                _ => {}
            }
            self.advance();
        }

        let (value_end, important) = self.strip_important(value_start, self.position);
        let value = self.text_between(value_start..value_end);

        if value.is_empty() {
            return Err(ParseError::InvalidValue(format!("Empty value for {}", property)));
        }

        Ok(Declaration {
            property,
            value,
            important,
        })
    }

    /// Finds a trailing `! important` in `tokens[start..end]` and returns the
    /// end of the value without it.
    fn strip_important(&self, start: usize, end: usize) -> (usize, bool) {
        let significant: Vec<usize> = (start..end)
            .rev()
            .filter(|&i| !self.tokens[i].token.is_whitespace())
            .take(2)
            .collect();

        if let [last, bang] = significant[..] {
            let is_important = matches!(&self.tokens[last].token, Token::Ident(s) if s.eq_ignore_ascii_case("important"));
            if is_important && self.tokens[bang].token == Token::Delim('!') {
                return (bang, true);
            }
        }

        (end, false)
    }

    /// Advances up to the `{` that opens a block and returns the token range
    /// before it.
    fn consume_prelude(&mut self) -> Result<Range<usize>> {
        let start = self.position;
        let mut depth = 0usize;

        while let Some(token) = self.current_token() {
            match token {
                Token::LeftBrace if depth == 0 => return Ok(start..self.position),
                Token::Semicolon if depth == 0 => {
                    return Err(ParseError::UnexpectedToken(";".to_string()))
                }
                Token::RightBrace => return Err(ParseError::UnexpectedToken("}".to_string())),
                Token::LeftParen | Token::LeftBracket => depth += 1,
                Token::RightParen | Token::RightBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }

        Err(ParseError::UnexpectedEOF)
    }

    /// Source text of a token range with comments dropped and whitespace
    /// runs collapsed to one space.
    fn text_between(&self, range: Range<usize>) -> String {
        let mut text = String::new();
        let mut pending_space = false;

        for spanned in &self.tokens[range] {
            if spanned.token.is_whitespace() {
                pending_space = !text.is_empty();
                continue;
            }
            if pending_space {
                text.push(' ');
                pending_space = false;
            }
            text.push_str(&self.source[spanned.span.clone()]);
        }

        text
    }

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|spanned| &spanned.token)
    }

    fn current_span_start(&self) -> usize {
        self.tokens
            .get(self.position)
            .map_or(self.source.len(), |spanned| spanned.span.start)
    }

    fn previous_span_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |spanned| spanned.span.end)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn check_token(&self, token: &Token) -> bool {
        if let Some(current) = self.current_token() {
            std::mem::discriminant(current) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<()> {
        if self.check_token(expected) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected {:?}, found {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Consumes the `}` closing a block; an unterminated block at end of
    /// input is accepted as closed.
    fn close_block(&mut self) -> Result<()> {
        if self.is_at_end() {
            return Ok(());
        }
        self.expect_token(&Token::RightBrace)
    }

    fn skip_whitespace(&mut self) {
        while let Some(token) = self.current_token() {
            if token.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skips a balanced `{ ... }` block starting at the current `{`.
    fn skip_block(&mut self) {
        let mut depth = 0usize;

        while let Some(token) = self.current_token() {
            match token {
                Token::LeftBrace => depth += 1,
                Token::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips past the broken declaration, leaving the closing `}` of the
    /// enclosing block in place.
    fn recover_in_block(&mut self) {
        while let Some(token) = self.current_token() {
            match token {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::RightBrace => return,
                Token::LeftBrace => self.skip_block(),
                _ => self.advance(),
            }
        }
    }

    /// Skips the rest of a broken rule. Inside a block an unmatched `}` is
    /// left for the enclosing rule to consume.
    fn recover_from_error(&mut self, nested: bool) {
        let mut brace_count = 0usize;

        while let Some(token) = self.current_token() {
            match token {
                Token::LeftBrace => brace_count += 1,
                Token::RightBrace => {
                    if brace_count > 1 {
                        brace_count -= 1;
                    } else if brace_count == 1 {
                        self.advance();
                        return;
                    } else {
                        if !nested {
                            self.advance();
                        }
                        return;
                    }
                }
                Token::Semicolon if brace_count == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }
}

impl Default for CSSParser {
    fn default() -> Self {
        Self::new()
    }
}
