use serde::{Deserialize, Serialize};

use super::parser::{ParseError, Result, Token, Tokenizer};

const DEFAULT_FONT_SIZE_PX: f64 = 16.0;

/// What a media query is evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEnvironment {
    pub width: f64,
    pub height: f64,
    pub media_type: String,
}

impl MediaEnvironment {
    pub fn screen(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            media_type: "screen".to_string(),
        }
    }
}

/// Comma-separated media queries; the list matches when any query does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaQueryList {
    pub queries: Vec<MediaQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaQuery {
    pub media_type: Option<String>,
    pub conditions: Vec<MediaCondition>,
    pub is_not: bool,
    pub is_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCondition {
    pub feature: String,
    pub value: Option<MediaValue>,
    pub operator: Option<MediaOperator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOperator {
    Min,
    Max,
    Equal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaValue {
    /// Resolved to pixels.
    Length(f64),
    Number(f64),
    Ratio(f64),
    Ident(String),
}

impl MediaQueryList {
    /// Parses a media query list. A query that fails to parse becomes
    /// `not all` and never matches, leaving the rest of the list intact.
    pub fn parse(text: &str) -> Self {
        let tokens: Vec<Token> = Tokenizer::new(text)
            .tokenize()
            .into_iter()
            .map(|spanned| spanned.token)
            .filter(|token| !token.is_whitespace())
            .collect();

        let queries = split_top_level_commas(&tokens)
            .into_iter()
            .map(|group| {
                MediaQuery::parse(group).unwrap_or_else(|e| {
                    tracing::debug!("Invalid media query in {:?}: {}", text, e);
                    MediaQuery::never()
                })
            })
            .collect();

        Self { queries }
    }

    pub fn matches(&self, env: &MediaEnvironment) -> bool {
        self.queries.is_empty() || self.queries.iter().any(|query| query.matches(env))
    }
}

fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LeftParen => depth += 1,
            Token::RightParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                groups.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&tokens[start..]);

    groups
}

impl MediaQuery {
    pub fn never() -> Self {
        Self {
            media_type: Some("all".to_string()),
            conditions: Vec::new(),
            is_not: true,
            is_only: false,
        }
    }

    fn parse(tokens: &[Token]) -> Result<Self> {
        let mut position = 0;
        let mut is_not = false;
        let mut is_only = false;
        let mut media_type = None;
        let mut conditions = Vec::new();

        if tokens.is_empty() {
            return Err(ParseError::UnexpectedEOF);
        }

        if let Some(Token::Ident(keyword)) = tokens.first() {
            if keyword.eq_ignore_ascii_case("not") {
                is_not = true;
                position += 1;
            } else if keyword.eq_ignore_ascii_case("only") {
                is_only = true;
                position += 1;
            }
        }

        if let Some(Token::Ident(type_name)) = tokens.get(position) {
            media_type = Some(type_name.to_ascii_lowercase());
            position += 1;
        }

        let mut expect_and = media_type.is_some();

        while position < tokens.len() {
            if expect_and {
                match &tokens[position] {
                    Token::Ident(keyword) if keyword.eq_ignore_ascii_case("and") => position += 1,
                    other => {
                        return Err(ParseError::UnexpectedToken(format!(
                            "Expected 'and', found {:?}",
                            other
                        )))
                    }
                }
            }

            let (condition, next) = parse_condition(tokens, position)?;
            conditions.push(condition);
            position = next;
            expect_and = true;
        }

        if (is_not || is_only) && media_type.is_none() {
            return Err(ParseError::InvalidSyntax(
                "'not'/'only' requires a media type".to_string(),
            ));
        }

        Ok(Self {
            media_type,
            conditions,
            is_not,
            is_only,
        })
    }

    pub fn matches(&self, env: &MediaEnvironment) -> bool {
        let type_matches = match self.media_type.as_deref() {
            None | Some("all") => true,
            Some(media_type) => media_type == env.media_type,
        };

        let result = type_matches && self.conditions.iter().all(|c| c.matches(env));

        if self.is_not {
            !result
        } else {
            result
        }
    }
}

/// Parses `( feature [: value] )` starting at `start`, returning the index
/// after the closing parenthesis.
fn parse_condition(tokens: &[Token], start: usize) -> Result<(MediaCondition, usize)> {
    if tokens.get(start) != Some(&Token::LeftParen) {
        return Err(ParseError::UnexpectedToken(format!(
            "Expected '(', found {:?}",
            tokens.get(start)
        )));
    }

    let close = tokens[start..]
        .iter()
        .position(|t| *t == Token::RightParen)
        .map(|offset| start + offset)
        .ok_or(ParseError::UnexpectedEOF)?;

    let inner = &tokens[start + 1..close];

    let (name, value_tokens) = match inner {
        [Token::Ident(name)] => (name.to_ascii_lowercase(), None),
        [Token::Ident(name), Token::Colon, rest @ ..] if !rest.is_empty() => {
            (name.to_ascii_lowercase(), Some(rest))
        }
        _ => {
            return Err(ParseError::InvalidSyntax(format!(
                "Unsupported media feature syntax: {:?}",
                inner
            )))
        }
    };

    let (operator, feature) = if let Some(feature) = name.strip_prefix("min-") {
        (Some(MediaOperator::Min), feature.to_string())
    } else if let Some(feature) = name.strip_prefix("max-") {
        (Some(MediaOperator::Max), feature.to_string())
    } else {
        (value_tokens.map(|_| MediaOperator::Equal), name.clone())
    };

    let value = value_tokens.map(parse_value).transpose()?;

    if operator.is_some() && value.is_none() {
        return Err(ParseError::InvalidValue(format!("min-/max- {} without value", feature)));
    }

    Ok((
        MediaCondition {
            feature,
            value,
            operator,
        },
        close + 1,
    ))
}

fn parse_value(tokens: &[Token]) -> Result<MediaValue> {
    match tokens {
        [Token::Dimension(n, unit)] => match unit.to_ascii_lowercase().as_str() {
            "px" => Ok(MediaValue::Length(*n)),
            "em" | "rem" => Ok(MediaValue::Length(n * DEFAULT_FONT_SIZE_PX)),
            other => Err(ParseError::InvalidValue(format!("Unsupported unit {}", other))),
        },
        [Token::Number(n)] => Ok(MediaValue::Number(*n)),
        [Token::Number(a), Token::Delim('/'), Token::Number(b)] if *b != 0.0 => {
            Ok(MediaValue::Ratio(a / b))
        }
        [Token::Ident(ident)] => Ok(MediaValue::Ident(ident.to_ascii_lowercase())),
        other => Err(ParseError::InvalidValue(format!("{:?}", other))),
    }
}

impl MediaCondition {
    pub fn matches(&self, env: &MediaEnvironment) -> bool {
        match self.feature.as_str() {
            "width" => self.compare_length(env.width),
            "height" => self.compare_length(env.height),
            "aspect-ratio" => {
                let ratio = if env.height > 0.0 { env.width / env.height } else { 0.0 };
                match &self.value {
                    Some(MediaValue::Ratio(expected)) => compare(self.operator, ratio, *expected),
                    None => ratio != 0.0,
                    _ => false,
                }
            }
            "orientation" => {
                let actual = if env.height >= env.width { "portrait" } else { "landscape" };
                match &self.value {
                    Some(MediaValue::Ident(expected)) => {
                        self.operator == Some(MediaOperator::Equal) && expected == actual
                    }
                    None => true,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn compare_length(&self, actual: f64) -> bool {
        match &self.value {
            Some(MediaValue::Length(expected)) => compare(self.operator, actual, *expected),
            Some(MediaValue::Number(expected)) if *expected == 0.0 => {
                compare(self.operator, actual, 0.0)
            }
            None => actual != 0.0,
            _ => false,
        }
    }
}

fn compare(operator: Option<MediaOperator>, actual: f64, expected: f64) -> bool {
    match operator {
        Some(MediaOperator::Min) => actual >= expected,
        Some(MediaOperator::Max) => actual <= expected,
        Some(MediaOperator::Equal) | None => actual == expected,
    }
}
