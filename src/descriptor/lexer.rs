//! Tokenizer for decorator-annotated declaration sources.
//!
//! Only what the parser needs is recognized: identifiers, string and template
//! literals, numbers, and single-character punctuation. Comments and
//! whitespace are dropped; every token keeps its 1-based line.

use crate::descriptor::types::{DescriptorError, DescriptorResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// String literal with quotes removed and simple escapes resolved.
    Str(String),
    Number(String),
    Punct(char),
    /// `=>`
    Arrow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s == name)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Source text of the token, used to rebuild type annotations.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Ident(s) | TokenKind::Number(s) => s.clone(),
            TokenKind::Str(s) => format!("'{}'", s),
            TokenKind::Punct(c) => c.to_string(),
            TokenKind::Arrow => "=>".to_string(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split a source unit into tokens.
pub fn tokenize(source: &str) -> DescriptorResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comments
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            i += 2;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(DescriptorError::Syntax {
                            line: start_line,
                            message: "unterminated block comment".into(),
                        })
                    }
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some('\n') => line += 1,
                    Some(_) => {}
                }
                i += 1;
            }
            continue;
        }

        if c == '\'' || c == '"' || c == '`' {
            let start_line = line;
            let quote = c;
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(DescriptorError::Syntax {
                            line: start_line,
                            message: "unterminated string literal".into(),
                        })
                    }
                    Some('\\') => {
                        if let Some(&escaped) = chars.get(i + 1) {
                            value.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                other => other,
                            });
                        }
                        i += 2;
                        continue;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some('\n') => {
                        line += 1;
                        value.push('\n');
                    }
                    Some(&ch) => value.push(ch),
                }
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Str(value),
                line: start_line,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(chars[start..i].iter().collect()),
                line,
            });
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number(chars[start..i].iter().collect()),
                line,
            });
            continue;
        }

        if c == '=' && chars.get(i + 1) == Some(&'>') {
            tokens.push(Token {
                kind: TokenKind::Arrow,
                line,
            });
            i += 2;
            continue;
        }

        tokens.push(Token {
            kind: TokenKind::Punct(c),
            line,
        });
        i += 1;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_decorator_tokens() {
        assert_eq!(
            kinds("@Get(':id')"),
            vec![
                TokenKind::Punct('@'),
                TokenKind::Ident("Get".into()),
                TokenKind::Punct('('),
                TokenKind::Str(":id".into()),
                TokenKind::Punct(')'),
            ]
        );
    }

    #[test]
    fn test_comments_skipped_and_lines_tracked() {
        let tokens = tokenize("// one\n/* two\nthree */ four").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_ident("four"));
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#""a\"b""#), vec![TokenKind::Str("a\"b".into())]);
        assert_eq!(kinds("`tpl`"), vec![TokenKind::Str("tpl".into())]);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(matches!(
            tokenize("'open"),
            Err(DescriptorError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_arrow_and_numbers() {
        assert_eq!(
            kinds("x => 10"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Arrow,
                TokenKind::Number("10".into()),
            ]
        );
    }
}
