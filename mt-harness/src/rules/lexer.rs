//! Tokenizer for rule expressions

use crate::types::PortKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Port(PortKind, String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn is_port_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Split an expression into tokens
///
/// Errors carry a human-readable message with the byte offset.
pub fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while let Some(&(pos, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators first
        let two = match (c, peek(i + 1)) {
            ('=', Some('=')) => Some(Token::Eq),
            ('!', Some('=')) => Some(Token::Ne),
            ('<', Some('=')) => Some(Token::Le),
            ('>', Some('=')) => Some(Token::Ge),
            ('&', Some('&')) => Some(Token::And),
            ('|', Some('|')) => Some(Token::Or),
            _ => None,
        };
        if let Some(token) = two {
            tokens.push(token);
            i += 2;
            continue;
        }

        let single = match c {
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            '!' => Some(Token::Not),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && peek(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while peek(i).is_some_and(|d| d.is_ascii_digit() || d == '.') {
                i += 1;
            }
            if matches!(peek(i), Some('e') | Some('E')) {
                let mut j = i + 1;
                if matches!(peek(j), Some('+') | Some('-')) {
                    j += 1;
                }
                if peek(j).is_some_and(|d| d.is_ascii_digit()) {
                    i = j;
                    while peek(i).is_some_and(|d| d.is_ascii_digit()) {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().map(|(_, c)| *c).collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| format!("invalid number {:?} at offset {}", text, pos))?;
            tokens.push(Token::Number(value));
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                match peek(i) {
                    Some(ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        match peek(i + 1) {
                            Some(escaped) => text.push(escaped),
                            None => return Err(format!("unterminated string at offset {}", pos)),
                        }
                        i += 2;
                    }
                    Some(ch) => {
                        text.push(ch);
                        i += 1;
                    }
                    None => return Err(format!("unterminated string at offset {}", pos)),
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while peek(i).is_some_and(|d| d.is_alphanumeric() || d == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().map(|(_, c)| *c).collect();

            let kind = match word.as_str() {
                "in" => Some(PortKind::Input),
                "out" => Some(PortKind::Output),
                _ => None,
            };
            if let (Some(kind), Some(':')) = (kind, peek(i)) {
                i += 1;
                let name_start = i;
                while peek(i).is_some_and(is_port_char) {
                    i += 1;
                }
                if name_start == i {
                    return Err(format!("missing port name after {:?} at offset {}", word, pos));
                }
                let name: String = chars[name_start..i].iter().map(|(_, c)| *c).collect();
                tokens.push(Token::Port(kind, name));
                continue;
            }

            let token = match word.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                "True" | "true" => Token::True,
                "False" | "false" => Token::False,
                "None" => Token::None,
                _ => return Err(format!("unknown identifier {:?} at offset {}", word, pos)),
            };
            tokens.push(token);
            continue;
        }

        return Err(format!("unexpected character {:?} at offset {}", c, pos));
    }

    Ok(tokens)
}
