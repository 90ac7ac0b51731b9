// ABOUTME: Lexer for dice notation expressions.
// ABOUTME: Tokenizes strings like "2d6 - d4 + 3" into a stream of tokens.

use crate::error::{Error, Result};

/// A token in the dice notation language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A numeric literal.
    Number(u32),
    /// The 'd' or 'D' dice separator.
    D,
    /// Addition operator.
    Plus,
    /// Subtraction operator.
    Minus,
    /// End of input.
    Eof,
}

/// A lexer for dice notation.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Byte offset of the most recently produced token.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Get the next token from the input.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        self.pos = pos;

        match ch {
            '0'..='9' => self.number(),
            'd' | 'D' => {
                self.chars.next();
                Ok(Token::D)
            }
            '+' => {
                self.chars.next();
                Ok(Token::Plus)
            }
            '-' => {
                self.chars.next();
                Ok(Token::Minus)
            }
            _ => Err(Error::UnexpectedChar(ch, pos)),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut value: u32 = 0;

        loop {
            // Spaces inside a number are ignored: "1 0" is 10.
            let mut ahead = self.chars.clone();
            while ahead.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
            let Some(digit) = ahead.peek().and_then(|&(_, c)| c.to_digit(10)) else {
                break;
            };
            ahead.next();
            self.chars = ahead;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(Error::NumberTooLarge(start))?;
        }

        Ok(Token::Number(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::Eof {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_basic_roll() {
        assert_eq!(
            tokens("2d6"),
            vec![Token::Number(2), Token::D, Token::Number(6)]
        );
    }

    #[test]
    fn test_expression_with_whitespace() {
        assert_eq!(
            tokens(" 2d6 -  D4+3 "),
            vec![
                Token::Number(2),
                Token::D,
                Token::Number(6),
                Token::Minus,
                Token::D,
                Token::Number(4),
                Token::Plus,
                Token::Number(3),
            ]
        );
    }

    #[test]
    fn test_unexpected_char() {
        let mut lexer = Lexer::new("1d6 * 2");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(1));
        assert_eq!(lexer.next_token().unwrap(), Token::D);
        assert_eq!(lexer.next_token().unwrap(), Token::Number(6));
        assert!(matches!(
            lexer.next_token(),
            Err(Error::UnexpectedChar('*', 4))
        ));
    }

    #[test]
    fn test_number_overflow() {
        let mut lexer = Lexer::new("99999999999");
        assert!(matches!(lexer.next_token(), Err(Error::NumberTooLarge(0))));
    }

    #[test]
    fn test_whitespace_inside_numbers() {
        assert_eq!(
            tokens("1 0 + d 2 0"),
            vec![
                Token::Number(10),
                Token::Plus,
                Token::D,
                Token::Number(20),
            ]
        );
    }

    #[test]
    fn test_trailing_whitespace_after_number() {
        let mut lexer = Lexer::new("12  +");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(12));
        assert_eq!(lexer.next_token().unwrap(), Token::Plus);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_empty_is_eof() {
        let mut lexer = Lexer::new("   ");
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }
}
