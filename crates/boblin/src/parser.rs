// ABOUTME: Parser for dice notation expressions.
// ABOUTME: Folds a token stream of signed terms into a ParsedExpression.

use crate::ast::ParsedExpression;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// Upper bound on the repeat count of a single `NdM` term.
///
/// Keeps a typo like `100000000d6` from allocating before limits are checked.
pub const MAX_REPEAT: u32 = 10_000;

/// Parser for dice notation expressions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    dice: Vec<i64>,
    flat: i64,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            dice: Vec::new(),
            flat: 0,
        })
    }

    /// Parse the whole input into an expression.
    pub fn parse(mut self) -> Result<ParsedExpression> {
        if self.current == Token::Eof {
            return Err(Error::EmptyExpression);
        }

        // Only the first term may carry a sign of its own.
        let mut negative = match self.current {
            Token::Minus => {
                self.advance()?;
                true
            }
            Token::Plus => {
                self.advance()?;
                false
            }
            _ => false,
        };

        loop {
            self.term(negative)?;

            negative = match self.current {
                Token::Plus => false,
                Token::Minus => true,
                Token::Eof => break,
                _ => {
                    return Err(Error::Expected {
                        expected: "'+', '-' or end of input".to_string(),
                        found: self.found(),
                    })
                }
            };
            self.advance()?;
        }

        ParsedExpression::new(self.dice, self.flat)
    }

    fn advance(&mut self) -> Result<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        Ok(prev)
    }

    fn found(&self) -> String {
        match self.current {
            Token::Eof => "end of input".to_string(),
            ref token => format!("{:?} at position {}", token, self.lexer.pos()),
        }
    }

    /// Parse one term: a bare number or a dice roll.
    fn term(&mut self, negative: bool) -> Result<()> {
        let count = match self.current {
            Token::Number(n) => {
                self.advance()?;
                if self.current != Token::D {
                    let value = i64::from(n);
                    self.flat += if negative { -value } else { value };
                    return Ok(());
                }
                n
            }
            Token::D => 1,
            _ => {
                return Err(Error::Expected {
                    expected: "number or dice roll".to_string(),
                    found: self.found(),
                })
            }
        };

        // Consume the 'd'
        self.advance()?;

        let sides = match self.current {
            Token::Number(n) => {
                self.advance()?;
                n
            }
            _ => {
                return Err(Error::Expected {
                    expected: "dice sides".to_string(),
                    found: self.found(),
                })
            }
        };

        if count == 0 {
            return Err(Error::InvalidDiceCount(count));
        }
        if sides == 0 {
            return Err(Error::InvalidDiceSides(sides));
        }
        if count > MAX_REPEAT {
            return Err(Error::ComputationOverflow {
                what: "dice count",
                value: count as usize,
                limit: MAX_REPEAT as usize,
            });
        }

        let die = if negative {
            -i64::from(sides)
        } else {
            i64::from(sides)
        };
        self.dice.extend(std::iter::repeat(die).take(count as usize));
        Ok(())
    }
}

/// Parse a dice notation string into an expression.
pub fn parse(input: &str) -> Result<ParsedExpression> {
    Parser::new(input)?.parse()
}
