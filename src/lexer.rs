use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Color(String), // #rrggbb
    Expr(String),  // `now()`

    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Colon,    // :
    Dot,      // .
    Lt,       // <
    Gt,       // >
    LtGt,     // <>
    Minus,    // -
    Other(char),

    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated string starting on line {0}")]
    UnterminatedString(usize),
    #[error("Unterminated expression on line {0}")]
    UnterminatedExpr(usize),
    #[error("Unterminated block comment starting on line {0}")]
    UnterminatedComment(usize),
}

/// Tokens of one source line. Multi-line strings and block comments are
/// attributed to the line they start on.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub tokens: Result<Vec<Token>, LexError>,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.chars.peek() {
                Some('\n') => break,
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => {
                            while let Some(&c) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let start = self.line;
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some('/') if prev == '*' => break,
                                    Some(c) => prev = c,
                                    None => return Err(LexError::UnterminatedComment(start)),
                                }
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Drop everything up to (not including) the next newline.
    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn read_word(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.line;
        let mut s = String::new();

        // '''multi-line'''
        if quote == '\'' {
            let mut ahead = self.chars.clone();
            if ahead.next() == Some('\'') && ahead.next() == Some('\'') {
                self.bump();
                self.bump();
                let mut run = 0;
                loop {
                    match self.bump() {
                        Some('\'') => {
                            run += 1;
                            if run == 3 {
                                s.truncate(s.len() - 2);
                                return Ok(s.trim().to_string());
                            }
                            s.push('\'');
                        }
                        Some(c) => {
                            run = 0;
                            s.push(c);
                        }
                        None => return Err(LexError::UnterminatedString(start)),
                    }
                }
            }
        }

        loop {
            match self.chars.peek().copied() {
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(s);
                }
                Some('\\') => {
                    self.bump();
                    if let Some(c) = self.bump() {
                        match c {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            _ => s.push(c),
                        }
                    }
                }
                Some('\n') | None => return Err(LexError::UnterminatedString(start)),
                Some(c) => {
                    self.bump();
                    s.push(c);
                }
            }
        }
    }

    fn read_expr(&mut self) -> Result<String, LexError> {
        let start = self.line;
        let mut s = String::new();
        loop {
            match self.chars.peek().copied() {
                Some('`') => {
                    self.bump();
                    return Ok(s);
                }
                Some('\n') | None => return Err(LexError::UnterminatedExpr(start)),
                Some(c) => {
                    self.bump();
                    s.push(c);
                }
            }
        }
    }

    fn read_number_or_word(&mut self, first: char) -> Token {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                // A dot not followed by a digit is a separator, not a decimal point.
                let mut ahead = self.chars.clone();
                ahead.next();
                if c == '.' && !ahead.peek().is_some_and(|n| n.is_ascii_digit()) {
                    break;
                }
                s.push(c);
                self.bump();
            } else if c.is_alphanumeric() || c == '_' {
                self.bump();
                s.push_str(&self.read_word(c));
                return Token::Ident(s);
            } else {
                break;
            }
        }
        Token::Num(s)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let tok = match c {
            '\n' => Token::Newline,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            '>' => Token::Gt,
            '-' => Token::Minus,
            '<' => {
                if self.chars.peek() == Some(&'>') {
                    self.bump();
                    Token::LtGt
                } else {
                    Token::Lt
                }
            }
            '#' => {
                let mut s = String::from('#');
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_alphanumeric() {
                        s.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Token::Color(s)
            }
            '"' | '\'' => Token::Str(self.read_string(c)?),
            '`' => Token::Expr(self.read_expr()?),
            c if c.is_ascii_digit() => self.read_number_or_word(c),
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.read_word(c)),
            c => Token::Other(c),
        };

        Ok(tok)
    }

    /// Split the input into lines of tokens. A lexing error poisons only the
    /// line it occurs on.
    pub fn tokenize_lines(mut self) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        let mut number = self.line;

        loop {
            if current.is_empty() {
                number = self.line;
            }
            match self.next_token() {
                Ok(Token::Eof) => break,
                Ok(Token::Newline) => {
                    if !current.is_empty() {
                        lines.push(Line {
                            number,
                            tokens: Ok(std::mem::take(&mut current)),
                        });
                    }
                }
                Ok(tok) => current.push(tok),
                Err(e) => {
                    self.skip_line();
                    current.clear();
                    lines.push(Line {
                        number,
                        tokens: Err(e),
                    });
                }
            }
        }

        if !current.is_empty() {
            lines.push(Line {
                number,
                tokens: Ok(current),
            });
        }

        lines
    }
}
