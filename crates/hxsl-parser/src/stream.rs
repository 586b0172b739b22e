//! Token stream adapter over the lexed source.
//!
//! Single-token lookahead with save/restore, plus diagnostic
//! construction carrying `file:line`.

use hxsl_ast::{Interner, Symbol};

use crate::lexer::{token_name, Token};
use crate::ParseError;

pub struct TokenStream {
    file_name: String,
    file: Symbol,
    tokens: Vec<(Token, u32)>,
    pos: usize,
}

impl TokenStream {
    pub fn new(file_name: &str, file: Symbol, tokens: Vec<(Token, u32)>) -> Self {
        debug_assert!(matches!(tokens.last(), Some((Token::EndOfStream, _))));
        Self {
            file_name: file_name.to_string(),
            file,
            tokens,
            pos: 0,
        }
    }

    /// The current token.
    pub fn token(&self) -> Token {
        self.tokens[self.pos].0
    }

    /// The line number of the current token.
    pub fn line(&self) -> u32 {
        self.tokens[self.pos].1
    }

    /// The interned file name.
    pub fn file(&self) -> Symbol {
        self.file
    }

    /// Consumes the current token. The end-of-stream sentinel is never
    /// consumed.
    pub fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Consumes the current token if it equals `token`.
    pub fn accept(&mut self, token: Token) -> bool {
        if self.token() == token {
            self.advance();
            return true;
        }
        false
    }

    /// Consumes the current token or fails with a syntax error naming
    /// the expected and the nearby token.
    pub fn expect(&mut self, token: Token, interner: &Interner) -> Result<(), ParseError> {
        if self.accept(token) {
            return Ok(());
        }
        let want = token_name(token, interner);
        let near = token_name(self.token(), interner);
        Err(self.error(format!("Syntax error: expected '{want}' near '{near}'")))
    }

    /// Builds a diagnostic at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            file: self.file_name.clone(),
            line: self.line(),
            message: message.into(),
        }
    }

    /// Saves the cursor for backtracking.
    pub fn save(&self) -> usize {
        self.pos
    }

    /// Restores a previously saved cursor.
    pub fn restore(&mut self, saved: usize) {
        self.pos = saved;
    }
}
