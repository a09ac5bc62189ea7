//! Expression lexer, AST, parser, and evaluator for sandboxed scripts.
//!
//! Two dialects share one grammar:
//!
//! * [`Dialect::Script`] is the JavaScript-like language of `(eval ...)` and
//!   `(if ...)`: statements separated by `;`, `let`/`const`/`var`, `return`,
//!   `if`/`else`, member access, indexing, method calls, list literals and
//!   single-expression arrow callbacks (`users.filter(u => u.online)`).
//! * [`Dialect::Math`] is the arithmetic language of `(math. ...)`: a single
//!   expression where `^` is exponentiation instead of bitwise xor.
//!
//! Operator precedence (lowest → highest):
//!   comma  →  assign  →  ternary  →  or  →  and  →  bitor  →  bitxor  →
//!   bitand  →  equality  →  relational  →  shift  →  additive  →
//!   multiplicative  →  unary  →  power  →  postfix  →  primary

use super::builtins;
use super::value::Value;

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Dependency-injection interface used by the evaluator.
///
/// The sandbox's scope implements this trait; nothing else of the host is
/// reachable from a script.
pub trait EvalContext {
    /// Look up a variable.
    fn get_var(&self, name: &str) -> Option<Value>;

    /// Bind a variable in the script's scope.
    fn set_local(&mut self, name: &str, value: Value);

    /// Remove a binding (used when an arrow callback's parameter goes out of
    /// scope).
    fn unset_local(&mut self, name: &str);

    /// Invoke a free or namespaced function (`floor(x)`, `Math.floor(x)`).
    fn call_fn(&mut self, name: &str, args: Vec<Value>) -> Result<Value, String>;
}

/// Which surface syntax the parser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Script,
    Math,
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Bang,
    Tilde,
    Ampersand,
    Pipe,
    Caret,
    ShiftLeft,
    ShiftRight,

    // Comparison
    Eq,       // ==
    Ne,       // !=
    StrictEq, // ===
    StrictNe, // !==
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And, // &&
    Or,  // ||

    // Assignment
    Assign,        // =
    PlusAssign,    // +=
    MinusAssign,   // -=
    StarAssign,    // *=
    SlashAssign,   // /=
    PercentAssign, // %=

    // Misc
    Arrow, // =>
    Question,
    Colon,
    Comma,
    Dot,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// Unrecognised input character, reported as a diagnostic instead of masking as EOF.
    Unknown(char),
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.src.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Consume bytes while `pred` holds and return them as a `&str`.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        // Only ASCII bytes satisfy the predicates used below, so the slice
        // always falls on char boundaries.
        std::str::from_utf8(&src[start..self.pos]).unwrap_or_default()
    }

    fn read_number(&mut self, start: usize) -> Token {
        self.pos = start;

        // Hex literal
        if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x' | b'X')) {
            self.pos += 2;
            let hex = self.take_while(|c| c.is_ascii_hexdigit());
            return Token::Int(i64::from_str_radix(hex, 16).unwrap_or(0));
        }

        let mut is_float = false;
        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some(b'.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            self.take_while(|c| c.is_ascii_digit());
        }

        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        if is_float {
            Token::Float(text.parse().unwrap_or(f64::NAN))
        } else {
            text.parse()
                .map(Token::Int)
                .unwrap_or_else(|_| Token::Float(text.parse().unwrap_or(f64::NAN)))
        }
    }

    fn read_string(&mut self, quote: u8) -> Token {
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(c) => bytes.push(c),
                    None => break,
                },
                Some(c) if c == quote => break,
                Some(c) => bytes.push(c),
            }
        }
        Token::Str(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_ident(&mut self, start: usize) -> Token {
        self.pos = start;
        let ident = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$');
        Token::Ident(ident.to_owned())
    }

    fn next_token(&mut self) -> Token {
        self.skip_ws();
        let start = self.pos;
        let ch = match self.advance() {
            None => return Token::Eof,
            Some(c) => c,
        };

        match ch {
            b'0'..=b'9' => self.read_number(start),
            b'.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(start),
            b'"' | b'\'' | b'`' => self.read_string(ch),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => self.read_ident(start),
            b'+' => {
                if self.eat(b'=') {
                    Token::PlusAssign
                } else {
                    Token::Plus
                }
            }
            b'-' => {
                if self.eat(b'=') {
                    Token::MinusAssign
                } else {
                    Token::Minus
                }
            }
            b'*' => {
                if self.eat(b'*') {
                    Token::StarStar
                } else if self.eat(b'=') {
                    Token::StarAssign
                } else {
                    Token::Star
                }
            }
            b'/' => {
                if self.eat(b'=') {
                    Token::SlashAssign
                } else {
                    Token::Slash
                }
            }
            b'%' => {
                if self.eat(b'=') {
                    Token::PercentAssign
                } else {
                    Token::Percent
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    if self.eat(b'=') {
                        Token::StrictNe
                    } else {
                        Token::Ne
                    }
                } else {
                    Token::Bang
                }
            }
            b'~' => Token::Tilde,
            b'^' => Token::Caret,
            b'&' => {
                if self.eat(b'&') {
                    Token::And
                } else {
                    Token::Ampersand
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    Token::Or
                } else {
                    Token::Pipe
                }
            }
            b'<' => {
                if self.eat(b'<') {
                    Token::ShiftLeft
                } else if self.eat(b'=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    Token::ShiftRight
                } else if self.eat(b'=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    if self.eat(b'=') {
                        Token::StrictEq
                    } else {
                        Token::Eq
                    }
                } else if self.eat(b'>') {
                    Token::Arrow
                } else {
                    Token::Assign
                }
            }
            b'?' => Token::Question,
            b':' => Token::Colon,
            b',' => Token::Comma,
            b'.' => Token::Dot,
            b';' => Token::Semicolon,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            _ => {
                // Report the whole UTF-8 character, not just its lead byte.
                let rest = std::str::from_utf8(&self.src[start..]).unwrap_or_default();
                let c = rest.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                self.pos = start + c.len_utf8().max(1);
                Token::Unknown(c)
            }
        }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token();
            let done = matches!(t, Token::Eof);
            tokens.push(t);
            if done {
                break;
            }
        }
        tokens
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(String, AssignOp, Box<Expr>),
    Call(String, Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Method(Box<Expr>, String, Vec<Expr>),
    /// Arrow callback; only valid as an argument to a list method.
    Lambda(Vec<String>, Box<Expr>),
    Comma(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Let(String, Option<Expr>),
    Return(Option<Expr>),
    If(Expr, Vec<Stmt>, Vec<Stmt>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
}

impl Parser {
    fn new(tokens: Vec<Token>, dialect: Dialect) -> Self {
        Parser {
            tokens,
            pos: 0,
            dialect,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), String> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected {what}, found {:?}", self.peek()))
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Token::Ident(s) if s == kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(format!("unexpected {other:?} after expression")),
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Vec<Stmt>, String> {
        let mut stmts = Vec::new();
        while self.peek() != &Token::Eof {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, String> {
        let stmt = if self.eat_keyword("return") {
            let value = match self.peek() {
                Token::Semicolon | Token::RBrace | Token::Eof => None,
                _ => Some(self.parse_expr()?),
            };
            Stmt::Return(value)
        } else if self.eat_keyword("let") || self.eat_keyword("const") || self.eat_keyword("var") {
            let name = match self.advance() {
                Token::Ident(name) => name,
                other => return Err(format!("expected a name after declaration, found {other:?}")),
            };
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_assign()?)
            } else {
                None
            };
            Stmt::Let(name, init)
        } else if self.eat_keyword("if") {
            self.expect(&Token::LParen, "'(' after if")?;
            let cond = self.parse_expr()?;
            self.expect(&Token::RParen, "')' after condition")?;
            let then = self.parse_body()?;
            let else_ = if self.eat_keyword("else") {
                self.parse_body()?
            } else {
                Vec::new()
            };
            return Ok(Stmt::If(cond, then, else_));
        } else {
            Stmt::Expr(self.parse_expr()?)
        };
        match self.peek() {
            Token::Semicolon => {
                self.pos += 1;
                Ok(stmt)
            }
            Token::RBrace | Token::Eof => Ok(stmt),
            other => Err(format!("expected ';', found {other:?}")),
        }
    }

    /// A braced block or a single statement.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, String> {
        if !self.eat(&Token::LBrace) {
            return Ok(vec![self.parse_stmt()?]);
        }
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.pos += 1;
                    return Ok(stmts);
                }
                Token::Eof => return Err("expected '}'".into()),
                Token::Semicolon => self.pos += 1,
                _ => stmts.push(self.parse_stmt()?),
            }
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_comma()
    }

    fn parse_comma(&mut self) -> Result<Expr, String> {
        let first = self.parse_assign()?;
        if self.peek() == &Token::Comma {
            let mut exprs = vec![first];
            while self.eat(&Token::Comma) {
                exprs.push(self.parse_assign()?);
            }
            Ok(Expr::Comma(exprs))
        } else {
            Ok(first)
        }
    }

    fn parse_assign(&mut self) -> Result<Expr, String> {
        if let Some(lambda) = self.try_lambda()? {
            return Ok(lambda);
        }
        // Look-ahead: an identifier followed by an assign op is an assignment.
        if let Token::Ident(name) = self.peek().clone() {
            let op = match self.peek_at(1) {
                Token::Assign => Some(AssignOp::Set),
                Token::PlusAssign => Some(AssignOp::Add),
                Token::MinusAssign => Some(AssignOp::Sub),
                Token::StarAssign => Some(AssignOp::Mul),
                Token::SlashAssign => Some(AssignOp::Div),
                Token::PercentAssign => Some(AssignOp::Rem),
                _ => None,
            };
            if let Some(op) = op {
                self.pos += 2; // consume ident + assign-op
                let rhs = self.parse_assign()?;
                return Ok(Expr::Assign(name, op, Box::new(rhs)));
            }
        }
        self.parse_ternary()
    }

    /// `x => body` or `(a, b) => body`.
    fn try_lambda(&mut self) -> Result<Option<Expr>, String> {
        if self.dialect != Dialect::Script {
            return Ok(None);
        }
        let params = match self.peek() {
            Token::Ident(name) if self.peek_at(1) == &Token::Arrow => {
                let params = vec![name.clone()];
                self.pos += 2;
                params
            }
            Token::LParen => {
                let mut params = Vec::new();
                let mut i = 1;
                loop {
                    match self.peek_at(i) {
                        Token::Ident(name) => params.push(name.clone()),
                        Token::RParen => break,
                        _ => return Ok(None),
                    }
                    match self.peek_at(i + 1) {
                        Token::Comma => i += 2,
                        Token::RParen => {
                            i += 1;
                            break;
                        }
                        _ => return Ok(None),
                    }
                }
                if self.peek_at(i + 1) != &Token::Arrow {
                    return Ok(None);
                }
                self.pos += i + 2;
                params
            }
            _ => return Ok(None),
        };
        let body = self.parse_assign()?;
        Ok(Some(Expr::Lambda(params, Box::new(body))))
    }

    fn parse_ternary(&mut self) -> Result<Expr, String> {
        let cond = self.parse_or()?;
        if self.eat(&Token::Question) {
            let then = self.parse_assign()?;
            self.expect(&Token::Colon, "':' in ternary")?;
            let else_ = self.parse_assign()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(else_),
            ))
        } else {
            Ok(cond)
        }
    }

    /// One left-associative precedence level.
    fn parse_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, String>,
        op_for: fn(&Token, Dialect) -> Option<BinOp>,
    ) -> Result<Expr, String> {
        let mut lhs = next(self)?;
        while let Some(op) = op_for(self.peek(), self.dialect) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_and, |t, _| (t == &Token::Or).then_some(BinOp::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_bitor, |t, _| (t == &Token::And).then_some(BinOp::And))
    }

    fn parse_bitor(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_bitxor, |t, _| (t == &Token::Pipe).then_some(BinOp::BitOr))
    }

    fn parse_bitxor(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_bitand, |t, d| {
            (t == &Token::Caret && d == Dialect::Script).then_some(BinOp::BitXor)
        })
    }

    fn parse_bitand(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_equality, |t, _| {
            (t == &Token::Ampersand).then_some(BinOp::BitAnd)
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_relational, |t, _| match t {
            Token::Eq => Some(BinOp::Eq),
            Token::Ne => Some(BinOp::Ne),
            Token::StrictEq => Some(BinOp::StrictEq),
            Token::StrictNe => Some(BinOp::StrictNe),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_shift, |t, _| match t {
            Token::Lt => Some(BinOp::Lt),
            Token::Le => Some(BinOp::Le),
            Token::Gt => Some(BinOp::Gt),
            Token::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_additive, |t, _| match t {
            Token::ShiftLeft => Some(BinOp::Shl),
            Token::ShiftRight => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_multiplicative, |t, _| match t {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        self.parse_level(Self::parse_unary, |t, _| match t {
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Rem),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    /// Right-associative exponentiation: `**` always, `^` in math.
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_postfix()?;
        let is_pow = match self.peek() {
            Token::StarStar => true,
            Token::Caret => self.dialect == Dialect::Math,
            _ => false,
        };
        if is_pow {
            self.pos += 1;
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    other => return Err(format!("expected property name, found {other:?}")),
                };
                if self.eat(&Token::LParen) {
                    let args = self.parse_args(&name)?;
                    expr = Expr::Method(Box::new(expr), name, args);
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat(&Token::LBracket) {
                let idx = self.parse_expr()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(idx));
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an already-consumed `(`.
    fn parse_args(&mut self, name: &str) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            args.push(self.parse_assign()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_assign()?);
            }
        }
        if !self.eat(&Token::RParen) {
            return Err(format!("expected ')' after args to {name}"));
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let tok = self.advance();
        match tok {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ if self.eat(&Token::LParen) => {
                    let args = self.parse_args(&name)?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Var(name)),
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RBracket {
                    items.push(self.parse_assign()?);
                    while self.eat(&Token::Comma) {
                        if self.peek() == &Token::RBracket {
                            break;
                        }
                        items.push(self.parse_assign()?);
                    }
                }
                self.expect(&Token::RBracket, "']'")?;
                Ok(Expr::List(items))
            }
            Token::Unknown(c) => Err(format!("unexpected character '{c}'")),
            Token::Eof => Err("unexpected end of input".into()),
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

/// Parse a single expression; trailing input is an error.
pub fn parse_expr(src: &str, dialect: Dialect) -> Result<Expr, String> {
    let tokens = Lexer::new(src).tokenize();
    let mut parser = Parser::new(tokens, dialect);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a `;`-separated script body.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>, String> {
    let tokens = Lexer::new(src).tokenize();
    Parser::new(tokens, Dialect::Script).parse_program()
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

enum Flow {
    Next,
    Return(Value),
}

/// Run a parsed script.  The result is the value of the first `return`
/// reached, or `Null` when the script falls off the end.
pub fn run_program(stmts: &[Stmt], ctx: &mut dyn EvalContext) -> Result<Value, String> {
    match run_block(stmts, ctx)? {
        Flow::Return(v) => Ok(v),
        Flow::Next => Ok(Value::Null),
    }
}

fn run_block(stmts: &[Stmt], ctx: &mut dyn EvalContext) -> Result<Flow, String> {
    for stmt in stmts {
        match stmt {
            Stmt::Expr(e) => {
                eval_expr(e, ctx)?;
            }
            Stmt::Let(name, init) => {
                let v = match init {
                    Some(e) => eval_expr(e, ctx)?,
                    None => Value::Null,
                };
                ctx.set_local(name, v);
            }
            Stmt::Return(value) => {
                let v = match value {
                    Some(e) => eval_expr(e, ctx)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(v));
            }
            Stmt::If(cond, then, else_) => {
                let branch = if eval_expr(cond, ctx)?.as_bool() { then } else { else_ };
                if let Flow::Return(v) = run_block(branch, ctx)? {
                    return Ok(Flow::Return(v));
                }
            }
        }
    }
    Ok(Flow::Next)
}

/// Evaluate an [`Expr`] AST node against the given context.
pub fn eval_expr(expr: &Expr, ctx: &mut dyn EvalContext) -> Result<Value, String> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Var(name) => ctx
            .get_var(name)
            .ok_or_else(|| format!("{name} is not defined")),

        Expr::List(items) => Ok(Value::List(eval_args(items, ctx)?)),

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx)?;
            Ok(match op {
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Plus => match v {
                    Value::Int(_) => v,
                    other => Value::Float(other.as_float()),
                },
                UnaryOp::Not => Value::Bool(!v.as_bool()),
                UnaryOp::BitNot => Value::Int(!v.as_int()),
            })
        }

        Expr::Binary(op, lhs, rhs) => {
            // && and || short-circuit and yield an operand, not a boolean.
            match op {
                BinOp::And => {
                    let l = eval_expr(lhs, ctx)?;
                    return if l.as_bool() { eval_expr(rhs, ctx) } else { Ok(l) };
                }
                BinOp::Or => {
                    let l = eval_expr(lhs, ctx)?;
                    return if l.as_bool() { Ok(l) } else { eval_expr(rhs, ctx) };
                }
                _ => {}
            }
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            eval_binop(*op, l, r)
        }

        Expr::Ternary(cond, then, else_) => {
            let c = eval_expr(cond, ctx)?;
            if c.as_bool() {
                eval_expr(then, ctx)
            } else {
                eval_expr(else_, ctx)
            }
        }

        Expr::Assign(name, op, rhs) => {
            let rval = eval_expr(rhs, ctx)?;
            let new_val = match op {
                AssignOp::Set => rval,
                _ => {
                    let cur = ctx
                        .get_var(name)
                        .ok_or_else(|| format!("{name} is not defined"))?;
                    match op {
                        AssignOp::Add => cur.arith_add(&rval),
                        AssignOp::Sub => cur.arith_sub(&rval),
                        AssignOp::Mul => cur.arith_mul(&rval),
                        AssignOp::Div => cur.arith_div(&rval)?,
                        AssignOp::Rem => cur.arith_rem(&rval)?,
                        AssignOp::Set => unreachable!("handled above"),
                    }
                }
            };
            ctx.set_local(name, new_val.clone());
            Ok(new_val)
        }

        Expr::Call(name, arg_exprs) => {
            let args = eval_args(arg_exprs, ctx)?;
            ctx.call_fn(name, args)
        }

        Expr::Member(target, key) => {
            // `Math.PI` and friends: an undefined namespace falls back to a
            // dotted variable name.
            if let Expr::Var(ns) = target.as_ref() {
                if ctx.get_var(ns).is_none() {
                    let dotted = format!("{ns}.{key}");
                    return ctx
                        .get_var(&dotted)
                        .ok_or_else(|| format!("{ns} is not defined"));
                }
            }
            Ok(eval_expr(target, ctx)?.member(key))
        }

        Expr::Index(target, idx) => {
            let t = eval_expr(target, ctx)?;
            let i = eval_expr(idx, ctx)?;
            Ok(t.index(&i))
        }

        Expr::Method(target, name, arg_exprs) => {
            if let Expr::Var(ns) = target.as_ref() {
                if ctx.get_var(ns).is_none() {
                    let args = eval_args(arg_exprs, ctx)?;
                    return ctx.call_fn(&format!("{ns}.{name}"), args);
                }
            }
            let recv = eval_expr(target, ctx)?;
            if let (Value::List(items), Some(Expr::Lambda(params, body))) = (&recv, arg_exprs.first()) {
                return eval_list_callback(items, name, params, body, ctx);
            }
            let args = eval_args(arg_exprs, ctx)?;
            builtins::call_method(&recv, name, args)
                .unwrap_or_else(|| Err(format!("{name} is not a function")))
        }

        Expr::Lambda(..) => Err("arrow functions are only allowed as list callbacks".into()),

        Expr::Comma(exprs) => {
            let mut last = Value::default();
            for e in exprs {
                last = eval_expr(e, ctx)?;
            }
            Ok(last)
        }
    }
}

fn eval_args(exprs: &[Expr], ctx: &mut dyn EvalContext) -> Result<Vec<Value>, String> {
    let mut args = Vec::with_capacity(exprs.len());
    for e in exprs {
        args.push(eval_expr(e, ctx)?);
    }
    Ok(args)
}

/// `list.map(x => ...)`, `filter`, `find`, `findIndex`, `some`, `every`.
fn eval_list_callback(
    items: &[Value],
    method: &str,
    params: &[String],
    body: &Expr,
    ctx: &mut dyn EvalContext,
) -> Result<Value, String> {
    let saved: Vec<Option<Value>> = params.iter().map(|p| ctx.get_var(p)).collect();

    let mut results = Vec::with_capacity(items.len());
    let mut outcome = Ok(());
    for (i, item) in items.iter().enumerate() {
        if let Some(p) = params.first() {
            ctx.set_local(p, item.clone());
        }
        if let Some(p) = params.get(1) {
            ctx.set_local(p, Value::Int(i as i64));
        }
        match eval_expr(body, ctx) {
            Ok(v) => results.push(v),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    for (p, old) in params.iter().zip(saved) {
        match old {
            Some(v) => ctx.set_local(p, v),
            None => ctx.unset_local(p),
        }
    }
    outcome?;

    let hit = |r: &Value| r.as_bool();
    Ok(match method {
        "map" => Value::List(results),
        "filter" => Value::List(
            items
                .iter()
                .zip(&results)
                .filter(|(_, r)| hit(*r))
                .map(|(item, _)| item.clone())
                .collect(),
        ),
        "find" => results
            .iter()
            .position(hit)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default(),
        "findIndex" => Value::Int(results.iter().position(hit).map(|i| i as i64).unwrap_or(-1)),
        "some" => Value::Bool(results.iter().any(hit)),
        "every" => Value::Bool(results.iter().all(hit)),
        other => return Err(format!("{other} does not take a callback")),
    })
}

/// `===`: no coercion between kinds (ints and floats are the same kind).
fn strict_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            l.as_float() == r.as_float()
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn eval_binop(op: BinOp, l: Value, r: Value) -> Result<Value, String> {
    use std::cmp::Ordering;
    let ordered = |want: fn(Ordering) -> bool| {
        // NaN compares false against everything.
        let both_str = matches!((&l, &r), (Value::Str(_), Value::Str(_)));
        if !both_str && (l.as_float().is_nan() || r.as_float().is_nan()) {
            return Value::Bool(false);
        }
        Value::Bool(want(l.cmp_value(&r)))
    };
    match op {
        BinOp::Add => Ok(l.arith_add(&r)),
        BinOp::Sub => Ok(l.arith_sub(&r)),
        BinOp::Mul => Ok(l.arith_mul(&r)),
        BinOp::Div => l.arith_div(&r),
        BinOp::Rem => l.arith_rem(&r),
        BinOp::Pow => Ok(l.arith_pow(&r)),

        BinOp::Eq => Ok(Value::Bool(l.loose_eq(&r))),
        BinOp::Ne => Ok(Value::Bool(!l.loose_eq(&r))),
        BinOp::StrictEq => Ok(Value::Bool(strict_eq(&l, &r))),
        BinOp::StrictNe => Ok(Value::Bool(!strict_eq(&l, &r))),
        BinOp::Lt => Ok(ordered(Ordering::is_lt)),
        BinOp::Le => Ok(ordered(Ordering::is_le)),
        BinOp::Gt => Ok(ordered(Ordering::is_gt)),
        BinOp::Ge => Ok(ordered(Ordering::is_ge)),

        BinOp::BitAnd => Ok(Value::Int(l.as_int() & r.as_int())),
        BinOp::BitOr => Ok(Value::Int(l.as_int() | r.as_int())),
        BinOp::BitXor => Ok(Value::Int(l.as_int() ^ r.as_int())),
        BinOp::Shl => Ok(Value::Int(l.as_int() << (r.as_int() & 63))),
        BinOp::Shr => Ok(Value::Int(l.as_int() >> (r.as_int() & 63))),

        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

/// Convenience: parse and evaluate a single expression.
pub fn eval_str(src: &str, dialect: Dialect, ctx: &mut dyn EvalContext) -> Result<Value, String> {
    let expr = parse_expr(src, dialect)?;
    eval_expr(&expr, ctx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
