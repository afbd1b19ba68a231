//! Translator: source text -> [`Script`].
//!
//! Line-oriented recursive descent over the token stream, followed by an
//! idempotent normalization pass that expands the short TA call forms.

use regex::Regex;

use crate::ast::{Arg, BinaryOp, BindKind, Expr, Script, Stmt, UnaryOp};
use crate::lexer::{lex_line, Token};

/// Translate a script into its intermediate executable form. Unrecognized
/// lines become [`Stmt::Unsupported`] rather than failing the whole script.
pub fn translate(source: &str) -> Script {
    let version = script_version(source);
    let mut stmts = Vec::new();
    let mut title = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("//") {
            if !line.starts_with("//@version") {
                stmts.push(Stmt::Comment(line.trim_start_matches('/').trim().to_string()));
            }
            continue;
        }

        let tokens = match lex_line(line) {
            Ok(t) => t,
            Err(_) => {
                stmts.push(Stmt::Unsupported {
                    line: line_no,
                    text: line.to_string(),
                });
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }

        match parse_statement(&tokens, line_no) {
            Ok(stmt) => {
                if let Stmt::Title(t) = &stmt {
                    title.get_or_insert_with(|| t.clone());
                }
                stmts.push(stmt);
            }
            Err(_) => stmts.push(Stmt::Unsupported {
                line: line_no,
                text: line.to_string(),
            }),
        }
    }

    let mut script = Script {
        version,
        title,
        stmts,
    };
    normalize(&mut script);
    script
}

/// Integer from `//@version=N`; defaults to 6 when absent.
pub fn script_version(source: &str) -> u32 {
    let re = Regex::new(r"//@version\s*=\s*(\d+)").expect("version regex");
    re.captures(source)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(6)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn parse_statement(tokens: &[Token], line: usize) -> Result<Stmt, ParseError> {
    let mut p = Parser { tokens, pos: 0 };

    // Declaration stubs collapse to a title binding.
    if let Some(Token::Ident(name)) = p.peek() {
        if matches!(name.as_str(), "indicator" | "strategy" | "library")
            && p.peek_at(1) == Some(&Token::LParen)
        {
            let name = name.clone();
            p.advance();
            p.expect(&Token::LParen)?;
            let title = match p.peek() {
                Some(Token::Str(s)) => s.clone(),
                _ => name,
            };
            // Remaining declaration arguments carry no runtime behavior.
            return Ok(Stmt::Title(title));
        }
    }

    // Destructuring: [a, b, c] = ta.bb(...)
    if p.peek() == Some(&Token::LBracket) {
        p.advance();
        let mut names = Vec::new();
        loop {
            match p.next() {
                Some(Token::Ident(n)) => names.push(n.clone()),
                other => return Err(ParseError::new(format!("expected identifier, got {other:?}"))),
            }
            match p.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => break,
                other => return Err(ParseError::new(format!("expected ',' or ']', got {other:?}"))),
            }
        }
        p.expect(&Token::Assign)?;
        let call = p.parse_expr()?;
        p.expect_end()?;
        return Ok(Stmt::Destructure { names, call, line });
    }

    // Bindings: [var|varip] name = expr  (also `name := expr`).
    let kind = match p.peek() {
        Some(Token::Var) => {
            p.advance();
            Some(BindKind::Var)
        }
        Some(Token::Varip) => {
            p.advance();
            Some(BindKind::Varip)
        }
        _ => None,
    };
    if let Some(Token::Ident(name)) = p.peek() {
        if p.peek_at(1) == Some(&Token::Assign) {
            let name = name.clone();
            p.advance();
            p.advance();
            let value = p.parse_expr()?;
            p.expect_end()?;
            return Ok(Stmt::Let {
                kind: kind.unwrap_or(BindKind::Plain),
                name,
                value,
                line,
            });
        }
    }
    if kind.is_some() {
        return Err(ParseError::new("var/varip requires an assignment"));
    }

    let expr = p.parse_expr()?;
    p.expect_end()?;
    Ok(Stmt::Expr { expr, line })
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        match self.next() {
            Some(t) if t == expected => Ok(()),
            other => Err(ParseError::new(format!(
                "expected {expected:?}, got {other:?}"
            ))),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(ParseError::new(format!("trailing token {t:?}"))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or()?;
        if self.peek() == Some(&Token::Question) {
            self.advance();
            let then_branch = self.parse_ternary()?;
            self.expect(&Token::Colon)?;
            let else_branch = self.parse_ternary()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            Some(Token::Not) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let Expr::Ident(name) = expr else {
                        return Err(ParseError::new("only identifiers are callable"));
                    };
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call { name, args };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            // Keyword argument: ident '=' expr.
            let name = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Ident(n)), Some(Token::Assign)) => {
                    let n = n.clone();
                    self.advance();
                    self.advance();
                    Some(n)
                }
                _ => None,
            };
            let value = self.parse_expr()?;
            args.push(Arg { name, value });
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => return Err(ParseError::new(format!("expected ',' or ')', got {other:?}"))),
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Num(*v)),
            Some(Token::Str(s)) => Ok(Expr::Str(s.clone())),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Na) => Ok(Expr::Na),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name.clone())),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            other => Err(ParseError::new(format!("unexpected token {other:?}"))),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ---------- normalization -----------------------------------------------------

/// Expand the short TA call forms to their canonical argument lists.
/// Running this on its own output changes nothing: every expansion checks
/// the argument count it produces.
pub fn normalize(script: &mut Script) {
    for stmt in &mut script.stmts {
        match stmt {
            Stmt::Let { value, .. } => normalize_expr(value),
            Stmt::Destructure { call, .. } => normalize_expr(call),
            Stmt::Expr { expr, .. } => normalize_expr(expr),
            Stmt::Title(_) | Stmt::Comment(_) | Stmt::Unsupported { .. } => {}
        }
    }
}

fn normalize_expr(expr: &mut Expr) {
    match expr {
        Expr::Call { name, args } => {
            for arg in args.iter_mut() {
                normalize_expr(&mut arg.value);
            }
            match (name.as_str(), args.len()) {
                ("ta.atr", 1) | ("ta.adx", 1) => {
                    if let Some(len) = args.pop() {
                        args.push(Arg::positional(Expr::Ident("high".into())));
                        args.push(Arg::positional(Expr::Ident("low".into())));
                        args.push(Arg::positional(Expr::Ident("close".into())));
                        args.push(len);
                    }
                }
                ("ta.vwap", 1) => {
                    args.push(Arg::positional(Expr::Ident("high".into())));
                    args.push(Arg::positional(Expr::Ident("low".into())));
                    args.push(Arg::positional(Expr::Ident("volume".into())));
                }
                ("ta.change", 1) => {
                    args.push(Arg::positional(Expr::Num(1.0)));
                }
                ("ta.rsi", 1) => {
                    args.push(Arg::positional(Expr::Num(14.0)));
                }
                ("ta.obv", 0) => {
                    args.push(Arg::positional(Expr::Ident("close".into())));
                    args.push(Arg::positional(Expr::Ident("volume".into())));
                }
                _ => {}
            }
        }
        Expr::Unary { expr, .. } => normalize_expr(expr),
        Expr::Binary { lhs, rhs, .. } => {
            normalize_expr(lhs);
            normalize_expr(rhs);
        }
        Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => {
            normalize_expr(cond);
            normalize_expr(then_branch);
            normalize_expr(else_branch);
        }
        Expr::Index { target, index } => {
            normalize_expr(target);
            normalize_expr(index);
        }
        Expr::Num(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Na | Expr::Ident(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_title_inputs_and_plots() {
        let script = translate(
            "//@version=6\nindicator(\"EMA Demo\", overlay=true)\nlen = input.int(20, \"Length\")\nema1 = ta.ema(close, len)\nplot(ema1, \"ema\")\n",
        );
        assert_eq!(script.version, 6);
        assert_eq!(script.title.as_deref(), Some("EMA Demo"));
        assert_eq!(script.stmts.len(), 4);
        assert!(matches!(script.stmts[1], Stmt::Let { .. }));
        assert!(matches!(script.stmts[3], Stmt::Expr { .. }));
    }

    #[test]
    fn version_defaults_to_six() {
        assert_eq!(script_version("plot(close)"), 6);
        assert_eq!(script_version("//@version=5\nplot(close)"), 5);
    }

    #[test]
    fn destructuring_is_recognized() {
        let script = translate("[u, m, l] = ta.bb(close, 20, 2.0)");
        match &script.stmts[0] {
            Stmt::Destructure { names, call, .. } => {
                assert_eq!(names, &["u", "m", "l"]);
                assert!(matches!(call, Expr::Call { name, .. } if name == "ta.bb"));
            }
            other => panic!("expected destructure, got {other:?}"),
        }
    }

    #[test]
    fn short_atr_form_expands() {
        let script = translate("a = ta.atr(14)");
        let Stmt::Let { value, .. } = &script.stmts[0] else {
            panic!("expected let");
        };
        let Expr::Call { name, args } = value else {
            panic!("expected call");
        };
        assert_eq!(name, "ta.atr");
        assert_eq!(args.len(), 4);
        assert_eq!(args[0].value, Expr::Ident("high".into()));
        assert_eq!(args[3].value, Expr::Num(14.0));
    }

    #[test]
    fn short_rsi_form_defaults_length_to_14() {
        let script = translate("r = ta.rsi(close)");
        let Stmt::Let { value, .. } = &script.stmts[0] else {
            panic!("expected let");
        };
        let Expr::Call { name, args } = value else {
            panic!("expected call");
        };
        assert_eq!(name, "ta.rsi");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].value, Expr::Num(14.0));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut script = translate(
            "//@version=6\na = ta.atr(14)\nv = ta.vwap(close)\nc = ta.change(close)\nr = ta.rsi(close)\nplot(a)\n",
        );
        let once = script.clone();
        normalize(&mut script);
        assert_eq!(script, once);
    }

    #[test]
    fn comments_survive_as_annotations() {
        let script = translate("// explanatory note\nplot(close)");
        assert!(matches!(&script.stmts[0], Stmt::Comment(c) if c == "explanatory note"));
    }

    #[test]
    fn unknown_constructs_become_unsupported() {
        let script = translate("for i = 0 to 10\n    x := x + 1");
        assert!(script
            .stmts
            .iter()
            .any(|s| matches!(s, Stmt::Unsupported { .. })));
    }

    #[test]
    fn keyword_args_parse() {
        let script = translate("plot(close, title=\"Close\", linewidth=2)");
        let Stmt::Expr { expr, .. } = &script.stmts[0] else {
            panic!("expected expr stmt");
        };
        let Expr::Call { args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(args[1].name.as_deref(), Some("title"));
        assert_eq!(args[2].name.as_deref(), Some("linewidth"));
    }

    #[test]
    fn ternary_and_history_index_parse() {
        let script = translate("x = close > open ? close : na\ny = close[1]");
        assert!(matches!(&script.stmts[0], Stmt::Let { value: Expr::Ternary { .. }, .. }));
        assert!(matches!(&script.stmts[1], Stmt::Let { value: Expr::Index { .. }, .. }));
    }
}
