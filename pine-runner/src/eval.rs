//! Execution host: walks the translated script against a bar series.
//!
//! Evaluation is vectorized. Every expression reduces to a scalar or a
//! whole-series value of the invocation's bar count; scalars broadcast
//! when combined with series. Sink calls (`plot`, `hline`, `bgcolor`)
//! append to the result list in call order.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use series_core::BarSeries;

use crate::ast::{Arg, BinaryOp, Expr, Script, Stmt, UnaryOp};
use crate::color;
use crate::result::{PlotKind, PlotResult, PlotStyle};
use crate::value::Value;

/// Seed for `math.random`, fixed so runs are reproducible.
const RNG_SEED: u64 = 0x5F37_59DF;

/// Division guard: denominators closer to zero than this yield `na`.
const DIV_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct EvalError {
    pub line: usize,
    pub message: String,
}

impl EvalError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Run a translated script against a bar series and collect its plots.
pub fn execute(script: &Script, series: &BarSeries) -> Result<Vec<PlotResult>, EvalError> {
    let mut host = Host::new(series);
    for stmt in &script.stmts {
        host.exec_stmt(stmt)?;
    }
    Ok(host.results)
}

struct Host<'a> {
    series: &'a BarSeries,
    n: usize,
    env: HashMap<String, Value>,
    arrays: Vec<Vec<Value>>,
    results: Vec<PlotResult>,
    rng: StdRng,
    plot_counter: usize,
}

impl<'a> Host<'a> {
    fn new(series: &'a BarSeries) -> Self {
        Self {
            series,
            n: series.len(),
            env: HashMap::new(),
            arrays: Vec::new(),
            results: Vec::new(),
            rng: StdRng::seed_from_u64(RNG_SEED),
            plot_counter: 0,
        }
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), EvalError> {
        match stmt {
            Stmt::Title(_) | Stmt::Comment(_) => Ok(()),
            Stmt::Let {
                name, value, line, ..
            } => {
                // `var`/`varip` initialize once; a single whole-series pass
                // makes that identical to a plain binding here.
                let v = self.eval(value, *line)?;
                self.env.insert(name.clone(), v);
                Ok(())
            }
            Stmt::Destructure { names, call, line } => self.exec_destructure(names, call, *line),
            Stmt::Expr { expr, line } => {
                self.eval(expr, *line)?;
                Ok(())
            }
            Stmt::Unsupported { line, text } => Err(EvalError::new(
                *line,
                format!("unsupported syntax: {text}"),
            )),
        }
    }

    fn exec_destructure(
        &mut self,
        names: &[String],
        call: &Expr,
        line: usize,
    ) -> Result<(), EvalError> {
        let Expr::Call { name, args } = call else {
            return Err(EvalError::new(
                line,
                "destructuring requires a function call on the right-hand side",
            ));
        };
        if names.len() != 3 {
            return Err(EvalError::new(
                line,
                format!("expected 3 names to destructure, got {}", names.len()),
            ));
        }
        let parts: [Vec<f64>; 3] = match name.as_str() {
            "ta.bb" => {
                let src = self.arg_series(args, 0, line)?;
                let len = self.arg_len(args, 1, line)?;
                let mult = self.arg_num(args, 2, line)?;
                let out = ta_core::bb(&src, len, mult);
                [out.upper, out.middle, out.lower]
            }
            "ta.macd" => {
                let src = self.arg_series(args, 0, line)?;
                let fast = self.arg_len(args, 1, line)?;
                let slow = self.arg_len(args, 2, line)?;
                let sig = self.arg_len(args, 3, line)?;
                let out = ta_core::macd(&src, fast, slow, sig);
                [out.macd, out.signal, out.hist]
            }
            other => {
                return Err(EvalError::new(
                    line,
                    format!("'{other}' does not support destructuring"),
                ))
            }
        };
        for (name, part) in names.iter().zip(parts) {
            self.env.insert(name.clone(), Value::Series(part));
        }
        Ok(())
    }

    // ---------- expression evaluation ----------------------------------------

    fn eval(&mut self, expr: &Expr, line: usize) -> Result<Value, EvalError> {
        match expr {
            Expr::Num(v) => Ok(Value::Num(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Na => Ok(Value::Na),
            Expr::Ident(name) => self.resolve_ident(name, line),
            Expr::Call { name, args } => self.eval_call(name, args, line),
            Expr::Unary { op, expr } => {
                let v = self.eval(expr, line)?;
                self.unary(*op, v, line)
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs, line)?;
                let b = self.eval(rhs, line)?;
                self.binary(*op, a, b, line)
            }
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => self.ternary(cond, then_branch, else_branch, line),
            Expr::Index { target, index } => {
                let target = self.eval(target, line)?;
                let k = self.eval(index, line)?;
                self.history_shift(target, k, line)
            }
        }
    }

    fn resolve_ident(&mut self, name: &str, line: usize) -> Result<Value, EvalError> {
        if let Some(v) = self.env.get(name) {
            return Ok(v.clone());
        }
        if let Some(slice) = self.builtin_series(name) {
            return Ok(Value::Series(slice.to_vec()));
        }
        if let Some(rest) = name.strip_prefix("color.") {
            if let Some(hex) = color::palette(rest) {
                return Ok(Value::Color(hex.to_string()));
            }
        }
        if let Some(style) = name.strip_prefix("plot.style_") {
            return Ok(Value::Str(style.to_string()));
        }
        if let Some(style) = name.strip_prefix("hline.style_") {
            return Ok(Value::Str(style.to_string()));
        }
        match name {
            "math.pi" => return Ok(Value::Num(std::f64::consts::PI)),
            "math.e" => return Ok(Value::Num(std::f64::consts::E)),
            _ => {}
        }
        Err(EvalError::new(line, format!("undefined variable '{name}'")))
    }

    fn builtin_series(&self, name: &str) -> Option<&[f64]> {
        let slice = match name {
            "open" => self.series.open(),
            "high" => self.series.high(),
            "low" => self.series.low(),
            "close" => self.series.close(),
            "volume" => self.series.volume(),
            "time" => self.series.time(),
            "bar_index" => self.series.bar_index(),
            "hl2" => self.series.hl2(),
            "hlc3" => self.series.hlc3(),
            "ohlc4" => self.series.ohlc4(),
            "bid" => self.series.bid(),
            "ask" => self.series.ask(),
            _ => return None,
        };
        Some(slice)
    }

    fn unary(&self, op: UnaryOp, v: Value, line: usize) -> Result<Value, EvalError> {
        match op {
            UnaryOp::Neg => match v {
                Value::Num(x) => Ok(Value::Num(-x)),
                Value::Series(xs) => Ok(Value::Series(xs.into_iter().map(|x| -x).collect())),
                Value::Na => Ok(Value::Na),
                other => Err(EvalError::new(
                    line,
                    format!("cannot negate {}", other.type_name()),
                )),
            },
            UnaryOp::Not => match v {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                Value::BoolSeries(bs) => {
                    Ok(Value::BoolSeries(bs.into_iter().map(|b| !b).collect()))
                }
                other => Err(EvalError::new(
                    line,
                    format!("'not' expects a condition, got {}", other.type_name()),
                )),
            },
        }
    }

    fn binary(&self, op: BinaryOp, a: Value, b: Value, line: usize) -> Result<Value, EvalError> {
        use BinaryOp::*;
        match op {
            Add | Sub | Mul | Div | Mod => self.arith(op, a, b, line),
            Gt | Lt | Ge | Le | Eq | Ne => self.compare(op, a, b, line),
            And | Or => self.logic(op, a, b, line),
        }
    }

    fn arith(&self, op: BinaryOp, a: Value, b: Value, line: usize) -> Result<Value, EvalError> {
        // String concatenation rides on '+'.
        if op == BinaryOp::Add {
            if let (Value::Str(x), Value::Str(y)) = (&a, &b) {
                return Ok(Value::Str(format!("{x}{y}")));
            }
        }
        if let (Value::Num(x), Value::Num(y)) = (&a, &b) {
            return Ok(Value::Num(arith_scalar(op, *x, *y)));
        }
        let xs = self.to_series(a, line)?;
        let ys = self.to_series(b, line)?;
        let out = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| arith_scalar(op, x, y))
            .collect();
        Ok(Value::Series(out))
    }

    fn compare(&self, op: BinaryOp, a: Value, b: Value, line: usize) -> Result<Value, EvalError> {
        if let (Value::Num(x), Value::Num(y)) = (&a, &b) {
            return Ok(Value::Bool(compare_scalar(op, *x, *y)));
        }
        let xs = self.to_series(a, line)?;
        let ys = self.to_series(b, line)?;
        let out = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| compare_scalar(op, x, y))
            .collect();
        Ok(Value::BoolSeries(out))
    }

    fn logic(&self, op: BinaryOp, a: Value, b: Value, line: usize) -> Result<Value, EvalError> {
        if let (Value::Bool(x), Value::Bool(y)) = (&a, &b) {
            return Ok(Value::Bool(if op == BinaryOp::And {
                *x && *y
            } else {
                *x || *y
            }));
        }
        let xs = self.to_bool_series(a, line)?;
        let ys = self.to_bool_series(b, line)?;
        let out = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| if op == BinaryOp::And { x && y } else { x || y })
            .collect();
        Ok(Value::BoolSeries(out))
    }

    fn ternary(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        line: usize,
    ) -> Result<Value, EvalError> {
        match self.eval(cond, line)? {
            Value::Bool(true) => self.eval(then_branch, line),
            Value::Bool(false) => self.eval(else_branch, line),
            Value::BoolSeries(mask) => {
                let t = self.eval(then_branch, line)?;
                let e = self.eval(else_branch, line)?;
                let ts = self.to_series(t, line)?;
                let es = self.to_series(e, line)?;
                let out = mask
                    .iter()
                    .zip(ts.iter().zip(es.iter()))
                    .map(|(&m, (&t, &e))| if m { t } else { e })
                    .collect();
                Ok(Value::Series(out))
            }
            other => Err(EvalError::new(
                line,
                format!("condition must be a bool, got {}", other.type_name()),
            )),
        }
    }

    fn history_shift(&self, target: Value, k: Value, line: usize) -> Result<Value, EvalError> {
        let xs = self.to_series(target, line)?;
        let k = match k {
            Value::Num(v) if v >= 0.0 && v.fract() == 0.0 => v as usize,
            other => {
                return Err(EvalError::new(
                    line,
                    format!(
                        "history offset must be a non-negative integer, got {}",
                        other.type_name()
                    ),
                ))
            }
        };
        let mut out = vec![f64::NAN; xs.len()];
        for i in k..xs.len() {
            out[i] = xs[i - k];
        }
        Ok(Value::Series(out))
    }

    // ---------- call dispatch ------------------------------------------------

    fn eval_call(&mut self, name: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        match name {
            "plot" => return self.sink_plot(args, line),
            "hline" => return self.sink_hline(args, line),
            "bgcolor" => return self.sink_bgcolor(args, line),
            "fill" => {
                for arg in args {
                    self.eval(&arg.value, line)?;
                }
                log::debug!("fill() accepted but not rendered (line {line})");
                return Ok(Value::Unit);
            }
            "alertcondition" | "barcolor" => {
                for arg in args {
                    self.eval(&arg.value, line)?;
                }
                log::debug!("{name}() accepted but not rendered (line {line})");
                return Ok(Value::Unit);
            }
            // Bare tracing helpers: no-ops unless debug mode is on.
            "debug" | "log" => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    let v = self.eval(&arg.value, line)?;
                    rendered.push(self.display(&v));
                }
                if crate::metrics::debug_enabled() {
                    log::debug!("script {name}({}) at line {line}", rendered.join(", "));
                }
                return Ok(Value::Unit);
            }
            "runtime.error" => {
                let msg = match args.first().map(|a| self.eval(&a.value, line)) {
                    Some(Ok(Value::Str(s))) => s,
                    _ => "runtime.error".to_string(),
                };
                return Err(EvalError::new(line, msg));
            }
            "nz" => {
                let v = self.arg_series(args, 0, line)?;
                let repl = if args.len() > 1 {
                    self.arg_num(args, 1, line)?
                } else {
                    0.0
                };
                let out = v
                    .into_iter()
                    .map(|x| if x.is_nan() { repl } else { x })
                    .collect();
                return Ok(Value::Series(out));
            }
            "na" => {
                return match self.arg_value(args, 0, line)? {
                    Value::Series(xs) => Ok(Value::BoolSeries(
                        xs.into_iter().map(|x| x.is_nan()).collect(),
                    )),
                    v => Ok(Value::Bool(v.is_na())),
                };
            }
            _ => {}
        }

        if name == "input" || name.starts_with("input.") {
            // Inputs collapse to their default value.
            return self.arg_value(args, 0, line);
        }
        if let Some(rest) = name.strip_prefix("ta.") {
            return self.eval_ta(rest, args, line);
        }
        if let Some(rest) = name.strip_prefix("math.") {
            return self.eval_math(rest, args, line);
        }
        if let Some(rest) = name.strip_prefix("array.") {
            return self.eval_array(rest, args, line);
        }
        if let Some(rest) = name.strip_prefix("str.") {
            return self.eval_str(rest, args, line);
        }
        if let Some(rest) = name.strip_prefix("color.") {
            return self.eval_color(rest, args, line);
        }
        if let Some(rest) = name.strip_prefix("log.") {
            let msg = self
                .arg_value(args, 0, line)
                .map(|v| self.display(&v))
                .unwrap_or_default();
            match rest {
                "warning" => log::warn!("script: {msg}"),
                "error" => log::error!("script: {msg}"),
                _ => log::info!("script: {msg}"),
            }
            return Ok(Value::Unit);
        }

        Err(EvalError::new(line, format!("unknown function '{name}'")))
    }

    fn eval_ta(&mut self, func: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        let out = match func {
            "sma" | "ema" | "wma" | "rma" | "stdev" | "rsi" | "highest" | "lowest" | "change"
            | "mom" | "roc" => {
                let src = self.arg_series(args, 0, line)?;
                let len = self.arg_len(args, 1, line)?;
                match func {
                    "sma" => ta_core::sma(&src, len),
                    "ema" => ta_core::ema(&src, len),
                    "wma" => ta_core::wma(&src, len),
                    "rma" => ta_core::rma(&src, len),
                    "stdev" => ta_core::stdev(&src, len),
                    "rsi" => ta_core::rsi(&src, len),
                    "highest" => ta_core::highest(&src, len),
                    "lowest" => ta_core::lowest(&src, len),
                    "change" | "mom" => ta_core::change(&src, len),
                    _ => ta_core::roc(&src, len),
                }
            }
            "cci" => {
                let src = self.arg_series(args, 0, line)?;
                let len = self.arg_len(args, 1, line)?;
                ta_core::cci(&src, len)
            }
            "tr" => ta_core::tr(self.series.high(), self.series.low(), self.series.close()),
            "atr" | "adx" => {
                let high = self.arg_series(args, 0, line)?;
                let low = self.arg_series(args, 1, line)?;
                let close = self.arg_series(args, 2, line)?;
                let len = self.arg_len(args, 3, line)?;
                if func == "atr" {
                    ta_core::atr(&high, &low, &close, len)
                } else {
                    ta_core::adx(&high, &low, &close, len)
                }
            }
            "stoch" => {
                let src = self.arg_series(args, 0, line)?;
                let high = self.arg_series(args, 1, line)?;
                let low = self.arg_series(args, 2, line)?;
                let len = self.arg_len(args, 3, line)?;
                ta_core::stoch(&src, &high, &low, len)
            }
            "vwap" => {
                let src = self.arg_series(args, 0, line)?;
                let high = self.arg_series(args, 1, line)?;
                let low = self.arg_series(args, 2, line)?;
                let volume = self.arg_series(args, 3, line)?;
                ta_core::vwap(&src, &high, &low, &volume)
            }
            "wpr" => {
                let len = self.arg_len(args, 0, line)?;
                ta_core::wpr(
                    self.series.high(),
                    self.series.low(),
                    self.series.close(),
                    len,
                )
            }
            "obv" => {
                let close = self.arg_series(args, 0, line)?;
                let volume = self.arg_series(args, 1, line)?;
                ta_core::obv(&close, &volume)
            }
            "macd" => {
                let src = self.arg_series(args, 0, line)?;
                let fast = self.arg_len(args, 1, line)?;
                let slow = self.arg_len(args, 2, line)?;
                let sig = self.arg_len(args, 3, line)?;
                ta_core::macd(&src, fast, slow, sig).macd
            }
            "bb" => {
                let src = self.arg_series(args, 0, line)?;
                let len = self.arg_len(args, 1, line)?;
                let mult = self.arg_num(args, 2, line)?;
                ta_core::bb(&src, len, mult).middle
            }
            "crossover" | "crossunder" | "cross" => {
                let a = self.arg_series(args, 0, line)?;
                let b = self.arg_series(args, 1, line)?;
                let out = match func {
                    "crossover" => ta_core::crossover(&a, &b),
                    "crossunder" => ta_core::crossunder(&a, &b),
                    _ => {
                        let over = ta_core::crossover(&a, &b);
                        let under = ta_core::crossunder(&a, &b);
                        over.iter().zip(under.iter()).map(|(&o, &u)| o || u).collect()
                    }
                };
                return Ok(Value::BoolSeries(out));
            }
            "pivothigh" | "pivotlow" => {
                // One- or two-source arity: (left, right) defaults the source
                // to high/low respectively.
                let (src, left, right) = if args.len() == 2 {
                    let default = if func == "pivothigh" {
                        self.series.high().to_vec()
                    } else {
                        self.series.low().to_vec()
                    };
                    (
                        default,
                        self.arg_len(args, 0, line)?,
                        self.arg_len(args, 1, line)?,
                    )
                } else {
                    (
                        self.arg_series(args, 0, line)?,
                        self.arg_len(args, 1, line)?,
                        self.arg_len(args, 2, line)?,
                    )
                };
                if func == "pivothigh" {
                    ta_core::pivothigh(&src, left, right)
                } else {
                    ta_core::pivotlow(&src, left, right)
                }
            }
            other => {
                return Err(EvalError::new(
                    line,
                    format!("unknown function 'ta.{other}'"),
                ))
            }
        };
        Ok(Value::Series(out))
    }

    fn eval_math(&mut self, func: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        match func {
            "abs" | "sqrt" | "log" | "log10" | "exp" | "sin" | "cos" | "tan" | "asin"
            | "acos" | "atan" | "toradians" | "todegrees" | "floor" | "ceil" | "round"
            | "sign" => {
                let f = |x: f64| -> f64 {
                    match func {
                        "abs" => x.abs(),
                        "sqrt" => x.sqrt(),
                        "log" => x.ln(),
                        "log10" => x.log10(),
                        "exp" => x.exp(),
                        "sin" => x.sin(),
                        "cos" => x.cos(),
                        "tan" => x.tan(),
                        "asin" => x.asin(),
                        "acos" => x.acos(),
                        "atan" => x.atan(),
                        "toradians" => x.to_radians(),
                        "todegrees" => x.to_degrees(),
                        "floor" => x.floor(),
                        "ceil" => x.ceil(),
                        "round" => x.round(),
                        _ => {
                            if x.is_nan() {
                                f64::NAN
                            } else if x > 0.0 {
                                1.0
                            } else if x < 0.0 {
                                -1.0
                            } else {
                                0.0
                            }
                        }
                    }
                };
                match self.arg_value(args, 0, line)? {
                    Value::Num(x) => Ok(Value::Num(f(x))),
                    v => {
                        let xs = self.to_series(v, line)?;
                        Ok(Value::Series(xs.into_iter().map(f).collect()))
                    }
                }
            }
            "max" | "min" | "pow" => {
                let a = self.arg_value(args, 0, line)?;
                let b = self.arg_value(args, 1, line)?;
                let f = |x: f64, y: f64| -> f64 {
                    match func {
                        "max" => x.max(y),
                        "min" => x.min(y),
                        _ => x.powf(y),
                    }
                };
                if let (Value::Num(x), Value::Num(y)) = (&a, &b) {
                    return Ok(Value::Num(f(*x, *y)));
                }
                let xs = self.to_series(a, line)?;
                let ys = self.to_series(b, line)?;
                Ok(Value::Series(
                    xs.iter().zip(ys.iter()).map(|(&x, &y)| f(x, y)).collect(),
                ))
            }
            "avg" => {
                let mut acc: Option<Value> = None;
                for (i, _) in args.iter().enumerate() {
                    let v = self.arg_value(args, i, line)?;
                    acc = Some(match acc {
                        None => v,
                        Some(prev) => self.arith(BinaryOp::Add, prev, v, line)?,
                    });
                }
                let total = acc.ok_or_else(|| {
                    EvalError::new(line, "math.avg expects at least one argument")
                })?;
                self.arith(
                    BinaryOp::Div,
                    total,
                    Value::Num(args.len() as f64),
                    line,
                )
            }
            "sum" => {
                // Rolling sum over a window.
                let src = self.arg_series(args, 0, line)?;
                let len = self.arg_len(args, 1, line)?;
                let mean = ta_core::sma(&src, len);
                Ok(Value::Series(
                    mean.into_iter().map(|m| m * len as f64).collect(),
                ))
            }
            "random" => {
                let lo = if !args.is_empty() {
                    self.arg_num(args, 0, line)?
                } else {
                    0.0
                };
                let hi = if args.len() > 1 {
                    self.arg_num(args, 1, line)?
                } else {
                    1.0
                };
                if hi <= lo {
                    return Err(EvalError::new(line, "math.random range is empty"));
                }
                Ok(Value::Num(self.rng.gen_range(lo..hi)))
            }
            other => Err(EvalError::new(
                line,
                format!("unknown function 'math.{other}'"),
            )),
        }
    }

    fn eval_array(&mut self, func: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        match func {
            "new_float" | "new_int" | "new_bool" | "new_string" => {
                let size = if !args.is_empty() {
                    self.arg_num(args, 0, line)? as usize
                } else {
                    0
                };
                let initial = if args.len() > 1 {
                    self.arg_value(args, 1, line)?
                } else {
                    Value::Na
                };
                let handle = self.arrays.len();
                self.arrays.push(vec![initial; size]);
                Ok(Value::Array(handle))
            }
            "from" => {
                let mut items = Vec::with_capacity(args.len());
                for (i, _) in args.iter().enumerate() {
                    items.push(self.arg_value(args, i, line)?);
                }
                let handle = self.arrays.len();
                self.arrays.push(items);
                Ok(Value::Array(handle))
            }
            "push" => {
                let handle = self.arg_array(args, 0, line)?;
                let v = self.arg_value(args, 1, line)?;
                self.arrays[handle].push(v);
                Ok(Value::Unit)
            }
            "pop" => {
                let handle = self.arg_array(args, 0, line)?;
                self.arrays[handle]
                    .pop()
                    .ok_or_else(|| EvalError::new(line, "array.pop on an empty array"))
            }
            "set" => {
                let handle = self.arg_array(args, 0, line)?;
                let idx = self.array_index(handle, args, 1, line)?;
                let v = self.arg_value(args, 2, line)?;
                self.arrays[handle][idx] = v;
                Ok(Value::Unit)
            }
            "get" => {
                let handle = self.arg_array(args, 0, line)?;
                let idx = self.array_index(handle, args, 1, line)?;
                Ok(self.arrays[handle][idx].clone())
            }
            "size" => {
                let handle = self.arg_array(args, 0, line)?;
                Ok(Value::Num(self.arrays[handle].len() as f64))
            }
            "sum" | "avg" | "max" | "min" | "stdev" => {
                let handle = self.arg_array(args, 0, line)?;
                let nums: Vec<f64> = self.arrays[handle]
                    .iter()
                    .filter_map(|v| match v {
                        Value::Num(x) if !x.is_nan() => Some(*x),
                        _ => None,
                    })
                    .collect();
                if nums.is_empty() {
                    return Ok(Value::Na);
                }
                let mean = nums.iter().sum::<f64>() / nums.len() as f64;
                let out = match func {
                    "sum" => nums.iter().sum(),
                    "avg" => mean,
                    "max" => nums.iter().copied().fold(f64::MIN, f64::max),
                    "min" => nums.iter().copied().fold(f64::MAX, f64::min),
                    _ => {
                        // Population standard deviation, as ta.stdev uses.
                        let var = nums.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                            / nums.len() as f64;
                        var.sqrt()
                    }
                };
                Ok(Value::Num(out))
            }
            other => Err(EvalError::new(
                line,
                format!("unknown function 'array.{other}'"),
            )),
        }
    }

    fn array_index(
        &mut self,
        handle: usize,
        args: &[Arg],
        pos: usize,
        line: usize,
    ) -> Result<usize, EvalError> {
        let raw = self.arg_num(args, pos, line)? as i64;
        let len = self.arrays[handle].len() as i64;
        // Negative indices address from the end.
        let idx = if raw < 0 { len + raw } else { raw };
        if idx < 0 || idx >= len {
            return Err(EvalError::new(
                line,
                format!("array index {raw} out of bounds (size {len})"),
            ));
        }
        Ok(idx as usize)
    }

    fn eval_str(&mut self, func: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        match func {
            "tostring" => {
                let v = self.arg_value(args, 0, line)?;
                Ok(Value::Str(self.display(&v)))
            }
            "format" => {
                let Value::Str(fmt) = self.arg_value(args, 0, line)? else {
                    return Err(EvalError::new(line, "str.format expects a format string"));
                };
                let mut out = fmt;
                for (i, _) in args.iter().enumerate().skip(1) {
                    let v = self.arg_value(args, i, line)?;
                    out = out.replace(&format!("{{{}}}", i - 1), &self.display(&v));
                }
                Ok(Value::Str(out))
            }
            "tonumber" => {
                let Value::Str(s) = self.arg_value(args, 0, line)? else {
                    return Err(EvalError::new(line, "str.tonumber expects a string"));
                };
                match s.trim().parse::<f64>() {
                    Ok(v) => Ok(Value::Num(v)),
                    Err(_) => Ok(Value::Na),
                }
            }
            "trim" => {
                let Value::Str(s) = self.arg_value(args, 0, line)? else {
                    return Err(EvalError::new(line, "str.trim expects a string"));
                };
                Ok(Value::Str(s.trim().to_string()))
            }
            "length" => {
                let Value::Str(s) = self.arg_value(args, 0, line)? else {
                    return Err(EvalError::new(line, "str.length expects a string"));
                };
                Ok(Value::Num(s.chars().count() as f64))
            }
            "upper" | "lower" => {
                let Value::Str(s) = self.arg_value(args, 0, line)? else {
                    return Err(EvalError::new(line, format!("str.{func} expects a string")));
                };
                Ok(Value::Str(if func == "upper" {
                    s.to_uppercase()
                } else {
                    s.to_lowercase()
                }))
            }
            "contains" => {
                let (Value::Str(s), Value::Str(sub)) = (
                    self.arg_value(args, 0, line)?,
                    self.arg_value(args, 1, line)?,
                ) else {
                    return Err(EvalError::new(line, "str.contains expects two strings"));
                };
                Ok(Value::Bool(s.contains(&sub)))
            }
            "split" => {
                let (Value::Str(s), Value::Str(sep)) = (
                    self.arg_value(args, 0, line)?,
                    self.arg_value(args, 1, line)?,
                ) else {
                    return Err(EvalError::new(line, "str.split expects two strings"));
                };
                let parts: Vec<Value> = s
                    .split(sep.as_str())
                    .map(|p| Value::Str(p.to_string()))
                    .collect();
                let handle = self.arrays.len();
                self.arrays.push(parts);
                Ok(Value::Array(handle))
            }
            other => Err(EvalError::new(
                line,
                format!("unknown function 'str.{other}'"),
            )),
        }
    }

    fn eval_color(&mut self, func: &str, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        match func {
            "new" => {
                let base = match self.arg_value(args, 0, line)? {
                    Value::Color(c) => c,
                    Value::Str(s) => s,
                    other => {
                        return Err(EvalError::new(
                            line,
                            format!("color.new expects a color, got {}", other.type_name()),
                        ))
                    }
                };
                let transp = if args.len() > 1 {
                    self.arg_num(args, 1, line)?
                } else {
                    0.0
                };
                Ok(Value::Color(color::with_transparency(&base, transp)))
            }
            "rgb" => {
                let r = self.arg_num(args, 0, line)?;
                let g = self.arg_num(args, 1, line)?;
                let b = self.arg_num(args, 2, line)?;
                let base = color::rgb(r, g, b);
                if args.len() > 3 {
                    let transp = self.arg_num(args, 3, line)?;
                    Ok(Value::Color(color::with_transparency(&base, transp)))
                } else {
                    Ok(Value::Color(base))
                }
            }
            other => Err(EvalError::new(
                line,
                format!("unknown function 'color.{other}'"),
            )),
        }
    }

    // ---------- sinks --------------------------------------------------------

    fn sink_plot(&mut self, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        if args.is_empty() {
            return Err(EvalError::new(line, "plot expects a series argument"));
        }
        self.plot_counter += 1;
        let values = {
            let v = self.eval(&args[0].value, line)?;
            self.to_series(v, line)?
        };

        let mut name = format!("Plot {}", self.plot_counter);
        let mut color_str: Option<String> = None;
        let mut line_width: Option<u32> = None;
        let mut style: Option<PlotStyle> = None;

        for (i, arg) in args.iter().enumerate().skip(1) {
            let key = arg.name.as_deref().unwrap_or(match i {
                1 => "title",
                2 => "color",
                3 => "linewidth",
                4 => "style",
                _ => "",
            });
            let v = self.eval(&arg.value, line)?;
            match key {
                "title" => {
                    if let Value::Str(s) = v {
                        name = s;
                    }
                }
                "color" => color_str = self.color_of(v),
                "linewidth" => {
                    if let Value::Num(w) = v {
                        line_width = Some(w.max(1.0).round() as u32);
                    }
                }
                "style" => {
                    if let Value::Str(s) = v {
                        style = PlotStyle::from_name(&s);
                    }
                }
                _ => {}
            }
        }

        self.results.push(PlotResult {
            name,
            values,
            kind: PlotKind::Line,
            color: Some(color_str.unwrap_or_else(|| color::DEFAULT_PLOT_COLOR.to_string())),
            line_width,
            hline_value: None,
            plot_type: style,
        });
        Ok(Value::Unit)
    }

    fn sink_hline(&mut self, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        let price = self.arg_num(args, 0, line)?;
        let mut name = format!("Level {}", format_num(price));
        let mut color_str: Option<String> = None;
        let mut line_width: Option<u32> = None;

        for (i, arg) in args.iter().enumerate().skip(1) {
            let key = arg.name.as_deref().unwrap_or(match i {
                1 => "title",
                2 => "color",
                3 => "linewidth",
                _ => "",
            });
            let v = self.eval(&arg.value, line)?;
            match key {
                "title" => {
                    if let Value::Str(s) = v {
                        name = s;
                    }
                }
                "color" => color_str = self.color_of(v),
                "linewidth" => {
                    if let Value::Num(w) = v {
                        line_width = Some(w.max(1.0).round() as u32);
                    }
                }
                _ => {}
            }
        }

        self.results.push(PlotResult {
            name,
            values: vec![price; self.n],
            kind: PlotKind::Hline,
            color: Some(color_str.unwrap_or_else(|| color::DEFAULT_HLINE_COLOR.to_string())),
            line_width,
            hline_value: Some(price),
            plot_type: None,
        });
        Ok(Value::Unit)
    }

    fn sink_bgcolor(&mut self, args: &[Arg], line: usize) -> Result<Value, EvalError> {
        if args.is_empty() {
            return Err(EvalError::new(line, "bgcolor expects a color argument"));
        }
        // Conditional form: `bgcolor(cond ? color : na)`. The mask keeps the
        // bars where the color applies; the rest are na.
        if let Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } = &args[0].value
        {
            if let Value::BoolSeries(mask) = self.eval(cond, line)? {
                let then_v = self.eval(then_branch, line)?;
                let else_v = self.eval(else_branch, line)?;
                let (color_v, invert) = match (&then_v, &else_v) {
                    (Value::Color(_), _) | (Value::Str(_), _) => (then_v, false),
                    (_, Value::Color(_)) | (_, Value::Str(_)) => (else_v, true),
                    _ => {
                        return Err(EvalError::new(
                            line,
                            "bgcolor condition branches must include a color",
                        ))
                    }
                };
                let values = mask
                    .iter()
                    .map(|&m| if m != invert { 1.0 } else { f64::NAN })
                    .collect();
                self.push_bgcolor(values, self.color_of(color_v));
                return Ok(Value::Unit);
            }
        }

        match self.eval(&args[0].value, line)? {
            Value::Na => Ok(Value::Unit),
            v @ (Value::Color(_) | Value::Str(_)) => {
                let color = self.color_of(v);
                self.push_bgcolor(vec![1.0; self.n], color);
                Ok(Value::Unit)
            }
            other => Err(EvalError::new(
                line,
                format!("bgcolor expects a color, got {}", other.type_name()),
            )),
        }
    }

    fn push_bgcolor(&mut self, values: Vec<f64>, color: Option<String>) {
        self.results.push(PlotResult {
            name: "Background".to_string(),
            values,
            kind: PlotKind::Bgcolor,
            color,
            line_width: None,
            hline_value: None,
            plot_type: None,
        });
    }

    // ---------- coercions ----------------------------------------------------

    fn arg_value(&mut self, args: &[Arg], pos: usize, line: usize) -> Result<Value, EvalError> {
        let arg = args.get(pos).ok_or_else(|| {
            EvalError::new(line, format!("missing argument at position {}", pos + 1))
        })?;
        let expr = arg.value.clone();
        self.eval(&expr, line)
    }

    fn arg_series(&mut self, args: &[Arg], pos: usize, line: usize) -> Result<Vec<f64>, EvalError> {
        let v = self.arg_value(args, pos, line)?;
        self.to_series(v, line)
    }

    fn arg_num(&mut self, args: &[Arg], pos: usize, line: usize) -> Result<f64, EvalError> {
        match self.arg_value(args, pos, line)? {
            Value::Num(v) => Ok(v),
            Value::Na => Ok(f64::NAN),
            other => Err(EvalError::new(
                line,
                format!("expected a number, got {}", other.type_name()),
            )),
        }
    }

    fn arg_len(&mut self, args: &[Arg], pos: usize, line: usize) -> Result<usize, EvalError> {
        let v = self.arg_num(args, pos, line)?;
        if !v.is_finite() || v < 1.0 {
            return Err(EvalError::new(
                line,
                format!("length must be a positive integer, got {v}"),
            ));
        }
        Ok(v.round() as usize)
    }

    fn arg_array(&mut self, args: &[Arg], pos: usize, line: usize) -> Result<usize, EvalError> {
        match self.arg_value(args, pos, line)? {
            Value::Array(handle) => Ok(handle),
            other => Err(EvalError::new(
                line,
                format!("expected an array, got {}", other.type_name()),
            )),
        }
    }

    fn to_series(&self, v: Value, line: usize) -> Result<Vec<f64>, EvalError> {
        match v {
            Value::Series(xs) => Ok(xs),
            Value::Num(x) => Ok(vec![x; self.n]),
            Value::Na => Ok(vec![f64::NAN; self.n]),
            Value::Bool(b) => Ok(vec![if b { 1.0 } else { 0.0 }; self.n]),
            Value::BoolSeries(bs) => Ok(bs
                .into_iter()
                .map(|b| if b { 1.0 } else { 0.0 })
                .collect()),
            other => Err(EvalError::new(
                line,
                format!("expected a series, got {}", other.type_name()),
            )),
        }
    }

    fn to_bool_series(&self, v: Value, line: usize) -> Result<Vec<bool>, EvalError> {
        match v {
            Value::BoolSeries(bs) => Ok(bs),
            Value::Bool(b) => Ok(vec![b; self.n]),
            other => Err(EvalError::new(
                line,
                format!("expected a condition, got {}", other.type_name()),
            )),
        }
    }

    fn color_of(&self, v: Value) -> Option<String> {
        match v {
            Value::Color(c) => Some(c),
            Value::Str(s) => {
                if s.starts_with('#') {
                    Some(s)
                } else {
                    color::palette(&s).map(str::to_string)
                }
            }
            _ => None,
        }
    }

    fn display(&self, v: &Value) -> String {
        match v {
            Value::Num(x) => format_num(*x),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.clone(),
            Value::Color(c) => c.clone(),
            Value::Na => "na".to_string(),
            Value::Series(xs) => xs
                .last()
                .map(|x| format_num(*x))
                .unwrap_or_else(|| "na".to_string()),
            Value::BoolSeries(bs) => bs
                .last()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "na".to_string()),
            Value::Array(h) => format!("array#{h}"),
            Value::Unit => String::new(),
        }
    }
}

fn arith_scalar(op: BinaryOp, x: f64, y: f64) -> f64 {
    match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y.abs() < DIV_EPSILON {
                f64::NAN
            } else {
                x / y
            }
        }
        BinaryOp::Mod => {
            if y.abs() < DIV_EPSILON {
                f64::NAN
            } else {
                x % y
            }
        }
        _ => f64::NAN,
    }
}

/// Comparisons involving NaN are false, matching na propagation into
/// conditions.
fn compare_scalar(op: BinaryOp, x: f64, y: f64) -> bool {
    match op {
        BinaryOp::Gt => x > y,
        BinaryOp::Lt => x < y,
        BinaryOp::Ge => x >= y,
        BinaryOp::Le => x <= y,
        BinaryOp::Eq => x == y,
        BinaryOp::Ne => x != y && !x.is_nan() && !y.is_nan(),
        _ => false,
    }
}

/// Render a number the way script text would: integers without a decimal
/// point, NaN as `na`.
fn format_num(v: f64) -> String {
    if v.is_nan() {
        "na".to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::translate;
    use series_core::{generate_mock_ohlc, BarSeries};

    fn series(n: usize) -> BarSeries {
        BarSeries::from_bars(&generate_mock_ohlc(n)).unwrap()
    }

    fn run(src: &str, n: usize) -> Vec<PlotResult> {
        execute(&translate(src), &series(n)).unwrap()
    }

    // Elementwise comparison that treats NaN warmup slots as equal.
    fn assert_series_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "bar {i}: expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-9, "bar {i}: {a} != {e}");
            }
        }
    }

    #[test]
    fn plot_defaults_name_and_color() {
        let results = run("//@version=6\nplot(close)", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Plot 1");
        assert_eq!(results[0].color.as_deref(), Some("#2962FF"));
        assert_eq!(results[0].values.len(), 10);
        assert_eq!(results[0].kind, PlotKind::Line);
    }

    #[test]
    fn plot_honors_title_color_width_style() {
        let results = run(
            "//@version=6\nplot(close, \"C\", color.red, 2, plot.style_histogram)",
            5,
        );
        let r = &results[0];
        assert_eq!(r.name, "C");
        assert_eq!(r.color.as_deref(), Some("#F23645"));
        assert_eq!(r.line_width, Some(2));
        assert_eq!(r.plot_type, Some(PlotStyle::Histogram));
    }

    #[test]
    fn hline_fills_constant_values() {
        let results = run("//@version=6\nhline(70, \"OB\", color.gray)", 4);
        let r = &results[0];
        assert_eq!(r.kind, PlotKind::Hline);
        assert_eq!(r.hline_value, Some(70.0));
        assert_eq!(r.values, vec![70.0; 4]);
        assert_eq!(r.name, "OB");
    }

    #[test]
    fn hline_default_title_embeds_price() {
        let results = run("//@version=6\nhline(30)", 3);
        assert_eq!(results[0].name, "Level 30");
        assert_eq!(results[0].color.as_deref(), Some("#787B86"));
    }

    #[test]
    fn bgcolor_conditional_masks_bars() {
        let results = run(
            "//@version=6\nbgcolor(close > open ? color.new(color.green, 90) : na)",
            20,
        );
        let r = &results[0];
        assert_eq!(r.kind, PlotKind::Bgcolor);
        assert_eq!(r.color.as_deref(), Some("#0899811A"));
        let s = series(20);
        for (i, &v) in r.values.iter().enumerate() {
            let up = s.close()[i] > s.open()[i];
            assert_eq!(v == 1.0, up, "bar {i}");
            assert_eq!(v.is_nan(), !up, "bar {i}");
        }
    }

    #[test]
    fn fill_is_accepted_without_a_result() {
        let results = run("//@version=6\nfill(close, open)\nplot(close)", 5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn bindings_and_inputs_flow_into_ta_calls() {
        let results = run(
            "//@version=6\nlen = input.int(3, \"Length\")\nma = ta.sma(close, len)\nplot(ma, \"MA\")",
            10,
        );
        let expected = ta_core::sma(series(10).close(), 3);
        assert_series_eq(&results[0].values, &expected);
    }

    #[test]
    fn destructured_bb_binds_upper_middle_lower() {
        let results = run(
            "//@version=6\n[u, m, l] = ta.bb(close, 5, 2.0)\nplot(u)\nplot(m)\nplot(l)",
            30,
        );
        let s = series(30);
        let bb = ta_core::bb(s.close(), 5, 2.0);
        assert_series_eq(&results[0].values, &bb.upper);
        assert_series_eq(&results[1].values, &bb.middle);
        assert_series_eq(&results[2].values, &bb.lower);
    }

    #[test]
    fn destructured_macd_binds_three_lines() {
        let results = run(
            "//@version=6\n[m, s, h] = ta.macd(close, 12, 26, 9)\nplot(h, \"Hist\")",
            60,
        );
        let macd = ta_core::macd(series(60).close(), 12, 26, 9);
        assert_series_eq(&results[0].values, &macd.hist);
    }

    #[test]
    fn history_shift_prepends_na() {
        let results = run("//@version=6\nplot(close[2])", 6);
        let s = series(6);
        let v = &results[0].values;
        assert!(v[0].is_nan() && v[1].is_nan());
        assert_eq!(v[2], s.close()[0]);
        assert_eq!(v[5], s.close()[3]);
    }

    #[test]
    fn ternary_selects_per_bar() {
        let results = run("//@version=6\nplot(close > open ? 1 : 0)", 15);
        let s = series(15);
        for (i, &v) in results[0].values.iter().enumerate() {
            assert_eq!(v, if s.close()[i] > s.open()[i] { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn division_by_zero_yields_na() {
        let results = run("//@version=6\nplot(close / (close - close))", 4);
        assert!(results[0].values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn nz_replaces_na_values() {
        let results = run("//@version=6\nplot(nz(close[1], -1))", 4);
        assert_eq!(results[0].values[0], -1.0);
        assert!(!results[0].values[1].is_nan());
    }

    #[test]
    fn emission_order_matches_call_order() {
        let results = run(
            "//@version=6\nplot(close, \"a\")\nhline(5)\nplot(open, \"b\")",
            5,
        );
        assert_eq!(results[0].name, "a");
        assert_eq!(results[1].kind, PlotKind::Hline);
        assert_eq!(results[2].name, "b");
    }

    #[test]
    fn arrays_support_push_get_and_aggregates() {
        let results = run(
            "//@version=6\na = array.new_float(0)\narray.push(a, 2)\narray.push(a, 4)\narray.push(a, 6)\nplot(array.avg(a))\nplot(array.get(a, -1))",
            3,
        );
        assert_eq!(results[0].values, vec![4.0; 3]);
        assert_eq!(results[1].values, vec![6.0; 3]);
    }

    #[test]
    fn math_inverse_trig_and_angle_conversions() {
        let results = run(
            "//@version=6\nplot(math.todegrees(math.atan(1)))\nplot(math.asin(1))\nplot(math.toradians(180))",
            3,
        );
        assert_series_eq(&results[0].values, &[45.0; 3]);
        assert_series_eq(&results[1].values, &[std::f64::consts::FRAC_PI_2; 3]);
        assert_series_eq(&results[2].values, &[std::f64::consts::PI; 3]);
    }

    #[test]
    fn array_from_pop_and_stdev() {
        let results = run(
            "//@version=6\na = array.from(2, 4)\nplot(array.stdev(a))\nplot(array.pop(a))\nplot(array.size(a))",
            3,
        );
        assert_series_eq(&results[0].values, &[1.0; 3]);
        assert_series_eq(&results[1].values, &[4.0; 3]);
        assert_series_eq(&results[2].values, &[1.0; 3]);
    }

    #[test]
    fn array_pop_on_empty_is_a_runtime_error() {
        let err = execute(
            &translate("//@version=6\na = array.new_float(0)\nx = array.pop(a)"),
            &series(3),
        )
        .unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn str_tonumber_parses_and_trim_strips() {
        let results = run(
            "//@version=6\nplot(str.tonumber(\" 21 \") + 1)\nplot(nz(str.tonumber(\"oops\"), -1))\nplot(close, str.trim(\"  T  \"))",
            3,
        );
        assert_series_eq(&results[0].values, &[22.0; 3]);
        assert_series_eq(&results[1].values, &[-1.0; 3]);
        assert_eq!(results[2].name, "T");
    }

    #[test]
    fn hline_honors_linewidth_positionally_and_by_keyword() {
        let results = run(
            "//@version=6\nhline(70, \"OB\", color.gray, 3)\nhline(50, linewidth=2)",
            4,
        );
        assert_eq!(results[0].line_width, Some(3));
        assert_eq!(results[1].line_width, Some(2));
        assert_eq!(results[1].hline_value, Some(50.0));
    }

    #[test]
    fn bare_debug_and_log_are_accepted_noops() {
        let results = run(
            "//@version=6\ndebug(close)\nlog(\"checkpoint\", close)\nplot(close)",
            5,
        );
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn rsi_defaults_to_length_14() {
        let results = run("//@version=6\nplot(ta.rsi(close))", 40);
        let expected = ta_core::rsi(series(40).close(), 14);
        assert_series_eq(&results[0].values, &expected);
    }

    #[test]
    fn str_format_and_tostring_name_plots() {
        let results = run(
            "//@version=6\nlen = 14\nplot(close, str.format(\"RSI {0}\", len))",
            3,
        );
        assert_eq!(results[0].name, "RSI 14");
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let err = execute(&translate("//@version=6\nplot(closee)"), &series(3)).unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("closee"));
    }

    #[test]
    fn unsupported_statement_reports_its_line() {
        let err = execute(
            &translate("//@version=6\nplot(close)\nfor i = 0 to 3"),
            &series(3),
        )
        .unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn math_random_is_deterministic_per_run() {
        let a = run("//@version=6\nplot(math.random(0, 10))", 3);
        let b = run("//@version=6\nplot(math.random(0, 10))", 3);
        assert_eq!(a[0].values, b[0].values);
    }

    #[test]
    fn crossover_feeds_conditions() {
        let results = run(
            "//@version=6\nfast = ta.sma(close, 3)\nslow = ta.sma(close, 8)\nplot(ta.crossover(fast, slow) ? 1 : 0, \"X\")",
            40,
        );
        let s = series(40);
        let fast = ta_core::sma(s.close(), 3);
        let slow = ta_core::sma(s.close(), 8);
        let expected = ta_core::crossover(&fast, &slow);
        for (i, &v) in results[0].values.iter().enumerate() {
            assert_eq!(v == 1.0, expected[i], "bar {i}");
        }
    }
}
