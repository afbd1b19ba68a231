//! Runtime value model for the execution host.

/// Everything an expression can evaluate to. Scalars broadcast against
/// whole-series values; arrays live in the host's arena and are referenced
/// by handle so values stay cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
    Str(String),
    /// Hex color string, `#RRGGBB` or `#RRGGBBAA`.
    Color(String),
    /// Whole-series numeric value, one slot per bar.
    Series(Vec<f64>),
    /// Whole-series boolean value (comparison results).
    BoolSeries(Vec<bool>),
    /// Handle into the host arena.
    Array(usize),
    Na,
    /// Result of a sink call (`plot`, `hline`, ...); carries nothing.
    Unit,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Color(_) => "color",
            Value::Series(_) => "series",
            Value::BoolSeries(_) => "series<bool>",
            Value::Array(_) => "array",
            Value::Na => "na",
            Value::Unit => "void",
        }
    }

    /// `na` literal or a NaN scalar.
    pub fn is_na(&self) -> bool {
        matches!(self, Value::Na) || matches!(self, Value::Num(v) if v.is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_detection_covers_nan_scalars() {
        assert!(Value::Na.is_na());
        assert!(Value::Num(f64::NAN).is_na());
        assert!(!Value::Num(0.0).is_na());
        assert!(!Value::Series(vec![f64::NAN]).is_na());
    }
}
