use serde::{Deserialize, Serialize};

/// Top-level rendering category of an emitted indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Line,
    Hline,
    Bgcolor,
}

/// Fine-grained style for `kind = line` results, from `plot.style_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotStyle {
    Line,
    Stepline,
    Histogram,
    Cross,
    Area,
    Columns,
    Circles,
}

impl PlotStyle {
    /// Parse the suffix of a `plot.style_*` identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "line" => Some(PlotStyle::Line),
            "stepline" => Some(PlotStyle::Stepline),
            "histogram" => Some(PlotStyle::Histogram),
            "cross" => Some(PlotStyle::Cross),
            "area" => Some(PlotStyle::Area),
            "columns" => Some(PlotStyle::Columns),
            "circles" => Some(PlotStyle::Circles),
            _ => None,
        }
    }
}

/// One emitted indicator series, wire-compatible with the chart renderer.
/// `values` always has the invocation's bar count; ordering of the result
/// list matches emission order inside the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotResult {
    pub name: String,
    pub values: Vec<f64>,
    pub kind: PlotKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hline_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<PlotStyle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_camel_case_and_skips_none() {
        let result = PlotResult {
            name: "Fast".to_string(),
            values: vec![1.0, 2.0],
            kind: PlotKind::Line,
            color: Some("#2962FF".to_string()),
            line_width: Some(2),
            hline_value: None,
            plot_type: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "line");
        assert_eq!(json["lineWidth"], 2);
        assert!(json.get("hlineValue").is_none());
        assert!(json.get("plotType").is_none());
    }

    #[test]
    fn hline_wire_shape() {
        let result = PlotResult {
            name: "OB".to_string(),
            values: vec![70.0; 3],
            kind: PlotKind::Hline,
            color: Some("#787B86".to_string()),
            line_width: None,
            hline_value: Some(70.0),
            plot_type: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "hline");
        assert_eq!(json["hlineValue"], 70.0);
    }
}
