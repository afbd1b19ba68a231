//! Color palette and alpha handling for plot output.

/// Default series color when a `plot` call gives none.
pub const DEFAULT_PLOT_COLOR: &str = "#2962FF";

/// Default horizontal-level color (mid gray).
pub const DEFAULT_HLINE_COLOR: &str = "#787B86";

/// Fixed name -> hex palette matching the Pine v5/v6 `color.*` constants
/// the dashboard renders.
pub fn palette(name: &str) -> Option<&'static str> {
    let hex = match name {
        "blue" => "#2962FF",
        "red" => "#F23645",
        "green" => "#089981",
        "purple" => "#9C27B0",
        "orange" => "#FF9800",
        "gray" | "grey" => "#787B86",
        "yellow" => "#FDD835",
        "teal" => "#00897B",
        "white" => "#FFFFFF",
        "black" => "#000000",
        "aqua" => "#00BCD4",
        "lime" => "#00E676",
        "fuchsia" => "#E040FB",
        "silver" => "#B2B5BE",
        "maroon" => "#880E4F",
        "navy" => "#311B92",
        "olive" => "#808000",
        _ => return None,
    };
    Some(hex)
}

/// Append an 8-bit alpha suffix for a Pine transparency (0 = opaque,
/// 100 = invisible). Inputs outside 0..100 are clamped.
pub fn with_transparency(base: &str, transparency: f64) -> String {
    let t = transparency.clamp(0.0, 100.0);
    let alpha = ((100.0 - t) / 100.0 * 255.0).round() as u8;
    format!("{base}{alpha:02X}")
}

/// `color.rgb(r, g, b)`; channels are clamped to 0..255.
pub fn rgb(r: f64, g: f64, b: f64) -> String {
    let clamp = |v: f64| v.clamp(0.0, 255.0).round() as u8;
    format!("#{:02X}{:02X}{:02X}", clamp(r), clamp(g), clamp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparency_zero_is_opaque_alpha() {
        let base = palette("blue").unwrap();
        assert_eq!(with_transparency(base, 0.0), "#2962FFFF");
    }

    #[test]
    fn transparency_hundred_is_transparent_alpha() {
        let base = palette("red").unwrap();
        assert_eq!(with_transparency(base, 100.0), "#F2364500");
    }

    #[test]
    fn transparency_is_clamped() {
        assert_eq!(with_transparency("#000000", -10.0), "#000000FF");
        assert_eq!(with_transparency("#000000", 250.0), "#00000000");
    }

    #[test]
    fn rgb_formats_hex() {
        assert_eq!(rgb(41.0, 98.0, 255.0), "#2962FF");
        assert_eq!(rgb(-5.0, 300.0, 0.0), "#00FF00");
    }

    #[test]
    fn palette_covers_every_documented_name() {
        for name in [
            "blue", "red", "green", "purple", "orange", "gray", "yellow", "teal", "white",
            "black", "aqua", "lime", "fuchsia", "silver", "maroon", "navy", "olive",
        ] {
            assert!(palette(name).is_some(), "missing palette entry: {name}");
        }
        assert!(palette("chartreuse").is_none());
    }
}
