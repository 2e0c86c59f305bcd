/// One of the seven fixed score brackets, warmest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScoreBand {
    Extreme,
    VeryHigh,
    High,
    Positive,
    SlightlyNegative,
    Negative,
    VeryNegative,
}

impl ScoreBand {
    /// Bracket for a score. Comparisons are strict, so a boundary value (2, 1, 0.5,
    /// 0, -0.5, -1) lands in the bracket below it. NaN lands in the coolest bracket.
    pub fn for_score(v: f64) -> Self {
        if v > 2.0 {
            ScoreBand::Extreme
        } else if v > 1.0 {
            ScoreBand::VeryHigh
        } else if v > 0.5 {
            ScoreBand::High
        } else if v > 0.0 {
            ScoreBand::Positive
        } else if v > -0.5 {
            ScoreBand::SlightlyNegative
        } else if v > -1.0 {
            ScoreBand::Negative
        } else {
            ScoreBand::VeryNegative
        }
    }

    pub const fn hex(self) -> &'static str {
        match self {
            ScoreBand::Extreme => "#800026",
            ScoreBand::VeryHigh => "#BD0026",
            ScoreBand::High => "#E31A1C",
            ScoreBand::Positive => "#FC4E2A",
            ScoreBand::SlightlyNegative => "#FD8D3C",
            ScoreBand::Negative => "#FEB24C",
            ScoreBand::VeryNegative => "#FED976",
        }
    }

    /// 6 for the warmest bracket down to 0 for the coolest.
    pub const fn warmth_rank(self) -> u8 {
        match self {
            ScoreBand::Extreme => 6,
            ScoreBand::VeryHigh => 5,
            ScoreBand::High => 4,
            ScoreBand::Positive => 3,
            ScoreBand::SlightlyNegative => 2,
            ScoreBand::Negative => 1,
            ScoreBand::VeryNegative => 0,
        }
    }

    /// Legend caption for the bracket.
    pub const fn label(self) -> &'static str {
        match self {
            ScoreBand::Extreme => "> 2",
            ScoreBand::VeryHigh => "1 – 2",
            ScoreBand::High => "0.5 – 1",
            ScoreBand::Positive => "0 – 0.5",
            ScoreBand::SlightlyNegative => "-0.5 – 0",
            ScoreBand::Negative => "-1 – -0.5",
            ScoreBand::VeryNegative => "≤ -1",
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        parse_hex_color(self.hex()).unwrap_or((0, 0, 0))
    }
}

/// Legend rows, warmest first.
pub const LEGEND: [ScoreBand; 7] = [
    ScoreBand::Extreme,
    ScoreBand::VeryHigh,
    ScoreBand::High,
    ScoreBand::Positive,
    ScoreBand::SlightlyNegative,
    ScoreBand::Negative,
    ScoreBand::VeryNegative,
];

/// Fill color for a composite score.
pub fn color_for_score(v: f64) -> &'static str {
    ScoreBand::for_score(v).hex()
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::{LEGEND, ScoreBand, color_for_score, parse_hex_color};

    #[test]
    fn reproduces_fixed_palette() {
        assert_eq!(color_for_score(3.0), "#800026");
        assert_eq!(color_for_score(1.5), "#BD0026");
        assert_eq!(color_for_score(0.75), "#E31A1C");
        assert_eq!(color_for_score(0.25), "#FC4E2A");
        assert_eq!(color_for_score(-0.25), "#FD8D3C");
        assert_eq!(color_for_score(-0.75), "#FEB24C");
        assert_eq!(color_for_score(-5.0), "#FED976");
    }

    #[test]
    fn boundaries_fall_in_lower_bracket() {
        assert_eq!(color_for_score(2.0), "#BD0026");
        assert_eq!(color_for_score(1.0), "#E31A1C");
        assert_eq!(color_for_score(0.5), "#FC4E2A");
        assert_eq!(color_for_score(0.0), "#FD8D3C");
        assert_eq!(color_for_score(-0.5), "#FEB24C");
        assert_eq!(color_for_score(-1.0), "#FED976");
    }

    #[test]
    fn warmth_never_increases_as_score_decreases() {
        let mut previous = u8::MAX;
        let mut v = 3.0;
        while v >= -2.0 {
            let rank = ScoreBand::for_score(v).warmth_rank();
            assert!(rank <= previous, "warmth rose at score {v}");
            previous = rank;
            v -= 0.125;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn nan_is_coolest() {
        assert_eq!(ScoreBand::for_score(f64::NAN), ScoreBand::VeryNegative);
    }

    #[test]
    fn legend_is_ordered_warmest_first() {
        let ranks: Vec<u8> = LEGEND.iter().map(|b| b.warmth_rank()).collect();
        assert_eq!(ranks, vec![6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#800026"), Some((0x80, 0x00, 0x26)));
        assert_eq!(parse_hex_color("FED976"), Some((0xFE, 0xD9, 0x76)));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(ScoreBand::High.rgb(), (0xE3, 0x1A, 0x1C));
    }
}
