use opportunity_shared::ScoreBand;

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Translucent fill for a region shaded by score.
pub fn score_fill_css(score: f64, alpha: f64) -> String {
    let (r, g, b) = ScoreBand::for_score(score).rgb();
    rgba_css(r, g, b, alpha)
}
