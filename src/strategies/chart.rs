use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::indicators::TrendlineFit;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PAD: f64 = 20.0;

/// Closes plus the fitted support and resistance lines as a standalone SVG.
pub fn render_trendline_svg(title: &str, fit: &TrendlineFit) -> String {
    let n = fit.closes.len().max(2);
    let last_x = (n - 1) as f64;

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &c in &fit.closes {
        lo = lo.min(c);
        hi = hi.max(c);
    }
    for x in [0.0, last_x] {
        for y in [fit.support.at(x), fit.resistance.at(x)] {
            lo = lo.min(y);
            hi = hi.max(y);
        }
    }
    let span = if hi > lo { hi - lo } else { 1.0 };

    let px = |i: f64| PAD + i / last_x * (WIDTH - 2.0 * PAD);
    let py = |v: f64| HEIGHT - PAD - (v - lo) / span * (HEIGHT - 2.0 * PAD);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{PAD}" y="{PAD}" font-family="sans-serif" font-size="14">{} ({})</text>"#,
        title,
        fit.label()
    );

    let points: Vec<String> = fit
        .closes
        .iter()
        .enumerate()
        .map(|(i, &c)| format!("{:.1},{:.1}", px(i as f64), py(c)))
        .collect();
    let _ = writeln!(
        svg,
        r#"<polyline fill="none" stroke="black" stroke-width="1.5" points="{}"/>"#,
        points.join(" ")
    );

    for (line, color) in [(&fit.support, "green"), (&fit.resistance, "red")] {
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-dasharray="6 4"/>"#,
            px(0.0),
            py(line.at(0.0)),
            px(last_x),
            py(line.at(last_x)),
            color
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Writes `<dir>/<symbol>_trendlines.svg`.
pub fn save_trendline_chart(dir: &Path, symbol: &str, fit: &TrendlineFit) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let file_name = format!("{}_trendlines.svg", symbol.replace(['/', '\\'], "_"));
    let path = dir.join(file_name);
    std::fs::write(&path, render_trendline_svg(symbol, fit))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
