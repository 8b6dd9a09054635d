//! ASCII plotting of parameter scans for terminal output.
//!
//! Fixed-size character grid, one symbol per dial, deterministic output
//! (golden tests compare full strings).

use crate::app::pipeline::Scan;

/// Symbols assigned to dials in order; wraps around past the last one.
const SYMBOLS: [char; 8] = ['*', 'o', '+', 'x', '#', '%', '@', '&'];

/// Render every dial response of a scan on one grid, followed by a legend.
pub fn render_scan_plot(scan: &Scan, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = match (scan.values.first(), scan.values.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        _ => return format!("Plot: {} (nothing to draw)\n", scan.parameter),
    };
    let (y_min, y_max) = y_range(&scan.responses);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for k in 0..scan.labels.len() {
        let curve: Vec<(f64, f64)> = scan
            .values
            .iter()
            .zip(&scan.responses)
            .filter_map(|(&x, row)| row.get(k).map(|&y| (x, y)))
            .collect();
        draw_curve(&mut grid, &curve, (x_min, x_max), (y_min, y_max), symbol(k));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{x_min:.3}, {x_max:.3}] | response=[{y_min:.3}, {y_max:.3}]\n",
        scan.parameter
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for (k, label) in scan.labels.iter().enumerate() {
        out.push_str(&format!("  {} {label}\n", symbol(k)));
    }
    out
}

fn symbol(k: usize) -> char {
    SYMBOLS[k % SYMBOLS.len()]
}

/// Finite response range; a flat response gets a unit-wide window around it.
fn y_range(responses: &[Vec<f64>]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in responses.iter().flatten().filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !(min_y.is_finite() && max_y.is_finite()) {
        (0.0, 1.0)
    } else if max_y > min_y {
        (min_y, max_y)
    } else {
        (min_y - 0.5, max_y + 0.5)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top of the plot.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|(_, y)| y.is_finite()) {
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None => grid[row][col] = ch,
        }
        prev = Some((col, row));
    }
}

/// Bresenham line; only fills blank cells so earlier dials stay visible.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(responses: Vec<Vec<f64>>, labels: &[&str]) -> Scan {
        let n = responses.len();
        Scan {
            parameter: "xsec/#0_MaQE".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
            responses,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let s = scan(vec![vec![0.0, 0.5], vec![1.0, 0.5]], &["Graph", "Norm"]);
        let txt = render_scan_plot(&s, 10, 5);
        let expected = concat!(
            "Plot: xsec/#0_MaQE=[0.000, 1.000] | response=[-0.050, 1.050]\n",
            "        **\n",
            "      **\n",
            "oooo**oooo\n",
            "  **\n",
            "**\n",
            "  * Graph\n",
            "  o Norm\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn flat_response_sits_mid_plot() {
        let s = scan(vec![vec![1.0], vec![1.0], vec![1.0]], &["Norm"]);
        let txt = render_scan_plot(&s, 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).take(5).collect();
        assert_eq!(rows[2], "**********");
        assert!(rows.iter().enumerate().all(|(i, r)| i == 2 || r.is_empty()));
    }

    #[test]
    fn degenerate_scan_draws_nothing() {
        let s = Scan {
            parameter: "p".to_string(),
            labels: vec![],
            values: vec![1.0],
            responses: vec![vec![]],
        };
        assert_eq!(render_scan_plot(&s, 10, 5), "Plot: p (nothing to draw)\n");
    }
}
