//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the parameter/dial code stays free of presentation concerns
//! - output changes are localized (and covered by snapshot-style tests)

use crate::app::pipeline::{Chi2Report, Scan, ThrowReport};
use crate::params::{EigenDecomposition, ParameterSet};

/// Parameter table of one set.
pub fn format_set_summary(set: &ParameterSet) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", set.name()));
    if !set.is_enabled() {
        out.push_str("(disabled)\n");
        return out;
    }
    out.push_str(&format!(
        "parameters: {} | inversion: {}\n",
        set.nb_parameters(),
        if set.uses_eigen_decomposition() { "eigen" } else { "direct" }
    ));

    push_row(
        &mut out,
        format!(
            "{:<24} {:>10} {:>10} {:>10} {:<22} {:<8}",
            "parameter", "prior", "std_dev", "value", "domain", "flags"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<24} {:-<10} {:-<10} {:-<10} {:-<22} {:-<8}", "", "", "", "", "", ""),
    );
    for p in set.parameters() {
        push_row(
            &mut out,
            format!(
                "{:<24} {:>10.4} {:>10.4} {:>10.4} {:<22} {:<8}",
                truncate(&p.title(), 24),
                p.prior(),
                p.std_dev(),
                p.value(),
                truncate(&p.domain().describe(), 22),
                flags(p.is_enabled(), p.is_fixed(), p.is_free()),
            ),
        );
    }
    out
}

/// Eigen spectrum with cumulative trace fraction.
pub fn format_eigen_spectrum(eigen: &EigenDecomposition) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "eigen modes: {}/{} retained | max fraction {:.4} | retained fraction {:.4}\n",
        eigen.nb_retained(),
        eigen.len(),
        eigen.max_fraction(),
        eigen.retained_fraction()
    ));
    push_row(
        &mut out,
        format!("{:>6} {:>14} {:>10} {:>10} {:<8}", "mode", "eigenvalue", "fraction", "cumul", "state"),
    );
    let total: f64 = eigen.values().iter().sum();
    let mut cumulative = 0.0;
    for (i, &lambda) in eigen.values().iter().enumerate() {
        cumulative += lambda;
        push_row(
            &mut out,
            format!(
                "{:>6} {:>14.6e} {:>10.4} {:>10.4} {:<8}",
                i,
                lambda,
                lambda / total,
                cumulative / total,
                if eigen.is_retained(i) { "kept" } else { "pruned" }
            ),
        );
    }
    out
}

pub fn format_chi2(report: &Chi2Report) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<24} {:>14}", "set", "chi2"));
    push_row(&mut out, format!("{:-<24} {:-<14}", "", ""));
    for (name, chi2) in &report.per_set {
        push_row(&mut out, format!("{:<24} {:>14.6}", truncate(name, 24), chi2));
    }
    push_row(&mut out, format!("{:<24} {:>14.6}", "total", report.total));
    out
}

/// One row per grid value, one column per dial.
pub fn format_scan_table(scan: &Scan) -> String {
    let mut out = String::new();
    out.push_str(&format!("Scan of {} ({} dials)\n", scan.parameter, scan.labels.len()));
    for (k, label) in scan.labels.iter().enumerate() {
        out.push_str(&format!("  [{k}] {label}\n"));
    }

    let mut header = format!("{:>12}", "value");
    let mut rule = format!("{:->12}", "");
    for k in 0..scan.labels.len() {
        header.push_str(&format!(" {:>12}", format!("[{k}]")));
        rule.push_str(&format!(" {:->12}", ""));
    }
    push_row(&mut out, header);
    push_row(&mut out, rule);

    for (v, row) in scan.values.iter().zip(&scan.responses) {
        let mut line = format!("{v:>12.4}");
        for r in row {
            line.push_str(&format!(" {r:>12.6}"));
        }
        push_row(&mut out, line);
    }
    out
}

pub fn format_throw_report(report: &ThrowReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Throws: toys={} seed={} draws={}\n",
        report.toys, report.seed, report.attempts
    ));
    push_row(
        &mut out,
        format!("{:<24} {:>12} {:>12} {:>12}", "set", "mean chi2", "rms", "max"),
    );
    push_row(&mut out, format!("{:-<24} {:-<12} {:-<12} {:-<12}", "", "", "", ""));
    for s in &report.per_set {
        push_row(
            &mut out,
            format!("{:<24} {:>12.4} {:>12.4} {:>12.4}", truncate(&s.set, 24), s.mean, s.rms, s.max),
        );
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn flags(enabled: bool, fixed: bool, free: bool) -> String {
    let mut s = String::new();
    if !enabled {
        s.push_str("off");
    }
    if fixed {
        s.push_str(if s.is_empty() { "fixed" } else { ",fixed" });
    }
    if free {
        s.push_str(if s.is_empty() { "free" } else { ",free" });
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
