use std::io::{self, Write};

use decoy_forge::compile::CompileReport;
use decoy_forge::generate::WorkerReport;
use decoy_forge::merge::MergeReport;

use crate::util::text::{fit, percent};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_worker_reports(reports: &[WorkerReport]) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let total = |field: fn(&WorkerReport) -> usize| reports.iter().map(field).sum::<usize>();
    let processed = total(|r| r.processed);
    let recovered = total(|r| r.recovered);
    let slowest = reports
        .iter()
        .map(|r| r.elapsed.as_secs_f64())
        .fold(0.0, f64::max);

    let rows = vec![
        ("Shards", reports.len().to_string()),
        ("Reactions", processed.to_string()),
        (
            "Recovered",
            format!("{recovered} ({})", percent(recovered, processed)),
        ),
        ("Not recovered", total(|r| r.not_recovered).to_string()),
        ("Rejected", total(|r| r.rejected).to_string()),
        ("Unreadable", total(|r| r.unreadable).to_string()),
        ("Records written", total(|r| r.written).to_string()),
        ("Slowest shard", format!("{slowest:.1}s")),
    ];
    print_kv_table(&mut out, "Generation Summary", &rows);
}

pub fn print_merge_report(report: &MergeReport) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let rows = vec![
        ("Records seen", report.records_seen.to_string()),
        (
            "Kept",
            format!("{} ({})", report.kept, percent(report.kept, report.records_seen)),
        ),
        ("Replaced", report.replaced.to_string()),
        ("Duplicates", report.duplicates.to_string()),
        ("Skipped", report.skipped.to_string()),
        ("Spills", report.spills.to_string()),
        ("Chunk", report.chunk_path.display().to_string()),
    ];
    print_kv_table(&mut out, "Merge Summary", &rows);
}

pub fn print_compile_report(report: &CompileReport) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let reactions = report.summaries + report.unreconstructed;
    let rows = vec![
        ("Records", report.records.to_string()),
        ("Reactions", reactions.to_string()),
        (
            "Reconstructed",
            format!("{} ({})", report.summaries, percent(report.summaries, reactions)),
        ),
        ("Unreconstructed", report.unreconstructed.to_string()),
        ("Skipped", report.skipped.to_string()),
    ];
    print_kv_table(&mut out, "Compile Summary", &rows);
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);
    let rule = |left: &str, mid: &str, right: &str| {
        format!(
            "{INDENT}{left}{}{mid}{}{right}",
            "─".repeat(key_w + 2),
            "─".repeat(val_w + 2)
        )
    };

    let _ = writeln!(out);
    let _ = writeln!(out, "{INDENT}┌─ {} ─┐", fit(title, SAFE_TABLE_WIDTH - 6));
    let _ = writeln!(out, "{}", rule("┌", "┬", "┐"));
    let _ = writeln!(out, "{INDENT}│ {:<key_w$} │ {:>val_w$} │", "Metric", "Value");
    let _ = writeln!(out, "{}", rule("├", "┼", "┤"));
    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<key_w$} │ {:>val_w$} │",
            fit(key, key_w),
            fit(val, val_w)
        );
    }
    let _ = writeln!(out, "{}", rule("└", "┴", "┘"));
    let _ = writeln!(out);
}
