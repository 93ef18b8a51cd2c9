use layerkit_compdb::{DatabaseStats, PathWarning};

pub fn render_stats(source: &str, stats: &DatabaseStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("Compilation database: {source}\n"));
    out.push_str(&format!("  entries:           {}\n", stats.entries));
    out.push_str(&format!("  distinct includes: {}\n", stats.distinct_includes));
    out.push_str(&format!("  distinct defines:  {}\n", stats.distinct_defines));
    if stats.unresolved_paths > 0 {
        out.push_str(&format!("  unresolved paths:  {}\n", stats.unresolved_paths));
    }

    if !stats.file_types.is_empty() {
        out.push_str("\nFile types:\n");
        for (ext, count) in &stats.file_types {
            out.push_str(&format!("  {ext:<14} {count:>6}\n"));
        }
    }

    if !stats.top_flags.is_empty() {
        out.push_str("\nTop compiler flags:\n");
        for usage in &stats.top_flags {
            out.push_str(&format!("  {:<24} {:>6}\n", usage.flag, usage.count));
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// One line per warning, capped at `limit` with a trailing count.
pub fn render_warnings(warnings: &[&PathWarning], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = warnings
        .iter()
        .take(limit)
        .map(|w| format!("record {}: {} ({})", w.record, w.path.display(), w.reason))
        .collect();
    if warnings.len() > limit {
        lines.push(format!("... and {} more", warnings.len() - limit));
    }
    lines
}
