use std::fmt::Write as _;

use model::SyncResult;

/// Renders a human-readable summary of a completed run: files indexed,
/// copied, and skipped, plus the size moved and the diff since the last
/// commit.
#[must_use]
pub fn format_summary(result: &SyncResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "files indexed:  {}", result.files_indexed);
    let _ = writeln!(out, "files copied:   {}", result.details.files_copied);
    let _ = writeln!(out, "files skipped:  {}", result.details.files_skipped);
    let _ = writeln!(out, "size discovered: {}", format_size(result.details.size_discovered));
    let _ = writeln!(out, "size copied:    {}", format_size(result.details.size_copied));
    let _ = writeln!(out, "size skipped:   {}", format_size(result.details.size_skipped));
    if !result.sync_diff.added().is_empty() {
        let _ = writeln!(out, "added:          {}", result.sync_diff.added().len());
    }
    if !result.sync_diff.modified().is_empty() {
        let _ = writeln!(out, "modified:       {}", result.sync_diff.modified().len());
    }
    if !result.sync_diff.removed().is_empty() {
        let _ = writeln!(out, "removed:        {}", result.sync_diff.removed().len());
    }
    if let Some(path) = &result.details.current_destination_path {
        let _ = writeln!(out, "failed on:      {}", path.display());
    }
    out
}

/// Renders the groups returned by `Indexer::find_duplicates`, one group per
/// blank-line-separated block, paths indented beneath their group.
#[must_use]
pub fn format_duplicates(groups: &[Vec<String>]) -> String {
    let mut out = String::new();
    if groups.is_empty() {
        let _ = writeln!(out, "no duplicate files found");
        return out;
    }
    for (index, group) in groups.iter().enumerate() {
        let _ = writeln!(out, "group {}: {} files", index + 1, group.len());
        for path in group {
            let _ = writeln!(out, "  {path}");
        }
    }
    out
}

/// Renders a byte count using the largest whole unit that keeps it `>= 1`.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_the_largest_fitting_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn format_duplicates_reports_no_groups_found() {
        assert_eq!(format_duplicates(&[]), "no duplicate files found\n");
    }

    #[test]
    fn format_duplicates_lists_every_path_in_a_group() {
        let groups = vec![vec!["a.jpg".to_string(), "b.jpg".to_string()]];
        let rendered = format_duplicates(&groups);
        assert!(rendered.contains("group 1: 2 files"));
        assert!(rendered.contains("  a.jpg"));
        assert!(rendered.contains("  b.jpg"));
    }

    #[test]
    fn summary_reports_a_failed_destination_path() {
        let mut result = SyncResult::default();
        result.details.current_destination_path = Some("/dst/a.jpg".into());
        let summary = format_summary(&result);
        assert!(summary.contains("failed on:      /dst/a.jpg"));
    }
}
