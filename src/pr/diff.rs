use super::types::ChangeRecord;
use super::PrError;

/// Parse a single file's unified diff into its added lines, each tagged with
/// its line number in the new version of the file.
///
/// The input is the `patch` field of GitHub's "list pull request files"
/// response: one or more hunks, each introduced by
///   @@ -{old_start},{old_count} +{new_start},{new_count} @@
/// and followed by lines prefixed with '+', '-' or ' '.
///
/// Context lines advance the new-file cursor, removed lines do not. File
/// metadata (`--- a/x`, `+++ b/x`) before the first hunk is ignored; inside a
/// hunk a `+++` line is an added line whose text starts with "++". An empty
/// patch, or one without any hunk, yields no records.
pub fn parse_diff(patch: &str) -> Result<Vec<ChangeRecord>, PrError> {
    let mut changes = Vec::new();
    // Line number the next new-file line will occupy; None until a hunk starts.
    let mut next_line: Option<usize> = None;

    for (idx, line) in patch.split('\n').enumerate() {
        if line.starts_with("@@") {
            next_line = Some(parse_hunk_header(line, idx + 1)?);
        } else if line.starts_with("+++") && next_line.is_none() {
            // New-file marker of the file header.
            continue;
        } else if line.starts_with('+') {
            // Deliberately not skipping `+++` here: inside a hunk `+++x` is
            // the added text "++x", never a file marker.
            let current = next_line.ok_or_else(|| PrError::MalformedPatch {
                line: idx + 1,
                reason: "added line before any hunk header".to_string(),
            })?;
            changes.push(ChangeRecord {
                line: current,
                code: line[1..].to_string(),
            });
            next_line = Some(current.checked_add(1).ok_or_else(|| overflow(idx + 1))?);
        } else if line.starts_with('\\') {
            // "\ No newline at end of file" belongs to the previous line.
            continue;
        } else if !line.starts_with('-') {
            if let Some(current) = next_line {
                next_line = Some(current.checked_add(1).ok_or_else(|| overflow(idx + 1))?);
            }
        }
    }

    Ok(changes)
}

/// Extract the new-file start line from a hunk header.
///
/// Only the `+{new_start}[,{new_count}]` field decides validity; the old range
/// and the section heading GitHub appends after the closing `@@` are ignored.
fn parse_hunk_header(line: &str, line_no: usize) -> Result<usize, PrError> {
    let malformed = |reason: String| PrError::MalformedPatch {
        line: line_no,
        reason,
    };

    let ranges = line
        .strip_prefix("@@")
        .and_then(|rest| rest.split("@@").next())
        .unwrap_or_default();

    let new_range = ranges
        .split_whitespace()
        .find_map(|part| part.strip_prefix('+'))
        .ok_or_else(|| malformed(format!("missing new range in {:?}", line)))?;

    let (start_str, count_str) = match new_range.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (new_range, None),
    };
    let new_start = start_str
        .parse::<usize>()
        .map_err(|_| malformed(format!("invalid new range start in {:?}", line)))?;
    if let Some(count) = count_str {
        count
            .parse::<usize>()
            .map_err(|_| malformed(format!("invalid new range count in {:?}", line)))?;
    }
    Ok(new_start)
}

fn overflow(line_no: usize) -> PrError {
    PrError::MalformedPatch {
        line: line_no,
        reason: "line number overflow".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(records: &[ChangeRecord]) -> Vec<usize> {
        records.iter().map(|r| r.line).collect()
    }

    #[test]
    fn test_parse_empty_patch() {
        assert!(parse_diff("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_patch_without_hunks() {
        // A pure rename carries metadata only.
        let patch = "--- a/old_name.rs\n+++ b/new_name.rs";
        assert!(parse_diff(patch).unwrap().is_empty());
    }

    #[test]
    fn test_single_addition_between_context() {
        let patch = "@@ -1,2 +1,3 @@\n context\n+added line\n context2";
        let records = parse_diff(patch).unwrap();
        assert_eq!(
            records,
            vec![ChangeRecord {
                line: 2,
                code: "added line".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiple_hunks_use_their_own_start() {
        let patch = "@@ -1,3 +1,4 @@\n a\n+b\n c\n d\n@@ -40,3 +41,4 @@\n x\n y\n+z\n w";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![2, 43]);
        assert_eq!(records[1].code, "z");
    }

    #[test]
    fn test_pure_deletion_hunk_emits_nothing() {
        let patch = "@@ -10,3 +10,0 @@\n-gone\n-also gone\n-and this";
        assert!(parse_diff(patch).unwrap().is_empty());
    }

    #[test]
    fn test_deletion_hunk_does_not_disturb_later_hunks() {
        let patch = "@@ -1,4 +1,2 @@\n keep\n-drop\n-drop\n keep\n@@ -20,2 +18,3 @@\n ctx\n+new\n ctx";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![19]);
    }

    #[test]
    fn test_file_metadata_lines_are_ignored() {
        let patch = "--- a/file.py\n+++ b/file.py\n@@ -1,1 +1,1 @@\n+x";
        let records = parse_diff(patch).unwrap();
        assert_eq!(
            records,
            vec![ChangeRecord {
                line: 1,
                code: "x".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let patch = "@@ -3,4 +3,5 @@\n one\n-two\n+deux\n+zwei\n three";
        assert_eq!(parse_diff(patch).unwrap(), parse_diff(patch).unwrap());
    }

    #[test]
    fn test_header_without_new_range_is_malformed() {
        let err = parse_diff("@@ -1,2 @@\n+x").unwrap_err();
        assert!(matches!(err, PrError::MalformedPatch { line: 1, .. }));
    }

    #[test]
    fn test_header_with_only_new_range() {
        let records = parse_diff("@@ +4,2 @@\n+a").unwrap();
        assert_eq!(
            records,
            vec![ChangeRecord {
                line: 4,
                code: "a".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_old_range_is_ignored() {
        let records = parse_diff("@@ -x,y +3 @@\n+a").unwrap();
        assert_eq!(lines(&records), vec![3]);
    }

    #[test]
    fn test_header_without_plus_field_reports_it() {
        match parse_diff("@@ -1,2 @@\n+x").unwrap_err() {
            PrError::MalformedPatch { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("missing new range"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_count_is_malformed() {
        match parse_diff("@@ -1,2 +1,many @@\n+x").unwrap_err() {
            PrError::MalformedPatch { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("count"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_line_number_overflow_is_malformed() {
        let patch = format!("@@ -1 +{},2 @@\n+a\n+b", usize::MAX);
        match parse_diff(&patch).unwrap_err() {
            PrError::MalformedPatch { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("overflow"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_context_line_overflow_is_malformed() {
        let patch = format!("@@ -1 +{} @@\n ctx\n+a", usize::MAX);
        assert!(matches!(
            parse_diff(&patch),
            Err(PrError::MalformedPatch { line: 2, .. })
        ));
    }

    #[test]
    fn test_non_numeric_start_is_malformed() {
        let err = parse_diff(" ctx\n@@ -1,2 +abc,3 @@\n+x").unwrap_err();
        assert!(matches!(err, PrError::MalformedPatch { line: 2, .. }));
    }

    #[test]
    fn test_added_line_before_header_is_malformed() {
        let err = parse_diff("+orphan\n@@ -1 +1 @@\n+x").unwrap_err();
        match err {
            PrError::MalformedPatch { line, reason } => {
                assert_eq!(line, 1);
                assert!(reason.contains("before any hunk header"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_consecutive_additions() {
        let patch = "@@ -5,0 +5,3 @@\n+a\n+b\n+c";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![5, 6, 7]);
        assert_eq!(records[2].code, "c");
    }

    #[test]
    fn test_single_line_ranges_without_count() {
        let patch = "@@ -7 +7 @@ fn main() {\n-old\n+new";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![7]);
        assert_eq!(records[0].code, "new");
    }

    #[test]
    fn test_section_heading_after_header_is_ignored() {
        let patch = "@@ -12,3 +12,4 @@ impl Parser {\n     fn a() {}\n+    fn b() {}\n }";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![13]);
        assert_eq!(records[0].code, "    fn b() {}");
    }

    #[test]
    fn test_no_newline_marker_does_not_shift_lines() {
        let patch = "@@ -1,2 +1,3 @@\n first\n-last\n\\ No newline at end of file\n+last\n+appended\n\\ No newline at end of file";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![2, 3]);
    }

    #[test]
    fn test_added_lines_starting_with_plus_signs() {
        let patch = "--- a/counter.c\n+++ b/counter.c\n@@ -1 +1,3 @@\n x\n++y\n+++counter;";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![2, 3]);
        assert_eq!(records[0].code, "+y");
        assert_eq!(records[1].code, "++counter;");
    }

    #[test]
    fn test_new_file_patch() {
        let patch = "@@ -0,0 +1,2 @@\n+hello\n+world";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![1, 2]);
    }

    #[test]
    fn test_trailing_newline_is_harmless() {
        let patch = "@@ -1,1 +1,2 @@\n a\n+b\n";
        let records = parse_diff(patch).unwrap();
        assert_eq!(lines(&records), vec![2]);
    }
}
