//! Strict two-column sample reader

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{HarnessError, Result};

/// One non-blank line split into its two columns
pub(crate) struct Row<'a> {
    pub line: usize,
    pub first: &'a str,
    pub second: &'a str,
}

/// Read a whole artifact, mapping a missing file to `MissingArtifact`
///
/// Bytes that are not UTF-8, as left by an interrupted writer, are a parse
/// error on the line where they start.
pub(crate) fn read_artifact(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => HarnessError::MissingArtifact {
            path: path.to_path_buf(),
        },
        _ => HarnessError::fs(path, "cannot read artifact", e),
    })?;

    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        HarnessError::parse(path, line, "invalid UTF-8 content")
    })
}

/// Split `content` into two-column rows, skipping blank lines
///
/// Line numbers are 1-based. A file without any row is a parse error.
pub(crate) fn rows<'a>(path: &Path, content: &'a str) -> Result<Vec<Row<'a>>> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };
        let line = idx + 1;
        let second = tokens
            .next()
            .ok_or_else(|| HarnessError::parse(path, line, "expected 2 columns, found 1"))?;
        if tokens.next().is_some() {
            let found = 3 + tokens.count();
            return Err(HarnessError::parse(
                path,
                line,
                format!("expected 2 columns, found {}", found),
            ));
        }
        rows.push(Row {
            line,
            first,
            second,
        });
    }

    if rows.is_empty() {
        return Err(HarnessError::parse(path, 1, "file contains no samples"));
    }
    Ok(rows)
}

/// Parse a finite decimal
pub(crate) fn finite(path: &Path, line: usize, token: &str) -> Result<f64> {
    let value: f64 = token
        .parse()
        .map_err(|_| HarnessError::parse(path, line, format!("invalid number '{}'", token)))?;
    if !value.is_finite() {
        return Err(HarnessError::parse(
            path,
            line,
            format!("non-finite value '{}'", token),
        ));
    }
    Ok(value)
}

/// Parse a finite decimal that is not negative
pub(crate) fn non_negative(path: &Path, line: usize, token: &str) -> Result<f64> {
    let value = finite(path, line, token)?;
    if value < 0.0 {
        return Err(HarnessError::parse(
            path,
            line,
            format!("negative value '{}'", token),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_skip_blank_lines() {
        let path = Path::new("t.txt");
        let rows = rows(path, "\n1.0 2\n   \n3 4\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].second, "4");
    }

    #[test]
    fn test_rows_column_count() {
        let path = Path::new("t.txt");
        let err = rows(path, "1.0 2\n5\n").err().unwrap();
        assert_eq!(err.to_string(), "t.txt:2: expected 2 columns, found 1");

        let err = rows(path, "1 2 3 4\n").err().unwrap();
        assert_eq!(err.to_string(), "t.txt:1: expected 2 columns, found 4");
    }

    #[test]
    fn test_empty_content() {
        let err = rows(Path::new("t.txt"), " \n\n").err().unwrap();
        assert!(matches!(err, HarnessError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_number_parsing() {
        let path = Path::new("t.txt");
        assert_eq!(finite(path, 1, "2.5").unwrap(), 2.5);
        assert!(finite(path, 1, "abc").is_err());
        assert!(finite(path, 1, "inf").is_err());
        assert!(finite(path, 1, "NaN").is_err());
        assert!(non_negative(path, 1, "-0.5").is_err());
        assert_eq!(non_negative(path, 1, "0").unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("eager_normal_30.txt");
        fs::write(&path, b"1.0 500\n\xff\xfe 12\n").unwrap();

        let err = read_artifact(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Parse { line: 2, .. }));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_missing_artifact() {
        let err = read_artifact(Path::new("/nonexistent/txn_latencies.txt")).unwrap_err();
        assert!(matches!(err, HarnessError::MissingArtifact { .. }));
    }
}
