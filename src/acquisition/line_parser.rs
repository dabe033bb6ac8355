//! Sensor record line parser.
//!
//! The firmware emits one record per line: `<encoder count>,<current>\n`,
//! both fields ASCII floats. Anything else is rejected with the offending
//! line echoed verbatim so the operator can spot wiring or baud-rate issues.

use crate::types::Sample;
use thiserror::Error;

/// Per-line validation errors. Non-fatal: the caller logs and skips.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    /// Wrong number of comma-separated fields (expected exactly 2).
    #[error("Invalid format (expected <encoder>,<current>): {line:?}")]
    Format { line: String },

    /// A field did not parse as a floating-point number.
    #[error("Invalid numeric field: {line:?}")]
    Parse { line: String },
}

impl LineError {
    /// The raw line that was rejected, verbatim.
    pub fn line(&self) -> &str {
        match self {
            LineError::Format { line } | LineError::Parse { line } => line,
        }
    }
}

/// Parse one raw line into a [`Sample`].
///
/// The line is trimmed before splitting; callers filter out lines that are
/// empty after trimming (keep-alives) before calling this.
pub fn parse_line(raw: &str) -> Result<Sample, LineError> {
    let line = raw.trim();
    let parts: Vec<&str> = line.split(',').collect();

    if parts.len() != 2 {
        return Err(LineError::Format {
            line: line.to_string(),
        });
    }

    let encoder_count = parts[0].trim().parse::<f64>().map_err(|_| LineError::Parse {
        line: line.to_string(),
    })?;
    let current = parts[1].trim().parse::<f64>().map_err(|_| LineError::Parse {
        line: line.to_string(),
    })?;

    Ok(Sample::new(encoder_count, current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_valid_line() {
        let sample = parse_line("1523.0,0.482").unwrap();
        assert_eq!(sample.encoder_count, 1523.0);
        assert_eq!(sample.current, 0.482);
    }

    #[test]
    fn test_tolerates_whitespace() {
        let sample = parse_line("  1523.0 , 0.482 \r\n").unwrap();
        assert_eq!(sample.encoder_count, 1523.0);
        assert_eq!(sample.current, 0.482);
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let err = parse_line("1.0").unwrap_err();
        assert!(matches!(err, LineError::Format { .. }));
        assert_eq!(err.line(), "1.0");
    }

    #[test]
    fn test_extra_field_is_format_error() {
        let err = parse_line("1.0,2.0,3.0").unwrap_err();
        assert!(matches!(err, LineError::Format { .. }));
    }

    #[test]
    fn test_non_numeric_field_is_parse_error() {
        let err = parse_line("abc,1.2").unwrap_err();
        assert!(matches!(err, LineError::Parse { .. }));
        assert_eq!(err.line(), "abc,1.2");
    }

    #[test]
    fn test_error_echoes_line_verbatim() {
        let err = parse_line("abc,1.2").unwrap_err();
        assert!(err.to_string().contains("abc,1.2"));
    }
}
