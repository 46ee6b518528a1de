//! Expected vs actual output matching.

use std::fmt;

/// Outcome of comparing handler output against a case's expected lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    Pass,
    /// Line `index` differs (0-based).
    Differs {
        index: usize,
        expected: String,
        actual: String,
    },
    /// Output ended after `index` lines while more were expected.
    TooShort { index: usize, expected: String },
    /// Every expected line matched but output continued with `unexpected`.
    TooLong { matched: usize, unexpected: String },
}

impl LineMatch {
    pub fn passed(&self) -> bool {
        matches!(self, LineMatch::Pass)
    }
}

impl fmt::Display for LineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineMatch::Pass => write!(f, "passed"),
            LineMatch::Differs {
                index,
                expected,
                actual,
            } => write!(
                f,
                "failure after {index} lines:\n\texpected: \"{expected}\"\n\t  Actual: \"{actual}\""
            ),
            LineMatch::TooShort { index, expected } => write!(
                f,
                "failed: expected more output. After {index} lines\n\tExpected: \"{expected}\""
            ),
            LineMatch::TooLong {
                matched,
                unexpected,
            } => write!(
                f,
                "failed: actual output was too long. {matched} lines okay.\n\tUnexpected: \"{unexpected}\""
            ),
        }
    }
}

/// Split handler output into lines.
///
/// Splits on `\n`, drops a trailing `\r` from each line and ignores trailing
/// empty lines, so `""` and `"\n"` both have zero lines.
pub fn output_lines(output: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

/// Ordered, case-insensitive, length-sensitive comparison.
pub fn match_output(actual: &str, expected: &[String]) -> LineMatch {
    let actual = output_lines(actual);
    for (index, want) in expected.iter().enumerate() {
        let Some(got) = actual.get(index) else {
            return LineMatch::TooShort {
                index,
                expected: want.clone(),
            };
        };
        if !eq_ignore_case(got, want) {
            return LineMatch::Differs {
                index,
                expected: want.clone(),
                actual: (*got).to_string(),
            };
        }
    }
    match actual.get(expected.len()) {
        Some(extra) => LineMatch::TooLong {
            matched: expected.len(),
            unexpected: (*extra).to_string(),
        },
        None => LineMatch::Pass,
    }
}

fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}
