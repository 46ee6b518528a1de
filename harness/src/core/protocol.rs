//! Line protocol decoding for checkpoint files.
//!
//! A checkpoint is a plain text file read top to bottom:
//!
//! ```text
//! // free-text comment
//! // subtotal
//! <command>
//! <count> [points]
//! <expected line 1> .. <expected line count>
//! <timeout time=<milliseconds>>
//! ```
//!
//! A timeout marker hands every remaining line to the bounded block; there is
//! no closing marker, so nothing after it is decoded at the top level.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ParseError;

/// Prefix shared by comments and subtotal markers.
pub const COMMENT_MARKER: &str = "//";

const SUBTOTAL_TOKEN: &str = "subtotal";
const TIMEOUT_PREFIX: &str = "<timeout";

static TIMEOUT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<timeout[^>]*?\btime\s*=\s*(\d+)[^>]*>").expect("timeout marker regex")
});

/// Whether `line` decodes as a comment, subtotal or timeout marker rather
/// than as the command of a test case.
pub fn is_marker_line(line: &str) -> bool {
    line.starts_with(COMMENT_MARKER) || is_timeout_marker(line)
}

fn is_timeout_marker(line: &str) -> bool {
    line.get(..TIMEOUT_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(TIMEOUT_PREFIX))
}

/// Owned, forward-only cursor over the lines of one checkpoint.
///
/// Moving the cursor moves the read position with it: whoever holds the
/// cursor is the only reader of the remaining lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCursor {
    lines: Vec<String>,
    pos: usize,
}

impl LineCursor {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, pos: 0 }
    }

    /// Split `text` into lines (`\n` or `\r\n`).
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines().map(str::to_string).collect())
    }

    /// Take the next line, or `None` once exhausted.
    pub fn next_line(&mut self) -> Option<String> {
        let line = self.lines.get_mut(self.pos).map(std::mem::take)?;
        self.pos += 1;
        Some(line)
    }

    /// 1-based number of the most recently taken line (0 before the first).
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.lines.len() - self.pos
    }

    /// Lazily decode the remaining lines into directives.
    pub fn directives(self) -> Directives {
        Directives {
            cursor: self,
            failed: false,
        }
    }
}

/// One scripted command with its expected output.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub command: String,
    /// Expected output, one entry per line. Empty means the case is not scored.
    pub expected_lines: Vec<String>,
    /// Value of the case, added to the total whether it passes or not.
    pub points_worth: f64,
    /// 1-based line of the command in the checkpoint.
    pub line: usize,
}

impl TestCase {
    pub fn is_scored(&self) -> bool {
        !self.expected_lines.is_empty()
    }
}

/// One decoded unit of the line protocol, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Comment text with the marker (and one following space) removed.
    Comment(String),
    Subtotal,
    Case(TestCase),
    /// Bounded block owning every line after its marker.
    Bounded { deadline: Duration, rest: LineCursor },
}

/// Iterator of directives over a [`LineCursor`].
///
/// Yields at most one `Err`; decoding stops after it.
#[derive(Debug)]
pub struct Directives {
    cursor: LineCursor,
    failed: bool,
}

impl Directives {
    /// Lines not yet decoded (always zero after a bounded block).
    pub fn remaining_lines(&self) -> usize {
        self.cursor.remaining()
    }

    fn decode(&mut self, line: String, number: usize) -> Result<Directive, ParseError> {
        if is_timeout_marker(&line) {
            let deadline = parse_deadline(&line, number)?;
            let rest = std::mem::take(&mut self.cursor);
            return Ok(Directive::Bounded { deadline, rest });
        }
        if let Some(text) = line.strip_prefix(COMMENT_MARKER) {
            if text.trim().eq_ignore_ascii_case(SUBTOTAL_TOKEN) {
                return Ok(Directive::Subtotal);
            }
            let text = text.strip_prefix(' ').unwrap_or(text);
            return Ok(Directive::Comment(text.to_string()));
        }
        self.decode_case(line, number).map(Directive::Case)
    }

    fn decode_case(&mut self, command: String, number: usize) -> Result<TestCase, ParseError> {
        let count_line = self
            .cursor
            .next_line()
            .ok_or(ParseError::MissingCount { line: number + 1 })?;
        let count_number = self.cursor.consumed();

        let mut fields = count_line.split_whitespace();
        let count: usize = fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| ParseError::BadCount {
                line: count_number,
                text: count_line.clone(),
            })?;
        let points_worth = match fields.next() {
            Some(field) => field
                .parse::<f64>()
                .ok()
                .filter(|points| points.is_finite() && *points >= 0.0)
                .ok_or_else(|| ParseError::BadPoints {
                    line: count_number,
                    text: field.to_string(),
                })?,
            None if count > 0 => 1.0,
            None => 0.0,
        };

        let available = self.cursor.remaining();
        if count > available {
            return Err(ParseError::UnexpectedEof {
                line: self.cursor.consumed() + available + 1,
                missing: count - available,
            });
        }

        let mut expected_lines = Vec::with_capacity(count);
        for index in 0..count {
            let line = self
                .cursor
                .next_line()
                .ok_or_else(|| ParseError::UnexpectedEof {
                    line: self.cursor.consumed() + 1,
                    missing: count - index,
                })?;
            expected_lines.push(line);
        }

        Ok(TestCase {
            command,
            expected_lines,
            points_worth,
            line: number,
        })
    }
}

impl Iterator for Directives {
    type Item = Result<Directive, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let line = self.cursor.next_line()?;
        let number = self.cursor.consumed();
        let decoded = self.decode(line, number);
        self.failed = decoded.is_err();
        Some(decoded)
    }
}

fn parse_deadline(line: &str, number: usize) -> Result<Duration, ParseError> {
    TIMEOUT_MARKER
        .captures(line)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(Duration::from_millis)
        .ok_or_else(|| ParseError::BadTimeout {
            line: number,
            text: line.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(text: &str) -> Vec<Result<Directive, ParseError>> {
        LineCursor::from_text(text).directives().collect()
    }

    #[test]
    fn comments_and_subtotals() {
        let decoded = decode_all("// header text\n// subtotal\n//SubTotal  \n//tight");
        assert_eq!(
            decoded,
            vec![
                Ok(Directive::Comment("header text".to_string())),
                Ok(Directive::Subtotal),
                Ok(Directive::Subtotal),
                Ok(Directive::Comment("tight".to_string())),
            ]
        );
    }

    #[test]
    fn case_defaults_points_from_count() {
        let decoded = decode_all("1/2 + 1/2\n1\n1\nhelp\n0");
        let cases: Vec<TestCase> = decoded
            .into_iter()
            .map(|directive| match directive {
                Ok(Directive::Case(case)) => case,
                other => panic!("expected case, got {other:?}"),
            })
            .collect();
        assert_eq!(cases[0].command, "1/2 + 1/2");
        assert_eq!(cases[0].expected_lines, vec!["1"]);
        assert_eq!(cases[0].points_worth, 1.0);
        assert_eq!(cases[0].line, 1);
        assert!(cases[1].expected_lines.is_empty());
        assert_eq!(cases[1].points_worth, 0.0);
        assert!(!cases[1].is_scored());
        assert_eq!(cases[1].line, 4);
    }

    #[test]
    fn explicit_points_override_default() {
        let decoded = decode_all("a\n2 2.5\nx\ny\nb\n0 3");
        match (&decoded[0], &decoded[1]) {
            (Ok(Directive::Case(first)), Ok(Directive::Case(second))) => {
                assert_eq!(first.points_worth, 2.5);
                assert_eq!(first.expected_lines, vec!["x", "y"]);
                assert_eq!(second.points_worth, 3.0);
            }
            other => panic!("expected two cases, got {other:?}"),
        }
    }

    #[test]
    fn timeout_block_takes_the_rest_of_the_file() {
        let mut directives =
            LineCursor::from_text("// before\n<timeout time=50>\nslow\n1\nok\n// after").directives();
        assert_eq!(
            directives.next(),
            Some(Ok(Directive::Comment("before".to_string())))
        );
        match directives.next() {
            Some(Ok(Directive::Bounded { deadline, rest })) => {
                assert_eq!(deadline, Duration::from_millis(50));
                assert_eq!(rest.remaining(), 4);
                assert_eq!(rest.consumed(), 2);
            }
            other => panic!("expected bounded block, got {other:?}"),
        }
        assert_eq!(directives.remaining_lines(), 0);
        assert_eq!(directives.next(), None);
    }

    #[test]
    fn timeout_marker_tolerates_extra_attributes() {
        let decoded = decode_all("<TimeoutStart limit=x time=120 note>");
        match &decoded[0] {
            Ok(Directive::Bounded { deadline, .. }) => {
                assert_eq!(*deadline, Duration::from_millis(120));
            }
            other => panic!("expected bounded block, got {other:?}"),
        }
    }

    #[test]
    fn marker_lines_are_recognised() {
        assert!(is_marker_line("// note"));
        assert!(is_marker_line("//subtotal"));
        assert!(is_marker_line("<TIMEOUT time=5>"));
        assert!(is_marker_line("<timeout"));
        assert!(!is_marker_line("1 / 2"));
        assert!(!is_marker_line(" // indented"));
        assert!(!is_marker_line("<time"));
        assert!(!is_marker_line(""));
    }

    #[test]
    fn timeout_marker_without_time_is_rejected() {
        let decoded = decode_all("<timeout>\ncmd\n0");
        assert_eq!(
            decoded,
            vec![Err(ParseError::BadTimeout {
                line: 1,
                text: "<timeout>".to_string(),
            })]
        );
    }

    #[test]
    fn bad_count_stops_decoding() {
        let decoded = decode_all("cmd\nmany\nout\n// never reached");
        assert_eq!(
            decoded,
            vec![Err(ParseError::BadCount {
                line: 2,
                text: "many".to_string(),
            })]
        );
    }

    #[test]
    fn missing_count_line_is_reported() {
        let decoded = decode_all("// ok\ncmd");
        assert_eq!(decoded[1], Err(ParseError::MissingCount { line: 3 }));
    }

    #[test]
    fn premature_end_of_expected_output() {
        let decoded = decode_all("cmd\n3\nfirst");
        assert_eq!(
            decoded,
            vec![Err(ParseError::UnexpectedEof {
                line: 4,
                missing: 2,
            })]
        );
    }

    #[test]
    fn oversized_count_is_a_parse_error() {
        let decoded = decode_all("cmd\n99999999999999999\nx");
        assert_eq!(
            decoded,
            vec![Err(ParseError::UnexpectedEof {
                line: 4,
                missing: 99_999_999_999_999_998,
            })]
        );
    }

    #[test]
    fn negative_points_are_rejected() {
        let decoded = decode_all("a\n1\na\nb\n1 -5\nb");
        assert_eq!(
            decoded[1],
            Err(ParseError::BadPoints {
                line: 5,
                text: "-5".to_string(),
            })
        );
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn bad_points_are_rejected() {
        let decoded = decode_all("cmd\n1 lots\nx");
        assert_eq!(
            decoded,
            vec![Err(ParseError::BadPoints {
                line: 2,
                text: "lots".to_string(),
            })]
        );
    }
}
