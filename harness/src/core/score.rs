//! Score bookkeeping and summary lines for one checkpoint run.

use serde::Serialize;

/// Running counters for one scoring pass.
///
/// `points`/`total` only grow within a pass; the section pair is reset at each
/// subtotal marker and at the start of a bounded block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub points: f64,
    pub total: f64,
    pub section_points: f64,
    pub section_total: f64,
}

/// Score of one closed section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub earned: f64,
    pub possible: f64,
}

impl Tally {
    /// Count a case towards the totals; only passing cases earn points.
    pub fn record_case(&mut self, points_worth: f64, passed: bool) {
        self.total += points_worth;
        self.section_total += points_worth;
        if passed {
            self.points += points_worth;
            self.section_points += points_worth;
        }
    }

    /// Close the current section and start a new one at zero.
    pub fn close_section(&mut self) -> Section {
        let section = Section {
            earned: self.section_points,
            possible: self.section_total,
        };
        self.section_points = 0.0;
        self.section_total = 0.0;
        section
    }

    /// Fold a bounded block's earned points in as a section of its own.
    ///
    /// The block's possible score is unknown, so it counts as what it earned.
    pub fn fold_block(&mut self, earned: f64) -> Section {
        self.close_section();
        self.record_case(earned, true);
        Section {
            earned: self.section_points,
            possible: self.section_total,
        }
    }

    /// Observer line printed when a section closes.
    pub fn subtotal_line(&self, section: Section) -> String {
        format!(
            "\tSection Sub-Total: {:.1} / {:.1}\t\tTOTAL: {:.1} / {:.1}",
            section.earned, section.possible, self.points, self.total
        )
    }

    pub fn score_line(&self) -> String {
        format!("SCORE: {:.1} / {:.1}", self.points, self.total)
    }
}

/// Ordered, human-readable summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Summary {
    lines: Vec<String>,
}

impl Summary {
    /// Append a comment and return the stored line.
    pub fn push_comment(&mut self, text: &str) -> &str {
        self.lines.push(format!("\t{text}"));
        self.lines.last().map(String::as_str).unwrap_or_default()
    }

    /// Prefix the latest line (the comment heading the section) with the section score.
    pub fn attach_section(&mut self, section: Section, tally: &Tally) {
        let heading = self.lines.pop().unwrap_or_default();
        self.lines.push(format!(
            "\t{:.1} / {:.1}\tTOTAL: {:.1} / {:.1}\t{heading}",
            section.earned, section.possible, tally.points, tally.total
        ));
    }

    pub fn push_score(&mut self, tally: &Tally) {
        self.lines.push(tally.score_line());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
