use std::io::Write;

use anyhow::Result;
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use rulematch_similarity::{MatchCandidate, RankingReport, RankingSummary, ValueMatch};

/// Color scheme for ranking output.
struct Colors;

impl Colors {
    const HEADER: Color = Color::Magenta;
    const TITLE: Color = Color::Cyan;
    const SCORE: Color = Color::Green;
    const MATCH: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
}

/// Candidate values shown per match.
const VALUE_PREVIEW: usize = 5;

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let inner: Vec<String> = items.iter().map(|s| format!("'{}'", s.as_ref())).collect();
    format!("[{}]", inner.join(", "))
}

/// Writes ranking reports to a terminal or any other writer.
pub struct Terminal<W: Write> {
    out: W,
    color: bool,
    show_rule: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            show_rule: false,
        }
    }

    /// Also print each match's stored rule document.
    pub fn with_rule_dump(mut self, show_rule: bool) -> Self {
        self.show_rule = show_rule;
        self
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn paint(&mut self, color: Color, text: impl std::fmt::Display) -> Result<()> {
        if self.color {
            queue!(self.out, SetForegroundColor(color), Print(text), ResetColor)?;
        } else {
            queue!(self.out, Print(text))?;
        }
        Ok(())
    }

    fn plain(&mut self, text: impl std::fmt::Display) -> Result<()> {
        queue!(self.out, Print(text))?;
        Ok(())
    }

    /// Print the query rule's extracted components.
    pub fn print_query(&mut self, fields: &[String], values: &[String]) -> Result<()> {
        self.paint(Colors::HEADER, "Extracted from rule:\n")?;
        self.plain(format!("   Fields: {}\n", quoted_list(fields)))?;
        self.plain(format!("   Values: {}\n", quoted_list(values)))?;
        self.paint(Colors::DIM, format!("{}\n", "-".repeat(60)))?;
        self.out.flush()?;
        Ok(())
    }

    /// Print the ranked matches, each optionally followed by its value
    /// explanations.
    pub fn print_matches(
        &mut self,
        report: &RankingReport,
        top_n: usize,
        explanations: &[Vec<ValueMatch>],
    ) -> Result<()> {
        self.paint(
            Colors::DIM,
            format!("Scanned {} rules from {}", report.scanned, report.store),
        )?;
        if report.skipped > 0 {
            self.paint(Colors::DIM, format!(" ({} skipped)", report.skipped))?;
        }
        self.plain("\n\n")?;
        self.paint(Colors::HEADER, format!("TOP {} MOST SIMILAR RULES:\n", top_n))?;
        self.paint(Colors::DIM, format!("{}\n", "=".repeat(80)))?;

        for (rank, m) in report.matches.iter().enumerate() {
            self.print_match(rank + 1, m, explanations.get(rank).map(Vec::as_slice))?;
        }

        self.out.flush()?;
        Ok(())
    }

    fn print_match(
        &mut self,
        rank: usize,
        m: &MatchCandidate,
        explained: Option<&[ValueMatch]>,
    ) -> Result<()> {
        self.paint(Colors::TITLE, format!("\n{}. {}\n", rank, m.title))?;
        self.plain(format!("   Rule ID: {}\n", m.id))?;
        if let Some(source) = &m.source {
            self.paint(Colors::DIM, format!("   Source: {}\n", source))?;
        }
        self.paint(
            Colors::SCORE,
            format!("   Weighted similarity: {}\n", percent(m.weighted_similarity)),
        )?;
        self.plain(format!("   Value similarity:    {}\n", percent(m.value_similarity)))?;
        self.plain(format!("   Field similarity:    {}\n", percent(m.field_similarity)))?;
        self.plain(format!("   Fields: {}\n", quoted_list(&m.fields)))?;

        let preview = &m.values[..m.values.len().min(VALUE_PREVIEW)];
        let more = if m.values.len() > VALUE_PREVIEW { "..." } else { "" };
        self.plain(format!("   Values: {}{}\n", quoted_list(preview), more))?;

        if let Some(explained) = explained.filter(|e| !e.is_empty()) {
            self.paint(Colors::MATCH, "   Best value matches:\n")?;
            for v in explained {
                self.plain(format!(
                    "      '{}' <-> '{}' ({})\n",
                    v.query_value,
                    v.matched_value,
                    percent(v.score)
                ))?;
            }
        }

        if self.show_rule && !m.rule.is_null() {
            self.paint(Colors::MATCH, "   Rule:\n")?;
            let yaml = serde_yaml::to_string(&m.rule)?;
            for line in yaml.lines() {
                self.plain(format!("      {}\n", line))?;
            }
        }

        self.paint(Colors::DIM, format!("{}\n", "-".repeat(60)))?;
        Ok(())
    }

    /// Print highest, lowest and average weighted similarity, or a notice
    /// when nothing cleared the threshold.
    pub fn print_summary(&mut self, summary: Option<&RankingSummary>) -> Result<()> {
        match summary {
            Some(s) => {
                self.paint(Colors::HEADER, "\nSUMMARY:\n")?;
                self.plain(format!("   Highest similarity: {}\n", percent(s.highest)))?;
                self.plain(format!("   Lowest similarity:  {}\n", percent(s.lowest)))?;
                self.plain(format!("   Average similarity: {}\n", percent(s.average)))?;
            }
            None => {
                self.paint(Colors::ERROR, "\nNo similar rules found.\n")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Print a JSON document as-is.
    pub fn print_json(&mut self, json: &str) -> Result<()> {
        self.plain(format!("{}\n", json))?;
        self.out.flush()?;
        Ok(())
    }
}
