//! Prediction accuracy metrics

use serde::Serialize;

use super::event::{EventRecord, Selection};

/// Aggregate statistics over a set of commit events
///
/// Rates are `None` when their denominator is zero; `has_commits` and
/// `has_valid_selections` tell the caller which block is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub total_commits: usize,
    pub total_selections: usize,
    pub raw_input_commits: usize,

    pub first_choice_count: usize,
    pub top3_count: usize,
    pub first_choice_hit_rate: Option<f64>,
    pub top3_hit_rate: Option<f64>,
    pub average_rank: Option<f64>,
    pub overall_accuracy_score: Option<f64>,
    pub direct_input_rate: Option<f64>,

    pub has_valid_selections: bool,
    pub has_commits: bool,
}

impl AnalysisResult {
    /// Computes the metrics in a single pass over `records`
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut acc = MetricsAccumulator::default();
        for record in records {
            acc.push(record);
        }
        acc.finish()
    }
}

/// Running sums for [`AnalysisResult`], fed one record at a time
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    total_commits: usize,
    total_selections: usize,
    raw_input_commits: usize,
    first_choice_count: usize,
    top3_count: usize,
    rank_sum: f64,
    accuracy_sum: f64,
}

impl MetricsAccumulator {
    pub fn push(&mut self, record: &EventRecord) {
        self.total_commits += 1;

        match record.selection() {
            Selection::Candidate(rank) => {
                self.total_selections += 1;
                let rank_f = rank as f64;
                self.rank_sum += rank_f;
                self.accuracy_sum += 1.0 / (rank_f + 1.0);
                if rank == 0 {
                    self.first_choice_count += 1;
                }
                if rank < 3 {
                    self.top3_count += 1;
                }
            }
            Selection::Direct => self.raw_input_commits += 1,
            Selection::Unranked => {}
        }
    }

    pub fn finish(self) -> AnalysisResult {
        let has_commits = self.total_commits > 0;
        let has_valid_selections = self.total_selections > 0;

        let mut result = AnalysisResult {
            total_commits: self.total_commits,
            total_selections: self.total_selections,
            raw_input_commits: self.raw_input_commits,
            first_choice_count: self.first_choice_count,
            top3_count: self.top3_count,
            has_commits,
            has_valid_selections,
            ..Default::default()
        };

        if has_commits {
            result.direct_input_rate =
                Some(percent(self.raw_input_commits, self.total_commits));
        }

        if has_valid_selections {
            let selections = self.total_selections as f64;
            result.first_choice_hit_rate =
                Some(percent(self.first_choice_count, self.total_selections));
            result.top3_hit_rate = Some(percent(self.top3_count, self.total_selections));
            result.average_rank = Some(self.rank_sum / selections);
            result.overall_accuracy_score = Some(self.accuracy_sum / selections);
        }

        result
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}
