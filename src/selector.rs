use crate::models::{Cohort, Config, NormalizedTime, StudentRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Winners of one (school, grade) group.
#[derive(Debug, Clone)]
pub struct GroupSelection {
    pub school: String,
    pub grade: String,
    pub group_size: usize,
    /// Ranked winners: the literal top-N followed by tie-expanded records
    pub selected: Vec<StudentRecord>,
    pub tie_expanded: usize,
}

#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub cohort: Cohort,
    pub groups: Vec<GroupSelection>,
}

impl SelectionResult {
    /// Selected records of every group, in group order.
    pub fn records(&self) -> impl Iterator<Item = &StudentRecord> {
        self.groups.iter().flat_map(|group| group.selected.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.selected.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A record paired with its normalized time, computed once per selection.
struct RankedRecord<'r> {
    record: &'r StudentRecord,
    time: NormalizedTime,
}

pub struct CohortSelector<'a> {
    pub config: &'a Config,
}

impl<'a> CohortSelector<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Select the winners of every (school, grade) group of a cohort.
    pub fn select(&self, cohort: Cohort, records: &[StudentRecord]) -> SelectionResult {
        let groups = group_by_school_and_grade(records)
            .into_iter()
            .map(|((school, grade), members)| self.select_group(school, grade, members))
            .collect::<Vec<_>>();

        let result = SelectionResult { cohort, groups };
        tracing::info!(
            cohort = cohort.label(),
            records = records.len(),
            groups = result.groups.len(),
            selected = result.len(),
            "Cohort selection finished"
        );
        result
    }

    fn select_group(
        &self,
        school: String,
        grade: String,
        members: Vec<&StudentRecord>,
    ) -> GroupSelection {
        let places = self.config.places_per_group;
        let group_size = members.len();

        let mut ranked: Vec<RankedRecord> = members
            .into_iter()
            .map(|record| RankedRecord {
                time: record.normalized_time(),
                record,
            })
            .collect();
        ranked.sort_by(compare_ranked);

        let selected: Vec<StudentRecord> = if ranked.len() <= places {
            ranked.iter().map(|entry| entry.record.clone()).collect()
        } else {
            let top = &ranked[..places];

            // Boundary of the literal top-N: its lowest known score and slowest known time
            let score_ref = top
                .iter()
                .filter_map(|entry| entry.record.score)
                .reduce(f64::min);
            let time_ref = top
                .iter()
                .filter_map(|entry| entry.time.seconds())
                .reduce(f64::max);

            // Only an exact tie on both score and time extends the selection
            let tied = ranked.iter().filter(|entry| {
                score_ref.is_some_and(|score_ref| entry.record.score == Some(score_ref))
                    && time_ref.is_some_and(|time_ref| entry.time.seconds() == Some(time_ref))
            });

            let mut selected: Vec<StudentRecord> = Vec::new();
            for entry in top.iter().chain(tied) {
                if !selected.iter().any(|kept| kept.is_duplicate_of(entry.record)) {
                    selected.push(entry.record.clone());
                }
            }
            selected
        };

        let tie_expanded = selected.len().saturating_sub(places);
        tracing::debug!(
            school = %school,
            grade = %grade,
            group_size,
            selected = selected.len(),
            tie_expanded,
            "Selected group winners"
        );

        GroupSelection {
            school,
            grade,
            group_size,
            selected,
            tie_expanded,
        }
    }
}

/// Score descending with blank scores last, then time ascending with unknown times last.
fn compare_ranked(a: &RankedRecord, b: &RankedRecord) -> Ordering {
    let by_score = match (a.record.score, b.record.score) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then_with(|| a.time.cmp_ascending(&b.time))
}

/// Groups keyed by (school, grade), iterated in ascending key order.
fn group_by_school_and_grade(
    records: &[StudentRecord],
) -> BTreeMap<(String, String), Vec<&StudentRecord>> {
    let mut groups: BTreeMap<(String, String), Vec<&StudentRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.school.clone(), record.grade.clone()))
            .or_default()
            .push(record);
    }
    groups
}
