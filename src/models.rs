use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Disability-category answer that routes a student to the Olympiad cohort.
pub const STANDARD_CATEGORY: &str = "Não possui deficiência/transtorno";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Answer in the disability-category column that marks the standard cohort
    pub standard_category: String,
    /// Literal top-N taken from each (school, grade) group before tie expansion
    pub places_per_group: usize,
    pub output_directory: String,
    pub paralympic_output_file: String,
    pub olympic_output_file: String,
    pub columns: ColumnMapping,
}

/// Labels of the required input columns, in output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub grade: String,
    pub name: String,
    pub school: String,
    pub municipality: String,
    pub score: String,
    pub time: String,
    pub disability_category: String,
    pub teacher: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            standard_category: STANDARD_CATEGORY.to_string(),
            places_per_group: 2,
            output_directory: "output".to_string(),
            paralympic_output_file: "Paralimpiada.csv".to_string(),
            olympic_output_file: "Olimpiada.csv".to_string(),
            columns: ColumnMapping::default(),
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            grade: "Ano escolar do aluno:".to_string(),
            name: "Nome do aluno".to_string(),
            school: "Nome da escola onde você atua".to_string(),
            municipality: "Qual o município?".to_string(),
            score: "Quantos pontos o aluno fez?".to_string(),
            time: "Quanto tempo de realização?".to_string(),
            disability_category: "Se for aluno com deficiência/transtorno, escolha a categoria da Olimpíada que o(a) aluno(a) se encaixa:".to_string(),
            teacher: "Escreva o nome do professor representante".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.places_per_group == 0 {
            anyhow::bail!("places_per_group must be at least 1");
        }
        Ok(())
    }
}

impl ColumnMapping {
    /// Column labels in the fixed input/output order.
    pub fn labels(&self) -> [&str; 8] {
        [
            &self.grade,
            &self.name,
            &self.school,
            &self.municipality,
            &self.score,
            &self.time,
            &self.disability_category,
            &self.teacher,
        ]
    }
}

/// The two disjoint partitions of the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cohort {
    Paralympic,
    Olympic,
}

impl Cohort {
    pub fn label(self) -> &'static str {
        match self {
            Cohort::Paralympic => "Paralimpíada",
            Cohort::Olympic => "Olimpíada",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub grade: String,
    pub name: String,
    pub school: String,
    pub municipality: String,
    /// `None` for a blank score cell, which ranks below every numeric score
    pub score: Option<f64>,
    /// Score exactly as it appeared in the input, used for export
    pub score_text: String,
    pub raw_time: Option<String>,
    pub disability_category: Option<String>,
    pub teacher: String,
}

impl StudentRecord {
    pub fn normalized_time(&self) -> NormalizedTime {
        normalize_time(self.raw_time.as_deref())
    }

    /// Missing categories never match, so they land in the Paralympic cohort.
    pub fn cohort(&self, standard_category: &str) -> Cohort {
        match self.disability_category.as_deref() {
            Some(category) if category == standard_category => Cohort::Olympic,
            _ => Cohort::Paralympic,
        }
    }

    /// Same row once parsed: scores compare by value, not by spelling.
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.grade == other.grade
            && self.name == other.name
            && self.school == other.school
            && self.municipality == other.municipality
            && self.score == other.score
            && self.raw_time == other.raw_time
            && self.disability_category == other.disability_category
            && self.teacher == other.teacher
    }

    /// Raw time text, or empty when it does not normalize to a known value.
    pub fn time_for_output(&self) -> &str {
        if self.normalized_time().is_unknown() {
            return "";
        }
        self.raw_time.as_deref().unwrap_or("")
    }

    /// Fields in the same order as [`ColumnMapping::labels`].
    pub fn output_fields(&self) -> [&str; 8] {
        [
            &self.grade,
            &self.name,
            &self.school,
            &self.municipality,
            self.score.map_or("", |_| self.score_text.as_str()),
            self.time_for_output(),
            self.disability_category.as_deref().unwrap_or(""),
            &self.teacher,
        ]
    }
}

/// Completion time on a comparable scale.
///
/// `Unknown` is the worst possible time: it orders after every known value.
/// Two unknown times compare equal for sorting but never match for tie checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedTime {
    Seconds(f64),
    Unknown,
}

impl NormalizedTime {
    pub fn seconds(self) -> Option<f64> {
        match self {
            NormalizedTime::Seconds(value) => Some(value),
            NormalizedTime::Unknown => None,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, NormalizedTime::Unknown)
    }

    /// Ascending order with unknown as the maximal sentinel.
    pub fn cmp_ascending(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NormalizedTime::Seconds(a), NormalizedTime::Seconds(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (NormalizedTime::Seconds(_), NormalizedTime::Unknown) => Ordering::Less,
            (NormalizedTime::Unknown, NormalizedTime::Seconds(_)) => Ordering::Greater,
            (NormalizedTime::Unknown, NormalizedTime::Unknown) => Ordering::Equal,
        }
    }
}

/// Convert a raw completion time into seconds.
///
/// Accepts `m:ss` (both parts integers) or a plain number of seconds.
/// Anything else, including blank input, is `Unknown`.
pub fn normalize_time(raw: Option<&str>) -> NormalizedTime {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return NormalizedTime::Unknown,
    };

    if let Some((minutes, seconds)) = text.split_once(':') {
        return match (minutes.trim().parse::<i64>(), seconds.trim().parse::<i64>()) {
            (Ok(minutes), Ok(seconds)) => {
                NormalizedTime::Seconds(minutes as f64 * 60.0 + seconds as f64)
            }
            _ => NormalizedTime::Unknown,
        };
    }

    match text.parse::<f64>() {
        Ok(value) if !value.is_nan() => NormalizedTime::Seconds(value),
        _ => NormalizedTime::Unknown,
    }
}

/// Parse a score cell, accepting a decimal comma.
pub fn parse_score(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| !value.is_nan())
}
