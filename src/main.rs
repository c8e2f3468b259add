mod error;
mod export;
mod models;
mod roster;
mod selector;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use models::{Cohort, Config};
use roster::RosterReader;
use selector::{CohortSelector, SelectionResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Everything one run produced, kept for the terminal summary.
struct SelectionOutcome {
    roster_size: usize,
    ignored_columns: Vec<String>,
    paralympic: SelectionResult,
    olympic: SelectionResult,
    paralympic_path: PathBuf,
    olympic_path: PathBuf,
}

fn main() {
    let matches = Command::new("olympiad-selector")
        .version("0.1")
        .about("Selects the top students per school and grade for the Olympiad and Paralympiad")
        .arg(
            Arg::new("input")
                .value_name("CSV")
                .help("Roster CSV exported from the registration form")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (created with defaults if missing)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for Paralimpiada.csv and Olimpiada.csv"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Do not print the selected students"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    if let Err(err) = run(&matches) {
        println!("❌ Error processing the file: {:#}", err);
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches.get_one::<String>("config"))?;

    let input = matches
        .get_one::<String>("input")
        .context("an input CSV file is required")?;
    let output_dir = matches
        .get_one::<String>("output-dir")
        .cloned()
        .unwrap_or_else(|| config.output_directory.clone());

    println!("📂 Reading roster from: {}", input);
    let outcome = process_roster(&config, Path::new(input), Path::new(&output_dir))?;
    println!("✅ File loaded: {} students", outcome.roster_size);
    if !outcome.ignored_columns.is_empty() {
        println!("   ℹ️  Ignored {} extra columns", outcome.ignored_columns.len());
    }

    if !matches.get_flag("quiet") {
        for result in [&outcome.paralympic, &outcome.olympic] {
            println!("\n🏅 Selected students - {}", result.cohort.label());
            if result.is_empty() {
                println!("   (no students in this cohort)");
            } else {
                println!("{}", export::selection_table(result, &config.columns));
            }
        }
    }

    print_summary(&outcome);
    Ok(())
}

fn load_config(config_file: Option<&String>) -> Result<Config> {
    let Some(config_file) = config_file else {
        return Ok(Config::default());
    };

    if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write configuration: {}", config_file))?;
        Ok(default_config)
    }
}

/// Read, split, select and export. Nothing is written unless both cohorts were selected.
fn process_roster(config: &Config, input: &Path, output_dir: &Path) -> Result<SelectionOutcome> {
    let roster = RosterReader::new(&config.columns)
        .read_file(input)
        .with_context(|| format!("Failed to read roster: {}", input.display()))?;

    let split = roster.split_cohorts(&config.standard_category);
    let selector = CohortSelector::new(config);
    let paralympic = selector.select(Cohort::Paralympic, &split.paralympic);
    let olympic = selector.select(Cohort::Olympic, &split.olympic);

    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;
    let paralympic_path = output_dir.join(&config.paralympic_output_file);
    let olympic_path = output_dir.join(&config.olympic_output_file);
    export::write_selection_files(
        &[
            (&paralympic, paralympic_path.as_path()),
            (&olympic, olympic_path.as_path()),
        ],
        &config.columns,
    )?;

    Ok(SelectionOutcome {
        roster_size: roster.records.len(),
        ignored_columns: roster.ignored_columns,
        paralympic,
        olympic,
        paralympic_path,
        olympic_path,
    })
}

fn print_summary(outcome: &SelectionOutcome) {
    println!("\n📊 SUMMARY");
    println!("==========\n");

    for (result, path) in [
        (&outcome.paralympic, &outcome.paralympic_path),
        (&outcome.olympic, &outcome.olympic_path),
    ] {
        println!(
            "   {}: {} selected from {} school/grade groups",
            result.cohort.label(),
            result.len(),
            result.groups.len()
        );
        for group in result.groups.iter().filter(|group| group.tie_expanded > 0) {
            println!(
                "      🔗 {} / {}: {} of {} qualified ({} through exact ties)",
                group.school,
                group.grade,
                group.selected.len(),
                group.group_size,
                group.tie_expanded
            );
        }
        println!("      💾 {}", path.display());
    }

    println!("\n✅ Selection complete!");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STANDARD_CATEGORY;

    const HEADER: &str = "Carimbo de data/hora,Ano escolar do aluno:,Nome do aluno,Nome da escola onde você atua,Qual o município?,Quantos pontos o aluno fez?,Quanto tempo de realização?,\"Se for aluno com deficiência/transtorno, escolha a categoria da Olimpíada que o(a) aluno(a) se encaixa:\",Escreva o nome do professor representante";

    fn roster_csv() -> String {
        let rows = [
            format!("t1,6º ano,Ana,EE Centro,Natal,10,1:40,{STANDARD_CATEGORY},Prof. Lima"),
            format!("t2,6º ano,Bia,EE Centro,Natal,10,100,{STANDARD_CATEGORY},Prof. Lima"),
            format!("t3,6º ano,Caio,EE Centro,Natal,10,100,{STANDARD_CATEGORY},Prof. Lima"),
            format!("t4,6º ano,Davi,EE Centro,Natal,8,50,{STANDARD_CATEGORY},Prof. Lima"),
            "t5,6º ano,Eva,EE Centro,Natal,9,abc,TEA,Prof. Lima".to_string(),
            "t6,6º ano,Fábio,EE Centro,Natal,7,,,Prof. Lima".to_string(),
            "t7,6º ano,Gil,EE Centro,Natal,5,30,TDAH,Prof. Lima".to_string(),
        ];
        format!("{HEADER}\n{}\n", rows.join("\n"))
    }

    #[test]
    fn test_process_roster_writes_both_cohorts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roster.csv");
        fs::write(&input, roster_csv()).unwrap();
        let output_dir = dir.path().join("out");

        let outcome = process_roster(&Config::default(), &input, &output_dir).unwrap();
        assert_eq!(outcome.roster_size, 7);
        assert_eq!(outcome.ignored_columns, vec!["Carimbo de data/hora"]);
        assert_eq!(outcome.olympic.len(), 3);
        assert_eq!(outcome.paralympic.len(), 2);

        let olympic = fs::read_to_string(output_dir.join("Olimpiada.csv")).unwrap();
        let lines: Vec<&str> = olympic.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Ano escolar do aluno:,"));
        assert!(!olympic.contains("Carimbo"));
        assert!(!olympic.contains("Davi"));

        let paralympic = fs::read_to_string(output_dir.join("Paralimpiada.csv")).unwrap();
        let lines: Vec<&str> = paralympic.lines().collect();
        assert_eq!(lines[1], "6º ano,Eva,EE Centro,Natal,9,,TEA,Prof. Lima");
        assert_eq!(lines[2], "6º ano,Fábio,EE Centro,Natal,7,,,Prof. Lima");
        assert!(!paralympic.contains("Gil"));
    }

    #[test]
    fn test_process_roster_missing_columns_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roster.csv");
        fs::write(&input, "Nome do aluno,Quantos pontos o aluno fez?\nAna,10\n").unwrap();
        let output_dir = dir.path().join("out");

        let err = process_roster(&Config::default(), &input, &output_dir)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<error::SelectionError>(),
            Some(error::SelectionError::MissingColumns { .. })
        ));
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_process_roster_invalid_score_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roster.csv");
        let content = format!("{HEADER}\nt1,6º ano,Ana,EE,Natal,muitos,,,Prof\n");
        fs::write(&input, content).unwrap();
        let output_dir = dir.path().join("out");

        let err = process_roster(&Config::default(), &input, &output_dir)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("invalid score 'muitos'"));
        assert!(!output_dir.exists());
    }

    #[test]
    fn test_process_roster_unwritable_olympic_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roster.csv");
        fs::write(&input, roster_csv()).unwrap();
        let output_dir = dir.path().join("out");
        let config = Config {
            olympic_output_file: "no/such/dir/Olimpiada.csv".to_string(),
            ..Config::default()
        };

        assert!(process_roster(&config, &input, &output_dir).is_err());
        assert!(!output_dir.join("Paralimpiada.csv").exists());
    }

    #[test]
    fn test_process_roster_blank_scores_and_trailer_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roster.csv");
        let content = format!(
            "{HEADER}\nt1,6º ano,Ana,EE,Natal,10,,TEA,P\nt2,6º ano,Bia,EE,Natal,,,TEA,P\nt3,6º ano,Caio,EE,Natal,4,,TEA,P\n,,,,,,,,\n"
        );
        fs::write(&input, content).unwrap();
        let output_dir = dir.path().join("out");

        let outcome = process_roster(&Config::default(), &input, &output_dir).unwrap();
        assert_eq!(outcome.roster_size, 3);

        let paralympic = fs::read_to_string(output_dir.join("Paralimpiada.csv")).unwrap();
        let lines: Vec<&str> = paralympic.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",Ana,"));
        assert!(lines[2].contains(",Caio,"));
    }

    #[test]
    fn test_load_config_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        let path_string = path.to_str().unwrap().to_string();

        let config = load_config(Some(&path_string)).unwrap();
        assert_eq!(config.places_per_group, 2);
        assert!(path.exists());

        let reloaded = load_config(Some(&path_string)).unwrap();
        assert_eq!(reloaded.olympic_output_file, config.olympic_output_file);
    }
}
