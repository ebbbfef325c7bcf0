use std::fmt;
use std::path::PathBuf;

use quml_core::model::{QuestionDraft, SectionId};
use serde::Deserialize;
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    file: PathBuf,
    section: Option<SectionId>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFile,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidSection { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFile => write!(f, "--file is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSection { raw } => write!(f, "invalid --section value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUML_DB_URL").unwrap_or_else(|_| "sqlite:questions.sqlite3?mode=rwc".into());
        let mut file = std::env::var("QUML_SEED_FILE").ok().map(PathBuf::from);
        let mut section = std::env::var("QUML_SECTION")
            .ok()
            .and_then(|raw| raw.parse::<SectionId>().ok());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--section" => {
                    let value = require_value(&mut args, "--section")?;
                    section = Some(
                        value
                            .parse::<SectionId>()
                            .map_err(|_| ArgsError::InvalidSection { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            file: file.ok_or(ArgsError::MissingFile)?,
            section,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --file <questions.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:questions.sqlite3?mode=rwc)");
    eprintln!("  --file <path>             JSON file: an array of questions, or");
    eprintln!("                            {{\"section\": \"..\", \"questions\": [..]}}");
    eprintln!("  --section <id>            Section to file the questions under");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUML_DB_URL, QUML_SEED_FILE, QUML_SECTION");
}

/// Accepted shapes of the seed file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Bare(Vec<QuestionDraft>),
    Section {
        section: Option<SectionId>,
        questions: Vec<QuestionDraft>,
    },
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let raw = tokio::fs::read_to_string(&args.file).await?;
    let (file_section, drafts) = match serde_json::from_str::<SeedFile>(&raw)? {
        SeedFile::Bare(questions) => (None, questions),
        SeedFile::Section { section, questions } => (section, questions),
    };
    let section = args.section.or(file_section);

    let storage = Storage::sqlite(&args.db_url).await?;
    let mut seeded = 0_usize;
    for draft in drafts {
        let question = draft.validate()?;
        tracing::debug!(question_id = %question.id(), "upserting question");
        storage
            .bank
            .upsert_question(&question, section.as_ref())
            .await?;
        seeded += 1;
    }

    tracing::info!(
        count = seeded,
        section = section.as_ref().map(SectionId::as_str),
        db = %args.db_url,
        "seeded questions"
    );
    println!("Seeded {seeded} questions into {}", args.db_url);

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
