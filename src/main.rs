use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use xlesson::validator::TestCase;
use xlesson::{
    render_lesson, tokenize, InteractiveComponent, Language, Sandbox, Validator, XlessonConfig,
};

#[derive(Parser, Debug)]
#[clap(name = "xlesson", version, about = "Interactive lesson toolkit")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, global = true, help = "TOML configuration file")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the segments of a lesson as JSON
    Tokenize { lesson: PathBuf },
    /// Render a lesson to HTML
    Render { lesson: PathBuf },
    /// Execute a file in the sandbox and print the result as JSON
    Run {
        file: PathBuf,
        #[clap(long, short, help = "javascript, html or css; guessed from the extension if absent")]
        language: Option<String>,
    },
    /// Validate code against a YAML/JSON list of test cases
    Validate {
        code: PathBuf,
        #[clap(long, short)]
        tests: PathBuf,
    },
    /// Report malformed directives and grade every JavaScript solution against its tests
    Check { lesson: PathBuf },
    /// Run one sandbox job read from stdin and write its outcome to stdout
    #[clap(hide = true)]
    Worker,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn language_for(path: &Path, flag: Option<&str>) -> Result<Language> {
    let tag = match flag {
        Some(tag) => tag.to_string(),
        None => path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext {
                "js" | "mjs" | "cjs" => "javascript".to_string(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "javascript".to_string()),
    };
    Ok(tag.parse::<Language>()?)
}

/// `(id, solution, tests)` for every exercise and challenge with a JavaScript solution.
fn gradable(
    component_id: &str,
    component: &InteractiveComponent,
) -> Option<(String, String, Vec<TestCase>)> {
    match component {
        InteractiveComponent::Exercise(exercise)
            if matches!(exercise.language.as_str(), "javascript" | "js") =>
        {
            exercise
                .solution
                .clone()
                .map(|solution| (component_id.to_string(), solution, exercise.test_cases.clone()))
        }
        InteractiveComponent::Challenge(challenge) => challenge
            .solution
            .get("javascript")
            .or_else(|| challenge.solution.get("js"))
            .map(|solution| {
                (
                    component_id.to_string(),
                    solution.clone(),
                    challenge.test_cases.clone(),
                )
            }),
        _ => None,
    }
}

async fn check(lesson_path: &Path, config: &XlessonConfig) -> Result<()> {
    let lesson = render_lesson(&read(lesson_path)?);
    let mut problems = 0usize;

    for (id, error) in lesson.diagnostics() {
        problems += 1;
        println!("{id}: {error}");
    }

    let sandbox = Arc::new(Sandbox::new(config.sandbox.clone()));
    let validator = Validator::with_config(sandbox, config.validator.clone());
    for (id, solution, tests) in lesson
        .components()
        .filter_map(|(id, component)| gradable(id, component))
    {
        if tests.is_empty() {
            continue;
        }
        let report = validator.validate(&solution, &tests).await;
        println!("{id}: {}/{} test cases pass", report.passed_count, report.total_count);
        for verdict in report.verdicts.iter().filter(|v| !v.passed) {
            problems += 1;
            match &verdict.error {
                Some(error) => println!("  - {}: {error}", verdict.description),
                None => println!(
                    "  - {}: got {}",
                    verdict.description,
                    verdict
                        .actual_output
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                ),
            }
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found in {}", lesson_path.display());
    }
    info!(lesson = %lesson_path.display(), "lesson ok");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // a worker's stderr is discarded by its parent
    if !matches!(cli.command, Commands::Worker) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match &cli.config {
        Some(path) => XlessonConfig::load(path)?,
        None => XlessonConfig::default(),
    };

    match cli.command {
        Commands::Tokenize { lesson } => {
            let document = tokenize(&read(&lesson)?);
            println!("{}", serde_json::to_string_pretty(document.segments())?);
        }
        Commands::Render { lesson } => {
            print!("{}", render_lesson(&read(&lesson)?).to_html());
        }
        Commands::Run { file, language } => {
            let language = language_for(&file, language.as_deref())?;
            let sandbox = Sandbox::new(config.sandbox.clone());
            let result = sandbox.execute(&read(&file)?, language).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Validate { code, tests } => {
            let cases: Vec<TestCase> = serde_saphyr::from_str(&read(&tests)?).map_err(|e| {
                anyhow::anyhow!("{} is not a list of test cases: {e}", tests.display())
            })?;
            let sandbox = Arc::new(Sandbox::new(config.sandbox.clone()));
            let validator = Validator::with_config(sandbox, config.validator.clone());
            let report = validator.validate(&read(&code)?, &cases).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.all_passed() {
                std::process::exit(1);
            }
        }
        Commands::Check { lesson } => check(&lesson, &config).await?,
        Commands::Worker => xlesson::sandbox::serve_worker().context("worker protocol failed")?,
    }

    Ok(())
}
