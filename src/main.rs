use anyhow::{Context, Result};
use clap::Parser;
use concierge::config::Config;
use concierge::secrets::Secrets;
use concierge::sources::{CourseLoader, GuidelineResolver, SheetsClient, courses_from_text};
use concierge::{Assistant, llm::GeminiConnector};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "concierge",
    about = "Childcare concierge — answers parenting questions and recommends courses"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "concierge.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        question: String,

        /// Guideline document to use instead of the bundled one
        #[arg(long)]
        guidelines: Option<PathBuf>,

        /// Course CSV to use instead of Google Sheets / the bundled file
        #[arg(long)]
        courses: Option<PathBuf>,
    },

    /// Interactive session: one question per line, Ctrl-D to quit
    Chat {
        /// Guideline document to use instead of the bundled one
        #[arg(long)]
        guidelines: Option<PathBuf>,

        /// Course CSV to use instead of Google Sheets / the bundled file
        #[arg(long)]
        courses: Option<PathBuf>,
    },

    /// List models the API key can use for generation
    Models,

    /// Print the resolved course table
    Courses,
}

/// Course table and guidelines handed to every question in a session.
struct SessionContext {
    courses: Option<String>,
    guidelines: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info".parse().unwrap()),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;
    cfg.validate()?;
    let secrets = Secrets::from_sources(&cfg.data.secrets_path);
    let assistant = Assistant::from_config(&cfg, secrets.clone());

    match cli.command {
        Command::Ask {
            question,
            guidelines,
            courses,
        } => {
            let ctx = load_context(&cfg, &secrets, courses.as_deref(), guidelines.as_deref()).await?;
            let answer = assistant
                .generate_response(&question, ctx.courses.as_deref(), ctx.guidelines.as_deref())
                .await?;
            println!("{answer}");
            Ok(())
        }
        Command::Chat {
            guidelines,
            courses,
        } => {
            let ctx = load_context(&cfg, &secrets, courses.as_deref(), guidelines.as_deref()).await?;
            chat(&assistant, &ctx).await
        }
        Command::Models => {
            for name in assistant.list_models().await? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Courses => {
            match course_loader(&cfg, &secrets)?.load_course_data().await {
                Some(table) => print!("{table}"),
                None => eprintln!("No course data available"),
            }
            Ok(())
        }
    }
}

fn course_loader(cfg: &Config, secrets: &Secrets) -> Result<CourseLoader> {
    let sheets = SheetsClient::new(&cfg.sheets, Duration::from_secs(cfg.llm.timeout_secs))?;
    Ok(CourseLoader::new(secrets.clone(), &cfg.data.courses_path).with_sheets(sheets))
}

async fn load_context(
    cfg: &Config,
    secrets: &Secrets,
    courses_file: Option<&Path>,
    guidelines_file: Option<&Path>,
) -> Result<SessionContext> {
    let courses = match courses_file {
        Some(path) => courses_from_text(&read_file(path)?),
        None => course_loader(cfg, secrets)?.load_course_data().await,
    };
    let override_text = guidelines_file.map(read_file).transpose()?;
    let guidelines = GuidelineResolver::new(&cfg.data.guidelines_path).resolve(override_text.as_deref());
    Ok(SessionContext {
        courses,
        guidelines,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Errors are shown as the reply and the session continues.
async fn chat(assistant: &Assistant<GeminiConnector>, ctx: &SessionContext) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        eprintln!("…");
        match assistant
            .generate_response(question, ctx.courses.as_deref(), ctx.guidelines.as_deref())
            .await
        {
            Ok(answer) => println!("{answer}\n"),
            Err(e) => println!("Error: {e}\n"),
        }
    }
    Ok(())
}
