// cli/src/main.rs

use clap::{Parser, Subcommand};
use decision_core::capture::browser::PlaywrightRunner;
use decision_core::config::ScanConfig;
use decision_core::data_models::request::{AnalysisRequest, Goal, InputMode, Locale};
use decision_core::llm_client::GeminiClient;
use decision_core::orchestrator::Orchestrator;
use decision_core::utils::logger;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyzes a live URL (renders it headlessly first)
    Url {
        /// The URL to analyze
        url: String,
        #[clap(short, long, default_value = "leads")]
        goal: String,
        #[clap(short, long, default_value = "en")]
        locale: String,
        /// Bypass the capture result cache
        #[clap(long)]
        refresh: bool,
    },
    /// Analyzes a raw text block (inline or from a file)
    Text {
        /// Text to analyze; use --file to read from disk instead
        text: Option<String>,
        #[clap(short, long)]
        file: Option<PathBuf>,
        #[clap(short, long, default_value = "leads")]
        goal: String,
        #[clap(short, long, default_value = "en")]
        locale: String,
    },
    /// Analyzes an uploaded image via the vision collaborator
    Image {
        /// Path to the image file
        path: PathBuf,
        #[clap(short, long, default_value = "leads")]
        goal: String,
        #[clap(short, long, default_value = "en")]
        locale: String,
    },
    /// Prints orchestrator and artifact store health
    Health,
}

fn parse_goal(goal: &str) -> Goal {
    match goal {
        "leads" => Goal::Leads,
        "sales" => Goal::Sales,
        "booking" => Goal::Booking,
        "contact" => Goal::Contact,
        "subscribe" => Goal::Subscribe,
        _ => Goal::Other,
    }
}

fn parse_locale(locale: &str) -> Locale {
    match locale {
        "fa" => Locale::Fa,
        "tr" => Locale::Tr,
        _ => Locale::En,
    }
}

fn build_orchestrator() -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let config = ScanConfig::from_env();
    let gemini = Arc::new(GeminiClient::from_env()?);
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(PlaywrightRunner::new()),
        gemini.clone(),
        gemini,
    )?;
    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = logger::init_logger();
    let cli = Cli::parse();

    let orchestrator = build_orchestrator()?;

    let request = match &cli.command {
        Commands::Url {
            url,
            goal,
            locale,
            refresh,
        } => {
            let mut request = AnalysisRequest::for_url(url.clone());
            request.goal = parse_goal(goal);
            request.locale = parse_locale(locale);
            request.refresh = *refresh;
            request
        }
        Commands::Text {
            text,
            file,
            goal,
            locale,
        } => {
            let payload = match (text, file) {
                (Some(inline), None) => inline.clone(),
                (None, Some(path)) => fs::read_to_string(path)?,
                _ => return Err("provide either inline text or --file, not both".into()),
            };
            let mut request = AnalysisRequest::for_text(payload);
            request.goal = parse_goal(goal);
            request.locale = parse_locale(locale);
            request
        }
        Commands::Image { path, goal, locale } => {
            let bytes = fs::read(path)?;
            let mut request = AnalysisRequest::for_image(bytes);
            request.goal = parse_goal(goal);
            request.locale = parse_locale(locale);
            request
        }
        Commands::Health => {
            let health = serde_json::json!({
                "orchestrator": orchestrator.health(),
                "artifacts": orchestrator.artifact_health(),
            });
            println!("{}", serde_json::to_string_pretty(&health)?);
            return Ok(());
        }
    };

    let mode = request.mode.clone();
    let response = orchestrator.analyze(request, None).await?;

    if matches!(mode, InputMode::Url) {
        if let Some(screenshots) = &response.screenshots {
            eprintln!(
                "screenshots: desktop={} mobile={}",
                screenshots.desktop.filename.as_deref().unwrap_or("-"),
                screenshots.mobile.filename.as_deref().unwrap_or("-"),
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
