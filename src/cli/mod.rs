//! Command-line surface: argument parsing, command dispatch, and the
//! interactive question loop.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::entities::answer::{AnswerComposer, LlmComposer};
use crate::entities::catalog::Catalog;
use crate::entities::consult::{self, AnswerMode, ConsultOptions};
use crate::entities::locate::{DEFAULT_LOOKUP_TIMEOUT, LabelLookup, LocateOptions, LocatePolicy};
use crate::error::RxLabelError;
use crate::render;
use crate::sources::openai::{ChatCompletionClient, CompletionSettings, DEFAULT_MODEL};
use crate::sources::openfda::OpenFdaClient;

pub mod health;

const SHELL_PROMPT: &str = "rxlabel> ";

#[derive(Parser, Debug)]
#[command(
    name = "rxlabel",
    version,
    about = "Answer clinical questions from FDA drug labels"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Field catalog file (JSON) replacing the built-in catalog
    #[arg(long, global = true, env = "RXLABEL_CATALOG")]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question about a drug
    Ask {
        /// Question text; the drug name is taken from it unless --drug is given
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        #[command(flatten)]
        args: AskArgs,
    },
    /// Show every catalog field for a drug
    Label {
        /// Brand name as printed on the package (e.g. Tylenol)
        name: String,
    },
    /// List the field catalog in use
    Fields,
    /// Read questions from stdin, one per line
    Shell {
        #[command(flatten)]
        args: AskArgs,
    },
    /// Check connectivity to openFDA and the completion endpoint
    Health,
    /// Print version
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Drug name to look up instead of taking it from the question
    #[arg(long)]
    pub drug: Option<String>,

    /// How to find the drug name in the question
    #[arg(long, value_enum, env = "RXLABEL_LOCATE", default_value_t = LocatePolicy::FirstToken)]
    pub locate: LocatePolicy,

    /// How to produce the answer
    #[arg(long, value_enum, env = "RXLABEL_MODE", default_value_t = AnswerMode::Prompt)]
    pub mode: AnswerMode,

    /// Send only question-relevant fields to the model
    #[arg(long)]
    pub focused: bool,

    /// Completion model name
    #[arg(long, env = "RXLABEL_LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(long, default_value_t = 0.2)]
    pub temperature: f64,

    /// Maximum tokens in the answer
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_tokens: u32,

    /// Seconds to wait for each label lookup
    #[arg(long, default_value_t = DEFAULT_LOOKUP_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub lookup_timeout: u64,
}

impl AskArgs {
    fn settings(&self) -> Result<CompletionSettings, RxLabelError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RxLabelError::InvalidArgument(
                "--temperature must be between 0.0 and 2.0".into(),
            ));
        }
        let model = self.model.trim();
        if model.is_empty() {
            return Err(RxLabelError::InvalidArgument(
                "--model must not be blank".into(),
            ));
        }
        Ok(CompletionSettings {
            model: model.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }

    fn options(&self) -> ConsultOptions<'_> {
        ConsultOptions {
            locate: LocateOptions {
                policy: self.locate,
                drug: self.drug.as_deref(),
                lookup_timeout: Duration::from_secs(self.lookup_timeout),
            },
            mode: self.mode,
            focused: self.focused,
        }
    }

    /// Builds the composer for completion modes. Missing credentials fail
    /// here, before any lookup.
    fn composer(&self) -> Result<Option<LlmComposer>, RxLabelError> {
        let Some(style) = self.mode.prompt_style() else {
            return Ok(None);
        };
        let settings = self.settings()?;
        let client = ChatCompletionClient::new()?;
        Ok(Some(LlmComposer::new(client, settings, style)))
    }
}

/// Everything one question needs besides its text.
struct Session<'a> {
    args: &'a AskArgs,
    catalog: &'a Catalog,
    lookup: &'a dyn LabelLookup,
    composer: Option<&'a dyn AnswerComposer>,
    json: bool,
}

impl Session<'_> {
    async fn ask(&self, question: &str) -> Result<String, RxLabelError> {
        let opts = self.args.options();
        let consultation =
            consult::consult(question, self.catalog, &opts, self.lookup, self.composer).await?;
        if self.json {
            return render::json::to_pretty(&consultation);
        }
        render::markdown::consultation_markdown(&consultation)
    }
}

/// Renders a health report. The flag is `false` when any check failed.
fn health_output(
    report: &health::HealthReport,
    json: bool,
) -> Result<(String, bool), RxLabelError> {
    let text = if json {
        render::json::to_pretty(report)?
    } else {
        report.to_markdown()
    };
    Ok((text, report.all_healthy()))
}

/// Runs the health checks and renders the report.
///
/// # Errors
///
/// Returns an error when the checks cannot be started or the report cannot be
/// rendered. Failing checks are reported through the returned flag.
pub async fn run_health(catalog_path: Option<&Path>, json: bool) -> anyhow::Result<(String, bool)> {
    let report = health::check(catalog_path).await?;
    Ok(health_output(&report, json)?)
}

/// Runs one non-interactive command and returns its rendered output.
///
/// # Errors
///
/// Returns an error for invalid arguments, catalog problems, and lookup or
/// completion failures.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let Cli {
        command,
        json,
        catalog,
    } = cli;

    match command {
        Commands::Ask { question, args } => {
            let catalog = Catalog::load(catalog.as_deref())?;
            let composer = args.composer()?;
            let lookup = OpenFdaClient::new()?;
            let session = Session {
                args: &args,
                catalog: &catalog,
                lookup: &lookup,
                composer: composer.as_ref().map(|c| c as &dyn AnswerComposer),
                json,
            };
            Ok(session.ask(&question.join(" ")).await?)
        }
        Commands::Label { name } => {
            let catalog = Catalog::load(catalog.as_deref())?;
            let lookup = OpenFdaClient::new()?;
            let info = consult::label(&name, &catalog, &lookup).await?;
            if json {
                return Ok(render::json::to_pretty(&info)?);
            }
            Ok(render::markdown::label_markdown(name.trim(), &info)?)
        }
        Commands::Fields => {
            let catalog = Catalog::load(catalog.as_deref())?;
            if json {
                return Ok(render::json::to_pretty(&catalog)?);
            }
            Ok(render::markdown::catalog_markdown(&catalog)?)
        }
        Commands::Shell { args } => {
            run_shell(&args, catalog.as_deref(), json).await?;
            Ok(String::new())
        }
        Commands::Health => {
            let (output, _) = run_health(catalog.as_deref(), json).await?;
            Ok(output)
        }
        Commands::Version => Ok(format!("rxlabel {}", env!("CARGO_PKG_VERSION"))),
    }
}

fn is_exit_command(line: &str) -> bool {
    matches!(line.to_ascii_lowercase().as_str(), "exit" | "quit" | ":q")
}

/// Answers one question per input line until an exit command or end of input.
/// Answers go to `out`, failed questions to `errors`, and the loop goes on.
async fn shell_loop<R, W, E>(
    session: &Session<'_>,
    input: R,
    out: &mut W,
    errors: &mut E,
    prompt: bool,
) -> Result<(), RxLabelError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            out.write_all(SHELL_PROMPT.as_bytes()).await?;
            out.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit_command(line) {
            break;
        }

        match session.ask(line).await {
            Ok(output) => {
                out.write_all(output.as_bytes()).await?;
                out.write_all(b"\n").await?;
            }
            Err(err) => {
                errors
                    .write_all(format!("Error: {err}\n").as_bytes())
                    .await?;
                errors.flush().await?;
            }
        }
        out.flush().await?;
    }
    Ok(())
}

/// Answers questions read line by line from stdin until `exit`, `quit`, or EOF.
///
/// # Errors
///
/// Returns an error when the catalog, lookup client, or composer cannot be
/// set up, or when stdin/stdout fail.
pub async fn run_shell(
    args: &AskArgs,
    catalog_path: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let catalog = Catalog::load(catalog_path)?;
    let composer = args.composer()?;
    let lookup = OpenFdaClient::new()?;
    let session = Session {
        args,
        catalog: &catalog,
        lookup: &lookup,
        composer: composer.as_ref().map(|c| c as &dyn AnswerComposer),
        json,
    };

    shell_loop(
        &session,
        BufReader::new(tokio::io::stdin()),
        &mut tokio::io::stdout(),
        &mut tokio::io::stderr(),
        std::io::stdin().is_terminal(),
    )
    .await?;
    Ok(())
}
