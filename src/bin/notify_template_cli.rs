//! Notify Template CLI - Bridge interface for the service desk backend
//!
//! Commands: templates, render, render-text
//! Outputs JSON to stdout, logs to stderr
//! Exit codes: 0 rendered, 2 render failed, 3 no branch matched

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use notify_template_core::{
    EntityKind, EvaluationEvent, NotificationPipeline, RenderRequest, RenderStatus, RenderedMessage,
    TemplateRegistry,
};

#[derive(Parser)]
#[command(name = "notify-template-cli")]
#[command(about = "Notify Template CLI - conditional notification rendering")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to templates directory
    #[arg(short, long, default_value = "templates")]
    templates_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List available templates
    Templates,

    /// Render a catalogue template
    Render {
        /// Template ID
        #[arg(short, long)]
        template: String,

        #[command(flatten)]
        input: RenderInput,
    },

    /// Render template text given on the command line
    RenderText {
        /// Template text
        #[arg(long)]
        text: String,

        #[command(flatten)]
        input: RenderInput,
    },
}

#[derive(Args)]
struct RenderInput {
    /// JSON object with the context roots
    #[arg(short, long)]
    context: String,

    /// creation | modification | elimination
    #[arg(short, long)]
    event: Option<EvaluationEvent>,

    /// Entity kind the event applies to (ticket)
    #[arg(long)]
    entity: Option<EntityKind>,
}

impl RenderInput {
    fn into_request(self) -> Result<RenderRequest, serde_json::Error> {
        Ok(RenderRequest {
            context: serde_json::from_str(&self.context)?,
            event: self.event,
            entity: self.entity,
        })
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = match TemplateRegistry::load_from_dir(&cli.templates_dir) {
        Ok(r) => r,
        Err(e) => {
            print_error(format!("Failed to load templates: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let pipeline = NotificationPipeline::new(registry);

    match cli.command {
        Commands::Templates => {
            let templates: Vec<_> = pipeline
                .list_templates()
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "id": t.id,
                        "name": t.name,
                        "version": t.template_version,
                        "event": t.event,
                        "entity": t.entity,
                        "deprecated": t.deprecated,
                    })
                })
                .collect();

            println!("{}", serde_json::Value::Array(templates));
            ExitCode::SUCCESS
        }

        Commands::Render { template, input } => {
            let request = match input.into_request() {
                Ok(r) => r,
                Err(e) => {
                    print_error(format!("Invalid context: {e}"));
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.render(&template, &request) {
                Ok(message) => report(&message),
                Err(e) => {
                    print_error(e.to_string());
                    ExitCode::FAILURE
                }
            }
        }

        Commands::RenderText { text, input } => match input.into_request() {
            Ok(request) => report(&pipeline.render_text(&text, &request)),
            Err(e) => {
                print_error(format!("Invalid context: {e}"));
                ExitCode::FAILURE
            }
        },
    }
}

fn report(message: &RenderedMessage) -> ExitCode {
    match serde_json::to_string_pretty(message) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            print_error(e.to_string());
            return ExitCode::FAILURE;
        }
    }

    match message.status {
        RenderStatus::Rendered => ExitCode::SUCCESS,
        RenderStatus::Failed => ExitCode::from(2),
        RenderStatus::NoMatch => ExitCode::from(3),
    }
}

fn print_error(error: String) {
    println!("{}", serde_json::json!({ "success": false, "error": error }));
}
