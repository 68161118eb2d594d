use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use genstream_core::{
    aggregate::TerminalStatus,
    client::DashboardClient,
    config::Config,
    model::{LoadRequest, PromptRequest},
    stream::StreamHandle,
};

#[derive(Parser)]
#[command(author, version, about = "genstream CLI smoke tool", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List models known to the backend
    Models,
    /// Load a model into memory, optionally with an adapter
    Load {
        #[arg(long)]
        model: String,
        #[arg(long)]
        adapter: Option<String>,
    },
    /// Stream a prompt completion (prints fragments live; Ctrl-C cancels)
    Prompt {
        #[arg(long)]
        model: String,
        #[arg(short, long, help = "Prompt text to run")]
        prompt: String,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Ask the application chatbot (streams like Prompt)
    Ask {
        #[arg(short, long, help = "Question for the chatbot")]
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    let client = DashboardClient::from_config(&cfg)?;

    match cli.command {
        Commands::Models => {
            for m in client.list_models().await? {
                println!("{}", m.name);
            }
        }
        Commands::Load { model, adapter } => {
            let out = client.load_model(LoadRequest { model, adapter }).await?;
            println!("{out}");
        }
        Commands::Prompt {
            model,
            prompt,
            max_tokens,
        } => {
            let handle = client.start_prompt(
                PromptRequest {
                    model,
                    prompt,
                    max_tokens,
                },
                print_growth(),
                print_status,
            )?;
            run_until_done(handle).await;
        }
        Commands::Ask { question } => {
            let handle = client.start_ask(question, print_growth(), print_status)?;
            run_until_done(handle).await;
        }
    }

    Ok(())
}

/// Incremental printer state for the update callback. The callback normally
/// receives the full accumulated text, growing by a suffix each time; a
/// terminal server-error message is not an extension of that text and gets
/// emitted whole on its own line.
struct GrowthPrinter {
    printed: String,
}

impl GrowthPrinter {
    fn new() -> Self {
        Self {
            printed: String::new(),
        }
    }

    fn step(&mut self, text: &str) -> Option<String> {
        match text.strip_prefix(self.printed.as_str()) {
            Some("") => None,
            Some(suffix) => {
                let out = suffix.to_string();
                self.printed.push_str(&out);
                Some(out)
            }
            None => {
                self.printed = text.to_string();
                Some(format!("\n{text}"))
            }
        }
    }
}

fn print_growth() -> impl FnMut(&str) + Send + 'static {
    let mut printer = GrowthPrinter::new();
    move |text: &str| {
        if let Some(out) = printer.step(text) {
            print!("{out}");
            io::stdout().flush().ok();
        }
    }
}

fn print_status(status: TerminalStatus) {
    match status {
        TerminalStatus::Completed => eprintln!("\n[done]"),
        TerminalStatus::Failed(reason) => eprintln!("\n[failed: {reason}]"),
        TerminalStatus::Cancelled => eprintln!("\n[cancelled]"),
    }
}

async fn run_until_done(handle: StreamHandle) {
    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    let _ = handle.wait().await;
}
