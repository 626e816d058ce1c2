

use clap::Parser;
use synthgraph::{RetrievalMode, SynthConfig, Synthesizer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


/// Answer a question from the evidence graph and document index.
#[derive(Parser)]
#[command(name = "synth-query", version)]
struct Cli {
    /// Configuration file; `SYNTH_*` environment variables override it.
    #[arg(long, env = "SYNTH_CONFIG")]
    config: Option<String>,

    /// vector, graph or hybrid. Anything else builds an empty context.
    #[arg(long, default_value = "hybrid")]
    mode: String,

    /// Prompt template name; defaults to the configured template.
    #[arg(long)]
    template: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// Print the built context and cited documents without calling the model.
    #[arg(long)]
    context_only: bool,

    query: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("synthgraph=info"))?)
        .init();

    let cli = Cli::parse();
    let config = SynthConfig::load(cli.config.as_deref())?;
    let mode = RetrievalMode::parse(&cli.mode);
    let synthesizer = Synthesizer::connect(&config).await?;

    if cli.context_only {
        let (context, filenames) = synthesizer.builder().build(&cli.query, mode).await;
        println!("{}", context);
        if !filenames.is_empty() {
            println!("\nDocuments: {}", filenames.join(", "));
        }
        return Ok(());
    }

    let template = cli.template.as_deref().unwrap_or(&config.default_template);
    let model = cli.model.as_deref().unwrap_or(&config.llm_model);
    let outcome = synthesizer.synthesize(&cli.query, mode, template, Some(model)).await?;

    println!("{}", outcome.answer);
    Ok(())
}
