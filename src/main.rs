use anyhow::{bail, Context};
use clap::{ArgAction, Parser};

use task_parser::config::Config;
use task_parser::llm_manager::LLMManager;
use task_parser::logger;
use task_parser::ui::{OutputFormat, UIHandler};
use task_parser::{TaskFieldRequest, TaskParser};

#[derive(Parser)]
#[command(name = "task_parser", about = "Extract GTD task fields from a free-text description")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<String>,
    /// Schema preset to extract ("gtd" or "full")
    #[arg(short, long)]
    schema: Option<String>,
    /// Sampling temperature for the completion request
    #[arg(short, long)]
    temperature: Option<f32>,
    /// Seconds to wait for the completion endpoint
    #[arg(long)]
    timeout: Option<u64>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<String>,
    /// Verbose logging (repeat for debug output)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Task description, e.g. "Call the dentist tomorrow at 2pm"
    #[arg(last = true)]
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.verbose);
    dotenv::dotenv().ok();

    if let Some(path) = &args.write_config {
        Config::default().save(shellexpand::tilde(path).as_ref())?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    let mut config = Config::load(&args.config)?;
    config.merge_with_args(args.schema, args.temperature, args.timeout, args.json);

    let input = args.text.join(" ");
    if input.trim().is_empty() {
        bail!("no task description given; pass it after `--`");
    }

    let schema = config.schema()?;
    let llm_manager =
        LLMManager::from_config(&config).context("Failed to set up a completion provider")?;

    let request = TaskFieldRequest::new(input, schema)?
        .with_temperature(config.extraction.temperature);
    let fields = match TaskParser::new(&llm_manager).parse(&request).await {
        Ok(fields) => fields,
        Err(e) if e.is_upstream() => bail!("{} (safe to retry)", e),
        Err(e) => return Err(e.into()),
    };

    let ui = UIHandler::new(
        OutputFormat::from_name(&config.ui.output_format),
        config.ui.colorful,
    );
    ui.show(&fields)?;
    Ok(())
}
