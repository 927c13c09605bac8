use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use nodal_core::Config;
use nodal_core::vault::EnvVaultProvider;
use nodal_llm::registry::{LlmModel, ProviderKind, ResponseFormatSupport};
use nodal_llm::schema::SimpleSchema;
use nodal_llm::{
    GenerateRequest, GenerationParams, Generator, all_models, create_messages,
    create_messages_with_images,
};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Provider-agnostic LLM text generation
#[derive(Parser, Debug)]
#[command(name = "nodal")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List known models and their constraints
    Models {
        /// Only show models of this provider (openai, azure, anthropic, gemini, deepseek, ollama)
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a completion and print the JSON result
    Generate(GenerateArgs),

    /// Convert a DOCX file to XML
    Docx {
        /// Path to the .docx file
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Model identifier, e.g. openai/gpt-4o or ollama/llama3
    #[arg(short, long)]
    model: Option<String>,

    /// System prompt
    #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
    system: String,

    /// User prompt
    #[arg(short, long)]
    user: String,

    /// Ask the model for JSON-only output
    #[arg(long)]
    json: bool,

    /// JSON schema the output must follow
    #[arg(long)]
    schema: Option<String>,

    /// Simple output field as name=type (str, int, float, bool); repeatable
    #[arg(long = "field", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,

    #[arg(short, long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// Attachment as name=url-or-path; repeatable
    #[arg(long = "attach", value_parser = parse_key_value)]
    attachments: Vec<(String, String)>,

    /// Image URL or data URL to send with the user prompt
    #[arg(long)]
    image: Option<String>,

    /// Ollama host override
    #[arg(long)]
    api_base: Option<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.resolve_secrets(&EnvVaultProvider).await?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Commands::Models { provider, json } => {
            let models: Vec<&LlmModel> = all_models()
                .iter()
                .filter(|m| provider.is_none_or(|p| m.provider == p))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                print!("{}", render_models_table(&models));
            }
        }
        Commands::Generate(args) => {
            let request = build_generate_request(&config, args)?;
            let generator = Generator::new(config.provider_settings());
            let output = generator.generate_text(request).await?;
            println!("{output}");
        }
        Commands::Docx { path } => {
            let xml = nodal_docs::convert_docx_to_xml(&path)
                .await
                .with_context(|| format!("failed to convert {}", path.display()))?;
            println!("{xml}");
        }
    }

    Ok(())
}

fn build_generate_request(config: &Config, args: GenerateArgs) -> anyhow::Result<GenerateRequest> {
    let defaults = config.generation.params();
    let params = GenerationParams {
        model: args.model.unwrap_or(defaults.model),
        max_tokens: args.max_tokens.unwrap_or(defaults.max_tokens),
        temperature: args.temperature.unwrap_or(defaults.temperature),
        top_p: defaults.top_p,
    };

    let messages = match args.image.as_deref() {
        Some(image) => create_messages_with_images(&args.system, image, &args.user, &[], &[]),
        None => create_messages(&args.system, &args.user, &[], &[]),
    };

    let mut request = GenerateRequest::from_params(&params, messages)
        .context("invalid generation parameters")?
        .json_mode(args.json);
    if let Some(schema) = args.schema {
        request = request.output_json_schema(schema);
    }
    if !args.fields.is_empty() {
        let schema: SimpleSchema = args
            .fields
            .into_iter()
            .map(|(name, type_name)| (name, serde_json::Value::String(type_name)))
            .collect();
        request = request.output_schema(schema);
    }
    for (name, url) in args.attachments {
        request = request.url_variable(name, url);
    }
    if let Some(api_base) = args.api_base {
        request = request.api_base(api_base);
    }
    Ok(request)
}

fn render_models_table(models: &[&LlmModel]) -> String {
    use std::fmt::Write as _;

    let mut out = format!(
        "{:<38} {:<10} {:>10} {:>9} {}\n",
        "MODEL", "PROVIDER", "MAX TOKENS", "MAX TEMP", "JSON"
    );
    for m in models {
        let c = &m.constraints;
        let json = if !c.supports_json_output {
            "none"
        } else {
            match c.response_format {
                ResponseFormatSupport::JsonSchema => "schema",
                ResponseFormatSupport::JsonObject => "object",
                ResponseFormatSupport::Unsupported => "prompt",
            }
        };
        let temp = if c.supports_temperature {
            format!("{:.1}", c.max_temperature)
        } else {
            "-".to_owned()
        };
        let _ = writeln!(
            out,
            "{:<38} {:<10} {:>10} {:>9} {}",
            m.id,
            m.provider.as_str(),
            c.max_tokens,
            temp,
            json
        );
    }
    out
}

fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("NODAL_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries the generated output
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
