use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, LevelFilter};
use serde::Serialize;

use exprquill::config::{Config, OutputFormat};
use exprquill::document::tree::{NodeSummary, VariableTree};
use exprquill::expression::{ExpressionError, Parser as ExpressionParser};
use exprquill::file::loader::{load_schema_file, load_schema_from_stdin};
use exprquill::suggestion::{apply_completion, Completion, EmptyContent, Suggestion};
use exprquill::template::{MarkRangeInfo, TemplateData, TemplateMark, TemplateRegistry};

/// exprquill - autocompletion for {{variable}} expressions in prompt text
#[derive(Parser)]
#[command(name = "exprquill")]
#[command(version)]
#[command(about = "Autocompletion for {{variable}} expressions in prompt text", long_about = None)]
struct Cli {
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Output format: json, pretty or text (overrides the config file)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,

    /// Config file (default: ~/.config/exprquill/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the expression under the cursor
    Parse(LineArgs),
    /// List the variables to offer at the cursor
    Suggest(SchemaLineArgs),
    /// Check that the expression under the cursor is well formed
    Validate(ValidateArgs),
    /// Insert the full path of a variable at the cursor
    Complete(CompleteArgs),
    /// Work with {#Mark ...#} template tags
    Template(TemplateArgs),
}

#[derive(Args)]
struct LineArgs {
    /// Line of text containing the expression
    #[arg(short, long)]
    line: String,

    /// Cursor offset in UTF-16 code units
    #[arg(short, long)]
    offset: usize,
}

#[derive(Args)]
struct SchemaLineArgs {
    #[command(flatten)]
    input: LineArgs,

    /// Variable schema file (JSON or YAML, optionally .gz); reads stdin if omitted
    #[arg(short, long)]
    schema: Option<PathBuf>,
}

#[derive(Args)]
struct ValidateArgs {
    #[command(flatten)]
    input: LineArgs,

    /// Also require the expression to resolve against this schema
    #[arg(short, long)]
    schema: Option<PathBuf>,
}

#[derive(Args)]
struct CompleteArgs {
    #[command(flatten)]
    target: SchemaLineArgs,

    /// Dotted label path of the chosen variable, e.g. "user.name"
    #[arg(short, long)]
    node: String,
}

#[derive(Args)]
struct TemplateArgs {
    /// Template mark: InputSlot or LibraryBlock
    #[arg(short, long, default_value = "InputSlot")]
    mark: TemplateMark,

    #[command(subcommand)]
    action: TemplateAction,
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Print the attributes of the first tag, or of the tag around --cursor
    Data {
        /// Template text; reads stdin if omitted
        text: Option<String>,
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Strip all tags of the mark
    Extract { text: Option<String> },
    /// List the tag pairs of the mark
    Marks { text: Option<String> },
    /// Wrap content in a tag pair
    Generate {
        content: String,
        /// Tag attribute as key=value, repeatable
        #[arg(short, long = "attr", value_parser = parse_attr)]
        attrs: Vec<(String, String)>,
    },
    /// Merge attributes into the tag around the cursor
    Update {
        text: String,
        #[arg(long)]
        cursor: usize,
        #[arg(short, long = "attr", value_parser = parse_attr)]
        attrs: Vec<(String, String)>,
    },
}

fn parse_attr(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn init_logging(cli: &Cli, config: &Config) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    );
    if cli.quiet {
        builder.filter_level(LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(format) = cli.format {
        config.output_format = format;
    }
    init_logging(&cli, &config);
    debug!("using {:?}", config);

    match cli.command {
        Commands::Parse(args) => run_parse(&args, &config),
        Commands::Suggest(args) => run_suggest(&args, &config),
        Commands::Validate(args) => run_validate(&args, &config),
        Commands::Complete(args) => run_complete(&args, &config),
        Commands::Template(args) => run_template(args, &config),
    }
}

fn emit<T: Serialize>(config: &Config, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match config.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Pretty => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

fn load_tree(schema: Option<&PathBuf>) -> Result<VariableTree> {
    match schema {
        Some(path) if path.as_os_str() != "-" => load_schema_file(path),
        _ => {
            if io::stdin().is_terminal() {
                return Err(anyhow!("no --schema given and nothing piped on stdin"));
            }
            load_schema_from_stdin()
        }
    }
}

fn read_text(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read template text from stdin")?;
            Ok(buffer)
        }
    }
}

fn run_parse(args: &LineArgs, config: &Config) -> Result<ExitCode> {
    let parse = ExpressionParser::try_parse(&args.line, args.offset)?;
    emit(config, &parse, || {
        format!(
            "inline: {}\nreachable: {}\nunreachable: {}",
            parse.content.inline, parse.content.reachable, parse.content.unreachable
        )
    })?;
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestReport {
    search: String,
    suggestions: Vec<NodeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected: Option<NodeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    empty_content: Option<EmptyContent>,
}

fn run_suggest(args: &SchemaLineArgs, config: &Config) -> Result<ExitCode> {
    let parse = ExpressionParser::try_parse(&args.input.line, args.input.offset)?;
    let tree = load_tree(args.schema.as_ref())?;
    let suggestion = Suggestion::compute_with(&tree, &parse, config.prune_fallback);

    let mut suggestions: Vec<NodeSummary> = suggestion
        .variable_tree
        .iter()
        .filter(|id| tree.node(**id).label.contains(suggestion.search.as_str()))
        .map(|id| tree.summary(*id))
        .collect();
    config.limit(&mut suggestions);

    let report = SuggestReport {
        search: suggestion.search,
        suggestions,
        selected: suggestion.selected.map(|id| tree.summary(id)),
        empty_content: suggestion.empty_content,
    };
    emit(config, &report, || match report.empty_content {
        Some(reason) if report.suggestions.is_empty() => reason.to_string(),
        _ => report
            .suggestions
            .iter()
            .map(|summary| summary.label.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    })?;
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct ValidateReport {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<NodeSummary>,
}

fn run_validate(args: &ValidateArgs, config: &Config) -> Result<ExitCode> {
    let report = match ExpressionParser::try_parse(&args.input.line, args.input.offset) {
        Err(err) => ValidateReport {
            valid: false,
            error: Some(err.to_string()),
            resolved: None,
        },
        Ok(parse) => match &args.schema {
            None => ValidateReport {
                valid: true,
                error: None,
                resolved: None,
            },
            Some(_) => {
                let tree = load_tree(args.schema.as_ref())?;
                match Suggestion::compute(&tree, &parse).selected {
                    Some(id) => ValidateReport {
                        valid: true,
                        error: None,
                        resolved: Some(tree.summary(id)),
                    },
                    None => ValidateReport {
                        valid: false,
                        error: Some(
                            ExpressionError::InvalidPath {
                                path: parse.content.inline.clone(),
                            }
                            .to_string(),
                        ),
                        resolved: None,
                    },
                }
            }
        },
    };

    emit(config, &report, || match (&report.error, &report.resolved) {
        (Some(error), _) => format!("invalid: {}", error),
        (None, Some(resolved)) => format!("valid: {}", resolved.value),
        (None, None) => "valid".to_string(),
    })?;
    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn run_complete(args: &CompleteArgs, config: &Config) -> Result<ExitCode> {
    let input = &args.target.input;
    let parse = ExpressionParser::try_parse(&input.line, input.offset)?;
    let tree = load_tree(args.target.schema.as_ref())?;
    let labels: Vec<&str> = args.node.split('.').collect();
    let node = tree
        .find_by_labels(&labels)
        .ok_or_else(|| anyhow!("no variable at '{}' in the schema", args.node))?;

    let completion: Completion = apply_completion(&tree, &parse, node);
    emit(config, &completion, || completion.line.clone())?;
    Ok(ExitCode::SUCCESS)
}

fn run_template(args: TemplateArgs, config: &Config) -> Result<ExitCode> {
    let mut registry = TemplateRegistry::new();
    let parser = registry.parser(args.mark);

    match args.action {
        TemplateAction::Data { text, cursor } => {
            let text = read_text(text)?;
            let data = match cursor {
                Some(cursor) => parser.cursor_template_data(&text, cursor),
                None => parser.data(&text),
            };
            let data = data.ok_or_else(|| anyhow!("no {} tag with attributes found", args.mark))?;
            emit(config, &data, || {
                data.iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        TemplateAction::Extract { text } => {
            let extracted = parser.extract_template_content(&read_text(text)?);
            emit(config, &extracted, || extracted.clone())?;
        }
        TemplateAction::Marks { text } => {
            let marks: Vec<MarkRangeInfo> = parser.marks(&read_text(text)?);
            emit(config, &marks, || {
                marks
                    .iter()
                    .map(|info| format!("{}..{}", info.from, info.to))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        TemplateAction::Generate { content, attrs } => {
            let data: TemplateData = attrs.into_iter().collect();
            let generated = parser.generate_template_json(&content, &data);
            emit(config, &generated, || generated.template.clone())?;
        }
        TemplateAction::Update {
            text,
            cursor,
            attrs,
        } => {
            let data: TemplateData = attrs.into_iter().collect();
            let updated = parser
                .update_template_data(&text, cursor, &data)
                .ok_or_else(|| anyhow!("cursor {} is not inside a {} tag", cursor, args.mark))?;
            emit(config, &updated, || updated.clone())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
