use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use pagelore_core::model::GeminiModel;
use pagelore_core::{AnalysisLayout, BackendError, Config, PageSource, config_file, store};
use pagelore_pdf::PdfExtractSource;

mod output;

use output::ColorMode;

/// Book Analyzer - Extract knowledge from PDF books page by page with Gemini
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read every PDF in the input directory, building knowledge bases and summaries
    Run {
        /// Directory containing the PDF books (default: input_books)
        input_dir: Option<PathBuf>,

        /// Directory for knowledge bases and summaries (default: book_analysis)
        #[arg(long)]
        analysis_dir: Option<PathBuf>,

        /// Gemini model id
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// Pages between interval summaries (0 disables them)
        #[arg(long)]
        interval: Option<u32>,

        /// Only process the first N pages of each book
        #[arg(long)]
        page_limit: Option<usize>,

        /// Delete existing knowledge bases and summaries before starting
        #[arg(long)]
        fresh: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Path to output log file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Regenerate the final summary of a book from its knowledge base
    Summarize {
        /// Book file name whose knowledge base to summarize
        book: String,

        /// Directory holding the analysis output (default: book_analysis)
        #[arg(long)]
        analysis_dir: Option<PathBuf>,

        /// Gemini model id
        #[arg(long)]
        model: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Extract page texts and report their sizes without calling the API
    Peek {
        /// Path to the PDF to inspect
        file_path: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a config file with the default settings
    Init,
    /// Print the merged config file contents
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            input_dir,
            analysis_dir,
            model,
            api_key,
            interval,
            page_limit,
            fresh,
            no_color,
            output,
        } => {
            run(
                input_dir,
                analysis_dir,
                model,
                api_key,
                interval,
                page_limit,
                fresh,
                no_color,
                output,
            )
            .await
        }
        Command::Summarize {
            book,
            analysis_dir,
            model,
            api_key,
        } => summarize(book, analysis_dir, model, api_key).await,
        Command::Peek {
            file_path,
            no_color,
        } => peek(&file_path, no_color),
        Command::Config { action } => match action {
            ConfigAction::Init => config_init(),
            ConfigAction::Show => config_show(),
        },
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "pagelore_core=warn",
        1 => "pagelore_core=info",
        _ => "pagelore_core=debug",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolved settings shared by `run` and `summarize`.
struct Resolved {
    config: Config,
    input_dir: PathBuf,
    analysis_dir: PathBuf,
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(
    model: Option<String>,
    api_key: Option<String>,
    interval: Option<u32>,
    page_limit: Option<usize>,
    input_dir: Option<PathBuf>,
    analysis_dir: Option<PathBuf>,
) -> Resolved {
    let file = config_file::load_config();
    let api = file.api.unwrap_or_default();
    let analysis = file.analysis.unwrap_or_default();
    let paths = file.paths.unwrap_or_default();
    let defaults = Config::default();

    let api_key = api_key
        .or_else(|| std::env::var("PAGELORE_API_KEY").ok())
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .or(api.api_key);

    let request_timeout_secs: u64 = std::env::var("PAGELORE_TIMEOUT")
        .ok()
        .and_then(|v| v.parse().ok())
        .or(api.request_timeout_secs)
        .unwrap_or(defaults.request_timeout_secs);

    let summary_interval = match interval.or(analysis.summary_interval) {
        Some(0) => None,
        Some(n) => Some(n),
        None => defaults.summary_interval,
    };

    let config = Config {
        api_key,
        model: model.or(api.model).unwrap_or(defaults.model),
        base_url: api.base_url.unwrap_or(defaults.base_url),
        request_timeout_secs,
        summary_interval,
        page_limit: page_limit.or(analysis.page_limit),
        max_point_words: analysis.max_point_words.unwrap_or(defaults.max_point_words),
        max_points_per_call: analysis
            .max_points_per_call
            .unwrap_or(defaults.max_points_per_call),
    };

    let input_dir = input_dir
        .or(paths.input_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("input_books"));
    let analysis_dir = analysis_dir
        .or(paths.analysis_dir.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("book_analysis"));

    Resolved {
        config,
        input_dir,
        analysis_dir,
    }
}

/// Build the Gemini backend from the resolved config, requiring an API key.
fn build_model(config: &Config) -> anyhow::Result<GeminiModel> {
    let Some(api_key) = config.api_key.as_deref() else {
        anyhow::bail!(
            "No API key configured. Pass --api-key, set GEMINI_API_KEY, or add it to the config file."
        );
    };
    Ok(GeminiModel::new(
        config.model.clone(),
        config.base_url.clone(),
        api_key,
    ))
}

/// Page source that shows an extraction spinner around the inner source.
struct SpinnerSource {
    inner: PdfExtractSource,
    enabled: bool,
}

impl PageSource for SpinnerSource {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        if !self.enabled {
            return self.inner.extract_pages(path);
        }

        use indicatif::{ProgressBar, ProgressStyle};

        let name = pagelore_core::book_name(path);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap());
        spinner.set_message(format!("Extracting text from {}...", name));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = self.inner.extract_pages(path);

        match &result {
            Ok(pages) => {
                spinner.finish_with_message(format!("Extracted {} pages from {}", pages.len(), name))
            }
            Err(_) => spinner.finish_and_clear(),
        }
        result
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    input_dir: Option<PathBuf>,
    analysis_dir: Option<PathBuf>,
    model: Option<String>,
    api_key: Option<String>,
    interval: Option<u32>,
    page_limit: Option<usize>,
    fresh: bool,
    no_color: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let resolved = resolve_config(model, api_key, interval, page_limit, input_dir, analysis_dir);
    let model_backend = build_model(&resolved.config)?;

    // Determine color mode and output writer
    let use_color = !no_color && output.is_none();
    let color = ColorMode(use_color);

    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::fs::File::create(output_path)?)
    } else {
        Box::new(std::io::stdout())
    };

    if !resolved.input_dir.exists() {
        std::fs::create_dir_all(&resolved.input_dir)?;
        writeln!(
            writer,
            "Created input directory {}",
            resolved.input_dir.display()
        )?;
    }

    let layout = AnalysisLayout::new(&resolved.analysis_dir);
    layout.ensure()?;
    if fresh {
        layout.clean_outputs()?;
        writeln!(
            writer,
            "Cleared previous analysis output under {}",
            resolved.analysis_dir.display()
        )?;
    }

    let books = pagelore_pdf::find_books(&resolved.input_dir)?;
    if books.is_empty() {
        writeln!(
            writer,
            "No PDF files found in {}.",
            resolved.input_dir.display()
        )?;
        return Ok(());
    }

    output::print_run_header(
        &mut writer,
        books.len(),
        &resolved.input_dir,
        &resolved.config.model,
        color,
    )?;

    let source = SpinnerSource {
        inner: PdfExtractSource::new(),
        enabled: use_color,
    };

    // Set up progress callback
    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> = if output.is_some() {
        Arc::new(Mutex::new(Box::new(std::io::stderr())))
    } else {
        Arc::new(Mutex::new(Box::new(std::io::stdout())))
    };

    let progress_color = color;
    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        move |event: pagelore_core::ProgressEvent| {
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, progress_color);
                let _ = w.flush();
            }
        }
    };

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let all_stats = pagelore_core::read_books(
        &source,
        &books,
        &layout,
        &model_backend,
        &resolved.config,
        progress_cb,
        cancel.clone(),
    )
    .await;

    output::print_run_summary(&mut writer, &all_stats, color)?;

    if cancel.is_cancelled() {
        writeln!(
            writer,
            "Run cancelled. Knowledge bases keep the pages processed so far; rerun to resume."
        )?;
    }

    Ok(())
}

async fn summarize(
    book: String,
    analysis_dir: Option<PathBuf>,
    model: Option<String>,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let resolved = resolve_config(model, api_key, None, None, None, analysis_dir);
    let model_backend = build_model(&resolved.config)?;

    let layout = AnalysisLayout::new(&resolved.analysis_dir);
    let kb_file = store::kb_path(&layout.knowledge_dir, &book);
    if !kb_file.exists() {
        anyhow::bail!(
            "No knowledge base found at {}. Build it with: pagelore run",
            kb_file.display()
        );
    }

    println!("Generating final summary for {}...", book);
    let path =
        pagelore_core::summary::summarize_book(&book, &layout, &model_backend, &resolved.config)
            .await?;
    println!("Final summary saved to: {}", path.display());

    Ok(())
}

fn config_init() -> anyhow::Result<()> {
    if let Some(path) = config_file::config_path()
        && path.exists()
    {
        anyhow::bail!("Config file already exists at {}", path.display());
    }

    let defaults = Config::default();
    let file = config_file::ConfigFile {
        api: Some(config_file::ApiConfig {
            api_key: None,
            model: Some(defaults.model),
            base_url: Some(defaults.base_url),
            request_timeout_secs: Some(defaults.request_timeout_secs),
        }),
        analysis: Some(config_file::AnalysisConfig {
            summary_interval: defaults.summary_interval,
            page_limit: None,
            max_point_words: Some(defaults.max_point_words),
            max_points_per_call: Some(defaults.max_points_per_call),
        }),
        paths: Some(config_file::PathsConfig {
            input_dir: Some("input_books".to_string()),
            analysis_dir: Some("book_analysis".to_string()),
        }),
    };

    let path = config_file::save_config(&file).map_err(|e| anyhow::anyhow!(e))?;
    println!("Config written to: {}", path.display());
    Ok(())
}

fn config_show() -> anyhow::Result<()> {
    let file = config_file::load_config();
    println!("{}", toml::to_string_pretty(&file)?);
    Ok(())
}

fn peek(file_path: &Path, no_color: bool) -> anyhow::Result<()> {
    use owo_colors::OwoColorize;

    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }

    let use_color = !no_color;
    let file_name = pagelore_core::book_name(file_path);

    let pages = PdfExtractSource::new()
        .extract_pages(file_path)
        .map_err(|e| anyhow::anyhow!("Extraction failed: {}", e))?;

    if use_color {
        println!(
            "{} {} ({} pages)\n",
            "PEEK:".bold().cyan(),
            file_name.bold(),
            pages.len()
        );
    } else {
        println!("PEEK: {} ({} pages)\n", file_name, pages.len());
    }

    let mut blank = 0usize;
    for (i, text) in pages.iter().enumerate() {
        let chars = text.trim().chars().count();
        if chars == 0 {
            blank += 1;
            if use_color {
                println!("  [{:>4}] {}", i + 1, "blank".dimmed());
            } else {
                println!("  [{:>4}] blank", i + 1);
            }
        } else {
            println!("  [{:>4}] {} chars", i + 1, chars);
        }
    }

    println!();
    println!("Total: {} pages, {} blank", pages.len(), blank);
    if blank == pages.len() && !pages.is_empty() {
        println!("No text layer found. A scanned book needs OCR before analysis.");
    }

    Ok(())
}
