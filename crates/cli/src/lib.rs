use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overlay_core::{Color, Entry, Settings, WatermarkData};
use overlay_engine::{edited_path, Exporter, SourceDocument};
use overlay_storage::{load_session, load_session_from, Storage};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Overrides the settings directory; used by tests and portable installs
pub const DATA_DIR_ENV: &str = "PDF_OVERLAY_DATA_DIR";

#[derive(Debug, Parser)]
#[command(name = "pdf-overlay")]
#[command(about = "Bake annotation overlays into PDF documents")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Draw a saved annotation session into a new PDF.
    Bake {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Session file; defaults to the document's sidecar.
        #[arg(long)]
        session: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Stamp a watermark on every page.
    Watermark {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        size: Option<f32>,
        #[arg(long)]
        opacity: Option<f32>,
        /// Degrees, counter-clockwise.
        #[arg(long, allow_negative_numbers = true)]
        rotation: Option<f32>,
        /// `#rrggbb`
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Default)]
struct WatermarkOverrides {
    text: Option<String>,
    size: Option<f32>,
    opacity: Option<f32>,
    rotation: Option<f32>,
    color: Option<String>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Bake { file, session, output } => {
            run_bake(&file, session.as_deref(), output.as_deref())
        }
        Commands::Watermark { file, text, size, opacity, rotation, color, output } => {
            let overrides = WatermarkOverrides { text, size, opacity, rotation, color };
            run_watermark(&file, overrides, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let doc = SourceDocument::open(file).context("failed to open PDF")?;
    let pages = doc
        .page_sizes()
        .iter()
        .map(|size| PageSizeOutput { width: size.width_pt, height: size.height_pt })
        .collect();

    let payload =
        InfoOutput { path: file.display().to_string(), page_count: doc.page_count(), pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_bake(file: &Path, session: Option<&Path>, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    let entries = match session {
        Some(path) => load_session_from(path)
            .with_context(|| format!("failed to read session {}", path.display()))?,
        None => load_session(file)
            .context("failed to read session")?
            .with_context(|| format!("no saved session for {}", file.display()))?,
    };

    bake(file, &entries, output)
}

fn run_watermark(file: &Path, overrides: WatermarkOverrides, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    let settings = load_settings();
    let watermark = watermark_from(settings.watermark, overrides)?;

    let mut entries = load_session(file).context("failed to read session")?.unwrap_or_default();
    debug!(existing = entries.len(), text = %watermark.text, "adding watermark");
    entries.push(Entry::watermark(watermark));

    bake(file, &entries, output)
}

fn bake(file: &Path, entries: &[Entry], output: Option<&Path>) -> Result<()> {
    let doc = SourceDocument::open(file).context("failed to open PDF")?;
    let bytes = Exporter::new().export_document(&doc, entries).context("failed to export PDF")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| edited_path(file));
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&output, bytes)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn watermark_from(base: WatermarkData, overrides: WatermarkOverrides) -> Result<WatermarkData> {
    let mut watermark = base;
    if let Some(text) = overrides.text {
        watermark.text = text;
    }
    if let Some(size) = overrides.size {
        if size <= 0.0 {
            anyhow::bail!("--size must be positive");
        }
        watermark.wm_size = size;
    }
    if let Some(opacity) = overrides.opacity {
        if !(0.0..=1.0).contains(&opacity) {
            anyhow::bail!("--opacity must be between 0 and 1");
        }
        watermark.opacity = opacity;
    }
    if let Some(rotation) = overrides.rotation {
        watermark.rotation = rotation;
    }
    if let Some(color) = overrides.color {
        watermark.color = Color::from_hex(&color).context("invalid --color")?;
    }
    Ok(watermark)
}

fn load_settings() -> Settings {
    let storage = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => Storage::with_root(PathBuf::from(dir)),
        None => match Storage::from_default_project() {
            Ok(storage) => storage,
            Err(error) => {
                warn!(%error, "using default settings");
                return Settings::default();
            }
        },
    };

    storage.load_settings().unwrap_or_else(|error| {
        warn!(%error, root = %storage.root().display(), "ignoring unreadable settings");
        Settings::default()
    })
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
