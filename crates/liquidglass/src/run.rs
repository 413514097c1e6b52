use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::{run_preview, Exporter, PreviewConfig, SourceImage};
use tracing_subscriber::EnvFilter;

use crate::cli::{self, Cli, Command, ExportOverrides};
use crate::config::{FileConfig, ResolvedConfig};

const DEFAULT_SHADER: &str = include_str!("../shaders/liquid.frag");

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let base = match cli.config.as_deref() {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FileConfig::default(),
    };

    match cli.command {
        Command::Export(args) => {
            let resolved = resolve(base, cli::overlay(&args.params, Some(&args.export)))?;
            let shader = load_shader(args.shader.as_deref())?;
            let image = load_image(&args.image)?;
            tracing::info!(
                side = resolved.export.side,
                duration = resolved.export.duration_sec,
                fps = resolved.export.fps,
                background = %resolved.export.background,
                "exporting animation"
            );
            let bytes = Exporter::new(shader)
                .export(&image, &resolved.params, &resolved.export)
                .context("export failed")?;
            fs::write(&args.output, &bytes)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            tracing::info!(
                path = %args.output.display(),
                bytes = bytes.len(),
                "wrote animation"
            );
            Ok(())
        }
        Command::Preview(args) => {
            let export = ExportOverrides {
                background: args.background.clone(),
                ..ExportOverrides::default()
            };
            let resolved = resolve(base, cli::overlay(&args.params, Some(&export)))?;
            let shader = load_shader(args.shader.as_deref())?;
            let image = load_image(&args.image)?;
            run_preview(PreviewConfig {
                fragment_source: shader,
                image,
                params: resolved.params,
                background: resolved.export.background,
                size: args.size,
                title: "liquidglass preview".to_string(),
            })
        }
        Command::Params(args) => {
            let resolved = resolve(base, cli::overlay(&args.params, Some(&args.export)))?;
            print!("{}", resolved.to_toml()?);
            Ok(())
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve(base: FileConfig, overlay: FileConfig) -> Result<ResolvedConfig> {
    let resolved = base.merge(overlay).resolve()?;
    tracing::debug!(?resolved, "resolved configuration");
    Ok(resolved)
}

fn load_shader(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display())),
        None => Ok(DEFAULT_SHADER.to_string()),
    }
}

fn load_image(path: &Path) -> Result<SourceImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    tracing::debug!(width, height, path = %path.display(), "loaded source image");
    Ok(SourceImage::new(width, height, decoded.into_raw())?)
}
