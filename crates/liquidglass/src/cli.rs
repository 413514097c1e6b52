use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ExportSection, FileConfig, ParamsSection};

#[derive(Parser, Debug)]
#[command(
    name = "liquidglass",
    author,
    version,
    about = "Liquid-glass shader preview and looping GIF export"
)]
pub struct Cli {
    /// TOML file with `[params]` and `[export]` tables.
    #[arg(long, global = true, value_name = "PATH", env = "LIQUIDGLASS_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render one seamless loop of the effect to an animated GIF.
    Export(ExportArgs),
    /// Open a window and animate the effect live.
    Preview(PreviewArgs),
    /// Print the fully resolved configuration as TOML.
    Params(ParamsArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Source image (PNG, JPEG or BMP).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Destination GIF.
    #[arg(short, long, value_name = "PATH", default_value = "liquid.gif")]
    pub output: PathBuf,

    /// Fragment program to use instead of the bundled one.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    #[command(flatten)]
    pub export: ExportOverrides,

    #[command(flatten)]
    pub params: ParamOverrides,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Source image (PNG, JPEG or BMP).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Fragment program to use instead of the bundled one.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Initial window size (e.g. `768x768`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "768x768", value_parser = parse_size)]
    pub size: (u32, u32),

    /// Clear colour behind the effect.
    #[arg(long, value_name = "COLOR")]
    pub background: Option<String>,

    #[command(flatten)]
    pub params: ParamOverrides,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(flatten)]
    pub export: ExportOverrides,

    #[command(flatten)]
    pub params: ParamOverrides,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ExportOverrides {
    /// Output side length in pixels.
    #[arg(long, value_name = "PIXELS")]
    pub side: Option<u32>,

    /// Seconds of playback used to pick the frame count.
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f64>,

    /// Frames per second used to pick the frame count.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// `transparent`, `#rrggbb`, `rgb(r, g, b)` or a colour name.
    #[arg(long, value_name = "COLOR")]
    pub background: Option<String>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ParamOverrides {
    #[arg(long, value_name = "VALUE")]
    pub pattern_scale: Option<f32>,
    #[arg(long, value_name = "VALUE")]
    pub refraction: Option<f32>,
    #[arg(long, value_name = "VALUE")]
    pub edge: Option<f32>,
    #[arg(long, value_name = "VALUE")]
    pub pattern_blur: Option<f32>,
    #[arg(long, value_name = "VALUE")]
    pub liquid: Option<f32>,
    /// Animation speed multiplier.
    #[arg(long, value_name = "VALUE")]
    pub speed: Option<f64>,
}

impl ParamOverrides {
    fn to_section(&self) -> ParamsSection {
        ParamsSection {
            pattern_scale: self.pattern_scale.map(f64::from),
            refraction: self.refraction.map(f64::from),
            edge: self.edge.map(f64::from),
            pattern_blur: self.pattern_blur.map(f64::from),
            liquid: self.liquid.map(f64::from),
            speed: self.speed,
        }
    }
}

impl ExportOverrides {
    fn to_section(&self) -> ExportSection {
        ExportSection {
            side: self.side,
            duration: self.duration,
            fps: self.fps,
            background: self.background.clone(),
        }
    }
}

/// Command-line values as a config overlay that wins over the file.
pub fn overlay(params: &ParamOverrides, export: Option<&ExportOverrides>) -> FileConfig {
    FileConfig {
        params: params.to_section(),
        export: export.map(ExportOverrides::to_section).unwrap_or_default(),
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_size(" 64X32 "), Ok((64, 32)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn export_flags_parse() {
        let cli = Cli::try_parse_from([
            "liquidglass",
            "export",
            "logo.png",
            "-o",
            "out.gif",
            "--side",
            "256",
            "--background",
            "#ff0000",
            "--speed",
            "1.5",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.output, PathBuf::from("out.gif"));
        assert_eq!(args.export.side, Some(256));
        assert_eq!(args.export.background.as_deref(), Some("#ff0000"));
        assert_eq!(args.params.speed, Some(1.5));
        assert_eq!(args.params.edge, None);
    }
}
