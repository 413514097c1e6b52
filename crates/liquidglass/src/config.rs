use std::path::{Path, PathBuf};

use renderer::{Background, ExportOptions, ShaderParameters};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub params: ParamsSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_blur: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// Parameters and export options after defaults, file and flags are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub params: ShaderParameters,
    pub export: ExportOptions,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Layers `overlay` on top; any value it sets wins.
    pub fn merge(self, overlay: FileConfig) -> FileConfig {
        let (base, top) = (self.params, overlay.params);
        let params = ParamsSection {
            pattern_scale: top.pattern_scale.or(base.pattern_scale),
            refraction: top.refraction.or(base.refraction),
            edge: top.edge.or(base.edge),
            pattern_blur: top.pattern_blur.or(base.pattern_blur),
            liquid: top.liquid.or(base.liquid),
            speed: top.speed.or(base.speed),
        };
        let (base, top) = (self.export, overlay.export);
        let export = ExportSection {
            side: top.side.or(base.side),
            duration: top.duration.or(base.duration),
            fps: top.fps.or(base.fps),
            background: top.background.or(base.background),
        };
        FileConfig { params, export }
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let defaults = ShaderParameters::default();
        let p = &self.params;
        let params = ShaderParameters {
            pattern_scale: p.pattern_scale.map_or(defaults.pattern_scale, |value| value as f32),
            refraction: p.refraction.map_or(defaults.refraction, |value| value as f32),
            edge: p.edge.map_or(defaults.edge, |value| value as f32),
            pattern_blur: p.pattern_blur.map_or(defaults.pattern_blur, |value| value as f32),
            liquid: p.liquid.map_or(defaults.liquid, |value| value as f32),
            speed: p.speed.unwrap_or(defaults.speed),
        };
        let fields = [
            ("pattern_scale", f64::from(params.pattern_scale)),
            ("refraction", f64::from(params.refraction)),
            ("edge", f64::from(params.edge)),
            ("pattern_blur", f64::from(params.pattern_blur)),
            ("liquid", f64::from(params.liquid)),
            ("speed", params.speed),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be finite, got {value}")));
        }

        let defaults = ExportOptions::default();
        let e = &self.export;
        let background = match e.background.as_deref() {
            Some(spec) => spec
                .parse::<Background>()
                .map_err(|err| ConfigError::Invalid(err.to_string()))?,
            None => defaults.background,
        };
        let export = ExportOptions {
            side: e.side.unwrap_or(defaults.side),
            duration_sec: e.duration.unwrap_or(defaults.duration_sec),
            fps: e.fps.unwrap_or(defaults.fps),
            background,
        };
        export
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;

        Ok(ResolvedConfig { params, export })
    }
}

impl ResolvedConfig {
    /// Every value spelled out, in the same shape the file accepts.
    pub fn to_file_config(&self) -> FileConfig {
        let p = &self.params;
        let e = &self.export;
        FileConfig {
            params: ParamsSection {
                pattern_scale: Some(widen(p.pattern_scale)),
                refraction: Some(widen(p.refraction)),
                edge: Some(widen(p.edge)),
                pattern_blur: Some(widen(p.pattern_blur)),
                liquid: Some(widen(p.liquid)),
                speed: Some(p.speed),
            },
            export: ExportSection {
                side: Some(e.side),
                duration: Some(e.duration_sec),
                fps: Some(e.fps),
                background: Some(e.background.to_string()),
            },
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.to_file_config())?)
    }
}

/// Widens through the shortest decimal form so `0.3f32` is written as `0.3`.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_resolves_to_defaults() {
        let resolved = FileConfig::parse("").unwrap().resolve().unwrap();
        assert_eq!(resolved.params, ShaderParameters::default());
        assert_eq!(resolved.export, ExportOptions::default());
    }

    #[test]
    fn file_values_are_read() {
        let config = FileConfig::parse(
            r##"
            [params]
            pattern_scale = 3.5
            speed = 1.0

            [export]
            side = 256
            background = "#102030"
            "##,
        )
        .unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.params.pattern_scale, 3.5);
        assert_eq!(resolved.params.speed, 1.0);
        assert_eq!(resolved.params.edge, 0.4);
        assert_eq!(resolved.export.side, 256);
        assert_eq!(resolved.export.background, Background::Color([0x10, 0x20, 0x30]));
    }

    #[test]
    fn overlay_wins() {
        let file = FileConfig::parse("[params]\nspeed = 0.5\nliquid = 0.2\n").unwrap();
        let overlay = FileConfig {
            params: ParamsSection {
                speed: Some(2.0),
                ..ParamsSection::default()
            },
            ..FileConfig::default()
        };
        let resolved = file.merge(overlay).resolve().unwrap();
        assert_eq!(resolved.params.speed, 2.0);
        assert_eq!(resolved.params.liquid, 0.2);
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        assert!(matches!(
            FileConfig::parse("[params]\nwobble = 1.0\n"),
            Err(ConfigError::Parse(_))
        ));
        let config = FileConfig::parse("[export]\nbackground = \"sparkly\"\n").unwrap();
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
        let config = FileConfig::parse("[export]\nside = 0\n").unwrap();
        assert!(matches!(config.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn resolved_toml_parses_back() {
        let resolved = FileConfig::default().resolve().unwrap();
        let text = resolved.to_toml().unwrap();
        let reparsed = FileConfig::parse(&text).unwrap().resolve().unwrap();
        assert_eq!(reparsed, resolved);
        assert!(text.contains("background = \"transparent\""));
        assert!(text.contains("speed = 0.3\n"));
    }
}
