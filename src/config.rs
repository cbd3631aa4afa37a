use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineIssue;
use crate::models::{BlurParam, ChannelRange, ColorPreset, ColorSpace};
use crate::presets::BuiltinColor;
use crate::session::Settings;

/// One saved color as written in a params file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetEntry {
    pub name: String,
    #[serde(default = "default_space_name")]
    pub space: String,
    /// `a-b,c-d,e-f`
    pub range: String,
}

fn default_space_name() -> String {
    ColorSpace::Hsv.name().to_string()
}

/// Tuning overrides; every field is optional
///
/// Used both for JSON params files and for the command-line flags, which
/// are layered on top of the file with [`ParamsFile::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsFile {
    pub space: Option<String>,
    /// Built-in color to load, e.g. `"Red"`
    pub color: Option<String>,
    pub range: Option<String>,
    pub presets: Vec<PresetEntry>,
    pub multi: Option<bool>,
    pub blur: Option<u32>,
    pub erosion: Option<u32>,
    pub dilation: Option<u32>,
    pub min_area: Option<f64>,
    pub show_contours: Option<bool>,
    pub show_bounding_boxes: Option<bool>,
    pub show_center: Option<bool>,
}

impl ParamsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read params file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid params file {}", path.display()))
    }

    /// Values set in `other` win; presets are appended
    pub fn merge(mut self, other: ParamsFile) -> Self {
        self.space = other.space.or(self.space);
        self.color = other.color.or(self.color);
        self.range = other.range.or(self.range);
        self.presets.extend(other.presets);
        self.multi = other.multi.or(self.multi);
        self.blur = other.blur.or(self.blur);
        self.erosion = other.erosion.or(self.erosion);
        self.dilation = other.dilation.or(self.dilation);
        self.min_area = other.min_area.or(self.min_area);
        self.show_contours = other.show_contours.or(self.show_contours);
        self.show_bounding_boxes = other.show_bounding_boxes.or(self.show_bounding_boxes);
        self.show_center = other.show_center.or(self.show_center);
        self
    }

    /// Apply onto `settings`
    ///
    /// Space goes first since switching resets the range; a built-in color
    /// then an explicit range follow. Unknown space names fall back to HSV
    /// and come back as issues, malformed ranges are errors.
    pub fn apply(&self, settings: &mut Settings) -> Result<Vec<PipelineIssue>> {
        let mut issues = Vec::new();

        if let Some(name) = &self.space {
            let (space, issue) = ColorSpace::resolve(name);
            issues.extend(issue);
            settings.set_space(space);
        }
        if let Some(multi) = self.multi {
            settings.set_multi(multi);
        }
        for entry in &self.presets {
            let (preset, issue) = preset_from_parts(&entry.name, &entry.space, &entry.range)?;
            issues.extend(issue);
            settings.presets.save(preset);
        }
        if let Some(name) = &self.color {
            settings.apply_builtin(name.parse()?);
        }
        if let Some(range) = &self.range {
            let range: ChannelRange = range.parse()?;
            settings.set_range(range);
        }

        if let Some(kernel) = self.blur {
            settings.blur = BlurParam { kernel };
        }
        if let Some(erosion) = self.erosion {
            settings.morphology.erosion = erosion;
        }
        if let Some(dilation) = self.dilation {
            settings.morphology.dilation = dilation;
        }
        if let Some(min_area) = self.min_area {
            if !(min_area.is_finite() && min_area > 0.0) {
                anyhow::bail!("min_area must be a positive number, got {}", min_area);
            }
            settings.contours.min_area = min_area;
        }
        if let Some(show) = self.show_contours {
            settings.contours.show_contours = show;
        }
        if let Some(show) = self.show_bounding_boxes {
            settings.contours.show_bounding_boxes = show;
        }
        if let Some(show) = self.show_center {
            settings.contours.show_center = show;
        }

        Ok(issues)
    }
}

fn preset_from_parts(name: &str, space: &str, range: &str) -> Result<(ColorPreset, Option<PipelineIssue>)> {
    let (space, issue) = ColorSpace::resolve(space);
    let range: ChannelRange = range
        .parse()
        .with_context(|| format!("Invalid range for preset {:?}", name))?;
    Ok((ColorPreset::new(name, space, range), issue))
}

/// Parse a preset given on the command line
///
/// Either a built-in color name (`red`) or `name=SPACE:a-b,c-d,e-f`.
pub fn parse_preset_spec(spec: &str) -> Result<PresetEntry> {
    let Some((name, rest)) = spec.split_once('=') else {
        let color: BuiltinColor = spec.parse()?;
        return Ok(PresetEntry {
            name: color.name().to_string(),
            space: default_space_name(),
            range: color.range().to_string(),
        });
    };

    let (space, range) = rest
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected name=SPACE:ranges, got {:?}", spec))?;
    Ok(PresetEntry {
        name: name.trim().to_string(),
        space: space.trim().to_string(),
        range: range.trim().to_string(),
    })
}
