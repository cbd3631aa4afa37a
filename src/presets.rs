use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detection::preprocessing::{convert_pixel, to_rgb_pixel};
use crate::models::{ChannelRange, ColorPreset, ColorSpace};

/// Named HSV ranges available without saving anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinColor {
    Red,
    RedWrap,
    Green,
    Blue,
    Yellow,
    Orange,
    Cyan,
    Purple,
    Pink,
    Brown,
    Black,
    Gray,
    White,
}

impl BuiltinColor {
    pub const ALL: [BuiltinColor; 13] = [
        BuiltinColor::Red,
        BuiltinColor::RedWrap,
        BuiltinColor::Green,
        BuiltinColor::Blue,
        BuiltinColor::Yellow,
        BuiltinColor::Orange,
        BuiltinColor::Cyan,
        BuiltinColor::Purple,
        BuiltinColor::Pink,
        BuiltinColor::Brown,
        BuiltinColor::Black,
        BuiltinColor::Gray,
        BuiltinColor::White,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinColor::Red => "Red",
            BuiltinColor::RedWrap => "Red (Wrap)",
            BuiltinColor::Green => "Green",
            BuiltinColor::Blue => "Blue",
            BuiltinColor::Yellow => "Yellow",
            BuiltinColor::Orange => "Orange",
            BuiltinColor::Cyan => "Cyan",
            BuiltinColor::Purple => "Purple",
            BuiltinColor::Pink => "Pink",
            BuiltinColor::Brown => "Brown",
            BuiltinColor::Black => "Black",
            BuiltinColor::Gray => "Gray",
            BuiltinColor::White => "White",
        }
    }

    /// HSV range of this color
    pub fn range(self) -> ChannelRange {
        let (lower, upper) = match self {
            BuiltinColor::Red => ([0, 100, 70], [10, 255, 255]),
            BuiltinColor::RedWrap => ([170, 100, 70], [179, 255, 255]),
            BuiltinColor::Green => ([40, 50, 50], [85, 255, 255]),
            BuiltinColor::Blue => ([95, 80, 50], [130, 255, 255]),
            BuiltinColor::Yellow => ([20, 100, 100], [35, 255, 255]),
            BuiltinColor::Orange => ([10, 120, 120], [25, 255, 255]),
            BuiltinColor::Cyan => ([85, 100, 100], [100, 255, 255]),
            BuiltinColor::Purple => ([130, 80, 50], [160, 255, 255]),
            BuiltinColor::Pink => ([160, 80, 100], [175, 255, 255]),
            BuiltinColor::Brown => ([10, 80, 20], [25, 255, 120]),
            BuiltinColor::Black => ([0, 0, 0], [179, 255, 40]),
            BuiltinColor::Gray => ([0, 0, 40], [179, 50, 180]),
            BuiltinColor::White => ([0, 0, 200], [179, 30, 255]),
        };
        ChannelRange::new(lower, upper)
    }

    pub fn preset(self) -> ColorPreset {
        ColorPreset::new(self.name(), ColorSpace::Hsv, self.range())
    }

    /// Colors whose hue band needs a second preset on the far side of 0
    pub fn companion(self) -> Option<BuiltinColor> {
        match self {
            BuiltinColor::Red => Some(BuiltinColor::RedWrap),
            _ => None,
        }
    }
}

impl fmt::Display for BuiltinColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinColor {
    type Err = anyhow::Error;

    /// Accepts the display name or a compact form such as `red-wrap`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize(s);
        BuiltinColor::ALL
            .into_iter()
            .find(|color| normalize(color.name()) == key)
            .ok_or_else(|| anyhow::anyhow!("unknown built-in color {:?}", s.trim()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect::<String>()
        .replace("grey", "gray")
}

/// Half-widths of the range built around a picked color
pub fn picker_tolerance(space: ColorSpace) -> [u8; 3] {
    match space {
        ColorSpace::Hsv => [10, 50, 50],
        ColorSpace::Bgr | ColorSpace::Rgb => [25, 25, 25],
        ColorSpace::Lab => [10, 20, 20],
        ColorSpace::YCrCb => [20, 20, 20],
    }
}

impl ChannelRange {
    /// Range centered on an RGB color once converted into `space`
    ///
    /// Bounds are clamped to each channel's domain, so a hue near 0 does
    /// not wrap.
    pub fn around(rgb: [u8; 3], space: ColorSpace) -> ChannelRange {
        let center = convert_pixel(rgb, space);
        let tolerance = picker_tolerance(space);
        let max = space.domain_max();

        let mut lower = [0u8; 3];
        let mut upper = [0u8; 3];
        for c in 0..3 {
            lower[c] = center[c].saturating_sub(tolerance[c]);
            upper[c] = center[c].saturating_add(tolerance[c]).min(max[c]);
        }
        ChannelRange { lower, upper }
    }
}

impl ColorPreset {
    /// Representative RGB color for list swatches
    pub fn swatch_rgb(&self) -> [u8; 3] {
        let mut mid = self.range.midpoint();
        if self.space == ColorSpace::Hsv {
            mid[1] = mid[1].max(100);
            mid[2] = mid[2].max(100);
        }
        to_rgb_pixel(mid, self.space)
    }

    pub fn swatch_hex(&self) -> String {
        let [r, g, b] = self.swatch_rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Result of [`PresetStore::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Replaced,
}

/// Ordered list of saved presets with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetStore {
    presets: Vec<ColorPreset>,
}

impl PresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a preset, replacing any existing one with the same name
    ///
    /// A replaced preset moves to the end. A blank name becomes `Color N`.
    pub fn save(&mut self, mut preset: ColorPreset) -> SaveOutcome {
        let trimmed = preset.name.trim();
        preset.name = if trimmed.is_empty() {
            format!("Color {}", self.presets.len() + 1)
        } else {
            trimmed.to_string()
        };

        let before = self.presets.len();
        self.presets.retain(|existing| existing.name != preset.name);
        let outcome = if self.presets.len() < before {
            SaveOutcome::Replaced
        } else {
            SaveOutcome::Inserted
        };

        log::debug!("{:?} preset '{}' ({})", outcome, preset.name, preset.space);
        self.presets.push(preset);
        outcome
    }

    /// Add a preset only if its name is not taken yet
    pub fn insert_if_absent(&mut self, preset: ColorPreset) -> bool {
        if self.contains(&preset.name) {
            return false;
        }
        self.presets.push(preset);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<ColorPreset> {
        (index < self.presets.len()).then(|| self.presets.remove(index))
    }

    pub fn remove_named(&mut self, name: &str) -> Option<ColorPreset> {
        let index = self.presets.iter().position(|p| p.name == name)?;
        Some(self.presets.remove(index))
    }

    pub fn clear(&mut self) {
        self.presets.clear();
    }

    pub fn get(&self, name: &str) -> Option<&ColorPreset> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Presets saved in `space`, in store order
    pub fn matching(&self, space: ColorSpace) -> impl Iterator<Item = &ColorPreset> {
        self.presets.iter().filter(move |p| p.space == space)
    }

    pub fn to_vec(&self) -> Vec<ColorPreset> {
        self.presets.clone()
    }
}
