use std::fmt;
use std::str::FromStr;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::error::PipelineIssue;
use crate::pipeline::BoundingBox;

/// Color space a frame is converted into before thresholding
///
/// Frames enter the pipeline in RGB order, so `Rgb` is the identity
/// conversion and `Bgr` only swaps the outer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    #[serde(rename = "HSV")]
    Hsv,
    #[serde(rename = "BGR")]
    Bgr,
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "Lab")]
    Lab,
    #[serde(rename = "YCrCb")]
    YCrCb,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 5] = [
        ColorSpace::Hsv,
        ColorSpace::Bgr,
        ColorSpace::Rgb,
        ColorSpace::Lab,
        ColorSpace::YCrCb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorSpace::Hsv => "HSV",
            ColorSpace::Bgr => "BGR",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Lab => "Lab",
            ColorSpace::YCrCb => "YCrCb",
        }
    }

    pub fn channel_labels(self) -> [&'static str; 3] {
        match self {
            ColorSpace::Hsv => ["H - Hue", "S - Saturation", "V - Value"],
            ColorSpace::Bgr => ["B - Blue", "G - Green", "R - Red"],
            ColorSpace::Rgb => ["R - Red", "G - Green", "B - Blue"],
            ColorSpace::Lab => ["L - Lightness", "a - Green-Red", "b - Blue-Yellow"],
            ColorSpace::YCrCb => ["Y - Luma", "Cr - Red diff", "Cb - Blue diff"],
        }
    }

    /// Largest valid value of each channel; hue is stored as degrees / 2
    pub fn domain_max(self) -> [u8; 3] {
        match self {
            ColorSpace::Hsv => [179, 255, 255],
            _ => [255, 255, 255],
        }
    }

    /// Whether channel 1 is circular, which gives `min > max` its wrap meaning
    pub fn has_cyclic_first_channel(self) -> bool {
        matches!(self, ColorSpace::Hsv)
    }

    /// Range a newly selected space starts with
    pub fn default_range(self) -> ChannelRange {
        match self {
            ColorSpace::Hsv => ChannelRange::new([0, 50, 50], [179, 255, 255]),
            _ => ChannelRange::new([0, 0, 0], [255, 255, 255]),
        }
    }

    /// Parses a space name, falling back to HSV for anything unknown
    pub fn resolve(name: &str) -> (ColorSpace, Option<PipelineIssue>) {
        match name.parse() {
            Ok(space) => (space, None),
            Err(issue) => {
                log::warn!("{}", issue);
                (ColorSpace::Hsv, Some(issue))
            }
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorSpace {
    type Err = PipelineIssue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ColorSpace::ALL
            .into_iter()
            .find(|space| space.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PipelineIssue::UnsupportedColorSpace {
                requested: trimmed.to_string(),
            })
    }
}

/// Inclusive per-channel bounds
///
/// Channels 2 and 3 always satisfy `lower <= upper`. Channel 1 may be
/// inverted, which on a cyclic channel selects `[0, upper] ∪ [lower, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ChannelRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// True when channel 1 is inverted and the space treats that as wrap-around
    pub fn wraps(&self, space: ColorSpace) -> bool {
        self.lower[0] > self.upper[0] && space.has_cyclic_first_channel()
    }

    pub fn contains(&self, pixel: [u8; 3], space: ColorSpace) -> bool {
        let first = if self.wraps(space) {
            pixel[0] <= self.upper[0] || pixel[0] >= self.lower[0]
        } else {
            pixel[0] >= self.lower[0] && pixel[0] <= self.upper[0]
        };

        first
            && (1..3).all(|c| pixel[c] >= self.lower[c] && pixel[c] <= self.upper[c])
    }

    /// Midpoint of each channel, used for swatches
    pub fn midpoint(&self) -> [u8; 3] {
        let mid = |c: usize| ((self.lower[c] as u16 + self.upper[c] as u16) / 2) as u8;
        [mid(0), mid(1), mid(2)]
    }
}

impl Default for ChannelRange {
    fn default() -> Self {
        ColorSpace::Hsv.default_range()
    }
}

impl fmt::Display for ChannelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{},{}-{},{}-{}",
            self.lower[0], self.upper[0], self.lower[1], self.upper[1], self.lower[2], self.upper[2]
        )
    }
}

impl FromStr for ChannelRange {
    type Err = anyhow::Error;

    /// Parses `"a-b,c-d,e-f"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            anyhow::bail!("expected three channel ranges like 0-10,100-255,70-255, got {:?}", s);
        }

        let mut lower = [0u8; 3];
        let mut upper = [0u8; 3];
        for (c, part) in parts.iter().enumerate() {
            let (min, max) = part
                .split_once('-')
                .ok_or_else(|| anyhow::anyhow!("channel {} range {:?} is missing '-'", c + 1, part))?;
            lower[c] = min.trim().parse()?;
            upper[c] = max.trim().parse()?;
            if c > 0 && lower[c] > upper[c] {
                anyhow::bail!("channel {} range {:?} has min greater than max", c + 1, part);
            }
        }

        Ok(Self { lower, upper })
    }
}

/// A saved, named range in a specific color space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPreset {
    pub name: String,
    pub space: ColorSpace,
    pub range: ChannelRange,
}

impl ColorPreset {
    pub fn new(name: impl Into<String>, space: ColorSpace, range: ChannelRange) -> Self {
        Self {
            name: name.into(),
            space,
            range,
        }
    }
}

/// Gaussian smoothing kernel size, 0 disables the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlurParam {
    pub kernel: u32,
}

impl BlurParam {
    /// Kernel actually applied: even requests are rounded up to odd
    pub fn effective_kernel(&self) -> Option<u32> {
        match self.kernel {
            0 => None,
            k if k % 2 == 0 => Some(k + 1),
            k => Some(k),
        }
    }
}

impl Default for BlurParam {
    fn default() -> Self {
        Self { kernel: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyParams {
    pub erosion: u32,
    pub dilation: u32,
}

impl Default for MorphologyParams {
    fn default() -> Self {
        Self {
            erosion: 1,
            dilation: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourFilterParams {
    /// Contours need strictly more enclosed area than this to count
    pub min_area: f64,
    pub show_contours: bool,
    pub show_bounding_boxes: bool,
    pub show_center: bool,
}

impl Default for ContourFilterParams {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            show_contours: true,
            show_bounding_boxes: true,
            show_center: true,
        }
    }
}

/// Which ranges feed the threshold stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeSelection {
    Single(ChannelRange),
    /// Saved presets; only those in the active space contribute
    Multi(Vec<ColorPreset>),
}

impl RangeSelection {
    /// Ranges that apply to a frame converted into `space`
    pub fn active(&self, space: ColorSpace) -> Vec<ChannelRange> {
        match self {
            RangeSelection::Single(range) => vec![*range],
            RangeSelection::Multi(presets) => presets
                .iter()
                .filter(|preset| preset.space == space)
                .map(|preset| preset.range)
                .collect(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, RangeSelection::Multi(_))
    }
}

impl Default for RangeSelection {
    fn default() -> Self {
        RangeSelection::Single(ChannelRange::default())
    }
}

/// Everything one pipeline run needs, captured once per tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub space: ColorSpace,
    pub ranges: RangeSelection,
    pub blur: BlurParam,
    pub morphology: MorphologyParams,
    pub contours: ContourFilterParams,
}

/// One accepted contour and the values derived from it
#[derive(Debug, Clone)]
pub struct Detection {
    /// Boundary pixels of the external border, in tracing order
    pub points: Vec<Point<i32>>,
    pub area: f64,
    pub bbox: BoundingBox,
    /// Area-weighted center, `None` when the zeroth moment is zero
    pub centroid: Option<(i32, i32)>,
}

impl Detection {
    pub fn width(&self) -> u32 {
        self.bbox.width
    }

    pub fn height(&self) -> u32 {
        self.bbox.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_labels_follow_channel_order() {
        assert_eq!(ColorSpace::Bgr.channel_labels()[0], "B - Blue");
        assert_eq!(ColorSpace::Rgb.channel_labels()[0], "R - Red");
        assert_eq!(ColorSpace::Hsv.channel_labels().join(", "), "H - Hue, S - Saturation, V - Value");
    }

    #[test]
    fn parses_space_names_case_insensitively() {
        assert_eq!("hsv".parse::<ColorSpace>().unwrap(), ColorSpace::Hsv);
        assert_eq!(" YCRCB ".parse::<ColorSpace>().unwrap(), ColorSpace::YCrCb);
        assert_eq!("lab".parse::<ColorSpace>().unwrap(), ColorSpace::Lab);
    }

    #[test]
    fn unknown_space_resolves_to_hsv_with_issue() {
        let (space, issue) = ColorSpace::resolve("CMYK");
        assert_eq!(space, ColorSpace::Hsv);
        assert_eq!(
            issue,
            Some(PipelineIssue::UnsupportedColorSpace {
                requested: "CMYK".to_string()
            })
        );
    }

    #[test]
    fn range_text_round_trips_through_display() {
        let range: ChannelRange = "170-10,100-255,70-255".parse().unwrap();
        assert_eq!(range.lower, [170, 100, 70]);
        assert_eq!(range.upper, [10, 255, 255]);
        assert_eq!(range.to_string(), "170-10,100-255,70-255");
    }

    #[test]
    fn range_text_rejects_inverted_secondary_channels() {
        assert!("0-10,200-100,0-255".parse::<ChannelRange>().is_err());
        assert!("0-10,0-255".parse::<ChannelRange>().is_err());
        assert!("0-300,0-255,0-255".parse::<ChannelRange>().is_err());
    }

    #[test]
    fn even_blur_kernels_round_up() {
        assert_eq!(BlurParam { kernel: 0 }.effective_kernel(), None);
        assert_eq!(BlurParam { kernel: 1 }.effective_kernel(), Some(1));
        assert_eq!(BlurParam { kernel: 4 }.effective_kernel(), Some(5));
        assert_eq!(BlurParam { kernel: 7 }.effective_kernel(), Some(7));
    }

    #[test]
    fn multi_selection_skips_other_spaces() {
        let selection = RangeSelection::Multi(vec![
            ColorPreset::new("a", ColorSpace::Hsv, ChannelRange::new([0; 3], [10; 3])),
            ColorPreset::new("b", ColorSpace::Lab, ChannelRange::new([0; 3], [20; 3])),
            ColorPreset::new("c", ColorSpace::Hsv, ChannelRange::new([0; 3], [30; 3])),
        ]);
        let active = selection.active(ColorSpace::Hsv);
        assert_eq!(active.len(), 2);
        assert_eq!(active[1].upper, [30; 3]);
        assert!(selection.active(ColorSpace::Rgb).is_empty());
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: PipelineParams = serde_json::from_str(r#"{"space":"Lab","ranges":{"Single":{"lower":[0,0,0],"upper":[255,255,255]}},"blur":0,"morphology":{"erosion":0},"contours":{"min_area":42.0}}"#).unwrap();
        assert_eq!(params.space, ColorSpace::Lab);
        assert_eq!(params.blur.effective_kernel(), None);
        assert_eq!(params.morphology.dilation, 2);
        assert!(params.contours.show_center);
        assert_eq!(params.contours.min_area, 42.0);
    }
}
