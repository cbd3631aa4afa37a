mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from colorfilter for tests
pub use colorfilter::{
    BlurParam, BuiltinColor, ChannelRange, ColorPreset, ColorSpace, ContourFilterParams,
    FrameOutput, MorphologyParams, PipelineIssue, PipelineParams, RangeSelection, SourceError,
};
