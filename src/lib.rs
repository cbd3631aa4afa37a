pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod presets;
pub mod render;
pub mod session;

pub use detection::{build_standard_pipeline, process_frame, FrameMaskPipeline};
pub use error::{PipelineIssue, SourceError};
pub use models::{
    BlurParam, ChannelRange, ColorPreset, ColorSpace, ContourFilterParams, Detection,
    MorphologyParams, PipelineParams, RangeSelection,
};
pub use pipeline::{
    BoundingBox, DebugConfig, FrameData, FrameOutput, Pipeline, PipelineContext, PipelineStep,
};
pub use presets::{BuiltinColor, PresetStore, SaveOutcome};
pub use session::{Session, Settings, TickOutcome};
