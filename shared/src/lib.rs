pub mod analysis;
pub mod capture;
pub mod config;
pub mod extract;
pub mod fallback;
pub mod gemini;
pub mod nutrition;
pub mod payload;

pub use analysis::{AnalysisError, AnalysisGateway, AnalysisOutcome, AnalysisSource, Timer, VisionModel};
pub use capture::{
    CameraFeed, CameraState, CaptureController, CaptureOutcome, DeviceError, FacingMode,
    MediaDevices, VideoConstraints,
};
pub use config::{AnalyzerConfig, Credential};
pub use nutrition::{FoodAnalysis, Nutrient, NutritionFacts};
pub use payload::{ImagePayload, JPEG_MIME, JPEG_QUALITY};
