pub mod config;
pub mod error;
pub mod file_normalizer;
pub mod gemini_service;
pub mod messages;
pub mod models;
pub mod prompt_composer;
pub mod render;
pub mod response_parser;
pub mod schema;
pub mod session;

pub use config::{GatewayConfig, TutorConfig};
pub use error::{GatewayError, TutorError};
pub use file_normalizer::{FileNormalizer, UploadedFile};
pub use gemini_service::GeminiService;
pub use models::*;
pub use prompt_composer::PromptComposer;
pub use render::{render_analysis, segment_math, MathSegment, RenderedAnalysis};
pub use session::{ChatRequest, ChatTurn, Session, SessionView};
