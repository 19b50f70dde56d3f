//! Feedback service components
//!
//! - [`IngestionService`]: uploaded chunk to stored feedback record
//! - [`AudioStorage`]: artifact storage under the uploads directory
//! - [`QuestionPlanner`]: question list composition at session creation

pub mod audio_storage;
pub mod ingestion;
pub mod question_bank;
pub mod question_planner;
pub mod resume_questions;

pub use audio_storage::{AudioStorage, FsAudioStorage};
pub use ingestion::{ChunkUpload, IngestionService};
pub use question_bank::{QuestionSource, StaticQuestionBank};
pub use question_planner::{QuestionPlan, QuestionPlanner};
