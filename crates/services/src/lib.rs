#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod drafts;
pub mod error;
pub mod quiz;

pub use tutor_core::Clock;

pub use api::{CourseworkApi, HttpCourseworkApi};
pub use config::ApiConfig;
pub use drafts::DraftService;
pub use error::{ApiError, ConfigError, DraftError, QuizServiceError};
pub use quiz::{AUTO_SUBMIT_RETRY, LiveQuiz, QuizEvent, QuizService, TimerSlot};
