//! Adaptive learning engine: SM-2 review scheduling, decay-weighted skill
//! proficiency and topic-balanced diagnostic selection.

pub mod cache;
pub mod clock;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod service;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use database::SqliteItemStore;
pub use error::{EngineError, Result};
pub use models::{
    AnswerEvent, ItemId, ItemKey, Quality, Question, QuestionBank, ReviewItem, ReviewStats,
    SkillStatus, SkillSummary,
};
pub use service::AdaptiveEngine;
pub use session::ReviewSession;
pub use store::{ItemStore, MemoryItemStore};
