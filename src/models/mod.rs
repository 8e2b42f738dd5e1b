pub mod answer_event;
pub mod quality;
pub mod question;
pub mod review_item;
pub mod skill_summary;

pub use answer_event::{AnswerEvent, DiagnosticResponse};
pub use quality::Quality;
pub use question::{Difficulty, Question, QuestionBank};
pub use review_item::{ItemId, ItemKey, RawReviewItem, ReviewItem};
pub use skill_summary::{ReviewStats, SkillStatus, SkillSummary};
