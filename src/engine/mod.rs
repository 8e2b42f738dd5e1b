//! Adaptive learning math: recall grading, SM-2 scheduling, due queues,
//! proficiency estimation and diagnostic sampling.
//!
//! Everything in here is pure and synchronous. Persistence lives in
//! [`crate::store`] and [`crate::database`].

pub mod diagnostic;
pub mod proficiency;
pub mod quality;
pub mod review_queue;
pub mod skill_status;
pub mod sm2;

pub use diagnostic::select_diagnostic;
pub use proficiency::{confidence, estimate, summarize};
pub use quality::classify as classify_answer;
pub use review_queue::{due_items, stats};
pub use skill_status::classify as classify_skill;
pub use sm2::{Schedule, advance};
