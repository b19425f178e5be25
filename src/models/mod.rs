pub mod chat;
pub mod devotional;
pub mod profile;
pub mod workout;

pub use chat::{Message, Persona, Role};
pub use devotional::DevotionalContent;
pub use profile::{ActivityLevel, Gender, UserProfile};
pub use workout::{DayStatus, Exercise, WorkoutDay, WorkoutPlan};
