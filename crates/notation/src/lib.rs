pub mod duration;
pub mod layout;
pub mod text;

pub use duration::{duration_ticks, measure_ticks, TICKS_PER_WHOLE};
pub use layout::{LayoutSummary, ScoreLayout, TickLayout};
pub use text::TextScore;
