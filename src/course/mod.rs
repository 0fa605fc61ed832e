/// Course document model: typed units, lessons, blocks and the roster
pub mod roster;
pub mod types;

pub use roster::parse_student_list;
pub use types::*;
