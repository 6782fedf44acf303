use std::fmt::{Display, Formatter};

use super::Position;

impl Position {
    /// Whether this is the location just past the last byte, where failures
    /// about exhausted input point.
    pub fn is_end_of(&self, code: &super::Code) -> bool {
        self.offset >= code.len()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {} (offset {})",
            self.line, self.column, self.offset
        )
    }
}
