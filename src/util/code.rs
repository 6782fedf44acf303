use super::{Code, Position};
use once_cell::unsync::OnceCell;

impl<'c> From<&'c [u8]> for Code<'c> {
    fn from(value: &'c [u8]) -> Self {
        Code::new(value)
    }
}
impl<'c> From<&'c str> for Code<'c> {
    fn from(value: &'c str) -> Self {
        Code::new(value.as_bytes())
    }
}

impl<'c> Code<'c> {
    pub fn new(value: &'c [u8]) -> Self {
        Self {
            value,
            line_starts: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// The byte at `offset`, or [None] once the cursor has reached the end of
    /// the buffer. The terminals of every backend read the input through this.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.value.get(offset).copied()
    }

    /// Whether the literal occurs at `offset`. An offset at or past the end
    /// of the buffer matches nothing.
    pub fn matches_at(&self, offset: usize, literal: &[u8]) -> bool {
        self.value
            .get(offset..)
            .map_or(false, |rest| rest.starts_with(literal))
    }

    /// Offsets of the first byte of every line, always starting with 0.
    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let breaks = self
                .value
                .iter()
                .enumerate()
                .filter_map(|(offset, byte)| if *byte == b'\n' { Some(offset + 1) } else { None });
            std::iter::once(0).chain(breaks).collect()
        })
    }

    /// Resolve a byte offset to its line and column.
    pub fn position_at(&self, offset: usize) -> Position {
        let starts = self.line_starts();
        let line = starts.partition_point(|start| *start <= offset);
        Position {
            line,
            column: offset - starts[line - 1] + 1,
            offset,
        }
    }

    /// The bytes of the line holding `offset`, without the terminating
    /// line break. Failure reports render this under the error message.
    pub fn line_at(&self, offset: usize) -> &[u8] {
        let starts = self.line_starts();
        let line = starts.partition_point(|start| *start <= offset);
        let start = starts[line - 1];
        let end = starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.value.len());
        &self.value[start..end]
    }
}

#[cfg(test)]
mod __tests__ {
    use super::Code;

    #[test]
    fn position_at_test() {
        let code = Code::from("let a\nlet bc\n");

        let first = code.position_at(4);
        assert_eq!((first.line, first.column, first.offset), (1, 5, 4));

        let second = code.position_at(10);
        assert_eq!((second.line, second.column), (2, 5));

        // The offset one past the buffer belongs to the trailing empty line.
        let end = code.position_at(13);
        assert_eq!((end.line, end.column), (3, 1));
    }

    #[test]
    fn line_at_test() {
        let code = Code::from("let a\nlet bc\n");
        assert_eq!(code.line_at(4), b"let a");
        assert_eq!(code.line_at(6), b"let bc");
        assert_eq!(code.line_at(13), b"");
    }

    #[test]
    fn matches_at_test() {
        let code = Code::from("abcde");
        assert!(code.matches_at(0, b"abc"));
        assert!(code.matches_at(3, b"de"));
        assert!(!code.matches_at(3, b"def"));
        assert!(!code.matches_at(9, b"a"));
        assert_eq!(code.byte_at(4), Some(b'e'));
        assert_eq!(code.byte_at(5), None);
    }
}
