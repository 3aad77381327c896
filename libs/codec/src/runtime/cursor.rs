//! Read position within the caller's `[start, end)` range

use bytes::Bytes;

/// Never reads at or past `end`
pub(crate) struct Cursor<'i> {
    input: &'i Bytes,
    pos: usize,
    end: usize,
}

impl<'i> Cursor<'i> {
    /// Caller has validated `start <= end <= input.len()`
    pub(crate) fn new(input: &'i Bytes, start: usize, end: usize) -> Self {
        Self {
            input,
            pos: start,
            end,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn available(&self) -> usize {
        self.end - self.pos
    }

    /// Unread bytes up to `end`
    pub(crate) fn remaining(&self) -> &'i [u8] {
        let input: &'i [u8] = self.input;
        &input[self.pos..self.end]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.end);
    }

    /// Borrow the next `n` bytes; `n` must not exceed [`available`](Self::available)
    pub(crate) fn take_slice(&mut self, n: usize) -> &'i [u8] {
        let input: &'i [u8] = self.input;
        let slice = &input[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    /// Zero-copy slice of the next `n` bytes
    pub(crate) fn take(&mut self, n: usize) -> Bytes {
        let slice = self.input.slice(self.pos..self.pos + n);
        self.pos += n;
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stays_inside_range() {
        let input = Bytes::from_static(b"0123456789");
        let mut cursor = Cursor::new(&input, 2, 6);
        assert_eq!(cursor.available(), 4);
        assert_eq!(cursor.take_slice(1), b"2");
        assert_eq!(cursor.take(2), Bytes::from_static(b"34"));
        assert_eq!(cursor.remaining(), b"5");
        cursor.advance(10);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.available(), 0);
    }
}
