/// Creation-order number of a node
///
/// Every node receives a sequence number when it is constructed, either by a call to its `new()`
/// function or by the decoder once the node has been fully read. Dictionaries use it to restore
/// the original element order when they are written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// the raw value of the sequence number
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Allocator for sequence numbers, owned by a document
///
/// The counter starts at zero, the first allocated number is 1.
#[derive(Debug, Default)]
pub struct BuildContext {
    last: u64,
}

impl BuildContext {
    /// create a new context; the first number it hands out is 1
    #[must_use]
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// allocate the next sequence number
    ///
    /// # Panics
    ///
    /// Panics if the counter would wrap. Sequence numbers are never reused.
    pub fn next_sequence(&mut self) -> SequenceNumber {
        match self.last.checked_add(1) {
            Some(next) => {
                self.last = next;
                SequenceNumber(next)
            }
            None => panic!("sequence number space of the BuildContext is exhausted"),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_last(last: u64) -> Self {
        Self { last }
    }
}
