//! Fixed-size grouping with placeholder padding

use std::iter::Fuse;
use std::num::NonZeroUsize;

/// Iterator over consecutive groups of exactly `size` slots
///
/// The last group is padded with `None` when the input length is not a
/// multiple of `size`. Each group is pulled from the inner iterator only
/// when requested.
#[derive(Debug, Clone)]
pub struct PaddedChunks<I> {
    inner: Fuse<I>,
    size: NonZeroUsize,
}

impl<I: Iterator> Iterator for PaddedChunks<I> {
    type Item = Vec<Option<I::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.inner.next()?;
        let mut group = Vec::with_capacity(self.size.get());
        group.push(Some(first));
        while group.len() < self.size.get() {
            group.push(self.inner.next());
        }
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.inner.size_hint();
        let size = self.size.get();
        (low.div_ceil(size), high.map(|h| h.div_ceil(size)))
    }
}

/// Group `iter` into padded chunks of `size`
pub fn padded_chunks<I: IntoIterator>(iter: I, size: NonZeroUsize) -> PaddedChunks<I::IntoIter> {
    PaddedChunks {
        inner: iter.into_iter().fuse(),
        size,
    }
}
