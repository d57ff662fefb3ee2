use std::num::NonZeroUsize;

use crate::error::BuildError;

/// Splits a slice into pages of a fixed size.
///
/// Pages are computed on demand; a paginator can be iterated any number of
/// times.
#[derive(Debug)]
pub struct Paginator<'a, T> {
    items: &'a [T],
    size: NonZeroUsize,
}

impl<T> Clone for Paginator<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Paginator<'_, T> { }

/// Pages of `page_size` items each; the last page may be shorter.
/// A `page_size` that isn't positive is a configuration error.
///
/// ```rust
/// let items = [1, 2, 3, 4, 5];
/// let pages = folio::filters::paginate(&items, 2).unwrap();
/// assert_eq!(pages.len(), 3);
/// assert_eq!(pages.iter().last(), Some(&[5][..]));
/// ```
pub fn paginate<T>(items: &[T], page_size: i64) -> Result<Paginator<'_, T>, BuildError> {
    let size = usize::try_from(page_size).ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| BuildError::configuration("page_size", format!("{page_size} is not positive")))?;

    Ok(Paginator { items, size })
}

impl<'a, T> Paginator<'a, T> {
    pub fn iter(&self) -> std::slice::Chunks<'a, T> {
        self.items.chunks(self.size.get())
    }

    /// The number of pages: `ceil(items / size)`.
    pub fn len(&self) -> usize {
        self.items.len().div_ceil(self.size.get())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page_size(&self) -> usize {
        self.size.get()
    }

    /// The zero-indexed page `n`, if there is one.
    pub fn page(&self, n: usize) -> Option<&'a [T]> {
        let start = n.checked_mul(self.size.get())?;
        if start >= self.items.len() {
            return None;
        }

        let end = start.saturating_add(self.size.get()).min(self.items.len());
        Some(&self.items[start..end])
    }
}

impl<'a, T> IntoIterator for Paginator<'a, T> {
    type Item = &'a [T];
    type IntoIter = std::slice::Chunks<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Kind;

    use super::*;

    #[test]
    fn page_counts_and_order() {
        for n in 0..30usize {
            let items: Vec<usize> = (0..n).collect();
            for size in 1..12i64 {
                let pages = paginate(&items, size).unwrap();
                let expected = n.div_ceil(size as usize);
                assert_eq!(pages.len(), expected);
                assert_eq!(pages.iter().count(), expected);

                let joined: Vec<usize> = pages.iter().flatten().copied().collect();
                assert_eq!(joined, items);
                assert!(pages.iter().all(|p| p.len() <= size as usize && !p.is_empty()));
            }
        }
    }

    #[test]
    fn restartable() {
        let items = [1, 2, 3];
        let pages = paginate(&items, 2).unwrap();
        let first: Vec<_> = pages.iter().collect();
        let second: Vec<_> = pages.into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(pages.page(1), Some(&[3][..]));
        assert_eq!(pages.page(2), None);
    }

    #[test]
    fn non_positive_sizes() {
        for size in [0, -1, i64::MIN] {
            let error = paginate(&[1], size).unwrap_err();
            assert_eq!(error.kind(), Kind::Configuration);
        }
    }
}
