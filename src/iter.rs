//! Order-preserving deduplication of (possibly unbounded) sequences.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::iter::FusedIterator;

/// Iterator over the unique elements of `iter`, in first-occurrence order.
///
/// Created by [`unique_everseen`]. Every element seen is remembered for the
/// lifetime of the iterator; the memory is released when it is dropped.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct UniqueEverseen<I>
where
    I: Iterator,
{
    iter: I,
    seen: HashSet<I::Item>,
}

impl<I> Clone for UniqueEverseen<I>
where
    I: Iterator + Clone,
    I::Item: Clone,
{
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
            seen: self.seen.clone(),
        }
    }
}

impl<I> fmt::Debug for UniqueEverseen<I>
where
    I: Iterator + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueEverseen")
            .field("iter", &self.iter)
            .field("seen", &self.seen.len())
            .finish()
    }
}

impl<I> Iterator for UniqueEverseen<I>
where
    I: Iterator,
    I::Item: Eq + Hash + Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let seen = &mut self.seen;
        self.iter.find(|item| seen.insert(item.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.iter.size_hint();
        ((low > 0 && self.seen.is_empty()) as usize, high)
    }
}

impl<I> FusedIterator for UniqueEverseen<I>
where
    I: FusedIterator,
    I::Item: Eq + Hash + Clone,
{
}

/// Iterator over elements with a unique key, in first-occurrence order.
///
/// Created by [`unique_everseen_by`].
#[derive(Clone)]
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct UniqueEverseenBy<I, K, F> {
    iter: I,
    seen: HashSet<K>,
    key: F,
}

impl<I, K, F> Iterator for UniqueEverseenBy<I, K, F>
where
    I: Iterator,
    K: Eq + Hash,
    F: FnMut(&I::Item) -> K,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let seen = &mut self.seen;
        let key = &mut self.key;
        self.iter.find(|item| seen.insert(key(item)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (low, high) = self.iter.size_hint();
        ((low > 0 && self.seen.is_empty()) as usize, high)
    }
}

impl<I, K, F> FusedIterator for UniqueEverseenBy<I, K, F>
where
    I: FusedIterator,
    K: Eq + Hash,
    F: FnMut(&I::Item) -> K,
{
}

/// List unique elements, preserving order; remembers every element seen.
///
/// Lazy: works on infinite and streaming input.
///
/// ```
/// use pronto_utils::iter::unique_everseen;
///
/// let letters: String = unique_everseen("AAAABBBCCDAABBB".chars()).collect();
/// assert_eq!(letters, "ABCD");
/// ```
pub fn unique_everseen<I>(iterable: I) -> UniqueEverseen<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Eq + Hash + Clone,
{
    UniqueEverseen {
        iter: iterable.into_iter(),
        seen: HashSet::new(),
    }
}

/// List elements whose `key` was not seen before, preserving order.
///
/// ```
/// use pronto_utils::iter::unique_everseen_by;
///
/// let letters: String = unique_everseen_by("ABBCcAD".chars(), |c| c.to_ascii_lowercase()).collect();
/// assert_eq!(letters, "ABCD");
/// ```
pub fn unique_everseen_by<I, K, F>(iterable: I, key: F) -> UniqueEverseenBy<I::IntoIter, K, F>
where
    I: IntoIterator,
    K: Eq + Hash,
    F: FnMut(&I::Item) -> K,
{
    UniqueEverseenBy {
        iter: iterable.into_iter(),
        seen: HashSet::new(),
        key,
    }
}

/// Method-call syntax for [`unique_everseen`] and [`unique_everseen_by`]
pub trait UniqueEverseenExt: Iterator + Sized {
    /// See [`unique_everseen`]
    fn unique_everseen(self) -> UniqueEverseen<Self>
    where
        Self::Item: Eq + Hash + Clone,
    {
        unique_everseen(self)
    }

    /// See [`unique_everseen_by`]
    fn unique_everseen_by<K, F>(self, key: F) -> UniqueEverseenBy<Self, K, F>
    where
        K: Eq + Hash,
        F: FnMut(&Self::Item) -> K,
    {
        unique_everseen_by(self, key)
    }
}

impl<I: Iterator> UniqueEverseenExt for I {}
