//! Ordered header multimap backed by a single reusable byte arena.

use crate::WriteBuffer;
use std::{fmt, ops::Range};

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    name: Range<usize>,
    value: Range<usize>,
}

/// Header storage shared by the pooled [`Request`](crate::Request) and
/// [`Response`](crate::Response).
///
/// Names and values are written into one byte buffer and referenced by
/// offset, so a warmed-up map adds headers without allocating. Lookups are
/// linear and ASCII case-insensitive
/// (per [RFC 9110](https://datatracker.ietf.org/doc/html/rfc9110#section-5.1)).
/// Repeated names are kept as separate entries in insertion order.
///
/// # Examples
/// ```
/// # maker_adaptor::run_test(|_, resp| {
/// let headers = resp.headers_mut();
///
/// headers.add("set-cookie", "a=1");
/// headers.add("Set-Cookie", "b=2");
/// headers.set("x-request-id", 42);
///
/// assert_eq!(headers.get_all("set-cookie").count(), 2);
/// assert_eq!(headers.get_str("X-Request-Id"), Some("42"));
/// # resp.finish()
/// # });
/// ```
#[derive(Clone, PartialEq)]
pub struct HeaderMap {
    buf: Vec<u8>,
    entries: Vec<Entry>,
}

impl HeaderMap {
    #[inline]
    pub(crate) fn with_capacity(count: usize, bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            entries: Vec::with_capacity(count),
        }
    }

    /// Clears the map, reallocating the arena if a large request grew it
    /// past `max_bytes`.
    #[inline]
    pub(crate) fn reset(&mut self, max_bytes: usize, count: usize, bytes: usize) {
        if self.buf.capacity() > max_bytes {
            *self = Self::with_capacity(count, bytes);
        } else {
            self.clear();
        }
    }

    #[inline(always)]
    fn name_of(&self, entry: &Entry) -> &[u8] {
        &self.buf[entry.name.clone()]
    }

    #[inline(always)]
    fn value_of(&self, entry: &Entry) -> &[u8] {
        &self.buf[entry.value.clone()]
    }
}

impl HeaderMap {
    /// Appends a header, keeping any existing values with the same name.
    #[inline]
    pub fn add<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        let start = self.buf.len();
        name.write_to(&mut self.buf);
        let middle = self.buf.len();
        value.write_to(&mut self.buf);

        self.entries.push(Entry {
            name: start..middle,
            value: middle..self.buf.len(),
        });
        self
    }

    /// Replaces every value of `name` with a single `value`.
    #[inline]
    pub fn set<N: WriteBuffer, V: WriteBuffer>(&mut self, name: N, value: V) -> &mut Self {
        let start = self.buf.len();
        name.write_to(&mut self.buf);
        let name_end = self.buf.len();

        let name_range = start..name_end;
        let buf = &self.buf;
        self.entries
            .retain(|e| !buf[e.name.clone()].eq_ignore_ascii_case(&buf[name_range.clone()]));

        value.write_to(&mut self.buf);
        self.entries.push(Entry {
            name: name_range,
            value: name_end..self.buf.len(),
        });
        self
    }

    /// Returns the first value stored under `name`.
    #[inline]
    pub fn get<N: AsRef<[u8]>>(&self, name: N) -> Option<&[u8]> {
        self.get_all(name).next()
    }

    /// Returns the first value stored under `name` if it is valid UTF-8.
    #[inline]
    pub fn get_str<N: AsRef<[u8]>>(&self, name: N) -> Option<&str> {
        simdutf8::basic::from_utf8(self.get(name)?).ok()
    }

    /// Iterates over every value stored under `name`, in insertion order.
    #[inline]
    pub fn get_all<N: AsRef<[u8]>>(&self, name: N) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().filter_map(move |entry| {
            self.name_of(entry)
                .eq_ignore_ascii_case(name.as_ref())
                .then(|| self.value_of(entry))
        })
    }

    /// Removes every value stored under `name` and returns how many there were.
    ///
    /// The arena keeps the removed bytes until the map is cleared.
    #[inline]
    pub fn remove<N: AsRef<[u8]>>(&mut self, name: N) -> usize {
        let before = self.entries.len();
        let buf = &self.buf;
        self.entries
            .retain(|e| !buf[e.name.clone()].eq_ignore_ascii_case(name.as_ref()));

        before - self.entries.len()
    }

    #[inline]
    pub fn contains<N: AsRef<[u8]>>(&self, name: N) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|entry| (self.name_of(entry), self.value_of(entry)))
    }

    /// Number of stored values (not distinct names).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
        self.entries.clear();
    }
}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(name, value)| {
                (String::from_utf8_lossy(name), String::from_utf8_lossy(value))
            }))
            .finish()
    }
}
