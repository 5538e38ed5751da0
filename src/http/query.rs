//! Zero-copy query string scanner that keeps byte offsets.
//!
//! Unlike a decoder, this never percent-decodes and never allocates: keys and
//! values are slices of the original buffer, and every pair carries its
//! absolute position so that callers can splice a new value in place.

use crate::http::types::QueryParam;
use memchr::memchr;

/// Iterator over the `&`-joined `key=value` pairs of a query string.
///
/// # Examples
/// ```rust
/// use wirecast::http::query::QueryPairs;
///
/// let buf = b"/post?debug&name=&=Qwe&key=sda";
/// // The query string starts right after `?`, at offset 6.
/// let pairs: Vec<(&[u8], &[u8])> = QueryPairs::new(&buf[6..], 6)
///     .map(|(key, param)| (key, param.value))
///     .collect();
///
/// assert_eq!(pairs.len(), 4);
/// assert_eq!(pairs[0], (&b"debug"[..], &b""[..]));
/// assert_eq!(pairs[1], (&b"name"[..], &b""[..]));
/// assert_eq!(pairs[2], (&b""[..], &b"Qwe"[..]));
/// assert_eq!(pairs[3], (&b"key"[..], &b"sda"[..]));
/// ```
#[derive(Debug, Clone)]
pub struct QueryPairs<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> QueryPairs<'a> {
    /// Scans `query` (without its leading `?`), which starts at offset `base`
    /// of the enclosing buffer.
    #[inline(always)]
    pub fn new(query: &'a [u8], base: usize) -> Self {
        QueryPairs {
            data: query,
            base,
            pos: 0,
        }
    }
}

impl<'a> Iterator for QueryPairs<'a> {
    type Item = (&'a [u8], QueryParam<'a>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        let start = self.pos;
        if start >= data.len() {
            return None;
        }

        // Find next '&' or end of string
        let end = memchr(b'&', &data[start..])
            .map(|pos| start + pos)
            .unwrap_or(data.len());

        // A pair without '=' is a key with an empty value at its end
        let split = memchr(b'=', &data[start..end])
            .map(|pos| start + pos)
            .unwrap_or(end);
        let value_start = match split < end {
            true => split + 1,
            false => end,
        };

        self.pos = end + 1;

        Some((
            &data[start..split],
            QueryParam {
                value: &data[value_start..end],
                key_start: self.base + start,
                value_start: self.base + value_start,
                value_end: self.base + end,
            },
        ))
    }
}

/// Returns the first pair whose key equals `key` exactly (case-sensitive).
#[inline]
pub fn find<'a>(query: &'a [u8], base: usize, key: &[u8]) -> Option<QueryParam<'a>> {
    QueryPairs::new(query, base)
        .find(|(k, _)| *k == key)
        .map(|(_, param)| param)
}
