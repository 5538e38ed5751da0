//! Header accessor: get, set, add and delete headers directly in the raw bytes.
//!
//! Every mutator returns a fresh buffer and leaves its input untouched. New
//! lines are always written as `Name: Value\r\n`.

use crate::{
    errors::ErrorKind,
    http::{
        scan::{self, header_block_start},
        types::{self, HeaderSpan, Lines},
    },
};

/// Returns the trimmed value of the first header called `name`
/// (case-insensitive), or `None` when it is absent.
///
/// # Examples
/// ```
/// use wirecast::http::header;
///
/// let buf = b"POST /post HTTP/1.1\r\nContent-Length: 7\r\nHost: www.w3.org\r\n\r\na=1&b=2";
///
/// assert_eq!(header::header(buf, b"Content-Length"), Some(&b"7"[..]));
/// assert_eq!(header::header(buf, b"Cookie"), None);
/// ```
#[inline]
pub fn header<'a>(buf: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    scan::find_header(buf, name).map(|span| &buf[span.value_start..span.value_end])
}

/// Replaces the value of header `name`, or inserts `name: value` as the first
/// header line when it is absent.
///
/// On replacement everything after the `:` is rewritten as a single space plus
/// `value`, and a bare `\n` terminator on that line becomes `\r\n`. Other lines
/// and the body are copied unchanged.
///
/// # Examples
/// ```
/// use wirecast::http::header::set_header;
///
/// let buf = b"POST /post HTTP/1.1\r\nContent-Length: 7\r\n\r\na=1&b=2";
///
/// assert_eq!(
///     set_header(buf, b"Content-Length", b"14").unwrap(),
///     b"POST /post HTTP/1.1\r\nContent-Length: 14\r\n\r\na=1&b=2"
/// );
/// assert_eq!(
///     set_header(buf, b"User-Agent", b"Gor").unwrap(),
///     b"POST /post HTTP/1.1\r\nUser-Agent: Gor\r\nContent-Length: 7\r\n\r\na=1&b=2"
/// );
/// ```
#[inline]
pub fn set_header(buf: &[u8], name: &[u8], value: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let start = header_block_start(buf)?;

    match scan::find_header(buf, name) {
        Some(span) => Ok(replace_value(buf, &span, value)),
        None => Ok(insert_line(buf, start, name, value)),
    }
}

/// Inserts `name: value` as the first header line, even when a header with
/// the same name already exists.
#[inline]
pub fn add_header(buf: &[u8], name: &[u8], value: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let start = header_block_start(buf)?;
    Ok(insert_line(buf, start, name, value))
}

/// Removes the whole line of the first header called `name`, terminator
/// included. Returns an unchanged copy when the header is absent.
///
/// # Examples
/// ```
/// use wirecast::http::header::delete_header;
///
/// let buf = b"GET / HTTP/1.1\r\nUser-Agent: Gor \r\nHost: a\r\n\r\n";
///
/// assert_eq!(delete_header(buf, b"user-agent").unwrap(), b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");
/// assert_eq!(delete_header(buf, b"Cookie").unwrap(), buf);
/// ```
#[inline]
pub fn delete_header(buf: &[u8], name: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    header_block_start(buf)?;

    match scan::find_header(buf, name) {
        Some(span) => Ok(types::splice(buf, span.line_start, span.line_next, &[])),
        None => Ok(buf.to_vec()),
    }
}

/// Iterates over every `(name, value)` pair of the header block, in order.
///
/// Lines without a `:` are skipped.
#[inline]
pub fn headers(buf: &[u8]) -> HeaderIter<'_> {
    let start = header_block_start(buf).unwrap_or(buf.len());

    HeaderIter {
        buf,
        lines: Lines::new(buf, start),
    }
}

/// Iterator returned by [`headers`].
#[derive(Debug, Clone)]
pub struct HeaderIter<'a> {
    buf: &'a [u8],
    lines: Lines<'a>,
}

impl<'a> Iterator for HeaderIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let buf = self.buf;

        for line in self.lines.by_ref() {
            if line.is_empty() {
                break;
            }

            if let Some(span) = scan::split_header(buf, line) {
                return Some((
                    &buf[span.name_start..span.name_end],
                    &buf[span.value_start..span.value_end],
                ));
            }
        }

        None
    }
}

#[inline]
fn replace_value(buf: &[u8], span: &HeaderSpan, value: &[u8]) -> Vec<u8> {
    let terminator: &[u8] = match span.line_next > span.line_end {
        true => b"\r\n",
        false => b"",
    };

    types::splice(
        buf,
        span.name_end + 1,
        span.line_next,
        &[b" ", value, terminator],
    )
}

#[inline]
fn insert_line(buf: &[u8], at: usize, name: &[u8], value: &[u8]) -> Vec<u8> {
    types::splice(buf, at, at, &[name, b": ", value, b"\r\n"])
}
