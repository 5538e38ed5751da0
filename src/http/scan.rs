//! Byte-offset scanner for the header block of a raw HTTP buffer.
//!
//! Nothing here allocates: every function returns offsets into the buffer it
//! was given. Both `\r\n` and a bare `\n` are accepted as line terminators.

use crate::{
    errors::ErrorKind,
    http::types::{self, HeaderSpan, Line, Lines},
};
use memchr::memchr;

/// Offset of the first byte after the request/status line terminator.
///
/// This is the start of the first header line, or of the empty line when the
/// message has no headers.
///
/// # Examples
/// ```
/// use wirecast::http::scan::header_block_start;
///
/// let buf = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
/// assert_eq!(header_block_start(buf), Ok(16));
/// assert!(header_block_start(b"GET / HTTP/1.1").is_err());
/// ```
#[inline]
pub fn header_block_start(buf: &[u8]) -> Result<usize, ErrorKind> {
    memchr(b'\n', buf)
        .map(|lf| lf + 1)
        .ok_or(ErrorKind::MissingLineTerminator)
}

/// Offset where the header block ends.
///
/// `buf[header_block_start(buf)?..header_block_end(buf)?]` is exactly the
/// header lines with their internal terminators, without the terminator of
/// the last header, the empty line or the body. Equals
/// [`header_block_start`] when there are no headers.
///
/// A truncated buffer without the empty line ends the block at the last
/// non-empty line.
#[inline]
pub fn header_block_end(buf: &[u8]) -> Result<usize, ErrorKind> {
    let start = header_block_start(buf)?;
    Ok(block_end_from(buf, start))
}

#[inline]
fn block_end_from(buf: &[u8], start: usize) -> usize {
    let mut end = start;

    for line in Lines::new(buf, start) {
        if line.is_empty() {
            break;
        }
        end = line.end;
    }

    end
}

/// Iterates over the header lines of `buf`, stopping at the empty line.
///
/// Yields nothing for a buffer without a line terminator.
#[inline]
pub fn header_lines(buf: &[u8]) -> impl Iterator<Item = Line> + '_ {
    let start = header_block_start(buf).unwrap_or(buf.len());

    Lines::new(buf, start).take_while(|line| !line.is_empty())
}

/// Case-insensitive lookup of the first header called `name`.
///
/// Optional leading whitespace on the line, any amount of whitespace after
/// `:` and trailing whitespace before the terminator are tolerated and
/// excluded from the value span.
///
/// # Examples
/// ```
/// use wirecast::http::scan::find_header;
///
/// let buf = b"GET / HTTP/1.1\r\ncontent-length:7 \r\n\r\n";
/// let span = find_header(buf, b"Content-Length").unwrap();
///
/// assert_eq!(&buf[span.value_start..span.value_end], b"7");
/// assert!(find_header(buf, b"Host").is_none());
/// ```
#[inline]
pub fn find_header(buf: &[u8], name: &[u8]) -> Option<HeaderSpan> {
    header_lines(buf)
        .filter_map(|line| split_header(buf, line))
        .find(|span| buf[span.name_start..span.name_end].eq_ignore_ascii_case(name))
}

/// Splits one header line into name and value spans.
///
/// Returns `None` for a line without `:`.
#[inline]
pub(crate) fn split_header(buf: &[u8], line: Line) -> Option<HeaderSpan> {
    let name_start = types::skip_ws(buf, line.start, line.end);
    let colon = name_start + memchr(b':', &buf[name_start..line.end])?;

    let value_start = types::skip_ws(buf, colon + 1, line.end);
    let value_end = types::trim_ws_end(buf, value_start, line.end);

    Some(HeaderSpan {
        line_start: line.start,
        name_start,
        name_end: colon,
        value_start,
        value_end,
        line_end: line.end,
        line_next: line.next,
    })
}
