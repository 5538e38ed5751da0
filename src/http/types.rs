//! Span types and byte helpers shared by the scanner and the accessors

use memchr::memchr;

// LINE

/// One line of a raw HTTP buffer, as absolute byte offsets.
///
/// `buf[start..end]` is the line content without its terminator, which may be
/// either `\r\n` or a bare `\n`. `next` is the offset of the following line
/// (equal to `end` for an unterminated last line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub start: usize,
    pub end: usize,
    pub next: usize,
}

impl Line {
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline(always)]
    pub const fn is_terminated(&self) -> bool {
        self.next > self.end
    }
}

/// Iterator over the lines of a buffer, starting at an arbitrary offset.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    #[inline(always)]
    pub fn new(buf: &'a [u8], from: usize) -> Self {
        Lines { buf, pos: from }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line;

    #[inline]
    fn next(&mut self) -> Option<Line> {
        let start = self.pos;
        if start >= self.buf.len() {
            return None;
        }

        let line = match memchr(b'\n', &self.buf[start..]) {
            Some(i) => {
                let lf = start + i;
                let end = match lf > start && self.buf[lf - 1] == b'\r' {
                    true => lf - 1,
                    false => lf,
                };
                Line { start, end, next: lf + 1 }
            }
            None => Line {
                start,
                end: self.buf.len(),
                next: self.buf.len(),
            },
        };

        self.pos = line.next;
        Some(line)
    }
}

// METHOD

/// HTTP request methods recognised on a request line
///
/// # References
///
/// - [RFC 9110, Section 9](https://datatracker.ietf.org/doc/html/rfc9110#section-9)
/// - [RFC 5789](https://datatracker.ietf.org/doc/html/rfc5789) (PATCH method)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
    Patch,
    Delete,
    Options,
    Connect,
    Trace,
}

impl Method {
    /// Matches a complete method token, case-sensitively.
    #[inline(always)]
    pub const fn from_bytes(src: &[u8]) -> Option<Self> {
        match src {
            b"GET" => Some(Method::Get),
            b"PUT" => Some(Method::Put),
            b"POST" => Some(Method::Post),
            b"HEAD" => Some(Method::Head),
            b"PATCH" => Some(Method::Patch),
            b"DELETE" => Some(Method::Delete),
            b"OPTIONS" => Some(Method::Options),
            b"CONNECT" => Some(Method::Connect),
            b"TRACE" => Some(Method::Trace),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

/// `HTTP/x.y` with single-digit major and minor versions.
#[inline(always)]
pub(crate) const fn is_version(src: &[u8]) -> bool {
    matches!(
        src,
        [b'H', b'T', b'T', b'P', b'/', major, b'.', minor]
            if major.is_ascii_digit() && minor.is_ascii_digit()
    )
}

// HEADER SPAN

/// Location of one header line, as absolute byte offsets into the buffer.
///
/// Value offsets exclude the `:` delimiter and the surrounding whitespace,
/// so `value_start == value_end` for `Name:` with nothing after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSpan {
    pub line_start: usize,
    pub name_start: usize,
    pub name_end: usize,
    pub value_start: usize,
    pub value_end: usize,
    /// End of the line content, before the terminator.
    pub line_end: usize,
    /// Start of the next line.
    pub line_next: usize,
}

// QUERY PARAM

/// A `key=value` pair found in the request target's query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParam<'a> {
    pub value: &'a [u8],
    pub key_start: usize,
    pub value_start: usize,
    pub value_end: usize,
}

// HELPERS

#[inline(always)]
pub(crate) const fn is_ws(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// First offset in `start..end` that is not a space or tab.
#[inline]
pub(crate) fn skip_ws(buf: &[u8], mut start: usize, end: usize) -> usize {
    while start < end && is_ws(buf[start]) {
        start += 1;
    }
    start
}

/// Moves `end` back over trailing spaces and tabs, never below `start`.
#[inline]
pub(crate) fn trim_ws_end(buf: &[u8], start: usize, mut end: usize) -> usize {
    while end > start && is_ws(buf[end - 1]) {
        end -= 1;
    }
    end
}

/// Builds `buf[..start] ++ parts ++ buf[end..]`.
#[inline]
pub(crate) fn splice(buf: &[u8], start: usize, end: usize, parts: &[&[u8]]) -> Vec<u8> {
    let middle: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(buf.len() - (end - start) + middle);

    out.extend_from_slice(&buf[..start]);
    for part in parts {
        out.extend_from_slice(part);
    }
    out.extend_from_slice(&buf[end..]);
    out
}

#[inline(always)]
pub(crate) fn slice_to_usize(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut result: usize = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as usize)?;
    }

    Some(result)
}
