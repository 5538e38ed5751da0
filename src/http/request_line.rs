//! Request-line accessor: path, query parameters and absolute-URI host.
//!
//! The first line is treated positionally as `Token SP Target [SP Version]`.
//! Nothing checks that `Token` really is a method, so the same helpers read
//! the version and status code of a status line.

use crate::{
    errors::ErrorKind,
    http::{
        query,
        scan::header_block_start,
        types::{self, Line, Lines, Method, QueryParam},
    },
};
use memchr::{memchr, memchr2, memmem};

/// Offsets of the request target inside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    line: Line,
    start: usize,
    end: usize,
    /// Start of the path; greater than `start` for `scheme://authority/path`.
    path_start: usize,
    path_end: usize,
    /// Offset just after `?`, when the target has a query string.
    query_start: Option<usize>,
}

impl Target {
    #[inline]
    pub(crate) fn parse(buf: &[u8]) -> Result<Self, ErrorKind> {
        let line = first_line(buf)?;

        let space = memchr(b' ', &buf[line.start..line.end]).ok_or(ErrorKind::MissingRequestLine)?;
        let start = line.start + space + 1;
        let end = memchr(b' ', &buf[start..line.end])
            .map(|i| start + i)
            .unwrap_or(line.end);

        let path_start = authority_end(&buf[start..end]).map_or(start, |i| start + i);
        let (path_end, query_start) = match memchr(b'?', &buf[path_start..end]) {
            Some(i) => (path_start + i, Some(path_start + i + 1)),
            None => (end, None),
        };

        Ok(Target {
            line,
            start,
            end,
            path_start,
            path_end,
            query_start,
        })
    }

    #[inline(always)]
    pub(crate) const fn is_absolute(&self) -> bool {
        self.path_start > self.start
    }
}

/// For `scheme://authority[/path][?query]` returns the offset (relative to
/// `target`) where the authority ends.
#[inline]
fn authority_end(target: &[u8]) -> Option<usize> {
    if target.first() == Some(&b'/') {
        return None;
    }

    let scheme_end = memmem::find(target, b"://")?;
    let scheme = &target[..scheme_end];
    if scheme.is_empty()
        || !scheme
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
    {
        return None;
    }

    let authority_start = scheme_end + 3;
    let end = memchr2(b'/', b'?', &target[authority_start..])
        .map(|i| authority_start + i)
        .unwrap_or(target.len());

    Some(end)
}

#[inline]
fn first_line(buf: &[u8]) -> Result<Line, ErrorKind> {
    header_block_start(buf)?;

    Lines::new(buf, 0)
        .next()
        .filter(|line| !line.is_empty())
        .ok_or(ErrorKind::MissingRequestLine)
}

/// Returns the path of the request target, without query string and, for
/// absolute-URI targets, without `scheme://authority`.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::path;
///
/// assert_eq!(path(b"POST /post?a=1 HTTP/1.1\r\n\r\n").unwrap(), b"/post");
/// assert_eq!(path(b"GET http://example.com/post HTTP/1.0\r\n\r\n").unwrap(), b"/post");
/// ```
#[inline]
pub fn path(buf: &[u8]) -> Result<&[u8], ErrorKind> {
    let target = Target::parse(buf)?;
    Ok(&buf[target.path_start..target.path_end])
}

/// Returns the whole request target token (path, query and any
/// `scheme://authority` prefix).
#[inline]
pub fn target(buf: &[u8]) -> Result<&[u8], ErrorKind> {
    let target = Target::parse(buf)?;
    Ok(&buf[target.start..target.end])
}

/// Replaces the path component of the request target, keeping the query
/// string and the absolute-URI prefix.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::set_path;
///
/// let buf = b"POST /post?a=1 HTTP/1.1\r\n\r\n";
/// assert_eq!(set_path(buf, b"/new_path").unwrap(), b"POST /new_path?a=1 HTTP/1.1\r\n\r\n");
/// ```
#[inline]
pub fn set_path(buf: &[u8], path: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let target = Target::parse(buf)?;
    Ok(types::splice(buf, target.path_start, target.path_end, &[path]))
}

/// Finds the first query parameter whose key equals `key` exactly.
///
/// `Ok(None)` when the target has no query string or no such key.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::query_param;
///
/// let buf = b"POST /post?param=test&user_id=1 HTTP/1.1\r\n\r\n";
/// let param = query_param(buf, b"user_id").unwrap().unwrap();
///
/// assert_eq!(param.value, b"1");
/// assert_eq!(&buf[param.value_start..param.value_end], b"1");
/// assert!(query_param(buf, b"missing").unwrap().is_none());
/// ```
#[inline]
pub fn query_param<'a>(buf: &'a [u8], key: &[u8]) -> Result<Option<QueryParam<'a>>, ErrorKind> {
    let target = Target::parse(buf)?;

    Ok(target
        .query_start
        .and_then(|start| query::find(&buf[start..target.end], start, key)))
}

/// Sets query parameter `key` to `value`.
///
/// An existing pair keeps its position and only its value changes. A new
/// pair is appended as `&key=value` to an existing query string, or as
/// `?key=value` right after the path when there is none.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::set_query_param;
///
/// let buf = b"POST /post?param=test&user_id=1 HTTP/1.1\r\n\r\n";
/// assert_eq!(
///     set_query_param(buf, b"param", b"new").unwrap(),
///     b"POST /post?param=new&user_id=1 HTTP/1.1\r\n\r\n"
/// );
///
/// let buf = b"POST /post HTTP/1.1\r\n\r\n";
/// assert_eq!(
///     set_query_param(buf, b"param", b"test").unwrap(),
///     b"POST /post?param=test HTTP/1.1\r\n\r\n"
/// );
/// ```
#[inline]
pub fn set_query_param(buf: &[u8], key: &[u8], value: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let target = Target::parse(buf)?;

    let Some(start) = target.query_start else {
        return Ok(types::splice(
            buf,
            target.end,
            target.end,
            &[b"?", key, b"=", value],
        ));
    };

    if let Some(param) = query::find(&buf[start..target.end], start, key) {
        // bare `key` without `=`
        let equals: &[u8] = match param.value_start == param.key_start + key.len() {
            true => b"=",
            false => b"",
        };

        return Ok(types::splice(
            buf,
            param.value_start,
            param.value_end,
            &[equals, value],
        ));
    }

    // `/path?` or `/path?a=1&` already ends with a separator
    let separator: &[u8] = match start == target.end || buf[target.end - 1] == b'&' {
        true => b"",
        false => b"&",
    };

    Ok(types::splice(
        buf,
        target.end,
        target.end,
        &[separator, key, b"=", value],
    ))
}

/// Whether the request target is an absolute URI (`scheme://authority...`),
/// as sent to proxies and by HTTP/1.0 clients.
#[inline]
pub fn is_absolute_uri(buf: &[u8]) -> bool {
    Target::parse(buf).map_or(false, |target| target.is_absolute())
}

/// Rewrites the `scheme://authority` prefix of an absolute-URI target.
///
/// With a non-empty `url` the whole prefix is replaced by it. With an empty
/// `url` only the authority is replaced by `host`, keeping the scheme. The
/// `Host` header is never touched, and a target that is a plain path is
/// returned unchanged (check [`is_absolute_uri`] first).
///
/// # Examples
/// ```
/// use wirecast::http::request_line::set_host;
///
/// let buf = b"POST http://example.com/post HTTP/1.0\r\nHost: www.w3.org\r\n\r\n";
///
/// assert_eq!(
///     set_host(buf, b"http://new.com", b"new.com").unwrap(),
///     b"POST http://new.com/post HTTP/1.0\r\nHost: www.w3.org\r\n\r\n"
/// );
/// assert_eq!(
///     set_host(buf, b"", b"other.org:8080").unwrap(),
///     b"POST http://other.org:8080/post HTTP/1.0\r\nHost: www.w3.org\r\n\r\n"
/// );
/// ```
#[inline]
pub fn set_host(buf: &[u8], url: &[u8], host: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let target = Target::parse(buf)?;
    if !target.is_absolute() {
        return Ok(buf.to_vec());
    }

    if !url.is_empty() {
        return Ok(types::splice(buf, target.start, target.path_start, &[url]));
    }

    let authority_start = memmem::find(&buf[target.start..target.path_start], b"://")
        .map_or(target.start, |i| target.start + i + 3);

    Ok(types::splice(
        buf,
        authority_start,
        target.path_start,
        &[host],
    ))
}

/// First token of the first line: the method of a request, the protocol
/// version of a response.
#[inline]
pub fn method(buf: &[u8]) -> Result<&[u8], ErrorKind> {
    let line = first_line(buf)?;
    let end = memchr(b' ', &buf[line.start..line.end]).map_or(line.end, |i| line.start + i);

    Ok(&buf[line.start..end])
}

/// Status code of a status line, `None` for anything else.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::status;
///
/// assert_eq!(status(b"HTTP/1.1 200 OK\r\n\r\n"), Some(&b"200"[..]));
/// assert_eq!(status(b"GET / HTTP/1.1\r\n\r\n"), None);
/// ```
#[inline]
pub fn status(buf: &[u8]) -> Option<&[u8]> {
    match has_response_title(buf) {
        true => Some(&buf[9..12]),
        false => None,
    }
}

/// Protocol version token of either a request line or a status line.
#[inline]
pub fn version(buf: &[u8]) -> Option<&[u8]> {
    if has_response_title(buf) {
        return Some(&buf[..8]);
    }

    let target = Target::parse(buf).ok()?;
    let version = buf.get(target.end + 1..target.line.end)?;

    match types::is_version(version) {
        true => Some(version),
        false => None,
    }
}

/// Message body: everything after the empty line, empty when there is none.
#[inline]
pub fn body(buf: &[u8]) -> &[u8] {
    let Ok(start) = header_block_start(buf) else {
        return &[];
    };

    Lines::new(buf, start)
        .find(|line| line.is_empty())
        .map_or(&[][..], |line| &buf[line.next..])
}

/// Whether the first line looks like `METHOD SP target SP HTTP/x.y`.
///
/// # Examples
/// ```
/// use wirecast::http::request_line::has_request_title;
///
/// assert!(has_request_title(b"GET /p HTTP/1.1\r\n\r\n"));
/// assert!(!has_request_title(b"GET / HTTP1.1\r\n\r\n"));
/// assert!(!has_request_title(b"HTTP/1.1 200 OK\r\n\r\n"));
/// ```
#[inline]
pub fn has_request_title(buf: &[u8]) -> bool {
    let Ok(target) = Target::parse(buf) else {
        return false;
    };

    let method = &buf[target.line.start..target.start - 1];
    let version = buf.get(target.end + 1..target.line.end).unwrap_or_default();

    Method::from_bytes(method).is_some() && target.start < target.end && types::is_version(version)
}

/// Whether the first line looks like `HTTP/x.y SP 3DIGIT [SP reason]`.
#[inline]
pub fn has_response_title(buf: &[u8]) -> bool {
    let Ok(line) = first_line(buf) else {
        return false;
    };

    let content = &buf[line.start..line.end];
    if content.len() < 12 {
        return false;
    }

    types::is_version(&content[..8])
        && content[8] == b' '
        && content[9..12].iter().all(u8::is_ascii_digit)
        && (content.len() == 12 || content[12] == b' ')
}
