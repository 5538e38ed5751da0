//! Captured message: one observed request or response plus its capture
//! metadata.

use crate::errors::ErrorKind;
use memchr::memchr;

/// Role of a captured payload, taken from the `Type` token of [`Meta`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `1`: request seen on the wire.
    Request,
    /// `2`: response to a captured request.
    Response,
    /// `3`: response received while replaying a request.
    ReplayedResponse,
}

impl MessageKind {
    #[inline(always)]
    pub const fn from_token(src: &[u8]) -> Option<Self> {
        match src {
            b"1" => Some(MessageKind::Request),
            b"2" => Some(MessageKind::Response),
            b"3" => Some(MessageKind::ReplayedResponse),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn token(&self) -> &'static [u8] {
        match self {
            MessageKind::Request => b"1",
            MessageKind::Response => b"2",
            MessageKind::ReplayedResponse => b"3",
        }
    }
}

/// Parsed `Type ID Timestamp` metadata line, borrowing from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta<'a> {
    pub kind: &'a [u8],
    pub id: &'a [u8],
    pub timestamp: &'a [u8],
}

impl<'a> Meta<'a> {
    /// Splits the first line of `src` on ASCII whitespace.
    ///
    /// Tokens after the third are ignored.
    ///
    /// # Examples
    /// ```
    /// use wirecast::{Meta, MessageKind};
    ///
    /// let meta = Meta::parse(b"1 8f3a 1633024800\n").unwrap();
    ///
    /// assert_eq!(meta.id, b"8f3a");
    /// assert_eq!(meta.message_kind(), Some(MessageKind::Request));
    /// assert!(Meta::parse(b"1 8f3a\n").is_err());
    /// ```
    #[inline]
    pub fn parse(src: &'a [u8]) -> Result<Self, ErrorKind> {
        let line = match memchr(b'\n', src) {
            Some(lf) => &src[..lf],
            None => src,
        };

        let mut tokens = line
            .split(u8::is_ascii_whitespace)
            .filter(|token| !token.is_empty());

        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(kind), Some(id), Some(timestamp)) => Ok(Meta {
                kind,
                id,
                timestamp,
            }),
            (first, second, _) => Err(ErrorKind::InvalidMeta {
                tokens: first.is_some() as usize + second.is_some() as usize,
            }),
        }
    }

    /// `None` for a `Type` token outside the known kinds.
    #[inline(always)]
    pub const fn message_kind(&self) -> Option<MessageKind> {
        MessageKind::from_token(self.kind)
    }

    /// Renders a well-formed metadata line, terminator included.
    #[inline]
    pub fn line(kind: MessageKind, id: &[u8], timestamp: &[u8]) -> Vec<u8> {
        let kind = kind.token();
        let mut line = Vec::with_capacity(kind.len() + id.len() + timestamp.len() + 3);

        line.extend_from_slice(kind);
        line.push(b' ');
        line.extend_from_slice(id);
        line.push(b' ');
        line.extend_from_slice(timestamp);
        line.push(b'\n');
        line
    }
}

/// One captured request or response.
///
/// Built once by the capture side and never changed afterwards; every
/// rewrite through [`crate::http`] produces a new buffer instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMessage {
    meta: Vec<u8>,
    data: Vec<u8>,
}

impl CapturedMessage {
    #[inline]
    pub fn new(meta: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        CapturedMessage {
            meta: meta.into(),
            data: data.into(),
        }
    }

    /// # Examples
    /// ```
    /// use wirecast::{CapturedMessage, MessageKind};
    ///
    /// let msg = CapturedMessage::from_parts(MessageKind::Response, b"7", b"42", "HTTP/1.1 200 OK\r\n\r\n");
    /// assert_eq!(msg.meta(), b"2 7 42\n");
    /// ```
    #[inline]
    pub fn from_parts(
        kind: MessageKind,
        id: &[u8],
        timestamp: &[u8],
        data: impl Into<Vec<u8>>,
    ) -> Self {
        CapturedMessage {
            meta: Meta::line(kind, id, timestamp),
            data: data.into(),
        }
    }

    #[inline(always)]
    pub fn meta(&self) -> &[u8] {
        &self.meta
    }

    /// The raw HTTP buffer.
    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn parse_meta(&self) -> Result<Meta<'_>, ErrorKind> {
        Meta::parse(&self.meta)
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.meta, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn parse() {
        #[rustfmt::skip]
        let cases: [(&[u8], Result<(&str, &str, &str), ErrorKind>); 7] = [
            (b"1 2 3\n",              Ok(("1", "2", "3"))),
            (b"2 3 4",                Ok(("2", "3", "4"))),
            (b"1  abc\t1633024800\r\n", Ok(("1", "abc", "1633024800"))),
            (b"3 a b extra\n",        Ok(("3", "a", "b"))),
            (b"1 2\n3\n",             Err(ErrorKind::InvalidMeta { tokens: 2 })),
            (b"1\n",                  Err(ErrorKind::InvalidMeta { tokens: 1 })),
            (b"\n",                   Err(ErrorKind::InvalidMeta { tokens: 0 })),
        ];

        for (src, expected) in cases {
            let meta = Meta::parse(src).map(|m| (str_op(m.kind), str_op(m.id), str_op(m.timestamp)));
            assert_eq!(meta, expected, "{:?}", str_op(src));
        }
    }

    #[test]
    fn kinds() {
        #[rustfmt::skip]
        let cases: [(&[u8], Option<MessageKind>); 5] = [
            (b"1", Some(MessageKind::Request)),
            (b"2", Some(MessageKind::Response)),
            (b"3", Some(MessageKind::ReplayedResponse)),
            (b"4", None),
            (b"",  None),
        ];

        for (token, expected) in cases {
            assert_eq!(MessageKind::from_token(token), expected);
            if let Some(kind) = expected {
                assert_eq!(kind.token(), token);
            }
        }
    }

    #[test]
    fn line_round_trip() {
        let line = Meta::line(MessageKind::ReplayedResponse, b"id-1", b"99");
        assert_eq!(str_op(&line), "3 id-1 99\n");

        let meta = Meta::parse(&line).unwrap();
        assert_eq!(meta.message_kind(), Some(MessageKind::ReplayedResponse));
        assert_eq!(meta.id, b"id-1");
    }

    #[test]
    fn message() {
        let msg = CapturedMessage::new("1 2 3\n", "GET / HTTP/1.1\r\n\r\n");

        assert_eq!(msg.meta(), b"1 2 3\n");
        assert_eq!(msg.data(), b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(msg.parse_meta().unwrap().timestamp, b"3");

        let (meta, data) = msg.clone().into_parts();
        assert_eq!(CapturedMessage::new(meta, data), msg);
    }
}
