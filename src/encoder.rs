//! Turns a [`CapturedMessage`] into the bytes handed to a transport.

use crate::{
    errors::ErrorKind,
    http::request_line,
    message::{CapturedMessage, Meta},
};
use serde::Serialize;
use std::borrow::Cow;

/// Output record layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// `Meta` immediately followed by `Data`, nothing added.
    #[default]
    Raw,
    /// JSON object with the `Req_*` fields taken from `Meta` and from the
    /// first line of `Data`.
    Structured,
}

/// Structured record, serialized in field declaration order.
#[derive(Debug, Serialize)]
struct Record<'a> {
    #[serde(rename = "Req_URL")]
    url: Cow<'a, str>,
    #[serde(rename = "Req_Type")]
    kind: Cow<'a, str>,
    #[serde(rename = "Req_ID")]
    id: Cow<'a, str>,
    #[serde(rename = "Req_Ts")]
    timestamp: Cow<'a, str>,
    #[serde(rename = "Req_Method")]
    method: Cow<'a, str>,
}

/// Stateless record encoder for one [`Mode`].
///
/// # Examples
/// ```
/// use wirecast::{CapturedMessage, Encoder, Mode};
///
/// let msg = CapturedMessage::new("2 3 4\n", "HTTP/1.1 404\r\n");
///
/// assert_eq!(
///     Encoder::new(Mode::Structured).encode(&msg).unwrap(),
///     br#"{"Req_URL":"404","Req_Type":"2","Req_ID":"3","Req_Ts":"4","Req_Method":"HTTP/1.1"}"#
/// );
/// assert_eq!(
///     Encoder::new(Mode::Raw).encode(&msg).unwrap(),
///     b"2 3 4\nHTTP/1.1 404\r\n"
/// );
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Encoder {
    mode: Mode,
}

impl Encoder {
    #[inline(always)]
    pub const fn new(mode: Mode) -> Self {
        Encoder { mode }
    }

    #[inline(always)]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Builds the record for `msg`.
    ///
    /// Raw mode never fails. Structured mode fails on a `Meta` with fewer
    /// than three tokens and on `Data` without a first line.
    #[inline]
    pub fn encode(&self, msg: &CapturedMessage) -> Result<Vec<u8>, ErrorKind> {
        match self.mode {
            Mode::Raw => Ok(Self::raw(msg)),
            Mode::Structured => Self::structured(msg),
        }
    }

    #[inline]
    fn raw(msg: &CapturedMessage) -> Vec<u8> {
        let (meta, data) = (msg.meta(), msg.data());
        let mut record = Vec::with_capacity(meta.len() + data.len());

        record.extend_from_slice(meta);
        record.extend_from_slice(data);
        record
    }

    #[inline]
    fn structured(msg: &CapturedMessage) -> Result<Vec<u8>, ErrorKind> {
        let meta = Meta::parse(msg.meta())?;
        let data = msg.data();

        // Positional: a status line yields its version and status code here.
        let method = request_line::method(data)?;
        let url = request_line::target(data).unwrap_or_default();

        let record = Record {
            url: text(url),
            kind: text(meta.kind),
            id: text(meta.id),
            timestamp: text(meta.timestamp),
            method: text(method),
        };

        Ok(serde_json::to_vec(&record)?)
    }
}

#[inline]
fn text(bytes: &[u8]) -> Cow<'_, str> {
    match simdutf8::basic::from_utf8(bytes) {
        Ok(value) => Cow::Borrowed(value),
        Err(_) => String::from_utf8_lossy(bytes),
    }
}
