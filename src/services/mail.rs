//! Mail envelope parsing and body selection for converted `.eml` files.

use mail_parser::{MessageParser, MimeHeaders, PartType};
use std::borrow::Cow;
use std::fmt::Write;
use thiserror::Error;

/// Returned when no body part (plain, HTML or RTF) yields any text.
pub const NO_BODY_PLACEHOLDER: &str = "(no body content)\n";

/// Lines the RTF converter adds around the real content.
const RTF_BANNERS: [&str; 2] = [
    "Translation from RTF performed by UnRTF",
    "font table contains 4 fonts tota",
];

#[derive(Error, Debug)]
#[error("Failed to parse message: {0}")]
pub struct MailParseError(String);

/// The six header fields echoed at the top of the text rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailHeaders {
    pub from: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub date: String,
}

/// A leaf MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailPart {
    /// Lowercase `type/subtype`
    pub content_type: String,
    pub attachment: bool,
    /// Transfer-decoded content
    pub content: Vec<u8>,
}

impl MailPart {
    pub fn new(content_type: &str, attachment: bool, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.to_ascii_lowercase(),
            attachment,
            content: content.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    fn is_rtf(&self) -> bool {
        self.content_type.starts_with("application/rtf") || self.content_type.starts_with("text/rtf")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailEnvelope {
    pub headers: MailHeaders,
    pub parts: Vec<MailPart>,
}

/// Where the message body comes from, in order of preference.
#[derive(Debug, PartialEq, Eq)]
pub enum BodySource<'a> {
    Plain(Cow<'a, str>),
    Html(Cow<'a, str>),
    /// Raw RTF that still has to go through the rich-text converter
    Rtf(&'a [u8]),
    Empty,
}

impl MailEnvelope {
    /// Parses an RFC 822 message.
    pub fn parse(raw: &[u8]) -> Result<Self, MailParseError> {
        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| MailParseError("no headers or body found".to_string()))?;

        let header = |name: &str| {
            message
                .header_raw(name)
                .map(unfold_header)
                .unwrap_or_default()
        };

        let headers = MailHeaders {
            from: header("From"),
            to: header("To"),
            cc: header("Cc"),
            bcc: header("Bcc"),
            subject: header("Subject"),
            date: header("Date"),
        };

        let mut parts = Vec::new();
        for (index, part) in message.parts.iter().enumerate() {
            let content: &[u8] = match &part.body {
                PartType::Text(text) | PartType::Html(text) => text.as_bytes(),
                PartType::Binary(data) | PartType::InlineBinary(data) => data.as_ref(),
                _ => continue,
            };

            let content_type = match part.content_type() {
                Some(ct) => match ct.subtype() {
                    Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                    None => ct.ctype().to_string(),
                },
                None if matches!(part.body, PartType::Html(_)) => "text/html".to_string(),
                None => "text/plain".to_string(),
            };

            let attachment = message
                .attachments
                .iter()
                .any(|&id| id as usize == index)
                || part
                    .content_disposition()
                    .is_some_and(|cd| cd.ctype().eq_ignore_ascii_case("attachment"));

            parts.push(MailPart::new(&content_type, attachment, content));
        }

        tracing::debug!(
            "Parsed message with {} leaf parts (subject: {:?})",
            parts.len(),
            headers.subject
        );

        Ok(Self { headers, parts })
    }

    /// Picks the body: plain text, then HTML, then the first RTF part anywhere.
    ///
    /// HTML is handed back as markup, not flattened to text.
    pub fn select_body(&self) -> BodySource<'_> {
        let inline = |content_type: &str| {
            self.parts
                .iter()
                .find(|p| !p.attachment && p.content_type == content_type && !p.content.is_empty())
        };

        if let Some(part) = inline("text/plain") {
            return BodySource::Plain(part.text());
        }
        if let Some(part) = inline("text/html") {
            return BodySource::Html(part.text());
        }
        if let Some(part) = self.parts.iter().find(|p| p.is_rtf()) {
            return BodySource::Rtf(&part.content);
        }
        BodySource::Empty
    }
}

/// Joins folded header lines the way RFC 5322 unfolding does.
fn unfold_header(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Header block, blank line, then the body with converter banner lines removed.
pub fn render_text(headers: &MailHeaders, body: &str) -> String {
    let mut output = String::new();
    for (label, value) in [
        ("From:", &headers.from),
        ("To:", &headers.to),
        ("Cc:", &headers.cc),
        ("Bcc:", &headers.bcc),
        ("Subject:", &headers.subject),
        ("Date:", &headers.date),
    ] {
        let _ = writeln!(output, "{:<8}{}", label, value);
    }
    output.push('\n');

    let body = strip_banners(body);
    if body.is_empty() {
        output.push_str(NO_BODY_PLACEHOLDER);
    } else {
        output.push_str(&body);
    }
    output
}

pub fn strip_banners(body: &str) -> String {
    body.split('\n')
        .filter(|line| !RTF_BANNERS.iter().any(|banner| line.contains(banner)))
        .collect::<Vec<_>>()
        .join("\n")
}
