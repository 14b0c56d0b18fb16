//! # Message Payload
//!
//! The plaintext that travels inside an envelope, and its canonical byte
//! form.
//!
//! ```text
//! {"text":"hello","attachment":null}
//! {"text":"see attached","attachment":{"name":"a.png","type":"image/png","data":"data:image/png;base64,iVBO..."}}
//! ```
//!
//! Key order is fixed by the struct declarations below. Attachments are
//! embedded as data-URIs, so the whole file sits in memory and inside one
//! AES-GCM ciphertext; the size cap keeps that bounded.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A file carried inside a message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name
    pub name: String,
    /// MIME type, e.g. `image/png`
    #[serde(rename = "type")]
    pub mime_type: String,
    /// `data:<mime>;base64,<bytes>`
    pub data: String,
}

impl Attachment {
    /// Build an attachment from raw file bytes
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let data = format!("data:{};base64,{}", mime_type, BASE64.encode(bytes));
        Self {
            name: name.into(),
            mime_type,
            data,
        }
    }

    /// Decode the data-URI back to raw file bytes
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        let rest = self
            .data
            .strip_prefix("data:")
            .ok_or_else(|| Error::MalformedPayload("Attachment data is not a data URI".into()))?;
        let (header, encoded) = rest
            .split_once(',')
            .ok_or_else(|| Error::MalformedPayload("Attachment data URI has no body".into()))?;
        if !header.ends_with(";base64") {
            return Err(Error::MalformedPayload(
                "Attachment data URI is not base64".into(),
            ));
        }

        BASE64
            .decode(encoded)
            .map_err(|e| Error::MalformedPayload(format!("Attachment data: {}", e)))
    }
}

/// The decrypted content of a message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextPayload {
    /// Message body
    pub text: String,
    /// Optional embedded file
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

impl PlaintextPayload {
    /// A text-only payload
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    /// A payload with a file attached
    pub fn with_attachment(text: impl Into<String>, attachment: Attachment) -> Self {
        Self {
            text: text.into(),
            attachment: Some(attachment),
        }
    }

    /// Serialize to the canonical JSON bytes that get encrypted
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse decrypted bytes
    ///
    /// Anything that is not a JSON object with a string `text` is
    /// `MalformedPayload`.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::MalformedPayload(e.to_string()))
    }

    /// Reject attachments larger than `max_attachment_bytes` once decoded
    pub fn validate(&self, max_attachment_bytes: usize) -> Result<()> {
        if let Some(attachment) = &self.attachment {
            let size = attachment.decode_data()?.len();
            if size > max_attachment_bytes {
                return Err(Error::AttachmentTooLarge {
                    size,
                    max: max_attachment_bytes,
                });
            }
        }
        Ok(())
    }
}
