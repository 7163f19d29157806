//! Message body structure as reported by the mailbox.
//!
//! A [`MessageStructure`] is a tree of [`BodyPart`] nodes. Each part carries a
//! [`PartPath`] in IMAP body-section numbering, so it can be handed back to
//! the session to fetch that part's raw body.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary MIME type of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryType {
    Text,
    Multipart,
    Message,
    Application,
    Audio,
    Image,
    Video,
    Other,
}

impl PrimaryType {
    /// Map a type name (`"IMAGE"`, `"text"`, …) to its enum value.
    /// Anything unrecognized becomes [`PrimaryType::Other`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "multipart" => Self::Multipart,
            "message" => Self::Message,
            "application" => Self::Application,
            "audio" => Self::Audio,
            "image" => Self::Image,
            "video" => Self::Video,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Multipart => "multipart",
            Self::Message => "message",
            Self::Application => "application",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
    Other,
}

impl TransferEncoding {
    /// Map an encoding name (`"BASE64"`, `"7bit"`, …) to its enum value.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::Other,
        }
    }
}

/// Position of a part in IMAP body-section numbering (`2`, `2.1`, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartPath(Vec<u32>);

impl PartPath {
    /// A top-level section number.
    pub fn single(number: u32) -> Self {
        Self(vec![number])
    }

    pub fn from_segments(segments: Vec<u32>) -> Self {
        Self(segments)
    }

    /// Path of the `number`-th child of this part.
    pub fn child(&self, number: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(number);
        Self(segments)
    }

    pub fn segments(&self) -> &[u32] {
        &self.0
    }

    /// Form used inside output file names: segments joined with `_`.
    pub fn file_stem(&self) -> String {
        self.0
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for PartPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&joined)
    }
}

/// One node of a message's MIME tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    pub primary_type: PrimaryType,

    /// Subtype as sent by the server (`"jpeg"`, `"mixed"`, `"octet-stream"`).
    pub subtype: String,

    /// Content-Disposition type. Empty when the part declares none.
    pub disposition: String,

    pub encoding: TransferEncoding,

    /// Content-Disposition parameters in declaration order, e.g. `filename`.
    pub disposition_params: Vec<(String, String)>,

    /// Section address of this part.
    pub section: PartPath,

    /// Children, in order. Only multipart nodes have any.
    pub children: Vec<BodyPart>,
}

impl BodyPart {
    /// A leaf part with no disposition, 7bit encoding and no parameters.
    pub fn leaf(primary_type: PrimaryType, subtype: impl Into<String>) -> Self {
        Self {
            primary_type,
            subtype: subtype.into(),
            disposition: String::new(),
            encoding: TransferEncoding::SevenBit,
            disposition_params: Vec::new(),
            section: PartPath::single(1),
            children: Vec::new(),
        }
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = disposition.into();
        self
    }

    pub fn with_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.disposition_params.push((name.into(), value.into()));
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.primary_type == PrimaryType::Multipart
    }

    /// `type/subtype`, lower-cased.
    pub fn mime_type(&self) -> String {
        format!(
            "{}/{}",
            self.primary_type.as_str(),
            self.subtype.to_ascii_lowercase()
        )
    }
}

/// The full MIME layout of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStructure {
    pub root: BodyPart,
}

impl MessageStructure {
    /// Wrap a root part, assigning section paths to the whole tree.
    ///
    /// A multipart root's children are `1..n`, and nested children extend
    /// their parent's path. A non-multipart root is section `1`.
    pub fn new(mut root: BodyPart) -> Self {
        root.section = PartPath::single(1);
        if root.is_multipart() {
            number_children(&mut root.children, None);
        }
        Self { root }
    }

    /// Build a multipart/`subtype` message from its top-level parts.
    pub fn multipart(subtype: impl Into<String>, children: Vec<BodyPart>) -> Self {
        let mut root = BodyPart::leaf(PrimaryType::Multipart, subtype);
        root.children = children;
        Self::new(root)
    }
}

fn number_children(children: &mut [BodyPart], parent: Option<&PartPath>) {
    for (i, child) in children.iter_mut().enumerate() {
        let number = i as u32 + 1;
        child.section = match parent {
            Some(path) => path.child(number),
            None => PartPath::single(number),
        };
        if child.is_multipart() {
            let own = child.section.clone();
            number_children(&mut child.children, Some(&own));
        }
    }
}
