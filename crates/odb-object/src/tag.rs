use std::fmt::Write as _;

use odb_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};
use crate::hasher::hash_object;
use crate::header::{header_id, header_str, split_headers};
use crate::object::ObjectKind;
use crate::signature::Signature;

/// A parsed annotated tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub size: u64,
    /// The tagged object.
    pub object: ObjectId,
    pub target_kind: ObjectKind,
    /// Tag name as recorded in the `tag` header.
    pub name: String,
    /// Old tags may lack a tagger line.
    pub tagger: Option<Signature>,
    pub message: String,
}

impl Tag {
    pub fn new(
        object: ObjectId,
        target_kind: ObjectKind,
        name: &str,
        tagger: Option<Signature>,
        message: &str,
    ) -> Self {
        let mut tag = Self {
            size: 0,
            object,
            target_kind,
            name: name.to_string(),
            tagger,
            message: message.to_string(),
        };
        tag.size = tag.encode().len() as u64;
        tag
    }

    pub fn parse(size: u64, body: &[u8]) -> ObjectResult<Self> {
        let (headers, message) = split_headers(body);

        let mut object = None;
        let mut target_kind = None;
        let mut name = String::new();
        let mut tagger = None;

        for (key, value) in headers {
            match key {
                b"object" => object = Some(header_id("object", value)?),
                b"type" => target_kind = Some(ObjectKind::from_name(header_str("type", value)?)?),
                b"tag" => name = String::from_utf8_lossy(value).into_owned(),
                b"tagger" => tagger = Some(Signature::parse(&String::from_utf8_lossy(value))?),
                _ => {}
            }
        }

        let missing = |key: &str| ObjectError::MalformedHeader(format!("tag without {key}"));
        Ok(Self {
            size,
            object: object.ok_or_else(|| missing("object"))?,
            target_kind: target_kind.ok_or_else(|| missing("type"))?,
            name,
            tagger,
            message: String::from_utf8_lossy(message).into_owned(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        let _ = writeln!(out, "object {}", self.object);
        let _ = writeln!(out, "type {}", self.target_kind);
        let _ = writeln!(out, "tag {}", self.name);
        if let Some(tagger) = &self.tagger {
            let _ = writeln!(out, "tagger {tagger}");
        }
        let _ = write!(out, "\n{}", self.message);
        out.into_bytes()
    }

    pub fn id(&self) -> ObjectId {
        hash_object(ObjectKind::Tag, &self.encode())
    }
}
