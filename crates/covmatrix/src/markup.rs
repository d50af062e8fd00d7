//! Dump document scanning over `quick_xml` events.
//!
//! The catalogue walks the whole result file as a tag stream; the per-file
//! pass parses one coverage line at a time with [`element`]. Namespace
//! prefixes (`jcov:meth`) are reduced to their local name.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::result::{TraceError, TraceResult};

/// Self-terminating tag suffix marking a coverage-bearing line
pub const CLOSER: &str = "/>";

/// Kind of a scanned tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Open,
    /// `</name>`
    Close,
    /// `<name .../>`
    Empty,
}

/// One scanned tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Local tag name
    pub name: String,
    /// Open, close or self-closing
    pub kind: TagKind,
    /// Attribute map, values unescaped
    pub attributes: BTreeMap<String, String>,
}

impl Tag {
    fn from_start(start: &BytesStart<'_>, kind: TagKind) -> Result<Self, String> {
        let mut attributes = BTreeMap::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(|e| format!("{key}: {e}"))?;
            attributes.insert(key, value.into_owned());
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            kind,
            attributes,
        })
    }

    /// Look up an attribute
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Element tags of a document, in order.
///
/// Declarations, comments and text are skipped. A close tag that does not
/// match the open element ends the stream with a configuration error.
#[derive(Debug)]
pub struct Tags<'a> {
    reader: Reader<&'a [u8]>,
    done: bool,
}

impl Iterator for Tags<'_> {
    type Item = TraceResult<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let scanned = match self.reader.read_event() {
                Ok(Event::Start(ref e)) => Tag::from_start(e, TagKind::Open),
                Ok(Event::Empty(ref e)) => Tag::from_start(e, TagKind::Empty),
                Ok(Event::End(ref e)) => Ok(Tag {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    kind: TagKind::Close,
                    attributes: BTreeMap::new(),
                }),
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => continue,
                Err(e) => Err(e.to_string()),
            };
            return Some(scanned.map_err(|message| {
                self.done = true;
                TraceError::configuration(format!(
                    "invalid markup near byte {}: {message}",
                    self.reader.buffer_position()
                ))
            }));
        }
        None
    }
}

/// Scan every element tag of `text`
#[must_use]
pub fn tags(text: &str) -> Tags<'_> {
    Tags {
        reader: Reader::from_str(text),
        done: false,
    }
}

/// First element of a single coverage line
pub fn element(line: &str) -> TraceResult<Tag> {
    let mut reader = Reader::from_str(line);
    loop {
        let scanned = match reader.read_event() {
            Ok(Event::Start(ref e)) => Tag::from_start(e, TagKind::Open),
            Ok(Event::Empty(ref e)) => Tag::from_start(e, TagKind::Empty),
            Ok(Event::Eof) => Err("no element on line".to_string()),
            Ok(_) => continue,
            Err(e) => Err(e.to_string()),
        };
        return scanned.map_err(TraceError::malformed_record);
    }
}

/// Tag name of a line that starts with `<`, if any
#[must_use]
pub fn leading_tag_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('<')?;
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then(|| name.rsplit(':').next().unwrap_or(name))
}
