//! FIRDS index document parsing
//!
//! The index is a Solr XML response:
//!
//! ```xml
//! <response>
//!   <result name="response" numFound="3" start="0">
//!     <doc>
//!       <str name="file_name">DLTINS_20210117_01of01.zip</str>
//!       <str name="file_type">DLTINS</str>
//!       <str name="download_link">https://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip</str>
//!     </doc>
//!   </result>
//! </response>
//! ```
//!
//! Every `doc` becomes an [`IndexDocument`] holding its named fields. Fields
//! are matched by their `name` attribute; unknown fields are kept but ignored
//! by the resolver.

use crate::error::{EtlError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// One `doc` entry of the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDocument {
    fields: BTreeMap<String, String>,
}

impl IndexDocument {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file_type(&self) -> Option<&str> {
        self.get("file_type")
    }

    pub fn download_link(&self) -> Option<&str> {
        self.get("download_link")
    }
}

/// Parse every `doc` element of an index document, in document order
pub fn parse_index_xml(xml: &[u8]) -> Result<Vec<IndexDocument>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::new();
    let mut docs = Vec::new();
    let mut current: Option<IndexDocument> = None;
    // (field name, accumulated text)
    let mut field: Option<(String, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"doc" => current = Some(IndexDocument::default()),
                _ if current.is_some() && field.is_none() => {
                    let name = e
                        .try_get_attribute("name")
                        .map_err(EtlError::parse)?
                        .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
                        .transpose()
                        .map_err(EtlError::parse)?;
                    if let Some(name) = name {
                        field = Some((name, String::new()));
                    }
                },
                _ => {},
            },
            Ok(Event::Text(t)) => {
                if let Some((_, ref mut text)) = field {
                    text.push_str(&t.unescape().map_err(EtlError::parse)?);
                }
            },
            Ok(Event::CData(c)) => {
                if let Some((_, ref mut text)) = field {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"doc" {
                    if let Some(doc) = current.take() {
                        docs.push(doc);
                    }
                    field = None;
                } else if let (Some(doc), Some((name, text))) = (current.as_mut(), field.take()) {
                    // First occurrence wins, empty elements carry no value
                    if !text.is_empty() {
                        doc.fields.entry(name).or_insert(text);
                    }
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => {
                return Err(EtlError::Parse(format!(
                    "index document at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            },
        }
        buf.clear();
    }

    Ok(docs)
}

/// Download link of the `link_index`-th document (zero-based) whose
/// `file_type` equals `file_type`, in document order
pub fn resolve_link<'a>(
    docs: &'a [IndexDocument],
    file_type: &str,
    link_index: usize,
) -> Option<&'a str> {
    docs.iter()
        .filter(|doc| doc.file_type() == Some(file_type))
        .nth(link_index)
        .and_then(IndexDocument::download_link)
}
