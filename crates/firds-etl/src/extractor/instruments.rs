//! Streaming parser for the instrument payload of a FIRDS package
//!
//! Elements are matched by local name only; the ISO 20022 namespace URI
//! changes between publications. Layout of the relevant part:
//!
//! ```xml
//! <FinInstrm>                      <!-- instrument-list group -->
//!   <TermntdRcrd>                  <!-- one instrument (any element name) -->
//!     <FinInstrmGnlAttrbts>
//!       <Id>..</Id><FullNm>..</FullNm><ClssfctnTp>..</ClssfctnTp>
//!       <CmmdtyDerivInd>..</CmmdtyDerivInd><NtnlCcy>..</NtnlCcy>
//!     </FinInstrmGnlAttrbts>
//!     <Issr>..</Issr>
//!   </TermntdRcrd>
//! </FinInstrm>
//! ```
//!
//! The general attributes are the first direct children of the first
//! `FinInstrmGnlAttrbts` carrying them; `Issr` is the first such element
//! anywhere inside the instrument. Missing or empty leaves stay `None`.

use crate::error::{EtlError, Result};
use crate::record::{InstrumentField, Record};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

const GROUP: &[u8] = b"FinInstrm";
const GENERAL_ATTRIBUTES: &[u8] = b"FinInstrmGnlAttrbts";
const ISSUER: &[u8] = b"Issr";

/// Records parsed from one payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInstruments {
    pub records: Vec<Record>,
    /// Instrument-list groups visited
    pub groups: usize,
    /// True when the group limit stopped parsing before the end of the document
    pub truncated: bool,
}

struct Capture {
    field: InstrumentField,
    depth: usize,
    text: String,
}

struct OpenInstrument {
    depth: usize,
    record: Record,
    attributes_depth: Option<usize>,
    capture: Option<Capture>,
}

impl OpenInstrument {
    fn start_child(&mut self, name: &[u8], depth: usize) {
        if self.capture.is_some() {
            return;
        }

        let field = if name == GENERAL_ATTRIBUTES {
            if self.attributes_depth.is_none() {
                self.attributes_depth = Some(depth);
            }
            None
        } else if self.attributes_depth == Some(depth - 1) {
            InstrumentField::general_attribute(name)
        } else if name == ISSUER {
            Some(InstrumentField::Issr)
        } else {
            None
        };

        if let Some(field) = field.filter(|f| self.record.get(*f).is_none()) {
            self.capture = Some(Capture {
                field,
                depth,
                text: String::new(),
            });
        }
    }

    fn text(&mut self, depth: usize, text: &str) {
        if let Some(capture) = self.capture.as_mut().filter(|c| c.depth == depth) {
            capture.text.push_str(text);
        }
    }

    fn end_child(&mut self, depth: usize) {
        if self.capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(capture) = self.capture.take() {
                let value = Some(capture.text).filter(|t| !t.is_empty());
                self.record.set(capture.field, value);
            }
        } else if self.attributes_depth == Some(depth) {
            self.attributes_depth = None;
        }
    }
}

/// Parse instruments out of `source`.
///
/// With `max_groups = Some(n)` parsing stops before the `n + 1`-th
/// instrument-list group and the result is flagged as truncated.
pub fn parse_instruments_xml<R: BufRead>(
    source: R,
    max_groups: Option<usize>,
) -> Result<ParsedInstruments> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().expand_empty_elements = true;

    let mut buf = Vec::new();
    let mut parsed = ParsedInstruments::default();
    let mut depth = 0usize;
    let mut group_depth: Option<usize> = None;
    let mut instrument: Option<OpenInstrument> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                let name = name.as_ref();

                if let Some(open) = instrument.as_mut() {
                    open.start_child(name, depth);
                } else if group_depth == Some(depth - 1) {
                    instrument = Some(OpenInstrument {
                        depth,
                        record: Record::default(),
                        attributes_depth: None,
                        capture: None,
                    });
                } else if group_depth.is_none() && name == GROUP {
                    if max_groups.is_some_and(|max| parsed.groups >= max) {
                        parsed.truncated = true;
                        break;
                    }
                    group_depth = Some(depth);
                    parsed.groups += 1;
                }
            },
            Ok(Event::Text(t)) => {
                if let Some(open) = instrument.as_mut() {
                    open.text(depth, &t.unescape().map_err(EtlError::parse)?);
                }
            },
            Ok(Event::CData(c)) => {
                if let Some(open) = instrument.as_mut() {
                    open.text(depth, &String::from_utf8_lossy(&c));
                }
            },
            Ok(Event::End(_)) => {
                if instrument.as_ref().is_some_and(|open| open.depth == depth) {
                    if let Some(open) = instrument.take() {
                        parsed.records.push(open.record);
                    }
                } else if let Some(open) = instrument.as_mut() {
                    open.end_child(depth);
                } else if group_depth == Some(depth) {
                    group_depth = None;
                }
                depth = depth.saturating_sub(1);
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => {
                return Err(EtlError::Parse(format!(
                    "instrument payload at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            },
        }
        buf.clear();
    }

    Ok(parsed)
}
