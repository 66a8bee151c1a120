use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use std::str;

use crate::errors::{DavError, DavResult};
use crate::models::{FileKind, Props};

/// One `<response>` element of a multistatus body, re-wrapped on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultistatusEntry {
    pub href: String,
    /// Standalone multistatus document holding only this response
    pub fragment: String,
}

/// Properties of the first `<response>` of a multistatus document
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropertyBlock {
    pub href: String,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_collection: bool,
    has_prop: bool,
    has_resourcetype: bool,
}

#[derive(Debug, Default)]
struct PropstatValues {
    status: Option<u16>,
    has_prop: bool,
    has_resourcetype: bool,
    is_collection: bool,
    content_length: Option<u64>,
    last_modified: Option<String>,
}

impl PropstatValues {
    fn accepted(&self) -> bool {
        self.status.map_or(true, |s| (200..300).contains(&s))
    }
}

/// Splits a multistatus body into one self-contained fragment per response.
///
/// Each fragment reuses the original root start tag so every namespace
/// prefix declared there stays bound.
pub fn split_multistatus(xml_text: &str) -> DavResult<Vec<MultistatusEntry>> {
    let mut reader = Reader::from_str(xml_text);

    let mut entries = Vec::new();
    let mut root: Option<(String, String)> = None;
    let mut depth = 0usize;
    let mut response_start: Option<usize> = None;
    let mut in_href = false;
    let mut href = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = get_local_name(&e)?;
                let tag_end = position(&reader);
                // `e` holds everything between `<` and `>`
                let event_start = tag_end - e.len() - 2;

                if depth == 1 {
                    if name != "multistatus" {
                        return Err(DavError::protocol(format!(
                            "expected multistatus root element, found '{}'",
                            name
                        )));
                    }
                    let start_tag = &xml_text[event_start..tag_end];
                    root = Some((start_tag.to_string(), qualified_name(e.name())?));
                } else if depth == 2 && name == "response" {
                    response_start = Some(event_start);
                    href.clear();
                } else if depth == 3 && name == "href" && response_start.is_some() {
                    in_href = true;
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    let name = get_local_name(&e)?;
                    if name != "multistatus" {
                        return Err(DavError::protocol(format!(
                            "expected multistatus root element, found '{}'",
                            name
                        )));
                    }
                    return Ok(entries);
                }
            }
            Ok(Event::Text(e)) => {
                if in_href {
                    let text = e
                        .unescape()
                        .map_err(|e| DavError::protocol(format!("invalid href text: {}", e)))?;
                    href.push_str(text.trim());
                }
            }
            Ok(Event::End(_)) => {
                if depth == 3 {
                    in_href = false;
                }
                if depth == 2 {
                    if let (Some(start), Some((root_tag, root_name))) = (response_start.take(), root.as_ref()) {
                        if href.is_empty() {
                            return Err(DavError::protocol("response element without href"));
                        }
                        let raw = &xml_text[start..position(&reader)];
                        entries.push(MultistatusEntry {
                            href: std::mem::take(&mut href),
                            fragment: format!(
                                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{}{}</{}>",
                                root_tag, raw, root_name
                            ),
                        });
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DavError::protocol(format!("XML parsing error: {}", e))),
            _ => {}
        }
    }

    if root.is_none() {
        return Err(DavError::protocol("empty multistatus body"));
    }

    Ok(entries)
}

/// Parses the first `<response>` of a multistatus body.
///
/// Values from propstat blocks with a non-2xx status are ignored, which is how
/// servers report properties they do not have.
pub fn parse_property_block(xml_text: &str) -> DavResult<PropertyBlock> {
    let mut reader = Reader::from_str(xml_text);
    reader.config_mut().trim_text(true);

    let mut block = PropertyBlock::default();
    let mut current: Option<PropstatValues> = None;
    let mut current_element = String::new();
    let mut in_response = false;
    let mut in_prop = false;
    let mut in_resourcetype = false;
    let mut saw_response = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = get_local_name(&e)?;

                match name.as_str() {
                    "response" if !saw_response => {
                        in_response = true;
                        saw_response = true;
                    }
                    "propstat" if in_response => {
                        current = Some(PropstatValues::default());
                    }
                    "prop" if current.is_some() => {
                        in_prop = true;
                        if let Some(ref mut values) = current {
                            values.has_prop = true;
                        }
                    }
                    "resourcetype" if in_prop => {
                        in_resourcetype = true;
                        if let Some(ref mut values) = current {
                            values.has_resourcetype = true;
                        }
                    }
                    "collection" if in_resourcetype => {
                        if let Some(ref mut values) = current {
                            values.is_collection = true;
                        }
                    }
                    _ => {
                        current_element = name;
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = get_local_name(&e)?;

                match name.as_str() {
                    "prop" if current.is_some() => {
                        if let Some(ref mut values) = current {
                            values.has_prop = true;
                        }
                    }
                    "resourcetype" if in_prop => {
                        if let Some(ref mut values) = current {
                            values.has_resourcetype = true;
                        }
                    }
                    "collection" if in_resourcetype => {
                        if let Some(ref mut values) = current {
                            values.is_collection = true;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if !in_response {
                    buf.clear();
                    continue;
                }
                let text = e
                    .unescape()
                    .map_err(|e| DavError::protocol(format!("invalid text node: {}", e)))?;
                let text = text.trim();

                match current_element.as_str() {
                    "href" if current.is_none() => {
                        block.href = text.to_string();
                    }
                    "getcontentlength" if in_prop => {
                        let length = text.parse::<u64>().map_err(|_| {
                            DavError::protocol(format!("invalid getcontentlength '{}'", text))
                        })?;
                        if let Some(ref mut values) = current {
                            values.content_length = Some(length);
                        }
                    }
                    "getlastmodified" if in_prop => {
                        if let Some(ref mut values) = current {
                            values.last_modified = Some(text.to_string());
                        }
                    }
                    "status" => {
                        if let Some(ref mut values) = current {
                            values.status = parse_status_line(text);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = get_local_name_from_end(&e)?;

                match name.as_str() {
                    "response" if in_response => break,
                    "propstat" => {
                        if let Some(values) = current.take() {
                            if values.accepted() {
                                block.merge(values);
                            }
                        }
                    }
                    "prop" => {
                        in_prop = false;
                    }
                    "resourcetype" => {
                        in_resourcetype = false;
                    }
                    _ => {}
                }

                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DavError::protocol(format!("XML parsing error: {}", e))),
            _ => {}
        }

        buf.clear();
    }

    if !saw_response {
        return Err(DavError::protocol("multistatus body has no response element"));
    }

    Ok(block)
}

impl PropertyBlock {
    fn merge(&mut self, values: PropstatValues) {
        self.has_prop |= values.has_prop;
        self.has_resourcetype |= values.has_resourcetype;
        self.is_collection |= values.is_collection;
        if values.content_length.is_some() {
            self.content_length = values.content_length;
        }
        if let Some(raw) = values.last_modified {
            self.last_modified = parse_http_date(&raw);
        }
    }

    /// Builds filesystem metadata from the parsed properties.
    ///
    /// Collections often omit `getcontentlength`; they report size 0. A regular
    /// file without it is malformed.
    pub fn to_props(&self) -> DavResult<Props> {
        if !self.has_prop {
            return Err(DavError::protocol(format!("no prop element for '{}'", self.href)));
        }
        if !self.has_resourcetype {
            return Err(DavError::protocol(format!("no resourcetype for '{}'", self.href)));
        }

        let kind = if self.is_collection {
            FileKind::Directory
        } else {
            FileKind::RegularFile
        };

        let size = match (kind, self.content_length) {
            (_, Some(length)) => length,
            (FileKind::Directory, None) => 0,
            (FileKind::RegularFile, None) => {
                return Err(DavError::protocol(format!(
                    "no getcontentlength for '{}'",
                    self.href
                )))
            }
        };

        // TODO: populate Props::mtime from last_modified; timestamps are still
        // reported as the epoch even though the value is parsed above.
        Ok(Props::new(kind, size))
    }
}

/// Parses a property blob straight into `Props`
pub fn parse_props(xml_text: &str) -> DavResult<Props> {
    parse_property_block(xml_text)?.to_props()
}

fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1).and_then(|code| code.parse().ok())
}

fn position<R>(reader: &Reader<R>) -> usize {
    reader.buffer_position() as usize
}

fn get_local_name(e: &BytesStart) -> DavResult<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| DavError::protocol(format!("Invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

fn get_local_name_from_end(e: &BytesEnd) -> DavResult<String> {
    let qname = e.name();
    let local = qname.local_name();
    let name = str::from_utf8(local.as_ref())
        .map_err(|e| DavError::protocol(format!("Invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

fn qualified_name(name: QName) -> DavResult<String> {
    let name = str::from_utf8(name.as_ref())
        .map_err(|e| DavError::protocol(format!("Invalid UTF-8 in element name: {}", e)))?;
    Ok(name.to_string())
}

pub fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }

    // RFC 1123 dates are what WebDAV servers send
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
                .ok()
                .map(|ndt| DateTime::from_naive_utc_and_offset(ndt, Utc))
        })
}
