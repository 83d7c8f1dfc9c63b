// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CardDAV processing.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;

/// XML namespaces used in `CardDAV`.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// Calendar server extensions, home of `getctag`.
    pub const CALENDARSERVER: &str = "http://calendarserver.org/ns/";
}

/// Reads the text content of the element whose start tag was just consumed.
///
/// Text, CDATA sections and entity/character references are concatenated,
/// including text of nested elements. Stops after the matching end tag.
///
/// # Errors
///
/// Returns an error if XML parsing fails or the document ends early.
pub fn read_text<R: std::io::BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<String, quick_xml::Error> {
    let mut text = String::new();
    let mut depth = 1usize;

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Text(e) => text.push_str(e.decode()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let name = String::from_utf8_lossy(&e);
                    text.push_str(resolve_predefined_entity(&name).unwrap_or_default());
                }
            }
            Event::Eof => {
                return Err(quick_xml::Error::Syntax(
                    quick_xml::errors::SyntaxError::UnclosedTag,
                ));
            }
            _ => {}
        }
    }

    buf.clear();
    Ok(text)
}
