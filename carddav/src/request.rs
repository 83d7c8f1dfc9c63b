// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders for `CardDAV` operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::CardDavError;
use crate::types::Href;
use crate::xml::ns;

/// PROPFIND request builder.
#[derive(Debug)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

/// Properties to request in PROPFIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// Display name.
    DisplayName,
    /// Resource type.
    ResourceType,
    /// `ETag`.
    GetETag,
    /// Collection tag (calendarserver extension).
    GetCTag,
    /// Collection sync token (RFC 6578).
    SyncToken,
    /// Address data (vCard).
    AddressData,
    /// Address book home set.
    AddressBookHomeSet,
    /// Address book description.
    AddressBookDescription,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetCTag => "getctag",
            Self::SyncToken => "sync-token",
            Self::AddressData => "address-data",
            Self::AddressBookHomeSet => "addressbook-home-set",
            Self::AddressBookDescription => "addressbook-description",
        }
    }

    /// Namespace prefix used when writing the property.
    const fn prefix(self) -> &'static str {
        match self {
            Self::DisplayName | Self::ResourceType | Self::GetETag | Self::SyncToken => "D",
            Self::GetCTag => "CS",
            Self::AddressData | Self::AddressBookHomeSet | Self::AddressBookDescription => "C",
        }
    }

    fn qualified_name(self) -> String {
        format!("{}:{}", self.prefix(), self.name())
    }
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        if !self.props.contains(&prop) {
            self.props.push(prop);
        }
        self
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CardDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <D:propfind xmlns:D="DAV:" ...>
        let mut propfind = BytesStart::new("D:propfind");
        propfind.push_attribute(("xmlns:D", ns::DAV));
        if self.props.iter().any(|p| p.prefix() == "C") {
            propfind.push_attribute(("xmlns:C", ns::CARDDAV));
        }
        if self.props.iter().any(|p| p.prefix() == "CS") {
            propfind.push_attribute(("xmlns:CS", ns::CALENDARSERVER));
        }
        writer.write_event(Event::Start(propfind))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        for prop in &self.props {
            writer.write_event(Event::Empty(BytesStart::new(prop.qualified_name())))?;
        }
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| CardDavError::Xml(format!("UTF-8 error: {e}")))
    }
}

impl Default for PropFindRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Address book multiget request builder (RFC 6352 §8.7).
#[derive(Debug)]
pub struct AddressBookMultiGetRequest {
    hrefs: Vec<Href>,
}

impl AddressBookMultiGetRequest {
    /// Creates a new address book multiget request.
    #[must_use]
    pub fn new() -> Self {
        Self { hrefs: Vec::new() }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: Href) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Number of hrefs requested so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hrefs.len()
    }

    /// Whether no href was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hrefs.is_empty()
    }

    /// Builds the XML body for the multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CardDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <C:addressbook-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:carddav">
        let mut multiget = BytesStart::new("C:addressbook-multiget");
        multiget.push_attribute(("xmlns:D", ns::DAV));
        multiget.push_attribute(("xmlns:C", ns::CARDDAV));
        writer.write_event(Event::Start(multiget))?;

        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        writer.write_event(Event::Empty(BytesStart::new("D:getetag")))?;
        writer.write_event(Event::Empty(BytesStart::new("C:address-data")))?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("D:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("D:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("C:addressbook-multiget")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| CardDavError::Xml(format!("UTF-8 error: {e}")))
    }
}

impl Default for AddressBookMultiGetRequest {
    fn default() -> Self {
        Self::new()
    }
}
