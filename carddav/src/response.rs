// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Response parsers for WebDAV/CardDAV operations.

use quick_xml::events::Event;

use crate::error::CardDavError;
use crate::types::{AddressBookCollection, AddressObject, ETag, Href};
use crate::xml::read_text;

/// `WebDAV` multistatus response.
#[derive(Debug, Clone, Default)]
pub struct MultiStatusResponse {
    /// The response items.
    pub responses: Vec<ResponseItem>,
}

/// Individual response in multistatus.
#[derive(Debug, Clone, Default)]
pub struct ResponseItem {
    /// Resource the response is about.
    pub href: Href,
    /// Property groups, each with its own status.
    pub prop_stats: Vec<PropStat>,
    /// Response-level status, used instead of propstats for missing resources.
    pub status: Option<String>,
}

/// Property stat with status and value.
#[derive(Debug, Clone, Default)]
pub struct PropStat {
    /// Properties reported under this status.
    pub props: Properties,
    /// Raw status line, e.g. `HTTP/1.1 200 OK`.
    pub status: String,
}

/// WebDAV/CardDAV properties.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    /// `DAV:displayname`.
    pub display_name: Option<String>,
    /// `DAV:getetag`.
    pub get_etag: Option<ETag>,
    /// `CS:getctag`.
    pub get_ctag: Option<String>,
    /// `DAV:sync-token`.
    pub sync_token: Option<String>,
    /// `CARD:address-data`.
    pub address_data: Option<String>,
    /// `CARD:addressbook-home-set`.
    pub addressbook_home_set: Option<Href>,
    /// `CARD:addressbook-description`.
    pub addressbook_description: Option<String>,
    /// Resource type contains `DAV:collection`.
    pub is_collection: bool,
    /// Resource type contains `CARD:addressbook`.
    pub is_addressbook: bool,
}

/// Element boundaries the parser reacts to.
enum Tag {
    Start(Vec<u8>),
    End(Vec<u8>),
}

/// Extracts the numeric code from a status line such as `HTTP/1.1 404 Not Found`.
#[must_use]
pub fn status_code(status: &str) -> Option<u16> {
    status.split_whitespace().nth(1)?.parse().ok()
}

fn is_success(status: &str) -> bool {
    status_code(status).is_some_and(|code| (200..300).contains(&code))
}

impl MultiStatusResponse {
    /// Parses multistatus response from XML.
    ///
    /// # Errors
    ///
    /// Returns an error if XML parsing fails.
    pub fn from_xml(xml: &str) -> Result<Self, CardDavError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        // Text is trimmed per property: address data must keep its whitespace
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;

        let mut responses = Vec::new();
        let mut current: Option<ResponseItem> = None;
        let mut props: Option<Properties> = None;
        let mut propstat_status: Option<String> = None;
        let mut in_prop = false;

        let mut buf = Vec::new();

        loop {
            buf.clear();
            let tag = match reader.read_event_into(&mut buf)? {
                Event::Start(e) => Tag::Start(e.name().local_name().into_inner().to_vec()),
                Event::End(e) => Tag::End(e.name().local_name().into_inner().to_vec()),
                Event::Eof => break,
                _ => continue,
            };

            match tag {
                Tag::Start(name) => match name.as_slice() {
                    b"response" => current = Some(ResponseItem::default()),
                    b"href" if props.is_none() => {
                        let href = read_text(&mut reader, &mut buf)?;
                        if let Some(resp) = current.as_mut() {
                            resp.href = Href::from_server(&href);
                        }
                    }
                    b"propstat" if current.is_some() => {
                        props = Some(Properties::default());
                        propstat_status = None;
                    }
                    b"status" => {
                        let status = read_text(&mut reader, &mut buf)?.trim().to_string();
                        if props.is_some() {
                            propstat_status = Some(status);
                        } else if let Some(resp) = current.as_mut() {
                            resp.status = Some(status);
                        }
                    }
                    b"prop" => in_prop = true,
                    _ if in_prop => {
                        if let Some(p) = props.as_mut() {
                            Self::read_property(&mut reader, &mut buf, &name, p)?;
                        }
                    }
                    _ => {}
                },
                Tag::End(name) => match name.as_slice() {
                    b"prop" => in_prop = false,
                    b"propstat" => {
                        if let (Some(resp), Some(p)) = (current.as_mut(), props.take()) {
                            resp.prop_stats.push(PropStat {
                                props: p,
                                status: propstat_status.take().unwrap_or_default(),
                            });
                        }
                    }
                    b"response" => {
                        if let Some(resp) = current.take() {
                            responses.push(resp);
                        }
                    }
                    b"multistatus" => break,
                    _ => {}
                },
            }
        }

        Ok(Self { responses })
    }

    /// Reads one property whose start tag `name` was just consumed.
    fn read_property<R: std::io::BufRead>(
        reader: &mut quick_xml::Reader<R>,
        buf: &mut Vec<u8>,
        name: &[u8],
        props: &mut Properties,
    ) -> Result<(), CardDavError> {
        match name {
            b"displayname" => props.display_name = Some(read_text(reader, buf)?),
            b"getetag" => {
                props.get_etag = Some(ETag::new(read_text(reader, buf)?.trim().to_string()));
            }
            b"getctag" => props.get_ctag = Some(read_text(reader, buf)?.trim().to_string()),
            b"sync-token" => props.sync_token = Some(read_text(reader, buf)?.trim().to_string()),
            b"address-data" => props.address_data = Some(read_text(reader, buf)?),
            b"addressbook-description" => {
                props.addressbook_description = Some(read_text(reader, buf)?);
            }
            b"addressbook-home-set" => {
                // The only child of interest is the href
                let href = read_text(reader, buf)?;
                props.addressbook_home_set = Some(Href::from_server(&href));
            }
            b"resourcetype" => loop {
                buf.clear();
                match reader.read_event_into(buf)? {
                    Event::End(ref e) if e.name().local_name().into_inner() == b"resourcetype" => {
                        break;
                    }
                    Event::Start(ref e) | Event::Empty(ref e) => {
                        match e.name().local_name().into_inner() {
                            b"collection" => props.is_collection = true,
                            b"addressbook" => props.is_addressbook = true,
                            _ => {}
                        }
                    }
                    Event::Eof => {
                        return Err(CardDavError::Xml("Unexpected EOF".to_string()));
                    }
                    _ => {}
                }
            },
            _ => {}
        }
        Ok(())
    }

    /// Splits a multiget response into fetched address objects and per-href failures.
    ///
    /// A response counts as failed when its status is not 2xx, or when no
    /// successful propstat carries both an `ETag` and address data.
    #[must_use]
    pub fn into_address_objects(self) -> (Vec<AddressObject>, Vec<(Href, String)>) {
        let mut objects = Vec::new();
        let mut failures = Vec::new();

        for response in self.responses {
            if let Some(status) = response.status.as_deref().filter(|s| !is_success(s)) {
                failures.push((response.href, status.to_string()));
                continue;
            }

            let found = response
                .prop_stats
                .into_iter()
                .filter(|p| is_success(&p.status))
                .find_map(|p| Some((p.props.get_etag?, p.props.address_data?)));

            match found {
                Some((etag, data)) => objects.push(AddressObject::new(response.href, etag, data)),
                None => failures.push((response.href, "missing ETag or address data".to_string())),
            }
        }

        (objects, failures)
    }

    /// Lists member resources with their `ETag`s.
    ///
    /// The collection itself, sub-collections and members without an `ETag`
    /// are left out.
    #[must_use]
    pub fn into_member_etags(self, collection: &Href) -> Vec<(Href, ETag)> {
        let mut members = Vec::new();

        for response in self.responses {
            if response.href.same_resource(collection) {
                continue;
            }

            let props = response
                .prop_stats
                .iter()
                .filter(|p| is_success(&p.status))
                .map(|p| &p.props);

            let mut etag = None;
            let mut is_collection = false;
            for p in props {
                is_collection |= p.is_collection;
                if etag.is_none() {
                    etag.clone_from(&p.get_etag);
                }
            }

            match etag {
                Some(etag) if !is_collection => members.push((response.href, etag)),
                Some(_) => {}
                None if is_collection => {}
                None => tracing::warn!(href = %response.href, "member without ETag, skipping"),
            }
        }

        members
    }

    /// Finds the properties reported for `href` with a successful status.
    #[must_use]
    pub fn props_for(&self, href: &Href) -> Option<&Properties> {
        self.responses
            .iter()
            .filter(|r| r.href.same_resource(href))
            .flat_map(|r| r.prop_stats.iter())
            .find(|p| is_success(&p.status))
            .map(|p| &p.props)
    }

    /// Converts multistatus response to address book collections.
    #[must_use]
    pub fn into_collections(self) -> Vec<AddressBookCollection> {
        let mut collections = Vec::new();

        for response in self.responses {
            for prop_stat in &response.prop_stats {
                if is_success(&prop_stat.status)
                    && prop_stat.props.is_addressbook
                    && prop_stat.props.is_collection
                {
                    let props = &prop_stat.props;
                    let mut collection = AddressBookCollection::new(response.href.clone());
                    collection.display_name.clone_from(&props.display_name);
                    collection
                        .description
                        .clone_from(&props.addressbook_description);
                    collection.ctag.clone_from(&props.get_ctag);
                    collection.sync_token.clone_from(&props.sync_token);
                    collections.push(collection);
                }
            }
        }

        collections
    }
}
