// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CardDAV` client for address book operations.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};

use crate::config::CardDavConfig;
use crate::error::CardDavError;
use crate::http::HttpClient;
use crate::request::{AddressBookMultiGetRequest, Prop, PropFindRequest};
use crate::response::MultiStatusResponse;
use crate::types::{AddressBookCollection, AddressObject, ETag, Href};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const VCARD_CONTENT_TYPE: &str = "text/vcard; charset=utf-8";

/// `CardDAV` client for accessing and managing address books on `CardDAV` servers.
///
/// # Example
///
/// ```ignore
/// use davsync_carddav::{AuthMethod, CardDavClient, CardDavConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CardDavConfig {
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..CardDavConfig::new("https://dav.example.com", "/dav/addressbooks/user/contacts/")
/// };
///
/// let client = CardDavClient::new(config)?;
/// let books = client.list_address_books().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CardDavClient {
    http: Arc<HttpClient>,
    config: CardDavConfig,
}

impl CardDavClient {
    /// Creates a new `CardDAV` client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or HTTP client
    /// initialization fails.
    pub fn new(config: CardDavConfig) -> Result<Self, CardDavError> {
        config.validate()?;
        let http = HttpClient::new(config.clone())?;
        Ok(Self {
            http: Arc::new(http),
            config,
        })
    }

    /// Returns the configuration the client was built with.
    #[must_use]
    pub fn config(&self) -> &CardDavConfig {
        &self.config
    }

    /// Discovers `CardDAV` support and the address book home set.
    ///
    /// Starts from the configured home set, or from the server root when
    /// none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery requests fail.
    pub async fn discover(&self) -> Result<DiscoverResult, CardDavError> {
        let home = self.config.home().cloned().unwrap_or_else(|| Href::from("/"));
        let url = self.config.url(home.as_str());
        let resp = self
            .http
            .execute(self.http.build_request(Method::OPTIONS, &url), &home)
            .await?;

        let supports_addressbooks = resp
            .headers()
            .get_all("DAV")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.split(',').any(|c| c.trim() == "addressbook"));

        // Find address book home set
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::AddressBookHomeSet);

        let multistatus = self.propfind(&home, &propfind, "0").await?;
        let addressbook_home = multistatus
            .responses
            .iter()
            .flat_map(|r| r.prop_stats.iter())
            .filter(|p| p.status.contains("200"))
            .find_map(|p| p.props.addressbook_home_set.clone())
            .unwrap_or(home);

        Ok(DiscoverResult {
            supports_addressbooks,
            addressbook_home,
        })
    }

    /// The configured address book home set, discovered when not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery is needed and fails.
    pub async fn address_book_home(&self) -> Result<Href, CardDavError> {
        if let Some(home) = self.config.home() {
            return Ok(home.clone());
        }
        let discovered = self.discover().await?;
        tracing::debug!(home = %discovered.addressbook_home, "discovered address book home set");
        Ok(discovered.addressbook_home)
    }

    /// Lists address books under the home set.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails.
    pub async fn list_address_books(&self) -> Result<Vec<AddressBookCollection>, CardDavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::DisplayName);
        propfind.add_property(Prop::ResourceType);
        propfind.add_property(Prop::AddressBookDescription);
        propfind.add_property(Prop::GetCTag);
        propfind.add_property(Prop::SyncToken);

        let home = self.address_book_home().await?;
        let multistatus = self.propfind(&home, &propfind, "1").await?;
        Ok(multistatus.into_collections())
    }

    /// Fetches the change-detection properties of one address book.
    ///
    /// The returned collection carries whichever of `CS:getctag` and
    /// `DAV:sync-token` the server reported.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails or the server omits the collection.
    pub async fn collection_tag(
        &self,
        collection: &Href,
    ) -> Result<AddressBookCollection, CardDavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::DisplayName);
        propfind.add_property(Prop::GetCTag);
        propfind.add_property(Prop::SyncToken);

        let multistatus = self.propfind(collection, &propfind, "0").await?;
        let props = multistatus.props_for(collection).ok_or_else(|| {
            CardDavError::InvalidResponse(format!("No properties reported for {collection}"))
        })?;

        let mut info = AddressBookCollection::new(collection.clone());
        info.display_name.clone_from(&props.display_name);
        info.ctag.clone_from(&props.get_ctag);
        info.sync_token.clone_from(&props.sync_token);
        Ok(info)
    }

    /// Lists member hrefs of an address book with their `ETag`s.
    ///
    /// # Errors
    ///
    /// Returns an error if PROPFIND fails.
    pub async fn list_etags(&self, collection: &Href) -> Result<Vec<(Href, ETag)>, CardDavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::ResourceType);
        propfind.add_property(Prop::GetETag);

        let multistatus = self.propfind(collection, &propfind, "1").await?;
        Ok(multistatus.into_member_etags(collection))
    }

    /// Retrieves multiple address objects by href in one REPORT.
    ///
    /// Hrefs the server answers for with an error, or without data, are
    /// returned in [`MultiGetResult::failures`].
    ///
    /// # Errors
    ///
    /// Returns an error if the REPORT itself fails.
    pub async fn multiget(
        &self,
        collection: &Href,
        hrefs: &[Href],
    ) -> Result<MultiGetResult, CardDavError> {
        if hrefs.is_empty() {
            return Ok(MultiGetResult::default());
        }

        let mut multiget = AddressBookMultiGetRequest::new();
        for href in hrefs {
            multiget.add_href(href.clone());
        }
        let xml_body = multiget.build()?;

        let url = self.config.url(collection.as_str());
        let req = self
            .http
            .build_dav_request("REPORT", &url)?
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", "1")
            .body(xml_body);
        let resp = self.http.execute(req, collection).await?;

        let xml = resp.text().await?;
        let (objects, failures) = MultiStatusResponse::from_xml(&xml)?.into_address_objects();
        tracing::debug!(
            %collection,
            requested = hrefs.len(),
            fetched = objects.len(),
            failed = failures.len(),
            "multiget finished"
        );
        Ok(MultiGetResult { objects, failures })
    }

    /// Gets a single address object by href.
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist or has no `ETag`.
    pub async fn get(&self, href: &Href) -> Result<AddressObject, CardDavError> {
        let url = self.config.url(href.as_str());
        let resp = self
            .http
            .execute(self.http.build_request(Method::GET, &url), href)
            .await?;

        let etag = HttpClient::extract_etag(&resp)?;
        let data = resp.text().await?;
        Ok(AddressObject::new(href.clone(), etag, data))
    }

    /// Creates a new address object, failing if `href` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`CardDavError::PreconditionFailed`] if the resource exists,
    /// or another error if the upload fails.
    pub async fn put_new(&self, href: &Href, vcard: &str) -> Result<ETag, CardDavError> {
        let req = HttpClient::if_none_match_any(self.put_request(href, vcard));
        self.send_put(req, href).await
    }

    /// Replaces an existing address object if its `ETag` still matches.
    ///
    /// # Errors
    ///
    /// Returns [`CardDavError::PreconditionFailed`] on `ETag` mismatch, or
    /// another error if the upload fails.
    pub async fn put(&self, href: &Href, etag: &ETag, vcard: &str) -> Result<ETag, CardDavError> {
        let req = HttpClient::if_match(self.put_request(href, vcard), etag);
        self.send_put(req, href).await
    }

    /// Deletes an address object if its `ETag` still matches.
    ///
    /// A resource that is already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CardDavError::PreconditionFailed`] on `ETag` mismatch, or
    /// another error if deletion fails.
    pub async fn delete(&self, href: &Href, etag: &ETag) -> Result<(), CardDavError> {
        let url = self.config.url(href.as_str());
        let req = HttpClient::if_match(self.http.build_request(Method::DELETE, &url), etag);

        match self.http.execute(req, href).await {
            Ok(_) => Ok(()),
            Err(CardDavError::NotFound(_)) => {
                tracing::debug!(%href, "resource already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn put_request(&self, href: &Href, vcard: &str) -> RequestBuilder {
        let url = self.config.url(href.as_str());
        self.http
            .build_request(Method::PUT, &url)
            .header("Content-Type", VCARD_CONTENT_TYPE)
            .body(vcard.to_string())
    }

    async fn send_put(&self, req: RequestBuilder, href: &Href) -> Result<ETag, CardDavError> {
        let resp = self.http.execute(req, href).await?;
        match HttpClient::extract_etag(&resp) {
            Ok(etag) => Ok(etag),
            // Some servers rewrite the vCard and omit the ETag; ask for it
            Err(_) => self.fetch_etag(href).await,
        }
    }

    async fn fetch_etag(&self, href: &Href) -> Result<ETag, CardDavError> {
        let mut propfind = PropFindRequest::new();
        propfind.add_property(Prop::GetETag);

        let multistatus = self.propfind(href, &propfind, "0").await?;
        multistatus
            .props_for(href)
            .and_then(|p| p.get_etag.clone())
            .ok_or_else(|| CardDavError::InvalidResponse(format!("No ETag reported for {href}")))
    }

    async fn propfind(
        &self,
        href: &Href,
        propfind: &PropFindRequest,
        depth: &str,
    ) -> Result<MultiStatusResponse, CardDavError> {
        let url = self.config.url(href.as_str());
        let req = self
            .http
            .build_dav_request("PROPFIND", &url)?
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", depth)
            .body(propfind.build()?);
        let resp = self.http.execute(req, href).await?;

        let xml = resp.text().await?;
        MultiStatusResponse::from_xml(&xml)
    }
}

/// Result of `CardDAV` server discovery.
#[derive(Debug, Clone)]
pub struct DiscoverResult {
    /// Whether the server advertises `CardDAV` (`DAV: addressbook`).
    pub supports_addressbooks: bool,
    /// The address book home set href.
    pub addressbook_home: Href,
}

/// Result of an address book multiget.
#[derive(Debug, Clone, Default)]
pub struct MultiGetResult {
    /// Objects the server returned with data and `ETag`.
    pub objects: Vec<AddressObject>,
    /// Hrefs that could not be fetched, with the reason.
    pub failures: Vec<(Href, String)>,
}
