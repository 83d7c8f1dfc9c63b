// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use davsync_carddav::{AddressObject, CardDavClient, CardDavError, status_code};

use crate::collection::{FetchedBodies, RemoteCollection};
use crate::error::SyncError;
use crate::types::{Body, CollectionTag, ETag, Href, RemoteResource};

/// A `CardDAV` address book as the remote side of a sync.
#[derive(Debug, Clone)]
pub struct DavAddressBook {
    client: CardDavClient,
    collection: Href,
}

impl DavAddressBook {
    pub fn new(client: CardDavClient, collection: Href) -> Self {
        Self { client, collection }
    }

    pub fn client(&self) -> &CardDavClient {
        &self.client
    }

    pub fn collection(&self) -> &Href {
        &self.collection
    }

    /// Href for a new resource, named after a random UUID.
    fn new_member_href(&self) -> Href {
        self.collection
            .join(&format!("{}.vcf", uuid::Uuid::new_v4()))
    }
}

/// Only vCards are accepted as bodies.
fn looks_like_vcard(data: &str) -> bool {
    data.trim_start()
        .lines()
        .next()
        .is_some_and(|line| line.trim().eq_ignore_ascii_case("BEGIN:VCARD"))
}

fn into_resource(object: AddressObject) -> Result<RemoteResource, (Href, SyncError)> {
    if !looks_like_vcard(&object.data) {
        let msg = format!("{} is not a vCard", object.href);
        return Err((object.href, SyncError::Protocol(msg)));
    }
    Ok(RemoteResource {
        href: object.href,
        etag: object.etag,
        body: Body::new(object.data),
    })
}

fn failure_error(href: &Href, reason: &str) -> SyncError {
    match status_code(reason) {
        Some(404 | 410) => SyncError::NotFound(href.to_string()),
        _ => SyncError::Protocol(format!("failed to fetch {href}: {reason}")),
    }
}

#[async_trait]
impl RemoteCollection for DavAddressBook {
    async fn fetch_collection_tag(&self) -> Result<CollectionTag, SyncError> {
        let info = self.client.collection_tag(&self.collection).await?;
        match (info.ctag, info.sync_token) {
            (Some(ctag), _) => Ok(CollectionTag::ctag(ctag)),
            (None, Some(token)) => Ok(CollectionTag::sync_token(token)),
            (None, None) => Err(SyncError::Protocol(format!(
                "{} reports neither getctag nor sync-token",
                self.collection
            ))),
        }
    }

    async fn list_identities(&self) -> Result<Vec<(Href, ETag)>, SyncError> {
        Ok(self.client.list_etags(&self.collection).await?)
    }

    #[tracing::instrument(skip_all, fields(count = hrefs.len()))]
    async fn fetch_bodies(&self, hrefs: &[Href]) -> Result<FetchedBodies, SyncError> {
        let fetched = self.client.multiget(&self.collection, hrefs).await?;

        let mut bodies = FetchedBodies::default();
        for object in fetched.objects {
            match into_resource(object) {
                Ok(resource) => bodies.resources.push(resource),
                Err((href, e)) => {
                    tracing::warn!(%href, "discarding resource that is not a vCard");
                    bodies.failures.push((href, e));
                }
            }
        }
        for (href, reason) in fetched.failures {
            let e = failure_error(&href, &reason);
            bodies.failures.push((href, e));
        }
        Ok(bodies)
    }

    async fn create(&self, body: &Body) -> Result<(Href, ETag), SyncError> {
        let href = self.new_member_href();
        match self.client.put_new(&href, body.as_str()).await {
            Ok(etag) => Ok((href, etag)),
            Err(CardDavError::PreconditionFailed(href)) => Err(SyncError::Conflict(href)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, href: &Href, expected: &ETag, body: &Body) -> Result<ETag, SyncError> {
        Ok(self.client.put(href, expected, body.as_str()).await?)
    }

    async fn delete(&self, href: &Href, expected: &ETag) -> Result<(), SyncError> {
        Ok(self.client.delete(href, expected).await?)
    }
}
