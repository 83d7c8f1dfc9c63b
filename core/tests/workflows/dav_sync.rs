// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Full passes against a mocked `CardDAV` server.

use davsync_core::{Body, ConflictStrategy, Davsync, LocalCollection, RemoteCollection, SyncError};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{COLLECTION, setup_temp_dirs, test_config, vcard};

fn multistatus(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_raw(
        format!("<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n{body}"),
        "application/xml",
    )
}

async fn mount_ctag(server: &MockServer, ctag: &str) {
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION))
        .and(header("Depth", "0"))
        .respond_with(multistatus(&format!(
            "\
<D:multistatus xmlns:D=\"DAV:\" xmlns:CS=\"http://calendarserver.org/ns/\">
  <D:response>
    <D:href>{COLLECTION}</D:href>
    <D:propstat>
      <D:prop><CS:getctag>{ctag}</CS:getctag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"
        )))
        .mount(server)
        .await;
}

const LISTING: &str = "\
<D:multistatus xmlns:D=\"DAV:\">
  <D:response>
    <D:href>/ab/contacts/</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/ab/contacts/alice.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>\"a1\"</D:getetag><D:resourcetype/></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/ab/contacts/bob.vcf</D:href>
    <D:propstat>
      <D:prop><D:getetag>\"b1\"</D:getetag><D:resourcetype/></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>";

const MULTIGET: &str = "\
<D:multistatus xmlns:D=\"DAV:\" xmlns:C=\"urn:ietf:params:xml:ns:carddav\">
  <D:response>
    <D:href>/ab/contacts/alice.vcf</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>\"a1\"</D:getetag>
        <C:address-data>BEGIN:VCARD&#13;
VERSION:3.0&#13;
FN:Alice&#13;
END:VCARD&#13;
</C:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/ab/contacts/bob.vcf</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
</D:multistatus>";

#[tokio::test]
async fn dav_sync_pulls_contacts_into_sqlite() {
    // Arrange
    let server = MockServer::start().await;
    mount_ctag(&server, "ctag-1").await;
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION))
        .and(header("Depth", "1"))
        .respond_with(multistatus(LISTING))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("REPORT"))
        .and(path(COLLECTION))
        .and(body_string_contains("addressbook-multiget"))
        .respond_with(multistatus(MULTIGET))
        .expect(1)
        .mount(&server)
        .await;

    let dirs = setup_temp_dirs().await.unwrap();
    let davsync = Davsync::new(test_config(&server.uri(), &dirs.state_dir))
        .await
        .unwrap();

    // Act
    let first = davsync.sync().await.unwrap();

    // Assert
    assert_eq!(first.local.inserted, 1);
    assert_eq!(first.errors.len(), 1, "bob is gone by the time it is fetched");
    let records = davsync.address_book().list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].body,
        Body::from("BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Alice\r\nEND:VCARD\r\n")
    );

    // The failed fetch keeps the old tag
    let state = davsync.sync_state().await.unwrap();
    assert_eq!(state.last_collection_tag, None);
    assert_eq!(state.entries.len(), 1);
    assert!(dirs.state_dir.join("davsync.db").exists());

    davsync.close().await.unwrap();
}

#[tokio::test]
async fn dav_sync_skips_listing_when_ctag_is_unchanged() {
    let server = MockServer::start().await;
    mount_ctag(&server, "ctag-7").await;
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION))
        .and(header("Depth", "1"))
        .respond_with(multistatus(
            "<D:multistatus xmlns:D=\"DAV:\"><D:response><D:href>/ab/contacts/</D:href>\
<D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>\
<D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response></D:multistatus>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dirs = setup_temp_dirs().await.unwrap();
    let davsync = Davsync::new(test_config(&server.uri(), &dirs.state_dir))
        .await
        .unwrap();

    let first = davsync.sync().await.unwrap();
    let second = davsync.sync().await.unwrap();

    assert!(!first.fast_path);
    assert!(second.fast_path);
    assert!(second.is_clean());
}

#[tokio::test]
async fn dav_sync_pushes_new_contact() {
    let server = MockServer::start().await;
    mount_ctag(&server, "ctag-1").await;
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION))
        .and(header("Depth", "1"))
        .respond_with(multistatus(
            "<D:multistatus xmlns:D=\"DAV:\"></D:multistatus>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/ab/contacts/[0-9a-f-]+\.vcf$"))
        .and(header("If-None-Match", "*"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"n1\""))
        .expect(1)
        .mount(&server)
        .await;

    let dirs = setup_temp_dirs().await.unwrap();
    let mut config = test_config(&server.uri(), &dirs.state_dir);
    config.sync.conflict = ConflictStrategy::RemoteWins;
    let davsync = Davsync::new(config).await.unwrap();
    let id = davsync.address_book().create(&vcard("carol")).await.unwrap();

    let result = davsync.sync().await.unwrap();

    assert!(result.is_clean());
    assert_eq!(result.remote.inserted, 1);
    let record = davsync.address_book().get(id).await.unwrap().unwrap();
    assert!(!record.dirty);
    assert!(record.href.unwrap().as_str().starts_with(COLLECTION));
    assert_eq!(record.etag.unwrap().as_str(), "\"n1\"");
    assert!(davsync.address_book().list_dirty().await.unwrap().is_empty());
}

#[tokio::test]
async fn dav_address_book_maps_server_answers() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path(COLLECTION))
        .and(header("Depth", "0"))
        .respond_with(multistatus(&format!(
            "\
<D:multistatus xmlns:D=\"DAV:\">
  <D:response>
    <D:href>{COLLECTION}</D:href>
    <D:propstat>
      <D:prop><D:sync-token>http://example.com/sync/3</D:sync-token></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"
        )))
        .mount(&server)
        .await;
    Mock::given(method("REPORT"))
        .and(path(COLLECTION))
        .respond_with(multistatus(
            "\
<D:multistatus xmlns:D=\"DAV:\" xmlns:C=\"urn:ietf:params:xml:ns:carddav\">
  <D:response>
    <D:href>/ab/contacts/cal.vcf</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>\"c1\"</D:getetag>
        <C:address-data>BEGIN:VCALENDAR
END:VCALENDAR
</C:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/ab/contacts/gone.vcf</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
</D:multistatus>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(412))
        .mount(&server)
        .await;

    let dirs = setup_temp_dirs().await.unwrap();
    let davsync = Davsync::new(test_config(&server.uri(), &dirs.state_dir))
        .await
        .unwrap();
    let remote = davsync.remote();

    let tag = remote.fetch_collection_tag().await.unwrap();
    assert_eq!(tag.value, "http://example.com/sync/3");

    let fetched = remote
        .fetch_bodies(&[
            "/ab/contacts/cal.vcf".into(),
            "/ab/contacts/gone.vcf".into(),
        ])
        .await
        .unwrap();
    assert!(fetched.resources.is_empty());
    assert_eq!(fetched.failures.len(), 2);
    assert!(
        fetched
            .failures
            .iter()
            .any(|(_, e)| matches!(e, SyncError::Protocol(_)))
    );
    assert!(
        fetched
            .failures
            .iter()
            .any(|(_, e)| matches!(e, SyncError::NotFound(_)))
    );

    let err = remote.create(&vcard("dora")).await.unwrap_err();
    assert!(matches!(err, SyncError::Conflict(_)));
}
