// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CardDAV` client for listing and exchanging contacts with `CardDAV` servers (RFC 6352).

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod client;
mod config;
mod error;
mod http;
mod request;
mod response;
mod types;
mod xml;

pub use crate::client::{CardDavClient, DiscoverResult, MultiGetResult};
pub use crate::config::{AuthMethod, CardDavConfig};
pub use crate::error::CardDavError;
pub use crate::request::{AddressBookMultiGetRequest, Prop, PropFindRequest};
pub use crate::response::{MultiStatusResponse, PropStat, Properties, ResponseItem, status_code};
pub use crate::types::{AddressBookCollection, AddressObject, ETag, Href};
