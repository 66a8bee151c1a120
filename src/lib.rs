pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod webdav_xml_parser;

pub use errors::{DavError, DavResult};
pub use models::{FileKind, Props};
pub use services::webdav::{Listing, WebDAVConfig, WebDavSession};
