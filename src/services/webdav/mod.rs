// WebDAV session modules organized by functionality

pub mod cache;
pub mod config;
pub mod connection;
pub mod session;
pub mod url_management;

// Re-export main types for convenience
pub use cache::{CacheLookup, CachedBlob, CachedBody, ResourceCache};
pub use config::WebDAVConfig;
pub use connection::{HttpTransport, Transport, TransportResponse};
pub use session::{Listing, WebDavSession};
pub use url_management::WebDAVUrlManager;
