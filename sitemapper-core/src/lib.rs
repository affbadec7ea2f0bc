pub mod config;
pub mod sitemap;
pub mod writer;

pub use config::{Config, ConfigError, ConfigOptions, MapType, OutputFormat};
pub use sitemap::{HashPage, SiteTree, SitemapView};
pub use writer::{JsonWriter, SitemapWriter, WriteError, XmlWriter, writer_for};
