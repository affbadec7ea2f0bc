// Sitemap writers for the supported output formats

use crate::config::OutputFormat;
use crate::sitemap::{HashPage, SitemapView};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sitemapper_scanner::Page;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

pub trait SitemapWriter {
    fn write_to(&self, view: &SitemapView, path: &Path) -> Result<(), WriteError>;
}

pub struct JsonWriter;

impl SitemapWriter for JsonWriter {
    fn write_to(&self, view: &SitemapView, path: &Path) -> Result<(), WriteError> {
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut out, view)?;
        out.write_all(b"\n")?;
        out.flush()?;

        info!("Sitemap written to: {}", path.display());
        Ok(())
    }
}

pub struct XmlWriter;

impl SitemapWriter for XmlWriter {
    fn write_to(&self, view: &SitemapView, path: &Path) -> Result<(), WriteError> {
        let file = BufWriter::new(File::create(path)?);
        let mut writer = Writer::new_with_indent(file, b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        match view {
            SitemapView::Adjacency(pages) => write_adjacency(&mut writer, pages)?,
            SitemapView::Tree(tree) => {
                writer.write_event(Event::Start(BytesStart::new("site")))?;
                write_text_element(&mut writer, "total_pages", &tree.total_pages.to_string())?;
                write_tree_page(&mut writer, &tree.entry_page)?;
                writer.write_event(Event::End(BytesEnd::new("site")))?;
            }
        }

        let mut file = writer.into_inner();
        file.write_all(b"\n")?;
        file.flush()?;

        info!("Sitemap written to: {}", path.display());
        Ok(())
    }
}

/// Pick the writer for an output format.
pub fn writer_for(format: OutputFormat) -> Box<dyn SitemapWriter> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter),
        OutputFormat::Xml => Box::new(XmlWriter),
    }
}

fn write_adjacency<W: Write>(writer: &mut Writer<W>, pages: &[HashPage]) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new("sitemap")))?;
    for page in pages {
        writer.write_event(Event::Start(BytesStart::new("page")))?;
        write_text_element(writer, "url", &page.url)?;
        write_text_element(writer, "total_links", &page.total_links.to_string())?;
        if !page.links.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("links")))?;
            for link in &page.links {
                write_text_element(writer, "url", link)?;
            }
            writer.write_event(Event::End(BytesEnd::new("links")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("page")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sitemap")))?;
    Ok(())
}

fn write_tree_page<W: Write>(writer: &mut Writer<W>, page: &Page) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new("page")))?;
    write_text_element(writer, "url", &page.url)?;
    write_text_element(writer, "total_links", &page.link_count.to_string())?;
    if !page.links.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("links")))?;
        for child in &page.links {
            write_tree_page(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new("links")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("page")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), WriteError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
