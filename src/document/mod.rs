//! # Template Rendering
//!
//! A template is a WordprocessingML package (`.docx`) whose text contains
//! `{{ key }}` placeholders. Rendering is a pure function of the template bytes
//! and one row context: the package is re-opened from the original bytes on
//! every call, so nothing loaded for one row can leak into the next.
use crate::contract::context::RowContext;
use crate::document::placeholder::Part;
use crate::error::ContractError;
use crate::error::ResultMessage;
use crate::helpers::zip::ZipHelper;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

mod parts;
mod placeholder;

/// Errors raised while reading or rendering a template.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template is not a readable document package: {0}")]
    TemplateArchive(ZipError),

    #[error("Template has no main document part '{0}'")]
    MissingMainPart(String),

    #[error("Unclosed placeholder in '{part}' near '{text}'")]
    UnclosedPlaceholder { part: String, text: String },

    #[error("Malformed placeholder '{text}' in '{part}'")]
    MalformedPlaceholder { part: String, text: String },

    #[error("Placeholder '{key}' in '{part}' is not a contract field")]
    UnknownPlaceholder { part: String, key: String },
}

/// A validated document template.
///
/// Holds the original bytes only; every render decodes them afresh.
#[derive(Clone, Debug)]
pub struct Template {
    bytes: Arc<[u8]>,
}

impl Template {
    /// Validates template bytes: the package must open, have a main document
    /// part, and contain only well-formed placeholders.
    pub fn new(bytes: Vec<u8>) -> Result<Template, ContractError> {
        let template = Template {
            bytes: Arc::from(bytes),
        };
        let unknown = template.unknown_placeholders()?;
        if !unknown.is_empty() {
            tracing::warn!(
                "Template placeholders without a contract field will render blank: {}",
                unknown.join(", ")
            );
        }
        Ok(template)
    }

    /// Reads and validates a template file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Template, ContractError> {
        let path = path.as_ref();
        std::fs::read(path)
            .map_err(ContractError::from)
            .and_then(Self::new)
            .with_prefix(&format!("Read template '{}' failed", path.display()))
    }

    /// The original template bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Renders one document for `context`.
    pub fn render(&self, context: &RowContext, strict: bool) -> Result<Vec<u8>, ContractError> {
        render(&self.bytes, context, strict)
    }

    /// Distinct placeholder keys used by the rendered parts.
    pub fn placeholders(&self) -> Result<BTreeSet<String>, ContractError> {
        let mut zip = open_package(&self.bytes)?;
        let mut keys = BTreeSet::<String>::new();
        for name in parts::locate(&mut zip)? {
            if let Some(xml) = read_part(&mut zip, &name)? {
                keys.extend(Part::parse(&name, &xml)?.placeholders()?);
            }
        }
        Ok(keys)
    }

    /// Placeholder keys that no row context provides; they render blank.
    pub fn unknown_placeholders(&self) -> Result<Vec<String>, ContractError> {
        Ok(self
            .placeholders()?
            .into_iter()
            .filter(|key| !RowContext::KEYS.contains(&key.as_str()))
            .collect())
    }
}

/// Renders a template package with one row context.
///
/// Every entry of the package is copied in its original order; the main
/// document and its headers, footers, footnotes and endnotes get their
/// placeholders substituted.
pub fn render(template: &[u8], context: &RowContext, strict: bool) -> Result<Vec<u8>, ContractError> {
    let mut source = open_package(template)?;
    let parts = parts::locate(&mut source)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::<u8>::with_capacity(template.len())));

    for index in 0..source.len() {
        let mut file = source.by_index(index).map_err(RenderError::TemplateArchive)?;
        let name = file.name().to_owned();
        let options = SimpleFileOptions::default()
            .compression_method(writable_compression(file.compression()))
            .last_modified_time(file.last_modified().unwrap_or_default());
        if file.is_dir() {
            writer.add_directory(name, options).map_err(RenderError::TemplateArchive)?;
            continue;
        }

        let mut bytes = Vec::<u8>::new();
        file.read_to_end(&mut bytes)?;
        if parts.iter().any(|part| part.eq_ignore_ascii_case(&name)) {
            let mut part = Part::parse(&name, &bytes)?;
            let replaced = part.substitute(context, strict)?;
            tracing::debug!("Rendered '{}' with {} placeholder(s)", name, replaced);
            bytes = part.write()?;
        }
        writer.start_file(name, options).map_err(RenderError::TemplateArchive)?;
        writer.write_all(&bytes)?;
    }

    let cursor = writer.finish().map_err(RenderError::TemplateArchive)?;
    Ok(cursor.into_inner())
}

/// Keeps Stored and Deflated entries as they are; anything else is written Deflated.
fn writable_compression(method: CompressionMethod) -> CompressionMethod {
    match method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    }
}

fn open_package(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ContractError> {
    Ok(ZipArchive::new(Cursor::new(bytes)).map_err(RenderError::TemplateArchive)?)
}

fn read_part<RS: Read + Seek>(zip: &mut ZipArchive<RS>, name: &str) -> Result<Option<Vec<u8>>, ContractError> {
    match zip.file(name)? {
        Some(mut file) => {
            let mut bytes = Vec::<u8>::new();
            file.read_to_end(&mut bytes)?;
            Ok(Some(bytes))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory `.docx` packages for tests.
    use std::io::Cursor;
    use std::io::Read;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;
    use zip::ZipArchive;
    use zip::ZipWriter;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
    const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;
    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/{{ name }}" TargetMode="External"/></Relationships>"#;

    /// Wraps paragraphs into a document part.
    pub(crate) fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    /// Wraps paragraphs into a header part.
    pub(crate) fn header(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{body}</w:hdr>"#
        )
    }

    /// Builds a package from `(entry name, content)` pairs.
    pub(crate) fn package(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// A complete template whose main document and header use the given paragraphs.
    pub(crate) fn docx(body: &str, header_body: &str) -> Vec<u8> {
        package(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/document.xml", document(body).as_str()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
            ("word/header1.xml", header(header_body).as_str()),
            ("word/notes.xml", document(body).as_str()),
        ])
    }

    /// Reads one entry of a package as text.
    pub(crate) fn entry(bytes: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    /// Entry names of a package in archive order.
    pub(crate) fn entry_names(bytes: &[u8]) -> Vec<String> {
        let zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        zip.file_names().map(str::to_owned).collect()
    }
}
