//! Office Open XML package helpers: locating the parts that carry text.
use crate::document::RenderError;
use crate::error::ContractError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Package-level relationships
const PACKAGE_RELATIONSHIPS: &str = "_rels/.rels";

/// Main document location used when the package relationships do not name one
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Relationship type suffix of the main document
const MAIN_DOCUMENT_TYPE: &str = "/officeDocument";

/// Relationship type suffixes of the parts rendered alongside the main document
const RENDERED_TYPES: [&str; 4] = ["/header", "/footer", "/footnotes", "/endnotes"];

/// Locates the parts that receive placeholder substitution.
///
/// # Returns
/// The main document part followed by its headers, footers, footnotes and endnotes
pub(super) fn locate<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, ContractError> {
    let main = load_relationships(zip, PACKAGE_RELATIONSHIPS, |kind| kind.ends_with(MAIN_DOCUMENT_TYPE))?
        .into_iter()
        .next()
        .map(|target| resolve("", &target))
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_owned());
    if zip.file(&main)?.is_none() {
        Err(RenderError::MissingMainPart(main.to_owned()))?;
    }

    let (directory, file_name) = match main.rfind('/') {
        Some(index) => main.split_at(index + 1),
        None => ("", main.as_str()),
    };
    let relationships = format!("{directory}_rels/{file_name}.rels");
    let mut parts: Vec<String> = load_relationships(zip, &relationships, |kind| {
        RENDERED_TYPES.iter().any(|suffix| kind.ends_with(suffix))
    })?
    .into_iter()
    .map(|target| resolve(directory, &target))
    .collect();
    parts.insert(0, main.to_owned());
    Ok(parts)
}

/// Loads internal relationship targets whose type is accepted by `accept`
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Targets as written in the relationships file; an absent file yields none
fn load_relationships<RS, F>(zip: &mut ZipArchive<RS>, path: &str, accept: F) -> Result<Vec<String>, ContractError>
where
    RS: Read + Seek,
    F: Fn(&str) -> bool,
{
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };
    let mut targets = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            let external = event.get_attribute_value("TargetMode")?
                .map(|mode| mode.eq_ignore_ascii_case("External"))
                .unwrap_or(false);
            if let Some((kind, target)) = kind.zip(target) {
                if !external && accept(kind.as_ref()) {
                    targets.push(target.to_string());
                }
            }
        }
    });
    Ok(targets)
}

/// Resolves a relationship target against the directory of its source part
///
/// # Arguments
/// * `directory` - Source part directory with a trailing slash, or empty for the package root
/// * `target` - Target as written in the relationships file
fn resolve(directory: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut segments: Vec<&str> = directory.split('/').filter(|segment| !segment.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_targets() {
        assert_eq!(resolve("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve("", "/word/document.xml"), "word/document.xml");
        assert_eq!(resolve("word/", "header1.xml"), "word/header1.xml");
        assert_eq!(resolve("word/", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve("word/", "./footer2.xml"), "word/footer2.xml");
    }
}
