//! Zip bundle of generated documents with collision-safe entry names.

use crate::batch::BatchError;
use chrono::Datelike;
use chrono::NaiveDateTime;
use chrono::Timelike;
use std::collections::HashSet;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::DateTime;
use zip::ZipWriter;

/// Replaces path separators so a name is a single archive entry.
pub fn sanitize_entry_name(name: &str) -> String {
    name.replace(['/', '\\'], "-")
}

/// Returns `name`, or `name` with `_2`, `_3`, ... before its extension when
/// `name` is already taken. Names are compared case-insensitively.
pub(crate) fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(&name.to_lowercase()) {
        return name.to_owned();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(index) if index > 0 => name.split_at(index),
        _ => (name, ""),
    };
    (2usize..)
        .map(|suffix| format!("{stem}_{suffix}{extension}"))
        .find(|candidate| !taken.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_owned())
}

/// Writes documents into an in-memory zip archive, owned by one batch run.
pub(crate) struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
    taken: HashSet<String>,
}

impl ArchiveBuilder {
    /// Creates an empty archive whose entries carry `timestamp` as modification time,
    /// or the zip epoch (1980-01-01) without one.
    pub(crate) fn new(timestamp: Option<NaiveDateTime>) -> ArchiveBuilder {
        let modified = match timestamp {
            Some(timestamp) => to_zip_datetime(timestamp).unwrap_or_else(|| {
                tracing::warn!("Timestamp {} cannot be stored in a zip archive", timestamp);
                DateTime::default()
            }),
            None => DateTime::default(),
        };
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(modified);
        ArchiveBuilder {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options,
            taken: HashSet::new(),
        }
    }

    /// Appends a document under a sanitized, unique version of `name`.
    ///
    /// # Returns
    /// The entry name actually used
    pub(crate) fn append(&mut self, name: &str, bytes: &[u8]) -> Result<String, BatchError> {
        let name = unique_name(&sanitize_entry_name(name), &self.taken);
        self.writer.start_file(name.as_str(), self.options)?;
        self.writer.write_all(bytes).map_err(|error| BatchError::ArchiveError(error.into()))?;
        self.taken.insert(name.to_lowercase());
        Ok(name)
    }

    /// Finishes the archive and returns its bytes.
    pub(crate) fn finish(self) -> Result<Vec<u8>, BatchError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

/// Zip stores local time with two-second precision between 1980 and 2107.
fn to_zip_datetime(timestamp: NaiveDateTime) -> Option<DateTime> {
    DateTime::from_date_and_time(
        u16::try_from(timestamp.year()).ok()?,
        timestamp.month() as u8,
        timestamp.day() as u8,
        timestamp.hour() as u8,
        timestamp.minute() as u8,
        timestamp.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn sanitize_separators() {
        assert_eq!(sanitize_entry_name("CT/001_a\\b.docx"), "CT-001_a-b.docx");
    }

    #[test]
    fn unique_name_suffixes() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("CT_Somchai.docx", &taken), "CT_Somchai.docx");
        taken.insert("ct_somchai.docx".to_owned());
        assert_eq!(unique_name("CT_Somchai.docx", &taken), "CT_Somchai_2.docx");
        taken.insert("ct_somchai_2.docx".to_owned());
        assert_eq!(unique_name("ct_SOMCHAI.docx", &taken), "ct_SOMCHAI_3.docx");
        taken.insert(".hidden".to_owned());
        assert_eq!(unique_name(".hidden", &taken), ".hidden_2");
    }

    #[test]
    fn archive_never_overwrites() {
        let mut archive = ArchiveBuilder::new(None);
        let names: Vec<String> = (0..3)
            .map(|index| archive.append("CT_Somchai.docx", format!("{index}").as_bytes()).unwrap())
            .collect();
        assert_eq!(names, ["CT_Somchai.docx", "CT_Somchai_2.docx", "CT_Somchai_3.docx"]);

        let bytes = archive.finish().unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);
        let mut content = String::new();
        zip.by_name("CT_Somchai_3.docx").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "2");
    }

    #[test]
    fn archive_entry_timestamp() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap().and_hms_opt(14, 5, 8).unwrap();
        let mut archive = ArchiveBuilder::new(Some(timestamp));
        archive.append("a.docx", b"a").unwrap();
        let bytes = archive.finish().unwrap();

        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let modified = zip.by_index(0).unwrap().last_modified().unwrap();
        assert_eq!((modified.year(), modified.month(), modified.day()), (2024, 9, 30));
        assert_eq!((modified.hour(), modified.minute()), (14, 5));
    }

    #[test]
    fn archive_without_timestamp_is_reproducible() {
        let build = || {
            let mut archive = ArchiveBuilder::new(None);
            archive.append("a.docx", b"a").unwrap();
            archive.finish().unwrap()
        };
        let first = build();
        assert_eq!(first, build());

        let mut zip = ZipArchive::new(Cursor::new(first)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().last_modified(), Some(DateTime::default()));
    }

    #[test]
    fn zip_datetime_out_of_range() {
        let timestamp = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(to_zip_datetime(timestamp).is_none());
    }
}
