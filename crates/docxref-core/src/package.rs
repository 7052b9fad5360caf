/*
 * package.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * In-memory OPC package (zip of XML parts).
 */

//! In-memory OPC package.
//!
//! A word-processor package is a zip archive of named parts. [`Package`]
//! keeps the parts in insertion order and writes them with fixed timestamps,
//! so two compilations of the same input produce byte-identical files.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use hashlink::LinkedHashMap;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{Result, XrefError};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub const STYLES_PART: &str = "word/styles.xml";
pub const NUMBERING_PART: &str = "word/numbering.xml";
pub const SETTINGS_PART: &str = "word/settings.xml";
pub const CORE_PROPS_PART: &str = "docProps/core.xml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    parts: LinkedHashMap<String, Vec<u8>>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a part. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        let name = name.into();
        let content = content.into();
        match self.parts.get_mut(&name) {
            Some(existing) => *existing = content,
            None => {
                self.parts.insert(name, content);
            }
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// A part that must exist.
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| XrefError::package(format!("package has no `{}` part", name)))
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serialize as a zip archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        for (name, content) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(content)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Read a zip archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut package = Package::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            package.insert(name, content);
        }
        Ok(package)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
            .map_err(|e| XrefError::package(format!("{}: {}", path.display(), e)))
    }

    /// Write to `path` through a temporary sibling so readers never see a
    /// partial file.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_bytes()?)
    }
}

/// Replace `path` with `bytes` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| XrefError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Package {
        let mut package = Package::new();
        package.insert(CONTENT_TYPES_PART, "<Types/>");
        package.insert(DOCUMENT_PART, "<w:document/>");
        package
    }

    #[test]
    fn test_zip_output_is_deterministic() {
        assert_eq!(sample().to_bytes().unwrap(), sample().to_bytes().unwrap());
    }

    #[test]
    fn test_read_back_preserves_order_and_content() {
        let bytes = sample().to_bytes().unwrap();
        let package = Package::from_bytes(&bytes).unwrap();
        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(names, [CONTENT_TYPES_PART, DOCUMENT_PART]);
        assert_eq!(package.part(DOCUMENT_PART), Some("<w:document/>".as_bytes()));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut package = sample();
        package.insert(CONTENT_TYPES_PART, "<Types></Types>");
        assert_eq!(package.part_names().next(), Some(CONTENT_TYPES_PART));
        assert_eq!(package.len(), 2);
    }

    #[test]
    fn test_missing_part_and_garbage_input() {
        assert!(matches!(sample().require(STYLES_PART), Err(XrefError::Package(_))));
        assert!(matches!(Package::from_bytes(b"not a zip"), Err(XrefError::Package(_))));
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.docx");
        sample().write(&path).unwrap();
        assert_eq!(Package::read(&path).unwrap(), sample());
    }
}
