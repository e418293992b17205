//! Icon config archives.
//!
//! `options.configs` carries a percent-encoded, base64-encoded zip file
//! holding a single JSON entry (`minified_configs.json`) with the list of
//! placed icons. This module unpacks that payload and builds it.

use crate::page::{IconConfig, PageData};
use crate::{ArchiveFailurePolicy, Error, LoaderConfig, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as Base64Engine;
use log::{debug, warn};
use std::io::{Cursor, Read, Write};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry name the icon configs are stored under
pub const DEFAULT_ENTRY_NAME: &str = "minified_configs.json";

// Stray trailing bits are accepted like JSZip; length is checked separately.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Reverse URL escaping (`decodeURIComponent` semantics: `+` is kept and a
/// `%` must start a valid escape).
pub fn percent_decode(encoded: &str) -> Result<String> {
    let bytes = encoded.as_bytes();
    for (i, _) in encoded.match_indices('%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(Error::PercentDecode(format!("malformed escape at byte {}", i)));
        }
    }
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .map_err(|e| Error::PercentDecode(e.to_string()))
}

/// Decode base64 the way JSZip does: characters outside the base64
/// alphabet are ignored, data URLs are refused and the remaining input
/// must be whole 4-character groups.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    if input.starts_with("data:") {
        return Err(Error::Base64("input looks like a data URL".into()));
    }
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    if cleaned.len() % 4 != 0 {
        return Err(Error::Base64(format!(
            "bad content length {} (not a multiple of 4)",
            cleaned.len()
        )));
    }
    Ok(LENIENT_BASE64.decode(cleaned.as_bytes())?)
}

/// Read one entry from a zip archive as UTF-8 text.
///
/// Returns `Ok(None)` when the archive has no such entry.
pub fn read_entry(archive: &[u8], name: &str, max_bytes: u64) -> Result<Option<String>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if entry.size() > max_bytes {
        return Err(Error::Archive(format!(
            "entry `{}` is {} bytes, limit is {}",
            name,
            entry.size(),
            max_bytes
        )));
    }

    let mut contents = Vec::new();
    (&mut entry)
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut contents)
        .map_err(|e| Error::Archive(format!("failed to inflate `{}`: {}", name, e)))?;
    if contents.len() as u64 > max_bytes {
        return Err(Error::Archive(format!(
            "entry `{}` exceeds {} bytes",
            name, max_bytes
        )));
    }

    String::from_utf8(contents)
        .map(Some)
        .map_err(|_| Error::IconConfigs(format!("entry `{}` is not valid UTF-8", name)))
}

/// Parse the JSON list stored in the archive entry.
pub fn parse_icon_configs(text: &str) -> Result<Vec<IconConfig>> {
    serde_json::from_str(text).map_err(|e| Error::IconConfigs(e.to_string()))
}

/// Unpack an encoded `configs` payload into the icon config list.
///
/// A missing or empty entry gives an empty list. Bad encodings, corrupt
/// archives and malformed JSON are errors.
pub fn extract_icon_configs(encoded: &str, config: &LoaderConfig) -> Result<Vec<IconConfig>> {
    let decoded = percent_decode(encoded)?;
    debug!("decoded configs payload: {}", decoded);
    let archive = decode_base64(&decoded)?;

    match read_entry(&archive, &config.entry_name, config.max_entry_bytes)? {
        Some(text) if !text.is_empty() => parse_icon_configs(&text),
        Some(_) => Ok(Vec::new()),
        None => {
            debug!("archive has no `{}` entry", config.entry_name);
            Ok(Vec::new())
        }
    }
}

/// Apply the configured failure policy to an extraction result.
pub fn settle(result: Result<Vec<IconConfig>>, config: &LoaderConfig) -> Result<Vec<IconConfig>> {
    match result {
        Err(e) if e.is_archive_failure() && config.archive_failure == ArchiveFailurePolicy::Degrade => {
            warn!("ignoring unreadable icon config archive: {}", e);
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Replace `options.configs` with the extracted `unzipped_icon_configs`.
/// Pages without an archive are left untouched.
pub fn attach_icon_configs(page: &mut PageData, config: &LoaderConfig) -> Result<()> {
    let Some(encoded) = page.take_configs() else {
        return Ok(());
    };
    let configs = settle(extract_icon_configs(&encoded, config), config)?;
    page.unzipped_icon_configs = Some(configs);
    Ok(())
}

/// Build a `configs` payload: JSON list, zipped under `entry_name`,
/// base64-encoded and percent-encoded.
pub fn pack_icon_configs(configs: &[IconConfig], entry_name: &str) -> Result<String> {
    let json = serde_json::to_vec(configs).map_err(|e| Error::IconConfigs(e.to_string()))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(
        entry_name,
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    writer.write_all(&json)?;
    let archive = writer.finish()?.into_inner();

    let encoded = base64::engine::general_purpose::STANDARD.encode(archive);
    Ok(urlencoding::encode(&encoded).into_owned())
}
