//! Encoder binary acquisition
//!
//! Out of the core pipeline: given a target directory, make sure an ffmpeg
//! binary exists there, downloading and unpacking a release archive when it
//! does not. Idempotent — an existing binary short-circuits everything.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::errors::ReelError;

#[cfg(windows)]
const BINARY_NAME: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "ffmpeg";

#[cfg(target_os = "windows")]
const DOWNLOAD_URL: Option<&str> =
    Some("https://www.gyan.dev/ffmpeg/builds/ffmpeg-release-essentials.zip");
#[cfg(target_os = "macos")]
const DOWNLOAD_URL: Option<&str> = Some("https://evermeet.cx/ffmpeg/getrelease/zip");
// No upstream publishes plain-zip Linux builds; distributions ship ffmpeg
// through their package managers instead.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DOWNLOAD_URL: Option<&str> = None;

/// Ensure `dir` holds an ffmpeg binary and return its path.
pub fn ensure_encoder(dir: &Path) -> Result<PathBuf, ReelError> {
    let target = dir.join(BINARY_NAME);
    if target.is_file() {
        log::debug!("encoder already present at {}", target.display());
        return Ok(target);
    }

    let url = DOWNLOAD_URL.ok_or_else(|| ReelError::EncoderMissing(target.clone()))?;

    log::info!("downloading encoder from {}", url);
    let response = ureq::get(url)
        .call()
        .map_err(|e| ReelError::Fetch(format!("GET {} failed: {}", url, e)))?;
    let mut archive_bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut archive_bytes)
        .map_err(ReelError::Io)?;

    fs::create_dir_all(dir)?;
    extract_binary(&archive_bytes, &target)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755))?;
    }

    log::info!("encoder installed at {}", target.display());
    Ok(target)
}

fn extract_binary(archive_bytes: &[u8], target: &Path) -> Result<(), ReelError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ReelError::Fetch(format!("bad archive: {}", e)))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ReelError::Fetch(format!("bad archive entry: {}", e)))?;
        let name = entry.name().to_string();
        let is_binary =
            !name.ends_with('/') && (name == BINARY_NAME || name.ends_with(&format!("/{}", BINARY_NAME)));
        if is_binary {
            let mut out = fs::File::create(target)?;
            std::io::copy(&mut entry, &mut out)?;
            return Ok(());
        }
    }

    Err(ReelError::Fetch(format!(
        "archive did not contain {}",
        BINARY_NAME
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_binary_short_circuits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(BINARY_NAME);
        fs::write(&path, b"not really ffmpeg").expect("write failed");

        let found = ensure_encoder(dir.path()).expect("ensure failed");
        assert_eq!(found, path);
        // Contents untouched: no download happened.
        assert_eq!(fs::read(&path).expect("read failed"), b"not really ffmpeg");
    }

    #[test]
    fn extraction_finds_nested_binary() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options: zip::write::FileOptions = Default::default();
            writer
                .start_file(format!("ffmpeg-release/bin/{}", BINARY_NAME), options)
                .expect("start_file failed");
            use std::io::Write;
            writer.write_all(b"binary bytes").expect("write failed");
            writer.finish().expect("finish failed");
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join(BINARY_NAME);
        extract_binary(cursor.get_ref(), &target).expect("extract failed");
        assert_eq!(fs::read(&target).expect("read failed"), b"binary bytes");
    }

    #[test]
    fn extraction_without_binary_is_an_error() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options: zip::write::FileOptions = Default::default();
            writer.start_file("readme.txt", options).expect("start_file failed");
            use std::io::Write;
            writer.write_all(b"hello").expect("write failed");
            writer.finish().expect("finish failed");
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join(BINARY_NAME);
        assert!(matches!(
            extract_binary(cursor.get_ref(), &target),
            Err(ReelError::Fetch(_))
        ));
    }
}
