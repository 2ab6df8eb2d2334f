use std::{
    collections::HashMap,
    io::{Cursor, Write},
    path::Path,
};

use tokio::fs;
use tracing::info;
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::{error::PackageError, format::format_time, types::CapturedFrame};

/// `frame_MM-SS_mmm.jpg`, with an `HH-` prefix past the first hour.
pub fn frame_file_name(timestamp: f64) -> String {
    let time = format_time(timestamp, true).replace(':', "-").replace('.', "_");
    format!("frame_{}.jpg", time)
}

/// Zip the decoded images of `frames`, one entry per frame named by timestamp.
///
/// Returns `None` when there is nothing to package.
pub fn package_frames(frames: &[CapturedFrame]) -> Result<Option<Vec<u8>>, PackageError> {
    if frames.is_empty() {
        return Ok(None);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for frame in frames {
        let image = frame.image().ok_or(PackageError::InvalidFrameData {
            timestamp: frame.timestamp,
        })?;

        let name = frame_file_name(frame.timestamp);
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        let name = match *count {
            1 => name,
            n => format!("{}_{}.jpg", name.trim_end_matches(".jpg"), n),
        };

        zip.start_file(name, options)?;
        zip.write_all(&image.data)?;
    }

    let bytes = zip.finish()?.into_inner();
    info!(entries = frames.len(), bytes = bytes.len(), "Frames packaged");
    Ok(Some(bytes))
}

pub async fn write_archive(path: &Path, bytes: &[u8]) -> Result<(), PackageError> {
    let wrap = |source: std::io::Error| PackageError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    fs::write(path, bytes).await.map_err(wrap)?;
    Ok(())
}
