//! Program path resolution: a raw binary image, or a ZIP archive holding
//! one (the named entry, or the first file in the archive).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quartz_machines::ProgramImage;

use crate::error::FrontendError;

/// Load the program at `path` into an image based at `load_address`.
pub fn load_program(
    path: &Path,
    entry: Option<&str>,
    load_address: u16,
) -> Result<ProgramImage, FrontendError> {
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let image = if is_zip {
        ProgramImage::new(read_from_zip(path, entry)?, load_address)?
    } else {
        ProgramImage::from_file(path, load_address)?
    };
    log::info!(
        target: "frontend",
        "loaded {} ({} bytes at {:04X}, crc32 {:08X})",
        path.display(),
        image.len(),
        load_address,
        image.crc32()
    );
    Ok(image)
}

fn read_from_zip(path: &Path, entry: Option<&str>) -> Result<Vec<u8>, FrontendError> {
    let file = File::open(path).map_err(|source| FrontendError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    let index = match entry {
        Some(name) => archive
            .index_for_name(name)
            .ok_or_else(|| FrontendError::MissingEntry(name.to_string()))?,
        None => {
            let mut first = None;
            for i in 0..archive.len() {
                // Skip directories
                if !archive.by_index(i)?.is_dir() {
                    first = Some(i);
                    break;
                }
            }
            first.ok_or(FrontendError::EmptyArchive)?
        }
    };

    let mut file = archive.by_index(index)?;
    log::debug!(target: "frontend", "using archive entry {}", file.name());
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data).map_err(|source| FrontendError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(data)
}
