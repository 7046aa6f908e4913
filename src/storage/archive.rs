use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::Path;

/// Decompress one `.gz` archive into its text form, replacing any existing
/// destination file.
pub fn unpack_gz(src: &Path, dest: &Path) -> Result<()> {
    if !src.exists() {
        bail!("Archive not found: {}", src.display());
    }
    let file = File::open(src)
        .with_context(|| format!("Failed to open archive {}", src.display()))?;
    let mut decoder = GzDecoder::new(file);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create folder {}", parent.display()))?;
    }
    let mut out = File::create(dest)
        .with_context(|| format!("Failed to create output file {}", dest.display()))?;
    io::copy(&mut decoder, &mut out)
        .with_context(|| format!("Failed to decompress {}", src.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_unpack_gz_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("titles.csv.gz");
        let dest = dir.path().join("titles.csv");

        let mut encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
        encoder.write_all(b"tconst,title\ntt1,Example\n").unwrap();
        encoder.finish().unwrap();

        unpack_gz(&archive, &dest).unwrap();
        let content = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(content, "tconst,title\ntt1,Example\n");
    }

    #[test]
    fn test_unpack_gz_missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_gz(&dir.path().join("absent.gz"), &dir.path().join("out.csv")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
