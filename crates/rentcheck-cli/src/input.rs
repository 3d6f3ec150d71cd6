//! Reading document images from disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use rentcheck_ai::ImagePart;

/// MIME type from the file extension. Only formats the vision model accepts.
pub fn mime_for(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "" => bail!("{}: no file extension; expected jpg, png, webp, heic or heif", path.display()),
        other => bail!("{}: unsupported image type .{other}", path.display()),
    };
    Ok(mime)
}

/// Read images in the order given.
pub fn read_images(paths: &[PathBuf]) -> anyhow::Result<Vec<ImagePart>> {
    paths
        .iter()
        .map(|path| {
            let mime = mime_for(path)?;
            let data =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(ImagePart::new(data, mime))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for(Path::new("flyer.JPG")).unwrap(), "image/jpeg");
        assert_eq!(mime_for(Path::new("a/b/estimate.jpeg")).unwrap(), "image/jpeg");
        assert_eq!(mime_for(Path::new("scan.png")).unwrap(), "image/png");
        assert_eq!(mime_for(Path::new("scan.webp")).unwrap(), "image/webp");
        assert_eq!(mime_for(Path::new("IMG_0001.HEIC")).unwrap(), "image/heic");
        assert_eq!(mime_for(Path::new("photo.heif")).unwrap(), "image/heif");
    }

    #[test]
    fn rejects_unknown_types() {
        let err = mime_for(Path::new("estimate.pdf")).unwrap_err();
        assert!(err.to_string().contains("unsupported image type .pdf"));
        assert!(mime_for(Path::new("estimate")).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_images(&[PathBuf::from("/nonexistent/rentcheck/flyer.png")]).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/rentcheck/flyer.png"));
    }
}
