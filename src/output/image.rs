use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, GrayImage, ImageEncoder};
use tokio::{fs, task};

use super::OutputError;

/// Writes 8-bit grayscale diagnostics as PNG files into one directory.
pub struct ImageDump {
    directory: PathBuf,
}

impl ImageDump {
    pub async fn create(directory: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Encodes `image` to `<name>.png` and returns the written path.
    pub async fn write(&self, name: &str, image: &GrayImage) -> Result<PathBuf, OutputError> {
        let (width, height) = image.dimensions();
        let raw = image.as_raw().clone();
        let encoded = task::spawn_blocking(move || -> Result<Vec<u8>, OutputError> {
            let mut encoded = Vec::new();
            PngEncoder::new(&mut encoded).write_image(&raw, width, height, ColorType::L8)?;
            Ok(encoded)
        })
        .await
        .map_err(|err| {
            OutputError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("join error: {err}"),
            ))
        })??;

        let path = self.directory.join(format!("{name}.png"));
        fs::write(&path, encoded).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn png_files_decode_to_the_same_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let dump = ImageDump::create(dir.path().join("dump")).await.unwrap();
        let gradient = GrayImage::from_fn(8, 4, |x, y| image::Luma([(x * 10 + y) as u8]));
        let path = dump.write("background", &gradient).await.unwrap();

        assert_eq!(path, dir.path().join("dump").join("background.png"));
        let decoded = image::open(&path).unwrap().to_luma8();
        assert_eq!(decoded, gradient);
    }
}
