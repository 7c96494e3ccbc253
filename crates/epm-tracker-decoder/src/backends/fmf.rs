//! FlyMovieFormat reader (versions 1 and 3, MONO8 only).
//!
//! Layout: a little-endian header followed by fixed-size chunks, each an
//! `f64` timestamp and one frame of `width * height` bytes.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{
    DynFrameSource, FrameError, FrameResult, FrameSource, GrayFrame, VideoMetadata, check_index,
};

const BACKEND_NAME: &str = "fmf";
const TIMESTAMP_LEN: u64 = 8;
const MAX_FORMAT_LEN: u32 = 255;

#[derive(Debug, Clone, PartialEq)]
pub struct FmfHeader {
    pub version: u32,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub bytes_per_chunk: u64,
    pub header_len: u64,
    pub frame_count: u64,
}

impl FmfHeader {
    /// Parses the header and resolves the frame count from the file size when
    /// the writer left it at zero.
    pub fn read<R: Read>(reader: &mut R, file_len: u64) -> FrameResult<Self> {
        let version = read_u32(reader)?;
        let (format, header_prefix) = match version {
            1 => ("MONO8".to_string(), 4u64),
            3 => {
                let format_len = read_u32(reader)?;
                if format_len > MAX_FORMAT_LEN {
                    return Err(FrameError::backend_failure(
                        BACKEND_NAME,
                        format!("format name length {format_len} exceeds {MAX_FORMAT_LEN} bytes"),
                    ));
                }
                let mut raw = vec![0u8; format_len as usize];
                reader.read_exact(&mut raw)?;
                let format = String::from_utf8_lossy(&raw).into_owned();
                let bits_per_pixel = read_u32(reader)?;
                if bits_per_pixel != 8 {
                    return Err(FrameError::backend_failure(
                        BACKEND_NAME,
                        format!("unsupported bits per pixel {bits_per_pixel}"),
                    ));
                }
                (format, 4 + 4 + format_len as u64 + 4)
            }
            other => {
                return Err(FrameError::backend_failure(
                    BACKEND_NAME,
                    format!("unsupported FMF version {other}"),
                ));
            }
        };
        if format != "MONO8" {
            return Err(FrameError::backend_failure(
                BACKEND_NAME,
                format!("unsupported pixel format {format}"),
            ));
        }
        let height = read_u32(reader)?;
        let width = read_u32(reader)?;
        let bytes_per_chunk = read_u64(reader)?;
        let stored_frames = read_u64(reader)?;
        let header_len = header_prefix + 4 + 4 + 8 + 8;

        let expected_chunk = width as u64 * height as u64 + TIMESTAMP_LEN;
        if bytes_per_chunk != expected_chunk {
            return Err(FrameError::backend_failure(
                BACKEND_NAME,
                format!("chunk size {bytes_per_chunk} does not match {width}x{height} frames"),
            ));
        }
        let available = file_len.saturating_sub(header_len) / bytes_per_chunk;
        let frame_count = if stored_frames == 0 {
            available
        } else {
            stored_frames.min(available)
        };

        Ok(Self {
            version,
            format,
            width,
            height,
            bytes_per_chunk,
            header_len,
            frame_count,
        })
    }
}

pub struct FmfSource {
    path: PathBuf,
    header: FmfHeader,
    reader: Mutex<BufReader<File>>,
}

impl FmfSource {
    pub fn open<P: AsRef<Path>>(path: P) -> FrameResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let header = FmfHeader::read(&mut reader, file_len)?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            reader: Mutex::new(reader),
        })
    }

    pub fn header(&self) -> &FmfHeader {
        &self.header
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for FmfSource {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::new(
            self.header.width,
            self.header.height,
            self.header.frame_count as usize,
        )
    }

    fn frame(&self, index: usize) -> FrameResult<GrayFrame> {
        check_index(index, self.header.frame_count as usize)?;
        let offset = self.header.header_len + index as u64 * self.header.bytes_per_chunk;
        let mut data = vec![0u8; (self.header.bytes_per_chunk - TIMESTAMP_LEN) as usize];
        let timestamp = {
            let mut reader = self
                .reader
                .lock()
                .map_err(|_| FrameError::backend_failure(BACKEND_NAME, "reader lock poisoned"))?;
            reader.seek(SeekFrom::Start(offset))?;
            let mut raw = [0u8; TIMESTAMP_LEN as usize];
            reader.read_exact(&mut raw)?;
            reader.read_exact(&mut data)?;
            f64::from_le_bytes(raw)
        };
        let timestamp = (timestamp.is_finite() && timestamp >= 0.0)
            .then(|| Duration::from_secs_f64(timestamp));
        Ok(GrayFrame::from_packed(self.header.width, self.header.height, data)?
            .with_timestamp(timestamp)
            .with_frame_index(Some(index as u64)))
    }
}

pub fn boxed_fmf<P: AsRef<Path>>(path: P) -> FrameResult<DynFrameSource> {
    Ok(Box::new(FmfSource::open(path)?))
}

fn read_u32<R: Read>(reader: &mut R) -> FrameResult<u32> {
    let mut raw = [0u8; 4];
    reader.read_exact(&mut raw)?;
    Ok(u32::from_le_bytes(raw))
}

fn read_u64<R: Read>(reader: &mut R) -> FrameResult<u64> {
    let mut raw = [0u8; 8];
    reader.read_exact(&mut raw)?;
    Ok(u64::from_le_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_v3(frames: &[(f64, Vec<u8>)], width: u32, height: u32, stored: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(3u32.to_le_bytes());
        bytes.extend(5u32.to_le_bytes());
        bytes.extend(b"MONO8");
        bytes.extend(8u32.to_le_bytes());
        bytes.extend(height.to_le_bytes());
        bytes.extend(width.to_le_bytes());
        bytes.extend((width as u64 * height as u64 + 8).to_le_bytes());
        bytes.extend(stored.to_le_bytes());
        for (timestamp, data) in frames {
            bytes.extend(timestamp.to_le_bytes());
            bytes.extend(data);
        }
        bytes
    }

    #[test]
    fn version_three_frames_and_timestamps_are_read() {
        let frames = vec![(0.0, vec![10u8; 6]), (0.5, vec![20u8; 6])];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&write_v3(&frames, 3, 2, 2)).unwrap();

        let source = FmfSource::open(file.path()).unwrap();
        assert_eq!(source.header().version, 3);
        assert_eq!(source.frame_count(), 2);
        let frame = source.frame(1).unwrap();
        assert_eq!(frame.data(), &[20; 6]);
        assert_eq!(frame.timestamp(), Some(Duration::from_millis(500)));
        assert!(source.frame(2).is_err());
    }

    #[test]
    fn unfinalized_files_count_frames_from_size() {
        let frames = vec![(0.0, vec![1u8; 4]); 3];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&write_v3(&frames, 2, 2, 0)).unwrap();
        let source = FmfSource::open(file.path()).unwrap();
        assert_eq!(source.frame_count(), 3);
    }

    #[test]
    fn version_one_header_is_supported() {
        let mut bytes = Vec::new();
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(2u32.to_le_bytes());
        bytes.extend(10u64.to_le_bytes());
        bytes.extend(1u64.to_le_bytes());
        bytes.extend(0.25f64.to_le_bytes());
        bytes.extend([7u8, 8]);
        let header = FmfHeader::read(&mut bytes.as_slice(), bytes.len() as u64).unwrap();
        assert_eq!(header.width, 2);
        assert_eq!(header.height, 1);
        assert_eq!(header.header_len, 28);
        assert_eq!(header.frame_count, 1);
    }

    #[test]
    fn oversized_format_length_is_rejected_before_reading() {
        let mut bytes = Vec::new();
        bytes.extend(3u32.to_le_bytes());
        bytes.extend(u32::MAX.to_le_bytes());
        bytes.extend(b"MONO8");
        let err = FmfHeader::read(&mut bytes.as_slice(), bytes.len() as u64).unwrap_err();
        assert!(matches!(err, FrameError::BackendFailure { .. }));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let bytes = 9u32.to_le_bytes();
        assert!(FmfHeader::read(&mut bytes.as_slice(), 4).is_err());
    }
}
