use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::{
    DynFrameSource, FrameError, FrameResult, FrameSource, GrayFrame, VideoMetadata, check_index,
};

const BACKEND_NAME: &str = "raw";

/// Headerless stream of packed gray8 frames, e.g. the output of
/// `ffmpeg -pix_fmt gray8 -f rawvideo`.
pub struct RawSource {
    path: PathBuf,
    width: u32,
    height: u32,
    frame_count: usize,
    file: Mutex<File>,
}

impl RawSource {
    pub fn open<P: AsRef<Path>>(path: P, width: u32, height: u32) -> FrameResult<Self> {
        let path = path.as_ref();
        if width == 0 || height == 0 {
            return Err(FrameError::configuration(
                "raw backend requires non-zero frame width and height",
            ));
        }
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let frame_len = width as u64 * height as u64;
        if len % frame_len != 0 {
            return Err(FrameError::backend_failure(
                BACKEND_NAME,
                format!(
                    "{} holds {len} bytes which is not a multiple of {width}x{height}",
                    path.display()
                ),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            frame_count: (len / frame_len) as usize,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for RawSource {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::new(self.width, self.height, self.frame_count)
    }

    fn frame(&self, index: usize) -> FrameResult<GrayFrame> {
        check_index(index, self.frame_count)?;
        let frame_len = self.width as usize * self.height as usize;
        let mut data = vec![0u8; frame_len];
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| FrameError::backend_failure(BACKEND_NAME, "reader lock poisoned"))?;
            file.seek(SeekFrom::Start((index * frame_len) as u64))?;
            file.read_exact(&mut data)?;
        }
        Ok(GrayFrame::from_packed(self.width, self.height, data)?.with_frame_index(Some(index as u64)))
    }
}

pub fn boxed_raw<P: AsRef<Path>>(path: P, width: u32, height: u32) -> FrameResult<DynFrameSource> {
    Ok(Box::new(RawSource::open(path, width, height)?))
}
