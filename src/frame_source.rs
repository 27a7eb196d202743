use crate::error::{DrumError, DrumResult};
use image::RgbImage;
use log::{error, info};
use std::path::{Path, PathBuf};

/// Supplies video frames, one per poll.
///
/// `None` means the stream ended or failed; either way the run is over.
/// Resolution must stay fixed for the session.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<RgbImage>;

    /// Release the underlying device or files. Called once on every exit path.
    fn close(&mut self) {}
}

/// Replays a directory of still images (PNG/JPEG) in file-name order.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
    size: Option<(u32, u32)>,
}

impl ImageSequence {
    pub fn open(dir: &Path) -> DrumResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|source| DrumError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_frame_file(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DrumError::NoFrames(dir.to_path_buf()));
        }
        info!("Image sequence {:?}: {} frames", dir, paths.len());
        Ok(Self {
            paths,
            next: 0,
            size: None,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Size of the first frame, read from its header.
    pub fn dimensions(&self) -> DrumResult<(u32, u32)> {
        let path = &self.paths[0];
        image::image_dimensions(path).map_err(|source| DrumError::Image {
            path: path.clone(),
            source,
        })
    }

    fn load(&mut self, path: &Path) -> DrumResult<RgbImage> {
        let img = image::open(path)
            .map_err(|source| DrumError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        let (w, h) = img.dimensions();
        match self.size {
            None => self.size = Some((w, h)),
            Some((want_w, want_h)) if (want_w, want_h) != (w, h) => {
                return Err(DrumError::FrameSize {
                    path: path.to_path_buf(),
                    got_w: w,
                    got_h: h,
                    want_w,
                    want_h,
                });
            }
            Some(_) => {}
        }
        Ok(img)
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Option<RgbImage> {
        let path = self.paths.get(self.next)?.clone();
        self.next += 1;
        match self.load(&path) {
            Ok(img) => Some(img),
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    fn close(&mut self) {
        self.next = self.paths.len();
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stick-drums-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sequence_in_name_order_then_ends() {
        let dir = temp_dir("seq");
        RgbImage::from_pixel(8, 6, Rgb([10, 0, 0]))
            .save(dir.join("frame_002.png"))
            .unwrap();
        RgbImage::from_pixel(8, 6, Rgb([20, 0, 0]))
            .save(dir.join("frame_001.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let mut seq = ImageSequence::open(&dir).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.dimensions().unwrap(), (8, 6));
        assert_eq!(seq.next_frame().unwrap().get_pixel(0, 0), &Rgb([20, 0, 0]));
        assert_eq!(seq.next_frame().unwrap().get_pixel(0, 0), &Rgb([10, 0, 0]));
        assert!(seq.next_frame().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_size_change_ends_stream() {
        let dir = temp_dir("size");
        RgbImage::new(8, 6).save(dir.join("a.png")).unwrap();
        RgbImage::new(4, 4).save(dir.join("b.png")).unwrap();

        let mut seq = ImageSequence::open(&dir).unwrap();
        assert!(seq.next_frame().is_some());
        assert!(seq.next_frame().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_dir_is_error() {
        let dir = temp_dir("empty");
        assert!(matches!(ImageSequence::open(&dir), Err(DrumError::NoFrames(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
