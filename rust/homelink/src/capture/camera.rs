use crate::error::{HomelinkError, Result};
use async_trait::async_trait;
use std::path::Path;

/// One captured frame, 8-bit grayscale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    /// Binary PGM (P5) encoding, the persistence format for captured frames.
    pub fn to_pgm(&self) -> Vec<u8> {
        let mut out = format!("P5\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_pgm()).await?;
        Ok(())
    }
}

/// Exclusive-use camera device. `release` must be safe to call in any
/// state; the coordinator calls it unconditionally, including on error
/// paths.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&mut self) -> Result<()>;
    async fn read_frame(&mut self) -> Result<Frame>;
    async fn release(&mut self);
}

/// Stand-in for real capture hardware: deterministic blank frames, with an
/// injectable open failure for exercising the device-unavailable path.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    opened: bool,
    fail_open: bool,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            opened: false,
            fail_open: false,
        }
    }

    pub fn with_open_failure(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Camera for SyntheticCamera {
    async fn open(&mut self) -> Result<()> {
        if self.fail_open {
            return Err(HomelinkError::CameraUnavailable(
                "synthetic camera configured to fail".to_string(),
            ));
        }
        self.opened = true;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        if !self.opened {
            return Err(HomelinkError::CameraUnavailable(
                "camera not opened".to_string(),
            ));
        }
        Ok(Frame::blank(self.width, self.height))
    }

    async fn release(&mut self) {
        self.opened = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_camera_lifecycle() {
        let mut camera = SyntheticCamera::new();
        assert!(camera.read_frame().await.is_err());

        camera.open().await.unwrap();
        let frame = camera.read_frame().await.unwrap();
        assert_eq!(frame.pixels.len(), 640 * 480);

        camera.release().await;
        assert!(camera.read_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_open_failure_injection() {
        let mut camera = SyntheticCamera::new().with_open_failure();
        match camera.open().await {
            Err(HomelinkError::CameraUnavailable(_)) => {}
            other => panic!("expected CameraUnavailable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_pgm_encoding() {
        let frame = Frame::blank(2, 2);
        let pgm = frame.to_pgm();
        assert!(pgm.starts_with(b"P5\n2 2\n255\n"));
        assert_eq!(pgm.len(), b"P5\n2 2\n255\n".len() + 4);
    }
}
