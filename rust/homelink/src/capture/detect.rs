use super::camera::Frame;
use super::Sensitivity;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// 128-dimensional face descriptor, the unit of comparison for the
/// known-face store.
pub type FaceEncoding = Vec<f64>;

pub const ENCODING_LEN: usize = 128;

/// Face-detection step run against the last captured frame. Returns one
/// encoding per detected face; an empty vector means no face geometry was
/// found at all.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame, sensitivity: Sensitivity) -> Result<Vec<FaceEncoding>>;
    fn get_type(&self) -> String;
}

pub trait DetectorFactory: Send + Sync {
    fn create(&self) -> Box<dyn FaceDetector>;
}

/// Luma-variance heuristic: a near-uniform frame (the synthetic camera's
/// blank output) carries no face; a textured frame yields one
/// histogram-derived encoding. Real deployments plug a model-backed
/// detector in at the same seam.
pub struct LumaVarianceDetector;

impl LumaVarianceDetector {
    fn variance_threshold(sensitivity: Sensitivity) -> f64 {
        match sensitivity {
            Sensitivity::Low => 900.0,
            Sensitivity::Medium => 400.0,
            Sensitivity::High => 100.0,
        }
    }
}

impl FaceDetector for LumaVarianceDetector {
    fn detect(&self, frame: &Frame, sensitivity: Sensitivity) -> Result<Vec<FaceEncoding>> {
        if frame.pixels.is_empty() {
            return Ok(Vec::new());
        }
        if luma_variance(frame) < Self::variance_threshold(sensitivity) {
            return Ok(Vec::new());
        }
        Ok(vec![histogram_encoding(frame)])
    }

    fn get_type(&self) -> String {
        "luma".to_string()
    }
}

pub struct LumaVarianceDetectorFactory;

impl DetectorFactory for LumaVarianceDetectorFactory {
    fn create(&self) -> Box<dyn FaceDetector> {
        Box::new(LumaVarianceDetector)
    }
}

pub struct DetectorRegistry {
    factories: HashMap<String, Arc<dyn DetectorFactory>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register_default_detectors();
        registry
    }

    fn register_default_detectors(&mut self) {
        self.register_detector("luma", Arc::new(LumaVarianceDetectorFactory));
    }

    pub fn register_detector(&mut self, detector_type: &str, factory: Arc<dyn DetectorFactory>) {
        self.factories.insert(detector_type.to_string(), factory);
    }

    pub fn create_detector(&self, detector_type: &str) -> Option<Box<dyn FaceDetector>> {
        self.factories
            .get(detector_type)
            .map(|factory| factory.create())
    }
}

fn luma_variance(frame: &Frame) -> f64 {
    let n = frame.pixels.len() as f64;
    let mean = frame.pixels.iter().map(|&p| p as f64).sum::<f64>() / n;
    frame
        .pixels
        .iter()
        .map(|&p| {
            let d = p as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

fn histogram_encoding(frame: &Frame) -> FaceEncoding {
    let mut bins = vec![0.0f64; ENCODING_LEN];
    for &p in &frame.pixels {
        bins[(p / 2) as usize] += 1.0;
    }
    let total = frame.pixels.len() as f64;
    for bin in &mut bins {
        *bin /= total;
    }
    bins
}
