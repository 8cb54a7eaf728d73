use super::detect::FaceEncoding;
use crate::error::{HomelinkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Distance at or below which a detected encoding counts as matching a
/// known one.
pub const MATCH_TOLERANCE: f64 = 0.6;

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const NO_FACE_LABEL: &str = "No Face Detected";

/// Known-face encodings loaded once at startup. `names[i]` labels
/// `encodings[i]`; the same name may appear many times (several reference
/// images per person), which is what the match-count vote leans on.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KnownFaces {
    pub names: Vec<String>,
    pub encodings: Vec<FaceEncoding>,
}

impl KnownFaces {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let faces: KnownFaces = serde_json::from_str(&data)?;
        if faces.names.len() != faces.encodings.len() {
            return Err(HomelinkError::Other(format!(
                "known-face store mismatch: {} names vs {} encodings",
                faces.names.len(),
                faces.encodings.len()
            )));
        }
        Ok(faces)
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Nearest-match-by-count vote over the detected encodings. Per face:
    /// every known encoding within tolerance contributes one count to its
    /// name, and the most frequent name wins; a face with no matches reads
    /// as [`UNKNOWN_LABEL`]. The last face examined determines the final
    /// label. No detected faces at all reads as [`NO_FACE_LABEL`],
    /// distinct from an unrecognized face.
    pub fn identify(&self, detected: &[FaceEncoding]) -> String {
        if detected.is_empty() {
            return NO_FACE_LABEL.to_string();
        }

        let mut recognized = UNKNOWN_LABEL.to_string();
        for encoding in detected {
            let matched: Vec<usize> = self
                .encodings
                .iter()
                .enumerate()
                .filter(|(_, known)| distance(known, encoding) <= MATCH_TOLERANCE)
                .map(|(i, _)| i)
                .collect();

            recognized = if matched.is_empty() {
                UNKNOWN_LABEL.to_string()
            } else {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for i in matched {
                    *counts.entry(self.names[i].as_str()).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|(_, count)| *count)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
            };
        }
        recognized
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::MAX;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> KnownFaces {
        KnownFaces {
            names: vec![
                "alice".to_string(),
                "alice".to_string(),
                "bob".to_string(),
            ],
            encodings: vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![5.0, 5.0]],
        }
    }

    #[test]
    fn test_vote_picks_most_frequent_match() {
        // Close to both alice encodings and far from bob.
        let result = store().identify(&[vec![0.05, 0.0]]);
        assert_eq!(result, "alice");
    }

    #[test]
    fn test_no_match_is_unknown() {
        let result = store().identify(&[vec![100.0, 100.0]]);
        assert_eq!(result, UNKNOWN_LABEL);
    }

    #[test]
    fn test_no_face_is_distinct_from_unknown() {
        let result = store().identify(&[]);
        assert_eq!(result, NO_FACE_LABEL);
        assert_ne!(NO_FACE_LABEL, UNKNOWN_LABEL);
    }

    #[test]
    fn test_last_face_wins() {
        let result = store().identify(&[vec![0.0, 0.0], vec![5.0, 5.0]]);
        assert_eq!(result, "bob");
    }

    #[test]
    fn test_load_rejects_mismatched_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.json");
        std::fs::write(&path, r#"{"names":["alice"],"encodings":[]}"#).unwrap();
        assert!(KnownFaces::load(&path).is_err());

        std::fs::write(&path, r#"{"names":["alice"],"encodings":[[0.0,0.0]]}"#).unwrap();
        let faces = KnownFaces::load(&path).unwrap();
        assert!(!faces.is_empty());
        assert_eq!(faces.names[0], "alice");
    }
}
