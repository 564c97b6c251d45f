use std::sync::Once;

use super::bounding_box::BoundingBox;

static OUT_OF_RANGE_CONFIDENCE: Once = Once::new();

/// One model-reported object: where it is, what it is, and how sure the
/// model is about it.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    bbox: BoundingBox,
    class_id: u32,
    label: String,
    confidence: f64,
}

impl Detection {
    /// Creates a detection labelled with its raw class id.
    ///
    /// Confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(bbox: BoundingBox, class_id: u32, confidence: f64) -> Self {
        Self {
            bbox,
            class_id,
            label: class_id.to_string(),
            confidence: sanitize_confidence(confidence),
        }
    }

    /// Returns a copy carrying a different display label.
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Overlay caption, e.g. `"face 0.93"`.
    pub fn caption(&self, show_confidence: bool) -> String {
        if show_confidence {
            format!("{} {:.2}", self.label, self.confidence)
        } else {
            self.label.clone()
        }
    }
}

fn sanitize_confidence(confidence: f64) -> f64 {
    if (0.0..=1.0).contains(&confidence) {
        return confidence;
    }
    OUT_OF_RANGE_CONFIDENCE.call_once(|| {
        log::warn!("detection backend reported confidence {confidence}, expected [0, 1]");
    });
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_uses_class_id_as_label() {
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 3, 0.8);
        assert_eq!(d.label(), "3");
        assert_eq!(d.class_id(), 3);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 0, 1.7);
        assert_relative_eq!(d.confidence(), 1.0);
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 0, -0.2);
        assert_relative_eq!(d.confidence(), 0.0);
    }

    #[test]
    fn test_nan_confidence_becomes_zero() {
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 0, f64::NAN);
        assert_eq!(d.confidence(), 0.0);
    }

    #[test]
    fn test_with_label_leaves_original_untouched() {
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 0, 0.5);
        let labelled = d.with_label("face");
        assert_eq!(d.label(), "0");
        assert_eq!(labelled.label(), "face");
        assert_eq!(labelled.bbox(), d.bbox());
    }

    #[test]
    fn test_caption_formats_confidence_to_two_places() {
        let d = Detection::new(BoundingBox::new(0, 0, 10, 10), 0, 0.934).with_label("face");
        assert_eq!(d.caption(true), "face 0.93");
        assert_eq!(d.caption(false), "face");
    }
}
