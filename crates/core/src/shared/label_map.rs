use std::collections::HashMap;

use super::detection::Detection;

/// Class id → display name translation.
///
/// Ids without an entry keep their raw numeric label.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelMap {
    names: HashMap<u32, String>,
}

impl LabelMap {
    pub fn new(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn translate(&self, class_id: u32) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn apply(&self, detection: &Detection) -> Detection {
        detection.with_label(self.translate(detection.class_id()))
    }
}

impl FromIterator<(u32, String)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    #[test]
    fn test_translate_known_id() {
        let map: LabelMap = [(0, "face".to_string())].into_iter().collect();
        assert_eq!(map.translate(0), "face");
    }

    #[test]
    fn test_translate_unknown_id_falls_back_to_raw() {
        let map: LabelMap = [(0, "face".to_string())].into_iter().collect();
        assert_eq!(map.translate(7), "7");
    }

    #[test]
    fn test_empty_map_passes_ids_through() {
        let map = LabelMap::default();
        assert!(map.is_empty());
        assert_eq!(map.translate(2), "2");
    }

    #[test]
    fn test_apply_relabels_detection() {
        let map: LabelMap = [(1, "лицо".to_string())].into_iter().collect();
        let d = Detection::new(BoundingBox::new(1, 2, 3, 4), 1, 0.9);
        let labelled = map.apply(&d);
        assert_eq!(labelled.label(), "лицо");
        assert_eq!(labelled.class_id(), 1);
    }
}
