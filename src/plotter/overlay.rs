use eframe::egui::Color32;

/// Opacity of the horizontal marker drawn on the heatmap.
pub const REFERENCE_ALPHA: f32 = 0.35;

/// Horizontal marker on the heatmap at the selected sweep value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub y: f64,
    pub color: Color32,
}

/// The selected row drawn in the spectrum panel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumLine {
    pub label: String,
    pub color: Color32,
    /// Stagger already added to `points`.
    pub offset: f64,
    pub points: Vec<[f64; 2]>,
}

/// One selected row: its heatmap marker and its spectrum, added and removed
/// together.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub key: f64,
    pub row: usize,
    pub reference: ReferenceLine,
    pub spectrum: SpectrumLine,
}

/// Overlays in selection order, at most one per key.
#[derive(Debug, Clone, Default)]
pub struct OverlaySet {
    entries: Vec<Overlay>,
}

impl OverlaySet {
    /// Add an overlay; an existing one with the same key is replaced in place.
    pub fn insert(&mut self, overlay: Overlay) -> Option<Overlay> {
        match self.entries.iter_mut().find(|o| o.key == overlay.key) {
            Some(slot) => Some(std::mem::replace(slot, overlay)),
            None => {
                self.entries.push(overlay);
                None
            }
        }
    }

    /// Key held closest to `value`; ties go to the earlier selection.
    pub fn nearest_key(&self, value: f64) -> Option<f64> {
        self.entries
            .iter()
            .map(|o| o.key)
            .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
    }

    pub fn remove(&mut self, key: f64) -> Option<Overlay> {
        let index = self.entries.iter().position(|o| o.key == key)?;
        Some(self.entries.remove(index))
    }

    pub fn remove_nearest(&mut self, value: f64) -> Option<Overlay> {
        let key = self.nearest_key(value)?;
        self.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<f64> {
        self.entries.iter().map(|o| o.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(key: f64, label: &str) -> Overlay {
        Overlay {
            key,
            row: 0,
            reference: ReferenceLine {
                y: key,
                color: Color32::RED,
            },
            spectrum: SpectrumLine {
                label: label.into(),
                color: Color32::RED,
                offset: 0.0,
                points: vec![[0.0, key]],
            },
        }
    }

    #[test]
    fn test_insert_keeps_order_and_replaces_same_key() {
        let mut set = OverlaySet::default();
        set.insert(overlay(3.0, "a"));
        set.insert(overlay(1.0, "b"));
        let old = set.insert(overlay(3.0, "c"));

        assert_eq!(old.map(|o| o.spectrum.label), Some("a".to_string()));
        assert_eq!(set.keys(), vec![3.0, 1.0]);
        assert_eq!(set.iter().next().unwrap().spectrum.label, "c");
    }

    #[test]
    fn test_remove_nearest() {
        let mut set = OverlaySet::default();
        set.insert(overlay(1.0, "a"));
        set.insert(overlay(2.0, "b"));

        let removed = set.remove_nearest(1.8).unwrap();
        assert_eq!(removed.key, 2.0);
        assert_eq!(set.keys(), vec![1.0]);
    }

    #[test]
    fn test_remove_nearest_on_empty_set() {
        let mut set = OverlaySet::default();
        assert!(set.remove_nearest(1.0).is_none());
        assert!(set.nearest_key(1.0).is_none());
    }
}
