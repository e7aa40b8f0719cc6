use std::fmt;

/// Routing key `(scene_id, category)` — the unit of tracker isolation.
/// `scene_id` is currently fixed by the service (single-scene deployment)
/// but the model supports multiple scenes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub scene_id: String,
    pub category: String,
}

impl Scope {
    pub fn new(scene_id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            category: category.into(),
        }
    }

    /// A sentinel is an in-band shutdown chunk: it carries an empty
    /// `scene_id` and is never produced by real detections (camera-data
    /// payloads always carry a non-empty scene/camera identity upstream).
    pub fn sentinel() -> Self {
        Self {
            scene_id: String::new(),
            category: String::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.scene_id.is_empty()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scene_id, self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_and_hashing_over_both_fields() {
        let a = Scope::new("scene1", "person");
        let b = Scope::new("scene1", "person");
        let c = Scope::new("scene1", "vehicle");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn sentinel_has_empty_scene_id() {
        let sentinel = Scope::sentinel();
        assert!(sentinel.is_sentinel());
        assert!(!Scope::new("scene1", "person").is_sentinel());
    }
}
