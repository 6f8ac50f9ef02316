use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use cq_core::Value;
use tracing::{debug, warn};

/// A world object that reacts to named effects. Unknown effect names are
/// ignored by the implementation.
pub trait Mechanism {
    fn apply_effect(&mut self, effect: &str, value: Option<&Value>);
}

pub type MechanismHandle = Rc<RefCell<dyn Mechanism>>;

#[derive(Default)]
pub struct MechanismRegistry {
    entries: HashMap<String, MechanismHandle>,
}

impl MechanismRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration under an id wins. Empty ids are rejected.
    pub fn register(&mut self, id: &str, mechanism: MechanismHandle) -> bool {
        let id = id.trim();
        if id.is_empty() {
            warn!("mechanism registered without an id; ignored");
            return false;
        }
        if self.entries.insert(id.to_string(), mechanism).is_some() {
            debug!(mechanism_id = id, "mechanism replaced");
        }
        true
    }

    pub fn unregister(&mut self, id: &str) -> Option<MechanismHandle> {
        self.entries.remove(id.trim())
    }

    pub fn get(&self, id: &str) -> Option<MechanismHandle> {
        self.entries.get(id.trim()).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns false when nothing was dispatched.
    pub fn apply_effect(&self, id: &str, effect: &str, value: Option<&Value>) -> bool {
        let Some(mechanism) = self.entries.get(id.trim()) else {
            warn!(mechanism_id = id, effect, "mechanism not found");
            return false;
        };
        let Ok(mut mechanism) = mechanism.try_borrow_mut() else {
            warn!(mechanism_id = id, effect, "mechanism busy; effect dropped");
            return false;
        };
        debug!(mechanism_id = id, effect, "applying effect");
        mechanism.apply_effect(effect, value);
        true
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Option<Value>)>,
    }

    impl Mechanism for Recorder {
        fn apply_effect(&mut self, effect: &str, value: Option<&Value>) {
            self.calls.push((effect.to_string(), value.cloned()));
        }
    }

    #[test]
    fn effects_reach_registered_mechanism() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut registry = MechanismRegistry::new();
        assert!(registry.register("platform_1", recorder.clone()));

        assert!(registry.apply_effect("platform_1", "set_pattern", Some(&Value::Number(2.0))));
        assert!(registry.apply_effect("platform_1", "stop", None));

        let recorded = recorder.borrow();
        let calls = &recorded.calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("set_pattern".to_string(), Some(Value::Number(2.0))));
        assert_eq!(calls[1], ("stop".to_string(), None));
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let registry = MechanismRegistry::new();
        assert!(!registry.apply_effect("ghost", "activate", None));
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut registry = MechanismRegistry::new();
        assert!(!registry.register("  ", Rc::new(RefCell::new(Recorder::default()))));
        assert!(registry.is_empty());
    }

    #[test]
    fn last_registration_wins() {
        let first = Rc::new(RefCell::new(Recorder::default()));
        let second = Rc::new(RefCell::new(Recorder::default()));
        let mut registry = MechanismRegistry::new();
        registry.register("door", first.clone());
        registry.register("door", second.clone());
        assert_eq!(registry.len(), 1);

        registry.apply_effect("door", "activate", None);
        assert!(first.borrow().calls.is_empty());
        assert_eq!(second.borrow().calls.len(), 1);
    }

    #[test]
    fn unregister_removes_entry() {
        let mut registry = MechanismRegistry::new();
        registry.register("door", Rc::new(RefCell::new(Recorder::default())));
        assert!(registry.unregister("door").is_some());
        assert!(!registry.contains("door"));
    }
}
