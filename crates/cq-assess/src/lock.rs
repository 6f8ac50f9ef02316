use std::rc::{Rc, Weak};

use tracing::debug;

/// Single "one active assessment" slot. Holders are tracked weakly, so a
/// holder the world dropped stops blocking the slot.
#[derive(Debug)]
pub struct ExclusivityLock<T: ?Sized> {
    holder: Option<Weak<T>>,
}

impl<T: ?Sized> Default for ExclusivityLock<T> {
    fn default() -> Self {
        Self { holder: None }
    }
}

impl<T: ?Sized> ExclusivityLock<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&mut self, holder: &Rc<T>) -> bool {
        if let Some(current) = self.holder.as_ref() {
            if current.strong_count() > 0 && !Weak::ptr_eq(current, &Rc::downgrade(holder)) {
                debug!("assessment slot already held");
                return false;
            }
        }
        self.holder = Some(Rc::downgrade(holder));
        true
    }

    pub fn release(&mut self, holder: &Rc<T>) -> bool {
        if self.is_held_by(holder) {
            self.holder = None;
            return true;
        }
        false
    }

    pub fn is_held_by(&self, holder: &Rc<T>) -> bool {
        self.holder
            .as_ref()
            .map(|current| Weak::ptr_eq(current, &Rc::downgrade(holder)))
            .unwrap_or(false)
    }

    /// True while a still-valid holder owns the slot.
    pub fn is_held(&self) -> bool {
        self.holder
            .as_ref()
            .map(|current| current.strong_count() > 0)
            .unwrap_or(false)
    }

    pub fn holder(&self) -> Option<Rc<T>> {
        self.holder.as_ref().and_then(Weak::upgrade)
    }
}
