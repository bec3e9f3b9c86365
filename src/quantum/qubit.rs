use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::registry::{self, StateRegistry};
use super::state::{SharedState, StateId};

struct QubitSlot {
    id: RefCell<Option<String>>,
    index: Cell<usize>,
    state: RefCell<SharedState>,
    // cached so the registry never has to borrow the state
    state_id: Cell<StateId>,
}

impl Drop for QubitSlot {
    fn drop(&mut self) {
        registry::release(self.state_id.get());
    }
}

/// Handle to one qubit: a position inside a shared quantum state.
///
/// Clones refer to the same qubit. Two handles pointing at one state at
/// different indices are entangled.
#[derive(Clone)]
pub struct Qubit(Rc<QubitSlot>);

/// Non-owning reference kept by the registry
#[derive(Clone)]
pub struct WeakQubit(Weak<QubitSlot>);

impl Qubit {
    /// Creates a handle at `index` of `state` and registers it
    pub fn attach(state: SharedState, index: usize) -> Self {
        let state_id = state.borrow().id();
        let qubit = Qubit(Rc::new(QubitSlot {
            id: RefCell::new(None),
            index: Cell::new(index),
            state: RefCell::new(state),
            state_id: Cell::new(state_id),
        }));
        StateRegistry::with(|registry| registry.register(&qubit));
        qubit
    }

    pub fn id(&self) -> Option<String> {
        self.0.id.borrow().clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        *self.0.id.borrow_mut() = Some(id.into());
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.0.id.borrow().as_deref() == Some(id)
    }

    pub fn index(&self) -> usize {
        self.0.index.get()
    }

    pub fn state(&self) -> SharedState {
        Rc::clone(&self.0.state.borrow())
    }

    pub fn state_id(&self) -> StateId {
        self.0.state_id.get()
    }

    /// Repoints the qubit, keeping `registry` in step.
    ///
    /// Callers batch every repoint of one merge or collapse inside a single
    /// [`StateRegistry::with`].
    pub(crate) fn relocate_in(&self, registry: &mut StateRegistry, state: SharedState, index: usize) {
        registry.unregister(self);
        self.0.state_id.set(state.borrow().id());
        *self.0.state.borrow_mut() = state;
        self.0.index.set(index);
        registry.register(self);
    }

    pub fn downgrade(&self) -> WeakQubit {
        WeakQubit(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Qubit) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Qubit {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Qubit {}

impl Hash for Qubit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Qubit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Qubit")
            .field("id", &self.0.id.borrow())
            .field("index", &self.index())
            .field("state", &self.state_id())
            .finish()
    }
}

impl WeakQubit {
    pub fn upgrade(&self) -> Option<Qubit> {
        self.0.upgrade().map(Qubit)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn points_to(&self, qubit: &Qubit) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&qubit.0))
    }
}
