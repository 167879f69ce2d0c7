//! Interpolation context: the host that `{{key}}` templates resolve against.
//!
//! The stack is thread-local. [`push`] returns a guard that pops on drop, so
//! the entry is removed even when evaluation returns early or panics.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::host::Host;

thread_local! {
    static STACK: RefCell<Vec<Arc<Host>>> = const { RefCell::new(Vec::new()) };
}

/// Pops its host from the context stack when dropped.
#[derive(Debug)]
#[must_use = "the host is popped as soon as the guard is dropped"]
pub struct ContextGuard {
    // Tied to the thread whose stack it pops.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub fn push(host: Arc<Host>) -> ContextGuard {
    STACK.with(|stack| stack.borrow_mut().push(host));
    ContextGuard {
        _not_send: PhantomData,
    }
}

/// The innermost host, if any.
pub fn current() -> Option<Arc<Host>> {
    STACK.with(|stack| stack.borrow().last().cloned())
}

pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}
