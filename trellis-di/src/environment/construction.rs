//! Per-thread bookkeeping of identifiers under construction, used to detect eager dependency cycles
//! before blocking on an instance cell which the current thread is itself initializing.

use crate::error::ResolutionError;
use crate::identifier::Identifier;
use itertools::Itertools;
use std::cell::RefCell;

thread_local! {
    static UNDER_CONSTRUCTION: RefCell<Vec<(usize, Identifier)>> = RefCell::new(Vec::new());
}

/// Marks an identifier as being constructed by the current thread, until dropped.
pub(super) struct ConstructionGuard {
    environment: usize,
}

impl ConstructionGuard {
    pub(super) fn enter(
        environment: usize,
        identifier: &Identifier,
    ) -> Result<Self, ResolutionError> {
        UNDER_CONSTRUCTION.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack
                .iter()
                .any(|(owner, pending)| *owner == environment && pending == identifier)
            {
                let mut chain = stack
                    .iter()
                    .filter(|(owner, _)| *owner == environment)
                    .map(|(_, pending)| pending)
                    .skip_while(|pending| *pending != identifier)
                    .cloned()
                    .collect_vec();
                chain.push(identifier.clone());

                return Err(ResolutionError::DependencyCycle { chain });
            }

            stack.push((environment, identifier.clone()));
            Ok(Self { environment })
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        UNDER_CONSTRUCTION.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack
                .iter()
                .rposition(|(owner, _)| *owner == self.environment)
            {
                stack.remove(position);
            }
        });
    }
}

/// Returns identifiers of given environment under construction on the current thread, outermost
/// first.
pub(super) fn requesters(environment: usize) -> Vec<Identifier> {
    UNDER_CONSTRUCTION.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter(|(owner, _)| *owner == environment)
            .map(|(_, pending)| pending.clone())
            .collect()
    })
}
