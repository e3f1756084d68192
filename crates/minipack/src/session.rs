//! Build session state
//!
//! A build session owns the only mutable state of a build: the counter that
//! hands out module ids. It is threaded by `&mut` through asset extraction and
//! graph construction, so two builds cannot interleave on one session.

use log::trace;

use crate::types::ModuleId;

#[derive(Debug, Default)]
pub struct BuildSession {
    next_id: u32,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id and advance the counter.
    ///
    /// The counter is never rewound on its own; call [`BuildSession::reset`]
    /// before starting an independent build.
    pub fn next_module_id(&mut self) -> ModuleId {
        let id = ModuleId::new(self.next_id);
        self.next_id += 1;
        trace!("Assigned module id {id}");
        id
    }

    /// Id the next extraction will receive
    pub fn peek_next_id(&self) -> ModuleId {
        ModuleId::new(self.next_id)
    }

    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}
