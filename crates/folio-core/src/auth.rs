//! Request-scoped authorization
//!
//! The store never looks at sessions. A caller asks its [`SessionGate`] once
//! per request and hands the resulting [`Capability`] to every store call.

use crate::error::{StoreError, StoreResult};

/// Answers whether the current caller is authenticated
pub trait SessionGate {
    fn is_authenticated(&self) -> bool;
}

impl SessionGate for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

/// Proof that the session gate admitted this request
#[derive(Debug)]
pub struct Capability {
    _private: (),
}

impl Capability {
    /// Ask `gate` for access
    pub fn grant(gate: &dyn SessionGate) -> StoreResult<Self> {
        if gate.is_authenticated() {
            Ok(Self { _private: () })
        } else {
            Err(StoreError::Unauthorized)
        }
    }
}
