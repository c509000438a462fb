//! Session gate for the local operator

use folio_core::SessionGate;

/// The person running `folio` on a checkout.
///
/// Anyone who can run the binary against the repository can already edit
/// its files directly, so a local operator is always authenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOperator;

impl SessionGate for LocalOperator {
    fn is_authenticated(&self) -> bool {
        true
    }
}
