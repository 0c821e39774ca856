use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ConvertError;

/// Drapeau d'annulation partagé entre l'appelant et la conversion.
///
/// Clone is cheap; every clone observes the same flag. The conversion
/// polls it between frames.
///
/// # Example
/// ```
/// use af_core::cancel::CancelToken;
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(token.check().is_ok());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Token non déclenché.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Demande l'arrêt de la conversion en cours.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `true` une fois `cancel()` appelé sur n'importe quel clone.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` if the token has been tripped.
    ///
    /// # Errors
    /// Returns [`ConvertError::Cancelled`] after `cancel()`.
    #[inline]
    pub fn check(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }
}
