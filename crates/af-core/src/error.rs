use thiserror::Error;

/// Errors surfaced by every stage of a conversion.
///
/// A conversion aborts on the first error; nothing is retried or skipped.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Missing or unreadable source, zero-dimension image.
    #[error("Entrée invalide : {0}")]
    InvalidInput(String),

    /// Non-positive width, cell size, bucket width or fps; empty palette.
    #[error("Configuration invalide : {0}")]
    InvalidConfig(String),

    /// A frame does not match the dimensions of the first frame of its sequence.
    #[error(
        "Dimensions incohérentes pour la frame {index} : {width}×{height}, attendu {expected_width}×{expected_height}"
    )]
    DimensionMismatch {
        /// Position of the rejected frame in the sequence.
        index: usize,
        /// Width of the rejected frame.
        width: u32,
        /// Height of the rejected frame.
        height: u32,
        /// Width of the first accepted frame.
        expected_width: u32,
        /// Height of the first accepted frame.
        expected_height: u32,
    },

    /// Finalize was requested before any frame was collected.
    #[error("Séquence vide : aucune frame à encoder")]
    EmptySequence,

    /// Decode, encode or mux collaborator failure.
    #[error("Erreur codec : {0}")]
    Codec(String),

    /// The caller tripped the cancel token.
    #[error("Conversion annulée")]
    Cancelled,
}

impl ConvertError {
    /// Wrap a collaborator error with a short context.
    ///
    /// # Example
    /// ```
    /// use af_core::error::ConvertError;
    /// let err = ConvertError::codec("écriture PNG", "disk full");
    /// assert_eq!(err.to_string(), "Erreur codec : écriture PNG: disk full");
    /// ```
    #[must_use]
    pub fn codec(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Codec(format!("{context}: {err}"))
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(err: std::io::Error) -> Self {
        Self::codec("I/O", err)
    }
}
