//! Shared small types.

/// Extra configuration threaded through the archive constructors.
#[derive(Debug, Clone)]
pub struct ExtraConfig {
    /// Whether [`crate::pak::Pak::create`] and [`crate::pak::Pak::append`]
    /// encrypt `.dat`/`.gr` bodies. Defaults to `true`.
    pub encrypt_by_default: bool,
}

impl Default for ExtraConfig {
    fn default() -> Self {
        ExtraConfig {
            encrypt_by_default: true,
        }
    }
}
