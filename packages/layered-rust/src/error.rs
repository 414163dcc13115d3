//! Construction errors for layered storage.

/// Wiring mistakes detected when a [`LayeredStorage`](crate::LayeredStorage)
/// is built. Raised before any layer is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The layer list was empty.
    #[error("layered storage requires at least one layer")]
    NoLayers,
    /// A layer addresses entries by a different key field than the top layer.
    #[error("layer {layer} uses key field `{found}` but layer 0 uses `{expected}`")]
    KeyFieldMismatch {
        /// Index of the offending layer.
        layer: usize,
        /// Key field name of the top layer.
        expected: String,
        /// Key field name of the offending layer.
        found: String,
    },
}
