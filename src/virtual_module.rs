//! Virtual module identifiers
//!
//! A virtual module has no file on disk. The host hands out the public name to
//! importers and uses the internal form, prefixed with a NUL marker, once the
//! id is resolved so no other resolver tries to find it on disk.

/// Marker prefixed to resolved virtual ids
pub const VIRTUAL_MARKER: char = '\0';

/// A public/internal pair naming one virtual module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualModuleId {
    public: &'static str,
    internal: &'static str,
}

/// The stylesheet module importers reference as `"tailwind-web-components"`
pub const STYLESHEET_MODULE: VirtualModuleId = VirtualModuleId {
    public: "tailwind-web-components",
    internal: "\0tailwind-web-components",
};

impl VirtualModuleId {
    pub const fn public(&self) -> &'static str {
        self.public
    }

    pub const fn internal(&self) -> &'static str {
        self.internal
    }

    /// Map the public name to the internal one, deferring on anything else
    pub fn resolve(&self, id: &str) -> Option<&'static str> {
        (id == self.public).then_some(self.internal)
    }

    /// Whether `id` is this module's resolved form
    pub fn is_internal(&self, id: &str) -> bool {
        id == self.internal
    }
}
