use super::shell::ShellId;

slotmap::new_key_type! {
    /// Identity of a solid; also the object identity used by the mesh cache.
    pub struct SolidId;
}

/// A bounded volume enclosed by one outer shell and optional void shells.
#[derive(Debug, Clone)]
pub struct SolidData {
    /// The outer shell of the solid.
    pub outer_shell: ShellId,
    /// Inner shells representing voids within the solid.
    pub inner_shells: Vec<ShellId>,
}

impl SolidData {
    /// All shells, outer first.
    pub fn shells(&self) -> impl Iterator<Item = ShellId> + '_ {
        std::iter::once(self.outer_shell).chain(self.inner_shells.iter().copied())
    }
}
