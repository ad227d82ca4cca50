//! Save-slot model.
//!
//! A slot is an independently tracked save-game with a fixed 4-name related
//! file set. The game writes all four names on save; the primary file is the
//! one whose modification time drives change detection.

/// Number of save slots the game exposes.
pub const SLOT_COUNT: u32 = 5;

/// An independently tracked save slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    name: String,
}

impl Slot {
    /// Create a slot from its directory-safe name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The game's numbered slot naming scheme, `SaveSlot_1` onward.
    pub fn numbered(index: u32) -> Self {
        Self::new(format!("SaveSlot_{index}"))
    }

    /// The full fixed slot set.
    pub fn all() -> Vec<Slot> {
        (1..=SLOT_COUNT).map(Self::numbered).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name of the primary save, whose mtime drives detection.
    pub fn primary_file(&self) -> String {
        format!("{}.sav", self.name)
    }

    /// The complete related file set written by the game on each save.
    pub fn related_files(&self) -> [String; 4] {
        [
            format!("{}.sav", self.name),
            format!("{}_backup.sav", self.name),
            format!("{}_header.sav", self.name),
            format!("{}_header_backup.sav", self.name),
        ]
    }
}
