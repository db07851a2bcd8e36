//! Wire constants and tag tables.
//!
//! Version history:
//! - 3: pool only; surfaces carry pan but no zoom.
//! - 4: surfaces carry zoom.
//! - 5: model roots carry a `has_history` flag and the undo/redo stacks.

use modgraph_types::{ActionType, ControlKind, EntityType, PortalKind, SurfaceKind, ValueType};

use super::LoadError;

pub const PROJECT_MAGIC: u32 = 0xA1B2_C3D4;
pub const LIBRARY_MAGIC: u32 = 0xF1B2_C3D4;

pub const MIN_SCHEMA_VERSION: u32 = 3;
pub const SCHEMA_VERSION: u32 = 5;

pub fn has_surface_zoom(version: u32) -> bool {
    version >= 4
}

pub fn has_history(version: u32) -> bool {
    version >= 5
}

/// Which kind of file a magic number announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Project,
    Library,
}

impl FileKind {
    pub fn magic(self) -> u32 {
        match self {
            FileKind::Project => PROJECT_MAGIC,
            FileKind::Library => LIBRARY_MAGIC,
        }
    }

    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            PROJECT_MAGIC => Some(FileKind::Project),
            LIBRARY_MAGIC => Some(FileKind::Library),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Project => "project",
            FileKind::Library => "library",
        }
    }
}

// ============================================================================
// Tags. Values are part of the file format; never renumber.
// ============================================================================

pub const NODE_CUSTOM: u8 = 0;
pub const NODE_GROUP: u8 = 1;
pub const NODE_PORTAL: u8 = 2;

fn bad_tag(what: &str, tag: u8) -> LoadError {
    LoadError::Corrupt(format!("unknown {} tag {}", what, tag))
}

pub fn entity_type_tag(ty: EntityType) -> u8 {
    match ty {
        EntityType::Surface => 0,
        EntityType::Node => 1,
        EntityType::Control => 2,
        EntityType::Connection => 3,
    }
}

pub fn entity_type_from_tag(tag: u8) -> Result<EntityType, LoadError> {
    match tag {
        0 => Ok(EntityType::Surface),
        1 => Ok(EntityType::Node),
        2 => Ok(EntityType::Control),
        3 => Ok(EntityType::Connection),
        _ => Err(bad_tag("entity", tag)),
    }
}

pub fn surface_kind_tag(kind: SurfaceKind) -> u8 {
    match kind {
        SurfaceKind::Root => 0,
        SurfaceKind::Group => 1,
    }
}

pub fn surface_kind_from_tag(tag: u8) -> Result<SurfaceKind, LoadError> {
    match tag {
        0 => Ok(SurfaceKind::Root),
        1 => Ok(SurfaceKind::Group),
        _ => Err(bad_tag("surface", tag)),
    }
}

pub fn portal_kind_tag(kind: PortalKind) -> u8 {
    match kind {
        PortalKind::Input => 0,
        PortalKind::Output => 1,
        PortalKind::Automation => 2,
    }
}

pub fn portal_kind_from_tag(tag: u8) -> Result<PortalKind, LoadError> {
    match tag {
        0 => Ok(PortalKind::Input),
        1 => Ok(PortalKind::Output),
        2 => Ok(PortalKind::Automation),
        _ => Err(bad_tag("portal", tag)),
    }
}

pub fn value_type_tag(value: ValueType) -> u8 {
    match value {
        ValueType::Num => 0,
        ValueType::Midi => 1,
    }
}

pub fn value_type_from_tag(tag: u8) -> Result<ValueType, LoadError> {
    match tag {
        0 => Ok(ValueType::Num),
        1 => Ok(ValueType::Midi),
        _ => Err(bad_tag("value type", tag)),
    }
}

pub fn control_kind_tag(kind: ControlKind) -> u8 {
    match kind {
        ControlKind::Num => 0,
        ControlKind::Midi => 1,
        ControlKind::NumExtract => 2,
        ControlKind::MidiExtract => 3,
    }
}

pub fn control_kind_from_tag(tag: u8) -> Result<ControlKind, LoadError> {
    match tag {
        0 => Ok(ControlKind::Num),
        1 => Ok(ControlKind::Midi),
        2 => Ok(ControlKind::NumExtract),
        3 => Ok(ControlKind::MidiExtract),
        _ => Err(bad_tag("control", tag)),
    }
}

pub fn action_type_tag(ty: ActionType) -> u8 {
    match ty {
        ActionType::None => 0,
        ActionType::Composite => 1,
        ActionType::DeleteObject => 2,
        ActionType::CreateCustomNode => 3,
        ActionType::CreateGroupNode => 4,
        ActionType::CreatePortalNode => 5,
        ActionType::CreateConnection => 6,
        ActionType::MoveGridItem => 7,
        ActionType::SizeGridItem => 8,
        ActionType::RenameNode => 9,
    }
}

pub fn action_type_from_tag(tag: u8) -> Result<ActionType, LoadError> {
    match tag {
        0 => Ok(ActionType::None),
        1 => Ok(ActionType::Composite),
        2 => Ok(ActionType::DeleteObject),
        3 => Ok(ActionType::CreateCustomNode),
        4 => Ok(ActionType::CreateGroupNode),
        5 => Ok(ActionType::CreatePortalNode),
        6 => Ok(ActionType::CreateConnection),
        7 => Ok(ActionType::MoveGridItem),
        8 => Ok(ActionType::SizeGridItem),
        9 => Ok(ActionType::RenameNode),
        _ => Err(bad_tag("action", tag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_tags_are_bijective() {
        for tag in 0..=9u8 {
            assert_eq!(action_type_tag(action_type_from_tag(tag).unwrap()), tag);
        }
        assert!(action_type_from_tag(10).is_err());
    }

    #[test]
    fn magic_identifies_file_kind() {
        assert_eq!(FileKind::from_magic(PROJECT_MAGIC), Some(FileKind::Project));
        assert_eq!(FileKind::from_magic(LIBRARY_MAGIC), Some(FileKind::Library));
        assert_eq!(FileKind::from_magic(0), None);
    }

    #[test]
    fn version_features() {
        assert!(!has_surface_zoom(3));
        assert!(has_surface_zoom(4) && !has_history(4));
        assert!(has_history(SCHEMA_VERSION));
    }
}
