use std::collections::BTreeSet;
use std::io::Read;

use modgraph_types::{
    Action, ActionType, Connection, Control, Entity, EntityKind, EntityType, GridItem, GridPos,
    GridRect, GridSize, Node, NodeKind, Pool, RemovedEntity, Surface,
};

use super::codec::StreamReader;
use super::schema::{self, FileKind, MIN_SCHEMA_VERSION, SCHEMA_VERSION};
use super::LoadError;
use crate::history::History;
use crate::library::{Library, LibraryEntry};
use crate::model_root::ModelRoot;
use crate::project::Project;

/// Composite actions nested deeper than this are treated as corruption.
const MAX_ACTION_NESTING: usize = 64;

/// Upper bound on up-front allocation for a declared collection length.
const PREALLOC_LIMIT: usize = 4096;

/// Check magic and version before anything else is read.
pub fn read_header<R: Read>(r: &mut StreamReader<R>, expected: FileKind) -> Result<u32, LoadError> {
    let magic = r.read_u32()?;
    if magic != expected.magic() {
        return Err(LoadError::BadMagic {
            expected: expected.magic(),
            found: magic,
        });
    }
    let version = r.read_u32()?;
    check_version(version)?;
    Ok(version)
}

pub fn check_version(version: u32) -> Result<(), LoadError> {
    if !(MIN_SCHEMA_VERSION..=SCHEMA_VERSION).contains(&version) {
        return Err(LoadError::IncompatibleVersion {
            version,
            min: MIN_SCHEMA_VERSION,
            max: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Read a project stream. `read_extra` consumes trailing metadata written by
/// the matching save call; returning a path replaces the stored linked file.
pub fn read_project<R, F>(
    r: &mut StreamReader<R>,
    history_depth: usize,
    read_extra: F,
) -> Result<Project, LoadError>
where
    R: Read,
    F: FnOnce(&mut StreamReader<R>, u32) -> Result<Option<String>, LoadError>,
{
    let version = read_header(r, FileKind::Project)?;
    let linked = r.read_str()?;
    let mut linked_file = (!linked.is_empty()).then_some(linked);
    let root = read_model_root(r, version, history_depth)?;
    let library = read_library_body(r, version)?;
    if let Some(path) = read_extra(r, version)? {
        linked_file = Some(path);
    }
    log::info!(
        target: "persistence",
        "loaded project v{}: {} entities, {} library entries",
        version,
        root.pool().len(),
        library.len()
    );
    Ok(Project::from_parts(root, library, linked_file))
}

pub fn read_library<R: Read>(r: &mut StreamReader<R>) -> Result<Library, LoadError> {
    let version = read_header(r, FileKind::Library)?;
    let library = read_library_body(r, version)?;
    log::info!(target: "persistence", "loaded library v{}: {} entries", version, library.len());
    Ok(library)
}

fn read_library_body<R: Read>(r: &mut StreamReader<R>, version: u32) -> Result<Library, LoadError> {
    let count = r.read_len()?;
    let mut entries = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        entries.push(read_entry(r, version)?);
    }
    Ok(Library::from_entries(entries))
}

pub fn read_entry<R: Read>(r: &mut StreamReader<R>, version: u32) -> Result<LibraryEntry, LoadError> {
    let name = r.read_str()?;
    let base_id = r.read_uuid()?;
    let modification_id = r.read_uuid()?;
    let modification_time = r.read_datetime()?;
    let tag_count = r.read_len()?;
    let mut tags = BTreeSet::new();
    for _ in 0..tag_count {
        tags.insert(r.read_str()?);
    }
    let (pool, history) = read_root_parts(r, version, 1)?;
    if history.is_some() {
        log::debug!(target: "persistence", "dropping stored history of entry '{}'", name);
    }
    Ok(LibraryEntry::from_parts(
        name,
        base_id,
        modification_id,
        modification_time,
        tags,
        pool,
    )?)
}

pub fn read_model_root<R: Read>(
    r: &mut StreamReader<R>,
    version: u32,
    history_depth: usize,
) -> Result<ModelRoot, LoadError> {
    let (pool, history) = read_root_parts(r, version, history_depth)?;
    let history = history.unwrap_or_else(|| History::new(history_depth));
    Ok(ModelRoot::from_parts(pool, history)?)
}

fn read_root_parts<R: Read>(
    r: &mut StreamReader<R>,
    version: u32,
    history_depth: usize,
) -> Result<(Pool, Option<History>), LoadError> {
    let pool = read_pool(r, version)?;
    let history = if schema::has_history(version) && r.read_bool()? {
        Some(read_history(r, version, history_depth)?)
    } else {
        None
    };
    Ok((pool, history))
}

pub fn read_pool<R: Read>(r: &mut StreamReader<R>, version: u32) -> Result<Pool, LoadError> {
    let count = r.read_len()?;
    let mut pool = Pool::new();
    for _ in 0..count {
        pool.register(read_entity(r, version)?)?;
    }
    Ok(pool)
}

fn read_history<R: Read>(
    r: &mut StreamReader<R>,
    version: u32,
    history_depth: usize,
) -> Result<History, LoadError> {
    let undo = read_actions(r, version, 0)?;
    let redo = read_actions(r, version, 0)?;
    Ok(History::from_stacks(undo, redo, history_depth))
}

fn read_actions<R: Read>(
    r: &mut StreamReader<R>,
    version: u32,
    nesting: usize,
) -> Result<Vec<Action>, LoadError> {
    let count = r.read_len()?;
    let mut actions = Vec::with_capacity(count.min(PREALLOC_LIMIT));
    for _ in 0..count {
        actions.push(read_action(r, version, nesting)?);
    }
    Ok(actions)
}

pub fn read_entity<R: Read>(r: &mut StreamReader<R>, version: u32) -> Result<Entity, LoadError> {
    let ty = schema::entity_type_from_tag(r.read_u8()?)?;
    let id = r.read_id()?;
    let parent = r.read_opt_id()?;
    let kind = match ty {
        EntityType::Surface => {
            let mut surface = Surface::new(schema::surface_kind_from_tag(r.read_u8()?)?);
            surface.pan = (r.read_f32()?, r.read_f32()?);
            if schema::has_surface_zoom(version) {
                surface.zoom = r.read_f32()?;
            }
            EntityKind::Surface(surface)
        }
        EntityType::Node => {
            let name = r.read_str()?;
            let grid = read_grid(r)?;
            let kind = match r.read_u8()? {
                schema::NODE_CUSTOM => NodeKind::Custom { code: r.read_str()? },
                schema::NODE_GROUP => NodeKind::Group,
                schema::NODE_PORTAL => NodeKind::Portal {
                    portal: schema::portal_kind_from_tag(r.read_u8()?)?,
                    value: schema::value_type_from_tag(r.read_u8()?)?,
                },
                tag => return Err(LoadError::Corrupt(format!("unknown node tag {}", tag))),
            };
            EntityKind::Node(Node { kind, name, grid })
        }
        EntityType::Control => {
            let kind = schema::control_kind_from_tag(r.read_u8()?)?;
            let name = r.read_str()?;
            let grid = read_grid(r)?;
            EntityKind::Control(Control { kind, name, grid })
        }
        EntityType::Connection => {
            EntityKind::Connection(Connection::new(r.read_id()?, r.read_id()?))
        }
    };
    Ok(Entity::new(id, parent, kind))
}

pub fn read_action<R: Read>(
    r: &mut StreamReader<R>,
    version: u32,
    nesting: usize,
) -> Result<Action, LoadError> {
    if nesting > MAX_ACTION_NESTING {
        return Err(LoadError::Corrupt("composite actions nested too deeply".to_string()));
    }
    let action = match schema::action_type_from_tag(r.read_u8()?)? {
        ActionType::None => Action::None,
        ActionType::Composite => Action::Composite {
            actions: read_actions(r, version, nesting + 1)?,
        },
        ActionType::DeleteObject => {
            let id = r.read_id()?;
            let count = r.read_len()?;
            let mut removed = Vec::with_capacity(count.min(PREALLOC_LIMIT));
            for _ in 0..count {
                let index = r.read_len()?;
                let entity = read_entity(r, version)?;
                removed.push(RemovedEntity { index, entity });
            }
            Action::Delete { id, removed }
        }
        ActionType::CreateCustomNode => Action::CreateCustomNode {
            id: r.read_id()?,
            surface: r.read_id()?,
            pos: read_pos(r)?,
            size: read_size(r)?,
            name: r.read_str()?,
            code: r.read_str()?,
        },
        ActionType::CreateGroupNode => Action::CreateGroupNode {
            id: r.read_id()?,
            inner_surface: r.read_id()?,
            surface: r.read_id()?,
            pos: read_pos(r)?,
            size: read_size(r)?,
            name: r.read_str()?,
        },
        ActionType::CreatePortalNode => Action::CreatePortalNode {
            id: r.read_id()?,
            control: r.read_id()?,
            surface: r.read_id()?,
            pos: read_pos(r)?,
            size: read_size(r)?,
            name: r.read_str()?,
            portal: schema::portal_kind_from_tag(r.read_u8()?)?,
            value: schema::value_type_from_tag(r.read_u8()?)?,
        },
        ActionType::CreateConnection => Action::CreateConnection {
            id: r.read_id()?,
            surface: r.read_id()?,
            control_a: r.read_id()?,
            control_b: r.read_id()?,
        },
        ActionType::MoveGridItem => Action::MoveGridItem {
            id: r.read_id()?,
            before: read_pos(r)?,
            after: read_pos(r)?,
        },
        ActionType::SizeGridItem => Action::SizeGridItem {
            id: r.read_id()?,
            before: read_rect(r)?,
            after: read_rect(r)?,
        },
        ActionType::RenameNode => Action::RenameNode {
            id: r.read_id()?,
            before: r.read_str()?,
            after: r.read_str()?,
        },
    };
    Ok(action)
}

fn read_grid<R: Read>(r: &mut StreamReader<R>) -> Result<GridItem, LoadError> {
    let rect = read_rect(r)?;
    let mut grid = GridItem::new(rect.pos, rect.size);
    grid.selected = r.read_bool()?;
    Ok(grid)
}

fn read_pos<R: Read>(r: &mut StreamReader<R>) -> Result<GridPos, LoadError> {
    Ok(GridPos::new(r.read_i32()?, r.read_i32()?))
}

fn read_size<R: Read>(r: &mut StreamReader<R>) -> Result<GridSize, LoadError> {
    Ok(GridSize::new(r.read_i32()?, r.read_i32()?))
}

fn read_rect<R: Read>(r: &mut StreamReader<R>) -> Result<GridRect, LoadError> {
    Ok(GridRect::new(read_pos(r)?, read_size(r)?))
}
