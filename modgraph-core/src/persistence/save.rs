use std::io::{self, Write};

use modgraph_types::{
    Action, Entity, EntityKind, GridItem, GridPos, GridRect, GridSize, NodeKind, Pool,
};

use super::codec::StreamWriter;
use super::schema::{self, FileKind, SCHEMA_VERSION};
use crate::history::History;
use crate::library::{Library, LibraryEntry};
use crate::model_root::ModelRoot;
use crate::project::Project;

pub fn write_header<W: Write>(w: &mut StreamWriter<W>, kind: FileKind) -> io::Result<()> {
    w.write_u32(kind.magic())?;
    w.write_u32(SCHEMA_VERSION)
}

/// Project stream: header, linked file, main root, library, then whatever
/// `write_extra` appends.
pub fn write_project<W, F>(
    w: &mut StreamWriter<W>,
    project: &Project,
    save_history: bool,
    write_extra: F,
) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&mut StreamWriter<W>) -> io::Result<()>,
{
    write_header(w, FileKind::Project)?;
    w.write_str(project.linked_file().unwrap_or(""))?;
    write_model_root(w, project.root(), save_history)?;
    write_library_body(w, project.library())?;
    write_extra(w)?;
    w.flush()
}

pub fn write_library<W: Write>(w: &mut StreamWriter<W>, library: &Library) -> io::Result<()> {
    write_header(w, FileKind::Library)?;
    write_library_body(w, library)?;
    w.flush()
}

fn write_library_body<W: Write>(w: &mut StreamWriter<W>, library: &Library) -> io::Result<()> {
    w.write_len(library.len())?;
    for entry in library.entries() {
        write_entry(w, entry)?;
    }
    Ok(())
}

/// Entries never carry history.
pub fn write_entry<W: Write>(w: &mut StreamWriter<W>, entry: &LibraryEntry) -> io::Result<()> {
    w.write_str(entry.name())?;
    w.write_uuid(entry.base_id())?;
    w.write_uuid(entry.modification_id())?;
    w.write_datetime(&entry.modification_time())?;
    w.write_len(entry.tags().len())?;
    for tag in entry.tags() {
        w.write_str(tag)?;
    }
    write_model_root(w, entry.root(), false)
}

pub fn write_model_root<W: Write>(
    w: &mut StreamWriter<W>,
    root: &ModelRoot,
    with_history: bool,
) -> io::Result<()> {
    write_pool(w, root.pool())?;
    w.write_bool(with_history)?;
    if with_history {
        write_history(w, root.history())?;
    }
    Ok(())
}

pub fn write_pool<W: Write>(w: &mut StreamWriter<W>, pool: &Pool) -> io::Result<()> {
    w.write_len(pool.len())?;
    for entity in pool.iter() {
        write_entity(w, entity)?;
    }
    Ok(())
}

fn write_history<W: Write>(w: &mut StreamWriter<W>, history: &History) -> io::Result<()> {
    w.write_len(history.undo_actions().count())?;
    for action in history.undo_actions() {
        write_action(w, action)?;
    }
    w.write_len(history.redo_actions().count())?;
    for action in history.redo_actions() {
        write_action(w, action)?;
    }
    Ok(())
}

pub fn write_entity<W: Write>(w: &mut StreamWriter<W>, entity: &Entity) -> io::Result<()> {
    w.write_u8(schema::entity_type_tag(entity.entity_type()))?;
    w.write_id(entity.id)?;
    w.write_opt_id(entity.parent)?;
    match &entity.kind {
        EntityKind::Surface(s) => {
            w.write_u8(schema::surface_kind_tag(s.kind))?;
            w.write_f32(s.pan.0)?;
            w.write_f32(s.pan.1)?;
            w.write_f32(s.zoom)?;
        }
        EntityKind::Node(n) => {
            w.write_str(&n.name)?;
            write_grid(w, &n.grid)?;
            match &n.kind {
                NodeKind::Custom { code } => {
                    w.write_u8(schema::NODE_CUSTOM)?;
                    w.write_str(code)?;
                }
                NodeKind::Group => w.write_u8(schema::NODE_GROUP)?,
                NodeKind::Portal { portal, value } => {
                    w.write_u8(schema::NODE_PORTAL)?;
                    w.write_u8(schema::portal_kind_tag(*portal))?;
                    w.write_u8(schema::value_type_tag(*value))?;
                }
            }
        }
        EntityKind::Control(c) => {
            w.write_u8(schema::control_kind_tag(c.kind))?;
            w.write_str(&c.name)?;
            write_grid(w, &c.grid)?;
        }
        EntityKind::Connection(c) => {
            w.write_id(c.control_a)?;
            w.write_id(c.control_b)?;
        }
    }
    Ok(())
}

pub fn write_action<W: Write>(w: &mut StreamWriter<W>, action: &Action) -> io::Result<()> {
    w.write_u8(schema::action_type_tag(action.action_type()))?;
    match action {
        Action::None => {}
        Action::Composite { actions } => {
            w.write_len(actions.len())?;
            for a in actions {
                write_action(w, a)?;
            }
        }
        Action::Delete { id, removed } => {
            w.write_id(*id)?;
            w.write_len(removed.len())?;
            for r in removed {
                w.write_len(r.index)?;
                write_entity(w, &r.entity)?;
            }
        }
        Action::CreateCustomNode {
            id,
            surface,
            pos,
            size,
            name,
            code,
        } => {
            w.write_id(*id)?;
            w.write_id(*surface)?;
            write_pos(w, *pos)?;
            write_size(w, *size)?;
            w.write_str(name)?;
            w.write_str(code)?;
        }
        Action::CreateGroupNode {
            id,
            inner_surface,
            surface,
            pos,
            size,
            name,
        } => {
            w.write_id(*id)?;
            w.write_id(*inner_surface)?;
            w.write_id(*surface)?;
            write_pos(w, *pos)?;
            write_size(w, *size)?;
            w.write_str(name)?;
        }
        Action::CreatePortalNode {
            id,
            control,
            surface,
            pos,
            size,
            name,
            portal,
            value,
        } => {
            w.write_id(*id)?;
            w.write_id(*control)?;
            w.write_id(*surface)?;
            write_pos(w, *pos)?;
            write_size(w, *size)?;
            w.write_str(name)?;
            w.write_u8(schema::portal_kind_tag(*portal))?;
            w.write_u8(schema::value_type_tag(*value))?;
        }
        Action::CreateConnection {
            id,
            surface,
            control_a,
            control_b,
        } => {
            w.write_id(*id)?;
            w.write_id(*surface)?;
            w.write_id(*control_a)?;
            w.write_id(*control_b)?;
        }
        Action::MoveGridItem { id, before, after } => {
            w.write_id(*id)?;
            write_pos(w, *before)?;
            write_pos(w, *after)?;
        }
        Action::SizeGridItem { id, before, after } => {
            w.write_id(*id)?;
            write_rect(w, *before)?;
            write_rect(w, *after)?;
        }
        Action::RenameNode { id, before, after } => {
            w.write_id(*id)?;
            w.write_str(before)?;
            w.write_str(after)?;
        }
    }
    Ok(())
}

fn write_grid<W: Write>(w: &mut StreamWriter<W>, grid: &GridItem) -> io::Result<()> {
    write_rect(w, grid.rect())?;
    w.write_bool(grid.selected)
}

fn write_pos<W: Write>(w: &mut StreamWriter<W>, pos: GridPos) -> io::Result<()> {
    w.write_i32(pos.x)?;
    w.write_i32(pos.y)
}

fn write_size<W: Write>(w: &mut StreamWriter<W>, size: GridSize) -> io::Result<()> {
    w.write_i32(size.width)?;
    w.write_i32(size.height)
}

fn write_rect<W: Write>(w: &mut StreamWriter<W>, rect: GridRect) -> io::Result<()> {
    write_pos(w, rect.pos)?;
    write_size(w, rect.size)
}
