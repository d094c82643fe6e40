//! In-memory [`HostAdapter`] with an optional filesystem backing. Tests use
//! it bare; the standalone harness points it at a real vault directory so
//! moves and the settings blob hit disk.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use super::{HostAdapter, HostCaps, HostError, Node, TreeItem, TreeView};
use crate::model::vpath;

#[derive(Debug, Default)]
pub struct MemoryHost {
    pub caps: HostCaps,
    blob: Option<String>,
    blob_path: Option<PathBuf>,
    fs_root: Option<PathBuf>,
    render_requests: u32,
    layout_saves: u32,
    /// Test hook: the next `move_path` call fails with `MoveRejected`.
    pub fail_next_move: bool,
    /// Test hook: this many upcoming `save_blob` calls fail.
    pub fail_saves: u32,
    pub moved: Vec<(String, String)>,
    pub stylesheet: Option<String>,
}

impl MemoryHost {
    pub fn with_vault(root: PathBuf, caps: HostCaps) -> Self {
        Self {
            caps,
            blob_path: Some(root.join(".arrange.toml")),
            fs_root: Some(root),
            ..Self::default()
        }
    }

    pub fn take_render_request(&mut self) -> bool {
        let pending = self.render_requests > 0;
        self.render_requests = 0;
        pending
    }

    pub fn render_requests(&self) -> u32 {
        self.render_requests
    }

    pub fn layout_saves(&self) -> u32 {
        self.layout_saves
    }
}

impl HostAdapter for MemoryHost {
    fn request_render(&mut self) {
        self.render_requests += 1;
    }

    fn request_layout_save(&mut self) {
        self.layout_saves += 1;
    }

    fn move_path(&mut self, from: &str, dest_folder: &str) -> Result<String, HostError> {
        if self.fail_next_move {
            self.fail_next_move = false;
            return Err(HostError::MoveRejected(from.to_string()));
        }
        let to = vpath::join(dest_folder, vpath::name(from));
        if let Some(root) = &self.fs_root {
            fs::rename(root.join(from), root.join(&to))
                .map_err(|err| HostError::MoveRejected(err.to_string()))?;
        }
        self.moved.push((from.to_string(), to.clone()));
        Ok(to)
    }

    fn load_blob(&mut self) -> Result<Option<String>, HostError> {
        if let Some(path) = &self.blob_path {
            return match fs::read_to_string(path) {
                Ok(blob) => Ok(Some(blob)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(HostError::Store(err.to_string())),
            };
        }
        Ok(self.blob.clone())
    }

    fn save_blob(&mut self, blob: &str) -> Result<(), HostError> {
        if self.fail_saves > 0 {
            self.fail_saves -= 1;
            return Err(HostError::Store("simulated save failure".to_string()));
        }
        if let Some(path) = &self.blob_path {
            fs::write(path, blob).map_err(|err| HostError::Store(err.to_string()))?;
        }
        self.blob = Some(blob.to_string());
        Ok(())
    }

    fn apply_stylesheet(&mut self, css: &str) {
        self.stylesheet = Some(css.to_string());
    }
}

/// Builds a [`TreeView`] from a directory, in the host's native order:
/// folders first, then case-insensitive by name.
pub fn snapshot_tree(root: &Path, caps: &HostCaps) -> TreeView {
    let mut view = TreeView::new(caps);
    push_children(&mut view, root, root, caps);
    view
}

fn push_children(view: &mut TreeView, root: &Path, dir: &Path, caps: &HostCaps) {
    let mut entries: Vec<(PathBuf, bool, String)> = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(false)
        .build()
        .flatten()
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            if path == dir {
                return None;
            }
            let metadata = entry.metadata().ok()?;
            let is_dir = metadata.is_dir();
            let name = entry.file_name().to_str()?.to_string();
            Some((path, is_dir, name))
        })
        .collect();

    entries.sort_by(|a, b| match (a.1, b.1) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.2.to_lowercase().cmp(&b.2.to_lowercase()),
    });

    for (path, is_dir, _) in entries {
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let vault_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let folder = vpath::parent(&vault_path);
        let make = view.factory();
        let item = TreeItem::new(&vault_path, is_dir);
        let node = if is_dir {
            Node::folder(item, make(Vec::new()))
        } else {
            Node::leaf(item)
        };
        if let Some(parent) = view.find_folder_mut(&folder)
            && let Some(children) = parent.children.as_mut()
        {
            children.items_mut().push(node);
        }
        if is_dir {
            push_children(view, root, &path, caps);
        }
    }
}
