//! The host boundary. Everything the engine needs from the surrounding
//! application is expressed here as traits and a minimal tree representation;
//! the host's real rendering, storage, and event machinery stay black boxes.

pub mod memory;
pub mod watcher;

use std::fmt;

use thiserror::Error;

use crate::model::vpath;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("move rejected: {0}")]
    MoveRejected(String),
    #[error("settings store unavailable: {0}")]
    Store(String),
}

/// Host capabilities probed once at startup. Selecting the child-list
/// implementation happens exactly once, never inline at call sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCaps {
    pub virtual_children: bool,
}

/// Side-effectful operations the host exposes to the engine.
pub trait HostAdapter {
    /// Ask for a visual re-render. Cheap and coalescable; the patched
    /// compute hook consults the position index when the render runs.
    fn request_render(&mut self);
    /// Ask the host to persist its own workspace layout (tab order).
    fn request_layout_save(&mut self);
    /// Move a file or folder into `dest_folder`, returning the new path.
    fn move_path(&mut self, from: &str, dest_folder: &str) -> Result<String, HostError>;
    fn load_blob(&mut self) -> Result<Option<String>, HostError>;
    fn save_blob(&mut self, blob: &str) -> Result<(), HostError>;
    fn apply_stylesheet(&mut self, css: &str);
}

/// One rendered row in the host tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItem {
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    /// Host-native drag affordance. Disabling custom drag must never strip
    /// this permanently; teardown restores it.
    pub draggable: bool,
    /// Char indices marked by the filter overlay; empty when unfiltered.
    pub highlight: Vec<usize>,
}

impl TreeItem {
    pub fn new(path: &str, is_dir: bool) -> Self {
        Self {
            path: path.to_string(),
            name: vpath::name(path).to_string(),
            is_dir,
            draggable: true,
            highlight: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub item: TreeItem,
    /// `Some` for folders, `None` for leaves.
    pub children: Option<ChildListHandle>,
}

impl Node {
    pub fn leaf(item: TreeItem) -> Self {
        Self { item, children: None }
    }

    pub fn folder(item: TreeItem, children: ChildListHandle) -> Self {
        Self { item, children: Some(children) }
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }
}

/// Capability adapter over the host's internal child-list representation.
/// Two implementations, selected once from [`HostCaps`].
pub trait ChildList: fmt::Debug {
    fn items(&self) -> &[Node];
    fn items_mut(&mut self) -> &mut Vec<Node>;
    /// Swap the backing list wholesale, returning the previous one.
    fn replace(&mut self, nodes: Vec<Node>) -> Vec<Node>;
    fn boxed_clone(&self) -> Box<dyn ChildList>;
}

#[derive(Debug, Clone, Default)]
pub struct PlainChildren(Vec<Node>);

impl ChildList for PlainChildren {
    fn items(&self) -> &[Node] {
        &self.0
    }

    fn items_mut(&mut self) -> &mut Vec<Node> {
        &mut self.0
    }

    fn replace(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        std::mem::replace(&mut self.0, nodes)
    }

    fn boxed_clone(&self) -> Box<dyn ChildList> {
        Box::new(self.clone())
    }
}

/// Virtualized hosts window their child arrays and may recompute a frame
/// late; the generation counter models that recompute. Callers schedule a
/// second render pass after structural changes instead of sleeping.
#[derive(Debug, Clone, Default)]
pub struct VirtualChildren {
    inner: Vec<Node>,
    generation: u64,
}

impl VirtualChildren {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl ChildList for VirtualChildren {
    fn items(&self) -> &[Node] {
        &self.inner
    }

    fn items_mut(&mut self) -> &mut Vec<Node> {
        self.generation += 1;
        &mut self.inner
    }

    fn replace(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        self.generation += 1;
        std::mem::replace(&mut self.inner, nodes)
    }

    fn boxed_clone(&self) -> Box<dyn ChildList> {
        Box::new(self.clone())
    }
}

pub struct ChildListHandle(Box<dyn ChildList>);

impl ChildListHandle {
    pub fn new(inner: Box<dyn ChildList>) -> Self {
        Self(inner)
    }
}

impl std::ops::Deref for ChildListHandle {
    type Target = dyn ChildList;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl std::ops::DerefMut for ChildListHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Clone for ChildListHandle {
    fn clone(&self) -> Self {
        Self(self.0.boxed_clone())
    }
}

impl fmt::Debug for ChildListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub type ChildListFactory = fn(Vec<Node>) -> ChildListHandle;

pub fn child_list_factory(caps: &HostCaps) -> ChildListFactory {
    if caps.virtual_children {
        |nodes| ChildListHandle(Box::new(VirtualChildren { inner: nodes, generation: 0 }))
    } else {
        |nodes| ChildListHandle(Box::new(PlainChildren(nodes)))
    }
}

/// The ordering the host applies when no custom order is active: folders
/// first, then case-insensitive by name.
pub fn native_sort(items: &mut [Node]) {
    items.sort_by(|a, b| match (a.item.is_dir, b.item.is_dir) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.item.name.to_lowercase().cmp(&b.item.name.to_lowercase()),
    });
}

/// Sort options the host's stock sort menu offers.
pub const NATIVE_SORT_OPTIONS: [&str; 3] = ["alphabetical", "byModifiedTime", "byCreatedTime"];

/// The host's single tree-view instance, as far as the engine can see it:
/// a root folder plus nested child lists behind the capability adapter.
#[derive(Debug, Clone)]
pub struct TreeView {
    pub root: Node,
    make: ChildListFactory,
}

impl TreeView {
    pub fn new(caps: &HostCaps) -> Self {
        let make = child_list_factory(caps);
        let mut root_item = TreeItem::new(vpath::ROOT, true);
        root_item.name = String::new();
        Self {
            root: Node::folder(root_item, make(Vec::new())),
            make,
        }
    }

    pub fn make_children(&self, nodes: Vec<Node>) -> ChildListHandle {
        (self.make)(nodes)
    }

    pub fn factory(&self) -> ChildListFactory {
        self.make
    }

    pub fn find_folder(&self, folder: &str) -> Option<&Node> {
        if folder == vpath::ROOT {
            return Some(&self.root);
        }
        let mut node = &self.root;
        for segment in folder.split('/') {
            let children = node.children.as_ref()?;
            node = children
                .items()
                .iter()
                .find(|n| n.is_folder() && n.item.name == segment)?;
        }
        Some(node)
    }

    pub fn find_folder_mut(&mut self, folder: &str) -> Option<&mut Node> {
        if folder == vpath::ROOT {
            return Some(&mut self.root);
        }
        let mut node = &mut self.root;
        for segment in folder.split('/') {
            let children = node.children.as_mut()?;
            node = children
                .items_mut()
                .iter_mut()
                .find(|n| n.is_folder() && n.item.name == segment)?;
        }
        Some(node)
    }

    /// Immediate-child names of a folder in display order.
    pub fn live_order(&self, folder: &str) -> Option<Vec<String>> {
        let node = self.find_folder(folder)?;
        let children = node.children.as_ref()?;
        Some(children.items().iter().map(|n| n.item.name.clone()).collect())
    }

    /// Every folder path currently in the tree, root included, depth-first.
    pub fn folder_paths(&self) -> Vec<String> {
        let mut paths = vec![vpath::ROOT.to_string()];
        collect_folder_paths(&self.root, &mut paths);
        paths
    }

    /// Flattened view of every item, depth-first.
    pub fn flatten(&self) -> Vec<TreeItem> {
        let mut items = Vec::new();
        flatten_into(&self.root, &mut items);
        items
    }

    pub fn root_children_clone(&self) -> Vec<Node> {
        self.root
            .children
            .as_ref()
            .map(|c| c.items().to_vec())
            .unwrap_or_default()
    }

    pub fn set_root_children(&mut self, nodes: Vec<Node>) {
        if let Some(children) = self.root.children.as_mut() {
            children.replace(nodes);
        }
    }

    /// Appends a new entry under its parent, creating missing intermediate
    /// folders. Display position is the render's business, not ours.
    pub fn insert(&mut self, path: &str, is_dir: bool) {
        let folder = vpath::parent(path);
        if folder != vpath::ROOT && self.find_folder(&folder).is_none() {
            self.insert(&folder, true);
        }
        let make = self.make;
        let Some(parent) = self.find_folder_mut(&folder) else {
            return;
        };
        let Some(children) = parent.children.as_mut() else {
            return;
        };
        if children.items().iter().any(|n| n.item.path == path) {
            return;
        }
        let item = TreeItem::new(path, is_dir);
        let node = if is_dir {
            Node::folder(item, make(Vec::new()))
        } else {
            Node::leaf(item)
        };
        children.items_mut().push(node);
    }

    pub fn remove(&mut self, path: &str) -> Option<Node> {
        let folder = vpath::parent(path);
        let parent = self.find_folder_mut(&folder)?;
        let children = parent.children.as_mut()?;
        let index = children.items().iter().position(|n| n.item.path == path)?;
        Some(children.items_mut().remove(index))
    }

    /// Relocates a node (and everything under it) to a new path.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let Some(mut node) = self.remove(from) else {
            return false;
        };
        repath(&mut node, from, to);
        let folder = vpath::parent(to);
        if folder != vpath::ROOT && self.find_folder(&folder).is_none() {
            self.insert(&folder, true);
        }
        let Some(parent) = self.find_folder_mut(&folder) else {
            return false;
        };
        let Some(children) = parent.children.as_mut() else {
            return false;
        };
        children.items_mut().push(node);
        true
    }

    pub fn for_each_item_mut(&mut self, f: &mut dyn FnMut(&mut TreeItem)) {
        visit_items_mut(&mut self.root, f);
    }
}

fn collect_folder_paths(node: &Node, paths: &mut Vec<String>) {
    let Some(children) = node.children.as_ref() else {
        return;
    };
    for child in children.items() {
        if child.is_folder() {
            paths.push(child.item.path.clone());
            collect_folder_paths(child, paths);
        }
    }
}

fn flatten_into(node: &Node, items: &mut Vec<TreeItem>) {
    let Some(children) = node.children.as_ref() else {
        return;
    };
    for child in children.items() {
        items.push(child.item.clone());
        flatten_into(child, items);
    }
}

fn repath(node: &mut Node, from: &str, to: &str) {
    node.item.path = match node.item.path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => to.to_string(),
    };
    node.item.name = vpath::name(&node.item.path).to_string();
    if let Some(children) = node.children.as_mut() {
        for child in children.items_mut() {
            repath(child, from, to);
        }
    }
}

fn visit_items_mut(node: &mut Node, f: &mut dyn FnMut(&mut TreeItem)) {
    f(&mut node.item);
    if let Some(children) = node.children.as_mut() {
        for child in children.items_mut() {
            visit_items_mut(child, f);
        }
    }
}
