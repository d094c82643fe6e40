//! Bridges filesystem notifications into [`PluginEvent`]s for the standalone
//! harness. Embedded hosts feed vault events directly and skip this.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::event::PluginEvent;

/// Vault-relative `/`-separated form of an absolute path, or `None` for
/// paths outside the watched root.
fn relative(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

/// Folds raw notifications into vault events. Some backends split a rename
/// into a `Name(From)` event followed by a `Name(To)` event, so the
/// translator holds the `From` half until its partner shows up; a `From`
/// whose partner never arrives left the watched tree and counts as a
/// deletion.
#[derive(Debug, Default)]
struct EventTranslator {
    pending_rename: Option<String>,
}

impl EventTranslator {
    fn translate(&mut self, root: &Path, event: &notify::Event) -> Vec<PluginEvent> {
        let mut out = Vec::new();
        if !matches!(event.kind, EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            && let Some(from) = self.pending_rename.take()
        {
            out.push(PluginEvent::VaultDeleted { path: from });
        }
        match event.kind {
            EventKind::Create(_) => out.extend(event.paths.iter().filter_map(|p| {
                let path = relative(root, p)?;
                Some(PluginEvent::VaultCreated { path, is_dir: p.is_dir() })
            })),
            EventKind::Remove(_) => out.extend(
                event
                    .paths
                    .iter()
                    .filter_map(|p| Some(PluginEvent::VaultDeleted { path: relative(root, p)? })),
            ),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice()
                    && let Some(from) = relative(root, from)
                    && let Some(to) = relative(root, to)
                {
                    out.push(PluginEvent::VaultRenamed { from, to });
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.pending_rename = event.paths.first().and_then(|p| relative(root, p));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let to = event.paths.first().and_then(|p| Some((relative(root, p)?, p)));
                match (self.pending_rename.take(), to) {
                    (Some(from), Some((to, _))) => {
                        out.push(PluginEvent::VaultRenamed { from, to });
                    }
                    // arrived from outside the vault
                    (None, Some((path, p))) => {
                        out.push(PluginEvent::VaultCreated { path, is_dir: p.is_dir() });
                    }
                    // left the vault
                    (Some(from), None) => {
                        out.push(PluginEvent::VaultDeleted { path: from });
                    }
                    (None, None) => {}
                }
            }
            _ => {}
        }
        out
    }
}

pub fn spawn_vault_watcher(vault_root: PathBuf, tx: mpsc::Sender<PluginEvent>) {
    thread::spawn(move || {
        let root = vault_root.clone();
        let tx_watch = tx.clone();
        let mut translator = EventTranslator::default();
        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for translated in translator.translate(&root, &event) {
                        if tx_watch.send(translated).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("vault watcher error: {err}");
                }
            }) {
                Ok(w) => w,
                Err(err) => {
                    tracing::warn!("failed to initialize vault watcher: {err}");
                    return;
                }
            };

        if let Err(err) = watcher.watch(&vault_root, RecursiveMode::Recursive) {
            tracing::warn!("failed to watch vault {}: {err}", vault_root.display());
            return;
        }

        loop {
            thread::park();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};

    fn ev(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        event.paths = paths.iter().map(PathBuf::from).collect();
        event
    }

    #[test]
    fn create_and_remove_translate_to_vault_events() {
        let root = Path::new("/vault");
        let mut tr = EventTranslator::default();
        let created =
            tr.translate(root, &ev(EventKind::Create(CreateKind::File), &["/vault/a/b.md"]));
        assert_eq!(
            created,
            vec![PluginEvent::VaultCreated { path: "a/b.md".into(), is_dir: false }]
        );

        let removed =
            tr.translate(root, &ev(EventKind::Remove(RemoveKind::File), &["/vault/a/b.md"]));
        assert_eq!(removed, vec![PluginEvent::VaultDeleted { path: "a/b.md".into() }]);
    }

    #[test]
    fn paired_rename_translates_and_foreign_paths_are_dropped() {
        let root = Path::new("/vault");
        let mut tr = EventTranslator::default();
        let renamed = tr.translate(
            root,
            &ev(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/vault/a.md", "/vault/b.md"],
            ),
        );
        assert_eq!(
            renamed,
            vec![PluginEvent::VaultRenamed { from: "a.md".into(), to: "b.md".into() }]
        );

        let foreign =
            tr.translate(root, &ev(EventKind::Create(CreateKind::File), &["/elsewhere/x"]));
        assert!(foreign.is_empty());
    }

    #[test]
    fn split_rename_halves_pair_into_one_rename() {
        let root = Path::new("/vault");
        let mut tr = EventTranslator::default();
        let first = tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/vault/a.md"]),
        );
        assert!(first.is_empty());
        let second = tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/vault/b.md"]),
        );
        assert_eq!(
            second,
            vec![PluginEvent::VaultRenamed { from: "a.md".into(), to: "b.md".into() }]
        );
    }

    #[test]
    fn unpaired_rename_halves_degrade_to_delete_and_create() {
        let root = Path::new("/vault");
        let mut tr = EventTranslator::default();
        // a From whose partner never arrives flushes as a deletion
        tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/vault/a.md"]),
        );
        let flushed =
            tr.translate(root, &ev(EventKind::Create(CreateKind::File), &["/vault/new.md"]));
        assert_eq!(
            flushed,
            vec![
                PluginEvent::VaultDeleted { path: "a.md".into() },
                PluginEvent::VaultCreated { path: "new.md".into(), is_dir: false },
            ]
        );

        // a lone To means something moved into the vault
        let arrived = tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/vault/b.md"]),
        );
        assert_eq!(
            arrived,
            vec![PluginEvent::VaultCreated { path: "b.md".into(), is_dir: false }]
        );

        // a From paired with a To outside the vault means it left
        tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/vault/c.md"]),
        );
        let left = tr.translate(
            root,
            &ev(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/elsewhere/c.md"]),
        );
        assert_eq!(left, vec![PluginEvent::VaultDeleted { path: "c.md".into() }]);
    }
}
