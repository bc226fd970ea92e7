//! Open dialog: a directory browser filtered to supported audio files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use player_engine::formats;
use ratatui::widgets::ListState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChooserEntry {
    Parent(PathBuf),
    Dir { path: PathBuf, name: String },
    File { path: PathBuf, name: String },
}

impl ChooserEntry {
    pub(crate) fn label(&self) -> String {
        match self {
            ChooserEntry::Parent(_) => "../".to_string(),
            ChooserEntry::Dir { name, .. } => format!("{name}/"),
            ChooserEntry::File { name, .. } => name.clone(),
        }
    }
}

/// What confirming the selection did.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ChooserOutcome {
    /// Moved into another directory; the dialog stays open.
    Navigated,
    /// A file was picked; the dialog should close.
    Chosen(PathBuf),
    Nothing,
}

pub(crate) struct FileChooser {
    pub(crate) dir: PathBuf,
    pub(crate) entries: Vec<ChooserEntry>,
    pub(crate) list_state: ListState,
    pub(crate) error: Option<String>,
}

impl FileChooser {
    pub(crate) fn open(dir: &Path) -> Self {
        let mut chooser = Self {
            dir: dir.to_path_buf(),
            entries: Vec::new(),
            list_state: ListState::default(),
            error: None,
        };
        chooser.load_dir(dir.to_path_buf());
        chooser
    }

    pub(crate) fn title(&self) -> String {
        format!("Choose a WAV, MP3 or AIFF file ({})", formats::filter_label())
    }

    pub(crate) fn select_next(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let next = match self.list_state.selected() {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.list_state.select(Some(next));
    }

    pub(crate) fn select_prev(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let prev = self.list_state.selected().map(|i| i.saturating_sub(1)).unwrap_or(0);
        self.list_state.select(Some(prev));
    }

    pub(crate) fn selected(&self) -> Option<&ChooserEntry> {
        self.list_state.selected().and_then(|i| self.entries.get(i))
    }

    /// Enter on the selection: descend into directories, pick files.
    pub(crate) fn confirm(&mut self) -> ChooserOutcome {
        match self.selected().cloned() {
            Some(ChooserEntry::Parent(path)) | Some(ChooserEntry::Dir { path, .. }) => {
                self.load_dir(path);
                ChooserOutcome::Navigated
            }
            Some(ChooserEntry::File { path, .. }) => ChooserOutcome::Chosen(path),
            None => ChooserOutcome::Nothing,
        }
    }

    pub(crate) fn go_parent(&mut self) {
        if let Some(parent) = parent_of(&self.dir) {
            self.load_dir(parent);
        }
    }

    fn load_dir(&mut self, dir: PathBuf) {
        match list_entries(&dir) {
            Ok(entries) => {
                self.dir = dir;
                self.entries = entries;
                self.error = None;
                self.list_state
                    .select(if self.entries.is_empty() { None } else { Some(0) });
            }
            Err(e) => {
                tracing::warn!(dir = ?dir, "cannot list directory: {e:#}");
                self.error = Some(format!("{e:#}"));
            }
        }
    }
}

/// List `dir` as a parent link, sub-directories, then supported files, each sorted by name.
pub(crate) fn list_entries(dir: &Path) -> Result<Vec<ChooserEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            dirs.push(ChooserEntry::Dir { path, name });
        } else if formats::is_supported_path(&path) {
            files.push(ChooserEntry::File { path, name });
        }
    }
    dirs.sort_by_key(|e| e.label().to_lowercase());
    files.sort_by_key(|e| e.label().to_lowercase());

    let mut out = Vec::with_capacity(dirs.len() + files.len() + 1);
    if let Some(parent) = parent_of(dir) {
        out.push(ChooserEntry::Parent(parent));
    }
    out.extend(dirs);
    out.extend(files);
    Ok(out)
}

fn parent_of(dir: &Path) -> Option<PathBuf> {
    let absolute = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    absolute.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "file-player-chooser-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn labels(entries: &[ChooserEntry]) -> Vec<String> {
        entries.iter().map(ChooserEntry::label).collect()
    }

    #[test]
    fn lists_dirs_then_supported_files() {
        let root = temp_root("list");
        std::fs::create_dir_all(root.join("Live")).unwrap();
        std::fs::write(root.join("b.mp3"), b"x").unwrap();
        std::fs::write(root.join("A.wav"), b"x").unwrap();
        std::fs::write(root.join("c.aiff"), b"x").unwrap();
        std::fs::write(root.join("notes.txt"), b"x").unwrap();
        std::fs::write(root.join("d.flac"), b"x").unwrap();
        std::fs::write(root.join(".hidden.wav"), b"x").unwrap();

        let entries = list_entries(&root).unwrap();
        assert_eq!(
            labels(&entries),
            vec!["../", "Live/", "A.wav", "b.mp3", "c.aiff"]
        );
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn confirm_descends_and_picks() {
        let root = temp_root("confirm");
        let sub = root.join("album");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("track.wav"), b"x").unwrap();

        let mut chooser = FileChooser::open(&root);
        // entries: ../, album/
        chooser.select_next();
        assert_eq!(chooser.confirm(), ChooserOutcome::Navigated);
        assert_eq!(chooser.dir, sub);

        chooser.select_next();
        assert_eq!(chooser.confirm(), ChooserOutcome::Chosen(sub.join("track.wav")));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn unreadable_dir_keeps_previous_listing() {
        let root = temp_root("missing");
        let mut chooser = FileChooser::open(&root);
        let before = chooser.entries.clone();

        chooser.load_dir(root.join("does-not-exist"));
        assert_eq!(chooser.dir, root);
        assert_eq!(chooser.entries, before);
        assert!(chooser.error.is_some());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let root = temp_root("bounds");
        let mut chooser = FileChooser::open(&root);
        // only the parent entry
        chooser.select_next();
        chooser.select_next();
        assert_eq!(chooser.list_state.selected(), Some(0));
        chooser.select_prev();
        assert_eq!(chooser.list_state.selected(), Some(0));
        let _ = std::fs::remove_dir_all(&root);
    }
}
