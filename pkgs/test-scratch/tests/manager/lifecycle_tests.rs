use insta::assert_snapshot;
use serial_test::serial;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_scratch::{DeletePolicy, ScratchError, TempResourceManager, test_name};

/// A fresh parent directory with a scratch root below it that does not exist yet.
struct Sandbox {
    parent: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        test_scratch::logging::init_logger();
        Sandbox {
            parent: tempfile::tempdir().expect("failed to create sandbox"),
        }
    }

    fn root(&self) -> PathBuf {
        self.parent.path().join("unittest")
    }

    fn manager(&self, name: &str, policy: DeletePolicy) -> TempResourceManager {
        TempResourceManager::new(name, self.root(), policy)
    }
}

/// Switches the working directory for the rest of a test and switches back on drop.
struct WorkingDir {
    previous: PathBuf,
}

impl WorkingDir {
    fn enter(dir: &Path) -> Self {
        let previous = env::current_dir().expect("failed to read working directory");
        env::set_current_dir(dir).expect("failed to change working directory");
        WorkingDir { previous }
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}

fn starts_with_textually(path: &Path, root: &Path) -> bool {
    path.to_string_lossy()
        .starts_with(root.to_string_lossy().as_ref())
}

#[test]
fn temp_dirs_are_distinct_and_under_root() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager(test_name!(), DeletePolicy::Never);

    let dirs: Vec<PathBuf> = (0..5)
        .map(|_| manager.create_temp_dir().expect("create_temp_dir"))
        .collect();

    let unique: HashSet<&PathBuf> = dirs.iter().collect();
    assert_eq!(unique.len(), dirs.len());
    for dir in &dirs {
        assert!(dir.is_dir(), "{} should be a directory", dir.display());
        assert!(starts_with_textually(dir, &sandbox.root()));
        assert_eq!(dir.parent(), Some(sandbox.root().as_path()));
        assert!(manager.is_tracked(dir));
    }
    assert_eq!(manager.tracked_count(), 5);
}

#[test]
fn temp_files_are_empty_and_distinct() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("file_case", DeletePolicy::Never);

    let first = manager.create_temp_file().unwrap();
    let second = manager.create_temp_file().unwrap();

    assert_ne!(first, second);
    for file in [&first, &second] {
        assert!(file.is_file());
        assert_eq!(fs::metadata(file).unwrap().len(), 0);
        assert!(starts_with_textually(file, &sandbox.root()));
        let name = file.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("file_case-"), "unexpected name {name}");
        assert!(name.ends_with(".tmp"), "unexpected name {name}");
    }
    let mut expected = vec![first.as_path(), second.as_path()];
    expected.sort();
    assert_eq!(manager.tracked(), expected);
}

// Only this test changes the working directory; every other test here uses
// absolute roots or paths that are never touched.
#[test]
#[serial]
fn relative_root_entries_stay_managed_and_are_swept() {
    let sandbox = Sandbox::new();
    let _cwd = WorkingDir::enter(sandbox.parent.path());
    let root = Path::new("target/tmp/unittest");
    let mut manager = TempResourceManager::new("relative", root, DeletePolicy::Always);

    let dir = manager.create_temp_dir().unwrap();
    let file = manager.create_temp_file().unwrap();
    for created in [&dir, &file] {
        assert!(created.is_relative(), "{}", created.display());
        assert!(starts_with_textually(created, root));
        assert!(manager.is_managed(created));
        assert!(manager.is_tracked(created));
        assert!(created.exists());
    }

    manager.on_test_finished(false).unwrap();
    assert!(!dir.exists());
    assert!(!file.exists());
    assert_eq!(manager.tracked_count(), 0);
    assert!(root.is_dir(), "the root itself stays");
}

#[test]
fn entry_names_carry_the_test_identifier() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("suite::temp dir", DeletePolicy::Never);
    let dir = manager.create_temp_dir().unwrap();
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("suite__temp_dir-"), "unexpected name {name}");
}

#[test]
fn root_is_created_on_first_use() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("lazy_root", DeletePolicy::Never);
    assert!(!sandbox.root().exists());

    manager.create_temp_file().unwrap();
    assert!(sandbox.root().is_dir());
}

#[test]
fn nested_root_is_created_with_its_parents() {
    let sandbox = Sandbox::new();
    let root = sandbox.parent.path().join("target/tmp/unittest");
    let mut manager = TempResourceManager::new("nested_root", &root, DeletePolicy::Never);

    let dir = manager.create_temp_dir().unwrap();
    assert!(dir.starts_with(&root));
}

#[test]
fn unusable_root_reports_the_attempted_path() {
    let sandbox = Sandbox::new();
    let blocker = sandbox.parent.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let root = blocker.join("unittest");
    let mut manager = TempResourceManager::new("bad_root", &root, DeletePolicy::Never);

    let err = manager.create_temp_dir().unwrap_err();
    match &err {
        ScratchError::Io { action, path, .. } => {
            assert_eq!(*action, "creating scratch root");
            assert_eq!(path, &root);
        }
        other => panic!("expected an I/O failure, got {other:?}"),
    }
    assert_eq!(err.path(), root);
    assert_eq!(manager.tracked_count(), 0);
}

#[test]
fn deleting_a_directory_removes_everything_below_it() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("recursive", DeletePolicy::Never);

    let dir = manager.create_temp_dir().unwrap();
    let inner = dir.join("inner");
    fs::create_dir(&inner).unwrap();
    fs::write(inner.join("leaf.txt"), "leaf").unwrap();
    fs::write(dir.join("top.txt"), "top").unwrap();
    assert!(inner.exists());

    manager.delete_resource(&dir).unwrap();

    assert!(!dir.exists());
    assert!(!manager.is_tracked(&dir));
    assert!(sandbox.root().is_dir(), "the root itself stays");
}

#[test]
fn refuses_to_delete_outside_the_root() {
    let sandbox = Sandbox::new();
    let mut manager =
        TempResourceManager::new("outside", "build/tmp/unittest", DeletePolicy::Always);

    let err = manager.delete_resource(Path::new("out")).unwrap_err();
    assert!(matches!(err, ScratchError::NotManagedPath(_)));
    assert_snapshot!(err.to_string(), @"Not a unit test temporary directory: out");

    let sibling = sandbox.parent.path().join("out");
    fs::create_dir(&sibling).unwrap();
    fs::write(sibling.join("keep.txt"), "precious").unwrap();
    let mut manager = sandbox.manager("outside", DeletePolicy::Always);

    let err = manager.delete_resource(&sibling).unwrap_err();
    assert_eq!(err.path(), sibling);
    assert_eq!(fs::read_to_string(sibling.join("keep.txt")).unwrap(), "precious");
}

#[test]
fn untracked_entries_under_root_may_be_deleted() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("untracked", DeletePolicy::Never);
    let tracked = manager.create_temp_file().unwrap();

    let stray = sandbox.root().join("stray.txt");
    fs::write(&stray, "stray").unwrap();
    manager.delete_resource(&stray).unwrap();

    assert!(!stray.exists());
    assert_eq!(manager.tracked(), vec![tracked.as_path()]);
}

#[test]
fn deleting_twice_is_harmless() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("twice", DeletePolicy::Never);
    let file = manager.create_temp_file().unwrap();

    manager.delete_resource(&file).unwrap();
    manager.delete_resource(&file).unwrap();
    assert!(!file.exists());
    assert_eq!(manager.tracked_count(), 0);
}

#[test]
fn entry_removed_behind_the_managers_back_is_untracked_on_delete() {
    let sandbox = Sandbox::new();
    let mut manager = sandbox.manager("vanished", DeletePolicy::Never);
    let dir = manager.create_temp_dir().unwrap();
    fs::remove_dir(&dir).unwrap();

    manager.delete_resource(&dir).unwrap();
    assert!(!manager.is_tracked(&dir));
}

#[cfg(unix)]
#[test]
fn symlinks_are_removed_without_following_them() {
    let sandbox = Sandbox::new();
    let outside = sandbox.parent.path().join("outside");
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("data.txt"), "data").unwrap();

    let mut manager = sandbox.manager("symlink", DeletePolicy::Never);
    let dir = manager.create_temp_dir().unwrap();
    std::os::unix::fs::symlink(&outside, dir.join("link")).unwrap();

    manager.delete_resource(&dir).unwrap();
    assert!(!dir.exists());
    assert!(outside.join("data.txt").is_file());
}

// The containment check compares strings; these paths are accepted even
// though they resolve outside the root.
#[test]
fn textual_containment_accepts_lookalike_paths() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager("lookalike", DeletePolicy::Never);
    let root = sandbox.root();

    assert!(manager.is_managed(&root.join("..").join("elsewhere")));
    assert!(manager.is_managed(&PathBuf::from(format!("{}-sibling", root.display()))));
    assert!(!manager.is_managed(sandbox.parent.path()));
}
