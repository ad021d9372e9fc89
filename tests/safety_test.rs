// tests/safety_test.rs — Integration test: workspace containment on a real filesystem

use std::path::Path;

use skillforge::infra::paths::WorkspaceLayout;
use skillforge::security::{SafetyEnforcer, Verdict};

fn workspace() -> (tempfile::TempDir, WorkspaceLayout, SafetyEnforcer) {
    let dir = tempfile::tempdir().unwrap();
    let layout = WorkspaceLayout::new(dir.path().join("ws")).ensure().unwrap();
    (dir, layout, SafetyEnforcer::new(&[]).unwrap())
}

#[test]
fn test_descendants_allowed() {
    let (_dir, layout, safety) = workspace();
    let root = layout.root();
    assert!(safety
        .check_path(Path::new("skills/adder.py"), root)
        .is_allowed());
    // Not yet created
    assert!(safety
        .check_path(Path::new("skills/new/deep/file.py"), root)
        .is_allowed());
    assert!(safety
        .check_path(&root.join("exec/out.txt"), root)
        .is_allowed());
}

#[test]
fn test_parent_traversal_denied() {
    let (_dir, layout, safety) = workspace();
    let root = layout.root();
    for candidate in ["../x", "skills/../../x", "skills/.."] {
        let verdict = safety.check_path(Path::new(candidate), root);
        assert!(!verdict.is_allowed(), "should deny {candidate}");
    }
}

#[test]
fn test_absolute_outside_denied() {
    let (_dir, layout, safety) = workspace();
    let verdict = safety.check_path(Path::new("/etc/passwd"), layout.root());
    match verdict {
        Verdict::Denied(reason) => assert!(reason.contains("outside the workspace")),
        Verdict::Allowed => panic!("/etc/passwd must be denied"),
    }
}

#[test]
fn test_sibling_with_common_prefix_denied() {
    let (dir, layout, safety) = workspace();
    let sibling = dir.path().join("ws-evil");
    std::fs::create_dir_all(&sibling).unwrap();
    assert!(!safety
        .check_path(&sibling.join("x.py"), layout.root())
        .is_allowed());
}

#[test]
fn test_root_itself_denied() {
    let (_dir, layout, safety) = workspace();
    let root = layout.root();
    assert!(!safety.check_path(root, root).is_allowed());
    assert!(!safety.check_path(Path::new(""), root).is_allowed());
    assert!(!safety.check_path(Path::new("."), root).is_allowed());
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_denied() {
    let (dir, layout, safety) = workspace();
    let outside = dir.path().join("outside");
    std::fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, layout.root().join("link")).unwrap();

    let verdict = safety.check_path(Path::new("link/payload.py"), layout.root());
    assert!(!verdict.is_allowed());
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_workspace_allowed() {
    let (_dir, layout, safety) = workspace();
    std::os::unix::fs::symlink(layout.skills_dir(), layout.root().join("alias")).unwrap();
    assert!(safety
        .check_path(Path::new("alias/adder.py"), layout.root())
        .is_allowed());
}

#[test]
fn test_missing_root_denied() {
    let safety = SafetyEnforcer::new(&[]).unwrap();
    let verdict = safety.check_path(Path::new("a.py"), Path::new("/nonexistent/skillforge/ws"));
    assert!(!verdict.is_allowed());
}
