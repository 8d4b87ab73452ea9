// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::RegistrationBuilder;
use pim_store::BasePaths;

#[yare::parameterized(
    equal          = { "src/api", "src/api", true },
    parent_child   = { "src/api", "src/api/handler.rs", true },
    child_parent   = { "src/api/handler.rs", "src/api", true },
    root_vs_any    = { "src", "src/deep/nested/file.rs", true },
    sibling        = { "src/api", "src/web", false },
    name_prefix    = { "src/api", "src/api2", false },
    disjoint       = { "docs/a.md", "src/b.rs", false },
)]
fn conflict_rule(a: &str, b: &str, expected: bool) {
    assert_eq!(paths_conflict(a, b), expected);
    assert_eq!(paths_conflict(b, a), expected);
}

fn setup(dir: &tempfile::TempDir) -> (Registry, Reservations) {
    let registry = Registry::new(BasePaths::new(dir.path().to_path_buf()));
    for name in ["amber-owl", "rusty-vole"] {
        let registration =
            RegistrationBuilder::default().name(name).pid(std::process::id()).git_branch("main").build();
        registry.register(&registration).unwrap();
    }
    (registry.clone(), Reservations::new(registry))
}

#[test]
fn reserve_and_release_specific_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, reservations) = setup(&dir);

    reservations
        .reserve("amber-owl", &["src/api".to_string(), "docs".to_string()], Some("refactor"))
        .unwrap();
    assert_eq!(registry.load("amber-owl").unwrap().reservations.len(), 2);

    let released = reservations.release("amber-owl", Some(&["docs".to_string()])).unwrap();
    assert_eq!(released, vec!["docs"]);
    assert_eq!(registry.load("amber-owl").unwrap().reservations.len(), 1);
}

#[test]
fn release_all() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, reservations) = setup(&dir);
    reservations
        .reserve("amber-owl", &["a".to_string(), "b".to_string()], None)
        .unwrap();
    let released = reservations.release("amber-owl", None).unwrap();
    assert_eq!(released.len(), 2);
    assert!(registry.load("amber-owl").unwrap().reservations.is_empty());
}

#[test]
fn duplicate_reserve_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, reservations) = setup(&dir);
    reservations.reserve("amber-owl", &["src".to_string()], None).unwrap();
    reservations.reserve("amber-owl", &["src".to_string()], Some("again")).unwrap();
    assert_eq!(registry.load("amber-owl").unwrap().reservations.len(), 1);
}

#[test]
fn conflicts_name_the_other_peer() {
    let dir = tempfile::tempdir().unwrap();
    let (_registry, reservations) = setup(&dir);
    reservations.reserve("rusty-vole", &["src/api".to_string()], Some("rewiring routes")).unwrap();

    let found = reservations.conflicts("amber-owl", "src/api/handler.rs");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].peer, "rusty-vole");
    assert_eq!(found[0].reason.as_deref(), Some("rewiring routes"));
    assert_eq!(found[0].branch.as_deref(), Some("main"));
}

#[test]
fn own_reservations_never_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (_registry, reservations) = setup(&dir);
    reservations.reserve("amber-owl", &["src".to_string()], None).unwrap();
    assert!(reservations.conflicts("amber-owl", "src/lib.rs").is_empty());
}

#[test]
fn disjoint_paths_do_not_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (_registry, reservations) = setup(&dir);
    reservations.reserve("rusty-vole", &["docs".to_string()], None).unwrap();
    assert!(reservations.conflicts("amber-owl", "src/lib.rs").is_empty());
}
