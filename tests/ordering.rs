use parzip::config::PackOptions;
use parzip::{compress, extract, walk, workers};
use rand::{thread_rng, Rng};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn build_wide_tree(root: &Path) {
    for d in ["a", "a-c", "a/b", "b", "b/x/y/z", "_first", "Z"] {
        fs::create_dir_all(root.join(d)).unwrap();
    }
    let mut rng = thread_rng();
    for (i, d) in ["a", "a-c", "a/b", "b/x/y/z", "_first", "Z", ""].iter().enumerate() {
        for j in 0..6 {
            let size = rng.gen_range(0..4096);
            let body: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
            fs::write(root.join(d).join(format!("f{i}-{j}.dat")), body).unwrap();
        }
    }
}

#[test]
fn entries_follow_the_sorted_walk() {
    let src = tempdir().unwrap();
    let root = src.path().join("tree");
    build_wide_tree(&root);

    let archive = src.path().join("tree.zip");
    compress::pack(&root, &archive, &PackOptions::default().threads(8)).unwrap();

    let walked: Vec<String> = walk::walk_sorted(&walk::absolute_clean(&root).unwrap())
        .unwrap()
        .into_iter()
        .skip(1) // the root itself has no entry
        .map(|s| {
            s.path
                .strip_prefix(src.path())
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();

    let listed: Vec<String> = extract::list(&archive)
        .unwrap()
        .into_iter()
        .map(|e| e.name.trim_end_matches('/').to_string())
        .collect();
    assert_eq!(listed, walked);
}

#[test]
fn repeated_packs_are_byte_identical_whatever_the_thread_count() {
    let src = tempdir().unwrap();
    let root = src.path().join("tree");
    build_wide_tree(&root);

    let one = src.path().join("one.zip");
    let many = src.path().join("many.zip");
    let again = src.path().join("again.zip");
    compress::pack(&root, &one, &PackOptions::default().threads(1)).unwrap();
    compress::pack(&root, &many, &PackOptions::default().threads(16)).unwrap();
    compress::pack(&root, &again, &PackOptions::default().threads(16)).unwrap();

    let bytes = fs::read(&one).unwrap();
    assert_eq!(bytes, fs::read(&many).unwrap());
    assert_eq!(bytes, fs::read(&again).unwrap());
}

#[test]
fn random_preparation_delays_do_not_reorder_commits() {
    let items: Vec<usize> = (0..300).collect();
    let mut committed = Vec::with_capacity(items.len());
    workers::run_ordered(
        &items,
        12,
        |&n| {
            let pause = thread_rng().gen_range(0..3);
            thread::sleep(Duration::from_millis(pause));
            n
        },
        |n| {
            committed.push(n);
            Ok(())
        },
    )
    .unwrap();
    assert_eq!(committed, items);
}

#[test]
fn first_failure_in_walk_order_is_reported() {
    let items: Vec<usize> = (0..100).collect();
    let mut committed = Vec::new();
    let err = workers::run_ordered(
        &items,
        8,
        |&n| {
            // Later failures finish first; the earliest one must still win.
            thread::sleep(Duration::from_millis(if n == 20 { 15 } else { 0 }));
            if n == 20 || n == 70 {
                Err(parzip::ArchiverError::MissingEntry { seq: n })
            } else {
                Ok(n)
            }
        },
        |prepared| {
            committed.push(prepared?);
            Ok(())
        },
    )
    .unwrap_err();
    assert!(matches!(err, parzip::ArchiverError::MissingEntry { seq: 20 }));
    assert_eq!(committed, (0..20).collect::<Vec<_>>());
}
