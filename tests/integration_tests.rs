//! Integration tests for the namespace core and both run modes

use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use treefs::config::{BatchConfig, ServeConfig};
use treefs::dispatch::{BatchCoordinator, ServiceCoordinator};
use treefs::error::FsError;
use treefs::fs::{Namespace, NodeKind};
use treefs::Client;

#[test]
fn test_create_visible_to_other_threads() {
    // Each thread fills its own subdirectory; 80 files in one directory
    // would overflow the fixed entry list.
    let ns = Arc::new(Namespace::new(256).unwrap());
    for t in 0..4 {
        ns.create(&format!("/shared{t}"), NodeKind::Directory).unwrap();
    }

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let ns = Arc::clone(&ns);
            thread::spawn(move || {
                for i in 0..20 {
                    ns.create(&format!("/shared{t}/f{i}"), NodeKind::File).unwrap();
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    for t in 0..4 {
        for i in 0..20 {
            assert!(ns.lookup(&format!("/shared{t}/f{i}")).is_ok());
        }
    }
}

#[test]
fn test_concurrent_identical_create_single_winner() {
    for _ in 0..20 {
        let ns = Arc::new(Namespace::new(64).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ns = Arc::clone(&ns);
                thread::spawn(move || ns.create("/contested", NodeKind::File).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(ns.lookup("/contested").is_ok());
    }
}

#[test]
fn test_concurrent_create_delete_same_name() {
    let ns = Arc::new(Namespace::new(64).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ns = Arc::clone(&ns);
            thread::spawn(move || {
                for _ in 0..50 {
                    if t % 2 == 0 {
                        let _ = ns.create("/churn", NodeKind::File);
                    } else {
                        let _ = ns.remove("/churn");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    // The table must still be coherent either way.
    match ns.lookup("/churn") {
        Ok(_) => ns.remove("/churn").unwrap(),
        Err(FsError::NotFound { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_move_keeps_inumber_and_subtree() {
    let ns = Namespace::new(64).unwrap();
    ns.create("/src", NodeKind::Directory).unwrap();
    ns.create("/dst", NodeKind::Directory).unwrap();
    let dir = ns.create("/src/dir", NodeKind::Directory).unwrap();
    let file = ns.create("/src/dir/f", NodeKind::File).unwrap();

    ns.rename("/src/dir", "/dst/dir").unwrap();

    assert!(matches!(ns.lookup("/src/dir"), Err(FsError::NotFound { .. })));
    assert_eq!(ns.lookup("/dst/dir").unwrap(), dir);
    assert_eq!(ns.lookup("/dst/dir/f").unwrap(), file);
}

#[test]
fn test_opposing_concurrent_moves_complete() {
    // Two pools shuttling entries in opposite directions between the same
    // pair of directories; a lock-ordering bug shows up here as a hang.
    let ns = Arc::new(Namespace::new(256).unwrap());
    ns.create("/a", NodeKind::Directory).unwrap();
    ns.create("/b", NodeKind::Directory).unwrap();
    for i in 0..8 {
        ns.create(&format!("/a/x{i}"), NodeKind::File).unwrap();
        ns.create(&format!("/b/y{i}"), NodeKind::File).unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ns = Arc::clone(&ns);
            thread::spawn(move || {
                for round in 0..100 {
                    if round % 2 == 0 {
                        let _ = ns.rename(&format!("/a/x{i}"), &format!("/b/x{i}"));
                        let _ = ns.rename(&format!("/b/y{i}"), &format!("/a/y{i}"));
                    } else {
                        let _ = ns.rename(&format!("/b/x{i}"), &format!("/a/x{i}"));
                        let _ = ns.rename(&format!("/a/y{i}"), &format!("/b/y{i}"));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every shuttled file still exists in exactly one of the two homes.
    for i in 0..8 {
        let in_a = ns.lookup(&format!("/a/x{i}")).is_ok();
        let in_b = ns.lookup(&format!("/b/x{i}")).is_ok();
        assert!(in_a ^ in_b, "x{i} lost or duplicated");
    }
}

#[test]
fn test_deep_cross_moves_complete() {
    let ns = Arc::new(Namespace::new(256).unwrap());
    ns.create("/p", NodeKind::Directory).unwrap();
    ns.create("/p/q", NodeKind::Directory).unwrap();
    ns.create("/p/q/deep", NodeKind::Directory).unwrap();
    ns.create("/flat", NodeKind::Directory).unwrap();
    ns.create("/p/q/deep/f", NodeKind::File).unwrap();

    // One thread moves between nested and flat parents, the other works the
    // reverse direction: the parents are prefix-related on one side.
    let a = {
        let ns = Arc::clone(&ns);
        thread::spawn(move || {
            for _ in 0..200 {
                let _ = ns.rename("/p/q/deep/f", "/flat/f");
                let _ = ns.rename("/flat/f", "/p/q/deep/f");
            }
        })
    };
    let b = {
        let ns = Arc::clone(&ns);
        thread::spawn(move || {
            for _ in 0..200 {
                let _ = ns.rename("/p/q/deep/f", "/p/f");
                let _ = ns.rename("/p/f", "/p/q/deep/f");
            }
        })
    };
    a.join().unwrap();
    b.join().unwrap();

    let homes = ["/p/q/deep/f", "/flat/f", "/p/f"]
        .iter()
        .filter(|p| ns.lookup(p).is_ok())
        .count();
    assert_eq!(homes, 1);
}

#[test]
fn test_capacity_exhaustion_and_recovery() {
    let ns = Namespace::new(4).unwrap();
    ns.create("/a", NodeKind::File).unwrap();
    ns.create("/b", NodeKind::File).unwrap();
    ns.create("/c", NodeKind::File).unwrap();
    assert!(matches!(
        ns.create("/d", NodeKind::File),
        Err(FsError::TableExhausted)
    ));
    // The failed create must not have touched the tree.
    assert!(ns.lookup("/d").is_err());
    ns.remove("/b").unwrap();
    ns.create("/d", NodeKind::File).unwrap();
    assert!(ns.lookup("/d").is_ok());
}

fn write_flat_workload(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let mut input = String::from("# flat, order-independent workload\n");
    for i in 0..50 {
        input.push_str(&format!("c /f{i:02} f\n"));
    }
    for i in 0..10 {
        input.push_str(&format!("l /f{i:02}\n"));
        input.push_str(&format!("d /missing{i}\n"));
    }
    let path = dir.path().join(name);
    fs::write(&path, input).unwrap();
    path
}

#[test]
fn test_batch_dump_agrees_across_worker_counts() {
    let dir = TempDir::new().unwrap();
    let input_path = write_flat_workload(&dir, "input.txt");

    let mut dumps = Vec::new();
    for workers in [1, 2, 8] {
        let output_path = dir.path().join(format!("out-{workers}.txt"));
        let config = BatchConfig {
            input_path: input_path.clone(),
            output_path: output_path.clone(),
            worker_count: workers,
            queue_size: 16,
            table_capacity: 128,
        };
        let result = BatchCoordinator::new(config).unwrap().run().unwrap();
        assert_eq!(result.commands, 70);

        // Entry slot order depends on interleaving; the set of paths does not.
        let mut lines: Vec<String> = fs::read_to_string(&output_path)
            .unwrap()
            .lines()
            .map(|l| l.trim_start().to_string())
            .collect();
        lines.sort();
        dumps.push(lines);
    }
    assert_eq!(dumps[0].len(), 50);
    assert_eq!(dumps[0], dumps[1]);
    assert_eq!(dumps[1], dumps[2]);
}

#[test]
fn test_batch_nested_tree_dump() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("input.txt");
    fs::write(
        &input_path,
        "c /root d\nl /root\nc /root/sub d\nc /root/sub/leaf f\n",
    )
    .unwrap();
    let output_path = dir.path().join("out.txt");
    let config = BatchConfig {
        input_path,
        output_path: output_path.clone(),
        worker_count: 1,
        queue_size: 16,
        table_capacity: 32,
    };
    BatchCoordinator::new(config).unwrap().run().unwrap();

    let dump = fs::read_to_string(&output_path).unwrap();
    assert_eq!(dump, "/root\n  /root/sub\n    /root/sub/leaf\n");
}

#[test]
fn test_serve_round_trip() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("treefs.sock");
    let config = ServeConfig {
        socket_path: socket_path.clone(),
        worker_count: 2,
        table_capacity: 64,
    };
    let coordinator = ServiceCoordinator::new(config).unwrap();
    let shutdown = coordinator.shutdown_flag();
    let server = thread::spawn(move || coordinator.run().unwrap());

    // Wait for the socket file to appear.
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    let client = Client::connect(&socket_path).unwrap();
    assert_eq!(client.create("/d", NodeKind::Directory).unwrap(), 0);
    assert_eq!(client.create("/d/f", NodeKind::File).unwrap(), 0);
    let ino = client.lookup("/d/f").unwrap();
    assert!(ino >= 0);
    assert_eq!(client.move_node("/d/f", "/g").unwrap(), 0);
    assert_eq!(client.lookup("/g").unwrap(), ino);
    assert_eq!(client.lookup("/d/f").unwrap(), -1);
    assert_eq!(client.delete("/d").unwrap(), 0);
    // Unparseable request gets a BAD_COMMAND reply, not silence.
    assert_eq!(client.request("frobnicate /x").unwrap(), -8);

    shutdown.store(true, Ordering::SeqCst);
    let result = server.join().unwrap();
    assert_eq!(result.commands, 8);
    // Socket file is unlinked on shutdown.
    assert!(!socket_path.exists());
}

#[test]
fn test_serve_concurrent_clients() {
    let dir = TempDir::new().unwrap();
    let socket_path = dir.path().join("treefs.sock");
    let config = ServeConfig {
        socket_path: socket_path.clone(),
        worker_count: 4,
        table_capacity: 256,
    };
    let coordinator = ServiceCoordinator::new(config).unwrap();
    let shutdown = coordinator.shutdown_flag();
    let server = thread::spawn(move || coordinator.run().unwrap());
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    let clients: Vec<_> = (0..4)
        .map(|t| {
            let socket_path = socket_path.clone();
            thread::spawn(move || {
                let client = Client::connect(&socket_path).unwrap();
                for i in 0..10 {
                    assert_eq!(
                        client.create(&format!("/c{t}-{i}"), NodeKind::File).unwrap(),
                        0
                    );
                }
            })
        })
        .collect();
    for handle in clients {
        handle.join().unwrap();
    }

    let probe = Client::connect(&socket_path).unwrap();
    for t in 0..4 {
        for i in 0..10 {
            assert!(probe.lookup(&format!("/c{t}-{i}")).unwrap() >= 0);
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    server.join().unwrap();
}
