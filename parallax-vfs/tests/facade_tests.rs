//! End-to-end tests of the facade against mounted in-memory trees and the
//! host filesystem.

mod common;

use common::{create_file, file_contents, with_clean_manager, with_test_tree};
use parallax_vfs as vfs;
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

#[test]
fn create_file_read_by_line() {
    with_test_tree(|| {
        create_file("//test/file", "testdata\ntestdata2\n");

        let mut reader = BufReader::new(vfs::open_reader("//test/file").unwrap());
        let mut line = String::new();

        assert_eq!(reader.read_line(&mut line).unwrap(), 9);
        assert_eq!(line, "testdata\n");
        line.clear();
        assert_eq!(reader.read_line(&mut line).unwrap(), 10);
        assert_eq!(line, "testdata2\n");
        line.clear();
        // end of stream: nothing read, the line stays empty
        assert_eq!(reader.read_line(&mut line).unwrap(), 0);
        assert_eq!(line, "");
    });
}

#[test]
fn create_file_round_trip() {
    with_test_tree(|| {
        create_file("//test/file", "testdata\ntestdata2\n");
        assert_eq!(file_contents("//test/file"), "testdata\ntestdata2\n");
        assert!(vfs::exists("//test/file"));
        assert!(vfs::is_regular_file("//test/file").unwrap());
        assert!(!vfs::is_directory("//test/file").unwrap());
        assert_eq!(vfs::file_size("//test/file").unwrap(), 19);
    });
}

#[test]
fn rename_file() {
    with_test_tree(|| {
        create_file("//test/file", "testdata\ntestdata2\n");
        vfs::rename("//test/file", "//test/file2").unwrap();
        assert_eq!(file_contents("//test/file2"), "testdata\ntestdata2\n");
        assert!(!vfs::exists("//test/file"));
    });
}

#[test]
fn rename_twice_restores_original_state() {
    with_test_tree(|| {
        create_file("//test/file", "payload");
        vfs::rename("//test/file", "//test/other").unwrap();
        vfs::rename("//test/other", "//test/file").unwrap();
        assert_eq!(file_contents("//test/file"), "payload");
        assert!(!vfs::exists("//test/other"));
    });
}

#[test]
fn rename_into_subdirectory() {
    with_test_tree(|| {
        create_file("//test/file", "testdata\ntestdata2\n");
        vfs::create_directory("//test/dir").unwrap();
        vfs::rename("//test/file", "//test/dir/file2").unwrap();
        assert_eq!(file_contents("//test/dir/file2"), "testdata\ntestdata2\n");
    });
}

#[test]
fn create_directory_with_trailing_slash() {
    with_test_tree(|| {
        vfs::create_directory("//test/dir/").unwrap();
        assert!(vfs::is_directory("//test/dir").unwrap());
    });
}

#[test]
fn create_directories_builds_the_whole_chain() {
    with_test_tree(|| {
        assert!(vfs::create_directories("//test/a/b/c").unwrap());
        assert!(vfs::is_directory("//test/").unwrap());
        assert!(vfs::is_directory("//test/a/").unwrap());
        assert!(vfs::is_directory("//test/a/b").unwrap());
        assert!(vfs::is_directory("//test/a/b/c").unwrap());

        // everything already exists now
        assert!(!vfs::create_directories("//test/a/b/c").unwrap());
    });
}

#[test]
fn special_data_round_trip() {
    with_test_tree(|| {
        let data: vfs::SpecialData = Arc::new(vec![1u8, 2, 3]);
        vfs::set_special_data("//test/fn", Arc::clone(&data)).unwrap();
        let received = vfs::get_special_data("//test/fn").unwrap();
        assert!(Arc::ptr_eq(&received, &data));
    });
}

#[test]
fn special_data_in_subdirectory() {
    with_test_tree(|| {
        let data: vfs::SpecialData = Arc::new(42u32);
        vfs::create_directory("//test/dir").unwrap();
        vfs::set_special_data("//test/dir/fn", Arc::clone(&data)).unwrap();
        let received = vfs::get_special_data("//test/dir/fn").unwrap();
        assert!(Arc::ptr_eq(&received, &data));
    });
}

#[test]
fn special_data_if_exists() {
    with_test_tree(|| {
        assert!(vfs::get_special_data_if_exists("//test/nothing")
            .unwrap()
            .is_none());
        assert!(vfs::get_special_data("//test/nothing").is_err());

        create_file("//test/plain", "");
        assert!(vfs::get_special_data_if_exists("//test/plain")
            .unwrap()
            .is_none());
    });
}

#[test]
fn iterate_directory() {
    with_test_tree(|| {
        vfs::create_directory("//test/dir1").unwrap();
        create_file("//test/file1", "testdata\ntestdata2\n");
        create_file("//test/file2", "");

        let found: BTreeSet<String> = vfs::read_dir("//test/")
            .unwrap()
            .map(|e| e.unwrap().path().as_str().to_string())
            .collect();
        let expected: BTreeSet<String> = ["//test/dir1", "//test/file1", "//test/file2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(found, expected);
    });
}

#[test]
fn iterate_subdirectory() {
    with_test_tree(|| {
        vfs::create_directory("//test/dir").unwrap();
        vfs::create_directory("//test/dir/dir1").unwrap();
        create_file("//test/dir/file1", "testdata\ntestdata2\n");
        create_file("//test/dir/file2", "");

        let found: BTreeSet<String> = vfs::read_dir("//test/dir")
            .unwrap()
            .map(|e| e.unwrap().path().as_str().to_string())
            .collect();
        let expected: BTreeSet<String> =
            ["//test/dir/dir1", "//test/dir/file1", "//test/dir/file2"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        assert_eq!(found, expected);
    });
}

#[test]
fn cross_tree_rename_copies_then_removes() {
    with_clean_manager(|| {
        vfs::manager().install_tree("//a", Arc::new(vfs::MemoryTree::new()));
        vfs::manager().install_tree("//b", Arc::new(vfs::MemoryTree::new()));
        create_file("//a/x", "cross-tree payload");
        let size_before = vfs::file_size("//a/x").unwrap();

        vfs::rename("//a/x", "//b/x").unwrap();

        assert_eq!(vfs::file_size("//b/x").unwrap(), size_before);
        assert_eq!(file_contents("//b/x"), "cross-tree payload");
        assert!(!vfs::exists("//a/x"));
    });
}

#[test]
fn unmounted_virtual_root_is_an_error_not_a_host_path() {
    with_clean_manager(|| {
        let err = vfs::status("//ghost/file").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotFound);
        assert!(!vfs::exists("//ghost/file"));
        assert!(vfs::open_reader("//ghost/file").is_err());
        assert!(vfs::create_directory("//ghost/dir").is_err());
    });
}

#[test]
fn relative_paths_resolve_against_tree_cwd() {
    with_test_tree(|| {
        vfs::create_directories("//test/work/depth").unwrap();
        vfs::set_current_path("work").unwrap();
        assert_eq!(
            vfs::current_path().unwrap(),
            vfs::VfsPath::new("//test/work")
        );

        create_file("depth/map.bin", "depth bytes");
        assert!(vfs::exists("//test/work/depth/map.bin"));
        assert_eq!(file_contents("//test/work/depth/map.bin"), "depth bytes");
    });
}

#[test]
fn current_path_switches_back_to_host() {
    with_test_tree(|| {
        let original_cwd = std::env::current_dir().unwrap();
        let host_dir = tempfile::tempdir().unwrap();
        vfs::set_current_path(host_dir.path().to_str().unwrap()).unwrap();
        assert!(vfs::manager().current_tree().is_none());

        // relative paths now go to the host
        create_file("host_file.txt", "host data");
        assert!(host_dir.path().join("host_file.txt").exists());
        assert_eq!(file_contents("host_file.txt"), "host data");

        std::env::set_current_dir(original_cwd).unwrap();
    });
}

#[test]
fn canonical_and_weakly_canonical_in_tree() {
    with_test_tree(|| {
        vfs::create_directories("//test/a/b").unwrap();
        create_file("//test/a/b/f", "x");

        assert_eq!(
            vfs::canonical("//test/a/./b/../b/f").unwrap(),
            vfs::VfsPath::new("//test/a/b/f")
        );
        assert!(vfs::canonical("//test/a/ghost").is_err());
        assert_eq!(
            vfs::weakly_canonical("//test/a/ghost/..").unwrap(),
            vfs::VfsPath::new("//test/a")
        );
    });
}

#[test]
fn relative_between_tree_paths() {
    with_test_tree(|| {
        vfs::create_directories("//test/a/b").unwrap();
        assert_eq!(
            vfs::relative_to("//test/a/b", "//test/a").unwrap(),
            vfs::VfsPath::new("b")
        );
        assert_eq!(
            vfs::relative_to("//test/a", "//test/a/b").unwrap(),
            vfs::VfsPath::new("..")
        );
    });
}

#[test]
fn equivalent_compares_canonical_forms() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        assert!(vfs::equivalent("//test/f", "//test/./f").unwrap());
        create_file("//test/g", "x");
        assert!(!vfs::equivalent("//test/f", "//test/g").unwrap());
    });
}

#[test]
fn is_empty_for_files_and_directories() {
    with_test_tree(|| {
        create_file("//test/empty", "");
        create_file("//test/full", "data");
        vfs::create_directory("//test/dir").unwrap();

        assert!(vfs::is_empty("//test/empty").unwrap());
        assert!(!vfs::is_empty("//test/full").unwrap());
        assert!(vfs::is_empty("//test/dir").unwrap());

        create_file("//test/dir/f", "");
        assert!(!vfs::is_empty("//test/dir").unwrap());
    });
}

#[test]
fn copy_file_streams_contents() {
    with_test_tree(|| {
        // larger than one 128 KiB copy chunk
        let payload = "0123456789abcdef".repeat(16 * 1024);
        create_file("//test/src", &payload);

        let copied = vfs::copy_file("//test/src", "//test/dst").unwrap();
        assert_eq!(copied, payload.len() as u64);
        assert_eq!(file_contents("//test/dst"), payload);
        assert!(vfs::exists("//test/src"));
    });
}

#[test]
fn copy_dispatches_on_type() {
    with_test_tree(|| {
        create_file("//test/f", "data");
        vfs::create_directory("//test/d").unwrap();

        vfs::copy("//test/f", "//test/f2").unwrap();
        assert_eq!(file_contents("//test/f2"), "data");

        vfs::copy("//test/d", "//test/d2").unwrap();
        assert!(vfs::is_directory("//test/d2").unwrap());
    });
}

#[test]
fn remove_and_remove_all() {
    with_test_tree(|| {
        vfs::create_directories("//test/a/b").unwrap();
        create_file("//test/a/f", "");
        create_file("//test/a/b/g", "");

        let err = vfs::remove("//test/a").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::DirectoryNotEmpty);

        assert_eq!(vfs::remove_all("//test/a").unwrap(), 4);
        assert!(!vfs::exists("//test/a"));
        assert_eq!(vfs::remove_all("//test/a").unwrap(), 0);
        assert!(!vfs::remove("//test/a").unwrap());
    });
}

#[test]
fn sparse_write_extends_with_zeros() {
    with_test_tree(|| {
        use std::io::Seek;
        let mut writer = vfs::open_writer("//test/sparse").unwrap();
        writer.write_all(b"head").unwrap();
        writer.seek(std::io::SeekFrom::Start(10)).unwrap();
        writer.write_all(b"tail").unwrap();
        writer.close().unwrap();

        assert_eq!(vfs::file_size("//test/sparse").unwrap(), 14);
        let contents = file_contents("//test/sparse");
        assert_eq!(contents.as_bytes(), b"head\0\0\0\0\0\0tail");
    });
}

#[test]
fn last_write_time_unsupported_in_tree() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        let err = vfs::last_write_time("//test/f").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotSupported);
    });
}

#[test]
fn resize_file_unsupported_in_tree() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        let err = vfs::resize_file("//test/f", 10).unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotSupported);
    });
}

#[test]
fn symlinks_unsupported_in_tree() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        assert!(!vfs::is_symlink("//test/f").unwrap());
        let err = vfs::create_symlink("//test/f", "//test/link").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotSupported);
        let err = vfs::read_symlink("//test/f").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotSupported);
    });
}

#[test]
fn hard_links_degenerate_in_tree() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        assert_eq!(vfs::hard_link_count("//test/f").unwrap(), 0);

        let err = vfs::create_hard_link("//test/f", "//test/l").unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::NotSupported);
    });
}

#[test]
fn cross_backend_hard_link_is_cross_device() {
    with_test_tree(|| {
        create_file("//test/f", "x");
        let host_target = std::env::temp_dir().join("parallax_link_target");
        let err =
            vfs::create_hard_link("//test/f", host_target.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), vfs::ErrorKind::CrossDeviceLink);
    });
}

#[test]
fn space_is_zero_in_tree() {
    with_test_tree(|| {
        assert_eq!(vfs::space("//test/").unwrap(), vfs::SpaceInfo::ZERO);
    });
}

#[test]
fn temp_directory_override() {
    with_test_tree(|| {
        let fallback = vfs::temp_directory_path().unwrap();
        assert!(!fallback.as_str().is_empty());

        vfs::manager().set_temp_dir("//test/tmp");
        assert_eq!(
            vfs::temp_directory_path().unwrap(),
            vfs::VfsPath::new("//test/tmp")
        );
    });
}

#[test]
fn host_round_trip_through_facade() {
    with_clean_manager(|| {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("facade.bin");
        let path = file.to_str().unwrap();

        create_file(path, "host facade bytes");
        assert!(vfs::exists(path));
        assert!(vfs::is_regular_file(path).unwrap());
        assert_eq!(vfs::file_size(path).unwrap(), 17);
        assert_eq!(file_contents(path), "host facade bytes");

        let renamed = dir.path().join("renamed.bin");
        vfs::rename(path, renamed.to_str().unwrap()).unwrap();
        assert!(!vfs::exists(path));
        assert_eq!(file_contents(renamed.to_str().unwrap()), "host facade bytes");
    });
}

#[test]
fn host_last_write_time_round_trip() {
    with_clean_manager(|| {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stamped");
        let path = file.to_str().unwrap();
        create_file(path, "x");

        let stamp = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        vfs::set_last_write_time(path, stamp).unwrap();
        assert_eq!(vfs::last_write_time(path).unwrap(), stamp);
    });
}

#[test]
fn host_resize_file() {
    with_clean_manager(|| {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("resized");
        let path = file.to_str().unwrap();
        create_file(path, "0123456789");

        vfs::resize_file(path, 4).unwrap();
        assert_eq!(vfs::file_size(path).unwrap(), 4);
        vfs::resize_file(path, 16).unwrap();
        assert_eq!(vfs::file_size(path).unwrap(), 16);
    });
}

#[cfg(unix)]
#[test]
fn host_symlink_round_trip() {
    with_clean_manager(|| {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        create_file(target.to_str().unwrap(), "linked");

        vfs::create_symlink(target.to_str().unwrap(), link.to_str().unwrap()).unwrap();
        assert!(vfs::is_symlink(link.to_str().unwrap()).unwrap());
        assert_eq!(
            vfs::read_symlink(link.to_str().unwrap()).unwrap(),
            vfs::VfsPath::from(target.as_path())
        );

        let link2 = dir.path().join("link2");
        vfs::copy_symlink(link.to_str().unwrap(), link2.to_str().unwrap()).unwrap();
        assert_eq!(
            vfs::read_symlink(link2.to_str().unwrap()).unwrap(),
            vfs::VfsPath::from(target.as_path())
        );
    });
}

#[test]
fn mixed_tree_and_host_copy() {
    with_test_tree(|| {
        let dir = tempfile::tempdir().unwrap();
        let host_file = dir.path().join("from_tree.bin");

        create_file("//test/src", "tree to host");
        vfs::copy_file("//test/src", host_file.to_str().unwrap()).unwrap();
        assert_eq!(file_contents(host_file.to_str().unwrap()), "tree to host");

        vfs::copy_file(host_file.to_str().unwrap(), "//test/back").unwrap();
        assert_eq!(file_contents("//test/back"), "tree to host");
    });
}

#[test]
fn append_mode_through_facade() {
    with_test_tree(|| {
        create_file("//test/log", "first\n");
        let mut writer =
            vfs::Writer::new(vfs::open_file("//test/log", vfs::OpenMode::appending()).unwrap());
        writer.write_all(b"second\n").unwrap();
        writer.close().unwrap();
        assert_eq!(file_contents("//test/log"), "first\nsecond\n");
    });
}
