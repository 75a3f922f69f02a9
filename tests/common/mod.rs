#![allow(dead_code)]

//! Shared fixtures: a scripted device controller and build-output
//! scaffolding.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes a fake `devctl` that appends every invocation to `trace` and
/// exits per the given codes.
pub fn write_fake_devctl(
    dir: &Path,
    trace: &Path,
    echo_exit: i32,
    serve_exit: i32,
    test_exit: i32,
) -> PathBuf {
    write_fake_devctl_with_test_cmd(dir, trace, echo_exit, serve_exit, &format!("exit {test_exit}"))
}

/// Variant whose `test run` handler is an arbitrary shell snippet.
pub fn write_fake_devctl_with_test_cmd(
    dir: &Path,
    trace: &Path,
    echo_exit: i32,
    serve_exit: i32,
    test_cmd: &str,
) -> PathBuf {
    let path = dir.join("devctl");
    let body = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> \"{trace}\"\n\
         case \"$*\" in\n\
           *\"target echo\"*) exit {echo_exit} ;;\n\
           *\"serve start\"*) exit {serve_exit} ;;\n\
           *\"test run\"*) {test_cmd} ;;\n\
         esac\n\
         exit 0\n",
        trace = trace.display(),
    );
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Lays out a build output directory with the named package archives.
pub fn write_out_dir(root: &Path, package_names: &[&str]) -> PathBuf {
    let out = root.join("out");
    fs::create_dir_all(out.join("packages")).unwrap();
    for name in package_names {
        fs::write(out.join("packages").join(name), b"archive-bytes").unwrap();
    }
    out
}

/// The fake tool's invocations so far, one argv per line.
pub fn trace_lines(trace: &Path) -> Vec<String> {
    fs::read_to_string(trace)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Extracts the repository path from a recorded `repo serve start` line.
pub fn repo_path_from(lines: &[String]) -> PathBuf {
    let line = lines
        .iter()
        .find(|l| l.contains("serve start"))
        .expect("no serve start in trace");
    let mut parts = line.split_whitespace();
    while let Some(part) = parts.next() {
        if part == "--repo" {
            return PathBuf::from(parts.next().expect("path after --repo"));
        }
    }
    panic!("serve line without --repo: {line}");
}
