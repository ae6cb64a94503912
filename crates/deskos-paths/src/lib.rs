//! Stateless POSIX-style path string utilities.
//!
//! The deskos filesystem addresses entries by `/`-separated strings, not
//! `std::path::Path` (which is platform-dependent and allows prefixes that
//! have no meaning inside the virtual tree). Everything here is pure string
//! manipulation: no filesystem access, no allocation beyond the result.
//!
//! Normalization rules:
//! - duplicate separators collapse (`/a//b` → `/a/b`)
//! - `.` segments are dropped
//! - `..` pops the previous segment; `..` above the root clamps to `/`
//! - results never carry a trailing slash (except the root itself)

/// The path separator.
pub const SEP: char = '/';

/// The root path.
pub const ROOT: &str = "/";

/// Split a path into its non-empty segments, resolving `.` and `..`.
///
/// `..` above the root is clamped (POSIX `realpath` behavior), so the result
/// is always a valid root-relative segment list.
pub fn segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for part in path.split(SEP) {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Normalize a path to canonical absolute form.
///
/// The input is treated as absolute whether or not it starts with `/`.
pub fn normalize(path: &str) -> String {
    let segs = segments(path);
    if segs.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segs.join("/"))
    }
}

/// Resolve `path` against `base`, returning a normalized absolute path.
///
/// If `path` is absolute, `base` is ignored. `base` itself is assumed
/// absolute (callers pass a cwd, which always is).
pub fn resolve(base: &str, path: &str) -> String {
    if path.starts_with(SEP) {
        normalize(path)
    } else {
        normalize(&format!("{}/{}", base, path))
    }
}

/// Join two path fragments and normalize the result.
pub fn join(a: &str, b: &str) -> String {
    normalize(&format!("{}/{}", a, b))
}

/// The parent directory of a normalized absolute path.
///
/// The parent of the root is the root.
pub fn dirname(path: &str) -> String {
    let mut segs = segments(path);
    segs.pop();
    if segs.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segs.join("/"))
    }
}

/// The final segment of a path, or `""` for the root.
pub fn basename(path: &str) -> &str {
    segments(path).last().copied().unwrap_or("")
}

/// Returns true if the normalized form of `path` is the root.
pub fn is_root(path: &str) -> bool {
    segments(path).is_empty()
}
