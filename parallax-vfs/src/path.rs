//! Path value type.
//!
//! [`VfsPath`] is an immutable, purely lexical path. It accepts both `/` and
//! `\` as separators and understands the reserved `//name` root-name prefix
//! that selects a mounted tree. No operation here touches any backend.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

fn is_sep(c: char) -> bool {
    c == '/' || c == '\\'
}

/// An immutable filesystem path.
///
/// A path decomposes into an optional root name (`//name`), an optional root
/// directory (a separator following the root name, or a leading separator),
/// and a trail of relative components. The original spelling is retained for
/// display; all semantic queries work on the decomposition, so `a/b`, `a//b`
/// and `a\b` compare equal.
#[derive(Debug, Clone, Default)]
pub struct VfsPath {
    inner: String,
}

impl VfsPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { inner: path.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// View of the path for handing to `std::fs` and friends.
    pub fn as_std_path(&self) -> &Path {
        Path::new(&self.inner)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The `name` part of a leading `//name`, without the separators.
    fn root_name_part(&self) -> Option<&str> {
        let s = self.inner.as_str();
        let mut chars = s.chars();
        let (first, second) = (chars.next()?, chars.next()?);
        let third = chars.next();
        if !is_sep(first) || !is_sep(second) {
            return None;
        }
        match third {
            Some(c) if !is_sep(c) => {}
            _ => return None,
        }
        let rest = &s[2..];
        let end = rest.find(is_sep).unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Byte offset where the relative trail starts.
    fn relative_start(&self) -> usize {
        let s = self.inner.as_str();
        let after_root_name = match self.root_name_part() {
            Some(name) => 2 + name.len(),
            None => 0,
        };
        let tail = &s[after_root_name..];
        let skipped = tail.len() - tail.trim_start_matches(is_sep).len();
        after_root_name + skipped
    }

    pub fn has_root_name(&self) -> bool {
        self.root_name_part().is_some()
    }

    /// The root name in canonical `//name` spelling.
    pub fn root_name(&self) -> Option<String> {
        self.root_name_part().map(|name| format!("//{name}"))
    }

    pub fn has_root_directory(&self) -> bool {
        let s = self.inner.as_str();
        match self.root_name_part() {
            Some(name) => s[2 + name.len()..].starts_with(is_sep),
            None => s.starts_with(is_sep),
        }
    }

    /// A path is absolute when it has a root directory.
    pub fn is_absolute(&self) -> bool {
        self.has_root_directory()
    }

    pub fn has_root_path(&self) -> bool {
        self.has_root_name() || self.has_root_directory()
    }

    /// The root name plus root directory, e.g. `//scene/` or `/`.
    fn root_path_string(&self) -> String {
        let mut out = self.root_name().unwrap_or_default();
        if self.has_root_directory() {
            out.push('/');
        }
        out
    }

    /// The root name plus root directory as a path, e.g. `//scene/`.
    pub fn root_path(&self) -> VfsPath {
        VfsPath::new(self.root_path_string())
    }

    /// The trail after the root, in its original spelling.
    pub fn relative_part(&self) -> VfsPath {
        VfsPath::new(&self.inner[self.relative_start()..])
    }

    /// Non-empty components of the relative trail.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner[self.relative_start()..]
            .split(is_sep)
            .filter(|c| !c.is_empty())
    }

    fn ends_with_separator(&self) -> bool {
        self.inner.chars().last().map(is_sep).unwrap_or(false)
    }

    /// True when the path spells out a trailing directory marker, either as a
    /// trailing separator or a final `.` component.
    fn has_trailing_marker(&self) -> bool {
        let has_components = self.components().next().is_some();
        (has_components && self.ends_with_separator()) || self.file_name() == Some(".")
    }

    /// The last component, unless the path ends with a separator.
    pub fn file_name(&self) -> Option<&str> {
        if self.ends_with_separator() {
            return None;
        }
        self.components().last()
    }

    pub fn file_name_is_dot(&self) -> bool {
        self.file_name() == Some(".")
    }

    pub fn file_name_is_dot_dot(&self) -> bool {
        self.file_name() == Some("..")
    }

    /// The path without its last component.
    ///
    /// A path that is only a root is its own parent; a relative single
    /// component has an empty parent.
    pub fn parent(&self) -> VfsPath {
        let comps: Vec<&str> = self.components().collect();
        if comps.is_empty() {
            return VfsPath::new(self.root_path_string());
        }
        if self.ends_with_separator() {
            let mut out = self.root_path_string();
            out.push_str(&comps.join("/"));
            return VfsPath::new(out);
        }
        let mut out = self.root_path_string();
        out.push_str(&comps[..comps.len() - 1].join("/"));
        VfsPath::new(out)
    }

    /// Lexical join with `operator/` semantics: an absolute right-hand side,
    /// or one rooted in a different tree, replaces the left-hand side.
    pub fn join(&self, other: impl Into<VfsPath>) -> VfsPath {
        let other = other.into();
        if other.is_absolute()
            || (other.has_root_name() && other.root_name() != self.root_name())
        {
            return other;
        }
        if other.has_root_directory() {
            let mut out = self.root_name().unwrap_or_default();
            out.push_str(other.as_str());
            return VfsPath::new(out);
        }
        let mut out = self.inner.clone();
        if !out.is_empty() && !self.ends_with_separator() {
            out.push('/');
        }
        out.push_str(other.as_str());
        VfsPath::new(out)
    }

    /// Collapses `.` components, resolves `name/..` pairs lexically and
    /// normalizes separators. A trailing separator survives normalization;
    /// a path that reduces to nothing becomes `.`.
    pub fn lexically_normal(&self) -> VfsPath {
        if self.inner.is_empty() {
            return VfsPath::default();
        }

        let root_dir = self.has_root_directory();
        let mut out: Vec<&str> = Vec::new();
        for comp in self.components() {
            match comp {
                "." => {}
                ".." => match out.last() {
                    Some(&"..") => out.push(".."),
                    Some(_) => {
                        out.pop();
                    }
                    None if root_dir => {}
                    None => out.push(".."),
                },
                other => out.push(other),
            }
        }

        let trailing =
            self.has_trailing_marker() && !out.is_empty() && *out.last().unwrap() != "..";

        let mut result = self.root_path_string();
        result.push_str(&out.join("/"));
        if trailing {
            result.push('/');
        }
        if result.is_empty() {
            result.push('.');
        }
        VfsPath::new(result)
    }

    /// The shortest path that, joined onto `base`, names the same location.
    ///
    /// Returns the empty path when no such path exists (differing root names
    /// or mismatched absoluteness).
    pub fn lexically_relative(&self, base: &VfsPath) -> VfsPath {
        if self.root_name() != base.root_name()
            || self.is_absolute() != base.is_absolute()
            || (!self.has_root_directory() && base.has_root_directory())
        {
            return VfsPath::default();
        }

        let a: Vec<&str> = self.components().filter(|c| *c != ".").collect();
        let b: Vec<&str> = base.components().filter(|c| *c != ".").collect();

        let mut i = 0;
        while i < a.len() && i < b.len() && a[i] == b[i] {
            i += 1;
        }

        let mut n: i64 = 0;
        for comp in &b[i..] {
            if *comp == ".." {
                n -= 1;
            } else {
                n += 1;
            }
        }
        if n < 0 {
            return VfsPath::default();
        }
        if n == 0 && i >= a.len() {
            return VfsPath::new(".");
        }

        let mut pieces: Vec<&str> = Vec::new();
        for _ in 0..n {
            pieces.push("..");
        }
        pieces.extend_from_slice(&a[i..]);
        if pieces.is_empty() {
            return VfsPath::new(".");
        }
        VfsPath::new(pieces.join("/"))
    }
}

impl PartialEq for VfsPath {
    fn eq(&self, other: &Self) -> bool {
        self.root_name() == other.root_name()
            && self.has_root_directory() == other.has_root_directory()
            && self.ends_with_separator() == other.ends_with_separator()
            && self.components().eq(other.components())
    }
}

impl Eq for VfsPath {}

impl Hash for VfsPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root_name().hash(state);
        self.has_root_directory().hash(state);
        self.ends_with_separator().hash(state);
        for comp in self.components() {
            comp.hash(state);
        }
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for VfsPath {
    fn from(s: &str) -> Self {
        VfsPath::new(s)
    }
}

impl From<String> for VfsPath {
    fn from(s: String) -> Self {
        VfsPath::new(s)
    }
}

impl From<&String> for VfsPath {
    fn from(s: &String) -> Self {
        VfsPath::new(s.clone())
    }
}

impl From<&VfsPath> for VfsPath {
    fn from(p: &VfsPath) -> Self {
        p.clone()
    }
}

impl From<&Path> for VfsPath {
    fn from(p: &Path) -> Self {
        VfsPath::new(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for VfsPath {
    fn from(p: PathBuf) -> Self {
        VfsPath::new(p.to_string_lossy().into_owned())
    }
}

impl AsRef<str> for VfsPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(s: &str) -> String {
        VfsPath::new(s).lexically_normal().as_str().to_string()
    }

    fn relative(p: &str, base: &str) -> String {
        VfsPath::new(p)
            .lexically_relative(&VfsPath::new(base))
            .as_str()
            .to_string()
    }

    #[test]
    fn test_root_name_parsing() {
        let p = VfsPath::new("//scene/images/cam0.exr");
        assert_eq!(p.root_name().as_deref(), Some("//scene"));
        assert!(p.has_root_directory());
        assert!(p.is_absolute());
        assert_eq!(p.components().collect::<Vec<_>>(), ["images", "cam0.exr"]);
    }

    #[test]
    fn test_root_name_without_directory() {
        let p = VfsPath::new("//scene");
        assert_eq!(p.root_name().as_deref(), Some("//scene"));
        assert!(!p.has_root_directory());
        assert!(!p.is_absolute());
        assert!(p.has_root_path());
    }

    #[test]
    fn test_plain_absolute() {
        let p = VfsPath::new("/tmp/out.ply");
        assert!(p.root_name().is_none());
        assert!(p.is_absolute());
    }

    #[test]
    fn test_triple_slash_is_not_a_root_name() {
        let p = VfsPath::new("///tmp/x");
        assert!(p.root_name().is_none());
        assert!(p.is_absolute());
        assert_eq!(p.components().collect::<Vec<_>>(), ["tmp", "x"]);
    }

    #[test]
    fn test_backslash_separators() {
        let p = VfsPath::new("\\\\scene\\images\\cam0.exr");
        assert_eq!(p.root_name().as_deref(), Some("//scene"));
        assert!(p.has_root_directory());
        assert_eq!(p, VfsPath::new("//scene/images/cam0.exr"));
    }

    #[test]
    fn test_equality_ignores_separator_runs() {
        assert_eq!(VfsPath::new("a/b"), VfsPath::new("a//b"));
        assert_eq!(VfsPath::new("a/b"), VfsPath::new("a\\b"));
        assert_ne!(VfsPath::new("a/b"), VfsPath::new("a/b/"));
        assert_ne!(VfsPath::new("/a/b"), VfsPath::new("a/b"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(VfsPath::new("//scene/a/b").file_name(), Some("b"));
        assert_eq!(VfsPath::new("//scene/a/").file_name(), None);
        assert_eq!(VfsPath::new("a/.").file_name(), Some("."));
        assert!(VfsPath::new("a/.").file_name_is_dot());
        assert!(VfsPath::new("a/..").file_name_is_dot_dot());
    }

    #[test]
    fn test_parent() {
        assert_eq!(VfsPath::new("//scene/a/b").parent(), VfsPath::new("//scene/a"));
        assert_eq!(VfsPath::new("//scene/a").parent(), VfsPath::new("//scene/"));
        assert_eq!(VfsPath::new("//scene/a/b/").parent(), VfsPath::new("//scene/a/b"));
        assert_eq!(VfsPath::new("/a").parent(), VfsPath::new("/"));
        assert_eq!(VfsPath::new("a").parent(), VfsPath::new(""));
        assert_eq!(VfsPath::new("/").parent(), VfsPath::new("/"));
    }

    #[test]
    fn test_join() {
        assert_eq!(
            VfsPath::new("//scene/a").join("b/c"),
            VfsPath::new("//scene/a/b/c")
        );
        assert_eq!(VfsPath::new("//scene/").join("f"), VfsPath::new("//scene/f"));
        assert_eq!(VfsPath::new("a").join("/b"), VfsPath::new("/b"));
        assert_eq!(
            VfsPath::new("//scene/a").join("//other/b"),
            VfsPath::new("//other/b")
        );
        assert_eq!(VfsPath::new("").join("x"), VfsPath::new("x"));
    }

    #[test]
    fn test_lexically_normal() {
        assert_eq!(normal("a/./b/../c"), "a/c");
        assert_eq!(normal("a/b/.."), "a");
        assert_eq!(normal("a/.."), ".");
        assert_eq!(normal("../a"), "../a");
        assert_eq!(normal("a/../.."), "..");
        assert_eq!(normal("/../a"), "/a");
        assert_eq!(normal("//scene/a//b/./c"), "//scene/a/b/c");
        assert_eq!(normal("//scene/"), "//scene/");
        assert_eq!(normal("/"), "/");
        assert_eq!(normal("a/b/"), "a/b/");
        assert_eq!(normal("a/b/."), "a/b/");
        assert_eq!(normal("."), ".");
        assert_eq!(normal(""), "");
    }

    #[test]
    fn test_lexically_normal_is_idempotent() {
        for input in ["a/./b/../c/", "//scene/x/../y", "../../a", "/a/b/../../c"] {
            let once = VfsPath::new(input).lexically_normal();
            let twice = once.lexically_normal();
            assert_eq!(once, twice, "normalizing {input:?} twice changed it");
        }
    }

    #[test]
    fn test_lexically_relative() {
        assert_eq!(relative("/a/d", "/a/b/c"), "../../d");
        assert_eq!(relative("a/b/c", "a"), "b/c");
        assert_eq!(relative("a/b/c", "a/b/c/x/y"), "../..");
        assert_eq!(relative("a/b/c", "a/b/c"), ".");
        assert_eq!(relative("//scene/a", "//scene/b"), "../a");
    }

    #[test]
    fn test_lexically_relative_no_relation() {
        assert_eq!(relative("//scene/a", "//other/b"), "");
        assert_eq!(relative("/a", "b"), "");
        assert_eq!(relative("a", "/b"), "");
    }
}
