//! Path segment handling shared by the archive reader and the VFS
//!
//! Two distinct rules live here. [`segments`] is the literal rule: every
//! non-empty segment is a child name, `.` and `..` included. [`navigate`] is
//! the navigational rule used when changing directory: `.` stays put and `..`
//! climbs, but never above the home directory.

/// Non-empty segments of `path`, taken at face value.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Join segments into an absolute path (`/` for none).
pub fn to_absolute<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(segment.as_ref());
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Normalize an archive member name: drops leading `/`, `./` and empty
/// segments. Returns `None` when nothing remains.
pub fn normalize(raw: &str) -> Option<String> {
    let parts: Vec<&str> = segments(raw).filter(|segment| *segment != ".").collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Apply `path` to a starting position using navigational rules.
///
/// Absolute paths start from `[home]`; a leading `home` segment is consumed so
/// that `/bs/a` and `/a` land in the same place. Relative paths start from
/// `cwd`. The first segment of the result is never popped.
pub fn navigate(cwd: &[String], home: &str, path: &str) -> Vec<String> {
    let absolute = is_absolute(path);
    let mut stack = if absolute {
        vec![home.to_string()]
    } else {
        cwd.to_vec()
    };

    let mut parts = segments(path).peekable();
    if absolute && parts.peek() == Some(&home) {
        parts.next();
    }

    for part in parts {
        match part {
            "." => {}
            ".." => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            name => stack.push(name.to_string()),
        }
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_segments_keep_dots() {
        let parts: Vec<_> = segments("/bs//a/./../b/").collect();
        assert_eq!(parts, vec!["bs", "a", ".", "..", "b"]);
    }

    #[test]
    fn test_to_absolute() {
        assert_eq!(to_absolute(&["bs", "a"]), "/bs/a");
        assert_eq!(to_absolute::<&str>(&[]), "/");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("./a/b.txt").as_deref(), Some("a/b.txt"));
        assert_eq!(normalize("/dir/").as_deref(), Some("dir"));
        assert_eq!(normalize("./"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_navigate_relative() {
        let start = cwd(&["bs", "a"]);
        assert_eq!(navigate(&start, "bs", "b/c"), cwd(&["bs", "a", "b", "c"]));
        assert_eq!(navigate(&start, "bs", ".."), cwd(&["bs"]));
        assert_eq!(navigate(&start, "bs", "./b/../c"), cwd(&["bs", "a", "c"]));
        assert_eq!(navigate(&start, "bs", ""), start);
    }

    #[test]
    fn test_navigate_never_pops_home() {
        let start = cwd(&["bs"]);
        assert_eq!(navigate(&start, "bs", "../../.."), cwd(&["bs"]));
        assert_eq!(navigate(&start, "bs", "/../x"), cwd(&["bs", "x"]));
    }

    #[test]
    fn test_navigate_absolute() {
        let start = cwd(&["bs", "deep", "down"]);
        assert_eq!(navigate(&start, "bs", "/a"), cwd(&["bs", "a"]));
        assert_eq!(navigate(&start, "bs", "/bs/a"), cwd(&["bs", "a"]));
        assert_eq!(navigate(&start, "bs", "/bs"), cwd(&["bs"]));
    }
}
