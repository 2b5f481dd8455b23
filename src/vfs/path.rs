//! Helpers for absolute, slash separated virtual paths.

/// Path of the volume root.
pub const ROOT: &str = "/";

/// Parent of `path`, `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Prefix shared by every child path of `dir`.
pub fn child_prefix(dir: &str) -> String {
    if dir == ROOT {
        ROOT.to_string()
    } else {
        format!("{dir}/")
    }
}

pub fn join(dir: &str, name: &str) -> String {
    format!("{}{}", child_prefix(dir), name)
}

/// Virtual path of an archive tree node.
pub fn from_archive(id: &str) -> String {
    format!("/{id}")
}

/// Archive tree path of a virtual path.
pub fn to_archive(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Resolve `arg` against the directory `cwd`, handling `.` and `..`.
pub fn resolve(cwd: &str, arg: &str) -> String {
    let mut segments: Vec<&str> = if arg.starts_with('/') {
        Vec::new()
    } else {
        cwd.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in arg.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }
    format!("/{}", segments.join("/"))
}
