/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Path canonicalization and the file write policy.

use std::path::{Path, PathBuf};

/// Canonicalizes a path, following symlinks.
pub(crate) fn canonical(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

/// A file may be rewritten iff it was named on the command line or its
/// canonical path is a descendant of the base directory.
pub(crate) fn can_write(path: &Path, explicit: &[PathBuf], base_dir: &Path) -> bool {
    let Some(canon) = canonical(path) else {
        return false;
    };
    if explicit.iter().any(|entry| entry == &canon) {
        return true;
    }
    match canonical(base_dir) {
        Some(base) => canon.starts_with(&base),
        None => false,
    }
}

/// Builds the output path `<dir>/<stem>.<postfix>.<ext>` next to the input.
pub(crate) fn output_path(path: &Path, postfix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{postfix}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{postfix}"),
    };
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_inserts_postfix_before_extension() {
        assert_eq!(
            output_path(Path::new("/foo/bar/a.c"), "checked"),
            PathBuf::from("/foo/bar/a.checked.c")
        );
    }

    #[test]
    fn output_path_handles_missing_extension() {
        assert_eq!(
            output_path(Path::new("prog"), "checked"),
            PathBuf::from("prog.checked")
        );
    }
}
