//! Object-store key derivation (SPEC_FULL 3): `users/{owner}{path}` for the
//! original upload, `users/{owner}{parent}/{name}_optimized{ext}` for the
//! OCR'd derivative.

/// Split a materialized path into its parent directory and file name.
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

pub fn original_key(owner_id: &str, path: &str) -> String {
    format!("users/{owner_id}{path}")
}

pub fn optimized_key(owner_id: &str, path: &str) -> String {
    let (parent, name) = split_path(path);
    let (stem, ext) = match name.rfind('.') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    };
    format!("users/{owner_id}{parent}/{stem}_optimized{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_key_is_owner_prefixed_path() {
        assert_eq!(original_key("u1", "/a/x.pdf"), "users/u1/a/x.pdf");
    }

    #[test]
    fn optimized_key_inserts_suffix_before_extension() {
        assert_eq!(
            optimized_key("u1", "/a/x.pdf"),
            "users/u1/a/x_optimized.pdf"
        );
    }

    #[test]
    fn optimized_key_handles_root_level_file() {
        assert_eq!(optimized_key("u1", "/x.pdf"), "users/u1/x_optimized.pdf");
    }
}
