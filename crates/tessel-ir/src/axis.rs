//! Canonical names for generated loop axes (`i`, `j`, `k`, ...).
//!
//! Level `n` below 26 maps to a single letter. Deeper levels reuse the
//! letters with a repeat count appended: level 26 is `i1`, level 27 is `j1`.

use std::borrow::Cow;

use crate::ir::{Expr, Var};

const AXIS_NAMES: [&str; 26] = [
    "i", "j", "k", "a", "b", "c", "d", "e", "f", "g", "h", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

/// Predefined axis name for nesting `level`.
pub fn axis_name(level: usize) -> Cow<'static, str> {
    match AXIS_NAMES.get(level) {
        Some(name) => Cow::Borrowed(*name),
        None => Cow::Owned(format!(
            "{}{}",
            AXIS_NAMES[level % AXIS_NAMES.len()],
            level / AXIS_NAMES.len()
        )),
    }
}

/// Generate `naxis` axes named `axis_name(0)`, `axis_name(1)`, ...
pub fn gen_default_axis(naxis: usize) -> Vec<Var> {
    (0..naxis).map(|level| Var::new(axis_name(level))).collect()
}

pub fn gen_default_axis_as_expr(naxis: usize) -> Vec<Expr> {
    gen_default_axis(naxis).into_iter().map(Expr::Var).collect()
}

/// Whether `name` is one of the names [`axis_name`] can produce.
pub fn is_axis_name_reserved(name: &str) -> bool {
    if AXIS_NAMES.contains(&name) {
        return true;
    }
    let Some((base, repeat)) = name.split_at_checked(1) else {
        return false;
    };
    AXIS_NAMES.contains(&base)
        && !repeat.starts_with('0')
        && !repeat.is_empty()
        && repeat.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_name_first_levels() {
        assert_eq!(axis_name(0), "i");
        assert_eq!(axis_name(1), "j");
        assert_eq!(axis_name(2), "k");
        assert_eq!(axis_name(3), "a");
        assert_eq!(axis_name(25), "z");
    }

    #[test]
    fn test_axis_name_wraps_with_repeat_count() {
        assert_eq!(axis_name(26), "i1");
        assert_eq!(axis_name(27), "j1");
        assert_eq!(axis_name(52), "i2");
    }

    #[test]
    fn test_gen_default_axis() {
        let axes = gen_default_axis(3);
        let names: Vec<_> = axes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["i", "j", "k"]);

        let exprs = gen_default_axis_as_expr(2);
        assert_eq!(exprs, [Expr::var("i"), Expr::var("j")]);
        assert!(gen_default_axis(0).is_empty());
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_axis_name_reserved("i"));
        assert!(is_axis_name_reserved("z"));
        assert!(is_axis_name_reserved("k3"));
        assert!(!is_axis_name_reserved("i0"));
        assert!(!is_axis_name_reserved("ii"));
        assert!(!is_axis_name_reserved("blockIdx.x"));
        assert!(!is_axis_name_reserved(""));
        for level in 0..80 {
            assert!(is_axis_name_reserved(&axis_name(level)), "level {level}");
        }
    }
}
