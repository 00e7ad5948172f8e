// SPDX-License-Identifier: Apache-2.0

use unicode_normalization::UnicodeNormalization;

/// Reduces a client-supplied name to a flat, ASCII-only file name.
///
/// Path separators become spaces, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// trimmed. The result may be empty.
#[must_use]
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_directories_and_unsafe_characters() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("/srv/shared/in.csv"), "srv_shared_in.csv");
        assert_eq!(secure_filename("C:\\data\\q1.xlsx"), "C_data_q1.xlsx");
    }

    #[test]
    fn folds_accents_to_ascii() {
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(secure_filename("r\u{e9}sum\u{e9}.csv"), "resume.csv");
    }

    #[test]
    fn may_end_up_empty() {
        assert_eq!(secure_filename("\u{6f22}\u{5b57}"), "");
        assert_eq!(secure_filename("..."), "");
    }
}
