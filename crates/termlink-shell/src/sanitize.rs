//! Line sanitizer: turns a raw terminal line into visible text.
//!
//! Three passes, in order:
//!
//! 1. Remove complete ANSI escape sequences (OSC, CSI, `nF` charset
//!    designations and two-byte `Fp`/`Fe`/`Fs` escapes). A sequence still
//!    open at the end of the text (an OSC with no BEL/ST yet, a CSI with no
//!    final byte, a lone trailing ESC) is withheld from the visible result.
//!    The reader keeps the raw bytes, so the sequence is removed whole once
//!    the rest of it arrives.
//! 2. Carriage-return overwrite: only the text after the last `\r` is shown,
//!    unless that remainder is empty, in which case the whole line is shown.
//! 3. Drop remaining C0 control bytes and DEL. A stray ESC that did not start
//!    a recognised sequence is dropped here; the bytes following it stay as
//!    literal text.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// The two-byte class leaves out `[` and `]` so an unfinished CSI or OSC
    /// is never mistaken for a complete escape.
    static ref ANSI_ESCAPE: Regex = Regex::new(
        r"\x1b(?:\][^\x07\x1b]*(?:\x07|\x1b\\)|\[[0-?]*[ -/]*[@-~]|[ -/]+[0-~]|[0-Z\\^-~])"
    )
    .expect("valid ANSI escape regex");

    static ref INCOMPLETE_ESCAPE: Regex = Regex::new(
        r"\x1b(?:\][^\x07\x1b]*\x1b?|\[[0-?]*[ -/]*|[ -/]+)?$"
    )
    .expect("valid incomplete escape regex");

    /// C0 controls except TAB, LF and CR, plus DEL.
    static ref CONTROL_CHARS: Regex =
        Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f]").expect("valid control char regex");
}

/// Remove ANSI escape sequences, withholding one left open at the end.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    let stripped = strip_complete_ansi(text);
    match INCOMPLETE_ESCAPE.find(&stripped) {
        Some(tail) => Cow::Owned(stripped[..tail.start()].to_string()),
        None => stripped,
    }
}

/// Remove complete escape sequences only, leaving open and stray ones.
pub(crate) fn strip_complete_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// Whether `text` starts with an escape sequence still missing bytes.
pub(crate) fn is_open_escape(text: &str) -> bool {
    INCOMPLETE_ESCAPE
        .find(text)
        .is_some_and(|m| m.start() == 0)
}

/// Apply carriage-return overwrite to an escape-free line.
///
/// Returns the segment after the last `\r`; if that segment is empty, the
/// whole line with trailing `\r`/`\n` removed.
pub fn overwrite_carriage_returns(text: &str) -> &str {
    let trimmed = text.trim_end_matches(['\r', '\n']);
    match trimmed.rsplit('\r').next() {
        Some(last) if !last.is_empty() => last,
        _ => trimmed,
    }
}

/// Remove C0 control bytes (except TAB, LF, CR) and DEL.
pub fn strip_control_chars(text: &str) -> Cow<'_, str> {
    CONTROL_CHARS.replace_all(text, "")
}

/// Convert a raw line into its visible form.
///
/// Never fails: malformed sequences degrade to literal text or are dropped.
///
/// ```
/// use termlink_shell::sanitize;
///
/// assert_eq!(sanitize("\x1b[31mERROR\x1b[0m"), "ERROR");
/// assert_eq!(sanitize("50%\r75%\r100%"), "100%");
/// assert_eq!(sanitize("Password: \r"), "Password: ");
/// ```
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let stripped = strip_ansi(raw);
    let visible = overwrite_carriage_returns(&stripped);
    strip_control_chars(visible).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ascii_is_identity() {
        let text = "total 42 drwxr-xr-x  2 user staff   64 Jan  1 12:00 src";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_csi_color_removed() {
        assert_eq!(sanitize("\x1b[31mERROR\x1b[0m\n"), "ERROR");
    }

    #[test]
    fn test_csi_private_modes_removed() {
        assert_eq!(sanitize("\x1b[?2004h$ ls"), "$ ls");
        assert_eq!(sanitize("\x1b[1;35H\x1b[?1004hlogin:"), "login:");
    }

    #[test]
    fn test_password_prompt_kept_when_remainder_empty() {
        assert_eq!(sanitize("Password: \r"), "Password: ");
    }

    #[test]
    fn test_progress_overwrite() {
        assert_eq!(sanitize("50%\r75%\r100%\n"), "100%");
    }

    #[test]
    fn test_crlf_line_ending_is_not_overwrite() {
        assert_eq!(sanitize("hello\r\n"), "hello");
        assert_eq!(sanitize("hello\r"), "hello");
    }

    #[test]
    fn test_osc_title_terminated_by_bel() {
        assert_eq!(sanitize("\x1b]0;user@host: ~\x07$ "), "$ ");
    }

    #[test]
    fn test_osc_title_terminated_by_st() {
        assert_eq!(sanitize("\x1b]2;title\x1b\\prompt> "), "prompt> ");
    }

    #[test]
    fn test_osc_does_not_swallow_text_after_bel() {
        assert_eq!(
            sanitize("\x1b]0;t\x07visible\x1b]0;u\x1b\\"),
            "visible"
        );
    }

    #[test]
    fn test_unterminated_osc_withheld() {
        assert_eq!(sanitize("before\x1b]0;half a tit"), "before");
        assert_eq!(sanitize("before\x1b]0;title\x1b"), "before");
    }

    #[test]
    fn test_incomplete_csi_withheld() {
        assert_eq!(sanitize("text\x1b[3"), "text");
        assert_eq!(sanitize("text\x1b["), "text");
        assert_eq!(sanitize("text\x1b"), "text");
    }

    #[test]
    fn test_two_byte_escapes_removed() {
        // DECSC / DECRC / RI / keypad mode
        assert_eq!(sanitize("\x1b7saved\x1b8\x1bM\x1b="), "saved");
    }

    #[test]
    fn test_charset_designation_removed() {
        // what `tput sgr0` emits
        assert_eq!(sanitize("bold\x1b(B\x1b[m off"), "bold off");
    }

    #[test]
    fn test_stray_escape_dropped_rest_literal() {
        // ESC followed by a byte outside every recognised class
        assert_eq!(sanitize("a\x1b\u{e9}b"), "a\u{e9}b");
    }

    #[test]
    fn test_bell_and_controls_stripped() {
        assert_eq!(sanitize("ding\x07\x00\x08\x7f!"), "ding!");
    }

    #[test]
    fn test_tab_preserved() {
        assert_eq!(sanitize("a\tb"), "a\tb");
    }

    #[test]
    fn test_overwrite_applies_after_ansi_removal() {
        assert_eq!(sanitize("\x1b[2K\rDownloading 80%\x1b[0m"), "Downloading 80%");
    }

    #[test]
    fn test_only_controls_reduces_to_empty() {
        assert_eq!(sanitize("\x1b[?2004l\r"), "");
        assert_eq!(sanitize("\x07\x07"), "");
    }

    #[test]
    fn test_unicode_passes_through() {
        assert_eq!(sanitize("\x1b[1mＲＯＢＣＯ ✓\x1b[0m"), "ＲＯＢＣＯ ✓");
    }

    #[test]
    fn test_strip_ansi_borrows_clean_text() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_open_escape_detection() {
        assert!(is_open_escape("\x1b"));
        assert!(is_open_escape("\x1b[3"));
        assert!(is_open_escape("\x1b]0;title"));
        assert!(is_open_escape("\x1b]0;title\x1b"));
        assert!(!is_open_escape("\x1b[31m"));
        assert!(!is_open_escape("\x1b]0;title\x07"));
        assert!(!is_open_escape("\x1b[3\x1b[0m"));
        assert!(!is_open_escape("text\x1b["));
    }

    #[test]
    fn test_strip_complete_ansi_keeps_open_tail() {
        assert_eq!(strip_complete_ansi("\x1b[1mok\x1b[3"), "ok\x1b[3");
    }
}
