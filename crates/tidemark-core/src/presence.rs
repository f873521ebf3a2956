//! Typing indicator text.

/// Format the typing indicator for the given display names.
///
/// Names are not enumerated at three or more participants, so the text never
/// grows without bound. Whether to show an indicator at all is the caller's
/// decision (the typing set being non-empty); the empty-slice fallback is the
/// generic label.
pub fn typing_text<S: AsRef<str>>(names: &[S]) -> String {
    match names {
        [] => "Typing...".to_owned(),
        [one] => format!("{} is typing...", one.as_ref()),
        [a, b] => format!("{} and {} are typing...", a.as_ref(), b.as_ref()),
        _ => "Multiple people are typing...".to_owned(),
    }
}
