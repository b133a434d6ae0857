/// Running concatenation of the fragments of one request. Append-only.
#[derive(Debug, Default)]
pub(super) struct Accumulator {
    text: String,
    fragments: usize,
}

impl Accumulator {
    /// Appends `fragment` and returns the whole answer so far, or `None` when
    /// the fragment was empty and nothing changed.
    pub fn push(&mut self, fragment: &str) -> Option<&str> {
        if fragment.is_empty() {
            return None;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
        Some(&self.text)
    }

    pub const fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_in_order() {
        let mut acc = Accumulator::default();
        assert_eq!(acc.push("Hi"), Some("Hi"));
        assert_eq!(acc.push(" there"), Some("Hi there"));
        assert_eq!(acc.fragments(), 2);
        assert_eq!(acc.into_text(), "Hi there");
    }

    #[test]
    fn empty_fragment_changes_nothing() {
        let mut acc = Accumulator::default();
        acc.push("a");
        assert_eq!(acc.push(""), None);
        assert_eq!(acc.fragments(), 1);
        assert_eq!(acc.into_text(), "a");
    }
}
