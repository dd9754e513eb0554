//! Porter stemming algorithm.
//!
//! The classic five-step suffix stripper from M. F. Porter, "An algorithm for
//! suffix stripping" (1980). It works on lowercase ASCII words; any word with
//! non-ASCII letters, digits or other symbols is returned unchanged, so the
//! stemmer never fails on arbitrary input.
//!
//! ```
//! use placedex::analysis::token_filter::stem::Stemmer;
//! use placedex::analysis::token_filter::stem::porter::PorterStemmer;
//!
//! let stemmer = PorterStemmer::new();
//! assert_eq!(stemmer.stem("running"), "run");
//! assert_eq!(stemmer.stem("traditional"), "tradit");
//! ```

use crate::analysis::token_filter::stem::Stemmer;

#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

impl PorterStemmer {
    pub fn new() -> Self {
        PorterStemmer
    }
}

impl Stemmer for PorterStemmer {
    fn stem(&self, word: &str) -> String {
        if word.len() <= 2 || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return word.to_string();
        }

        let mut w = Word {
            b: word.as_bytes().to_vec(),
            len: word.len(),
            j: 0,
        };
        w.step1ab();
        if w.len > 1 {
            w.step1c();
            w.step2();
            w.step3();
            w.step4();
            w.step5();
        }
        w.b.truncate(w.len);

        // Only ASCII bytes were touched, so the buffer is still valid UTF-8.
        String::from_utf8(w.b).unwrap_or_else(|_| word.to_string())
    }

    fn name(&self) -> &'static str {
        "porter"
    }
}

/// Working buffer: `b[..len]` is the current word and `b[..j]` the stem left
/// in front of the suffix matched by the last successful `ends` call.
struct Word {
    b: Vec<u8>,
    len: usize,
    j: usize,
}

impl Word {
    fn cons(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.cons(i - 1),
            _ => true,
        }
    }

    /// Number of vowel-consonant sequences in the stem `b[..j]`.
    fn m(&self) -> usize {
        let mut n = 0;
        let mut i = 0;
        while i < self.j && self.cons(i) {
            i += 1;
        }
        loop {
            while i < self.j && !self.cons(i) {
                i += 1;
            }
            if i >= self.j {
                return n;
            }
            while i < self.j && self.cons(i) {
                i += 1;
            }
            n += 1;
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (0..self.j).any(|i| !self.cons(i))
    }

    fn double_cons(&self, i: usize) -> bool {
        i >= 1 && self.b[i] == self.b[i - 1] && self.cons(i)
    }

    /// consonant-vowel-consonant ending at `i`, where the last consonant is
    /// not w, x or y.
    fn cvc(&self, i: usize) -> bool {
        if i < 2 || !self.cons(i) || self.cons(i - 1) || !self.cons(i - 2) {
            return false;
        }
        !matches!(self.b[i], b'w' | b'x' | b'y')
    }

    fn ends(&mut self, suffix: &str) -> bool {
        let s = suffix.as_bytes();
        if s.len() > self.len || &self.b[self.len - s.len()..self.len] != s {
            return false;
        }
        self.j = self.len - s.len();
        true
    }

    fn set_to(&mut self, s: &str) {
        self.b.truncate(self.j);
        self.b.extend_from_slice(s.as_bytes());
        self.len = self.j + s.len();
    }

    fn step1ab(&mut self) {
        if self.b[self.len - 1] == b's' {
            if self.ends("sses") {
                self.len -= 2;
            } else if self.ends("ies") {
                self.set_to("i");
            } else if self.b[self.len - 2] != b's' {
                self.len -= 1;
            }
        }
        if self.ends("eed") {
            if self.m() > 0 {
                self.len -= 1;
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.len = self.j;
            if self.ends("at") {
                self.set_to("ate");
            } else if self.ends("bl") {
                self.set_to("ble");
            } else if self.ends("iz") {
                self.set_to("ize");
            } else if self.double_cons(self.len - 1) {
                self.len -= 1;
                if matches!(self.b[self.len - 1], b'l' | b's' | b'z') {
                    self.len += 1;
                }
            } else {
                self.j = self.len;
                if self.m() == 1 && self.cvc(self.len - 1) {
                    self.set_to("e");
                }
            }
        }
    }

    fn step1c(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            self.b[self.len - 1] = b'i';
        }
    }

    fn step2(&mut self) {
        const RULES: &[(&str, &str)] = &[
            ("ational", "ate"),
            ("tional", "tion"),
            ("enci", "ence"),
            ("anci", "ance"),
            ("izer", "ize"),
            ("bli", "ble"),
            ("alli", "al"),
            ("entli", "ent"),
            ("eli", "e"),
            ("ousli", "ous"),
            ("ization", "ize"),
            ("ation", "ate"),
            ("ator", "ate"),
            ("alism", "al"),
            ("iveness", "ive"),
            ("fulness", "ful"),
            ("ousness", "ous"),
            ("aliti", "al"),
            ("iviti", "ive"),
            ("biliti", "ble"),
            ("logi", "log"),
        ];
        self.apply_first(RULES);
    }

    fn step3(&mut self) {
        const RULES: &[(&str, &str)] = &[
            ("icate", "ic"),
            ("ative", ""),
            ("alize", "al"),
            ("iciti", "ic"),
            ("ical", "ic"),
            ("ful", ""),
            ("ness", ""),
        ];
        self.apply_first(RULES);
    }

    /// Apply the first rule whose suffix matches. Later rules are not tried
    /// even when the measure condition rejects the match.
    fn apply_first(&mut self, rules: &[(&str, &str)]) {
        for (suffix, replacement) in rules {
            if self.ends(suffix) {
                if self.m() > 0 {
                    self.set_to(replacement);
                }
                return;
            }
        }
    }

    fn step4(&mut self) {
        const SUFFIXES: &[&str] = &[
            "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion",
            "ou", "ism", "ate", "iti", "ous", "ive", "ize",
        ];
        let Some(suffix) = SUFFIXES.iter().copied().find(|s| self.ends(s)) else {
            return;
        };
        if suffix == "ion" && (self.j == 0 || !matches!(self.b[self.j - 1], b's' | b't')) {
            return;
        }
        if self.m() > 1 {
            self.len = self.j;
        }
    }

    fn step5(&mut self) {
        self.j = self.len;
        if self.b[self.len - 1] == b'e' {
            let m = self.m();
            if m > 1 || (m == 1 && !self.cvc(self.len - 2)) {
                self.len -= 1;
            }
        }
        if self.b[self.len - 1] == b'l' && self.double_cons(self.len - 1) && self.m() > 1 {
            self.len -= 1;
        }
    }
}
