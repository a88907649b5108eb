//! BIP-39 wordlists.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Number of words in a BIP-39 wordlist
pub const WORDLIST_LEN: usize = 2048;

/// An immutable list of 2048 distinct words; line order is the word index
#[derive(Debug, Clone)]
pub struct Wordlist {
    words: Vec<String>,
    index: HashMap<String, u16>,
    max_word_len: usize,
}

impl Wordlist {
    /// Loads a wordlist file with one word per line. Surrounding whitespace
    /// and blank lines are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let wordlist = Self::from_words(text.lines().map(str::trim).filter(|l| !l.is_empty()))?;
        debug!(
            "loaded {} words from {}",
            wordlist.len(),
            path.display()
        );
        Ok(wordlist)
    }

    /// Builds a wordlist from words in index order
    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.len() != WORDLIST_LEN {
            return Err(Error::wordlist(format!(
                "expected {} words, found {}",
                WORDLIST_LEN,
                words.len()
            )));
        }

        let mut index = HashMap::with_capacity(WORDLIST_LEN);
        let mut max_word_len = 0;
        for (i, word) in words.iter().enumerate() {
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                return Err(Error::wordlist(format!("word {} is not a single word", i)));
            }
            if index.insert(word.clone(), i as u16).is_some() {
                return Err(Error::wordlist(format!("duplicate word '{}'", word)));
            }
            max_word_len = max_word_len.max(word.len());
        }

        Ok(Self {
            words,
            index,
            max_word_len,
        })
    }

    /// Index of a word, if present
    pub fn index_of(&self, word: &str) -> Option<u16> {
        self.index.get(word).copied()
    }

    /// Index of a UTF-8 encoded word, if present
    pub fn index_of_bytes(&self, word: &[u8]) -> Option<u16> {
        std::str::from_utf8(word).ok().and_then(|w| self.index_of(w))
    }

    /// Word at an index. Panics if `index >= 2048`.
    pub fn word(&self, index: u16) -> &str {
        &self.words[index as usize]
    }

    /// Longest word in bytes
    pub fn max_word_len(&self) -> usize {
        self.max_word_len
    }

    /// Always 2048
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Never true for a constructed wordlist
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn words() -> Vec<String> {
        (0..2048).map(|i| format!("w{:04}", i)).collect()
    }

    #[test]
    fn test_from_words() {
        let wordlist = Wordlist::from_words(words()).unwrap();
        assert_eq!(wordlist.len(), 2048);
        assert_eq!(wordlist.index_of("w0042"), Some(42));
        assert_eq!(wordlist.index_of_bytes(b"w2047"), Some(2047));
        assert_eq!(wordlist.word(7), "w0007");
        assert_eq!(wordlist.index_of("abandon"), None);
        assert_eq!(wordlist.max_word_len(), 5);
    }

    #[test]
    fn test_wrong_length() {
        let err = Wordlist::from_words(words().into_iter().take(2047)).unwrap_err();
        assert!(err.to_string().contains("expected 2048 words, found 2047"));
    }

    #[test]
    fn test_duplicate_word() {
        let mut list = words();
        list[10] = "w0003".to_string();
        assert!(matches!(
            Wordlist::from_words(list),
            Err(Error::Wordlist { .. })
        ));
    }

    #[test]
    fn test_load_file_with_crlf_and_trailing_newline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for word in words() {
            write!(file, "{}\r\n", word).unwrap();
        }
        writeln!(file).unwrap();
        file.flush().unwrap();

        let wordlist = Wordlist::load(file.path()).unwrap();
        assert_eq!(wordlist.index_of("w1000"), Some(1000));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Wordlist::load("/no/such/english.txt"),
            Err(Error::FileNotFound { .. })
        ));
    }
}
