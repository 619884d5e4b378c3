//! Tokenizer and dictionary lookup (spec §3/§4.2).

use crate::text::encode_text;
use log::debug;

/// One token produced by `tokenize`: the word text plus its byte offset and
/// length in the original input line (used by `sread`/`sread5` to fill in
/// the parse buffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub length: usize,
}

/// Split `line` on spaces, then further split out any dictionary
/// separators (each becomes its own token). Separators other than space are
/// kept as one-character tokens; spaces are discarded entirely. Doubled
/// separators produce empty-length runs which are still recorded: real Z-
/// machine tokenizers report every delimiter occurrence verbatim, trusting
/// the game to decide whether an empty word matters.
pub fn tokenize(line: &str, separators: &[char]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = line.as_bytes();
    let mut word_start: Option<usize> = None;

    let flush = |tokens: &mut Vec<Token>, word_start: &mut Option<usize>, end: usize| {
        if let Some(start) = word_start.take() {
            if end > start {
                tokens.push(Token {
                    text: line[start..end].to_string(),
                    start,
                    length: end - start,
                });
            }
        }
    };

    for (i, &b) in bytes.iter().enumerate() {
        let ch = b as char;
        if ch == ' ' {
            flush(&mut tokens, &mut word_start, i);
        } else if separators.contains(&ch) {
            flush(&mut tokens, &mut word_start, i);
            tokens.push(Token {
                text: ch.to_string(),
                start: i,
                length: 1,
            });
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    flush(&mut tokens, &mut word_start, bytes.len());

    debug!("tokenized {:?} into {} tokens", line, tokens.len());
    tokens
}

/// Binary- or linear-search a dictionary table for `word`, per spec layout:
/// `n_separators` (1B), separators, `entry_length` (1B), `n_entries` (2B,
/// signed: negative means unsorted/linear scan).
pub fn lookup<'a>(memory: &'a [u8], dict_addr: usize, word: &str, entry_key_len: usize) -> Option<usize> {
    let n_sep = memory[dict_addr] as usize;
    let mut pos = dict_addr + 1 + n_sep;
    let entry_length = memory[pos] as usize;
    pos += 1;
    let n_entries_raw = ((memory[pos] as u16) << 8) | memory[pos + 1] as u16;
    let n_entries = n_entries_raw as i16;
    pos += 2;
    let entries_base = pos;

    let key = encode_text(word, entry_key_len);

    let entry_at = |idx: usize| -> &'a [u8] {
        let addr = entries_base + idx * entry_length;
        &memory[addr..addr + entry_key_len]
    };

    if n_entries >= 0 {
        let count = n_entries as usize;
        let (mut lo, mut hi) = (0i64, count as i64 - 1);
        while lo <= hi {
            let mid = ((lo + hi) / 2) as usize;
            match entry_at(mid).cmp(key.as_slice()) {
                std::cmp::Ordering::Equal => return Some(entries_base + mid * entry_length),
                std::cmp::Ordering::Less => lo = mid as i64 + 1,
                std::cmp::Ordering::Greater => hi = mid as i64 - 1,
            }
        }
        None
    } else {
        let count = (-n_entries) as usize;
        (0..count)
            .find(|&idx| entry_at(idx) == key.as_slice())
            .map(|idx| entries_base + idx * entry_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_dict(words: &[&str], entry_key_len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8]; // n_separators = 0
        let entry_length = entry_key_len + 2; // key + 2 data bytes
        bytes.push(entry_length as u8);
        let mut sorted: Vec<&str> = words.to_vec();
        sorted.sort();
        bytes.push((sorted.len() >> 8) as u8);
        bytes.push((sorted.len() & 0xff) as u8);
        for w in &sorted {
            let key = encode_text(w, entry_key_len);
            bytes.extend_from_slice(&key);
            bytes.push(0);
            bytes.push(0);
        }
        bytes
    }

    #[test]
    fn tokenize_splits_on_spaces() {
        let tokens = tokenize("take lantern", &[',', '.']);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "take");
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[1].text, "lantern");
        assert_eq!(tokens[1].start, 5);
    }

    #[test]
    fn tokenize_splits_out_separators() {
        let tokens = tokenize("look,then wait", &[',']);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["look", ",", "then", "wait"]);
    }

    #[test]
    fn lookup_finds_sorted_entry() {
        let words = ["lantern", "sword", "troll", "zork"];
        let dict = build_dict(&words, 4);
        let addr = lookup(&dict, 0, "sword", 4);
        assert!(addr.is_some());
    }

    #[test]
    fn lookup_missing_word_returns_none() {
        let words = ["lantern", "sword"];
        let dict = build_dict(&words, 4);
        assert!(lookup(&dict, 0, "missing", 4).is_none());
    }
}
