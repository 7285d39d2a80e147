use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;

pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_TAB: u32 = 15;

pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;

pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;

pub const KEY_LEFTCTRL: u32 = 29;

pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;

pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;

pub const KEY_LEFTSHIFT: u32 = 42;

pub const KEY_BACKSLASH: u32 = 43;

pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;

pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;

pub const KEY_RIGHTSHIFT: u32 = 54;

pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;

pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

const LETTER_KEYCODES: [u32; 26] = [
    KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F, KEY_G, KEY_H, KEY_I, KEY_J, KEY_K, KEY_L, KEY_M,
    KEY_N, KEY_O, KEY_P, KEY_Q, KEY_R, KEY_S, KEY_T, KEY_U, KEY_V, KEY_W, KEY_X, KEY_Y, KEY_Z,
];

const DIGIT_KEYCODES: [u32; 10] = [
    KEY_0, KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_7, KEY_8, KEY_9,
];

// (unshifted, shifted, keycode)
const SYMBOL_KEYS: &[(char, char, u32)] = &[
    ('1', '!', KEY_1),
    ('2', '@', KEY_2),
    ('3', '#', KEY_3),
    ('4', '$', KEY_4),
    ('5', '%', KEY_5),
    ('6', '^', KEY_6),
    ('7', '&', KEY_7),
    ('8', '*', KEY_8),
    ('9', '(', KEY_9),
    ('0', ')', KEY_0),
    ('-', '_', KEY_MINUS),
    ('=', '+', KEY_EQUAL),
    ('[', '{', KEY_LEFTBRACE),
    (']', '}', KEY_RIGHTBRACE),
    ('\\', '|', KEY_BACKSLASH),
    (';', ':', KEY_SEMICOLON),
    ('\'', '"', KEY_APOSTROPHE),
    ('`', '~', KEY_GRAVE),
    (',', '<', KEY_COMMA),
    ('.', '>', KEY_DOT),
    ('/', '?', KEY_SLASH),
];

/// US-QWERTY keystroke producing `c`, if the layout has one.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    let unshifted = |keycode| KeyStroke {
        keycode,
        shift: false,
    };

    match c {
        'a'..='z' => Some(unshifted(LETTER_KEYCODES[(c as u8 - b'a') as usize])),
        'A'..='Z' => Some(KeyStroke {
            keycode: LETTER_KEYCODES[(c as u8 - b'A') as usize],
            shift: true,
        }),
        '0'..='9' => Some(unshifted(DIGIT_KEYCODES[(c as u8 - b'0') as usize])),
        ' ' => Some(unshifted(KEY_SPACE)),
        '\n' => Some(unshifted(KEY_ENTER)),
        '\t' => Some(unshifted(KEY_TAB)),
        _ => SYMBOL_KEYS.iter().find_map(|&(plain, shifted, keycode)| {
            if c == plain {
                Some(unshifted(keycode))
            } else if c == shifted {
                Some(KeyStroke {
                    keycode,
                    shift: true,
                })
            } else {
                None
            }
        }),
    }
}

/// Neighbouring keys on a US-QWERTY keyboard, keyed by lowercase character.
#[derive(Debug, Clone)]
pub struct KeyAdjacencyMap {
    neighbors: HashMap<char, Vec<char>>,
}

const QWERTY_NEIGHBORS: &[(char, &str)] = &[
    ('q', "was"),
    ('w', "qesd"),
    ('e', "wrdf"),
    ('r', "etfg"),
    ('t', "rygh"),
    ('y', "tuhj"),
    ('u', "yijk"),
    ('i', "uokl"),
    ('o', "ipl"),
    ('p', "ol"),
    ('a', "qsz"),
    ('s', "adzx"),
    ('d', "sfxc"),
    ('f', "dgcv"),
    ('g', "fhvb"),
    ('h', "gjbn"),
    ('j', "hknm"),
    ('k', "jlm"),
    ('l', "kop"),
    ('z', "asx"),
    ('x', "zsdc"),
    ('c', "xdfv"),
    ('v', "cfgb"),
    ('b', "vghn"),
    ('n', "bhjm"),
    ('m', "njk"),
    (' ', "nbvc"),
];

impl KeyAdjacencyMap {
    pub fn qwerty() -> Self {
        let neighbors = QWERTY_NEIGHBORS
            .iter()
            .map(|(key, adjacent)| (*key, adjacent.chars().collect()))
            .collect();
        Self { neighbors }
    }

    /// Neighbours of `c`, looked up case-insensitively.
    pub fn neighbors(&self, c: char) -> Option<&[char]> {
        let lower = c.to_lowercase().next()?;
        self.neighbors
            .get(&lower)
            .map(Vec::as_slice)
            .filter(|n| !n.is_empty())
    }
}

impl Default for KeyAdjacencyMap {
    fn default() -> Self {
        Self::qwerty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_the_same_key_with_shift_for_upper_case() {
        let lower = char_to_keystroke('g').expect("g is typable");
        let upper = char_to_keystroke('G').expect("G is typable");
        assert_eq!(lower.keycode, KEY_G);
        assert_eq!(upper.keycode, KEY_G);
        assert!(!lower.shift);
        assert!(upper.shift);
    }

    #[test]
    fn shifted_symbols_share_their_base_key() {
        assert_eq!(
            char_to_keystroke('?'),
            Some(KeyStroke {
                keycode: KEY_SLASH,
                shift: true
            })
        );
        assert_eq!(
            char_to_keystroke('7'),
            Some(KeyStroke {
                keycode: KEY_7,
                shift: false
            })
        );
        assert_eq!(char_to_keystroke('é'), None);
    }

    #[test]
    fn adjacency_lookup_ignores_case() {
        let map = KeyAdjacencyMap::qwerty();
        assert_eq!(map.neighbors('Q'), Some(&['w', 'a', 's'][..]));
        assert_eq!(map.neighbors('.'), None);
    }
}
