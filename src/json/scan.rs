//! Slice-scanning helpers shared by document lookup and filter lookup.
//!
//! These operate on already-held JSON text (the compacted document buffer or
//! a caller-supplied filter string), so they work with positions rather than
//! a byte stream.

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

pub(crate) fn skip_ws(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && is_ws(s[i]) {
        i += 1;
    }
    i
}

/// Index just past the closing quote of the string starting at `start`
/// (which must point at the opening quote).
pub(crate) fn string_end(s: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < s.len() {
        match s[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Index just past the value starting at `start`.
pub(crate) fn value_end(s: &[u8], start: usize) -> Option<usize> {
    match s.get(start)? {
        b'"' => string_end(s, start),
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut i = start;
            while i < s.len() {
                match s[i] {
                    b'"' => i = string_end(s, i)?.wrapping_sub(1),
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i + 1);
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            None
        }
        _ => {
            let mut i = start;
            while i < s.len() && !is_ws(s[i]) && !matches!(s[i], b',' | b'}' | b']') {
                i += 1;
            }
            Some(i)
        }
    }
}

/// Look up `key` in the object `obj` (braces included) and return the raw
/// text of its value. Keys are compared in their wire (escaped) form.
pub(crate) fn object_member<'a>(obj: &'a str, key: &str) -> Option<&'a str> {
    let s = obj.as_bytes();
    let mut i = skip_ws(s, 0);
    if s.get(i) != Some(&b'{') {
        return None;
    }
    i = skip_ws(s, i + 1);
    while s.get(i) == Some(&b'"') {
        let key_end = string_end(s, i)?;
        let found = &s[i + 1..key_end - 1] == key.as_bytes();
        i = skip_ws(s, key_end);
        if s.get(i) != Some(&b':') {
            return None;
        }
        i = skip_ws(s, i + 1);
        let v_end = value_end(s, i)?;
        if found {
            return Some(&obj[i..v_end]);
        }
        i = skip_ws(s, v_end);
        match s.get(i) {
            Some(&b',') => i = skip_ws(s, i + 1),
            _ => return None,
        }
    }
    None
}

/// Return the raw text of element `index` of the array `arr` (brackets
/// included).
pub(crate) fn array_element(arr: &str, index: usize) -> Option<&str> {
    let s = arr.as_bytes();
    let mut i = skip_ws(s, 0);
    if s.get(i) != Some(&b'[') {
        return None;
    }
    i = skip_ws(s, i + 1);
    if s.get(i) == Some(&b']') {
        return None;
    }
    let mut n = 0usize;
    loop {
        let v_end = value_end(s, i)?;
        if n == index {
            return Some(&arr[i..v_end]);
        }
        n += 1;
        i = skip_ws(s, v_end);
        match s.get(i) {
            Some(&b',') => i = skip_ws(s, i + 1),
            _ => return None,
        }
    }
}
