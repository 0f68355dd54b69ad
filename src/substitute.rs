//! §4.4 Substituter — in-string `${NAME}` expansion with a configurable
//! prefix character.
//!
//! A fixed-prefix scan is used rather than a dynamically-built `regex`:
//! the prefix is a runtime `char` pulled from `Settings`, so a regex would
//! have to be recompiled per-project anyway, and the grammar itself (single
//! left-to-right pass, no escaping) is simple enough to hand-write directly
//! (see DESIGN.md).

/// Looks up a variable's current value. Implemented by [`crate::varstore::VarStore`]
/// directly, and by the one-time overlay a `send` may supply.
pub trait VarLookup {
    fn lookup(&self, name: &str) -> String;
}

impl VarLookup for crate::varstore::VarStore {
    fn lookup(&self, name: &str) -> String {
        self.get(name)
    }
}

/// An overlay that checks a one-time map first, falling through to the
/// underlying store (spec.md §4.5 step 1 and §9 "Overlay").
pub struct Overlay<'a> {
    pub base: &'a crate::varstore::VarStore,
    pub overlay: &'a std::collections::HashMap<String, String>,
}

impl VarLookup for Overlay<'_> {
    fn lookup(&self, name: &str) -> String {
        let upper = name.to_uppercase();
        if let Some(v) = self.overlay.get(&upper) {
            return v.clone();
        }
        self.base.lookup(name)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitutes every `PREFIX{NAME}` occurrence in `input` with the current
/// value of `NAME` (upper-cased before lookup). A single left-to-right
/// pass; the replacement text is never re-scanned. A bare prefix not
/// followed by `{IDENT}` passes through unchanged.
pub fn substitute(input: &str, store: &dyn VarLookup, prefix: char) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c != prefix {
            out.push(c);
            i += 1;
            continue;
        }

        // Try to match PREFIX '{' IDENT '}'.
        if i + 1 < chars.len() && chars[i + 1] == '{' {
            let mut j = i + 2;
            if j < chars.len() && is_ident_start(chars[j]) {
                let start = j;
                j += 1;
                while j < chars.len() && is_ident_continue(chars[j]) {
                    j += 1;
                }
                if j < chars.len() && chars[j] == '}' {
                    let name: String = chars[start..j].iter().collect();
                    out.push_str(&store.lookup(&name.to_uppercase()));
                    i = j + 1;
                    continue;
                }
            }
        }

        // Not a valid reference: the prefix character passes through literally.
        out.push(c);
        i += 1;
    }

    out
}

/// Substitutes method, URL, every header key and value, and the body
/// (interpreted as UTF-8; non-UTF-8 bytes pass through unchanged).
pub fn substitute_bytes(body: &[u8], store: &dyn VarLookup, prefix: char) -> Vec<u8> {
    match std::str::from_utf8(body) {
        Ok(s) => substitute(s, store, prefix).into_bytes(),
        Err(_) => body.to_vec(),
    }
}
