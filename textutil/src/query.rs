use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Everything except ASCII alphanumerics and @*_+-./ gets percent-encoded.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'*')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/');

/// One entry of a URL-encoded key/value string: either a bare key or a
/// key with a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEntry {
    Flag(String),
    Pair(String, String),
}

impl QueryEntry {
    pub fn name(&self) -> &str {
        match self {
            QueryEntry::Flag(name) => name,
            QueryEntry::Pair(name, _) => name,
        }
    }

    fn encode(&self) -> String {
        match self {
            QueryEntry::Flag(name) => encode_piece(name),
            QueryEntry::Pair(name, value) => {
                format!("{}={}", encode_piece(name), encode_piece(value))
            }
        }
    }
}

/// An edit applied by [`replace_url_encoded_pairs`]: remove a key outright,
/// or upsert an entry. `Put(Flag(k))` keeps the key present but empties it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryEdit {
    Delete(String),
    Put(QueryEntry),
}

fn decode_piece(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

fn encode_piece(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ESCAPE).to_string()
}

/// Splits `s` on `&`, then each item on its first `=`, percent-decoding
/// every piece. An item without `=` becomes a [`QueryEntry::Flag`].
pub fn parse_url_encoded_pairs(s: &str) -> Vec<QueryEntry> {
    s.split('&')
        .map(|item| match item.split_once('=') {
            None => QueryEntry::Flag(decode_piece(item)),
            Some((key, value)) => QueryEntry::Pair(decode_piece(key), decode_piece(value)),
        })
        .collect()
}

/// Inverse of [`parse_url_encoded_pairs`].
pub fn encode_url_encoded_pairs(entries: &[QueryEntry]) -> String {
    entries
        .iter()
        .map(QueryEntry::encode)
        .collect::<Vec<_>>()
        .join("&")
}

// Name lookup scans from the end: the last occurrence of a duplicate key
// wins.
fn find_by_name(entries: &[QueryEntry], name: &str) -> Option<usize> {
    entries.iter().rposition(|entry| entry.name() == name)
}

/// Applies `edits` to the entries parsed from `s` and re-encodes the
/// result. Edits are applied in reverse order; an upsert for a missing key
/// appends it.
pub fn replace_url_encoded_pairs(s: &str, edits: &[QueryEdit]) -> String {
    let mut entries = parse_url_encoded_pairs(s);
    for edit in edits.iter().rev() {
        match edit {
            QueryEdit::Delete(name) => {
                if let Some(i) = find_by_name(&entries, name) {
                    entries.remove(i);
                }
            }
            QueryEdit::Put(entry) => match find_by_name(&entries, entry.name()) {
                Some(i) => entries[i] = entry.clone(),
                None => entries.push(entry.clone()),
            },
        }
    }
    encode_url_encoded_pairs(&entries)
}
