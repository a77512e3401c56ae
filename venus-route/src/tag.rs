use tracing::warn;

/// A field's routing tag in the conventional `key:"value" key:"value"`
/// layout, e.g. `GET:"/msg/:ID"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pairs: Vec<(String, String)>,
}

impl Tag {
    /// Parsing stops at the first malformed pair; pairs before it are kept.
    pub fn parse(raw: &str) -> Self {
        let mut pairs = Vec::new();
        let mut rest = raw;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }

            let key_len = rest
                .find(|c: char| c == ':' || c == ' ' || c == '"' || c.is_control())
                .unwrap_or(rest.len());
            if key_len == 0 || !rest[key_len..].starts_with(":\"") {
                warn!("malformed route tag `{raw}`");
                break;
            }
            let key = &rest[..key_len];
            let quoted = &rest[key_len + 2..];

            let mut value = String::new();
            let mut escaped = false;
            let mut end = None;
            for (i, c) in quoted.char_indices() {
                if escaped {
                    value.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    end = Some(i);
                    break;
                } else {
                    value.push(c);
                }
            }
            let Some(end) = end else {
                warn!("unterminated value in route tag `{raw}`");
                break;
            };

            pairs.push((key.to_string(), value));
            rest = &quoted[end + 1..];
        }
        Tag { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::Tag;

    #[test]
    fn parse_pairs() {
        let tag = Tag::parse(r#" GET:"/addr/info/:Address" json:"addr""#);
        assert_eq!(tag.get("GET"), Some("/addr/info/:Address"));
        assert_eq!(tag.get("json"), Some("addr"));
        assert_eq!(tag.get("POST"), None);
    }

    #[test]
    fn first_key_wins() {
        let tag = Tag::parse(r#"PUT:"/a" PUT:"/b""#);
        assert_eq!(tag.get("PUT"), Some("/a"));
    }

    #[test]
    fn escaped_quote() {
        let tag = Tag::parse(r#"doc:"say \"hi\"""#);
        assert_eq!(tag.get("doc"), Some(r#"say "hi""#));
    }

    #[test]
    fn malformed_keeps_prefix() {
        let tag = Tag::parse(r#"GET:"/ok" broken POST:"/x""#);
        assert_eq!(tag.get("GET"), Some("/ok"));
        assert_eq!(tag.get("POST"), None);

        assert!(Tag::parse(r#"GET:"/open"#).is_empty());
        assert!(Tag::parse("").is_empty());
    }
}
