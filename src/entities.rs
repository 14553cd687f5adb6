use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]*);").expect("valid regex")
    })
}

/// Decodes HTML character references in cue text.
///
/// Named references use the full HTML table. Numeric references to NUL,
/// surrogates or values past U+10FFFF become U+FFFD. Unknown names are left
/// as written.
pub fn unescape_html(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    entity_regex().replace_all(text, |caps: &Captures| {
        let whole = &caps[0];
        match caps[1].strip_prefix('#') {
            Some(number) => decode_numeric(number).to_string(),
            None => html_escape::decode_html_entities(whole).into_owned(),
        }
    })
}

fn decode_numeric(number: &str) -> char {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => number.parse().ok(),
    };
    code.filter(|&code| code != 0)
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_unescape {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected) = $value;
                assert_eq!(unescape_html(input), expected);
            }
        )*
        }
    }

    test_unescape! {
        test_unescape_0: ("plain text", "plain text"),
        test_unescape_1: ("Tom &amp; Jerry", "Tom & Jerry"),
        test_unescape_2: ("&lt;i&gt;quoted&lt;/i&gt;", "<i>quoted</i>"),
        test_unescape_3: ("it&#39;s", "it's"),
        test_unescape_4: ("&quot;hi&quot;", "\"hi\""),
        test_unescape_5: ("caf&#xE9;", "café"),
        test_unescape_6: ("&bogus; stays", "&bogus; stays"),
        test_unescape_7: ("fish & chips", "fish & chips"),
        test_unescape_8: ("&amp;amp;", "&amp;"),
        test_unescape_9: ("&#1114112;", "\u{FFFD}"),
        test_unescape_10: ("caf&eacute; &mdash; wait&hellip; &copy;", "café — wait… ©"),
        test_unescape_11: ("&Uuml;ber &frac12; &euro;5", "Über ½ €5"),
        test_unescape_12: ("a&#0;b", "a\u{FFFD}b"),
        test_unescape_13: ("&#xD800;", "\u{FFFD}"),
        test_unescape_14: ("&#X41;&#65;", "AA"),
    }
}
