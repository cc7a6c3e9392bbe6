//! Tests for the order-preserving text escaper

use fusestream::fusestream::serialization::text::TextEscaper;

const SEPARATORS: &[char] = &[',', 'a', '#', 'S', 's', 'N', 'n', '?', '\t'];

fn test_strings() -> Vec<String> {
    let max = char::MAX;
    let below_max = char::from_u32(char::MAX as u32 - 1).expect("representable");
    let mut strings = vec![
        "aaa".to_string(),
        "aab".to_string(),
        "baa".to_string(),
        "aaaa".to_string(),
        format!("a{}", max),
        format!("a{}", below_max),
        format!("a{},", max),
        "Sn#S\nab,c".to_string(),
        "#?E#?e\n###?>??ee".to_string(),
        "\n".to_string(),
        "\t".to_string(),
        String::new(),
    ];
    strings.sort();
    strings
}

#[test]
fn key_and_value_escapes_round_trip_for_every_separator() {
    for &separator in SEPARATORS {
        let escaper = TextEscaper::new(separator)
            .unwrap_or_else(|e| panic!("separator {:?} should be legal: {}", separator, e));
        for s in test_strings() {
            let key_escaped = escaper.escape_key(&s);
            assert!(
                !key_escaped.contains(separator),
                "escaped key {:?} contains separator {:?}",
                key_escaped,
                separator
            );
            assert!(
                !key_escaped.contains('\n'),
                "escaped key {:?} contains newline",
                key_escaped
            );
            assert_eq!(
                escaper.unescape_key(&key_escaped),
                s,
                "key round trip failed for {:?} with separator {:?}",
                s,
                separator
            );

            let value_escaped = escaper.escape_value(&s);
            assert!(
                !value_escaped.contains(separator),
                "escaped value {:?} contains separator {:?}",
                value_escaped,
                separator
            );
            assert!(
                !value_escaped.contains('\n'),
                "escaped value {:?} contains newline",
                value_escaped
            );
            assert_eq!(
                escaper.unescape_value(&value_escaped),
                s,
                "value round trip failed for {:?} with separator {:?}",
                s,
                separator
            );
        }
    }
}

#[test]
fn key_escaping_preserves_ordinal_order() {
    for &separator in SEPARATORS {
        let escaper = TextEscaper::new(separator).expect("legal separator");
        let originals = test_strings();

        // Escape in reverse, re-sort the escaped forms, and check the result
        // lines up with the sorted originals.
        let mut escaped: Vec<String> = originals
            .iter()
            .rev()
            .map(|s| escaper.escape_key(s))
            .collect();
        escaped.sort();
        let unescaped: Vec<String> = escaped.iter().map(|s| escaper.unescape_key(s)).collect();
        assert_eq!(
            unescaped, originals,
            "escaped sort order diverged from original order for separator {:?}",
            separator
        );
    }
}

#[test]
fn pairwise_order_preservation() {
    for &separator in SEPARATORS {
        let escaper = TextEscaper::new(separator).expect("legal separator");
        let strings = test_strings();
        for s1 in &strings {
            for s2 in &strings {
                let e1 = escaper.escape_key(s1);
                let e2 = escaper.escape_key(s2);
                assert_eq!(
                    s1 <= s2,
                    e1 <= e2,
                    "order flipped for {:?} vs {:?} with separator {:?}",
                    s1,
                    s2,
                    separator
                );
            }
        }
    }
}

#[test]
fn separator_validation_rejects_degenerate_choices() {
    assert!(TextEscaper::new('\n').is_err());
    assert!(TextEscaper::new('\u{0}').is_err());
    assert!(TextEscaper::new('\u{1}').is_err());
    assert!(TextEscaper::new(char::MAX).is_err());
}
