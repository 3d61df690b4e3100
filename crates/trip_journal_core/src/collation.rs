//! crates/trip_journal_core/src/collation.rs
//!
//! Japanese string ordering for companion names.
//!
//! Comparison goes through the CLDR `ja` tailoring from ICU4X's compiled
//! data: Latin before kana before kanji, hiragana and katakana interleaved by
//! sound, voicing marks as a secondary difference, and kanji in JIS X 0208
//! order (level 1 by reading, then level 2 by radical). Strings the collator
//! considers equal fall back to code point order, which keeps the ordering
//! total.

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use std::cmp::Ordering;
use tracing::warn;

thread_local! {
    static JAPANESE: Option<Collator> =
        match Collator::try_new(&locale!("ja").into(), CollatorOptions::new()) {
            Ok(collator) => Some(collator),
            Err(e) => {
                warn!("Japanese collation data unavailable, using code point order: {:?}", e);
                None
            }
        };
}

/// Compares two strings with Japanese collation.
pub fn compare_ja(a: &str, b: &str) -> Ordering {
    JAPANESE
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("あおき", "いしだ")]
    #[case("かとう", "がとう")]
    #[case("がとう", "ぱとう")]
    #[case("apple", "Apple")]
    #[case("Apple", "banana")]
    #[case("1番", "a")]
    #[case("zebra", "あ")]
    #[case("ん", "亜")]
    #[case("佐藤", "田中")]
    #[case("阿部", "伊藤")]
    #[case("伊藤", "加藤")]
    #[case("加藤", "渡辺")]
    fn orders_before(#[case] lower: &str, #[case] higher: &str) {
        assert_eq!(compare_ja(lower, higher), Ordering::Less, "{lower} < {higher}");
        assert_eq!(compare_ja(higher, lower), Ordering::Greater);
    }

    #[test]
    fn hiragana_and_katakana_interleave() {
        // カ sorts with か, ahead of き, rather than after all hiragana.
        assert_eq!(compare_ja("カ", "き"), Ordering::Less);
        assert_eq!(compare_ja("き", "ク"), Ordering::Less);
    }

    #[test]
    fn half_width_katakana_sorts_with_full_width() {
        assert_eq!(compare_ja("ｶﾀ", "カチ"), Ordering::Less);
        assert_eq!(compare_ja("カタ", "ｶﾁ"), Ordering::Less);
    }

    #[test]
    fn identical_strings_compare_equal() {
        assert_eq!(compare_ja("山田", "山田"), Ordering::Equal);
    }
}
