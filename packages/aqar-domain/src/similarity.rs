use std::collections::HashSet;

use crate::text::normalize;

/// Score returned for a normalized exact match. Every other path stays at or below
/// [`CONTAINMENT_CEILING`].
pub const EXACT_SCORE: f32 = 1.0;
pub const CONTAINMENT_CEILING: f32 = 0.95;

const PARTIAL_OVERLAP_FACTOR: f32 = 0.85;
const UNFILTERED_OVERLAP_FACTOR: f32 = 0.5;

/// Generic institutional words, in normalized form. They carry no identity on their own, so two
/// different universities must not match on them.
const STOP_WORDS: &[&str] = &[
	"جامعه",
	"كليه",
	"معهد",
	"مركز",
	"فرع",
	"في",
	"university",
	"college",
	"institute",
	"branch",
	"center",
	"centre",
	"of",
	"in",
];

/// Scores textual similarity between two names in `[0, 1]`.
pub fn score(a: &str, b: &str) -> f32 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let left = normalize(a);
	let right = normalize(b);

	if left.is_empty() || right.is_empty() {
		return 0.0;
	}
	if left == right {
		return EXACT_SCORE;
	}
	if let Some(ratio) = containment_ratio(&left, &right) {
		return ratio * CONTAINMENT_CEILING;
	}

	word_overlap(&left, &right)
}

fn containment_ratio(left: &str, right: &str) -> Option<f32> {
	let (shorter, longer) =
		if left.chars().count() <= right.chars().count() { (left, right) } else { (right, left) };

	if !longer.contains(shorter) {
		return None;
	}

	Some(shorter.chars().count() as f32 / longer.chars().count() as f32)
}

fn word_overlap(left: &str, right: &str) -> f32 {
	let words_left: HashSet<&str> = left.split(' ').collect();
	let words_right: HashSet<&str> = right.split(' ').collect();
	let filtered_left = without_stop_words(&words_left);
	let filtered_right = without_stop_words(&words_right);
	let (filtered_left, filtered_right) = if filtered_left.is_empty() || filtered_right.is_empty()
	{
		(words_left.clone(), words_right.clone())
	} else {
		(filtered_left, filtered_right)
	};
	let common = filtered_left.intersection(&filtered_right).count();

	if common == 0 {
		let common_unfiltered = words_left.intersection(&words_right).count();

		if common_unfiltered == 0 {
			return 0.0;
		}

		let shorter = words_left.len().min(words_right.len());

		return common_unfiltered as f32 / shorter as f32 * UNFILTERED_OVERLAP_FACTOR;
	}

	let shorter = filtered_left.len().min(filtered_right.len());
	let ratio = common as f32 / shorter as f32;

	if common == shorter {
		return ratio.min(CONTAINMENT_CEILING);
	}

	ratio * PARTIAL_OVERLAP_FACTOR
}

fn without_stop_words<'a>(words: &HashSet<&'a str>) -> HashSet<&'a str> {
	words.iter().copied().filter(|word| !STOP_WORDS.contains(word)).collect()
}

#[cfg(test)]
mod tests {
	use super::{CONTAINMENT_CEILING, score};

	#[test]
	fn identical_names_score_one() {
		assert_eq!(score("جامعة الملك سعود", "جامعة الملك سعود"), 1.0);
		assert_eq!(score("جامعة الملك سعود", "جامعه الملك سعود"), 1.0);
	}

	#[test]
	fn empty_input_scores_zero() {
		assert_eq!(score("", "جامعة الملك سعود"), 0.0);
		assert_eq!(score("جامعة", ""), 0.0);
		assert_eq!(score("   ", "   "), 0.0);
	}

	#[test]
	fn containment_is_proportional_to_length() {
		let value = score("الملك سعود", "جامعة الملك سعود");
		let expected = "الملك سعود".chars().count() as f32 / "جامعه الملك سعود".chars().count() as f32
			* CONTAINMENT_CEILING;

		assert!((value - expected).abs() < 1e-6, "{value} != {expected}");
		assert!(value < CONTAINMENT_CEILING);
	}

	#[test]
	fn full_word_subset_caps_below_exact() {
		let value = score("جامعة سعود", "جامعة الملك سعود");

		assert!(value > 0.0 && value <= CONTAINMENT_CEILING, "{value}");
		assert_eq!(value, CONTAINMENT_CEILING);
	}

	#[test]
	fn shared_generic_word_is_weak() {
		// Only "university" is shared, so the halved unfiltered overlap applies.
		let value = score("جامعة الملك سعود", "جامعة الأميرة نورة");

		assert!((value - (1.0 / 3.0) * 0.5).abs() < 1e-6, "{value}");
	}

	#[test]
	fn disjoint_names_score_zero() {
		assert_eq!(score("مسجد الراجحي", "جامعة الأميرة نورة"), 0.0);
	}

	#[test]
	fn only_generic_words_fall_back_to_unfiltered_sets() {
		// Both sides reduce to stop words only, so the unfiltered sets are compared.
		let value = score("جامعة في", "كلية في");

		assert!((value - 0.5 * 0.85).abs() < 1e-6, "{value}");
	}

	#[test]
	fn partial_overlap_is_discounted() {
		let value = score("جامعة الإمام محمد بن سعود", "جامعة الإمام عبدالرحمن الفيصل");

		assert!((value - (1.0 / 3.0) * 0.85).abs() < 1e-6, "{value}");
	}

	#[test]
	fn diacritics_and_variants_are_ignored() {
		assert_eq!(score("جَامِعَة الأَمِيرَة نُورَة", "جامعه الاميره نوره"), 1.0);
	}
}
