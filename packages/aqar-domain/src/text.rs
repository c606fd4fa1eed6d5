//! Canonical form for comparing Arabic names.

const BARE_ALEF: char = '\u{0627}';
const HEH: char = '\u{0647}';
const YEH: char = '\u{064A}';

/// Canonicalizes Arabic text for comparison.
///
/// Lowercases, drops tashkeel, folds alef, teh marbuta and yeh variants, then collapses
/// whitespace. The result is a fixed point: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
	if text.is_empty() {
		return String::new();
	}

	let mut folded = String::with_capacity(text.len());

	for ch in text.chars().flat_map(char::to_lowercase) {
		if is_diacritic(ch) {
			continue;
		}

		folded.push(fold_letter(ch));
	}

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_diacritic(ch: char) -> bool {
	matches!(ch, '\u{0617}'..='\u{061A}' | '\u{064B}'..='\u{0652}')
}

fn fold_letter(ch: char) -> char {
	match ch {
		// hamza above, hamza below, wasla, madda
		'\u{0623}' | '\u{0625}' | '\u{0671}' | '\u{0622}' => BARE_ALEF,
		'\u{0629}' => HEH,
		'\u{0649}' => YEH,
		_ => ch,
	}
}
