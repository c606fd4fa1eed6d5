use crate::similarity;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// The best-scoring candidate for a query, together with the stored name variant that matched.
#[derive(Debug)]
pub struct Resolution<'a, T> {
	pub entity: &'a T,
	pub name: &'a str,
	pub score: f32,
}

/// Resolves a free-text name against every name variant of every candidate.
///
/// Returns `None` when the best score is below `threshold`; callers treat that as "not found".
/// On equal scores the first candidate seen wins.
pub fn resolve<'a, T, F, I>(
	query: &str,
	candidates: &'a [T],
	names: F,
	threshold: f32,
) -> Option<Resolution<'a, T>>
where
	F: Fn(&'a T) -> I,
	I: IntoIterator<Item = &'a str>,
{
	if query.trim().is_empty() {
		return None;
	}

	let mut best: Option<Resolution<'a, T>> = None;

	for entity in candidates {
		for name in names(entity) {
			let score = similarity::score(query, name);

			if best.as_ref().map(|current| score > current.score).unwrap_or(true) {
				best = Some(Resolution { entity, name, score });
			}
		}
	}

	best.filter(|resolution| resolution.score >= threshold)
}
