//! Follow-up turns in a conversation either start over or patch the previous criteria.

use serde::{Deserialize, Serialize};

use crate::criteria::{
	CountFilter, FacilityRequirement, PriceFilter, PropertyType, Purpose, RangeFilter,
	SearchCriteria,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldPatch<T> {
	#[default]
	Keep,
	Set(T),
	Clear,
}
impl<T> FieldPatch<T> {
	fn apply_optional(self, slot: &mut Option<T>) {
		match self {
			Self::Keep => {},
			Self::Set(value) => *slot = Some(value),
			Self::Clear => *slot = None,
		}
	}
}
impl<T> FieldPatch<T>
where
	T: Default,
{
	fn apply(self, slot: &mut T) {
		match self {
			Self::Keep => {},
			Self::Set(value) => *slot = value,
			Self::Clear => *slot = T::default(),
		}
	}
}

/// Field-level changes to an existing criteria object. Omitted fields are kept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaPatch {
	pub purpose: FieldPatch<Purpose>,
	pub property_type: FieldPatch<PropertyType>,
	pub city: FieldPatch<String>,
	pub district: FieldPatch<String>,
	pub rooms: FieldPatch<CountFilter>,
	pub baths: FieldPatch<CountFilter>,
	pub halls: FieldPatch<CountFilter>,
	pub area: FieldPatch<RangeFilter>,
	pub price: FieldPatch<PriceFilter>,
	pub metro_time_max: FieldPatch<f64>,
	pub school: FieldPatch<FacilityRequirement>,
	pub university: FieldPatch<FacilityRequirement>,
	pub mosque: FieldPatch<FacilityRequirement>,
	pub query_text: FieldPatch<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "criteria", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaUpdate {
	NewSearch(SearchCriteria),
	#[serde(alias = "UPDATE_CRITERIA")]
	Patch(CriteriaPatch),
}

/// Produces the criteria for the next turn. A patch with no previous criteria applies to defaults.
pub fn apply_update(previous: Option<&SearchCriteria>, update: CriteriaUpdate) -> SearchCriteria {
	match update {
		CriteriaUpdate::NewSearch(criteria) => criteria,
		CriteriaUpdate::Patch(patch) => {
			let mut criteria = previous.cloned().unwrap_or_default();

			apply_patch(&mut criteria, patch);

			criteria
		},
	}
}

fn apply_patch(criteria: &mut SearchCriteria, patch: CriteriaPatch) {
	let CriteriaPatch {
		purpose,
		property_type,
		city,
		district,
		rooms,
		baths,
		halls,
		area,
		price,
		metro_time_max,
		school,
		university,
		mosque,
		query_text,
	} = patch;

	purpose.apply_optional(&mut criteria.purpose);
	property_type.apply_optional(&mut criteria.property_type);
	city.apply_optional(&mut criteria.city);
	district.apply_optional(&mut criteria.district);
	rooms.apply_optional(&mut criteria.rooms);
	baths.apply_optional(&mut criteria.baths);
	halls.apply_optional(&mut criteria.halls);
	area.apply_optional(&mut criteria.area);
	price.apply_optional(&mut criteria.price);
	metro_time_max.apply_optional(&mut criteria.metro_time_max);
	school.apply(&mut criteria.school);
	university.apply(&mut criteria.university);
	mosque.apply(&mut criteria.mosque);
	query_text.apply_optional(&mut criteria.query_text);
}

#[cfg(test)]
mod tests {
	use super::{CriteriaPatch, CriteriaUpdate, FieldPatch, apply_update};
	use crate::criteria::{CountFilter, PropertyType, Purpose, SearchCriteria};

	#[test]
	fn keep_leaves_previous_values() {
		let mut previous = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);

		previous.district = Some("النرجس".to_string());

		let next = apply_update(Some(&previous), CriteriaUpdate::Patch(CriteriaPatch::default()));

		assert_eq!(next, previous);
	}

	#[test]
	fn set_replaces_whole_sub_object() {
		let mut previous = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);

		previous.rooms = Some(CountFilter { min: Some(2), max: Some(4), exact: None });

		let patch = CriteriaPatch {
			rooms: FieldPatch::Set(CountFilter::exact(3)),
			..CriteriaPatch::default()
		};
		let next = apply_update(Some(&previous), CriteriaUpdate::Patch(patch));

		assert_eq!(next.rooms, Some(CountFilter::exact(3)));
	}

	#[test]
	fn clear_resets_to_default() {
		let mut previous = SearchCriteria::new(Purpose::Sale, PropertyType::Villa);

		previous.mosque.required = true;
		previous.metro_time_max = Some(10.0);

		let patch = CriteriaPatch {
			mosque: FieldPatch::Clear,
			metro_time_max: FieldPatch::Clear,
			..CriteriaPatch::default()
		};
		let next = apply_update(Some(&previous), CriteriaUpdate::Patch(patch));

		assert!(!next.mosque.required);
		assert_eq!(next.metro_time_max, None);
		assert_eq!(next.purpose, Some(Purpose::Sale));
	}

	#[test]
	fn patch_without_previous_applies_to_defaults() {
		let patch =
			CriteriaPatch { purpose: FieldPatch::Set(Purpose::Rent), ..CriteriaPatch::default() };
		let next = apply_update(None, CriteriaUpdate::Patch(patch));

		assert_eq!(next.purpose, Some(Purpose::Rent));
		assert_eq!(next.property_type, None);
	}

	#[test]
	fn new_search_discards_previous() {
		let mut previous = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);

		previous.district = Some("الملقا".to_string());

		let fresh = SearchCriteria::new(Purpose::Sale, PropertyType::Villa);
		let next = apply_update(Some(&previous), CriteriaUpdate::NewSearch(fresh.clone()));

		assert_eq!(next, fresh);
	}
}
