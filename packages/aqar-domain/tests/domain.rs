use aqar_config::FacilityDefaults;
use aqar_domain::{
	criteria::{
		CountFilter, FacilityKind, PriceFilter, PropertyType, Purpose, SchoolGender, SchoolLevel,
		SearchCriteria, TravelMode,
	},
	merge::{CriteriaUpdate, FieldPatch, apply_update},
	proximity, resolve, text,
};

#[test]
fn criteria_accept_arabic_store_values() {
	let criteria: SearchCriteria = serde_json::from_value(serde_json::json!({
		"purpose": "للايجار",
		"property_type": "شقق",
		"district": "النرجس",
		"rooms": { "exact": 3 },
		"school": { "required": true, "gender": "بنات", "levels": ["ابتدائي", "متوسط"] },
		"original_query": "شقة ثلاث غرف قريبة من مدرسة بنات",
	}))
	.expect("Failed to parse criteria.");

	assert_eq!(criteria.purpose, Some(Purpose::Rent));
	assert_eq!(criteria.property_type, Some(PropertyType::Apartment));
	assert_eq!(criteria.rooms, Some(CountFilter::exact(3)));
	assert_eq!(criteria.school.gender, Some(SchoolGender::Girls));
	assert_eq!(criteria.school.levels, vec![SchoolLevel::Elementary, SchoolLevel::Middle]);
	assert_eq!(criteria.query_text(), Some("شقة ثلاث غرف قريبة من مدرسة بنات"));
	assert_eq!(criteria.required_facilities(), vec![FacilityKind::School]);
}

#[test]
fn criteria_accept_english_tags() {
	let criteria: SearchCriteria = serde_json::from_value(serde_json::json!({
		"purpose": "SALE",
		"property_type": "VILLA",
		"price": { "max": 2000000.0 },
	}))
	.expect("Failed to parse criteria.");

	assert!(criteria.missing_fields().is_empty());
	assert_eq!(criteria.purpose.map(Purpose::as_store_value), Some("للبيع"));
	assert_eq!(criteria.property_type.map(PropertyType::as_store_value), Some("فلل"));
	assert_eq!(criteria.price.as_ref().map(|price| price.currency.as_str()), Some("SAR"));
}

#[test]
fn missing_mandatory_fields_are_reported_in_order() {
	let criteria = SearchCriteria::default();

	assert_eq!(criteria.missing_fields(), vec!["purpose", "property_type"]);
}

#[test]
fn facility_defaults_apply_when_unspecified() {
	let criteria = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);
	let defaults = FacilityDefaults::default();

	assert_eq!(criteria.school.minutes(FacilityKind::School, &defaults), 10.0);
	assert_eq!(criteria.university.minutes(FacilityKind::University, &defaults), 15.0);
	assert_eq!(criteria.mosque.minutes(FacilityKind::Mosque, &defaults), 5.0);
	assert_eq!(criteria.mosque.mode(FacilityKind::Mosque), TravelMode::Walking);
	assert_eq!(criteria.university.mode(FacilityKind::University), TravelMode::Driving);
	assert_eq!(criteria.school.mode(FacilityKind::School), TravelMode::Driving);
}

#[test]
fn price_target_prefers_midpoint() {
	let both = PriceFilter { min: Some(40_000.0), max: Some(60_000.0), ..PriceFilter::default() };
	let upper = PriceFilter { max: Some(60_000.0), ..PriceFilter::default() };

	assert_eq!(both.target(), Some(50_000.0));
	assert_eq!(upper.target(), Some(60_000.0));
	assert_eq!(PriceFilter::default().target(), None);
}

#[test]
fn patch_update_parses_from_tagged_json() {
	let update: CriteriaUpdate = serde_json::from_value(serde_json::json!({
		"action": "UPDATE_CRITERIA",
		"criteria": {
			"rooms": { "op": "set", "value": { "exact": 4 } },
			"district": { "op": "clear" },
		},
	}))
	.expect("Failed to parse update.");
	let mut previous = SearchCriteria::new(Purpose::Rent, PropertyType::Apartment);

	previous.district = Some("الياسمين".to_string());
	previous.rooms = Some(CountFilter::exact(3));

	let CriteriaUpdate::Patch(ref patch) = update else {
		panic!("Expected a patch update.");
	};

	assert_eq!(patch.purpose, FieldPatch::Keep);

	let next = apply_update(Some(&previous), update);

	assert_eq!(next.rooms, Some(CountFilter::exact(4)));
	assert_eq!(next.district, None);
	assert_eq!(next.purpose, Some(Purpose::Rent));
}

#[test]
fn resolved_facility_bounds_a_walking_radius() {
	let mosques = ["مسجد الراجحي", "جامع الملك خالد"];
	let name = resolve::resolve(
		"جامع الملك خالد",
		&mosques,
		|name| [*name],
		resolve::DEFAULT_THRESHOLD,
	)
	.expect("Expected a match.")
	.name;
	let radius = proximity::minutes_to_meters(5.0, TravelMode::Walking);

	assert_eq!(name, "جامع الملك خالد");
	assert!((radius - 416.666_666).abs() < 1e-3, "{radius}");
	assert_eq!(text::normalize(name), "جامع الملك خالد");
}
