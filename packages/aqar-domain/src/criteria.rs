use serde::{Deserialize, Serialize};

use aqar_config::FacilityDefaults;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Purpose {
	#[serde(alias = "للبيع")]
	Sale,
	#[serde(alias = "للايجار", alias = "للإيجار")]
	Rent,
}
impl Purpose {
	pub fn as_store_value(self) -> &'static str {
		match self {
			Self::Sale => "للبيع",
			Self::Rent => "للايجار",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
	#[serde(alias = "فلل")]
	Villa,
	#[serde(alias = "بيت")]
	House,
	#[serde(alias = "شقق")]
	Apartment,
	#[serde(alias = "استوديو")]
	Studio,
	#[serde(alias = "دور")]
	Floor,
	#[serde(alias = "تاون هاوس")]
	Townhouse,
	#[serde(alias = "دوبلكس")]
	Duplex,
	#[serde(alias = "عمائر")]
	Building,
}
impl PropertyType {
	pub fn as_store_value(self) -> &'static str {
		match self {
			Self::Villa => "فلل",
			Self::House => "بيت",
			Self::Apartment => "شقق",
			Self::Studio => "استوديو",
			Self::Floor => "دور",
			Self::Townhouse => "تاون هاوس",
			Self::Duplex => "دوبلكس",
			Self::Building => "عمائر",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricePeriod {
	#[serde(alias = "سنوي")]
	Yearly,
	#[serde(alias = "شهري")]
	Monthly,
	#[serde(alias = "يومي")]
	Daily,
}
impl PricePeriod {
	pub fn as_store_value(self) -> &'static str {
		match self {
			Self::Yearly => "سنوي",
			Self::Monthly => "شهري",
			Self::Daily => "يومي",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolGender {
	#[serde(alias = "بنين", alias = "boys")]
	Boys,
	#[serde(alias = "بنات", alias = "girls")]
	Girls,
	#[serde(alias = "مختلط", alias = "mixed")]
	Mixed,
}
impl SchoolGender {
	/// Mixed schools impose no gender filter on the proximity lookup.
	pub fn store_filter(self) -> Option<&'static str> {
		match self {
			Self::Boys => Some("boys"),
			Self::Girls => Some("girls"),
			Self::Mixed => None,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolLevel {
	#[serde(alias = "حضانة", alias = "nursery")]
	Nursery,
	#[serde(alias = "روضة", alias = "kindergarten")]
	Kindergarten,
	#[serde(alias = "ابتدائي", alias = "elementary")]
	Elementary,
	#[serde(alias = "متوسط", alias = "middle")]
	Middle,
	#[serde(alias = "ثانوي", alias = "high")]
	High,
}
impl SchoolLevel {
	pub fn as_store_value(self) -> &'static str {
		match self {
			Self::Nursery => "nursery",
			Self::Kindergarten => "kindergarten",
			Self::Elementary => "elementary",
			Self::Middle => "middle",
			Self::High => "high",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
	#[serde(alias = "walking")]
	Walking,
	#[serde(alias = "driving")]
	Driving,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityKind {
	School,
	University,
	Mosque,
}
impl FacilityKind {
	pub const ALL: [Self; 3] = [Self::School, Self::University, Self::Mosque];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::School => "school",
			Self::University => "university",
			Self::Mosque => "mosque",
		}
	}

	pub fn default_travel_mode(self) -> TravelMode {
		match self {
			Self::Mosque => TravelMode::Walking,
			Self::School | Self::University => TravelMode::Driving,
		}
	}

	pub fn default_minutes(self, defaults: &FacilityDefaults) -> f64 {
		match self {
			Self::School => defaults.school_minutes,
			Self::University => defaults.university_minutes,
			Self::Mosque => defaults.mosque_minutes,
		}
	}
}

/// Count filter for rooms, baths and halls. `exact` takes precedence over `min`/`max`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountFilter {
	pub min: Option<u32>,
	pub max: Option<u32>,
	pub exact: Option<u32>,
}
impl CountFilter {
	pub fn exact(value: u32) -> Self {
		Self { exact: Some(value), ..Self::default() }
	}

	pub fn is_empty(&self) -> bool {
		self.min.is_none() && self.max.is_none() && self.exact.is_none()
	}

	/// Inclusive bounds, with `exact` collapsing both ends.
	pub fn bounds(&self) -> (Option<u32>, Option<u32>) {
		match self.exact {
			Some(exact) => (Some(exact), Some(exact)),
			None => (self.min, self.max),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeFilter {
	pub min: Option<f64>,
	pub max: Option<f64>,
}
impl RangeFilter {
	pub fn is_empty(&self) -> bool {
		self.min.is_none() && self.max.is_none()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFilter {
	pub min: Option<f64>,
	pub max: Option<f64>,
	pub currency: String,
	pub period: Option<PricePeriod>,
}
impl PriceFilter {
	pub fn range(&self) -> RangeFilter {
		RangeFilter { min: self.min, max: self.max }
	}

	/// A single representative price: the midpoint when both bounds exist, else whichever exists.
	pub fn target(&self) -> Option<f64> {
		match (self.min, self.max) {
			(Some(min), Some(max)) => Some((min + max) / 2.0),
			(Some(value), None) | (None, Some(value)) => Some(value),
			(None, None) => None,
		}
	}
}
impl Default for PriceFilter {
	fn default() -> Self {
		Self { min: None, max: None, currency: "SAR".to_string(), period: None }
	}
}

/// Proximity constraint towards a school, university or mosque.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityRequirement {
	pub required: bool,
	#[serde(alias = "university_name", alias = "mosque_name")]
	pub name: Option<String>,
	pub max_distance_minutes: Option<f64>,
	pub travel_mode: Option<TravelMode>,
	/// Schools only.
	pub gender: Option<SchoolGender>,
	/// Schools only.
	pub levels: Vec<SchoolLevel>,
}
impl FacilityRequirement {
	pub fn minutes(&self, kind: FacilityKind, defaults: &FacilityDefaults) -> f64 {
		self.max_distance_minutes.unwrap_or_else(|| kind.default_minutes(defaults))
	}

	pub fn mode(&self, kind: FacilityKind) -> TravelMode {
		self.travel_mode.unwrap_or_else(|| kind.default_travel_mode())
	}

	pub fn named(&self) -> Option<&str> {
		self.name.as_deref().map(str::trim).filter(|name| !name.is_empty())
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
	pub purpose: Option<Purpose>,
	pub property_type: Option<PropertyType>,
	/// Falls back to the configured default city when absent.
	pub city: Option<String>,
	pub district: Option<String>,
	pub rooms: Option<CountFilter>,
	pub baths: Option<CountFilter>,
	pub halls: Option<CountFilter>,
	#[serde(alias = "area_m2")]
	pub area: Option<RangeFilter>,
	pub price: Option<PriceFilter>,
	pub metro_time_max: Option<f64>,
	#[serde(alias = "school_requirements")]
	pub school: FacilityRequirement,
	#[serde(alias = "university_requirements")]
	pub university: FacilityRequirement,
	#[serde(alias = "mosque_requirements")]
	pub mosque: FacilityRequirement,
	/// The user's free-text request, used for the semantic signal.
	#[serde(alias = "original_query")]
	pub query_text: Option<String>,
}
impl SearchCriteria {
	pub fn new(purpose: Purpose, property_type: PropertyType) -> Self {
		Self { purpose: Some(purpose), property_type: Some(property_type), ..Self::default() }
	}

	/// Mandatory fields that are still missing, in a stable order.
	pub fn missing_fields(&self) -> Vec<&'static str> {
		let mut missing = Vec::new();

		if self.purpose.is_none() {
			missing.push("purpose");
		}
		if self.property_type.is_none() {
			missing.push("property_type");
		}

		missing
	}

	pub fn requirement(&self, kind: FacilityKind) -> &FacilityRequirement {
		match kind {
			FacilityKind::School => &self.school,
			FacilityKind::University => &self.university,
			FacilityKind::Mosque => &self.mosque,
		}
	}

	/// Facility kinds whose requirement is switched on, in `FacilityKind::ALL` order.
	pub fn required_facilities(&self) -> Vec<FacilityKind> {
		FacilityKind::ALL.into_iter().filter(|kind| self.requirement(*kind).required).collect()
	}

	pub fn district(&self) -> Option<&str> {
		self.district.as_deref().map(str::trim).filter(|value| !value.is_empty())
	}

	pub fn city_or<'a>(&'a self, default_city: &'a str) -> &'a str {
		self.city.as_deref().map(str::trim).filter(|value| !value.is_empty()).unwrap_or(default_city)
	}

	pub fn query_text(&self) -> Option<&str> {
		self.query_text.as_deref().map(str::trim).filter(|value| !value.is_empty())
	}
}
