/// Unit tags a property may declare. Anything else is a configuration error.
pub const UNITS: &[&str] = &[
	"A",
	"amperes",
	"milliamperes",
	"becquerels",
	"C",
	"centimeters",
	"centimeters-squared",
	"cm",
	"degrees",
	"degrees-celsius",
	"eV",
	"farads",
	"g",
	"grams",
	"gray",
	"henries",
	"henrys",
	"hertz",
	"Hz",
	"J",
	"joules",
	"K",
	"kelvins",
	"kg",
	"kilograms",
	"kilometers",
	"L",
	"liters",
	"liters/second",
	"m",
	"meters",
	"meters-squared",
	"meters/second",
	"meters/s",
	"meters/second/second",
	"meters/s/s",
	"m/s",
	"m/s/s",
	"m^2",
	"m^3",
	"mm",
	"mol",
	"mol/L",
	"moles",
	"N",
	"newtons",
	"N/m",
	"nm",
	"nanometers",
	"nanoseconds",
	"ohms",
	"Pa",
	"pascals",
	"percent",
	"picometers",
	"pm",
	"radians",
	"radians/second",
	"radians/second^2",
	"s",
	"seconds",
	"V",
	"view-coordinates",
	"volts",
	"W",
	"watts",
];

pub fn is_valid_unit(unit: &str) -> bool {
	UNITS.contains(&unit)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_is_closed() {
		assert!(is_valid_unit("meters"));
		assert!(is_valid_unit("m/s"));
		assert!(!is_valid_unit("furlongs"));
		assert!(!is_valid_unit(""));
	}
}
