//! Fixed categorical universes the simulator draws from.

/// Regions with the districts that belong to each.
pub const REGIONS: &[(&str, &[&str])] = &[
    ("Maharashtra", &["Mumbai", "Pune", "Nagpur", "Nashik"]),
    ("Uttar Pradesh", &["Lucknow", "Kanpur", "Varanasi", "Agra"]),
    ("Karnataka", &["Bangalore", "Mysore", "Hubli", "Mangalore"]),
    ("Delhi", &["New Delhi", "North Delhi", "South Delhi"]),
    ("Tamil Nadu", &["Chennai", "Coimbatore", "Madurai"]),
    ("Bihar", &["Patna", "Gaya", "Muzaffarpur"]),
    ("West Bengal", &["Kolkata", "Howrah", "Darjeeling"]),
];

/// Request types produced by the live simulator.
pub const REQUEST_TYPES: &[&str] = &["New Enrollment", "Biometric Update", "Demographic Update"];

pub const GENDERS: &[&str] = &["Male", "Female", "Transgender"];

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 90;

/// Districts of `region`, empty if the region is unknown.
pub fn districts_of(region: &str) -> &'static [&'static str] {
    REGIONS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, districts)| *districts)
        .unwrap_or(&[])
}

pub fn region_names() -> impl Iterator<Item = &'static str> {
    REGIONS.iter().map(|(name, _)| *name)
}
