use serde::{Deserialize, Serialize};

/// A slide theme offered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignStyle {
    pub id: String,
    pub name: String,
}

const BUILTIN_DESIGNS: [(&str, &str); 46] = [
    ("minimal_1", "Pure White"),
    ("minimal_2", "Soft Gray"),
    ("minimal_3", "Ivory Elegance"),
    ("minimal_4", "Light Blue"),
    ("minimal_5", "Pale Green"),
    ("minimal_6", "Warm Beige"),
    ("corporate_1", "Navy Blue"),
    ("corporate_2", "Deep Blue"),
    ("corporate_3", "Charcoal"),
    ("corporate_4", "Royal Blue"),
    ("corporate_5", "Slate Gray"),
    ("corporate_6", "Business Green"),
    ("corporate_7", "Professional Purple"),
    ("corporate_8", "Executive Navy"),
    ("creative_1", "Sunset Orange"),
    ("creative_2", "Vibrant Pink"),
    ("creative_3", "Electric Blue"),
    ("creative_4", "Lime Green"),
    ("creative_5", "Purple Dream"),
    ("creative_6", "Coral Red"),
    ("creative_7", "Turquoise"),
    ("creative_8", "Golden Yellow"),
    ("academic_1", "Forest Green"),
    ("academic_2", "Oxford Blue"),
    ("academic_3", "Burgundy"),
    ("academic_4", "Teal Scholar"),
    ("academic_5", "Maroon"),
    ("academic_6", "Sage Green"),
    ("academic_7", "Royal Purple"),
    ("academic_8", "Navy Scholar"),
    ("tech_1", "Dark Tech"),
    ("tech_2", "Cyber Blue"),
    ("tech_3", "Matrix Green"),
    ("tech_4", "Neon Purple"),
    ("tech_5", "Dark Mode"),
    ("tech_6", "Electric Blue"),
    ("tech_7", "Holographic"),
    ("tech_8", "Digital Orange"),
    ("modern_1", "Gradient Blue"),
    ("modern_2", "Sunset Glow"),
    ("modern_3", "Ocean Wave"),
    ("modern_4", "Forest Mist"),
    ("modern_5", "Purple Haze"),
    ("modern_6", "Golden Hour"),
    ("modern_7", "Arctic Blue"),
    ("modern_8", "Coral Reef"),
];

/// The design styles known without asking the backend.
pub fn builtin_designs() -> Vec<DesignStyle> {
    BUILTIN_DESIGNS
        .iter()
        .map(|(id, name)| DesignStyle {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}
