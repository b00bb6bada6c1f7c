//! Hygiene Guidance

/// Advice shown regardless of the predicted disease
pub const GENERAL_TIPS: [&str; 5] = [
    "Always wash hands with soap and water",
    "Drink only clean, treated water",
    "Cook food thoroughly",
    "Avoid raw or undercooked food",
    "Keep living areas clean and sanitized",
];

const FALLBACK_TIPS: [&str; 3] = [
    "Practice good hygiene",
    "Drink clean water",
    "Wash hands frequently",
];

/// Hygiene tips for a disease class; unknown classes get generic advice
pub fn hygiene_tips(disease: &str) -> &'static [&'static str] {
    match disease {
        "Cholera" => &[
            "Boil water before drinking",
            "Wash hands frequently with soap",
            "Avoid raw or undercooked food",
            "Use chlorine tablets for water purification",
        ],
        "Typhoid" => &[
            "Ensure proper food hygiene",
            "Avoid street food during outbreaks",
            "Get vaccinated if available",
            "Wash fruits and vegetables thoroughly",
        ],
        "HepatitisA" => &[
            "Practice good personal hygiene",
            "Avoid sharing personal items",
            "Get hepatitis A vaccination",
            "Wash hands before eating",
        ],
        "Diarrhea" => &[
            "Drink plenty of clean water",
            "Use oral rehydration solutions",
            "Avoid dairy products if lactose intolerant",
            "Practice proper hand hygiene",
        ],
        "Safe" => &[
            "Continue current hygiene practices",
            "Maintain clean water sources",
            "Regular health monitoring",
            "Stay informed about water quality",
        ],
        _ => &FALLBACK_TIPS,
    }
}
