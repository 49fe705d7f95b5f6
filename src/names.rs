//! Random account names for bootstrap accounts, e.g. "OnyxHeron".

use rand::seq::IndexedRandom;

static STONES: &[&str] = &[
    "Agate", "Amber", "Basalt", "Beryl", "Flint", "Garnet", "Granite", "Jade", "Jasper", "Jet",
    "Marble", "Obsidian", "Onyx", "Opal", "Pumice", "Quartz", "Ruby", "Shale", "Slate", "Topaz",
];

static BIRDS: &[&str] = &[
    "Auk", "Bittern", "Curlew", "Dunlin", "Egret", "Gannet", "Grebe", "Heron", "Kestrel", "Kite",
    "Merlin", "Osprey", "Plover", "Puffin", "Rook", "Shrike", "Siskin", "Tern", "Wagtail", "Wren",
];

/// Generate a random name in the format "StoneBird".
pub fn generate_name() -> String {
    let mut rng = rand::rng();
    let stone = STONES.choose(&mut rng).copied().unwrap_or("Slate");
    let bird = BIRDS.choose(&mut rng).copied().unwrap_or("Wren");
    format!("{}{}", stone, bird)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_name_format() {
        let name = generate_name();
        assert!(name.chars().all(|c| c.is_ascii_alphabetic()));
        assert!(STONES.iter().any(|s| name.starts_with(s)));
        assert!(BIRDS.iter().any(|b| name.ends_with(b)));
    }

    #[test]
    fn test_generate_name_is_valid_username() {
        // Bootstrap names must pass the same limits as API-created usernames.
        for _ in 0..50 {
            let name = generate_name();
            assert!(name.chars().count() <= 32);
        }
    }
}
