//! Random agent names
//!
//! Unnamed agents get an `adjective_scientist` name such as `admiring_turing`.

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "admiring", "adoring", "agitated", "amazing", "angry", "awesome",
    "beautiful", "blissful", "bold", "boring", "brave", "busy",
    "charming", "clever", "cool", "compassionate", "competent",
    "confident", "cranky", "crazy", "dazzling", "determined",
    "distracted", "dreamy", "eager", "ecstatic", "elastic", "elated",
    "elegant", "eloquent", "epic", "exciting", "fervent", "festive",
    "flamboyant", "focused", "friendly", "frosty", "funny", "gallant",
    "gifted", "goofy", "gracious", "great", "happy", "hardcore",
    "heuristic", "hopeful", "hungry", "infallible", "inspiring",
    "intelligent", "interesting", "jolly", "jovial", "keen", "kind",
    "laughing", "loving", "lucid", "magical", "modest", "musing",
    "nervous", "nice", "nifty", "nostalgic", "objective", "optimistic",
    "peaceful", "pedantic", "pensive", "practical", "priceless",
    "quirky", "quizzical", "recursing", "relaxed", "reverent",
    "romantic", "serene", "sharp", "silly", "sleepy", "stoic",
    "strange", "suspicious", "sweet", "tender", "thirsty", "trusting",
    "unruffled", "upbeat", "vibrant", "vigilant", "vigorous",
    "wizardly", "wonderful", "xenodochial", "youthful", "zealous", "zen",
];

const SCIENTISTS: &[&str] = &[
    "agnesi", "albattani", "allen", "archimedes", "aryabhata", "babbage",
    "banach", "bardeen", "bartik", "bell", "bhabha", "blackwell", "bohr",
    "booth", "bose", "brahmagupta", "burnell", "cannon", "carson",
    "cerf", "chandrasekhar", "chebyshev", "clarke", "cori", "cray",
    "curie", "darwin", "davinci", "diffie", "dijkstra", "dirac",
    "easley", "edison", "einstein", "elion", "engelbart", "euclid",
    "euler", "faraday", "fermat", "fermi", "feynman", "franklin",
    "galileo", "galois", "gauss", "germain", "goldberg", "goldwasser",
    "goodall", "hamilton", "hawking", "heisenberg", "hellman", "hertz",
    "hodgkin", "hopper", "hypatia", "jackson", "jemison", "jennings",
    "johnson", "kalam", "kepler", "khayyam", "kilby", "knuth",
    "kowalevski", "lamarr", "lamport", "leavitt", "liskov", "lovelace",
    "margulis", "maxwell", "mccarthy", "mcclintock", "meitner",
    "mendel", "mendeleev", "merkle", "mirzakhani", "moore", "napier",
    "nash", "neumann", "newton", "nightingale", "noether", "noyce",
    "pascal", "pasteur", "payne", "perlman", "pike", "poincare",
    "ptolemy", "raman", "ramanujan", "ride", "ritchie", "rubin",
    "shamir", "shannon", "shockley", "sinoussi", "stonebraker",
    "sutherland", "swartz", "tereshkova", "tesla", "thompson",
    "torvalds", "turing", "villani", "wiles", "wilson", "wing",
    "wozniak", "wright", "wu", "yalow", "yonath",
];

/// Pick a random `adjective_scientist` name
pub fn generate_agent_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("nameless");
    let scientist = SCIENTISTS.choose(&mut rng).copied().unwrap_or("agent");
    format!("{adjective}_{scientist}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_name_shape() {
        let name = generate_agent_name();
        let (adjective, scientist) = name.split_once('_').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(SCIENTISTS.contains(&scientist));
    }
}
