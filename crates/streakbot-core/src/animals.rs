//! Built-in transformation labels.

const ANIMALS: &[&str] = &[
    "axolotl", "badger", "bat", "bear", "beaver", "bunny", "capybara", "cat", "chameleon",
    "chinchilla", "cow", "crab", "crow", "deer", "dog", "dolphin", "dragon", "duck", "eagle",
    "ferret", "fox", "frog", "gecko", "goat", "goose", "hamster", "hedgehog", "horse", "hyena",
    "kangaroo", "koala", "lemur", "lion", "lizard", "llama", "lynx", "mole", "moose", "mouse",
    "narwhal", "octopus", "opossum", "otter", "owl", "panda", "parrot", "penguin", "pig",
    "platypus", "possum", "quokka", "rabbit", "raccoon", "rat", "raven", "red panda", "seal",
    "shark", "sheep", "skunk", "sloth", "snake", "squirrel", "tiger", "toad", "turtle", "weasel",
    "wolf", "wombat", "zebra",
];

/// The default label list, used when the config does not name its own.
pub fn default_animals() -> Vec<String> {
    ANIMALS.iter().map(|a| (*a).to_string()).collect()
}
