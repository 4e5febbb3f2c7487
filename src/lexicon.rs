//! Built-in sentiment lexicons and sentence-model tables.
//!
//! Valences use a -4..=4 scale. Keys are lowercase surface forms; the
//! resource loader also indexes their lemmas.

const EN_VALENCES: &[(&str, f64)] = &[
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 3.2),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("fantastic", 2.6),
    ("wonderful", 2.7),
    ("love", 3.2),
    ("like", 1.5),
    ("nice", 1.8),
    ("happy", 2.7),
    ("pleased", 1.9),
    ("satisfied", 1.8),
    ("friendly", 2.2),
    ("helpful", 1.8),
    ("easy", 1.9),
    ("fast", 1.2),
    ("quick", 1.1),
    ("clean", 1.7),
    ("comfortable", 1.5),
    ("recommend", 1.5),
    ("perfect", 2.7),
    ("best", 3.2),
    ("better", 1.9),
    ("enjoy", 2.2),
    ("impressive", 2.3),
    ("reliable", 1.6),
    ("polite", 1.6),
    ("delicious", 2.7),
    ("fair", 1.3),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("improve", 1.1),
    ("bad", -2.5),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("horrible", -2.5),
    ("poor", -2.1),
    ("worst", -3.1),
    ("worse", -2.1),
    ("hate", -2.7),
    ("dislike", -1.6),
    ("slow", -1.1),
    ("rude", -2.0),
    ("dirty", -1.9),
    ("expensive", -1.1),
    ("broken", -1.8),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("unhappy", -1.8),
    ("angry", -2.3),
    ("annoying", -1.7),
    ("problem", -1.7),
    ("problems", -1.7),
    ("difficult", -1.5),
    ("confusing", -1.3),
    ("useless", -1.8),
    ("waste", -1.8),
    ("wrong", -2.1),
    ("fail", -2.3),
    ("failed", -2.3),
    ("complaint", -1.5),
    ("unfriendly", -1.5),
    ("late", -0.9),
    ("noisy", -1.2),
    ("crowded", -1.0),
    ("bug", -1.4),
    ("crash", -1.9),
];

const DE_VALENCES: &[(&str, f64)] = &[
    ("gut", 1.9),
    ("toll", 2.8),
    ("super", 2.9),
    ("ausgezeichnet", 3.2),
    ("hervorragend", 3.1),
    ("prima", 2.5),
    ("schön", 2.0),
    ("freundlich", 2.2),
    ("hilfreich", 1.8),
    ("zufrieden", 1.8),
    ("glücklich", 2.7),
    ("lieben", 3.2),
    ("liebe", 2.9),
    ("gefällt", 1.8),
    ("empfehlen", 1.5),
    ("einfach", 1.4),
    ("schnell", 1.2),
    ("sauber", 1.7),
    ("bequem", 1.5),
    ("perfekt", 2.7),
    ("beste", 3.2),
    ("besser", 1.9),
    ("danke", 1.9),
    ("zuverlässig", 1.6),
    ("lecker", 2.5),
    ("schlecht", -2.5),
    ("schrecklich", -2.3),
    ("furchtbar", -2.3),
    ("miserabel", -2.6),
    ("schlimm", -2.0),
    ("langsam", -1.1),
    ("unfreundlich", -2.0),
    ("schmutzig", -1.9),
    ("teuer", -1.1),
    ("kaputt", -1.8),
    ("enttäuscht", -1.9),
    ("enttäuschend", -2.2),
    ("unzufrieden", -1.8),
    ("ärgerlich", -1.9),
    ("problem", -1.7),
    ("probleme", -1.7),
    ("schwierig", -1.5),
    ("verwirrend", -1.3),
    ("nutzlos", -1.8),
    ("falsch", -2.0),
    ("laut", -1.0),
    ("hassen", -2.7),
];

const ES_VALENCES: &[(&str, f64)] = &[
    ("bueno", 1.9),
    ("buena", 1.9),
    ("bien", 1.6),
    ("excelente", 3.2),
    ("genial", 2.9),
    ("increíble", 2.8),
    ("maravilloso", 2.7),
    ("fantástico", 2.6),
    ("encanta", 3.0),
    ("amable", 2.2),
    ("útil", 1.8),
    ("satisfecho", 1.8),
    ("contento", 2.2),
    ("feliz", 2.7),
    ("recomiendo", 1.5),
    ("fácil", 1.9),
    ("rápido", 1.2),
    ("limpio", 1.7),
    ("cómodo", 1.5),
    ("perfecto", 2.7),
    ("mejor", 2.0),
    ("gracias", 1.9),
    ("delicioso", 2.7),
    ("malo", -2.5),
    ("mala", -2.5),
    ("mal", -2.0),
    ("terrible", -2.1),
    ("horrible", -2.5),
    ("pésimo", -3.0),
    ("peor", -2.3),
    ("lento", -1.1),
    ("grosero", -2.0),
    ("sucio", -1.9),
    ("caro", -1.1),
    ("roto", -1.8),
    ("decepcionado", -1.9),
    ("decepcionante", -2.2),
    ("insatisfecho", -1.8),
    ("problema", -1.7),
    ("problemas", -1.7),
    ("difícil", -1.5),
    ("confuso", -1.3),
    ("inútil", -1.8),
    ("odio", -2.7),
    ("ruidoso", -1.2),
];

const FR_VALENCES: &[(&str, f64)] = &[
    ("bon", 1.9),
    ("bonne", 1.9),
    ("bien", 1.6),
    ("excellent", 3.2),
    ("excellente", 3.2),
    ("génial", 2.9),
    ("super", 2.9),
    ("formidable", 2.8),
    ("merveilleux", 2.7),
    ("parfait", 2.7),
    ("adore", 3.0),
    ("aime", 2.0),
    ("agréable", 2.0),
    ("aimable", 2.2),
    ("sympa", 2.0),
    ("utile", 1.8),
    ("satisfait", 1.8),
    ("content", 2.2),
    ("heureux", 2.7),
    ("recommande", 1.5),
    ("facile", 1.9),
    ("rapide", 1.2),
    ("propre", 1.7),
    ("confortable", 1.5),
    ("meilleur", 2.0),
    ("merci", 1.9),
    ("délicieux", 2.7),
    ("mauvais", -2.5),
    ("mauvaise", -2.5),
    ("mal", -2.0),
    ("terrible", -2.1),
    ("horrible", -2.5),
    ("nul", -2.3),
    ("pire", -2.6),
    ("lent", -1.1),
    ("impoli", -2.0),
    ("sale", -1.9),
    ("cher", -1.1),
    ("cassé", -1.8),
    ("déçu", -1.9),
    ("décevant", -2.2),
    ("mécontent", -1.8),
    ("problème", -1.7),
    ("problèmes", -1.7),
    ("difficile", -1.5),
    ("inutile", -1.8),
    ("déteste", -2.7),
    ("bruyant", -1.2),
];

// Entries ending in an apostrophe match as prefixes ("n'" covers "n'est").
const EN_NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "cannot", "without",
    "don't", "doesn't", "didn't", "isn't", "wasn't", "aren't", "weren't", "won't", "can't",
    "couldn't", "shouldn't", "wouldn't", "hardly",
];
const DE_NEGATORS: &[&str] = &[
    "nicht", "kein", "keine", "keinen", "keiner", "keinem", "nie", "niemals", "nichts", "ohne",
];
const ES_NEGATORS: &[&str] = &["no", "nunca", "nada", "ni", "jamás", "tampoco", "sin"];
const FR_NEGATORS: &[&str] = &[
    "ne", "n'", "pas", "jamais", "rien", "aucun", "aucune", "sans", "ni",
];

const EN_BOOSTERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "so",
    "super",
    "incredibly",
    "absolutely",
    "totally",
    "highly",
    "especially",
];
const DE_BOOSTERS: &[&str] = &[
    "sehr",
    "wirklich",
    "extrem",
    "total",
    "besonders",
    "äußerst",
    "echt",
];
const ES_BOOSTERS: &[&str] = &[
    "muy",
    "realmente",
    "súper",
    "extremadamente",
    "totalmente",
    "bastante",
];
const FR_BOOSTERS: &[&str] = &[
    "très",
    "vraiment",
    "extrêmement",
    "trop",
    "tellement",
    "absolument",
];

// Lowercase, with the trailing dot.
const EN_ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "st.", "e.g.", "i.e.", "etc.", "vs.", "approx.", "no.",
];
const DE_ABBREVIATIONS: &[&str] = &[
    "z.b.", "bzw.", "usw.", "ca.", "dr.", "hr.", "fr.", "nr.", "d.h.", "u.a.", "evtl.", "ggf.",
];
const ES_ABBREVIATIONS: &[&str] = &[
    "sr.", "sra.", "srta.", "dr.", "dra.", "p.ej.", "etc.", "núm.", "ud.", "uds.",
];
const FR_ABBREVIATIONS: &[&str] = &[
    "m.", "mme.", "mlle.", "dr.", "p.ex.", "etc.", "n°.", "env.", "cf.",
];

/// Valence table for a resource code (`pt` resolves to `fr` before reaching here).
pub fn valences(code: &str) -> &'static [(&'static str, f64)] {
    match code {
        "de" => DE_VALENCES,
        "es" => ES_VALENCES,
        "fr" => FR_VALENCES,
        _ => EN_VALENCES,
    }
}

pub fn negators(code: &str) -> &'static [&'static str] {
    match code {
        "de" => DE_NEGATORS,
        "es" => ES_NEGATORS,
        "fr" => FR_NEGATORS,
        _ => EN_NEGATORS,
    }
}

pub fn boosters(code: &str) -> &'static [&'static str] {
    match code {
        "de" => DE_BOOSTERS,
        "es" => ES_BOOSTERS,
        "fr" => FR_BOOSTERS,
        _ => EN_BOOSTERS,
    }
}

pub fn abbreviations(code: &str) -> &'static [&'static str] {
    match code {
        "de" => DE_ABBREVIATIONS,
        "es" => ES_ABBREVIATIONS,
        "fr" => FR_ABBREVIATIONS,
        _ => EN_ABBREVIATIONS,
    }
}
