//! Prompt scrubbing for image generation.
//!
//! Image-safety filters are twitchy about violence and damage vocabulary
//! even in harmless workshop scenes ("shattered", "blade", "burn marks").
//! Scrubbing is purely lexical: known trigger words swap for neutral
//! phrasing at word boundaries, whitespace gets normalized, and the result
//! is stable under repeated application.

use regex::Regex;

/// Trigger words and their neutral stand-ins. Replacements must never
/// contain a word that appears on the left side, or scrubbing stops
/// being idempotent.
const SCRUB_TABLE: &[(&str, &str)] = &[
    (r"(?i)\bshatter(?:ed|ing|s)?\b", "cracked"),
    (r"(?i)\bsmash(?:ed|ing|es)?\b", "dented"),
    (r"(?i)\bdestroy(?:ed|ing|s)?\b", "worn out"),
    (r"(?i)\bdestruction\b", "heavy wear"),
    (r"(?i)\bblade\b", "cutting edge"),
    (r"(?i)\bknife\b", "cutting tool"),
    (r"(?i)\bknives\b", "cutting tools"),
    (r"(?i)\bweapons?\b", "tools"),
    (r"(?i)\bguns?\b", "applicator"),
    (r"(?i)\bbullets?\b", "metal beads"),
    (r"(?i)\bshoot(?:ing|s)?\b", "spray"),
    (r"(?i)\bstab(?:bed|bing|s)?\b", "pressed"),
    (r"(?i)\bsever(?:ed|ing|s)?\b", "separated"),
    (r"(?i)\bexplo(?:de[ds]?|ding|sions?|sive)\b", "burst"),
    (r"(?i)\bburn(?:ed|t|ing|s)?\b", "heat-marked"),
    (r"(?i)\bflames?\b", "glow"),
    (r"(?i)\bfire\b", "heat"),
    (r"(?i)\bblood(?:y|ied)?\b", "stained"),
    (r"(?i)\bwound(?:ed|s)?\b", "marked"),
    (r"(?i)\bkill(?:ed|ing|s)?\b", "stopped"),
];

/// Replace safety-trigger vocabulary with workshop-neutral phrasing and
/// collapse whitespace. Deterministic and idempotent.
pub fn scrub_prompt(prompt: &str) -> String {
    let mut scrubbed = prompt.to_string();
    for (pattern, replacement) in SCRUB_TABLE {
        let re = Regex::new(pattern).unwrap_or_else(|_| Regex::new("$^").unwrap());
        scrubbed = re.replace_all(&scrubbed, *replacement).into_owned();
    }

    let ws = Regex::new(r"\s+").unwrap_or_else(|_| Regex::new("$^").unwrap());
    ws.replace_all(scrubbed.trim(), " ").into_owned()
}

/// Whether scrubbing would change this prompt. Used to note swaps in the
/// session log without storing both versions everywhere.
pub fn prompt_needs_scrub(prompt: &str) -> bool {
    scrub_prompt(prompt) != scrub_prompt_identity(prompt)
}

// Whitespace-normalized copy without word replacement, for comparison.
fn scrub_prompt_identity(prompt: &str) -> String {
    let ws = Regex::new(r"\s+").unwrap_or_else(|_| Regex::new("$^").unwrap());
    ws.replace_all(prompt.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_trigger_words() {
        let scrubbed = scrub_prompt("A shattered vase next to a knife and burn marks");
        assert_eq!(
            scrubbed,
            "A cracked vase next to a cutting tool and heat-marked marks"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(scrub_prompt("SHATTERED glass"), "cracked glass");
    }

    #[test]
    fn test_word_boundaries_hold() {
        // "gunmetal" must survive even though "gun" is on the list
        let scrubbed = scrub_prompt("gunmetal grey finish on the bracket");
        assert_eq!(scrubbed, "gunmetal grey finish on the bracket");
    }

    #[test]
    fn test_glue_gun_becomes_applicator() {
        assert_eq!(
            scrub_prompt("applying hot glue with a glue gun"),
            "applying hot glue with a glue applicator"
        );
    }

    #[test]
    fn test_idempotent() {
        let once = scrub_prompt("the exploded flame-scorched weapon rack");
        let twice = scrub_prompt(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_whitespace_normalized() {
        assert_eq!(scrub_prompt("  two   spaced\n\nwords  "), "two spaced words");
    }

    #[test]
    fn test_needs_scrub() {
        assert!(prompt_needs_scrub("a burned table leg"));
        assert!(!prompt_needs_scrub("a cracked table leg"));
    }
}
