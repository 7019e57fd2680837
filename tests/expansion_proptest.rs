//! Property-based tests for the expansion engine
//!
//! These check the copy and whitespace rules over generated text, and that
//! redefinition never mixes old and new bodies.

use mx::settings::EngineConfig;
use mx::Engine;
use proptest::prelude::*;

fn expand(input: &str) -> String {
    Engine::new(EngineConfig::default())
        .unwrap()
        .expand_str(input)
        .unwrap()
}

/// Text with no escape, quote or whitespace characters.
fn plain_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9.,;:!?{}()\\[\\]<>=+*/#-]{0,64}|[こんにちは世界äöüßé]{0,16}"
}

fn word_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,8}"
}

fn whitespace_run_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![Just(' '), Just('\t'), Just('\n')], 1..8)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Text with words and whitespace runs but no escape or quote characters.
fn prose_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec((word_strategy(), whitespace_run_strategy()), 0..12).prop_map(
        |parts| {
            parts
                .into_iter()
                .map(|(word, run)| format!("{}{}", word, run))
                .collect()
        },
    )
}

fn collapse(run: &str) -> &'static str {
    if run.chars().filter(|&c| c == '\n').count() > 1 {
        "\n\n"
    } else {
        " "
    }
}

proptest! {
    #[test]
    fn plain_text_is_copied_exactly(input in plain_text_strategy()) {
        prop_assert_eq!(expand(&input), input);
    }

    #[test]
    fn whitespace_runs_collapse(parts in prop::collection::vec((word_strategy(), whitespace_run_strategy()), 1..12)) {
        let input: String = parts.iter().map(|(w, r)| format!("{}{}", w, r)).collect();
        let expected: String = parts.iter().map(|(w, r)| format!("{}{}", w, collapse(r))).collect();
        prop_assert_eq!(expand(&input), expected);
    }

    #[test]
    fn expansion_of_prose_is_a_fixed_point(input in prose_strategy()) {
        let once = expand(&input);
        let twice = expand(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn redefinition_never_mixes_bodies(
        first in "[a-z]{1,20}",
        second in "[a-z]{1,20}",
    ) {
        let input = format!(
            r"\define{{m}}{{{}}}\m|\define{{m}}{{{}}}\m",
            first, second
        );
        prop_assert_eq!(expand(&input), format!("{}|{}", first, second));
    }

    #[test]
    fn arguments_are_substituted_verbatim(arg in "[a-zA-Z0-9.,!?]{0,32}") {
        let input = format!(r"\define{{wrap a}}{{[\a]}}\wrap{{{}}}", arg);
        prop_assert_eq!(expand(&input), format!("[{}]", arg));
    }
}
