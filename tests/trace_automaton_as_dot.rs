// Outputs the compiled graph and the deterministic automaton in dot format for some patterns.
// Run with `cargo test -- --nocapture trace_automaton_as_dot`
#![cfg(feature = "dot_writer")]

use automatch::{Automaton, Graph, Matcher};

const PATTERNS: &[&str] = &[
    "'cat' | 'car'",
    "a(b|c)*d",
    "[a-z]{2,3}",
    r"[0-9]+(\.[0-9]+)?",
    "[a-c]x | [b-d]y",
];

#[test]
fn trace_automaton_as_dot() {
    // Initialize the logger
    let _ = env_logger::builder()
        .is_test(true)
        .parse_env(
            env_logger::Env::default().default_filter_or("automatch::internal::determinize=trace"),
        )
        .try_init();

    for pattern in PATTERNS {
        println!("--------------------------------------------------");
        println!("Pattern: {}", pattern);
        println!("--------------------------------------------------");

        let matcher: Matcher = pattern.parse().unwrap();
        let mut graph = Graph::new();
        let subgraph = matcher.compile(&mut graph).unwrap();

        let mut nfa_dot = Vec::new();
        graph.render_dot(pattern, &mut nfa_dot);
        let nfa_dot = String::from_utf8(nfa_dot).unwrap();
        println!("{}", nfa_dot);
        assert!(nfa_dot.contains("ε"));

        let automaton = Automaton::new(graph, subgraph);
        let mut dfa_dot = Vec::new();
        automaton.render_dot(pattern, &mut dfa_dot);
        let dfa_dot = String::from_utf8(dfa_dot).unwrap();
        println!("{}", dfa_dot);
        assert!(!dfa_dot.contains("ε"));
    }
}
