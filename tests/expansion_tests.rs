/// End-to-end expansion tests through the public engine API.

use narrative_grammar::{
    CandidateSelector, Engine, EngineError, EvalError, Finding, GrammarError, PickFirst,
    RuleDefinition, Selector, TagStoragePolicy, WeightedCandidates,
};
use rand::rngs::StdRng;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn grammar(rules: &[(&str, Vec<&str>)]) -> Engine {
    Engine::builder()
        .seed(42)
        .rules(rules.iter().map(|(name, candidates)| (*name, candidates.clone())))
        .build()
        .unwrap()
}

fn hierarchical(rules: &[(&str, Vec<&str>)]) -> Engine {
    Engine::builder()
        .seed(42)
        .tag_storage(TagStoragePolicy::Hierarchical)
        .rules(rules.iter().map(|(name, candidates)| (*name, candidates.clone())))
        .build()
        .unwrap()
}

fn assert_one_of(output: &str, choices: &[&str]) {
    assert!(choices.contains(&output), "'{}' not in {:?}", output, choices);
}

// --- Literal text and escaping ---

#[test]
fn plain_text_round_trips() {
    let mut t = Engine::new();
    for input in ["hello world", "", "  spaced  out  ", "one-two three_four", "ünïcödé"] {
        assert_eq!(t.expand(input), input);
    }
}

#[test]
fn escaped_reserved_characters_are_literal() {
    let mut t = grammar(&[("rule", vec!["expanded"])]);
    assert_eq!(t.expand("\\#rule\\#"), "#rule#");
    assert_eq!(t.expand("\\[not a tag\\]"), "[not a tag]");
    assert_eq!(t.expand("a\\, b\\. c"), "a, b. c");
}

#[test]
fn stray_punctuation_is_text() {
    let mut t = grammar(&[("name", vec!["jo"])]);
    assert_eq!(t.expand("#name#, hi. (really) a:b"), "jo, hi. (really) a:b");
}

#[test]
fn keywords_alone_are_text() {
    let mut t = Engine::new();
    for keyword in ["if", "then", "else", "while", "do", "in", "not in"] {
        assert_eq!(t.expand(keyword), keyword);
    }
    for phrase in ["if this then that", "do it", "in the end"] {
        assert_eq!(t.expand(phrase), phrase);
    }

    let mut t = grammar(&[("word", vec!["if", "then", "else", "while", "do", "in", "not in"])]);
    for _ in 0..7 {
        assert_one_of(
            &t.expand("#word#"),
            &["if", "then", "else", "while", "do", "in", "not in"],
        );
    }
}

// --- Rules ---

#[test]
fn undefined_rules_pass_through() {
    let mut t = Engine::new();
    assert_eq!(t.expand("#missing#"), "#missing#");
    assert_eq!(t.expand("{missing}"), "#missing#");
}

#[test]
fn empty_references_expand_to_nothing() {
    let mut t = Engine::new();
    assert_eq!(t.expand("a##b{}c"), "abc");
}

#[test]
fn numeric_rule_names() {
    let mut t = grammar(&[("7", vec!["seven"])]);
    assert_eq!(t.expand("#7#"), "seven");
}

#[test]
fn bad_candidates_are_dropped_at_registration() {
    let mut t = grammar(&[("r", vec!["good", "[bad", "#worse"])]);
    for _ in 0..5 {
        assert_eq!(t.expand("#r#"), "good");
    }
}

#[test]
fn rules_can_be_added_and_removed_at_runtime() {
    let mut t = Engine::new();
    t.add_rule("list", vec!["x", "y"]).unwrap();
    t.add_rule("one", String::from("#list#!")).unwrap();
    assert_one_of(&t.expand("#one#"), &["x!", "y!"]);
    assert!(t.remove_rule("list"));
    assert_eq!(t.expand("#one#"), "#list#!");
    assert_eq!(t.rule_names(), vec!["one"]);
}

// --- Inline and runtime rules ---

#[test]
fn inline_rules() {
    let mut t = Engine::new();
    assert_eq!(t.expand("#(1)#"), "1");
    assert_eq!(t.expand("{(1)}"), "1");
    assert_one_of(&t.expand("{(1,2,3,4)}"), &["1", "2", "3", "4"]);
    assert_eq!(t.expand("{([tag:0]{tag})}"), "0");
}

#[test]
fn inline_rules_take_modifiers() {
    let mut t = Engine::builder().seed(1).standard_modifiers().build().unwrap();
    assert_one_of(&t.expand("{(ab,cd).caps}"), &["AB", "CD"]);
}

#[test]
fn named_inline_rules() {
    let mut t = Engine::new();
    assert_eq!(t.expand("{item(1)}{item}"), "1");
    assert_eq!(t.expand("#item(1)#{item}"), "1");
    assert_eq!(t.expand("{item(1)}#item#"), "1");
    assert_eq!(t.expand("{b(0)}{b}{b()}{b}"), "0");
    assert_eq!(t.expand("{rule([tag:hello]{tag})}{rule}"), "hello");
}

#[test]
fn runtime_rules_shadow_static_rules() {
    let mut t = grammar(&[("item", vec!["static"])]);
    assert_eq!(t.expand("#item#"), "static");
    assert_eq!(t.expand("{item(runtime)}#item#"), "runtime");
    assert_eq!(t.expand("#item#"), "static");
}

#[test]
fn runtime_rules_survive_when_context_is_kept() {
    let mut t = Engine::new();
    t.expand("{greet(hi,hey)}");
    assert_one_of(&t.expand_with_context("#greet#", true), &["hi", "hey"]);
    assert_eq!(t.expand("#greet#"), "#greet#");
}

// --- Tags ---

#[test]
fn tags_round_trip() {
    let mut t = Engine::new();
    assert_eq!(t.expand("[tag:value]#tag#"), "value");
    assert_eq!(t.expand("{[tag:value]tag}"), "value");
    for _ in 0..10 {
        assert_one_of(&t.expand("[tag:a,b]#tag#"), &["a", "b"]);
    }
}

#[test]
fn tags_are_set_inside_rules() {
    let mut t = grammar(&[
        ("outside_rule", vec!["[tag:value]#tag#"]),
        ("inside_rule", vec!["#[tag:value]tag#"]),
        ("name", vec!["benzi"]),
        ("msg", vec!["#[tag:#name#]#hello world #tag#"]),
    ]);
    assert_eq!(t.expand("#outside_rule#"), "value");
    assert_eq!(t.expand("#inside_rule#"), "value");
    assert_eq!(t.expand("#msg#"), "hello world benzi");
}

#[test]
fn tags_shadow_rules_and_tags() {
    let mut t = grammar(&[
        ("name", vec!["benzi"]),
        ("msg", vec!["#[name:override name]name#"]),
        ("twice", vec!["#[name:first time][name:second time]name#"]),
    ]);
    for _ in 0..5 {
        assert_eq!(t.expand("#msg#"), "override name");
    }
    assert_eq!(t.expand("#twice#"), "second time");
}

#[test]
fn tag_value_is_fixed_once_set() {
    let mut t = grammar(&[("digit", vec!["0", "1", "2", "3"])]);
    for _ in 0..10 {
        let out = t.expand("[d:#digit#]#d##d##d#");
        let first = &out[..1];
        assert_eq!(out, first.repeat(3));
    }
}

#[test]
fn nested_tags() {
    let mut t = Engine::new();
    for _ in 0..5 {
        assert_one_of(
            &t.expand("[[tag1:jack][tag2:jill]tag:#tag1#,#tag2#]#tag#"),
            &["jack", "jill"],
        );
    }
}

#[test]
fn tags_built_from_other_tags() {
    let mut t = grammar(&[
        ("name", vec!["jack"]),
        ("createTag1", vec!["[tag1:#name#]#tag1#"]),
        ("createTag2", vec!["[tag2:#createTag1#]"]),
        ("msg", vec!["[#createTag2#]#tag2#"]),
    ]);
    assert_eq!(t.expand("#msg#"), "jack");
}

#[test]
fn tag_values_take_modifiers() {
    let mut t = grammar(&[
        ("msg1", vec!["hello"]),
        ("msg2", vec!["world"]),
        ("msg", vec!["[tag1:#msg1# #msg2#][tag:#tag1.surprised#]#tag.caps#"]),
    ]);
    t.add_modifier("surprised", |s| format!("{}!", s));
    t.add_modifier("caps", |s| s.to_uppercase());
    assert_eq!(t.expand("#msg#"), "HELLO WORLD!");
}

#[test]
fn tags_reset_unless_context_is_kept() {
    let mut t = Engine::new();
    t.expand("[count:1]");
    assert_eq!(t.expand_with_context("#count#", true), "1");
    assert_eq!(t.expand("#count#"), "#count#");
}

// --- Hierarchical tag storage ---

#[test]
fn hierarchical_tags_do_not_override_at_different_levels() {
    let mut t = hierarchical(&[
        ("origin", vec!["[tag:level-0][#level1#]#tag#"]),
        ("level1", vec!["[tag:level-1]#tag# [#level2#]"]),
        ("level2", vec!["[tag:level-2]#tag# "]),
    ]);
    assert_eq!(t.expand("#origin#"), "level-1 level-2 level-0");
}

#[test]
fn hierarchical_tags_override_at_the_same_level() {
    let mut t = hierarchical(&[
        ("origin", vec!["[tag:level-0][#level-1A#][#level-1B#]#tag#"]),
        ("level-1A", vec!["[tag:level-1A]#tag# "]),
        ("level-1B", vec!["[tag:level-1B]#tag# "]),
    ]);
    assert_eq!(t.expand("#origin#"), "level-1A level-1B level-0");
}

#[test]
fn hierarchical_tags_read_from_lower_levels_only() {
    let mut t = hierarchical(&[
        ("origin", vec!["[tag:root]#level-1#"]),
        ("level-1", vec!["L1=#tag#, #level-2#"]),
        ("level-2", vec!["[#level-3#]L2=#tag#, #L3#"]),
        ("level-3", vec!["[L3:do_not_print]"]),
    ]);
    assert_eq!(t.expand("#origin#"), "L1=root, L2=root, #L3#");
}

#[test]
fn hierarchical_sub_rule_tags_are_not_visible() {
    let mut t = hierarchical(&[
        ("sub_tag_not_visible", vec!["[#sub_tag#]#tag2#"]),
        ("sub_tag", vec!["[tag2:sub tag]"]),
        ("inside_rule", vec!["#[tag:value]tag#"]),
    ]);
    assert_eq!(t.expand("#sub_tag_not_visible#"), "#tag2#");
    assert_eq!(t.expand("#inside_rule#"), "value");
}

#[test]
fn hierarchical_finished_sibling_does_not_shadow_parent() {
    let mut t = hierarchical(&[
        ("set_inner", vec!["[t:inner]"]),
        ("read", vec!["#t#"]),
        ("origin", vec!["#set_inner#[t:outer]#read#"]),
        ("twice", vec!["[t:outer]#set_inner##read# #read#"]),
    ]);
    assert_eq!(t.expand("#origin#"), "outer");
    assert_eq!(t.expand("#twice#"), "outer outer");
}

#[test]
fn hierarchical_top_level_tags_survive_kept_context() {
    let mut t = hierarchical(&[("setter", vec!["[m:2]"])]);
    t.expand_with_context("[n:1]#setter#", true);
    assert_eq!(t.expand_with_context("#n# #m#", true), "1 #m#");
}

#[test]
fn hierarchical_tags_in_conditions() {
    let mut t = hierarchical(&[
        ("level1if_A", vec!["[tag:name][if #tag# == name then valid else invalid]"]),
        ("call_A", vec!["#level1if_A#"]),
        ("level1if_B", vec!["[tag:name][if #tag# == name then valid #tag# else invalid #tag#]"]),
        ("call_B", vec!["#level1if_B#"]),
        ("create", vec!["[tag:level2]"]),
        ("level2_create", vec!["#create#"]),
        ("level2_if", vec!["[#level2_create#][if #tag# != level2 then valid]"]),
        ("call_L2", vec!["#level2_if#"]),
    ]);
    assert_eq!(t.expand("#call_A#"), "valid");
    assert_eq!(t.expand("#call_B#"), "valid name");
    assert_eq!(t.expand("#call_L2#"), "valid");
}

// --- Conditionals ---

#[test]
fn if_blocks_compare_values() {
    let mut t = grammar(&[("name", vec!["benzi"])]);
    assert_eq!(t.expand("[if #name#==benzi then ok]"), "ok");
    assert_eq!(t.expand("[if #name# == benzi then ok]"), "ok");
    assert_eq!(t.expand("[if #name#== benzi then ok]"), "ok");
    assert_eq!(t.expand("[if #name#==benzi     then ok]"), "");
    assert_ne!(t.expand("[if #name#==benzithen ok]"), "ok");
    assert_eq!(t.expand("[if #name# == benzi then ok else not-ok]"), "ok");
    assert_eq!(t.expand("[if #name#!=danny then ok else no]"), "ok");
    assert_eq!(t.expand("[if #name# != danny then ok else not-ok]"), "ok");
}

#[test]
fn if_blocks_on_tags() {
    let mut t = grammar(&[("name", vec!["benzi"])]);
    assert_eq!(t.expand("[tag:#name#][if #tag# == benzi then ok]"), "ok");
    assert_eq!(t.expand("[tag:#name#][if #tag# != benzi then not-ok else ok]"), "ok");
    assert_eq!(t.expand("[x:1][if #x#==1 then yes else no]"), "yes");
    assert_eq!(t.expand("[x:2][if #x#==1 then yes else no]"), "no");
}

#[test]
fn membership_checks_every_candidate() {
    let mut t = grammar(&[
        ("num", vec!["0", "1"]),
        ("msg", vec!["[if #value# in #num# then binary else not a binary]"]),
        ("msg_then_2word", vec!["[if #value# in #num# then binary digit else no]"]),
    ]);
    for _ in 0..4 {
        assert_eq!(t.expand("[value:0]#msg#"), "binary");
        assert_eq!(t.expand("[value:1]#msg#"), "binary");
    }
    assert_eq!(t.expand("[value:in]#msg#"), "not a binary");
    assert_eq!(t.expand("[value:while]#msg#"), "not a binary");
    assert_eq!(t.expand("[value:for]#msg#"), "not a binary");
    assert_eq!(t.expand("[value:10001]#msg#"), "not a binary");
    assert_eq!(t.expand("[value:0]#msg_then_2word#"), "binary digit");
    assert_eq!(t.expand("[tag:2,3][if #num# not in #tag# then ok]"), "ok");
}

#[test]
fn membership_expands_nested_candidates() {
    let mut t = grammar(&[
        ("tag2", vec!["name1", "name2", "name3", "#name4#"]),
        ("name4", vec!["name"]),
    ]);
    assert_eq!(t.expand("[if #[tag1:name]tag1# in #tag2# then ok else nope]"), "ok");
}

// --- Loops ---

#[test]
fn while_loop_runs_until_condition_fails() {
    let mut t = grammar(&[
        ("digit", vec!["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]),
        ("binary", vec!["0", "1"]),
    ]);
    for _ in 0..5 {
        let out = t.expand("[while #[d:#digit#]d# not in #binary# do #d#]");
        assert!(!out.contains('0') && !out.contains('1'), "{}", out);
        assert!(!out.contains("error"), "{}", out);
    }
}

/// Picks the first candidate a fixed number of times, then the second.
struct Countdown {
    first_picks: usize,
}

impl CandidateSelector for Countdown {
    fn pick(&mut self, _count: usize, _rng: &mut StdRng) -> usize {
        if self.first_picks > 0 {
            self.first_picks -= 1;
            0
        } else {
            1
        }
    }
}

#[test]
fn while_loop_with_custom_selector() {
    let mut t = grammar(&[("bit", vec!["0", "1"])]);
    t.set_selector("bit", Selector::new(Countdown { first_picks: 3 }))
        .unwrap();
    assert_eq!(t.expand("[while #bit# == 0 do x]"), "xxx");
}

#[test]
fn runaway_loop_is_contained() {
    let mut t = Engine::new();
    let out = t.expand("[while x == x do y]");
    assert!(out.starts_with("error: "), "{}", out);
    assert!(out.contains("stack overflow"), "{}", out);
    assert!(matches!(
        t.try_expand("[while x == x do y]", false),
        Err(EngineError::Eval(EvalError::FrameLimit(4096)))
    ));
    assert_eq!(t.expand("still works"), "still works");
}

#[test]
fn counter_across_calls() {
    let mut t = grammar(&[
        (
            "inc",
            vec!["[if #b0#==0 then [b0:1] else [b0:0][if #b1#==0 then [b1:1] else [b1:0]]]"],
        ),
        ("bits", vec!["#b1##b0#"]),
    ]);
    t.expand("[b0:0][b1:0]");
    let frames: Vec<String> = (0..5)
        .map(|_| t.expand_with_context("#inc##bits#", true))
        .collect();
    assert_eq!(frames, vec!["01", "10", "11", "00", "01"]);
}

// --- Recursion limits ---

#[test]
fn mutual_recursion_overflows_at_any_depth() {
    for depth in [20, 256] {
        let mut t = Engine::builder()
            .seed(1)
            .max_stack_depth(depth)
            .rule("a", "#b#")
            .rule("b", "#a#")
            .build()
            .unwrap();
        let out = t.expand("#a#");
        assert!(out.starts_with("error: "), "{}", out);
        assert!(out.contains("stack overflow"), "{}", out);
        assert!(matches!(
            t.try_expand("#a#", false),
            Err(EngineError::Eval(EvalError::StackOverflow(d))) if d == depth
        ));
        assert_eq!(t.expand("recovered"), "recovered");
    }
}

#[test]
fn bounded_recursion_is_fine() {
    let mut t = grammar(&[("nest", vec!["(#nest#)", "x"])]);
    t.set_selector("nest", Selector::new(Countdown { first_picks: 5 }))
        .unwrap();
    assert_eq!(t.expand("#nest#"), "(((((x)))))");
}

// --- Modifiers, methods, calls and objects ---

#[test]
fn modifiers_apply_left_to_right() {
    let mut t = grammar(&[("msg", vec!["hi"])]);
    t.add_modifier("mod1", |s| format!("{}1", s));
    t.add_modifier("mod2", |s| format!("{}2", s));
    assert_eq!(t.expand("#msg.mod1.mod2#"), "hi12");
    assert_eq!(t.expand("#msg.mod2.mod1#"), "hi21");
}

#[test]
fn unknown_modifiers_are_skipped() {
    let mut t = grammar(&[("msg", vec!["hi"])]);
    t.add_modifier("shout", |s| s.to_uppercase());
    assert_eq!(t.expand("#msg.nope.shout#"), "HI");
}

#[test]
fn methods_receive_expanded_arguments() {
    let mut t = grammar(&[("msg", vec!["hi"]), ("left", vec!["<"])]);
    t.add_method("wrap", |s, args| format!("{}{}{}", args[0], s, args[1]));
    t.add_method("count", |s, args| format!("{}:{}", s, args.len()));
    assert_eq!(t.expand("#msg.wrap(#left#,>)#"), "<hi>");
    assert_eq!(t.expand("#msg.count()#"), "hi:0");
    assert_eq!(t.expand("#msg.count(a,b,c)#"), "hi:3");
}

#[test]
fn calls_run_for_side_effects() {
    let invoked = Rc::new(Cell::new(0));
    let seen = Rc::clone(&invoked);
    let mut t = Engine::new();
    t.add_call("msg", move || seen.set(seen.get() + 1));
    assert_eq!(t.expand("#.msg#"), "");
    assert_eq!(t.expand("#.msg()#"), "");
    assert_eq!(invoked.get(), 2);
}

#[test]
fn tracking_call_counts_expansions() {
    let picks = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&picks);
    let mut t = grammar(&[("x", vec!["a"])]);
    t.add_method("track", move |s, _| {
        log.borrow_mut().push(s.to_string());
        s.to_string()
    });
    t.expand("#x.track##x.track#");
    assert_eq!(*picks.borrow(), vec!["a", "a"]);
}

#[test]
fn objects_are_expanded() {
    let mut t = Engine::builder().seed(1).standard_modifiers().build().unwrap();
    t.add_object("person", "jack");
    assert_eq!(t.expand("#person#"), "jack");
    assert_eq!(t.expand("#person.caps#"), "JACK");
    assert_eq!(t.expand("#person1#"), "#person1#");
    assert_eq!(t.expand("#msg(#person# is here\\.)##msg#"), "jack is here.");
}

#[test]
fn objects_sit_between_tags_and_rules() {
    let mut t = grammar(&[("x", vec!["rule"])]);
    t.add_object("x", 42);
    assert_eq!(t.expand("#x#"), "42");
    assert_eq!(t.expand("[x:tag]#x#"), "tag");
    t.remove_object("x");
    assert_eq!(t.expand("#x#"), "rule");
}

#[test]
fn standard_modifiers() {
    let mut t = Engine::builder()
        .seed(1)
        .rule("animal", "owl")
        .rule("city", "city")
        .standard_modifiers()
        .build()
        .unwrap();
    assert_eq!(t.expand("#animal.a#"), "an owl");
    assert_eq!(t.expand("#animal.s.capitalize#"), "Owls");
    assert_eq!(t.expand("#city.s#"), "cities");
    assert_eq!(t.expand("#animal.inQuotes#"), "\"owl\"");
}

// --- Selection ---

#[test]
fn default_selection_is_uniform_per_block() {
    let mut t = grammar(&[("n", vec!["a", "b", "c", "d"])]);
    for _ in 0..5 {
        let mut block: Vec<String> = (0..4).map(|_| t.expand("#n#")).collect();
        block.sort();
        assert_eq!(block, vec!["a", "b", "c", "d"]);
    }
}

#[test]
fn inline_selection_is_uniform_per_block() {
    let mut t = grammar(&[("o", vec!["{(h,t)}"])]);
    let heads = (0..34).filter(|_| t.expand("{o}") == "h").count();
    assert_eq!(heads, 17);
}

#[test]
fn weighted_selection_converges() {
    let mut t = Engine::builder()
        .seed(99)
        .rule(
            "coin",
            RuleDefinition::provider(WeightedCandidates::new([("heads", 1), ("tails", 3)])),
        )
        .rule("inline", "#(a:1,b:4)#")
        .build()
        .unwrap();

    let heads = (0..4000).filter(|_| t.expand("#coin#") == "heads").count();
    assert!((850..=1150).contains(&heads), "heads picked {} times", heads);

    let a = (0..2500).filter(|_| t.expand("#inline#") == "a").count();
    assert!((400..=600).contains(&a), "a picked {} times", a);
}

#[test]
fn zero_weight_is_never_picked() {
    let mut t = grammar(&[("r", vec!["never:0", "always:5"])]);
    for _ in 0..50 {
        assert_eq!(t.expand("#r#"), "always");
    }
}

/// Always answers with an index past the end.
struct Bogus;

impl CandidateSelector for Bogus {
    fn pick(&mut self, count: usize, _rng: &mut StdRng) -> usize {
        count + 1
    }
}

#[test]
fn custom_selectors() {
    let mut t = grammar(&[("msg", vec!["first", "second", "third"])]);
    t.set_selector("msg", Selector::new(PickFirst)).unwrap();
    for _ in 0..5 {
        assert_eq!(t.expand("#msg#"), "first");
    }

    t.set_selector("msg", Selector::new(Bogus)).unwrap();
    assert_eq!(t.expand("#msg#"), "#msg#");

    assert!(t.set_selector("missing", Selector::new(PickFirst)).is_err());
}

#[test]
fn shared_selectors_keep_state_across_rules() {
    let shared = Rc::new(RefCell::new(Countdown { first_picks: 1 }));
    let mut t = grammar(&[("a", vec!["a0", "a1"]), ("b", vec!["b0", "b1"])]);
    t.set_selector("a", Selector::shared(Rc::clone(&shared))).unwrap();
    t.set_selector("b", Selector::shared(shared)).unwrap();
    assert_eq!(t.expand("#a# #b#"), "a0 b1");
}

#[test]
fn same_seed_same_text() {
    let rules = [("origin", vec!["#x##x##x#"]), ("x", vec!["1", "2", "3", "4", "5"])];
    let mut first = grammar(&rules);
    let mut second = grammar(&rules);
    for _ in 0..10 {
        assert_eq!(first.expand("#origin#"), second.expand("#origin#"));
    }
}

// --- Errors and analysis ---

#[test]
fn parse_errors_are_rendered() {
    let mut t = Engine::new();
    let out = t.expand("[]");
    assert!(out.starts_with("error: "), "{}", out);
    assert!(out.contains("empty [] not allowed"), "{}", out);
    assert!(t.expand("#unclosed").starts_with("error: "));
}

#[test]
fn deeply_nested_templates_are_rejected() {
    let deep = format!("{}x{}", "#(".repeat(10_000), ")#".repeat(10_000));
    let mut t = Engine::new();
    let out = t.expand(&deep);
    assert!(out.starts_with("error: "), "{}", out.lines().next().unwrap_or(""));
    assert!(out.contains("nesting too deep"));

    assert!(matches!(t.add_rule("deep", deep.as_str()), Err(GrammarError::NoCandidates(_))));
    assert_eq!(t.expand("#(#(#(x)#)#)#"), "x");
}

#[test]
fn analysis_findings() {
    let t = grammar(&[
        ("a", vec!["#b#"]),
        ("b", vec!["#a#"]),
        ("self", vec!["#self#", "end"]),
        ("name", vec!["rule"]),
        ("setter", vec!["[name:tag]"]),
    ]);
    let findings = t.analyze();
    assert!(findings.contains(&Finding::Cycle(vec!["a".to_string(), "b".to_string()])));
    assert!(findings.contains(&Finding::SelfReference {
        rule: "self".to_string(),
        candidate: "#self#".to_string(),
    }));
    assert!(findings.contains(&Finding::TagOverridesRule {
        rule: "setter".to_string(),
        tag: "name".to_string(),
    }));

    let h = hierarchical(&[("name", vec!["rule"]), ("setter", vec!["[name:tag]"])]);
    assert!(h.analyze().is_empty());
    assert_eq!(Engine::new().analyze(), vec![Finding::EmptyRuleset]);
}
