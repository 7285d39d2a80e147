use typist::model::Action;
use typist::trace::plan_console_trace;

fn actions_for_text(text: &str) -> Vec<Action> {
    text.chars().map(|c| Action::char(c, 0)).collect()
}

fn backspaces(n: usize) -> Vec<Action> {
    (0..n).map(|_| Action::backspace(0)).collect()
}

fn trace_events(actions: &[Action]) -> Vec<(usize, String)> {
    plan_console_trace(actions)
        .into_iter()
        .map(|e| (e.action_index, e.line))
        .collect()
}

#[test]
fn flushes_typing_runs_at_sentence_and_line_ends() {
    let actions = actions_for_text("hi.\nok");

    let events = trace_events(&actions);

    assert_eq!(
        events,
        vec![
            (2, "Typing \"hi.\"...".to_string()),
            (3, "Typing \"\\n\"...".to_string()),
            (5, "Typing \"ok\"...".to_string()),
        ]
    );
}

#[test]
fn logs_typing_run_then_replacement_for_a_swap() {
    let mut actions = actions_for_text("teh");
    let typing_len = actions.len();
    actions.extend(backspaces(2));
    actions.extend(actions_for_text("he"));

    let events = trace_events(&actions);

    assert_eq!(
        events,
        vec![
            (typing_len, "Typing \"teh\"...".to_string()),
            (
                actions.len() - 1,
                "Replace \"eh\" with \"he\"...".to_string()
            ),
        ]
    );
}

#[test]
fn skips_corrections_that_restore_the_same_text() {
    let mut actions = actions_for_text("aa");
    actions.extend(backspaces(1));
    actions.extend(actions_for_text("a"));

    let events = trace_events(&actions);

    assert_eq!(events, vec![(2, "Typing \"aa\"...".to_string())]);
}

#[test]
fn pauses_do_not_interrupt_a_typing_run() {
    let mut actions = actions_for_text("ab");
    actions.push(Action::pause(800));
    actions.extend(actions_for_text("c"));

    let events = trace_events(&actions);

    assert_eq!(events, vec![(3, "Typing \"abc\"...".to_string())]);
}
