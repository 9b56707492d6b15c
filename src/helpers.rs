//! The functions templates can call, and the [`RenderContext`] that holds the
//! state some of them touch.
//!
//! Every helper has the same typed signature ([`HelperFn`]) and is registered
//! by name from the fixed [`HELPERS`] table. Helpers that choose between two
//! blocks (`contains`, `ifNotFalse`, `ifArticlesWithHeading`) return a
//! boolean and are used as the condition of an `if`:
//!
//! ```text
//! {{if ifNotFalse .heading}}<h2>{{.title}}</h2>{{else}}<hr>{{end}}
//! ```
//!
//! Helpers never fail; arguments that are missing behave like JavaScript's
//! `undefined` and malformed input degrades to a default value.

use crate::value::{field, stringify};
use gtmpl::{Context, Template, Value};
use rand::Rng;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::OnceLock;

/// The signature shared by all template helpers.
pub type HelperFn = fn(&[Value]) -> Result<Value, String>;

/// Every helper, by the name templates call it with.
pub const HELPERS: [(&str, HelperFn); 9] = [
    ("contains", contains_helper),
    ("inc", inc_helper),
    ("randomStr", random_str_helper),
    ("ifNotFalse", if_not_false_helper),
    ("ifArticlesWithHeading", if_articles_with_heading_helper),
    ("anchor", anchor_helper),
    ("resetCounter", reset_counter_helper),
    ("incrementCounter", increment_counter_helper),
    ("getCounter", get_counter_helper),
];

/// Adds every helper in [`HELPERS`] to `template`. This must happen before
/// the template source is parsed.
pub fn register(template: &mut Template) {
    for (name, helper) in HELPERS.iter() {
        template.add_func(name, *helper);
    }
}

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&Value::NoValue)
}

/// Whether the stringified `haystack` contains the stringified `needle`.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    stringify(haystack).contains(&stringify(needle))
}

/// Parses `value` like JavaScript's `parseInt` and adds one. Returns `None`
/// where JavaScript would produce `NaN`.
pub fn inc(value: &Value) -> Option<f64> {
    parse_int(&stringify(value)).map(|n| n + 1.0)
}

// parseInt without a radix: optional whitespace and sign, then a `0x`-prefixed
// hex run or a decimal run. Trailing garbage is ignored.
fn parse_int(s: &str) -> Option<f64> {
    let s = s.trim_start_matches(is_js_whitespace);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = if s.len() >= 2 && (s.starts_with("0x") || s.starts_with("0X")) {
        (16, &s[2..])
    } else {
        (10, s)
    };
    let run: Vec<u32> = digits.chars().map_while(|c| c.to_digit(radix)).collect();
    if run.is_empty() {
        return None;
    }
    let magnitude = run
        .into_iter()
        .fold(0f64, |acc, d| acc * f64::from(radix) + f64::from(d));
    Some(if negative { -magnitude } else { magnitude })
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// A short pseudo-random base-36 string for generating unique element IDs.
pub fn random_str() -> String {
    let mut rng = rand::thread_rng();
    (0..5)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect()
}

/// True for everything except the boolean `false`.
pub fn is_not_false(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

/// True if any entry of `stack` has a `heading` attribute that is not
/// `false`. Anything other than a sequence has no such entries.
pub fn has_articles_with_heading(stack: &Value) -> bool {
    match stack {
        Value::Array(entries) => entries
            .iter()
            .any(|entry| field(entry, "heading").map_or(true, is_not_false)),
        _ => false,
    }
}

// The whitespace class of JavaScript regular expressions.
const JS_WHITESPACE: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

fn non_anchor_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("[^A-Za-z0-9_{}]", JS_WHITESPACE)).expect("anchor pattern is valid")
    })
}

fn whitespace_char() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("[{}]", JS_WHITESPACE))
            .expect("whitespace pattern is valid")
    })
}

fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{0B}'
            | '\u{0C}'
            | '\r'
            | ' '
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Turns a heading into a URL fragment: characters other than ASCII word
/// characters and whitespace are dropped, each whitespace character becomes
/// `-`, and the result is lowercased.
pub fn anchor(s: &str) -> String {
    let stripped = non_anchor_chars().replace_all(s, "");
    whitespace_char()
        .replace_all(&stripped, "-")
        .to_lowercase()
}

fn contains_helper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(contains(arg(args, 0), arg(args, 1))))
}

fn inc_helper(args: &[Value]) -> Result<Value, String> {
    Ok(match inc(arg(args, 0)) {
        Some(n) => number_value(n),
        None => Value::String("NaN".to_owned()),
    })
}

fn random_str_helper(_args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(random_str()))
}

fn if_not_false_helper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(is_not_false(arg(args, 0))))
}

fn if_articles_with_heading_helper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Bool(has_articles_with_heading(arg(args, 0))))
}

fn anchor_helper(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(anchor(&stringify(arg(args, 0)))))
}

fn reset_counter_helper(_args: &[Value]) -> Result<Value, String> {
    with_active_counter(|counter| counter.set(0));
    Ok(Value::String(String::new()))
}

fn increment_counter_helper(_args: &[Value]) -> Result<Value, String> {
    let n = with_active_counter(|counter| {
        counter.set(counter.get() + 1);
        counter.get()
    });
    Ok(Value::from(n.unwrap_or(0)))
}

fn get_counter_helper(_args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(with_active_counter(|counter| counter.get()).unwrap_or(0)))
}

thread_local! {
    // The counter of the render pass currently executing a template on this
    // thread. Only set while `RenderContext::render` runs. Helpers are plain
    // `fn` pointers and can't capture a context, so they reach it here.
    static ACTIVE_COUNTER: RefCell<Option<Rc<Cell<i64>>>> = RefCell::new(None);
}

fn with_active_counter<T>(f: impl FnOnce(&Cell<i64>) -> T) -> Option<T> {
    ACTIVE_COUNTER.with(|active| active.borrow().as_ref().map(|counter| f(counter)))
}

/// State shared by all template executions of one build. The counter helpers
/// read and write the counter of the context whose [`RenderContext::render`]
/// is running, so two builds never observe each other's counters.
#[derive(Debug, Default)]
pub struct RenderContext {
    counter: Rc<Cell<i64>>,
}

impl RenderContext {
    pub fn new() -> RenderContext {
        RenderContext::default()
    }

    /// The current counter value.
    pub fn counter(&self) -> i64 {
        self.counter.get()
    }

    /// Executes `template` against `data` with this context active and
    /// returns the rendered text.
    pub fn render(&self, template: &Template, data: Value) -> Result<String, String> {
        let _scope = Scope::enter(&self.counter);
        let mut out: Vec<u8> = Vec::new();
        template.execute(&mut out, &Context::from(data)?)?;
        String::from_utf8(out).map_err(|e| e.to_string())
    }
}

// Installs a counter for the duration of one render and restores whatever
// was active before, so nested renders unwind correctly.
struct Scope {
    previous: Option<Rc<Cell<i64>>>,
}

impl Scope {
    fn enter(counter: &Rc<Cell<i64>>) -> Scope {
        let previous = ACTIVE_COUNTER.with(|active| active.replace(Some(Rc::clone(counter))));
        Scope { previous }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_COUNTER.with(|active| *active.borrow_mut() = previous);
    }
}
