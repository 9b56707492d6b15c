//! Defines the table-of-contents ordering used to sort collection entries.
//! A collection may declare an ordered list of titles (`sortBy` in the TOC
//! file); entries with those titles come first in the listed order, the rest
//! follow alphabetically, and untitled entries go last.

use std::cmp::Ordering;

/// Anything that can be placed in a navigation list. Only the title takes
/// part in ordering; everything else about an entry is opaque here.
pub trait Titled {
    /// The entry's title, or `None` if the entry has no usable title.
    fn title(&self) -> Option<&str>;
}

#[cfg(test)]
impl Titled for Option<&str> {
    fn title(&self) -> Option<&str> {
        self.filter(|t| !t.is_empty())
    }
}

/// Compares two navigation entries according to `order`. `Less` means `a`
/// is listed before `b`. The comparison is total: untitled entries are
/// valid input and sort after every titled entry.
pub fn compare<T, E>(order: &[T], a: &E, b: &E) -> Ordering
where
    T: AsRef<str>,
    E: Titled + ?Sized,
{
    let (a, b) = match (a.title(), b.title()) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };

    let position = |title: &str| order.iter().position(|o| o.as_ref() == title);
    match (position(a), position(b)) {
        (Some(i), Some(j)) => i.cmp(&j),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_unlisted(a, b),
    }
}

// Dot-prefixed titles go after everything else; otherwise case-insensitive.
fn compare_unlisted(a: &str, b: &str) -> Ordering {
    let a_hidden = a.starts_with('.');
    let b_hidden = b.starts_with('.');
    match (a_hidden, b_hidden) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// A comparator bound to one collection's ordering preference list. It is
/// built once per collection that declares an explicit order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TocSorter {
    order: Vec<String>,
}

impl TocSorter {
    pub fn new(order: Vec<String>) -> TocSorter {
        TocSorter { order }
    }

    /// See [`compare`].
    pub fn compare<E: Titled + ?Sized>(&self, a: &E, b: &E) -> Ordering {
        compare(&self.order, a, b)
    }

    /// Stable-sorts `entries` in place.
    #[cfg(test)]
    pub fn sort<E: Titled>(&self, entries: &mut [E]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn titles<'a>(entries: &[Option<&'a str>]) -> Vec<Option<&'a str>> {
        entries.to_vec()
    }

    #[test]
    fn test_listed_titles_follow_order() {
        let sorter = TocSorter::new(vec!["Intro".to_owned(), "Usage".to_owned()]);
        assert_eq!(sorter.compare(&Some("Intro"), &Some("Usage")), Ordering::Less);
        assert_eq!(sorter.compare(&Some("Usage"), &Some("Intro")), Ordering::Greater);
        assert_eq!(sorter.compare(&Some("Usage"), &Some("Usage")), Ordering::Equal);
    }

    #[test]
    fn test_listed_before_unlisted() {
        let order = ["Usage"];
        assert_eq!(compare(&order, &Some("Usage"), &Some("Alpha")), Ordering::Less);
        assert_eq!(compare(&order, &Some("Alpha"), &Some("Usage")), Ordering::Greater);
    }

    #[test]
    fn test_untitled_entries_sort_last() {
        let order: [&str; 0] = [];
        let none: Option<&str> = None;
        assert_eq!(compare(&order, &none, &none), Ordering::Equal);
        assert_eq!(compare(&order, &none, &Some("a")), Ordering::Greater);
        assert_eq!(compare(&order, &Some("a"), &none), Ordering::Less);
        // An empty title counts as no title.
        assert_eq!(compare(&order, &Some(""), &none), Ordering::Equal);
        assert_eq!(compare(&order, &Some(""), &Some(".z")), Ordering::Greater);
    }

    #[test]
    fn test_unlisted_case_insensitive() {
        let order: [&str; 0] = [];
        assert_eq!(compare(&order, &Some("apple"), &Some("Banana")), Ordering::Less);
        assert_eq!(compare(&order, &Some("Apple"), &Some("apple")), Ordering::Equal);
        assert_eq!(compare(&order, &Some("zeta"), &Some("Alpha")), Ordering::Greater);
    }

    #[test]
    fn test_dot_prefixed_sort_after() {
        let order: [&str; 0] = [];
        assert_eq!(compare(&order, &Some(".a"), &Some("z")), Ordering::Greater);
        assert_eq!(compare(&order, &Some("z"), &Some(".a")), Ordering::Less);
        assert_eq!(compare(&order, &Some(".b"), &Some(".A")), Ordering::Greater);
    }

    #[test]
    fn test_sort_mixed() {
        let sorter = TocSorter::new(vec!["Intro".to_owned(), "Usage".to_owned()]);
        let mut entries = titles(&[
            Some("Usage"),
            None,
            Some("Intro"),
            Some(".hidden"),
            Some("Zeta"),
        ]);
        sorter.sort(&mut entries);
        assert_eq!(
            entries,
            vec![Some("Intro"), Some("Usage"), Some("Zeta"), Some(".hidden"), None]
        );
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let sorter = TocSorter::default();
        let mut entries = vec![("B", 1), ("a", 2), ("b", 3), ("A", 4)];
        entries.sort_by(|x, y| sorter.compare(&Some(x.0), &Some(y.0)));
        let ids: Vec<i32> = entries.iter().map(|e| e.1).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }
}
