use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// A single display value. Every cell on the desk is one of these three;
// richer domain types are rendered down to them before they reach a view.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Tag(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        FieldValue::Number(value)
    }

    pub fn tag(value: impl Into<String>) -> Self {
        FieldValue::Tag(value.into())
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    // Natural ordering: numeric for numbers, lexicographic for text and
    // tags. Numbers order before non-numbers when a column mixes them.
    pub fn natural_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Number(_), _) => Ordering::Less,
            (_, FieldValue::Number(_)) => Ordering::Greater,
            (a, b) => a.as_str().cmp(&b.as_str()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) | FieldValue::Tag(s) => s,
            FieldValue::Number(_) => "",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Tag(s) => f.write_str(s),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e12 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
        }
    }
}

// One row of displayed data: an ordered field name -> value mapping.
// Field order is the column order of the owning view.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(&'static str, FieldValue)>,
}

impl Row {
    pub fn new() -> Self {
        Row { cells: Vec::new() }
    }

    pub fn cell(mut self, field: &'static str, value: FieldValue) -> Self {
        self.cells.push((field, value));
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> + '_ {
        self.cells.iter().map(|(_, value)| value)
    }

    fn contains(&self, lowered_term: &str) -> bool {
        self.cells
            .iter()
            .any(|(_, value)| value.render().to_lowercase().contains(lowered_term))
    }
}

// Per-field allow-lists, ANDed across fields. An empty accepted set means
// "no restriction" for that field. Values compare by their rendered form,
// which is what the operator sees and types.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    accepted: BTreeMap<&'static str, BTreeSet<String>>,
}

impl FilterSet {
    pub fn new() -> Self {
        FilterSet::default()
    }

    pub fn allow(&mut self, field: &'static str, value: impl Into<String>) {
        self.accepted.entry(field).or_default().insert(value.into());
    }

    // Leaves the field entry in place with an empty accepted set, which
    // imposes no restriction.
    pub fn clear_field(&mut self, field: &'static str) {
        if let Some(set) = self.accepted.get_mut(field) {
            set.clear();
        }
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.values().all(|set| set.is_empty())
    }

    pub fn accepts(&self, row: &Row) -> bool {
        for (field, set) in &self.accepted {
            if set.is_empty() {
                continue;
            }
            // A row without the constrained field can never match it.
            match row.get(field) {
                Some(value) if set.contains(value.render().as_str()) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn describe(&self) -> String {
        self.accepted
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(field, set)| {
                let values: Vec<&str> = set.iter().map(String::as_str).collect();
                format!("{}={}", field, values.join("|"))
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(field: &'static str) -> Self {
        SortSpec {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: &'static str) -> Self {
        SortSpec {
            field,
            order: SortOrder::Descending,
        }
    }
}

// The view pipeline works on index masks into the owning collection, so
// restricting or reordering a view never copies records. Each step takes
// the previous mask and derives a fresh one.

pub fn filter(rows: &[Row], keep: &[usize], filters: &FilterSet) -> Vec<usize> {
    keep.iter()
        .copied()
        .filter(|&idx| filters.accepts(&rows[idx]))
        .collect()
}

pub fn search(rows: &[Row], keep: &[usize], term: &str) -> Vec<usize> {
    if term.is_empty() {
        return keep.to_vec();
    }
    let lowered = term.to_lowercase();
    keep.iter()
        .copied()
        .filter(|&idx| rows[idx].contains(&lowered))
        .collect()
}

pub fn sort(rows: &[Row], keep: &[usize], spec: &SortSpec) -> Vec<usize> {
    let mut ordered = keep.to_vec();
    // Stable: ties and rows missing the sort field keep their prior
    // relative order. Missing values always order last.
    ordered.sort_by(|&a, &b| {
        match (rows[a].get(spec.field), rows[b].get(spec.field)) {
            (Some(va), Some(vb)) => match spec.order {
                SortOrder::Ascending => va.natural_cmp(vb),
                SortOrder::Descending => vb.natural_cmp(va),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    ordered
}

// Composition order for every view: filter -> search -> sort, applied
// fresh on each invocation.
pub fn apply(rows: &[Row], filters: &FilterSet, term: &str, spec: Option<&SortSpec>) -> Vec<usize> {
    let all: Vec<usize> = (0..rows.len()).collect();
    let kept = filter(rows, &all, filters);
    let kept = search(rows, &kept, term);
    match spec {
        Some(spec) => sort(rows, &kept, spec),
        None => kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn league_rows() -> Vec<Row> {
        vec![
            Row::new()
                .cell("sport", FieldValue::tag("NBA"))
                .cell("status", FieldValue::tag("Active")),
            Row::new()
                .cell("sport", FieldValue::tag("NFL"))
                .cell("status", FieldValue::tag("Inactive")),
            Row::new()
                .cell("sport", FieldValue::tag("NBA"))
                .cell("status", FieldValue::tag("Inactive")),
        ]
    }

    fn mask(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn filter_keeps_exact_members() {
        let rows = league_rows();
        let mut filters = FilterSet::new();
        filters.allow("sport", "NBA");

        let kept = filter(&rows, &mask(rows.len()), &filters);
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn empty_filter_set_is_identity() {
        let rows = league_rows();
        let kept = filter(&rows, &mask(rows.len()), &FilterSet::new());
        assert_eq!(kept, mask(rows.len()));
    }

    #[test]
    fn empty_accepted_set_imposes_no_restriction() {
        let rows = league_rows();
        let mut filters = FilterSet::new();
        filters.allow("sport", "NBA");
        assert_ne!(filter(&rows, &mask(rows.len()), &filters), mask(rows.len()));

        // The field entry survives with an empty accepted set; the
        // restriction is gone.
        filters.clear_field("sport");
        assert!(filters.is_empty());
        assert_eq!(filter(&rows, &mask(rows.len()), &filters), mask(rows.len()));
    }

    #[test]
    fn filters_and_across_fields() {
        let rows = league_rows();
        let mut filters = FilterSet::new();
        filters.allow("sport", "NBA");
        filters.allow("status", "Inactive");

        assert_eq!(filter(&rows, &mask(rows.len()), &filters), vec![2]);
    }

    #[test]
    fn filter_on_unknown_field_matches_nothing() {
        let rows = league_rows();
        let mut filters = FilterSet::new();
        filters.allow("venue", "Anfield");

        assert!(filter(&rows, &mask(rows.len()), &filters).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_spans_fields() {
        let rows = league_rows();
        assert_eq!(search(&rows, &mask(rows.len()), "nba"), vec![0, 2]);
        assert_eq!(search(&rows, &mask(rows.len()), "ACTIVE"), mask(rows.len()));
        assert_eq!(search(&rows, &mask(rows.len()), ""), mask(rows.len()));
        assert!(search(&rows, &mask(rows.len()), "cricket").is_empty());
    }

    #[test]
    fn search_matches_number_rendering() {
        let rows = vec![
            Row::new().cell("margin", FieldValue::number(7.5)),
            Row::new().cell("margin", FieldValue::number(12.0)),
        ];
        assert_eq!(search(&rows, &mask(rows.len()), "7.5"), vec![0]);
        assert_eq!(search(&rows, &mask(rows.len()), "12"), vec![1]);
    }

    #[test]
    fn sort_orders_numbers_numerically() {
        let rows = vec![
            Row::new().cell("movement", FieldValue::number(10.0)),
            Row::new().cell("movement", FieldValue::number(-2.5)),
            Row::new().cell("movement", FieldValue::number(3.0)),
        ];
        let spec = SortSpec::ascending("movement");
        assert_eq!(sort(&rows, &mask(rows.len()), &spec), vec![1, 2, 0]);

        let spec = SortSpec::descending("movement");
        assert_eq!(sort(&rows, &mask(rows.len()), &spec), vec![0, 2, 1]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let rows = vec![
            Row::new()
                .cell("sport", FieldValue::tag("NBA"))
                .cell("home", FieldValue::text("Celtics")),
            Row::new()
                .cell("sport", FieldValue::tag("NBA"))
                .cell("home", FieldValue::text("Lakers")),
            Row::new()
                .cell("sport", FieldValue::tag("MLB"))
                .cell("home", FieldValue::text("Mets")),
        ];
        let spec = SortSpec::ascending("sport");
        // The two NBA rows tie and must keep their input order.
        assert_eq!(sort(&rows, &mask(rows.len()), &spec), vec![2, 0, 1]);
    }

    #[test]
    fn sort_is_idempotent() {
        let rows = league_rows();
        let spec = SortSpec::ascending("status");
        let once = sort(&rows, &mask(rows.len()), &spec);
        let twice = sort(&rows, &once, &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn sort_on_unknown_field_keeps_order() {
        let rows = league_rows();
        let spec = SortSpec::ascending("venue");
        assert_eq!(sort(&rows, &mask(rows.len()), &spec), mask(rows.len()));
    }

    #[test]
    fn rows_missing_the_sort_field_order_last() {
        let rows = vec![
            Row::new().cell("note", FieldValue::text("no movement here")),
            Row::new().cell("movement", FieldValue::number(4.0)),
            Row::new().cell("movement", FieldValue::number(1.0)),
        ];
        let spec = SortSpec::ascending("movement");
        assert_eq!(sort(&rows, &mask(rows.len()), &spec), vec![2, 1, 0]);
    }

    #[test]
    fn filter_then_sort_end_to_end() {
        let rows = league_rows();
        let mut filters = FilterSet::new();
        filters.allow("sport", "NBA");

        let kept = filter(&rows, &mask(rows.len()), &filters);
        assert_eq!(kept, vec![0, 2]);

        let ordered = sort(&rows, &kept, &SortSpec::ascending("status"));
        assert_eq!(ordered, vec![0, 2]);
        assert_eq!(
            rows[ordered[0]].get("status").map(FieldValue::render),
            Some("Active".to_string())
        );
        assert_eq!(
            rows[ordered[1]].get("status").map(FieldValue::render),
            Some("Inactive".to_string())
        );
        // The NBA "Inactive" record is retained through the composition.
        assert_eq!(
            rows[ordered[1]].get("sport").map(FieldValue::render),
            Some("NBA".to_string())
        );
    }

    #[test]
    fn apply_composes_filter_search_sort() {
        let rows = vec![
            Row::new()
                .cell("sport", FieldValue::tag("Soccer"))
                .cell("home", FieldValue::text("Arsenal"))
                .cell("margin", FieldValue::number(6.0)),
            Row::new()
                .cell("sport", FieldValue::tag("Soccer"))
                .cell("home", FieldValue::text("Everton"))
                .cell("margin", FieldValue::number(4.0)),
            Row::new()
                .cell("sport", FieldValue::tag("Tennis"))
                .cell("home", FieldValue::text("Alcaraz"))
                .cell("margin", FieldValue::number(5.0)),
        ];
        let mut filters = FilterSet::new();
        filters.allow("sport", "Soccer");
        let spec = SortSpec::ascending("margin");

        let direct = apply(&rows, &filters, "ar", Some(&spec));
        // "ar" hits Arsenal only among the Soccer rows.
        assert_eq!(direct, vec![0]);

        let composed = {
            let all = mask(rows.len());
            let kept = filter(&rows, &all, &filters);
            let kept = search(&rows, &kept, "ar");
            sort(&rows, &kept, &spec)
        };
        assert_eq!(direct, composed);
    }

    #[test]
    fn number_rendering_drops_integral_fractions() {
        assert_eq!(FieldValue::number(12.0).render(), "12");
        assert_eq!(FieldValue::number(-3.25).render(), "-3.25");
        assert_eq!(FieldValue::number(0.5).render(), "0.5");
    }

    #[test]
    fn filter_matches_rendered_numbers() {
        let rows = vec![
            Row::new().cell("id", FieldValue::number(5.0)),
            Row::new().cell("id", FieldValue::number(6.0)),
        ];
        let mut filters = FilterSet::new();
        filters.allow("id", "5");
        assert_eq!(filter(&rows, &mask(rows.len()), &filters), vec![0]);
    }
}

#[cfg(test)]
mod props {
    use super::*;
    use proptest::prelude::*;

    static SPORTS: [&str; 4] = ["Soccer", "Basketball", "Tennis", "Ice Hockey"];
    static STATUSES: [&str; 3] = ["Open", "Suspended", "Settled"];

    prop_compose! {
        fn arb_row()(
            sport in prop::sample::select(&SPORTS[..]),
            status in prop::sample::select(&STATUSES[..]),
            margin in -20.0f64..20.0,
        ) -> Row {
            Row::new()
                .cell("sport", FieldValue::tag(sport))
                .cell("status", FieldValue::tag(status))
                .cell("margin", FieldValue::number(margin))
        }
    }

    fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
        prop::collection::vec(arb_row(), 0..40)
    }

    proptest! {
        #[test]
        fn empty_filters_and_term_are_identity(rows in arb_rows()) {
            let all: Vec<usize> = (0..rows.len()).collect();
            prop_assert_eq!(apply(&rows, &FilterSet::new(), "", None), all);
        }

        #[test]
        fn filter_keeps_exactly_the_allowed_values(
            rows in arb_rows(),
            allowed in prop::collection::btree_set(prop::sample::select(&SPORTS[..]), 0..3),
        ) {
            let mut filters = FilterSet::new();
            for sport in &allowed {
                filters.allow("sport", *sport);
            }
            let keep: Vec<usize> = (0..rows.len()).collect();
            let kept = filter(&rows, &keep, &filters);
            for idx in keep {
                let sport = rows[idx]
                    .get("sport")
                    .map(|value| value.render())
                    .unwrap_or_default();
                let expected = allowed.is_empty() || allowed.contains(sport.as_str());
                prop_assert_eq!(kept.contains(&idx), expected);
            }
        }

        #[test]
        fn search_keeps_only_rows_with_a_matching_rendering(
            rows in arb_rows(),
            term in "[a-zA-Z]{0,6}",
        ) {
            let keep: Vec<usize> = (0..rows.len()).collect();
            let kept = search(&rows, &keep, &term);
            let lowered = term.to_lowercase();
            for idx in keep {
                let hit = rows[idx]
                    .values()
                    .any(|value| value.render().to_lowercase().contains(&lowered));
                prop_assert_eq!(kept.contains(&idx), hit);
            }
        }

        #[test]
        fn ascending_sort_orders_numbers(rows in arb_rows()) {
            let keep: Vec<usize> = (0..rows.len()).collect();
            let ordered = sort(&rows, &keep, &SortSpec::ascending("margin"));
            for pair in ordered.windows(2) {
                let a = rows[pair[0]].get("margin").unwrap();
                let b = rows[pair[1]].get("margin").unwrap();
                prop_assert!(a.natural_cmp(b) != Ordering::Greater);
            }
        }

        #[test]
        fn sort_keeps_tied_rows_in_input_order(rows in arb_rows(), ascending in any::<bool>()) {
            let keep: Vec<usize> = (0..rows.len()).collect();
            let spec = if ascending {
                SortSpec::ascending("sport")
            } else {
                SortSpec::descending("sport")
            };
            let ordered = sort(&rows, &keep, &spec);
            for pair in ordered.windows(2) {
                let sa = rows[pair[0]].get("sport").map(FieldValue::render);
                let sb = rows[pair[1]].get("sport").map(FieldValue::render);
                if sa == sb {
                    prop_assert!(pair[0] < pair[1], "tied rows {} and {} swapped", pair[0], pair[1]);
                }
            }
        }

        #[test]
        fn sorting_twice_changes_nothing(rows in arb_rows()) {
            let keep: Vec<usize> = (0..rows.len()).collect();
            let spec = SortSpec::descending("margin");
            let once = sort(&rows, &keep, &spec);
            let twice = sort(&rows, &once, &spec);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn apply_equals_the_manual_composition(
            rows in arb_rows(),
            term in "[a-z]{0,4}",
            allowed in prop::sample::select(&STATUSES[..]),
        ) {
            let mut filters = FilterSet::new();
            filters.allow("status", allowed);
            let spec = SortSpec::ascending("margin");

            let direct = apply(&rows, &filters, &term, Some(&spec));
            let composed = {
                let all: Vec<usize> = (0..rows.len()).collect();
                let kept = filter(&rows, &all, &filters);
                let kept = search(&rows, &kept, &term);
                sort(&rows, &kept, &spec)
            };
            prop_assert_eq!(direct, composed);
        }
    }
}
