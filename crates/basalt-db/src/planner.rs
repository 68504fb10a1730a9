use basalt_engine::IndexModel;
use basalt_query::SortField;
use bson::{Bson, Document, doc};

/// The planner's decision for one query.
///
/// `equality_prefix` holds the leading run of `$eq` operands over the
/// chosen index's fields, the portion that can drive a byte-prefix scan.
/// `exact` means every index field was matched by the filter;
/// `used_for_sort` means the index's key order satisfies the requested
/// sort, so pagination can be applied during key iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub index: Option<IndexModel>,
    pub equality_prefix: Document,
    pub used_for_sort: bool,
    pub exact: bool,
}

impl QueryPlan {
    fn full_scan() -> Self {
        Self {
            index: None,
            equality_prefix: Document::new(),
            used_for_sort: false,
            exact: false,
        }
    }
}

/// Index selection over a collection's declared indexes.
///
/// Candidates are examined in declaration order. For each index the filter
/// is walked along the index's field sequence: `$eq` extends the equality
/// prefix, `$ne` still counts toward the match but closes the scannable
/// prefix, anything else stops the walk. The best index is the one with
/// the highest match count; an index that matches nothing but satisfies
/// the sort is preferred outright (sort-only plan). No match and no sort
/// coverage means a full collection scan.
pub struct QueryPlanner<'a> {
    indexes: &'a [IndexModel],
}

impl<'a> QueryPlanner<'a> {
    pub fn new(indexes: &'a [IndexModel]) -> Self {
        Self { indexes }
    }

    pub fn plan(&self, filter: &Document, sort: &[SortField]) -> QueryPlan {
        let flat = flatten_filter(filter);

        let mut best: Option<(&IndexModel, Document, usize)> = None;

        for index in self.indexes {
            let (prefix, match_count) = match_index_prefix(index, &flat);

            if match_count == 0 && !sort.is_empty() && index_supports_sort(index, sort) {
                return QueryPlan {
                    index: Some(index.clone()),
                    equality_prefix: Document::new(),
                    used_for_sort: true,
                    exact: false,
                };
            }

            if match_count > best.as_ref().map_or(0, |(_, _, count)| *count) {
                best = Some((index, prefix, match_count));
            }
        }

        match best {
            Some((index, equality_prefix, match_count)) => QueryPlan {
                used_for_sort: index_supports_sort(index, sort),
                exact: match_count == index.fields.len(),
                index: Some(index.clone()),
                equality_prefix,
            },
            None => QueryPlan::full_scan(),
        }
    }
}

/// Walk an index's fields in declaration order against the flattened
/// filter. Returns the scannable `$eq` prefix and the match count
/// (which also counts `$ne` entries past which no prefix can extend).
fn match_index_prefix(index: &IndexModel, flat: &Document) -> (Document, usize) {
    let mut prefix = Document::new();
    let mut match_count = 0;
    let mut scannable = true;

    for field in &index.fields {
        let Some(Bson::Document(ops)) = flat.get(&field.name) else {
            break;
        };
        if let Some(operand) = ops.get("$eq") {
            if scannable {
                prefix.insert(field.name.clone(), operand.clone());
            }
            match_count += 1;
        } else if ops.get("$ne").is_some() {
            scannable = false;
            match_count += 1;
        } else {
            break;
        }
    }

    (prefix, match_count)
}

/// The sort is satisfied when its field sequence is a prefix of the
/// index's field sequence and every direction matches exactly.
fn index_supports_sort(index: &IndexModel, sort: &[SortField]) -> bool {
    if sort.is_empty() || sort.len() > index.fields.len() {
        return false;
    }
    sort.iter()
        .zip(&index.fields)
        .all(|(s, f)| s.field == f.name && s.order == f.order)
}

/// Normalize the top-level filter into `field -> operator map` form;
/// direct values become `{"$eq": value}`. Logical operators do not
/// constrain a single field and are ignored here; the expression tree
/// applies them during post-filtering.
fn flatten_filter(filter: &Document) -> Document {
    let mut flat = Document::new();
    for (field, value) in filter {
        if field.starts_with('$') {
            continue;
        }
        let is_operator_doc = matches!(
            value,
            Bson::Document(sub) if sub.keys().next().is_some_and(|k| k.starts_with('$'))
        );
        if is_operator_doc {
            flat.insert(field.clone(), value.clone());
        } else {
            flat.insert(field.clone(), doc! { "$eq": value.clone() });
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use basalt_engine::IndexField;

    use super::*;

    fn index(name: &str, fields: Vec<IndexField>) -> IndexModel {
        IndexModel::new(fields).name(name)
    }

    #[test]
    fn no_indexes_yields_full_scan() {
        let planner = QueryPlanner::new(&[]);
        let plan = planner.plan(&doc! { "age": 25 }, &[]);
        assert!(plan.index.is_none());
        assert!(!plan.exact);
    }

    #[test]
    fn equality_picks_matching_index() {
        let indexes = vec![index("age_1", vec![IndexField::asc("age")])];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "age": 25 }, &[]);
        assert_eq!(plan.index.as_ref().unwrap().options.name, "age_1");
        assert_eq!(plan.equality_prefix, doc! { "age": 25 });
        assert!(plan.exact);
    }

    #[test]
    fn unrelated_filter_yields_full_scan() {
        let indexes = vec![index("age_1", vec![IndexField::asc("age")])];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "name": "Ana" }, &[]);
        assert!(plan.index.is_none());
    }

    #[test]
    fn compound_prefix_stops_at_range_operator() {
        let indexes = vec![index(
            "name_1_last_1_age_1",
            vec![
                IndexField::asc("name"),
                IndexField::asc("last_name"),
                IndexField::asc("age"),
            ],
        )];
        let filter = doc! { "name": "Pat", "last_name": "B", "age": { "$gte": 40 } };
        let plan = QueryPlanner::new(&indexes).plan(&filter, &[]);
        assert!(plan.index.is_some());
        assert_eq!(plan.equality_prefix, doc! { "name": "Pat", "last_name": "B" });
        assert!(!plan.exact);
    }

    #[test]
    fn gap_in_prefix_stops_the_walk() {
        let indexes = vec![index(
            "a_1_b_1_c_1",
            vec![
                IndexField::asc("a"),
                IndexField::asc("b"),
                IndexField::asc("c"),
            ],
        )];
        // "b" is unconstrained: only "a" can participate.
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "a": 1, "c": 3 }, &[]);
        assert_eq!(plan.equality_prefix, doc! { "a": 1 });
        assert!(!plan.exact);
    }

    #[test]
    fn ne_counts_but_closes_the_scannable_prefix() {
        let indexes = vec![index(
            "a_1_b_1",
            vec![IndexField::asc("a"), IndexField::asc("b")],
        )];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "a": { "$ne": 1 }, "b": 2 }, &[]);
        // Both fields matched, nothing scannable.
        assert!(plan.index.is_some());
        assert!(plan.equality_prefix.is_empty());
        assert!(plan.exact);
    }

    #[test]
    fn best_match_count_wins() {
        let indexes = vec![
            index("a_1", vec![IndexField::asc("a")]),
            index("a_1_b_1", vec![IndexField::asc("a"), IndexField::asc("b")]),
        ];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "a": 1, "b": 2 }, &[]);
        assert_eq!(plan.index.as_ref().unwrap().options.name, "a_1_b_1");
        assert!(plan.exact);
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let indexes = vec![
            index("first", vec![IndexField::asc("a")]),
            index("second", vec![IndexField::asc("a")]),
        ];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "a": 1 }, &[]);
        assert_eq!(plan.index.as_ref().unwrap().options.name, "first");
    }

    #[test]
    fn sort_only_plan_preferred() {
        let indexes = vec![
            index("age_1", vec![IndexField::asc("age")]),
            index("created_1", vec![IndexField::asc("created_at")]),
        ];
        let plan = QueryPlanner::new(&indexes).plan(&doc! {}, &[SortField::asc("created_at")]);
        assert_eq!(plan.index.as_ref().unwrap().options.name, "created_1");
        assert!(plan.used_for_sort);
        assert!(plan.equality_prefix.is_empty());
        assert!(!plan.exact);
    }

    #[test]
    fn sort_direction_must_match_exactly() {
        let indexes = vec![index("created_1", vec![IndexField::asc("created_at")])];
        let plan = QueryPlanner::new(&indexes).plan(&doc! {}, &[SortField::desc("created_at")]);
        assert!(plan.index.is_none());
    }

    #[test]
    fn sort_prefix_of_compound_index() {
        let indexes = vec![index(
            "a_1_b_-1",
            vec![IndexField::asc("a"), IndexField::desc("b")],
        )];
        let plan = QueryPlanner::new(&indexes).plan(
            &doc! {},
            &[SortField::asc("a"), SortField::desc("b")],
        );
        assert!(plan.used_for_sort);

        let plan = QueryPlanner::new(&indexes).plan(
            &doc! {},
            &[SortField::asc("a"), SortField::asc("b")],
        );
        assert!(plan.index.is_none());
    }

    #[test]
    fn equality_match_reports_sort_coverage() {
        let indexes = vec![index(
            "a_1_b_1",
            vec![IndexField::asc("a"), IndexField::asc("b")],
        )];
        let plan = QueryPlanner::new(&indexes).plan(&doc! { "a": 1 }, &[SortField::asc("a")]);
        assert!(plan.index.is_some());
        assert!(plan.used_for_sort);
    }

    #[test]
    fn logical_operators_are_invisible_to_the_prefix_walk() {
        let indexes = vec![index("a_1", vec![IndexField::asc("a")])];
        let filter = doc! { "$or": [ { "a": 1 }, { "a": 2 } ] };
        let plan = QueryPlanner::new(&indexes).plan(&filter, &[]);
        assert!(plan.index.is_none());
    }
}
