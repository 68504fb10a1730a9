use std::cmp::Ordering;

use basalt_engine::key;
use basalt_query::{FindOptions, SortField, compare_values, parse_filter};
use basalt_store::Store;
use bson::{Bson, Document};

use crate::error::DbError;
use crate::planner::QueryPlanner;
use crate::result::FindResult;

use super::Collection;

impl<S: Store + Send + Sync + 'static> Collection<S> {
    /// Direct point read by `_id`.
    pub fn find_by_id(&self, id: &str) -> Result<Document, DbError> {
        self.read_document(id)
    }

    /// First document matching the filter, or [`DbError::DocumentNotFound`].
    pub fn find_one(&self, filter: &Document) -> Result<Document, DbError> {
        let result = self.find(filter, &FindOptions::new().limit(1))?;
        result
            .documents
            .into_iter()
            .next()
            .ok_or(DbError::DocumentNotFound)
    }

    /// Plan, fetch candidates (index scan or full scan), re-evaluate the
    /// filter tree, then sort and paginate.
    ///
    /// When the chosen index also satisfies the sort, `skip`/`limit` are
    /// applied to the entry keys before documents are loaded (early
    /// termination); `total_count` then reflects the matches among the
    /// examined page. Otherwise documents are sorted in memory (stable;
    /// case-insensitive strings, numeric promotion, unsupported types keep
    /// input order) and paginated afterwards, with `total_count` taken
    /// before pagination.
    pub fn find(&self, filter: &Document, options: &FindOptions) -> Result<FindResult, DbError> {
        self.index_manager().reload()?;
        let candidates = self.index_manager().planner_indexes();
        let plan = QueryPlanner::new(&candidates).plan(filter, &options.sort);
        let expr = parse_filter(filter)?;

        let mut documents = Vec::new();
        let mut total_count = 0u64;

        if let Some(index) = &plan.index {
            let mut entries = self
                .index_manager()
                .scan_entries(index, &plan.equality_prefix)?;
            if plan.used_for_sort {
                entries = paginate(entries, options.skip, options.limit);
            }
            for entry in entries {
                let Some(doc_id) = key::doc_id_from_index_entry(&entry) else {
                    return Err(DbError::Decoding("malformed index entry key".to_string()));
                };
                let doc = match self.read_document(&doc_id) {
                    Ok(doc) => doc,
                    // An entry without its document can be observed while a
                    // concurrent mutation settles; the filter re-evaluation
                    // contract allows dropping it.
                    Err(DbError::DocumentNotFound) => continue,
                    Err(e) => return Err(e),
                };
                if expr.matches(&doc) {
                    total_count += 1;
                    documents.push(doc);
                }
            }
        } else {
            let prefix = key::document_prefix(self.db_name(), self.name());
            for (_, value) in self.store().scan(&prefix)? {
                let doc: Document =
                    bson::from_slice(&value).map_err(|e| DbError::Decoding(e.to_string()))?;
                if expr.matches(&doc) {
                    total_count += 1;
                    documents.push(doc);
                }
            }
        }

        if !plan.used_for_sort {
            if !options.sort.is_empty() {
                sort_documents(&mut documents, &options.sort);
            }
            documents = paginate(documents, options.skip, options.limit);
        }

        Ok(FindResult {
            documents,
            total_count,
            index_used: plan.index,
        })
    }
}

fn paginate<T>(items: Vec<T>, skip: Option<usize>, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(skip.unwrap_or(0));
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}

/// Stable multi-field sort. String comparison is case-insensitive;
/// numbers promote to f64; value pairs with no defined order compare
/// equal, so the stable sort keeps their input order.
fn sort_documents(documents: &mut [Document], sort: &[SortField]) {
    documents.sort_by(|a, b| {
        for spec in sort {
            let ord = compare_sort_values(a.get(&spec.field), b.get(&spec.field));
            let ord = if spec.order < 0 { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn compare_sort_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Bson::String(x)), Some(Bson::String(y))) => {
            x.to_lowercase().cmp(&y.to_lowercase())
        }
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn paginate_applies_skip_then_limit() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(paginate(items.clone(), Some(1), Some(2)), vec![2, 3]);
        assert_eq!(paginate(items.clone(), None, Some(10)), items);
        assert_eq!(paginate(items.clone(), Some(10), None), Vec::<i32>::new());
    }

    #[test]
    fn sort_is_case_insensitive_for_strings() {
        let mut docs = vec![
            doc! { "name": "bob" },
            doc! { "name": "Ana" },
            doc! { "name": "zoe" },
        ];
        sort_documents(&mut docs, &[SortField::asc("name")]);
        let names: Vec<&str> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, vec!["Ana", "bob", "zoe"]);
    }

    #[test]
    fn sort_promotes_numbers() {
        let mut docs = vec![
            doc! { "v": 2.5 },
            doc! { "v": 2_i64 },
            doc! { "v": 3_i32 },
        ];
        sort_documents(&mut docs, &[SortField::asc("v")]);
        let first = docs[0].get("v").unwrap();
        assert_eq!(first, &Bson::Int64(2));
    }

    #[test]
    fn sort_missing_fields_first_and_stable() {
        let mut docs = vec![
            doc! { "_id": "a", "v": 1 },
            doc! { "_id": "b" },
            doc! { "_id": "c", "v": 1 },
        ];
        sort_documents(&mut docs, &[SortField::asc("v")]);
        let ids: Vec<&str> = docs.iter().map(|d| d.get_str("_id").unwrap()).collect();
        // Missing sorts first; equal keys keep input order (a before c).
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn sort_descending_reverses() {
        let mut docs = vec![doc! { "v": 1 }, doc! { "v": 3 }, doc! { "v": 2 }];
        sort_documents(&mut docs, &[SortField::desc("v")]);
        let vals: Vec<i32> = docs.iter().map(|d| d.get_i32("v").unwrap()).collect();
        assert_eq!(vals, vec![3, 2, 1]);
    }
}
