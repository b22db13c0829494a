use std::collections::HashMap;

/// Identifies entities that expose a stable identifier.
pub trait Identifiable {
    fn id(&self) -> &str;
}

/// Provides access to a human-friendly entity name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving non-negative magnitudes.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Indexes entities by display name. The first entry wins when names repeat.
pub fn index_by_name<T: NamedEntity>(items: &[T]) -> HashMap<&str, &T> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        index.entry(item.name()).or_insert(item);
    }
    index
}

pub fn find_by_name<'a, T: NamedEntity>(items: &'a [T], name: &str) -> Option<&'a T> {
    items.iter().find(|item| item.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::budget::CategoryBudget;
    use crate::domain::summary::CategoryTotal;

    #[test]
    fn name_lookups_work_across_entity_types() {
        let totals = [
            CategoryTotal {
                name: "Food".into(),
                total: 40.0,
            },
            CategoryTotal {
                name: "Food".into(),
                total: 99.0,
            },
        ];
        let index = index_by_name(&totals);
        assert_eq!(index.len(), 1);
        assert_eq!(index["Food"].amount(), 40.0);

        let budgets = [
            CategoryBudget::new("c1", "Rent", 900.0, 3, 2025),
            CategoryBudget::new("c2", "Fun", 50.0, 3, 2025),
        ];
        let fun = find_by_name(&budgets, "Fun").expect("budget by name");
        assert_eq!(fun.category_id, "c2");
        assert!(find_by_name(&budgets, "Gifts").is_none());
    }
}
