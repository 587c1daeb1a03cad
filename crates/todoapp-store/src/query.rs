//! Pure derivations over a todo collection.
//!
//! Nothing here mutates its input; the store calls these on a snapshot each
//! time a view asks.

use std::cmp::Ordering;

use chrono::NaiveDate;
use todoapp_model::{Filters, SortBy, SortOrder, Stats, Todo, TodoId, TodoStatus};

/// Todos passing the status and search criteria, sorted. The sort is
/// stable so ties keep collection order.
pub fn filtered_view(todos: &[Todo], filters: &Filters) -> Vec<Todo> {
    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    let mut view: Vec<Todo> = todos
        .iter()
        .filter(|todo| filters.status.accepts(todo.is_completed))
        .filter(|todo| match &needle {
            Some(needle) => todo.title.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .cloned()
        .collect();

    view.sort_by(|a, b| {
        let ordering = compare(a, b, filters.sort_by);
        match filters.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    view
}

fn compare(a: &Todo, b: &Todo, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Title => a.title.cmp(&b.title),
    }
}

/// Counts over the whole collection, ignoring filters. `today` is the UTC
/// date `completed_today` is measured against.
pub fn stats(todos: &[Todo], today: NaiveDate) -> Stats {
    let completed = todos.iter().filter(|todo| todo.is_completed).count();
    let in_progress = todos
        .iter()
        .filter(|todo| todo.status == TodoStatus::InProgress)
        .count();
    let completed_today = todos
        .iter()
        .filter(|todo| todo.is_completed)
        .filter(|todo| todo.completed_at.is_some_and(|at| at.date_naive() == today))
        .count();
    Stats {
        total: todos.len(),
        completed,
        pending: todos.len() - completed,
        in_progress,
        completed_today,
        completion_rate: Stats::completion_rate(completed, todos.len()),
    }
}

pub fn find_by_id(todos: &[Todo], id: TodoId) -> Option<&Todo> {
    todos.iter().find(|todo| todo.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use todoapp_model::{FiltersPatch, StatusFilter};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
    }

    fn todo(id: i64, title: &str, day: u32, completed: bool) -> Todo {
        let mut todo = Todo::new(TodoId::new(id), title, at(day));
        if completed {
            todo.mark_completed(at(day));
        }
        todo
    }

    fn titles(view: &[Todo]) -> Vec<&str> {
        view.iter().map(|todo| todo.title.as_str()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let todos = vec![todo(1, "Buy milk", 1, false), todo(2, "Write report", 2, false)];
        let filters = Filters::default().merged(FiltersPatch::search("buy"));

        assert_eq!(titles(&filtered_view(&todos, &filters)), vec!["Buy milk"]);
    }

    #[test]
    fn test_sort_by_created_at_ascending() {
        let todos = vec![todo(1, "Second", 2, false), todo(2, "First", 1, false)];
        let filters =
            Filters::default().merged(FiltersPatch::sort(SortBy::CreatedAt, SortOrder::Asc));

        assert_eq!(titles(&filtered_view(&todos, &filters)), vec!["First", "Second"]);
    }

    #[test]
    fn test_default_order_is_newest_first() {
        let todos = vec![todo(1, "Old", 1, false), todo(2, "New", 3, false)];
        assert_eq!(
            titles(&filtered_view(&todos, &Filters::default())),
            vec!["New", "Old"]
        );
    }

    #[test]
    fn test_sort_by_title_is_stable() {
        let todos = vec![
            todo(1, "b", 1, false),
            todo(2, "a", 2, false),
            todo(3, "b", 3, true),
        ];
        let filters = Filters::default().merged(FiltersPatch::sort(SortBy::Title, SortOrder::Asc));
        let view = filtered_view(&todos, &filters);

        let ids: Vec<i64> = view.iter().map(|todo| todo.id.get()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_status_filter() {
        let todos = vec![todo(1, "open", 1, false), todo(2, "done", 2, true)];

        let pending = Filters::default().merged(FiltersPatch::status(StatusFilter::Pending));
        assert_eq!(titles(&filtered_view(&todos, &pending)), vec!["open"]);

        let completed = Filters::default().merged(FiltersPatch::status(StatusFilter::Completed));
        assert_eq!(titles(&filtered_view(&todos, &completed)), vec!["done"]);
    }

    #[test]
    fn test_filtered_view_is_idempotent() {
        let todos = vec![
            todo(1, "Buy milk", 2, false),
            todo(2, "Buy bread", 1, true),
            todo(3, "Call mom", 3, false),
        ];
        let filters = Filters::default().merged(FiltersPatch::search("BUY"));

        let first = filtered_view(&todos, &filters);
        let second = filtered_view(&todos, &filters);
        assert_eq!(first, second);
        assert_eq!(titles(&first), vec!["Buy milk", "Buy bread"]);
    }

    #[test]
    fn test_stats_adds_up() {
        let collections = vec![
            vec![],
            vec![todo(1, "a", 1, true)],
            vec![todo(1, "a", 1, false), todo(2, "b", 2, true), todo(3, "c", 3, false)],
        ];
        for todos in collections {
            let stats = stats(&todos, at(1).date_naive());
            assert_eq!(stats.completed + stats.pending, stats.total);
            assert_eq!(stats.total, todos.len());
        }
    }

    #[test]
    fn test_stats_breakdown() {
        let mut started = todo(2, "b", 2, false);
        started.set_status(TodoStatus::InProgress, at(2));
        let todos = vec![
            todo(1, "a", 1, false),
            started,
            todo(3, "c", 3, true),
            todo(4, "d", 5, true),
        ];

        let stats = stats(&todos, at(5).date_naive());

        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.completion_rate, 50.0);
    }

    #[test]
    fn test_completion_rate_rounds_and_handles_empty() {
        assert_eq!(Stats::completion_rate(0, 0), 0.0);
        assert_eq!(Stats::completion_rate(1, 3), 33.33);
        assert_eq!(Stats::completion_rate(2, 3), 66.67);
    }

    #[test]
    fn test_find_by_id() {
        let todos = vec![todo(1, "a", 1, false), todo(2, "b", 2, false)];
        let id: TodoId = "2".parse().unwrap();

        assert_eq!(find_by_id(&todos, id).map(|t| t.title.as_str()), Some("b"));
        assert!(find_by_id(&todos, TodoId::new(9)).is_none());
    }
}
