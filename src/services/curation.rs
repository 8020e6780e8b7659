//! Curation rules between a user's lists and an attraction's counters.
//!
//! Everything here works on in-memory records; `curation_service` loads and
//! persists them. A user never holds the same attraction in both `been_there`
//! and `want_to_visit`, and `want_to_visit_count` never drops below zero.

use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use crate::models::{Attraction, Image, MarkOutcome, Review, User};

/// Counter adjustments an attraction needs after a list change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub visited: i64,
    pub want_to_visit: i64,
}

impl CounterDelta {
    pub fn is_zero(&self) -> bool {
        self.visited == 0 && self.want_to_visit == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurationChange {
    pub outcome: MarkOutcome,
    pub delta: CounterDelta,
}

impl CurationChange {
    fn already_marked() -> Self {
        CurationChange {
            outcome: MarkOutcome::AlreadyMarked,
            delta: CounterDelta::default(),
        }
    }
}

pub fn mark_visited(user: &mut User, attraction_id: ObjectId) -> CurationChange {
    if user.been_there.contains(&attraction_id) {
        return CurationChange::already_marked();
    }

    user.been_there.push(attraction_id);

    let before = user.want_to_visit.len();
    user.want_to_visit.retain(|id| id != &attraction_id);
    let left_want_to_visit = user.want_to_visit.len() != before;

    CurationChange {
        outcome: MarkOutcome::Added,
        delta: CounterDelta {
            visited: 1,
            want_to_visit: if left_want_to_visit { -1 } else { 0 },
        },
    }
}

/// A visited attraction cannot go back on the want-to-visit list.
pub fn mark_want_to_visit(user: &mut User, attraction_id: ObjectId) -> CurationChange {
    if user.want_to_visit.contains(&attraction_id) || user.been_there.contains(&attraction_id) {
        return CurationChange::already_marked();
    }

    user.want_to_visit.push(attraction_id);

    CurationChange {
        outcome: MarkOutcome::Added,
        delta: CounterDelta {
            visited: 0,
            want_to_visit: 1,
        },
    }
}

/// Saved list; no counter on the attraction side.
pub fn add_to_list(user: &mut User, attraction_id: ObjectId) -> MarkOutcome {
    if user.list.contains(&attraction_id) {
        return MarkOutcome::AlreadyMarked;
    }
    user.list.push(attraction_id);
    MarkOutcome::Added
}

pub fn apply_counters(attraction: &mut Attraction, delta: &CounterDelta) {
    attraction.visited = (attraction.visited + delta.visited).max(0);
    attraction.want_to_visit_count = (attraction.want_to_visit_count + delta.want_to_visit).max(0);
}

pub fn new_review(author: ObjectId, content: &str, stars: u8) -> Review {
    Review {
        id: ObjectId::new(),
        content: content.trim().to_string(),
        stars,
        author,
        created_at: Some(BsonDateTime::now()),
    }
}

/// Drops the review only when `caller` wrote it. Returns whether anything was removed.
pub fn remove_review(reviews: &mut Vec<Review>, review_id: &ObjectId, caller: &ObjectId) -> bool {
    let before = reviews.len();
    reviews.retain(|r| !(&r.id == review_id && &r.author == caller));
    reviews.len() != before
}

/// New images first, then the kept ones in their original order.
pub fn merge_images(existing: Vec<Image>, new_images: Vec<Image>, remove: &[String]) -> Vec<Image> {
    let mut merged: Vec<Image> = new_images
        .into_iter()
        .filter(|img| !remove.contains(&img.deletable_id))
        .collect();
    merged.extend(
        existing
            .into_iter()
            .filter(|img| !remove.contains(&img.deletable_id)),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let mut user = User::new("ada".into(), None);
        user.id = Some(ObjectId::new());
        user
    }

    fn attraction() -> Attraction {
        Attraction {
            id: Some(ObjectId::new()),
            added_by: ObjectId::new(),
            name: "Postman's Park".into(),
            description: "Memorial to heroic self-sacrifice".into(),
            location: "King Edward St, London".into(),
            address: None,
            geocode: None,
            images: Vec::new(),
            image_url: None,
            reviews: Vec::new(),
            visited: 0,
            want_to_visit_count: 0,
        }
    }

    fn image(id: &str) -> Image {
        Image {
            url: format!("https://img.test/{}.jpg", id),
            deletable_id: id.to_string(),
        }
    }

    #[test]
    fn test_mark_visited_moves_out_of_want_to_visit() {
        let mut u = user();
        let id = ObjectId::new();
        u.want_to_visit.push(id);

        let change = mark_visited(&mut u, id);

        assert_eq!(change.outcome, MarkOutcome::Added);
        assert_eq!(change.delta, CounterDelta { visited: 1, want_to_visit: -1 });
        assert!(u.been_there.contains(&id));
        assert!(!u.want_to_visit.contains(&id));
    }

    #[test]
    fn test_mark_visited_twice_is_noop() {
        let mut u = user();
        let id = ObjectId::new();

        mark_visited(&mut u, id);
        let second = mark_visited(&mut u, id);

        assert_eq!(second.outcome, MarkOutcome::AlreadyMarked);
        assert!(second.delta.is_zero());
        assert_eq!(u.been_there, vec![id]);
    }

    #[test]
    fn test_mark_visited_without_prior_want_to_visit() {
        let mut u = user();
        let change = mark_visited(&mut u, ObjectId::new());
        assert_eq!(change.delta, CounterDelta { visited: 1, want_to_visit: 0 });
    }

    #[test]
    fn test_want_to_visit_rejected_once_visited() {
        let mut u = user();
        let id = ObjectId::new();
        mark_visited(&mut u, id);

        let change = mark_want_to_visit(&mut u, id);

        assert_eq!(change.outcome, MarkOutcome::AlreadyMarked);
        assert!(u.want_to_visit.is_empty());
    }

    #[test]
    fn test_want_to_visit_idempotent() {
        let mut u = user();
        let id = ObjectId::new();
        assert_eq!(mark_want_to_visit(&mut u, id).delta.want_to_visit, 1);
        assert_eq!(mark_want_to_visit(&mut u, id).outcome, MarkOutcome::AlreadyMarked);
        assert_eq!(u.want_to_visit, vec![id]);
    }

    #[test]
    fn test_add_to_list() {
        let mut u = user();
        let id = ObjectId::new();
        assert_eq!(add_to_list(&mut u, id), MarkOutcome::Added);
        assert_eq!(add_to_list(&mut u, id), MarkOutcome::AlreadyMarked);
        assert_eq!(u.list, vec![id]);
        assert!(u.been_there.is_empty() && u.want_to_visit.is_empty());
    }

    #[test]
    fn test_want_to_visit_count_never_negative() {
        let mut a = attraction();
        apply_counters(&mut a, &CounterDelta { visited: 1, want_to_visit: -1 });
        apply_counters(&mut a, &CounterDelta { visited: 0, want_to_visit: -1 });
        assert_eq!(a.want_to_visit_count, 0);
        assert_eq!(a.visited, 1);
    }

    #[test]
    fn test_want_to_visit_then_visited_scenario() {
        let mut u = user();
        let mut a = attraction();
        let id = a.id.unwrap();

        let change = mark_want_to_visit(&mut u, id);
        apply_counters(&mut a, &change.delta);
        assert!(u.want_to_visit.contains(&id));
        assert_eq!(a.want_to_visit_count, 1);

        let change = mark_visited(&mut u, id);
        apply_counters(&mut a, &change.delta);
        assert_eq!(a.visited, 1);
        assert_eq!(a.want_to_visit_count, 0);
        assert!(!u.want_to_visit.contains(&id));
        assert!(u.been_there.contains(&id));

        let change = mark_visited(&mut u, id);
        apply_counters(&mut a, &change.delta);
        assert_eq!(a.visited, 1);
    }

    #[test]
    fn test_reviews_appended_not_upserted() {
        let author = ObjectId::new();
        let mut reviews = vec![new_review(author, "great", 5)];
        reviews.push(new_review(author, "  still great ", 4));

        assert_eq!(reviews.len(), 2);
        assert_ne!(reviews[0].id, reviews[1].id);
        assert_eq!(reviews[1].content, "still great");
    }

    #[test]
    fn test_remove_review_only_by_author() {
        let u1 = ObjectId::new();
        let u2 = ObjectId::new();
        let review = new_review(u1, "x", 5);
        let review_id = review.id;
        let mut reviews = vec![review];

        assert!(!remove_review(&mut reviews, &review_id, &u2));
        assert_eq!(reviews.len(), 1);

        assert!(remove_review(&mut reviews, &review_id, &u1));
        assert!(reviews.is_empty());
    }

    #[test]
    fn test_remove_unknown_review_is_noop() {
        let author = ObjectId::new();
        let mut reviews = vec![new_review(author, "x", 3)];
        assert!(!remove_review(&mut reviews, &ObjectId::new(), &author));
        assert_eq!(reviews.len(), 1);
    }

    #[test]
    fn test_merge_images_order_and_removal() {
        let existing = vec![image("a"), image("b"), image("c")];
        let merged = merge_images(existing, vec![image("n1"), image("n2")], &["b".to_string()]);

        let ids: Vec<_> = merged.iter().map(|i| i.deletable_id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "a", "c"]);
    }

    #[test]
    fn test_merge_images_without_changes() {
        let existing = vec![image("a"), image("b")];
        let merged = merge_images(existing.clone(), Vec::new(), &[]);
        assert_eq!(merged, existing);
    }
}
