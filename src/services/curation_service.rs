use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::ReturnDocument;

use crate::{
    database::MongoDB,
    models::{AttractionResponse, CurationResponse, MarkOutcome, User},
    services::{
        attraction_service, auth_service,
        curation::{self, CounterDelta, CurationChange},
    },
    utils::error::AppResult,
};

/// One of the three per-user curation lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurationList {
    BeenThere,
    WantToVisit,
    Saved,
}

impl CurationList {
    pub fn ids(self, user: &User) -> &[ObjectId] {
        match self {
            CurationList::BeenThere => &user.been_there,
            CurationList::WantToVisit => &user.want_to_visit,
            CurationList::Saved => &user.list,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CurationList::BeenThere => "beenThere",
            CurationList::WantToVisit => "wantToVisit",
            CurationList::Saved => "list",
        }
    }

    /// Runs the matching engine rule on an in-memory user.
    fn mark(self, user: &mut User, attraction_id: ObjectId) -> CurationChange {
        match self {
            CurationList::BeenThere => curation::mark_visited(user, attraction_id),
            CurationList::WantToVisit => curation::mark_want_to_visit(user, attraction_id),
            CurationList::Saved => CurationChange {
                outcome: curation::add_to_list(user, attraction_id),
                delta: CounterDelta::default(),
            },
        }
    }
}

/// Filter and update for adding `attraction_id` to one list. The filter only matches
/// while the id is absent, so a repeated request modifies nothing.
pub fn list_write(which: CurationList, user_id: &ObjectId, attraction_id: &ObjectId) -> (Document, Document) {
    match which {
        CurationList::BeenThere => (
            doc! { "_id": user_id, "beenThere": { "$ne": attraction_id } },
            doc! {
                "$addToSet": { "beenThere": attraction_id },
                "$pull": { "wantToVisit": attraction_id },
            },
        ),
        CurationList::WantToVisit => (
            doc! {
                "_id": user_id,
                "wantToVisit": { "$ne": attraction_id },
                "beenThere": { "$ne": attraction_id },
            },
            doc! { "$addToSet": { "wantToVisit": attraction_id } },
        ),
        CurationList::Saved => (
            doc! { "_id": user_id, "list": { "$ne": attraction_id } },
            doc! { "$addToSet": { "list": attraction_id } },
        ),
    }
}

/// Counter updates for `delta` as (filter, update) pairs. The want-to-visit decrement
/// is a separate write that only matches while the stored counter is positive.
pub fn counter_writes(attraction_id: &ObjectId, delta: &CounterDelta) -> Vec<(Document, Document)> {
    let mut writes = Vec::new();

    let mut inc = Document::new();
    if delta.visited != 0 {
        inc.insert("visited", delta.visited);
    }
    if delta.want_to_visit > 0 {
        inc.insert("wantToVisitCount", delta.want_to_visit);
    }
    if !inc.is_empty() {
        writes.push((doc! { "_id": attraction_id }, doc! { "$inc": inc }));
    }

    if delta.want_to_visit < 0 {
        writes.push((
            doc! { "_id": attraction_id, "wantToVisitCount": { "$gt": 0 } },
            doc! { "$inc": { "wantToVisitCount": delta.want_to_visit } },
        ));
    }

    writes
}

/// Atomically adds the attraction to one of the caller's lists, then adjusts the
/// attraction counters. The pre-update user document decides the counter delta, so
/// concurrent requests cannot both count the same change.
async fn mark(
    db: &MongoDB,
    user_id: &ObjectId,
    attraction_id: &ObjectId,
    which: CurationList,
) -> AppResult<CurationResponse> {
    // Attraction must exist before any list is touched
    let mut attraction = attraction_service::get_required(db, attraction_id).await?;

    let (filter, update) = list_write(which, user_id, attraction_id);
    let before = db
        .users()
        .find_one_and_update(filter, update)
        .return_document(ReturnDocument::Before)
        .await?;

    let (outcome, user) = match before {
        Some(mut user) => {
            let change = which.mark(&mut user, *attraction_id);
            for (filter, update) in counter_writes(attraction_id, &change.delta) {
                db.attractions().update_one(filter, update).await?;
            }
            curation::apply_counters(&mut attraction, &change.delta);
            (change.outcome, user)
        }
        // Filter did not match: either already listed or the user is gone
        None => (MarkOutcome::AlreadyMarked, auth_service::get_user(db, user_id).await?),
    };

    log::info!(
        "📍 {} {} for {}: {:?}",
        which.label(),
        attraction_id.to_hex(),
        user_id.to_hex(),
        outcome
    );
    Ok(CurationResponse::new(outcome, &user, &attraction))
}

pub async fn mark_visited(db: &MongoDB, user_id: &ObjectId, attraction_id: &ObjectId) -> AppResult<CurationResponse> {
    mark(db, user_id, attraction_id, CurationList::BeenThere).await
}

pub async fn mark_want_to_visit(
    db: &MongoDB,
    user_id: &ObjectId,
    attraction_id: &ObjectId,
) -> AppResult<CurationResponse> {
    mark(db, user_id, attraction_id, CurationList::WantToVisit).await
}

pub async fn add_to_list(db: &MongoDB, user_id: &ObjectId, attraction_id: &ObjectId) -> AppResult<CurationResponse> {
    mark(db, user_id, attraction_id, CurationList::Saved).await
}

/// Full attraction records for one of the caller's lists, in list order.
/// A caller whose account no longer exists gets an empty list.
pub async fn list_attractions(
    db: &MongoDB,
    user_id: &ObjectId,
    which: CurationList,
) -> AppResult<Vec<AttractionResponse>> {
    let user = match auth_service::find_user(db, user_id).await? {
        Some(user) => user,
        None => return Ok(Vec::new()),
    };
    let attractions = attraction_service::find_in_order(db, which.ids(&user)).await?;
    attraction_service::present(db, attractions).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_selection() {
        let mut user = User::new("ada".into(), None);
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();
        user.been_there.push(a);
        user.want_to_visit.push(b);
        user.list.push(c);

        assert_eq!(CurationList::BeenThere.ids(&user), &[a]);
        assert_eq!(CurationList::WantToVisit.ids(&user), &[b]);
        assert_eq!(CurationList::Saved.ids(&user), &[c]);
        assert_eq!(CurationList::Saved.label(), "list");
    }

    #[test]
    fn test_been_there_write_moves_out_of_want_to_visit() {
        let (user, attraction) = (ObjectId::new(), ObjectId::new());
        let (filter, update) = list_write(CurationList::BeenThere, &user, &attraction);

        assert_eq!(filter, doc! { "_id": user, "beenThere": { "$ne": attraction } });
        assert_eq!(update.get_document("$addToSet").unwrap(), &doc! { "beenThere": attraction });
        assert_eq!(update.get_document("$pull").unwrap(), &doc! { "wantToVisit": attraction });
    }

    #[test]
    fn test_want_to_visit_write_skips_visited() {
        let (user, attraction) = (ObjectId::new(), ObjectId::new());
        let (filter, update) = list_write(CurationList::WantToVisit, &user, &attraction);

        assert_eq!(filter.get_document("beenThere").unwrap(), &doc! { "$ne": attraction });
        assert_eq!(filter.get_document("wantToVisit").unwrap(), &doc! { "$ne": attraction });
        assert!(update.get("$pull").is_none());
    }

    #[test]
    fn test_saved_write_has_no_side_effects() {
        let (user, attraction) = (ObjectId::new(), ObjectId::new());
        let (_, update) = list_write(CurationList::Saved, &user, &attraction);
        assert_eq!(update, doc! { "$addToSet": { "list": attraction } });
    }

    #[test]
    fn test_already_marked_writes_no_counters() {
        let mut user = User::new("ada".into(), None);
        let attraction = ObjectId::new();
        user.been_there.push(attraction);

        let change = CurationList::BeenThere.mark(&mut user, attraction);
        assert_eq!(change.outcome, MarkOutcome::AlreadyMarked);
        assert!(counter_writes(&attraction, &change.delta).is_empty());
    }

    #[test]
    fn test_decrement_is_guarded_by_positive_counter() {
        let attraction = ObjectId::new();
        let writes = counter_writes(&attraction, &CounterDelta { visited: 1, want_to_visit: -1 });

        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], (doc! { "_id": attraction }, doc! { "$inc": { "visited": 1_i64 } }));
        assert_eq!(
            writes[1],
            (
                doc! { "_id": attraction, "wantToVisitCount": { "$gt": 0 } },
                doc! { "$inc": { "wantToVisitCount": -1_i64 } },
            )
        );
    }

    #[test]
    fn test_increment_is_unguarded() {
        let attraction = ObjectId::new();
        let writes = counter_writes(&attraction, &CounterDelta { visited: 0, want_to_visit: 1 });
        assert_eq!(writes, vec![(doc! { "_id": attraction }, doc! { "$inc": { "wantToVisitCount": 1_i64 } })]);
    }

    async fn live_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/attractions_test".to_string());
        MongoDB::new(&uri).await.unwrap()
    }

    async fn seed(db: &MongoDB, username: &str) -> (ObjectId, ObjectId) {
        let user = User::new(format!("{}{}", username, ObjectId::new().to_hex()), None);
        let user_id = db.users().insert_one(&user).await.unwrap().inserted_id.as_object_id().unwrap();

        let attraction = crate::models::Attraction {
            id: None,
            added_by: user_id,
            name: "Seven Noses of Soho".into(),
            description: "Plaster noses hidden on walls".into(),
            location: "Meard St, London".into(),
            address: None,
            geocode: None,
            images: Vec::new(),
            image_url: None,
            reviews: Vec::new(),
            visited: 0,
            want_to_visit_count: 0,
        };
        let attraction_id = db
            .attractions()
            .insert_one(&attraction)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();
        (user_id, attraction_id)
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_want_to_visit_then_visited_against_store() {
        let db = live_db().await;
        let (user, attraction) = seed(&db, "curator").await;

        let wanted = mark_want_to_visit(&db, &user, &attraction).await.unwrap();
        assert_eq!(wanted.status, MarkOutcome::Added);
        assert_eq!(wanted.attraction.want_to_visit_count, 1);

        let visited = mark_visited(&db, &user, &attraction).await.unwrap();
        assert_eq!(visited.status, MarkOutcome::Added);
        assert_eq!(visited.attraction.visited, 1);
        assert_eq!(visited.attraction.want_to_visit_count, 0);
        assert!(visited.want_to_visit.is_empty());
        assert_eq!(visited.been_there, vec![attraction.to_hex()]);

        let again = mark_visited(&db, &user, &attraction).await.unwrap();
        assert_eq!(again.status, MarkOutcome::AlreadyMarked);

        let blocked = mark_want_to_visit(&db, &user, &attraction).await.unwrap();
        assert_eq!(blocked.status, MarkOutcome::AlreadyMarked);

        let stored = attraction_service::get_required(&db, &attraction).await.unwrap();
        assert_eq!(stored.visited, 1);
        assert_eq!(stored.want_to_visit_count, 0);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_review_removal_needs_author_against_store() {
        use crate::{models::CreateReviewRequest, services::review_service};

        let db = live_db().await;
        let (author, attraction) = seed(&db, "reviewer").await;
        let (other, _) = seed(&db, "bystander").await;

        let request = CreateReviewRequest { content: "x".into(), stars: 5 };
        let added = review_service::add_review(&db, &attraction, author, &request).await.unwrap();
        let review_id = ObjectId::parse_str(&added.reviews[0].id).unwrap();

        let kept = review_service::remove_review(&db, &attraction, &review_id, &other).await.unwrap();
        assert_eq!(kept.removed, Some(false));
        assert_eq!(kept.reviews.len(), 1);

        let gone = review_service::remove_review(&db, &attraction, &review_id, &author).await.unwrap();
        assert_eq!(gone.removed, Some(true));
        assert!(gone.reviews.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_lists_of_missing_user_are_empty() {
        let db = live_db().await;
        let (user, attraction) = seed(&db, "leaver").await;
        add_to_list(&db, &user, &attraction).await.unwrap();

        let saved = list_attractions(&db, &user, CurationList::Saved).await.unwrap();
        assert_eq!(saved.len(), 1);

        db.users().delete_one(doc! { "_id": user }).await.unwrap();
        for which in [CurationList::BeenThere, CurationList::WantToVisit, CurationList::Saved] {
            assert!(list_attractions(&db, &user, which).await.unwrap().is_empty());
        }
    }
}
