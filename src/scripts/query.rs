use serde::Serialize;
use shelf_db::{Database, DeleteOutcome, UpdateOutcome};

use crate::modules::books::{self, Book, CreateBook};
use crate::modules::publishers;

pub const DEFAULT_CREATE_TITLE: &str = "Brothers Karamazov";
pub const DEFAULT_CREATE_AUTHOR: &str = "Fyodor Dostoyevsky";
pub const DEFAULT_CREATE_PUBLISHED_DATE: &str = "1879-08-02";
pub const DEFAULT_UPDATE_TITLE: &str = "The Lord of the Rings";
pub const DEFAULT_UPDATE_NEW_TITLE: &str =
    "The Lord of the Rings Book I - The Fellowship of the Ring";
pub const DEFAULT_DELETE_TITLE: &str = "Brothers Karamazov";

/// The single operation a query run performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOp {
    FindAll,
    /// Create a book referencing the first publisher found.
    Create {
        title: String,
        author: String,
        published_date: String,
    },
    Update {
        title: String,
        new_title: String,
    },
    Delete {
        title: String,
    },
}

impl QueryOp {
    fn name(&self) -> &'static str {
        match self {
            QueryOp::FindAll => "find",
            QueryOp::Create { .. } => "create",
            QueryOp::Update { .. } => "update",
            QueryOp::Delete { .. } => "delete",
        }
    }
}

/// Raw result of a query run, printed as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Books(Vec<Book>),
    Created(Book),
    Updated(UpdateOutcome),
    Deleted(DeleteOutcome),
}

pub async fn run(db: &Database, op: QueryOp) -> anyhow::Result<QueryOutcome> {
    let operation = op.name();
    tracing::info!(operation, "running query");

    let outcome = match op {
        QueryOp::FindAll => QueryOutcome::Books(books::find_all(db).await?),
        QueryOp::Create {
            title,
            author,
            published_date,
        } => {
            let publisher = publishers::find_first(db).await?;
            if publisher.is_none() {
                tracing::warn!("no publisher found; creating book without a reference");
            }
            let book = CreateBook::new(title, author, published_date)
                .published_by(publisher.map(|p| p.id));
            QueryOutcome::Created(books::create(db, &book).await?)
        }
        QueryOp::Update { title, new_title } => {
            QueryOutcome::Updated(books::update_title(db, &title, &new_title).await?)
        }
        QueryOp::Delete { title } => {
            QueryOutcome::Deleted(books::delete_by_title(db, &title).await?)
        }
    };

    tracing::info!(operation, result = ?outcome, "query finished");
    Ok(outcome)
}
