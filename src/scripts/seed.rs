use std::collections::HashMap;

use anyhow::Context;
use bson::oid::ObjectId;
use shelf_db::Database;

use crate::modules::books::{self, Book, CreateBook};
use crate::modules::publishers::{self, CreatePublisher, Publisher};

pub const PENGUIN_BOOKS: &str = "Penguin Books";
pub const HARPER_COLLINS: &str = "HarperCollins";

struct SeedBook {
    title: &'static str,
    author: &'static str,
    published_date: &'static str,
    publisher: &'static str,
}

const SEED_BOOKS: [SeedBook; 5] = [
    SeedBook {
        title: "First Person Singular",
        author: "Haruki Murakami",
        published_date: "2023",
        publisher: PENGUIN_BOOKS,
    },
    SeedBook {
        title: "The Count of Monte Cristo",
        author: "Alexandre Dumas",
        published_date: "1994",
        publisher: PENGUIN_BOOKS,
    },
    SeedBook {
        title: "The Lord of the Rings",
        author: "J.R.R. Tolkien",
        published_date: "1951",
        publisher: PENGUIN_BOOKS,
    },
    SeedBook {
        title: "Zen and the Art of Motorcycle Maintenance",
        author: "Robert M. Pirsig",
        published_date: "1999",
        publisher: HARPER_COLLINS,
    },
    SeedBook {
        title: "The Alchemist",
        author: "Paulo Coelho",
        published_date: "1988",
        publisher: HARPER_COLLINS,
    },
];

/// Insert the reference publishers that are not already present.
pub async fn seed_publishers(db: &Database) -> anyhow::Result<Vec<Publisher>> {
    let mut seeded = Vec::new();

    for name in [PENGUIN_BOOKS, HARPER_COLLINS] {
        let existing = publishers::find_by_name(db, name)
            .await
            .with_context(|| format!("failed to look up publisher '{name}'"))?;

        let publisher = match existing.into_iter().next() {
            Some(publisher) => {
                tracing::info!(publisher = name, "publisher already present");
                publisher
            }
            None => publishers::create(db, &CreatePublisher::new(name))
                .await
                .with_context(|| format!("failed to create publisher '{name}'"))?,
        };
        seeded.push(publisher);
    }

    tracing::info!(count = seeded.len(), "seeded publishers");
    Ok(seeded)
}

/// Insert the five reference books in one bulk call, each referencing its
/// publisher when that publisher exists.
pub async fn seed_books(db: &Database) -> anyhow::Result<Vec<Book>> {
    let mut references: HashMap<&str, Option<ObjectId>> = HashMap::new();
    for seed in &SEED_BOOKS {
        if !references.contains_key(seed.publisher) {
            let id = resolve_publisher(db, seed.publisher).await?;
            references.insert(seed.publisher, id);
        }
    }

    let books: Vec<CreateBook> = SEED_BOOKS
        .iter()
        .map(|seed| {
            CreateBook::new(seed.title, seed.author, seed.published_date)
                .published_by(references.get(seed.publisher).copied().flatten())
        })
        .collect();

    let created = books::create_many(db, &books)
        .await
        .with_context(|| "failed to insert seed books")?;

    tracing::info!(count = created.len(), "created books with publishers");
    Ok(created)
}

/// First publisher named exactly `name`. A missing publisher leaves the
/// reference unset instead of failing the batch.
async fn resolve_publisher(db: &Database, name: &str) -> anyhow::Result<Option<ObjectId>> {
    let found = publishers::find_by_name(db, name)
        .await
        .with_context(|| format!("failed to look up publisher '{name}'"))?;

    let id = found.first().map(|publisher| publisher.id);
    if id.is_none() {
        tracing::warn!(
            publisher = name,
            "publisher not found; books will be inserted without a reference"
        );
    }
    Ok(id)
}
